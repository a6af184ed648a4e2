//! The session controller: the one component a front end talks to.
//!
//! Composes the mode state machine, waypoint builder, layer synchronizer
//! and explorer resolver, and drives gateway calls. All state lives behind
//! a mutex so operations take `&self`; the lock is never held across an
//! await, which is what makes overlapping calls (and the token checks that
//! tame them) possible at all.

use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::explorer::{self, HIT_TOLERANCE_M};
use crate::gateway::RouteGateway;
use crate::layers::{LayerSet, LayerSync, ViewportFit};
use crate::models::{LatLng, RouteType};
use crate::session::{GenerateParams, Mode, Session};

/// Owns the session and the gateway handle.
pub struct SessionController<G> {
    gateway: G,
    state: Mutex<Session>,
    layers: Mutex<LayerSync>,
}

impl<G: RouteGateway> SessionController<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: Mutex::new(Session::new()),
            layers: Mutex::new(LayerSync::new()),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read session state without exposing the lock.
    pub fn with_session<R>(&self, read: impl FnOnce(&Session) -> R) -> R {
        read(&self.session())
    }

    /// Seed the start point from the one-shot platform location lookup.
    /// Best-effort: `None` (denied or unavailable) leaves it unset.
    pub fn seed_user_location(&self, location: Option<LatLng>) {
        match location {
            Some(location) => {
                tracing::info!(lat = location.lat, lng = location.lng, "user location seeded");
                self.session().set_user_location(location);
            }
            None => tracing::warn!("no user location available, start point stays unset"),
        }
    }

    /// Rebuild the four render layers and surface any viewport-fit
    /// request caused by the latest state change.
    pub fn sync_layers(&self) -> (LayerSet, Option<ViewportFit>) {
        let session = self.session();
        self.layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sync(&session)
    }

    /// Dispatch a map click according to the current mode: drawing appends
    /// a waypoint, exploring hit-tests the candidate layer, idle/viewing
    /// reposition the start point. Clicks while generating are ignored.
    pub fn handle_map_click(&self, point: LatLng) {
        let mut session = self.session();
        match &session.mode {
            Mode::Drawing { .. } => {
                // Mode already checked; append cannot be refused here.
                let _ = session.append_waypoint(point);
            }
            Mode::Exploring { routes, .. } => {
                if let Some(osm_id) = explorer::hit_test(routes, point, HIT_TOLERANCE_M) {
                    let _ = session.select_candidate(osm_id);
                    tracing::debug!(osm_id, "candidate selected by click");
                }
                // A miss is not handled further; it does not move the
                // start point.
            }
            Mode::Idle | Mode::Viewing { .. } => {
                session.set_user_location(point);
            }
            Mode::Generating => {}
        }
    }

    // ---- drawing ----

    pub fn start_drawing(&self) {
        self.session().start_drawing();
    }

    pub fn undo_waypoint(&self) {
        let _ = self.session().undo_waypoint();
    }

    pub fn clear_waypoints(&self) {
        let _ = self.session().clear_waypoints();
    }

    pub fn cancel_drawing(&self) {
        self.session().cancel_drawing();
    }

    /// Snap the drawn path to the network. Validation failures and
    /// gateway errors land in `Session::error`; success enters viewing.
    pub async fn finalize_drawing(&self) {
        let pending = match self.session().begin_finalize() {
            Ok(pending) => pending,
            Err(error) => {
                tracing::info!(%error, "finalize rejected");
                return;
            }
        };
        tracing::info!(points = pending.request.coordinates.len(), "snapping drawn path");
        let outcome = self.gateway.snap(pending.request).await;
        self.session()
            .complete_finalize(pending.token, outcome.map_err(error_message));
    }

    // ---- generation ----

    /// Generate a route from the current start point.
    pub async fn generate(&self, params: GenerateParams) {
        let pending = match self.session().begin_generate(&params) {
            Ok(pending) => pending,
            Err(error) => {
                tracing::info!(%error, "generate rejected");
                return;
            }
        };
        tracing::info!(
            distance_km = params.distance_km,
            loop_route = params.loop_route,
            "generating route"
        );
        let outcome = self.gateway.generate(pending.request).await;
        self.session()
            .complete_generate(pending.token, outcome.map_err(error_message));
    }

    pub fn clear_route(&self) {
        self.session().clear_route();
    }

    // ---- explorer ----

    /// Enter explorer mode (or refresh it) and run the proximity query
    /// with the session's current radius and route-type filter.
    pub async fn explore(&self) {
        let pending = match self.session().begin_explore() {
            Ok(pending) => pending,
            Err(error) => {
                tracing::info!(%error, "explore rejected");
                return;
            }
        };
        tracing::info!(radius_km = pending.request.radius_km, "exploring nearby routes");
        let outcome = self.gateway.explore(pending.request).await;
        self.session()
            .complete_explore(pending.token, outcome.map_err(error_message));
    }

    pub fn exit_explorer(&self) {
        self.session().exit_explorer();
    }

    pub fn set_radius(&self, radius_km: f64) {
        let _ = self.session().set_radius(radius_km);
    }

    pub fn toggle_route_type(&self, route_type: RouteType) {
        self.session().toggle_route_type(route_type);
    }

    /// Select a candidate from a non-map surface such as a results list.
    pub fn select_candidate(&self, osm_id: i64) {
        let _ = self.session().select_candidate(osm_id);
    }

    pub fn clear_selection(&self) {
        self.session().clear_selection();
    }

    // ---- saved routes ----

    /// Persist the currently viewed route under `name`.
    pub async fn save_current_route(&self, name: &str) {
        let request = match self.session().begin_save(name) {
            Ok(request) => request,
            Err(error) => {
                tracing::info!(%error, "save rejected");
                return;
            }
        };
        tracing::info!(name, "saving route");
        let outcome = self.gateway.save_route(request).await;
        self.session().complete_save(outcome.map_err(error_message));
    }

    /// Refresh the cached saved-route list. Best-effort: failures are
    /// logged and swallowed, the cache stays as it was.
    pub async fn refresh_saved_routes(&self) {
        match self.gateway.list_routes().await {
            Ok(routes) => {
                tracing::debug!(count = routes.len(), "saved-route list refreshed");
                self.session().set_saved_routes(routes);
            }
            Err(error) => tracing::warn!(%error, "saved-route list refresh failed"),
        }
    }

    /// Load a persisted route onto the map.
    pub async fn load_saved_route(&self, id: Uuid) {
        let pending = match self.session().begin_load_saved(id) {
            Ok(pending) => pending,
            Err(error) => {
                tracing::info!(%error, "load rejected");
                return;
            }
        };
        let outcome = self.gateway.get_route(id).await;
        self.session().complete_load_saved(
            pending.token,
            outcome.map(|detail| detail.into_route()).map_err(error_message),
        );
    }

    /// Delete a persisted route and drop it from the cache.
    pub async fn delete_saved_route(&self, id: Uuid) {
        self.session().loading = true;
        match self.gateway.delete_route(id).await {
            Ok(()) => {
                let mut session = self.session();
                session.loading = false;
                session.remove_saved(id);
            }
            Err(error) => {
                let mut session = self.session();
                session.loading = false;
                session.error = Some(error_message(error));
            }
        }
    }
}

/// One human-readable message for a failed gateway call, context chain
/// included.
fn error_message(error: anyhow::Error) -> String {
    format!("{error:#}")
}
