//! Session state and the interaction-mode state machine.
//!
//! All transitions are synchronous. Asynchronous gateway operations are
//! split into a `begin_*` step that validates, moves the mode and issues a
//! generation token, and a `complete_*` step that applies the outcome only
//! if the token is still current and the session is still in the mode the
//! operation belongs to. Everything else is discarded wholesale.

use thiserror::Error;
use uuid::Uuid;

use crate::explorer::RouteTypeFilter;
use crate::models::{
    ExploreRequest, ExploreResult, ExploredRoute, GenerateRequest, LatLng, Route, RouteType,
    SaveRouteRequest, SavedRouteSummary, SnapRequest,
};
use crate::waypoints::WaypointPath;

pub const RADIUS_MIN_KM: f64 = 1.0;
pub const RADIUS_MAX_KM: f64 = 20.0;
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const DISTANCE_MAX_KM: f64 = 100.0;

/// What the session is doing, carrying only the data valid in that mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Drawing {
        path: WaypointPath,
    },
    Generating,
    Exploring {
        routes: Vec<ExploredRoute>,
        selection: Option<i64>,
    },
    Viewing {
        route: Route,
    },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Drawing { .. } => "drawing",
            Mode::Generating => "generating",
            Mode::Exploring { .. } => "exploring",
            Mode::Viewing { .. } => "viewing",
        }
    }
}

/// Input rejected before any gateway call. Stored into `Session::error` as
/// display text; the mode never changes on validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("set a start point on the map first")]
    NoStartPoint,
    #[error("draw at least two waypoints before snapping")]
    TooFewWaypoints,
    #[error("target distance must be between 0 and {DISTANCE_MAX_KM} km")]
    DistanceOutOfRange,
    #[error("elevation target must not be negative")]
    NegativeElevationTarget,
    #[error("explore radius must be between {RADIUS_MIN_KM} and {RADIUS_MAX_KM} km")]
    RadiusOutOfRange,
    #[error("no explored route with id {0}")]
    UnknownCandidate(i64),
    #[error("operation not available while {0}")]
    IllegalInMode(&'static str),
}

/// The asynchronous operation kinds that replace session state on
/// completion, each with its own generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Generate,
    Snap,
    Explore,
    Load,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OpTokens {
    generate: u64,
    snap: u64,
    explore: u64,
    load: u64,
}

impl OpTokens {
    fn slot(&mut self, kind: OpKind) -> &mut u64 {
        match kind {
            OpKind::Generate => &mut self.generate,
            OpKind::Snap => &mut self.snap,
            OpKind::Explore => &mut self.explore,
            OpKind::Load => &mut self.load,
        }
    }

    /// Issue the next token for `kind`, superseding any in-flight call.
    fn issue(&mut self, kind: OpKind) -> u64 {
        let slot = self.slot(kind);
        *slot += 1;
        *slot
    }

    fn latest(&self, kind: OpKind) -> u64 {
        match kind {
            OpKind::Generate => self.generate,
            OpKind::Snap => self.snap,
            OpKind::Explore => self.explore,
            OpKind::Load => self.load,
        }
    }

    /// Invalidate every pending token so late responses are discarded.
    fn invalidate_all(&mut self) {
        self.generate += 1;
        self.snap += 1;
        self.explore += 1;
        self.load += 1;
    }
}

/// A validated operation ready to be sent to the gateway, tagged with the
/// token its completion must present.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending<T> {
    pub token: u64,
    pub request: T,
}

/// Parameters for route generation, as collected from UI inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    pub distance_km: f64,
    pub loop_route: bool,
    pub elevation_target: Option<f64>,
    pub prefer_trails: bool,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            distance_km: 10.0,
            loop_route: true,
            elevation_target: None,
            prefer_trails: true,
        }
    }
}

/// The single mutable state of one planning session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: Mode,
    pub user_location: Option<LatLng>,
    pub loading: bool,
    pub error: Option<String>,
    /// Explore query inputs; kept across modes so the UI sliders survive
    /// entering and leaving explorer mode.
    pub radius_km: f64,
    pub filter: RouteTypeFilter,
    /// Cache of the saved-route list as last fetched; not authoritative.
    pub saved_routes: Vec<SavedRouteSummary>,
    tokens: OpTokens,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            user_location: None,
            loading: false,
            error: None,
            radius_km: DEFAULT_RADIUS_KM,
            filter: RouteTypeFilter::default(),
            saved_routes: Vec::new(),
            tokens: OpTokens::default(),
        }
    }

    pub fn route(&self) -> Option<&Route> {
        match &self.mode {
            Mode::Viewing { route } => Some(route),
            _ => None,
        }
    }

    pub fn waypoints(&self) -> Option<&WaypointPath> {
        match &self.mode {
            Mode::Drawing { path } => Some(path),
            _ => None,
        }
    }

    pub fn explored_routes(&self) -> &[ExploredRoute] {
        match &self.mode {
            Mode::Exploring { routes, .. } => routes,
            _ => &[],
        }
    }

    pub fn selection(&self) -> Option<i64> {
        match &self.mode {
            Mode::Exploring { selection, .. } => *selection,
            _ => None,
        }
    }

    pub fn set_user_location(&mut self, location: LatLng) {
        self.user_location = Some(location);
    }

    fn reject(&mut self, error: ValidationError) -> ValidationError {
        self.error = Some(error.to_string());
        error
    }

    fn abandon_pending(&mut self) {
        self.tokens.invalidate_all();
        self.loading = false;
    }

    // ---- drawing ----

    /// Enter drawing mode, dropping any current route and waypoints.
    /// No-op when already drawing.
    pub fn start_drawing(&mut self) {
        if matches!(self.mode, Mode::Drawing { .. }) {
            return;
        }
        self.abandon_pending();
        self.mode = Mode::Drawing {
            path: WaypointPath::new(),
        };
        self.error = None;
    }

    /// Add a drawn waypoint; refused outside drawing mode.
    pub fn append_waypoint(&mut self, point: LatLng) -> Result<(), ValidationError> {
        match &mut self.mode {
            Mode::Drawing { path } => {
                path.append(point);
                Ok(())
            }
            other => {
                let name = other.name();
                Err(self.reject(ValidationError::IllegalInMode(name)))
            }
        }
    }

    /// Remove the last drawn waypoint; no-op on an empty path.
    pub fn undo_waypoint(&mut self) -> Result<(), ValidationError> {
        match &mut self.mode {
            Mode::Drawing { path } => {
                path.undo();
                Ok(())
            }
            other => {
                let name = other.name();
                Err(self.reject(ValidationError::IllegalInMode(name)))
            }
        }
    }

    /// Empty the drawn path without leaving drawing mode.
    pub fn clear_waypoints(&mut self) -> Result<(), ValidationError> {
        match &mut self.mode {
            Mode::Drawing { path } => {
                path.clear();
                Ok(())
            }
            other => {
                let name = other.name();
                Err(self.reject(ValidationError::IllegalInMode(name)))
            }
        }
    }

    /// Leave drawing mode without snapping; drops the path and invalidates
    /// any pending snap so a late response cannot resurrect it.
    pub fn cancel_drawing(&mut self) {
        if matches!(self.mode, Mode::Drawing { .. }) {
            self.abandon_pending();
            self.mode = Mode::Idle;
        }
    }

    /// Validate the drawn path and stage the snap call.
    pub fn begin_finalize(&mut self) -> Result<Pending<SnapRequest>, ValidationError> {
        let Mode::Drawing { path } = &self.mode else {
            let name = self.mode.name();
            return Err(self.reject(ValidationError::IllegalInMode(name)));
        };
        if path.len() < 2 {
            return Err(self.reject(ValidationError::TooFewWaypoints));
        }
        let request = SnapRequest {
            coordinates: path.positions(),
        };
        self.loading = true;
        self.error = None;
        Ok(Pending {
            token: self.tokens.issue(OpKind::Snap),
            request,
        })
    }

    /// Apply a snap outcome. A success replaces the drawn path with the
    /// snapped route; a failure keeps the session in drawing mode.
    pub fn complete_finalize(&mut self, token: u64, outcome: Result<Route, String>) {
        if token != self.tokens.latest(OpKind::Snap) {
            tracing::warn!(token, "discarding stale snap completion");
            return;
        }
        if !matches!(self.mode, Mode::Drawing { .. }) {
            tracing::warn!(mode = self.mode.name(), "discarding snap completion outside drawing");
            return;
        }
        self.loading = false;
        match outcome {
            Ok(route) => {
                self.error = None;
                self.mode = Mode::Viewing { route };
            }
            Err(message) => self.error = Some(message),
        }
    }

    // ---- generation ----

    /// Validate generation inputs and stage the gateway call.
    pub fn begin_generate(
        &mut self,
        params: &GenerateParams,
    ) -> Result<Pending<GenerateRequest>, ValidationError> {
        match self.mode {
            Mode::Idle | Mode::Viewing { .. } | Mode::Generating => {}
            _ => {
                let name = self.mode.name();
                return Err(self.reject(ValidationError::IllegalInMode(name)));
            }
        }
        let Some(location) = self.user_location else {
            return Err(self.reject(ValidationError::NoStartPoint));
        };
        if params.distance_km <= 0.0 || params.distance_km > DISTANCE_MAX_KM {
            return Err(self.reject(ValidationError::DistanceOutOfRange));
        }
        if params.elevation_target.is_some_and(|target| target < 0.0) {
            return Err(self.reject(ValidationError::NegativeElevationTarget));
        }

        self.mode = Mode::Generating;
        self.loading = true;
        self.error = None;
        Ok(Pending {
            token: self.tokens.issue(OpKind::Generate),
            request: GenerateRequest {
                lat: location.lat,
                lng: location.lng,
                distance_km: params.distance_km,
                loop_route: params.loop_route,
                elevation_target: params.elevation_target,
                prefer_trails: params.prefer_trails,
            },
        })
    }

    /// Apply a generation outcome: success shows the route, failure falls
    /// back to idle.
    pub fn complete_generate(&mut self, token: u64, outcome: Result<Route, String>) {
        if token != self.tokens.latest(OpKind::Generate) {
            tracing::warn!(token, "discarding stale generate completion");
            return;
        }
        if !matches!(self.mode, Mode::Generating) {
            tracing::warn!(
                mode = self.mode.name(),
                "discarding generate completion outside generating"
            );
            return;
        }
        self.loading = false;
        match outcome {
            Ok(route) => {
                self.error = None;
                self.mode = Mode::Viewing { route };
            }
            Err(message) => {
                self.error = Some(message);
                self.mode = Mode::Idle;
            }
        }
    }

    /// Drop the currently viewed route.
    pub fn clear_route(&mut self) {
        if matches!(self.mode, Mode::Viewing { .. }) {
            self.mode = Mode::Idle;
            self.error = None;
        }
    }

    // ---- explorer ----

    /// Enter explorer mode (keeping any current candidate set while a
    /// refresh is in flight) and stage the proximity query.
    pub fn begin_explore(&mut self) -> Result<Pending<ExploreRequest>, ValidationError> {
        let Some(location) = self.user_location else {
            return Err(self.reject(ValidationError::NoStartPoint));
        };
        if !(RADIUS_MIN_KM..=RADIUS_MAX_KM).contains(&self.radius_km) {
            return Err(self.reject(ValidationError::RadiusOutOfRange));
        }

        if !matches!(self.mode, Mode::Exploring { .. }) {
            self.abandon_pending();
            self.mode = Mode::Exploring {
                routes: Vec::new(),
                selection: None,
            };
        }
        self.loading = true;
        self.error = None;
        Ok(Pending {
            token: self.tokens.issue(OpKind::Explore),
            request: ExploreRequest {
                lat: location.lat,
                lng: location.lng,
                radius_km: self.radius_km,
                route_types: self.filter.to_strings(),
            },
        })
    }

    /// Apply an explore outcome. The candidate set is replaced wholesale
    /// and the selection cleared; a failure keeps the previous candidates.
    pub fn complete_explore(&mut self, token: u64, outcome: Result<ExploreResult, String>) {
        if token != self.tokens.latest(OpKind::Explore) {
            tracing::warn!(token, "discarding stale explore completion");
            return;
        }
        let Mode::Exploring { routes, selection } = &mut self.mode else {
            tracing::warn!(
                mode = self.mode.name(),
                "discarding explore completion outside exploring"
            );
            return;
        };
        self.loading = false;
        match outcome {
            Ok(result) => {
                *routes = result.routes;
                *selection = None;
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Leave explorer mode, dropping candidates and selection.
    pub fn exit_explorer(&mut self) {
        if matches!(self.mode, Mode::Exploring { .. }) {
            self.abandon_pending();
            self.mode = Mode::Idle;
            self.error = None;
        }
    }

    /// Select a candidate by id; the id must be in the current set.
    pub fn select_candidate(&mut self, osm_id: i64) -> Result<(), ValidationError> {
        let Mode::Exploring { routes, selection } = &mut self.mode else {
            let name = self.mode.name();
            return Err(self.reject(ValidationError::IllegalInMode(name)));
        };
        if !routes.iter().any(|route| route.osm_id == osm_id) {
            return Err(self.reject(ValidationError::UnknownCandidate(osm_id)));
        }
        *selection = Some(osm_id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if let Mode::Exploring { selection, .. } = &mut self.mode {
            *selection = None;
        }
    }

    pub fn set_radius(&mut self, radius_km: f64) -> Result<(), ValidationError> {
        if !(RADIUS_MIN_KM..=RADIUS_MAX_KM).contains(&radius_km) {
            return Err(self.reject(ValidationError::RadiusOutOfRange));
        }
        self.radius_km = radius_km;
        Ok(())
    }

    pub fn toggle_route_type(&mut self, route_type: RouteType) -> bool {
        self.filter.toggle(route_type)
    }

    // ---- saved routes ----

    /// Stage persisting the currently viewed route under `name`.
    pub fn begin_save(&mut self, name: &str) -> Result<SaveRouteRequest, ValidationError> {
        let Mode::Viewing { route } = &self.mode else {
            let mode_name = self.mode.name();
            return Err(self.reject(ValidationError::IllegalInMode(mode_name)));
        };
        let request = SaveRouteRequest {
            name: name.to_string(),
            geojson: route.to_feature(),
            distance_km: route.distance_km,
            elevation_gain: route.elevation_gain,
            elevation_loss: route.elevation_loss,
            elevation_profile: if route.elevation_profile.is_empty() {
                None
            } else {
                Some(route.elevation_profile.clone())
            },
        };
        self.loading = true;
        self.error = None;
        Ok(request)
    }

    /// Apply a save outcome; the new summary goes to the front of the
    /// cached list, matching the server's newest-first ordering.
    pub fn complete_save(&mut self, outcome: Result<SavedRouteSummary, String>) {
        self.loading = false;
        match outcome {
            Ok(summary) => self.saved_routes.insert(0, summary),
            Err(message) => self.error = Some(message),
        }
    }

    /// Stage loading a persisted route onto the map.
    pub fn begin_load_saved(&mut self, id: Uuid) -> Result<Pending<Uuid>, ValidationError> {
        match self.mode {
            Mode::Idle | Mode::Viewing { .. } => {}
            _ => {
                let name = self.mode.name();
                return Err(self.reject(ValidationError::IllegalInMode(name)));
            }
        }
        self.loading = true;
        self.error = None;
        Ok(Pending {
            token: self.tokens.issue(OpKind::Load),
            request: id,
        })
    }

    /// Apply a load outcome; success enters viewing mode.
    pub fn complete_load_saved(&mut self, token: u64, outcome: Result<Route, String>) {
        if token != self.tokens.latest(OpKind::Load) {
            tracing::warn!(token, "discarding stale load completion");
            return;
        }
        match self.mode {
            Mode::Idle | Mode::Viewing { .. } => {}
            _ => {
                tracing::warn!(
                    mode = self.mode.name(),
                    "discarding load completion in incompatible mode"
                );
                return;
            }
        }
        self.loading = false;
        match outcome {
            Ok(route) => {
                self.error = None;
                self.mode = Mode::Viewing { route };
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Replace the cached saved-route list.
    pub fn set_saved_routes(&mut self, routes: Vec<SavedRouteSummary>) {
        self.saved_routes = routes;
    }

    /// Drop a deleted route from the cache.
    pub fn remove_saved(&mut self, id: Uuid) {
        self.saved_routes.retain(|summary| summary.id != id);
    }
}
