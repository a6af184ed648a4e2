//! End-to-end controller tests against an in-process mock gateway.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use ramble_core::gateway::RouteGateway;
use ramble_core::layers::category_color;
use ramble_core::models::{
    ElevationSample, ExploreRequest, ExploreResult, ExploredRoute, GenerateRequest, Geometry,
    LatLng, Route, SaveRouteRequest, SavedRouteDetail, SavedRouteSummary, SnapRequest,
};
use ramble_core::session::GenerateParams;
use ramble_core::{RouteType, SessionController};

type Scripted<T> = Mutex<VecDeque<Result<T, String>>>;

#[derive(Default)]
struct MockGateway {
    generate_results: Scripted<Route>,
    snap_results: Scripted<Route>,
    explore_results: Scripted<ExploreResult>,
    save_results: Scripted<SavedRouteSummary>,
    list_results: Scripted<Vec<SavedRouteSummary>>,
    detail_results: Scripted<SavedRouteDetail>,

    generate_requests: Mutex<Vec<GenerateRequest>>,
    snap_requests: Mutex<Vec<SnapRequest>>,
    explore_requests: Mutex<Vec<ExploreRequest>>,
    save_requests: Mutex<Vec<SaveRouteRequest>>,
    deleted: Mutex<Vec<Uuid>>,

    /// When set, the next generate/snap call blocks until notified.
    gate: Mutex<Option<Arc<Notify>>>,
    /// Signaled whenever a generate/snap call has been received.
    entered: Notify,
}

impl MockGateway {
    fn script<T>(queue: &Scripted<T>, result: Result<T, String>) {
        queue.lock().unwrap().push_back(result);
    }

    fn pop<T>(queue: &Scripted<T>, what: &str) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(format!("no scripted {what} result")))
            .map_err(|message| anyhow!(message))
    }

    fn install_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn wait_at_gate(&self) {
        self.entered.notify_one();
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl RouteGateway for MockGateway {
    async fn generate(&self, request: GenerateRequest) -> Result<Route> {
        self.generate_requests.lock().unwrap().push(request);
        let result = MockGateway::pop(&self.generate_results, "generate");
        self.wait_at_gate().await;
        result
    }

    async fn snap(&self, request: SnapRequest) -> Result<Route> {
        self.snap_requests.lock().unwrap().push(request);
        let result = MockGateway::pop(&self.snap_results, "snap");
        self.wait_at_gate().await;
        result
    }

    async fn explore(&self, request: ExploreRequest) -> Result<ExploreResult> {
        self.explore_requests.lock().unwrap().push(request);
        MockGateway::pop(&self.explore_results, "explore")
    }

    async fn save_route(&self, request: SaveRouteRequest) -> Result<SavedRouteSummary> {
        self.save_requests.lock().unwrap().push(request);
        MockGateway::pop(&self.save_results, "save")
    }

    async fn list_routes(&self) -> Result<Vec<SavedRouteSummary>> {
        MockGateway::pop(&self.list_results, "list")
    }

    async fn get_route(&self, _id: Uuid) -> Result<SavedRouteDetail> {
        MockGateway::pop(&self.detail_results, "detail")
    }

    async fn delete_route(&self, id: Uuid) -> Result<()> {
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

fn setup() -> (Arc<SessionController<Arc<MockGateway>>>, Arc<MockGateway>) {
    let mock = Arc::new(MockGateway::default());
    let controller = Arc::new(SessionController::new(mock.clone()));
    controller.seed_user_location(Some(LatLng::new(44.06, 5.05)));
    (controller, mock)
}

fn route(distance_km: f64) -> Route {
    Route {
        coordinates: vec![[5.05, 44.06], [5.08, 44.09], [5.06, 44.07]],
        distance_km,
        elevation_gain: Some(180.0),
        elevation_loss: Some(176.0),
        elevation_profile: vec![
            ElevationSample {
                distance_km: 0.0,
                elevation: Some(310.0),
                lat: 44.06,
                lng: 5.05,
            },
            ElevationSample {
                distance_km,
                elevation: Some(312.0),
                lat: 44.07,
                lng: 5.06,
            },
        ],
    }
}

/// Three bicycle candidates on parallel north-south lines, 0.01° apart.
fn bicycle_candidates() -> ExploreResult {
    let candidate = |osm_id: i64, lng: f64| ExploredRoute {
        osm_id,
        name: Some(format!("Voie {osm_id}")),
        reference: None,
        route_type: "bicycle".to_string(),
        network: Some("lcn".to_string()),
        distance: Some(12.0),
        geometry: Geometry::LineString(vec![[lng, 44.0], [lng, 44.01]]),
    };
    ExploreResult {
        routes: vec![candidate(10, 5.00), candidate(20, 5.01), candidate(30, 5.02)],
        query_center: LatLng::new(44.06, 5.05),
        query_radius_km: 20.0,
    }
}

fn summary(name: &str) -> SavedRouteSummary {
    SavedRouteSummary {
        id: Uuid::new_v4(),
        name: name.to_string(),
        distance_km: 10.2,
        elevation_gain: Some(180.0),
        elevation_loss: Some(176.0),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn generate_success_transitions_to_viewing() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.generate_results, Ok(route(10.2)));

    let gate = mock.install_gate();
    let task = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.generate(GenerateParams::default()).await;
        })
    };

    // While the call is in flight the session is busy and in generating.
    mock.entered.notified().await;
    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "generating");
        assert!(session.loading);
    });

    gate.notify_one();
    task.await.unwrap();

    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "viewing");
        assert_eq!(session.route().unwrap().distance_km, 10.2);
        assert!(!session.loading);
        assert!(session.error.is_none());
    });

    let requests = mock.generate_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].lat, 44.06);
    assert_eq!(requests[0].lng, 5.05);
    assert_eq!(requests[0].distance_km, 10.0);
    assert!(requests[0].loop_route);
    assert!(requests[0].elevation_target.is_none());
}

#[tokio::test]
async fn generate_failure_reverts_to_idle() {
    let (controller, mock) = setup();
    MockGateway::script(
        &mock.generate_results,
        Err("route generation failed: 502 Bad Gateway".to_string()),
    );

    controller.generate(GenerateParams::default()).await;

    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "idle");
        assert!(session.error.is_some());
        assert!(!session.loading);
    });
}

#[tokio::test]
async fn generate_without_location_never_calls_gateway() {
    let mock = Arc::new(MockGateway::default());
    let controller = SessionController::new(mock.clone());

    controller.generate(GenerateParams::default()).await;

    assert!(mock.generate_requests.lock().unwrap().is_empty());
    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "idle");
        assert!(session.error.is_some());
    });
}

#[tokio::test]
async fn superseding_generate_discards_the_late_first_response() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.generate_results, Ok(route(11.0)));
    MockGateway::script(&mock.generate_results, Ok(route(22.0)));

    // First request parks at the gate with the 11 km route already popped.
    let gate = mock.install_gate();
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.generate(GenerateParams::default()).await;
        })
    };
    mock.entered.notified().await;

    // Second request completes immediately and wins.
    controller.generate(GenerateParams::default()).await;
    controller.with_session(|session| {
        assert_eq!(session.route().unwrap().distance_km, 22.0);
    });

    // The first response arrives last and must be discarded.
    gate.notify_one();
    first.await.unwrap();
    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "viewing");
        assert_eq!(session.route().unwrap().distance_km, 22.0);
        assert!(!session.loading);
    });
}

#[tokio::test]
async fn finalize_with_short_path_stays_drawing_without_gateway_call() {
    let (controller, mock) = setup();
    controller.start_drawing();
    controller.handle_map_click(LatLng::new(44.06, 5.05));

    controller.finalize_drawing().await;

    assert!(mock.snap_requests.lock().unwrap().is_empty());
    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "drawing");
        assert!(session.error.is_some());
        assert_eq!(session.waypoints().unwrap().len(), 1);
    });
}

#[tokio::test]
async fn finalize_snaps_the_drawn_path() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.snap_results, Ok(route(3.4)));

    controller.start_drawing();
    controller.handle_map_click(LatLng::new(44.06, 5.05));
    controller.handle_map_click(LatLng::new(44.07, 5.06));
    controller.finalize_drawing().await;

    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "viewing");
        assert_eq!(session.route().unwrap().distance_km, 3.4);
    });

    let requests = mock.snap_requests.lock().unwrap();
    assert_eq!(requests[0].coordinates, vec![[5.05, 44.06], [5.06, 44.07]]);

    // The draft layer is gone once the route is displayed.
    let (layers, _) = controller.sync_layers();
    assert!(layers.waypoints.is_empty());
    assert_eq!(layers.route.len(), 1);
}

#[tokio::test]
async fn snap_completing_after_cancel_is_discarded() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.snap_results, Ok(route(3.4)));

    controller.start_drawing();
    controller.handle_map_click(LatLng::new(44.06, 5.05));
    controller.handle_map_click(LatLng::new(44.07, 5.06));

    let gate = mock.install_gate();
    let task = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller.finalize_drawing().await;
        })
    };
    mock.entered.notified().await;

    controller.cancel_drawing();
    gate.notify_one();
    task.await.unwrap();

    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "idle");
        assert!(session.route().is_none());
        assert!(!session.loading);
    });
}

#[tokio::test]
async fn explore_scenario_colors_candidates_and_fits_clicked_selection() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.explore_results, Ok(bicycle_candidates()));

    controller.set_radius(20.0);
    controller.toggle_route_type(RouteType::Bicycle);
    controller.toggle_route_type(RouteType::Hiking);
    controller.toggle_route_type(RouteType::Foot);
    controller.explore().await;

    {
        let requests = mock.explore_requests.lock().unwrap();
        assert_eq!(requests[0].radius_km, 20.0);
        assert_eq!(requests[0].route_types, vec!["bicycle".to_string()]);
    }

    let (layers, _) = controller.sync_layers();
    assert_eq!(layers.candidates.len(), 3);
    for feature in &layers.candidates {
        assert_eq!(feature.properties["color"], category_color("bicycle"));
    }
    assert!(layers.selection.is_empty());

    // Click on the middle candidate's line.
    controller.handle_map_click(LatLng::new(44.005, 5.01));
    controller.with_session(|session| {
        assert_eq!(session.selection(), Some(20));
    });

    let (layers, fit) = controller.sync_layers();
    assert_eq!(layers.selection.len(), 1);
    assert_eq!(layers.selection[0].id, Some(20));
    let fit = fit.expect("selecting a candidate should fit the viewport");
    assert!((fit.bounds.min_lng - 5.01).abs() < 1e-9);
    assert!((fit.bounds.min_lat - 44.0).abs() < 1e-9);
    assert!((fit.bounds.max_lat - 44.01).abs() < 1e-9);
}

#[tokio::test]
async fn explorer_click_miss_keeps_start_point() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.explore_results, Ok(bicycle_candidates()));
    controller.explore().await;

    // Far from every candidate: neither selects nor repositions.
    controller.handle_map_click(LatLng::new(44.5, 5.5));
    controller.with_session(|session| {
        assert_eq!(session.selection(), None);
        assert_eq!(session.user_location.unwrap().lat, 44.06);
    });
}

#[tokio::test]
async fn click_repositions_start_point_when_idle_or_viewing() {
    let (controller, _mock) = setup();
    controller.handle_map_click(LatLng::new(45.0, 6.0));
    controller.with_session(|session| {
        assert_eq!(session.user_location.unwrap().lng, 6.0);
        assert_eq!(session.mode.name(), "idle");
    });
}

#[tokio::test]
async fn fresh_query_drops_selection_of_replaced_candidates() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.explore_results, Ok(bicycle_candidates()));
    MockGateway::script(
        &mock.explore_results,
        Ok(ExploreResult {
            routes: Vec::new(),
            query_center: LatLng::new(44.06, 5.05),
            query_radius_km: 5.0,
        }),
    );

    controller.explore().await;
    controller.select_candidate(30);
    controller.with_session(|session| assert_eq!(session.selection(), Some(30)));

    controller.explore().await;
    controller.with_session(|session| {
        assert_eq!(session.selection(), None);
        assert!(session.explored_routes().is_empty());
    });
}

#[tokio::test]
async fn saved_route_lifecycle_updates_the_cache() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.generate_results, Ok(route(10.2)));
    MockGateway::script(&mock.save_results, Ok(summary("morning loop")));
    MockGateway::script(&mock.list_results, Ok(vec![summary("older one")]));

    controller.generate(GenerateParams::default()).await;
    controller.refresh_saved_routes().await;
    controller.with_session(|session| assert_eq!(session.saved_routes.len(), 1));

    controller.save_current_route("morning loop").await;
    controller.with_session(|session| {
        assert_eq!(session.saved_routes.len(), 2);
        assert_eq!(session.saved_routes[0].name, "morning loop");
        assert!(session.error.is_none());
    });

    let saved = mock.save_requests.lock().unwrap();
    assert_eq!(saved[0].name, "morning loop");
    assert_eq!(saved[0].distance_km, 10.2);
}

#[tokio::test]
async fn list_refresh_failure_is_silent() {
    let (controller, mock) = setup();
    MockGateway::script(&mock.list_results, Err("backend offline".to_string()));

    controller.refresh_saved_routes().await;

    controller.with_session(|session| {
        assert!(session.error.is_none());
        assert!(session.saved_routes.is_empty());
    });
}

#[tokio::test]
async fn loading_a_saved_route_enters_viewing() {
    let (controller, mock) = setup();
    let stored = summary("saved one");
    MockGateway::script(
        &mock.detail_results,
        Ok(SavedRouteDetail {
            id: stored.id,
            name: stored.name.clone(),
            distance_km: stored.distance_km,
            elevation_gain: stored.elevation_gain,
            elevation_loss: stored.elevation_loss,
            created_at: stored.created_at,
            geojson: route(10.2).to_feature(),
            elevation_profile: None,
        }),
    );

    controller.load_saved_route(stored.id).await;

    controller.with_session(|session| {
        assert_eq!(session.mode.name(), "viewing");
        assert_eq!(session.route().unwrap().distance_km, 10.2);
    });
}

#[tokio::test]
async fn deleting_a_saved_route_drops_it_from_the_cache() {
    let (controller, mock) = setup();
    let kept = summary("kept");
    let dropped = summary("dropped");
    MockGateway::script(&mock.list_results, Ok(vec![kept.clone(), dropped.clone()]));

    controller.refresh_saved_routes().await;
    controller.delete_saved_route(dropped.id).await;

    assert_eq!(mock.deleted.lock().unwrap().as_slice(), &[dropped.id]);
    controller.with_session(|session| {
        assert_eq!(session.saved_routes.len(), 1);
        assert_eq!(session.saved_routes[0].id, kept.id);
    });
}
