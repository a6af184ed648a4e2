//! Session core for interactive outdoor route planning.
//!
//! Owns the interaction mode, validates user input, derives renderable map
//! layers from state, resolves clicks against rendered geometry and drives
//! asynchronous calls to the remote routing/elevation/storage service.

pub mod controller;
pub mod explorer;
pub mod gateway;
pub mod layers;
pub mod models;
pub mod session;
pub mod spatial;
pub mod waypoints;

pub use controller::SessionController;
pub use explorer::{RouteTypeFilter, HIT_TOLERANCE_M};
pub use gateway::RouteGateway;
pub use layers::{category_color, LayerSet, LayerSync, MapFeature, ViewportFit};
pub use models::{
    ElevationSample, ExploreRequest, ExploreResult, ExploredRoute, GenerateRequest, Geometry,
    LatLng, Position, Route, RouteFeature, RouteProperties, RouteType, SaveRouteRequest,
    SavedRouteDetail, SavedRouteSummary, SnapRequest,
};
pub use session::{GenerateParams, Mode, Session, ValidationError};
pub use spatial::{haversine_distance, Bbox};
pub use waypoints::WaypointPath;
