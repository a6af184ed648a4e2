//! The remote routing/elevation/storage service boundary.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ExploreRequest, ExploreResult, GenerateRequest, Route, SaveRouteRequest, SavedRouteDetail,
    SavedRouteSummary, SnapRequest,
};

/// Asynchronous access to the remote route service.
///
/// The session core drives these calls but never implements them; the
/// HTTP client lives in its own crate, and tests substitute an in-process
/// mock. Every method may fail with a transport or domain error; callers
/// convert failures to a single human-readable message.
#[async_trait]
pub trait RouteGateway: Send + Sync {
    /// Generate a route matching a target distance (and optionally an
    /// elevation gain) from an origin.
    async fn generate(&self, request: GenerateRequest) -> Result<Route>;

    /// Snap drawn waypoints (at least two) to the road/trail network.
    async fn snap(&self, request: SnapRequest) -> Result<Route>;

    /// Query pre-mapped routes around an origin.
    async fn explore(&self, request: ExploreRequest) -> Result<ExploreResult>;

    /// Persist a route under a name.
    async fn save_route(&self, request: SaveRouteRequest) -> Result<SavedRouteSummary>;

    /// List persisted routes, newest first.
    async fn list_routes(&self) -> Result<Vec<SavedRouteSummary>>;

    /// Fetch one persisted route with its full geometry.
    async fn get_route(&self, id: Uuid) -> Result<SavedRouteDetail>;

    /// Delete a persisted route.
    async fn delete_route(&self, id: Uuid) -> Result<()>;
}

/// A shared handle to a gateway is itself a gateway; calls are forwarded to
/// the inner value. Lets callers (and tests) hold the gateway behind an
/// `Arc` without wrapping every method by hand.
#[async_trait]
impl<T: RouteGateway + ?Sized> RouteGateway for Arc<T> {
    async fn generate(&self, request: GenerateRequest) -> Result<Route> {
        (**self).generate(request).await
    }

    async fn snap(&self, request: SnapRequest) -> Result<Route> {
        (**self).snap(request).await
    }

    async fn explore(&self, request: ExploreRequest) -> Result<ExploreResult> {
        (**self).explore(request).await
    }

    async fn save_route(&self, request: SaveRouteRequest) -> Result<SavedRouteSummary> {
        (**self).save_route(request).await
    }

    async fn list_routes(&self) -> Result<Vec<SavedRouteSummary>> {
        (**self).list_routes().await
    }

    async fn get_route(&self, id: Uuid) -> Result<SavedRouteDetail> {
        (**self).get_route(id).await
    }

    async fn delete_route(&self, id: Uuid) -> Result<()> {
        (**self).delete_route(id).await
    }
}
