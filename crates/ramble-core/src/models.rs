//! Core data models for the route-planning session.
//!
//! These mirror the wire shapes of the remote routing/elevation/storage
//! service, so the gateway can serialize them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `[lng, lat]` pair in GeoJSON coordinate order.
pub type Position = [f64; 2];

/// A geographic point in the order map widgets hand them to us.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// This point as a GeoJSON position.
    pub fn position(&self) -> Position {
        [self.lng, self.lat]
    }
}

impl From<Position> for LatLng {
    fn from(position: Position) -> Self {
        Self {
            lat: position[1],
            lng: position[0],
        }
    }
}

/// GeoJSON geometry as served by the gateway.
///
/// Generated and snapped routes are always a single `LineString`; explored
/// trail relations may come back as a `MultiLineString` when their member
/// ways could not be merged into one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
}

impl Geometry {
    /// Flatten multi-part geometry into a single coordinate list.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(position) => vec![*position],
            Geometry::LineString(line) => line.clone(),
            Geometry::MultiLineString(lines) => lines.iter().flatten().copied().collect(),
        }
    }

    /// Total number of coordinates across all parts.
    pub fn coord_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(line) => line.len(),
            Geometry::MultiLineString(lines) => lines.iter().map(Vec::len).sum(),
        }
    }

    /// The line runs of this geometry. A point yields no runs.
    pub fn lines(&self) -> Vec<&[Position]> {
        match self {
            Geometry::Point(_) => Vec::new(),
            Geometry::LineString(line) => vec![line.as_slice()],
            Geometry::MultiLineString(lines) => lines.iter().map(Vec::as_slice).collect(),
        }
    }
}

/// One sample of an elevation profile. `elevation` is `None` where the
/// elevation service had no data for the sampled coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub distance_km: f64,
    pub elevation: Option<f64>,
    pub lat: f64,
    pub lng: f64,
}

/// The currently displayed generated or snapped route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered `[lng, lat]` coordinates of the route line.
    pub coordinates: Vec<Position>,
    pub distance_km: f64,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    /// Samples ordered by monotonically non-decreasing `distance_km`.
    pub elevation_profile: Vec<ElevationSample>,
}

impl Route {
    /// Build a route from the gateway's GeoJSON feature response.
    pub fn from_feature(feature: RouteFeature) -> Self {
        Self {
            coordinates: feature.geometry.positions(),
            distance_km: feature.properties.distance_km,
            elevation_gain: feature.properties.elevation_gain,
            elevation_loss: feature.properties.elevation_loss,
            elevation_profile: feature.elevation_profile,
        }
    }

    /// This route as the GeoJSON feature shape the gateway expects back
    /// when saving.
    pub fn to_feature(&self) -> RouteFeature {
        RouteFeature {
            feature_type: "Feature".to_string(),
            geometry: Geometry::LineString(self.coordinates.clone()),
            properties: RouteProperties {
                distance_km: self.distance_km,
                elevation_gain: self.elevation_gain,
                elevation_loss: self.elevation_loss,
            },
            elevation_profile: self.elevation_profile.clone(),
        }
    }
}

/// GeoJSON `Feature` carrying a route line, its summary properties and a
/// sibling elevation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: RouteProperties,
    #[serde(default)]
    pub elevation_profile: Vec<ElevationSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteProperties {
    pub distance_km: f64,
    #[serde(default)]
    pub elevation_gain: Option<f64>,
    #[serde(default)]
    pub elevation_loss: Option<f64>,
}

/// The fixed set of route categories the explorer can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Hiking,
    Foot,
    Bicycle,
    Mtb,
    Running,
}

impl RouteType {
    pub const ALL: [RouteType; 5] = [
        RouteType::Hiking,
        RouteType::Foot,
        RouteType::Bicycle,
        RouteType::Mtb,
        RouteType::Running,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Hiking => "hiking",
            RouteType::Foot => "foot",
            RouteType::Bicycle => "bicycle",
            RouteType::Mtb => "mtb",
            RouteType::Running => "running",
        }
    }
}

/// One pre-mapped trail relation returned by an explore query.
///
/// `route_type` stays a free string: the server reports whatever category
/// the relation is tagged with, which is not limited to [`RouteType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploredRoute {
    pub osm_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    pub route_type: String,
    #[serde(default)]
    pub network: Option<String>,
    /// Length in km, when the server could compute it.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(rename = "geojson")]
    pub geometry: Geometry,
}

/// Result of an explore query; replaced wholesale per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreResult {
    pub routes: Vec<ExploredRoute>,
    pub query_center: LatLng,
    pub query_radius_km: f64,
}

/// Server-owned projection of a persisted route, as listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRouteSummary {
    pub id: Uuid,
    pub name: String,
    pub distance_km: f64,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Full persisted route, as fetched by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRouteDetail {
    pub id: Uuid,
    pub name: String,
    pub distance_km: f64,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub geojson: RouteFeature,
    #[serde(default)]
    pub elevation_profile: Option<Vec<ElevationSample>>,
}

impl SavedRouteDetail {
    /// Rehydrate the stored feature into a displayable route.
    pub fn into_route(self) -> Route {
        let mut route = Route::from_feature(self.geojson);
        if route.elevation_profile.is_empty() {
            route.elevation_profile = self.elevation_profile.unwrap_or_default();
        }
        route
    }
}

/// Request body for route generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    #[serde(rename = "loop")]
    pub loop_route: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_target: Option<f64>,
    pub prefer_trails: bool,
}

/// Request body for snapping drawn waypoints to the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapRequest {
    pub coordinates: Vec<Position>,
}

/// Request body for a proximity explore query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreRequest {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub route_types: Vec<String>,
}

/// Request body for persisting the current route under a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRouteRequest {
    pub name: String,
    pub geojson: RouteFeature,
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_profile: Option<Vec<ElevationSample>>,
}
