//! Renderable map layers derived from session state.
//!
//! Layers are rebuilt from scratch on every sync rather than patched
//! incrementally; they are small, and a full rebuild keeps the derivation
//! trivially consistent with the session.

use serde::Serialize;
use serde_json::json;

use crate::models::Geometry;
use crate::session::{Mode, Session};
use crate::spatial::Bbox;

/// Padding in pixels requested around a fitted bounding box.
pub const FIT_PADDING_PX: f64 = 60.0;

/// Fill/line color for candidates whose category is not in the fixed map.
pub const DEFAULT_CATEGORY_COLOR: &str = "#64748b";

/// Fixed category→color mapping for explorer candidates.
pub fn category_color(route_type: &str) -> &'static str {
    match route_type {
        "hiking" => "#e8590c",
        "foot" => "#2f9e44",
        "bicycle" => "#1971c2",
        "mtb" => "#9c36b5",
        "running" => "#f08c00",
        _ => DEFAULT_CATEGORY_COLOR,
    }
}

/// One renderable feature: geometry plus presentation properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFeature {
    /// Stable id for hit-testing and selection (candidate `osm_id`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub geometry: Geometry,
    pub properties: serde_json::Value,
}

/// The four independent layers the map renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSet {
    pub route: Vec<MapFeature>,
    pub waypoints: Vec<MapFeature>,
    pub candidates: Vec<MapFeature>,
    pub selection: Vec<MapFeature>,
}

impl LayerSet {
    /// Derive all four layers from the current session state.
    pub fn build(session: &Session) -> Self {
        let mut layers = LayerSet::default();

        match &session.mode {
            Mode::Viewing { route } => {
                layers.route.push(MapFeature {
                    id: None,
                    geometry: Geometry::LineString(route.coordinates.clone()),
                    properties: json!({
                        "distance_km": route.distance_km,
                        "elevation_gain": route.elevation_gain,
                        "elevation_loss": route.elevation_loss,
                    }),
                });
            }
            Mode::Drawing { path } => {
                for (index, point) in path.points().iter().enumerate() {
                    layers.waypoints.push(MapFeature {
                        id: None,
                        geometry: Geometry::Point(point.position()),
                        properties: json!({ "index": index }),
                    });
                }
            }
            Mode::Exploring { routes, selection } => {
                for route in routes {
                    layers.candidates.push(MapFeature {
                        id: Some(route.osm_id),
                        geometry: route.geometry.clone(),
                        properties: json!({
                            "name": route.name,
                            "ref": route.reference,
                            "route_type": route.route_type,
                            "color": category_color(&route.route_type),
                        }),
                    });
                }
                if let Some(osm_id) = selection {
                    if let Some(route) = routes.iter().find(|route| route.osm_id == *osm_id) {
                        layers.selection.push(MapFeature {
                            id: Some(route.osm_id),
                            geometry: route.geometry.clone(),
                            properties: json!({
                                "name": route.name,
                                "route_type": route.route_type,
                                "color": category_color(&route.route_type),
                            }),
                        });
                    }
                }
            }
            Mode::Idle | Mode::Generating => {}
        }

        layers
    }
}

/// A request to fit the map viewport to a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportFit {
    pub bounds: Bbox,
    pub padding: f64,
}

/// Rebuilds layers from the session and detects when the viewport should
/// be refitted.
#[derive(Debug, Default)]
pub struct LayerSync {
    last: LayerSet,
}

impl LayerSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild all layers. Returns the new set and, when the route or
    /// selection layer changed to a non-empty value with more than one
    /// coordinate, a viewport-fit request over that layer's geometry.
    pub fn sync(&mut self, session: &Session) -> (LayerSet, Option<ViewportFit>) {
        let next = LayerSet::build(session);
        let fit = fit_for(&self.last.selection, &next.selection)
            .or_else(|| fit_for(&self.last.route, &next.route));
        if fit.is_some() {
            tracing::debug!(?fit, "viewport fit requested");
        }
        self.last = next.clone();
        (next, fit)
    }
}

/// Fit rule for one layer: it must have changed, be non-empty, and its
/// flattened geometry must span more than one coordinate.
fn fit_for(previous: &[MapFeature], current: &[MapFeature]) -> Option<ViewportFit> {
    if current.is_empty() || current == previous {
        return None;
    }
    let positions: Vec<_> = current
        .iter()
        .flat_map(|feature| feature.geometry.positions())
        .collect();
    if positions.len() < 2 {
        return None;
    }
    Bbox::from_positions(&positions).map(|bounds| ViewportFit {
        bounds,
        padding: FIT_PADDING_PX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExploredRoute, LatLng, Route};
    use crate::session::Session;

    fn viewing(coordinates: Vec<[f64; 2]>) -> Session {
        let mut session = Session::new();
        session.mode = Mode::Viewing {
            route: Route {
                coordinates,
                distance_km: 10.0,
                elevation_gain: None,
                elevation_loss: None,
                elevation_profile: Vec::new(),
            },
        };
        session
    }

    fn exploring(ids: &[i64], selection: Option<i64>) -> Session {
        let mut session = Session::new();
        session.mode = Mode::Exploring {
            routes: ids
                .iter()
                .map(|id| ExploredRoute {
                    osm_id: *id,
                    name: Some(format!("route {id}")),
                    reference: None,
                    route_type: "bicycle".to_string(),
                    network: None,
                    distance: None,
                    geometry: Geometry::LineString(vec![
                        [5.0 + *id as f64 * 0.01, 44.0],
                        [5.0 + *id as f64 * 0.01, 44.01],
                    ]),
                })
                .collect(),
            selection,
        };
        session
    }

    #[test]
    fn idle_session_has_empty_layers() {
        let mut sync = LayerSync::new();
        let (layers, fit) = sync.sync(&Session::new());
        assert!(layers.route.is_empty());
        assert!(layers.waypoints.is_empty());
        assert!(layers.candidates.is_empty());
        assert!(layers.selection.is_empty());
        assert!(fit.is_none());
    }

    #[test]
    fn waypoints_are_index_tagged_and_never_fit() {
        let mut session = Session::new();
        session.start_drawing();
        session.append_waypoint(LatLng::new(44.0, 5.0)).unwrap();
        session.append_waypoint(LatLng::new(44.1, 5.1)).unwrap();

        let mut sync = LayerSync::new();
        let (layers, fit) = sync.sync(&session);
        assert_eq!(layers.waypoints.len(), 2);
        assert_eq!(layers.waypoints[1].properties["index"], 1);
        assert!(fit.is_none());
    }

    #[test]
    fn new_route_requests_fit_once() {
        let mut sync = LayerSync::new();
        let session = viewing(vec![[5.0, 44.0], [5.2, 44.1]]);

        let (_, fit) = sync.sync(&session);
        let fit = fit.expect("route change should request a fit");
        assert_eq!(fit.bounds.min_lng, 5.0);
        assert_eq!(fit.bounds.max_lat, 44.1);
        assert_eq!(fit.padding, FIT_PADDING_PX);

        // Unchanged route: no refit.
        let (_, fit) = sync.sync(&session);
        assert!(fit.is_none());
    }

    #[test]
    fn single_point_route_does_not_fit() {
        let mut sync = LayerSync::new();
        let (_, fit) = sync.sync(&viewing(vec![[5.0, 44.0]]));
        assert!(fit.is_none());
    }

    #[test]
    fn candidates_are_colored_but_do_not_fit() {
        let mut sync = LayerSync::new();
        let (layers, fit) = sync.sync(&exploring(&[1, 2, 3], None));
        assert_eq!(layers.candidates.len(), 3);
        for feature in &layers.candidates {
            assert_eq!(feature.properties["color"], category_color("bicycle"));
        }
        assert!(layers.selection.is_empty());
        assert!(fit.is_none());
    }

    #[test]
    fn unknown_category_gets_default_color() {
        assert_eq!(category_color("horse"), DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn selecting_a_candidate_fits_its_bounds() {
        let mut sync = LayerSync::new();
        sync.sync(&exploring(&[1, 2], None));

        let (layers, fit) = sync.sync(&exploring(&[1, 2], Some(2)));
        assert_eq!(layers.selection.len(), 1);
        assert_eq!(layers.selection[0].id, Some(2));
        let fit = fit.expect("selection change should request a fit");
        assert!((fit.bounds.min_lng - 5.02).abs() < 1e-9);
        assert!((fit.bounds.max_lat - 44.01).abs() < 1e-9);
    }
}
