//! Explorer route-type filter and candidate hit-testing.

use crate::models::{ExploredRoute, LatLng, RouteType};
use crate::spatial::distance_to_geometry_m;

/// How close (in meters on the ground) a click must land to a candidate's
/// geometry to count as a hit.
pub const HIT_TOLERANCE_M: f64 = 30.0;

/// The set of route categories an explore query asks for.
///
/// Guaranteed non-empty: disabling the sole remaining type is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTypeFilter {
    enabled: Vec<RouteType>,
}

impl Default for RouteTypeFilter {
    /// The server-side default query: hiking and foot routes.
    fn default() -> Self {
        Self {
            enabled: vec![RouteType::Hiking, RouteType::Foot],
        }
    }
}

impl RouteTypeFilter {
    /// Filter with every known category enabled.
    pub fn all() -> Self {
        Self {
            enabled: RouteType::ALL.to_vec(),
        }
    }

    pub fn is_enabled(&self, route_type: RouteType) -> bool {
        self.enabled.contains(&route_type)
    }

    /// Enable a disabled type, or disable an enabled one. Disabling the
    /// last remaining type is a no-op. Returns whether the set changed.
    pub fn toggle(&mut self, route_type: RouteType) -> bool {
        if self.is_enabled(route_type) {
            if self.enabled.len() == 1 {
                return false;
            }
            self.enabled.retain(|t| *t != route_type);
            true
        } else {
            self.enabled.push(route_type);
            // Keep a canonical order so query payloads are deterministic.
            self.enabled
                .sort_by_key(|t| RouteType::ALL.iter().position(|a| a == t));
            true
        }
    }

    pub fn enabled(&self) -> &[RouteType] {
        &self.enabled
    }

    /// Wire form for the explore request body.
    pub fn to_strings(&self) -> Vec<String> {
        self.enabled.iter().map(|t| t.as_str().to_string()).collect()
    }
}

/// Find the candidate whose geometry passes closest to `click`, if any
/// comes within `tolerance_m`. Ties go to the earlier candidate.
pub fn hit_test(routes: &[ExploredRoute], click: LatLng, tolerance_m: f64) -> Option<i64> {
    let mut best: Option<(f64, i64)> = None;

    for route in routes {
        let Some(dist) = distance_to_geometry_m(click, &route.geometry) else {
            continue;
        };
        if dist > tolerance_m {
            continue;
        }
        match best {
            Some((best_dist, _)) if best_dist <= dist => {}
            _ => best = Some((dist, route.osm_id)),
        }
    }

    best.map(|(_, osm_id)| osm_id)
}
