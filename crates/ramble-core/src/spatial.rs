//! Spatial math for hit-testing and viewport fitting.

use crate::models::{Geometry, LatLng, Position};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using the Haversine
/// formula.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lng(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Minimum distance in meters from a point to a line segment.
///
/// Projects into a local east/north plane around the point, which is
/// accurate at click-tolerance scales.
pub fn distance_to_segment_m(point: LatLng, seg_start: Position, seg_end: Position) -> f64 {
    let m_lat = meters_per_deg_lat(point.lat).max(1e-9);
    let m_lng = meters_per_deg_lng(point.lat).max(1e-9);

    let ax = (seg_start[0] - point.lng) * m_lng;
    let ay = (seg_start[1] - point.lat) * m_lat;
    let bx = (seg_end[0] - point.lng) * m_lng;
    let by = (seg_end[1] - point.lat) * m_lat;

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return (ax * ax + ay * ay).sqrt();
    }

    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    (cx * cx + cy * cy).sqrt()
}

/// Minimum distance in meters from a point to any part of a geometry.
///
/// Returns `None` for empty geometry.
pub fn distance_to_geometry_m(point: LatLng, geometry: &Geometry) -> Option<f64> {
    let mut best: Option<f64> = None;

    for line in geometry.lines() {
        if line.len() == 1 {
            let d = haversine_distance(point.lat, point.lng, line[0][1], line[0][0]);
            best = Some(best.map_or(d, |b: f64| b.min(d)));
            continue;
        }
        for pair in line.windows(2) {
            let d = distance_to_segment_m(point, pair[0], pair[1]);
            best = Some(best.map_or(d, |b: f64| b.min(d)));
        }
    }

    if let Geometry::Point(position) = geometry {
        let d = haversine_distance(point.lat, point.lng, position[1], position[0]);
        best = Some(best.map_or(d, |b: f64| b.min(d)));
    }

    best
}

/// Axis-aligned bounding box over `[lng, lat]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bbox {
    /// Minimal box covering all positions; `None` when there are none.
    pub fn from_positions(positions: &[Position]) -> Option<Self> {
        let first = positions.first()?;
        let mut bbox = Bbox {
            min_lng: first[0],
            min_lat: first[1],
            max_lng: first[0],
            max_lat: first[1],
        };
        for position in &positions[1..] {
            bbox.extend(*position);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, position: Position) {
        self.min_lng = self.min_lng.min(position[0]);
        self.min_lat = self.min_lat.min(position[1]);
        self.max_lng = self.max_lng.max(position[0]);
        self.max_lat = self.max_lat.max(position[1]);
    }
}
