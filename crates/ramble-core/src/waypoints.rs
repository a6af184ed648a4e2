//! Ordered list of waypoints drawn by the user.

use crate::models::{LatLng, Position};

/// Mutable ordered sequence of drawn coordinates.
///
/// The builder itself never rejects edits; legality of mutation (drawing
/// mode only) is the session controller's concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointPath {
    points: Vec<LatLng>,
}

impl WaypointPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waypoint at the end of the path.
    pub fn append(&mut self, point: LatLng) {
        self.points.push(point);
    }

    /// Remove the last waypoint. No-op on an empty path.
    pub fn undo(&mut self) {
        self.points.pop();
    }

    /// Drop all waypoints.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    /// The path as `[lng, lat]` positions for the snap request.
    pub fn positions(&self) -> Vec<Position> {
        self.points.iter().map(LatLng::position).collect()
    }
}
