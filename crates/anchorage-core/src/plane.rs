use std::collections::{HashMap, HashSet};

use log::debug;

use crate::identity::{IdentityRegistry, StableId};
use crate::math::{Pose, pose_from_raw};
use crate::sdk::{ArSdk, TrackableHandle, TrackableKind, TrackingState};

/// Layout of `Plane::polygon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonFormat {
    /// Interleaved `x, z` pairs in the plane's local frame.
    Xz,
}

impl PolygonFormat {
    pub fn components(self) -> usize {
        match self {
            PolygonFormat::Xz => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub id: StableId,
    pub center: Pose,
    pub polygon: Vec<f32>,
    /// Vertex count, not float count.
    pub polygon_size: usize,
    pub polygon_format: PolygonFormat,
    /// Scene objects do not exist on this platform.
    pub parent_scene_object: Option<StableId>,
}

impl Plane {
    fn new(id: StableId, center: Pose, polygon: Vec<f32>) -> Self {
        let mut plane = Self {
            id,
            center,
            polygon: Vec::new(),
            polygon_size: 0,
            polygon_format: PolygonFormat::Xz,
            parent_scene_object: None,
        };
        plane.set_geometry(center, polygon);
        plane
    }

    fn set_geometry(&mut self, center: Pose, polygon: Vec<f32>) {
        self.center = center;
        self.polygon_size = polygon.len() / self.polygon_format.components();
        self.polygon = polygon;
    }

    fn clear_geometry(&mut self) {
        self.polygon.clear();
        self.polygon_size = 0;
    }

    /// Replaces pose and polygon when either moved beyond `tolerance`.
    /// Returns whether the plane changed.
    fn apply(&mut self, center: Pose, polygon: Vec<f32>, tolerance: f32) -> bool {
        if !geometry_changed(self, &center, &polygon, tolerance) {
            return false;
        }
        self.set_geometry(center, polygon);
        true
    }
}

fn geometry_changed(plane: &Plane, center: &Pose, polygon: &[f32], tolerance: f32) -> bool {
    let moved = (plane.center.translation.vector - center.translation.vector).norm() > tolerance;
    let turned = plane.center.rotation.angle_to(&center.rotation) > tolerance;
    let reshaped = plane.polygon.len() != polygon.len()
        || plane
            .polygon
            .iter()
            .zip(polygon)
            .any(|(a, b)| (a - b).abs() > tolerance);
    moved || turned || reshaped
}

/// Planes that changed or disappeared during one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaneDiff {
    pub updated: Vec<StableId>,
    pub removed: Vec<StableId>,
}

/// Diff engine over the native plane trackables.
///
/// The tracker keeps one native reference per known plane. Every other
/// reference acquired during an update is released before `update` returns.
#[derive(Debug)]
pub struct PlaneTracker {
    identities: IdentityRegistry<TrackableHandle>,
    planes: HashMap<StableId, Plane>,
    // Removed last update; kept readable for one frame.
    retired: Vec<StableId>,
    tolerance: f32,
}

impl PlaneTracker {
    pub fn new(tolerance: f32) -> Self {
        Self {
            identities: IdentityRegistry::new(),
            planes: HashMap::new(),
            retired: Vec::new(),
            tolerance,
        }
    }

    pub fn plane(&self, id: StableId) -> Option<&Plane> {
        self.planes.get(&id)
    }

    pub fn planes(&self) -> impl Iterator<Item = &Plane> {
        self.planes.values()
    }

    /// Planes currently backed by a native reference.
    pub fn tracked_count(&self) -> usize {
        self.identities.len()
    }

    pub fn update<S: ArSdk>(&mut self, sdk: &mut S) -> PlaneDiff {
        for id in self.retired.drain(..) {
            self.planes.remove(&id);
        }

        let mut diff = PlaneDiff::default();
        let gone = self.remove_subsumed(sdk, &mut diff);

        for handle in sdk.acquire_updated_trackables(TrackableKind::Plane) {
            if gone.contains(&handle) {
                sdk.release_trackable(handle);
                continue;
            }
            if let Some(parent) = sdk.acquire_subsuming_plane(handle) {
                sdk.release_trackable(parent);
                sdk.release_trackable(handle);
                continue;
            }
            if sdk.trackable_tracking_state(handle) == TrackingState::Stopped {
                sdk.release_trackable(handle);
                continue;
            }

            let center = pose_from_raw(&sdk.plane_center_pose(handle));
            let polygon = sdk.plane_polygon(handle);
            let (id, is_new) = self.identities.resolve(handle);

            if is_new {
                // The acquired reference now belongs to the registry.
                self.planes.insert(id, Plane::new(id, center, polygon));
                diff.updated.push(id);
                continue;
            }

            sdk.release_trackable(handle);
            match self.planes.get_mut(&id) {
                Some(plane) => {
                    if plane.apply(center, polygon, self.tolerance) {
                        diff.updated.push(id);
                    }
                }
                None => {
                    self.planes.insert(id, Plane::new(id, center, polygon));
                    diff.updated.push(id);
                }
            }
        }

        if !diff.updated.is_empty() || !diff.removed.is_empty() {
            debug!(
                target: "anchorage_core::plane",
                "planes updated={} removed={} tracked={}",
                diff.updated.len(),
                diff.removed.len(),
                self.identities.len()
            );
        }
        diff
    }

    /// Drops every known plane that was absorbed by another one or whose
    /// tracking stopped. Returns the native handles that were let go.
    fn remove_subsumed<S: ArSdk>(
        &mut self,
        sdk: &mut S,
        diff: &mut PlaneDiff,
    ) -> HashSet<TrackableHandle> {
        let mut gone = HashSet::new();
        for (handle, id) in self.identities.snapshot() {
            let parent = sdk.acquire_subsuming_plane(handle);
            let stopped = sdk.trackable_tracking_state(handle) == TrackingState::Stopped;
            if parent.is_none() && !stopped {
                continue;
            }

            if let Some(plane) = self.planes.get_mut(&id) {
                plane.clear_geometry();
            }
            diff.removed.push(id);
            self.retired.push(id);

            sdk.release_trackable(handle);
            if let Some(parent) = parent {
                sdk.release_trackable(parent);
            }
            self.identities.forget(handle);
            gone.insert(handle);
        }
        gone
    }

    /// Releases every retained native reference. Ids are not reissued.
    pub fn clear<S: ArSdk>(&mut self, sdk: &mut S) {
        for (handle, _) in self.identities.drain() {
            sdk.release_trackable(handle);
        }
        self.planes.clear();
        self.retired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

    fn plane() -> Plane {
        Plane::new(1, Pose::identity(), vec![-1.0, -1.0, 1.0, -1.0, 1.0, 1.0])
    }

    #[test]
    fn polygon_size_counts_vertices() {
        let plane = plane();
        assert_eq!(plane.polygon_size, 3);
        assert_eq!(plane.polygon_format, PolygonFormat::Xz);
        assert!(plane.parent_scene_object.is_none());
    }

    #[test]
    fn jitter_within_tolerance_is_not_an_update() {
        let mut plane = plane();
        let nudged = Isometry3::translation(0.00005, 0.0, 0.0);
        let polygon = vec![-1.00005, -1.0, 1.0, -1.0, 1.0, 1.0];

        assert!(!plane.apply(nudged, polygon, 1e-4));
        assert_eq!(plane.center, Pose::identity());
    }

    #[test]
    fn movement_rotation_or_new_outline_is_an_update() {
        let mut plane = plane();
        assert!(plane.apply(Isometry3::translation(0.01, 0.0, 0.0), plane.polygon.clone(), 1e-4));

        let turned = Isometry3::from_parts(
            Translation3::new(0.01, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.01),
        );
        assert!(plane.apply(turned, plane.polygon.clone(), 1e-4));

        let grown = vec![-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];
        assert!(plane.apply(turned, grown, 1e-4));
        assert_eq!(plane.polygon_size, 4);
    }

    #[test]
    fn cleared_geometry_is_empty() {
        let mut plane = plane();
        plane.clear_geometry();
        assert!(plane.polygon.is_empty());
        assert_eq!(plane.polygon_size, 0);
    }
}
