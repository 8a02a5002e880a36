use std::ops::{BitOr, BitOrAssign};

use crate::math::{Pose, Ray, pose_from_raw};
use crate::sdk::{ArSdk, TrackableHandle, TrackableKind};

/// Set of trackable kinds a hit test may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HitTestTrackableType(u8);

impl HitTestTrackableType {
    pub const NONE: Self = Self(0);
    pub const POINT: Self = Self(1);
    pub const PLANE: Self = Self(1 << 1);
    pub const MESH: Self = Self(1 << 2);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & (Self::POINT.0 | Self::PLANE.0 | Self::MESH.0))
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for HitTestTrackableType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for HitTestTrackableType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub pose: Pose,
    pub kind: TrackableKind,
    /// Stays valid until the frame that produced it is dropped.
    pub trackable: TrackableHandle,
}

/// Casts `ray` (camera relative) against the world. Trackables of accepted
/// hits are pushed onto `retained`; the rest are released here.
pub(crate) fn hit_test<S: ArSdk>(
    sdk: &mut S,
    camera: &Pose,
    ray: &Ray,
    types: HitTestTrackableType,
    retained: &mut Vec<TrackableHandle>,
) -> Vec<HitResult> {
    let world = ray.to_world(camera);
    let origin = [world.origin.x, world.origin.y, world.origin.z];
    let direction = [world.direction.x, world.direction.y, world.direction.z];

    let mut results = Vec::new();
    for hit in sdk.hit_test_ray(origin, direction) {
        let kind = sdk.trackable_kind(hit.trackable);
        let accepted = match kind {
            TrackableKind::Plane => {
                types.contains(HitTestTrackableType::PLANE)
                    || (types.contains(HitTestTrackableType::MESH)
                        && sdk.plane_contains_pose(hit.trackable, &hit.pose))
            }
            TrackableKind::Point => types.contains(HitTestTrackableType::POINT),
            TrackableKind::AugmentedImage | TrackableKind::Other => false,
        };

        if accepted {
            retained.push(hit.trackable);
            results.push(HitResult {
                pose: pose_from_raw(&hit.pose),
                kind,
                trackable: hit.trackable,
            });
        } else {
            sdk.release_trackable(hit.trackable);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_test() {
        let types = HitTestTrackableType::PLANE | HitTestTrackableType::MESH;
        assert!(types.contains(HitTestTrackableType::PLANE));
        assert!(types.contains(HitTestTrackableType::MESH));
        assert!(!types.contains(HitTestTrackableType::POINT));
        assert!(!types.contains(HitTestTrackableType::NONE));
        assert_eq!(types.bits(), 6);
    }

    #[test]
    fn unknown_bits_are_dropped() {
        assert_eq!(HitTestTrackableType::from_bits_truncate(0xFF).bits(), 7);
        assert!(HitTestTrackableType::from_bits_truncate(8).is_empty());
    }
}
