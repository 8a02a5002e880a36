use log::{debug, warn};
use nalgebra::Point3;

use crate::error::SdkError;
use crate::identity::{IdentityRegistry, StableId};
use crate::sdk::{ArSdk, NativePoint, PointCloudHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub position: Point3<f32>,
    pub confidence: f32,
    pub id: StableId,
}

/// Holds an acquired point cloud and releases it when dropped, including on
/// early return.
struct PointCloudLease<'a, S: ArSdk> {
    sdk: &'a mut S,
    cloud: PointCloudHandle,
}

impl<'a, S: ArSdk> PointCloudLease<'a, S> {
    fn acquire(sdk: &'a mut S) -> Result<Self, SdkError> {
        let cloud = sdk.acquire_point_cloud()?;
        Ok(Self { sdk, cloud })
    }

    fn points(&self) -> Result<Vec<NativePoint>, SdkError> {
        self.sdk.point_cloud_points(self.cloud)
    }
}

impl<S: ArSdk> Drop for PointCloudLease<'_, S> {
    fn drop(&mut self) {
        self.sdk.release_point_cloud(self.cloud);
    }
}

/// Per-update snapshot of the sparse point cloud.
///
/// Native point ids are small integers that are unrelated to trackable
/// handles, so they get their own identity map.
#[derive(Debug, Default)]
pub struct FeaturePointStream {
    enabled: bool,
    identities: IdentityRegistry<i32>,
    points: Vec<FeaturePoint>,
}

impl FeaturePointStream {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.points.clear();
        }
    }

    pub fn points(&self) -> &[FeaturePoint] {
        &self.points
    }

    /// Replaces the snapshot with the current native cloud. A cloud that is
    /// not available yet leaves the snapshot empty and is not an error.
    pub fn update<S: ArSdk>(&mut self, sdk: &mut S) -> Result<(), SdkError> {
        self.points.clear();
        if !self.enabled {
            return Ok(());
        }

        let lease = match PointCloudLease::acquire(sdk) {
            Ok(lease) => lease,
            Err(err) => {
                debug!(target: "anchorage_core::points", "point cloud unavailable: {err}");
                return Ok(());
            }
        };

        let native = lease.points().inspect_err(|err| {
            warn!(target: "anchorage_core::points", "failed to read point cloud: {err}");
        })?;

        self.points.reserve(native.len());
        for point in native {
            let [x, y, z, confidence] = point.xyzc;
            let (id, _) = self.identities.resolve(point.id);
            self.points.push(FeaturePoint {
                // z is mirrored into host space.
                position: Point3::new(x, y, -z),
                confidence,
                id,
            });
        }
        Ok(())
    }
}
