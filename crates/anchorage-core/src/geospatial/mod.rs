//! Named anchors placed in the Earth frame, and the asynchronous terrain and
//! cloud anchor requests that produce them.
//!
//! Requests never block. Each one leaves a native future under the anchor's
//! name; the status queries below poll it and, once it finishes, release it
//! and promote any resulting anchor into the [`AnchorManager`] under the same
//! name. "Earth not tracking" and "not finished yet" are ordinary values;
//! `Err` is reserved for SDK failures and misuse.

mod pending;

pub use pending::{FailureReason, PendingFutures, RequestKind, Resolution};

use log::info;

use crate::anchor::AnchorManager;
use crate::error::{Result, XrError};
use crate::math::{
    EusQuaternion, GeodeticCoordinate, GeospatialPose, Pose, pose_from_raw, pose_to_raw,
};
use crate::sdk::{AnchorHandle, ArSdk, FeatureMapQuality, NativeHit, TrackableKind, TrackingState};

/// Outcome of polling a named anchor.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorStatus<T> {
    /// No anchor and no request under this name.
    NotFound,
    Pending,
    Tracking(T),
    /// The anchor exists but is paused or stopped.
    NotTracking,
    Failed(FailureReason),
}

impl<T> AnchorStatus<T> {
    pub fn is_tracked(&self) -> bool {
        matches!(self, AnchorStatus::Tracking(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnchorStatus::Pending)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AnchorStatus<U> {
        match self {
            AnchorStatus::NotFound => AnchorStatus::NotFound,
            AnchorStatus::Pending => AnchorStatus::Pending,
            AnchorStatus::Tracking(value) => AnchorStatus::Tracking(f(value)),
            AnchorStatus::NotTracking => AnchorStatus::NotTracking,
            AnchorStatus::Failed(reason) => AnchorStatus::Failed(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    NotRequested,
    Pending,
    Hosted { cloud_anchor_id: String },
    Failed(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthAnchorPose {
    pub anchor: Pose,
    pub camera: Pose,
}

/// In-flight requests, one map per kind.
#[derive(Debug)]
pub struct PendingRequests {
    terrain: PendingFutures,
    hosting: PendingFutures,
    resolving: PendingFutures,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self {
            terrain: PendingFutures::new(RequestKind::TerrainResolve),
            hosting: PendingFutures::new(RequestKind::CloudHost),
            resolving: PendingFutures::new(RequestKind::CloudResolve),
        }
    }
}

impl PendingRequests {
    pub fn of(&self, kind: RequestKind) -> &PendingFutures {
        match kind {
            RequestKind::TerrainResolve => &self.terrain,
            RequestKind::CloudHost => &self.hosting,
            RequestKind::CloudResolve => &self.resolving,
        }
    }

    fn of_mut(&mut self, kind: RequestKind) -> &mut PendingFutures {
        match kind {
            RequestKind::TerrainResolve => &mut self.terrain,
            RequestKind::CloudHost => &mut self.hosting,
            RequestKind::CloudResolve => &mut self.resolving,
        }
    }

    pub fn len(&self) -> usize {
        self.terrain.len() + self.hosting.len() + self.resolving.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear<S: ArSdk>(&mut self, sdk: &mut S) {
        self.terrain.clear(sdk);
        self.hosting.clear(sdk);
        self.resolving.clear(sdk);
    }
}

/// Geospatial operations over a borrowed session.
pub struct Geospatial<'a, S: ArSdk> {
    sdk: &'a mut S,
    anchors: &'a mut AnchorManager,
    pending: &'a mut PendingRequests,
}

impl<'a, S: ArSdk> Geospatial<'a, S> {
    pub fn new(
        sdk: &'a mut S,
        anchors: &'a mut AnchorManager,
        pending: &'a mut PendingRequests,
    ) -> Self {
        Self {
            sdk,
            anchors,
            pending,
        }
    }

    pub fn is_earth_tracking(&self) -> bool {
        self.sdk.earth_tracking_state() == Some(TrackingState::Tracking)
    }

    pub fn add_earth_anchor(
        &mut self,
        name: &str,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<bool> {
        if !self.is_earth_tracking() {
            return Ok(false);
        }
        let native = self.sdk.acquire_earth_anchor(coordinate, eus)?;
        self.anchors.adopt_named(self.sdk, name, native);
        Ok(true)
    }

    /// Places an Earth anchor at a pose given in the local frame. Returns the
    /// geodetic pose the anchor was created at.
    pub fn add_local_earth_anchor(
        &mut self,
        name: &str,
        pose: &Pose,
    ) -> Result<Option<GeospatialPose>> {
        if !self.is_earth_tracking() {
            return Ok(None);
        }
        let geo = self.sdk.geospatial_pose_of(&pose_to_raw(pose))?;
        let placed = self.add_earth_anchor(name, &geo.coordinate, &geo.eus_quaternion)?;
        Ok(placed.then_some(geo))
    }

    pub fn remove_earth_anchor(&mut self, name: &str) -> bool {
        self.anchors.remove_named(self.sdk, name)
    }

    pub fn earth_anchor_pose(&mut self, name: &str) -> AnchorStatus<EarthAnchorPose> {
        let camera = pose_from_raw(&self.sdk.camera_display_oriented_pose());
        self.anchor_pose(name)
            .map(|anchor| EarthAnchorPose { anchor, camera })
    }

    pub fn terrain_anchor_pose(&mut self, name: &str) -> AnchorStatus<Pose> {
        self.anchor_pose(name)
    }

    /// Reports the anchor under `name`, first draining a finished terrain
    /// request, then a finished cloud resolve request. Shared by the Earth
    /// and terrain queries.
    fn anchor_pose(&mut self, name: &str) -> AnchorStatus<Pose> {
        if let Some(native) = self.anchors.named(name) {
            return self.named_status(native);
        }

        let terrain = self
            .pending
            .terrain
            .poll(self.sdk, name, pending::terrain_anchor);
        let resolution = match terrain {
            Some(resolution) => resolution,
            None => match self
                .pending
                .resolving
                .poll(self.sdk, name, pending::resolved_cloud_anchor)
            {
                Some(resolution) => resolution,
                None => return AnchorStatus::NotFound,
            },
        };

        match resolution {
            Resolution::Pending => AnchorStatus::Pending,
            Resolution::Failed(reason) => {
                info!(target: "anchorage_core::geospatial", "anchor '{name}' failed: {reason:?}");
                AnchorStatus::Failed(reason)
            }
            Resolution::Ready(native) => {
                self.anchors.adopt_named(self.sdk, name, native);
                self.named_status(native)
            }
        }
    }

    fn named_status(&self, native: AnchorHandle) -> AnchorStatus<Pose> {
        match self.sdk.anchor_tracking_state(native) {
            TrackingState::Tracking => {
                AnchorStatus::Tracking(pose_from_raw(&self.sdk.anchor_pose(native)))
            }
            TrackingState::Paused | TrackingState::Stopped => AnchorStatus::NotTracking,
        }
    }

    /// Requests an anchor at `coordinate`, with its altitude taken relative to
    /// the terrain. Returns false when Earth is not tracking.
    pub fn add_terrain_anchor(
        &mut self,
        name: &str,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<bool> {
        if !self.is_earth_tracking() {
            return Ok(false);
        }
        self.pending.terrain.request(self.sdk, name, |sdk| {
            sdk.resolve_anchor_on_terrain_async(coordinate, eus)
        })?;
        Ok(true)
    }

    /// Hosts the anchor stored under `name`. Returns false when Earth is not
    /// tracking.
    pub fn host_cloud_anchor(&mut self, name: &str, ttl_days: u32) -> Result<bool> {
        if !self.is_earth_tracking() {
            return Ok(false);
        }
        let native = self.require_named(name)?;
        self.pending
            .hosting
            .request(self.sdk, name, |sdk| sdk.host_cloud_anchor_async(native, ttl_days))?;
        Ok(true)
    }

    pub fn resolve_cloud_anchor(&mut self, name: &str, cloud_anchor_id: &str) -> Result<()> {
        self.pending.resolving.request(self.sdk, name, |sdk| {
            sdk.resolve_cloud_anchor_async(cloud_anchor_id)
        })
    }

    pub fn cloud_anchor_host_status(&mut self, name: &str) -> HostStatus {
        let polled = self
            .pending
            .hosting
            .poll(self.sdk, name, pending::hosted_cloud_anchor_id);
        match polled {
            None => HostStatus::NotRequested,
            Some(Resolution::Pending) => HostStatus::Pending,
            Some(Resolution::Ready(cloud_anchor_id)) => {
                info!(target: "anchorage_core::geospatial", "anchor '{name}' hosted as {cloud_anchor_id}");
                HostStatus::Hosted { cloud_anchor_id }
            }
            Some(Resolution::Failed(reason)) => HostStatus::Failed(reason),
        }
    }

    /// Releases the in-flight request of `kind` for `name`, if any. A late
    /// completion is never observed.
    pub fn abandon_request(&mut self, kind: RequestKind, name: &str) -> bool {
        self.pending.of_mut(kind).abandon(self.sdk, name)
    }

    pub fn earth_anchor_geospatial_pose(&self, name: &str) -> Result<Option<GeospatialPose>> {
        if !self.is_earth_tracking() {
            return Ok(None);
        }
        let native = self.require_named(name)?;
        let pose = self.sdk.anchor_pose(native);
        Ok(Some(self.sdk.geospatial_pose_of(&pose)?))
    }

    pub fn camera_geospatial_pose(&self) -> Result<Option<GeospatialPose>> {
        if !self.is_earth_tracking() {
            return Ok(None);
        }
        Ok(Some(self.sdk.camera_geospatial_pose()?))
    }

    /// Anchors the first plane under the screen point `(x, y)` as `name`.
    ///
    /// The result is a plane anchor, not a geodetic one, so Earth only has to
    /// exist; it does not have to be tracking. Returns false without Earth.
    pub fn hit_test_anchor(&mut self, name: &str, x: f32, y: f32) -> Result<bool> {
        if self.sdk.earth_tracking_state().is_none() {
            return Ok(false);
        }
        let Some(hit) = self.first_plane_hit(x, y) else {
            return Ok(false);
        };

        let created = self.sdk.acquire_new_anchor(&hit.pose, Some(hit.trackable));
        self.sdk.release_trackable(hit.trackable);
        self.anchors.adopt_named(self.sdk, name, created?);
        Ok(true)
    }

    /// Places an Earth anchor where the first plane under `(x, y)` was hit.
    pub fn hit_test_earth_anchor(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
    ) -> Result<Option<GeospatialPose>> {
        if !self.is_earth_tracking() {
            return Ok(None);
        }
        let Some(hit) = self.first_plane_hit(x, y) else {
            return Ok(None);
        };
        self.sdk.release_trackable(hit.trackable);

        let geo = self.sdk.geospatial_pose_of(&hit.pose)?;
        let placed = self.add_earth_anchor(name, &geo.coordinate, &geo.eus_quaternion)?;
        Ok(placed.then_some(geo))
    }

    /// Whether the surroundings of the anchor under `name` are mapped well
    /// enough to host it.
    pub fn estimate_feature_map_quality_for_hosting(&self, name: &str) -> Result<bool> {
        let native = self.require_named(name)?;
        let quality = self
            .sdk
            .estimate_feature_map_quality(&self.sdk.anchor_pose(native))?;
        Ok(quality != FeatureMapQuality::Insufficient)
    }

    fn require_named(&self, name: &str) -> Result<AnchorHandle> {
        self.anchors
            .named(name)
            .ok_or_else(|| XrError::UnknownAnchor(name.to_owned()))
    }

    /// First hit on a plane. Every other hit is released.
    fn first_plane_hit(&mut self, x: f32, y: f32) -> Option<NativeHit> {
        let mut found = None;
        for hit in self.sdk.hit_test_screen(x, y) {
            if found.is_none() && self.sdk.trackable_kind(hit.trackable) == TrackableKind::Plane {
                found = Some(hit);
            } else {
                self.sdk.release_trackable(hit.trackable);
            }
        }
        found
    }
}
