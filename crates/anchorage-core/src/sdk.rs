//! Seam to the native AR SDK.
//!
//! Every method that returns a handle hands out a new reference. The caller
//! owns it and must give it back exactly once through the matching
//! `release_*` call. Handles are opaque: equal values name the same native
//! object only while at least one reference to it is alive.

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::math::{EusQuaternion, GeodeticCoordinate, GeospatialPose, RawPose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackableHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointCloudHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    Tracking,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackableKind {
    Plane,
    Point,
    AugmentedImage,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageTrackingMethod {
    NotTracking,
    FullTracking,
    LastKnownPose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FutureState {
    Pending,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudAnchorState {
    Success,
    ErrorInternal,
    ErrorNotAuthorized,
    ErrorResourceExhausted,
    ErrorHostingDatasetProcessingFailed,
    ErrorCloudIdNotFound,
    ErrorSdkVersionTooOld,
    ErrorSdkVersionTooNew,
    ErrorServiceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainAnchorState {
    Success,
    ErrorInternal,
    ErrorNotAuthorized,
    ErrorUnsupportedLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureMapQuality {
    Insufficient,
    Sufficient,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusMode {
    #[default]
    Auto,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaneFindingMode {
    Disabled,
    #[default]
    Horizontal,
    Vertical,
    HorizontalAndVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthMode {
    Disabled,
    #[default]
    Automatic,
}

/// Native session configuration pushed on initialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub focus_mode: FocusMode,
    #[serde(default)]
    pub plane_finding: PlaneFindingMode,
    #[serde(default = "default_enabled")]
    pub geospatial: bool,
    #[serde(default = "default_enabled")]
    pub cloud_anchors: bool,
    #[serde(default)]
    pub depth: DepthMode,
}

fn default_enabled() -> bool {
    true
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            focus_mode: FocusMode::default(),
            plane_finding: PlaneFindingMode::default(),
            geospatial: default_enabled(),
            cloud_anchors: default_enabled(),
            depth: DepthMode::default(),
        }
    }
}

/// One point of the native point cloud: `[x, y, z, confidence]` plus its id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativePoint {
    pub xyzc: [f32; 4],
    pub id: i32,
}

/// A hit returned by the native hit test. `trackable` is an acquired reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeHit {
    pub pose: RawPose,
    pub trackable: TrackableHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainResult {
    pub state: TerrainAnchorState,
    pub anchor: Option<AnchorHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostResult {
    pub state: CloudAnchorState,
    pub cloud_anchor_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveResult {
    pub state: CloudAnchorState,
    pub anchor: Option<AnchorHandle>,
}

pub trait ArSdk {
    fn configure(&mut self, config: &SdkConfig) -> Result<(), SdkError>;
    fn is_depth_supported(&self) -> bool;
    fn resume(&mut self) -> Result<(), SdkError>;
    fn pause(&mut self) -> Result<(), SdkError>;
    fn set_display_geometry(&mut self, rotation: i32, width: u32, height: u32);
    /// Advances the native session by one frame.
    fn update(&mut self) -> Result<(), SdkError>;
    /// Zero when the camera has not produced an image yet.
    fn frame_timestamp_ns(&self) -> i64;

    fn camera_tracking_state(&self) -> TrackingState;
    fn camera_display_oriented_pose(&self) -> RawPose;
    fn camera_projection_matrix(&self, near: f32, far: f32) -> [f32; 16];

    fn acquire_updated_trackables(&mut self, kind: TrackableKind) -> Vec<TrackableHandle>;
    fn trackable_kind(&self, trackable: TrackableHandle) -> TrackableKind;
    fn trackable_tracking_state(&self, trackable: TrackableHandle) -> TrackingState;
    fn release_trackable(&mut self, trackable: TrackableHandle);

    /// Plane that absorbed `plane`, if any.
    fn acquire_subsuming_plane(&mut self, plane: TrackableHandle) -> Option<TrackableHandle>;
    fn plane_center_pose(&self, plane: TrackableHandle) -> RawPose;
    /// Boundary polygon as interleaved `x, z` pairs in the plane's frame.
    fn plane_polygon(&self, plane: TrackableHandle) -> Vec<f32>;
    fn plane_contains_pose(&self, plane: TrackableHandle, pose: &RawPose) -> bool;

    fn image_index(&self, image: TrackableHandle) -> i32;
    fn image_extent_x(&self, image: TrackableHandle) -> f32;
    fn image_center_pose(&self, image: TrackableHandle) -> RawPose;
    fn image_tracking_method(&self, image: TrackableHandle) -> ImageTrackingMethod;

    fn hit_test_ray(&mut self, origin: [f32; 3], direction: [f32; 3]) -> Vec<NativeHit>;
    fn hit_test_screen(&mut self, x: f32, y: f32) -> Vec<NativeHit>;

    fn acquire_point_cloud(&mut self) -> Result<PointCloudHandle, SdkError>;
    fn point_cloud_points(&self, cloud: PointCloudHandle) -> Result<Vec<NativePoint>, SdkError>;
    fn release_point_cloud(&mut self, cloud: PointCloudHandle);

    /// Starts a fresh database, dropping any previous one.
    fn create_image_database(&mut self) -> Result<(), SdkError>;
    /// Adds a single-channel image, returning its database index.
    fn add_database_image(
        &mut self,
        luminance: &[u8],
        width: u32,
        height: u32,
        physical_width_m: Option<f32>,
    ) -> Result<i32, SdkError>;
    /// Attaches the database to the session configuration and reconfigures.
    fn enable_image_database(&mut self) -> Result<(), SdkError>;

    fn acquire_new_anchor(
        &mut self,
        pose: &RawPose,
        trackable: Option<TrackableHandle>,
    ) -> Result<AnchorHandle, SdkError>;
    fn anchor_pose(&self, anchor: AnchorHandle) -> RawPose;
    fn anchor_tracking_state(&self, anchor: AnchorHandle) -> TrackingState;
    fn detach_anchor(&mut self, anchor: AnchorHandle);
    fn release_anchor(&mut self, anchor: AnchorHandle);

    /// `None` when the session has no Earth object.
    fn earth_tracking_state(&self) -> Option<TrackingState>;
    fn camera_geospatial_pose(&self) -> Result<GeospatialPose, SdkError>;
    fn geospatial_pose_of(&self, pose: &RawPose) -> Result<GeospatialPose, SdkError>;
    fn acquire_earth_anchor(
        &mut self,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<AnchorHandle, SdkError>;
    fn estimate_feature_map_quality(&self, pose: &RawPose) -> Result<FeatureMapQuality, SdkError>;

    fn resolve_anchor_on_terrain_async(
        &mut self,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<FutureHandle, SdkError>;
    fn host_cloud_anchor_async(
        &mut self,
        anchor: AnchorHandle,
        ttl_days: u32,
    ) -> Result<FutureHandle, SdkError>;
    fn resolve_cloud_anchor_async(&mut self, cloud_anchor_id: &str)
    -> Result<FutureHandle, SdkError>;
    fn future_state(&self, future: FutureHandle) -> FutureState;
    fn acquire_terrain_result(&mut self, future: FutureHandle) -> TerrainResult;
    fn acquire_hosted_cloud_anchor_id(&mut self, future: FutureHandle) -> HostResult;
    fn acquire_resolved_cloud_anchor(&mut self, future: FutureHandle) -> ResolveResult;
    fn release_future(&mut self, future: FutureHandle);
}
