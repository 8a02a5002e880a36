use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorManager, Cleanup};
use crate::config::SessionConfig;
use crate::error::{Result, SdkError, XrError};
use crate::frame::Frame;
use crate::geospatial::{Geospatial, PendingRequests};
use crate::identity::StableId;
use crate::images::{ImageTrackingRegistry, ImageTrackingRequest, ImageTrackingScore};
use crate::math::{Pose, pose_from_raw};
use crate::plane::{PlaneDiff, PlaneTracker};
use crate::points::FeaturePointStream;
use crate::render::{Compositor, DisplaySurface, View, ViewTargets};
use crate::sdk::{ArSdk, DepthMode, TrackableHandle, TrackingState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DetectionBoundary {
    Box { extent: [f32; 3] },
    Frustum { far_distance: f32 },
    Sphere { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateInterval {
    RealTime,
    Normal,
    Infrequent,
}

/// Plane and mesh detector tuning. Accepted but not applied on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryDetectorOptions {
    pub detection_boundary: Option<DetectionBoundary>,
    pub update_interval: Option<UpdateInterval>,
}

/// App lifecycle notifications forwarded by the platform glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Pause,
    Resume,
}

#[derive(Debug)]
struct ViewState {
    surface: Option<DisplaySurface>,
    targets: Option<ViewTargets>,
    projection: [f32; 16],
    projection_dirty: bool,
}

/// One AR session: owns the native SDK, the compositor and every tracked
/// object handed to the host.
///
/// The SDK is configured and resumed on the first call to
/// [`Session::next_frame`]. Dropping the session releases every native
/// reference it still holds.
pub struct Session<S: ArSdk, C: Compositor> {
    pub(crate) sdk: S,
    compositor: C,
    config: SessionConfig,
    initialized: bool,
    end_requested: bool,
    pub(crate) planes: PlaneTracker,
    pub(crate) images: ImageTrackingRegistry,
    pub(crate) points: FeaturePointStream,
    pub(crate) anchors: AnchorManager,
    pending: PendingRequests,
    pub(crate) frame_trackables: Vec<TrackableHandle>,
    view: ViewState,
}

/// Diff results of one update, moved into the frame.
#[derive(Debug, Default)]
pub(crate) struct FrameDiff {
    pub planes: PlaneDiff,
    pub images: Vec<StableId>,
}

impl<S: ArSdk, C: Compositor> Session<S, C> {
    pub fn new(sdk: S, compositor: C, config: SessionConfig) -> Self {
        Self {
            planes: PlaneTracker::new(config.plane_change_tolerance),
            images: ImageTrackingRegistry::new(),
            points: FeaturePointStream::new(config.feature_points),
            anchors: AnchorManager::new(),
            pending: PendingRequests::default(),
            frame_trackables: Vec::new(),
            view: ViewState {
                surface: None,
                targets: None,
                projection: [0.0; 16],
                projection_dirty: true,
            },
            initialized: false,
            end_requested: false,
            sdk,
            compositor,
            config,
        }
    }

    /// Builds the native session through `create_sdk`.
    pub fn create<F>(create_sdk: F, compositor: C, config: SessionConfig) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<S, SdkError>,
    {
        let sdk = create_sdk().map_err(XrError::SessionCreate)?;
        Ok(Self::new(sdk, compositor, config))
    }

    /// Configures and resumes the native session. Runs once.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let mut sdk_config = self.config.sdk.clone();
        if sdk_config.depth == DepthMode::Automatic && !self.sdk.is_depth_supported() {
            sdk_config.depth = DepthMode::Disabled;
        }
        self.sdk
            .configure(&sdk_config)
            .map_err(XrError::SessionConfigure)?;
        self.sdk.resume().map_err(XrError::SessionResume)?;
        self.initialized = true;

        info!(
            target: "anchorage_core::session",
            "session started (planes={}, feature_points={}, depth={:?})",
            self.config.plane_detection,
            self.points.is_enabled(),
            sdk_config.depth
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Advances the native session and returns the snapshot for this update.
    pub fn next_frame(&mut self) -> Result<Frame<'_, S, C>> {
        self.initialize()?;

        let should_end_session = self.end_requested;
        let targets = self.sync_display();
        self.sdk.update()?;

        if self.view.projection_dirty {
            self.view.projection = self
                .sdk
                .camera_projection_matrix(self.config.depth_near_z, self.config.depth_far_z);
            self.view.projection_dirty = false;
        }

        let view = View {
            pose: pose_from_raw(&self.sdk.camera_display_oriented_pose()),
            projection: self.view.projection,
            targets,
            depth_near_z: self.config.depth_near_z,
            depth_far_z: self.config.depth_far_z,
            is_first_person_observer: true,
            requires_app_clear: false,
        };
        let is_tracking = self.sdk.camera_tracking_state() == TrackingState::Tracking;
        let timestamp_ns = self.sdk.frame_timestamp_ns();

        let diff = if is_tracking {
            self.diff_trackables()
        } else {
            FrameDiff::default()
        };

        Ok(Frame::new(
            self,
            view,
            diff,
            is_tracking,
            should_end_session,
            timestamp_ns,
        ))
    }

    fn diff_trackables(&mut self) -> FrameDiff {
        let planes = if self.config.plane_detection {
            self.planes.update(&mut self.sdk)
        } else {
            PlaneDiff::default()
        };

        if let Err(err) = self.points.update(&mut self.sdk) {
            warn!(target: "anchorage_core::session", "feature points dropped this frame: {err}");
        }

        let images = self.images.update(&mut self.sdk);
        FrameDiff { planes, images }
    }

    /// Pushes a new surface size to the SDK and reallocates the render
    /// targets when the compositor reports a change.
    fn sync_display(&mut self) -> ViewTargets {
        let surface = self.compositor.surface();
        if let (Some(targets), true) = (self.view.targets, surface == self.view.surface) {
            return targets;
        }

        let current = surface.unwrap_or_default();
        if surface.is_some() {
            self.sdk
                .set_display_geometry(current.rotation, current.width, current.height);
            self.view.projection_dirty = true;
        }
        if let Some(previous) = self.view.targets.take() {
            self.compositor.release_targets(previous);
        }

        let (width, height) = current.texture_size();
        let targets = self.compositor.allocate_targets(width, height);
        debug!(target: "anchorage_core::session", "render targets resized to {width}x{height}");
        self.view.surface = surface;
        self.view.targets = Some(targets);
        targets
    }

    /// Called when a frame is dropped.
    pub(crate) fn finish_frame(&mut self, view: &View, timestamp_ns: i64) {
        for trackable in self.frame_trackables.drain(..) {
            self.sdk.release_trackable(trackable);
        }
        if timestamp_ns != 0 {
            self.compositor.present(view);
        }
    }

    /// The frame after this call reports `should_end_session`.
    pub fn request_end(&mut self) {
        self.end_requested = true;
    }

    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        if !self.initialized {
            return;
        }
        let result = match event {
            LifecycleEvent::Pause => self.sdk.pause(),
            LifecycleEvent::Resume => self.sdk.resume(),
        };
        match result {
            Ok(()) => debug!(target: "anchorage_core::session", "session {event:?}"),
            Err(err) => warn!(target: "anchorage_core::session", "session {event:?} failed: {err}"),
        }
    }

    pub fn set_plane_detection_enabled(&mut self, enabled: bool) {
        self.config.plane_detection = enabled;
    }

    pub fn is_plane_detection_enabled(&self) -> bool {
        self.config.plane_detection
    }

    /// Always honoured on this platform; returns `enabled`.
    pub fn try_set_feature_point_cloud_enabled(&mut self, enabled: bool) -> bool {
        self.config.feature_points = enabled;
        self.points.set_enabled(enabled);
        enabled
    }

    pub fn set_depth_range(&mut self, near_z: f32, far_z: f32) {
        if near_z != self.config.depth_near_z || far_z != self.config.depth_far_z {
            self.config.depth_near_z = near_z;
            self.config.depth_far_z = far_z;
            self.view.projection_dirty = true;
        }
    }

    pub fn depth_range(&self) -> (f32, f32) {
        (self.config.depth_near_z, self.config.depth_far_z)
    }

    pub fn try_set_preferred_plane_detector_options(
        &mut self,
        _options: &GeometryDetectorOptions,
    ) -> bool {
        false
    }

    pub fn try_set_mesh_detector_enabled(&mut self, _enabled: bool) -> bool {
        false
    }

    pub fn try_set_preferred_mesh_detector_options(
        &mut self,
        _options: &GeometryDetectorOptions,
    ) -> bool {
        false
    }

    /// Registers reference images; one score per request, in order.
    pub fn create_augmented_image_database(
        &mut self,
        requests: &[ImageTrackingRequest<'_>],
    ) -> Result<Vec<ImageTrackingScore>> {
        self.initialize()?;
        self.images.create_database(&mut self.sdk, requests)
    }

    pub fn image_tracking_scores(&self) -> Option<&[ImageTrackingScore]> {
        self.images.scores()
    }

    pub fn geospatial(&mut self) -> Geospatial<'_, S> {
        Geospatial::new(&mut self.sdk, &mut self.anchors, &mut self.pending)
    }

    pub fn camera_pose(&self) -> Pose {
        pose_from_raw(&self.sdk.camera_display_oriented_pose())
    }

    pub fn pending_requests(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }

    pub fn plane_tracker(&self) -> &PlaneTracker {
        &self.planes
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    fn shutdown(&mut self) {
        for trackable in self.frame_trackables.drain(..) {
            self.sdk.release_trackable(trackable);
        }
        self.planes.clear(&mut self.sdk);
        self.anchors.cleanup(&mut self.sdk, Cleanup::All);
        self.images.clear(&mut self.sdk);
        self.pending.clear(&mut self.sdk);
        if let Some(targets) = self.view.targets.take() {
            self.compositor.release_targets(targets);
        }
        info!(target: "anchorage_core::session", "session torn down");
    }
}

impl<S: ArSdk, C: Compositor> Drop for Session<S, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
