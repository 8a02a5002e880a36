use crate::anchor::Anchor;
use crate::error::{Result, XrError};
use crate::geospatial::Geospatial;
use crate::hit::{self, HitResult, HitTestTrackableType};
use crate::identity::StableId;
use crate::images::ImageTrackingResult;
use crate::math::{Pose, Ray};
use crate::plane::Plane;
use crate::points::FeaturePoint;
use crate::render::{Compositor, View};
use crate::sdk::{AnchorHandle, ArSdk, TrackableHandle};
use crate::session::{FrameDiff, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    None,
    Left,
    Right,
}

/// Controller or hand input. Phone AR exposes none.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSource {
    pub handedness: Handedness,
    pub aim: Pose,
    pub grip: Option<Pose>,
}

/// Semantic scene object. Not produced on this platform.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: StableId,
    pub pose: Pose,
}

/// Reconstructed mesh. Not produced on this platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub id: StableId,
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Snapshot of one session update.
///
/// The frame borrows the session mutably, so nothing is diffed while the
/// host reads it. Dropping the frame releases the trackables retained by
/// hit tests and presents the view.
pub struct Frame<'s, S: ArSdk, C: Compositor> {
    session: &'s mut Session<S, C>,
    view: View,
    diff: FrameDiff,
    is_tracking: bool,
    should_end_session: bool,
    timestamp_ns: i64,
}

impl<'s, S: ArSdk, C: Compositor> Frame<'s, S, C> {
    pub(crate) fn new(
        session: &'s mut Session<S, C>,
        view: View,
        diff: FrameDiff,
        is_tracking: bool,
        should_end_session: bool,
        timestamp_ns: i64,
    ) -> Self {
        Self {
            session,
            view,
            diff,
            is_tracking,
            should_end_session,
            timestamp_ns,
        }
    }

    pub fn views(&self) -> &[View] {
        std::slice::from_ref(&self.view)
    }

    pub fn input_sources(&self) -> &[InputSource] {
        &[]
    }

    pub fn is_tracking(&self) -> bool {
        self.is_tracking
    }

    pub fn should_end_session(&self) -> bool {
        self.should_end_session
    }

    pub fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }

    pub fn feature_points(&self) -> &[FeaturePoint] {
        self.session.points.points()
    }

    pub fn updated_planes(&self) -> &[StableId] {
        &self.diff.planes.updated
    }

    pub fn removed_planes(&self) -> &[StableId] {
        &self.diff.planes.removed
    }

    pub fn updated_image_tracking_results(&self) -> &[StableId] {
        &self.diff.images
    }

    pub fn updated_scene_objects(&self) -> &[StableId] {
        &[]
    }

    pub fn removed_scene_objects(&self) -> &[StableId] {
        &[]
    }

    pub fn updated_meshes(&self) -> &[StableId] {
        &[]
    }

    pub fn removed_meshes(&self) -> &[StableId] {
        &[]
    }

    pub fn plane(&self, id: StableId) -> Result<&Plane> {
        self.session
            .planes
            .plane(id)
            .ok_or(XrError::NotFound { kind: "plane", id })
    }

    pub fn image_tracking_result(&self, id: StableId) -> Result<&ImageTrackingResult> {
        self.session
            .images
            .result(id)
            .ok_or(XrError::NotFound {
                kind: "image tracking result",
                id,
            })
    }

    pub fn scene_object(&self, _id: StableId) -> Result<&SceneObject> {
        Err(XrError::NotSupported("scene object detection"))
    }

    pub fn mesh(&self, _id: StableId) -> Result<&Mesh> {
        Err(XrError::NotSupported("mesh detection"))
    }

    /// Casts a camera-relative ray. Empty while tracking is lost.
    pub fn hit_test(&mut self, ray: &Ray, types: HitTestTrackableType) -> Vec<HitResult> {
        if !self.is_tracking || types.is_empty() {
            return Vec::new();
        }
        let session = &mut *self.session;
        hit::hit_test(
            &mut session.sdk,
            &self.view.pose,
            ray,
            types,
            &mut session.frame_trackables,
        )
    }

    /// Anchors `pose`, attached to `trackable` (typically from a hit result
    /// of this frame) or to the session.
    pub fn create_anchor(
        &mut self,
        pose: &Pose,
        trackable: Option<TrackableHandle>,
    ) -> Result<Anchor> {
        let session = &mut *self.session;
        Ok(session.anchors.create(&mut session.sdk, pose, trackable)?)
    }

    pub fn declare_anchor(&mut self, native: AnchorHandle) -> Anchor {
        let session = &mut *self.session;
        session.anchors.declare(&mut session.sdk, native)
    }

    pub fn update_anchor(&self, anchor: &mut Anchor) {
        self.session.anchors.update(&self.session.sdk, anchor);
    }

    pub fn delete_anchor(&mut self, anchor: &mut Anchor) {
        let session = &mut *self.session;
        session.anchors.delete(&mut session.sdk, anchor);
    }

    pub fn geospatial(&mut self) -> Geospatial<'_, S> {
        self.session.geospatial()
    }
}

impl<S: ArSdk, C: Compositor> Drop for Frame<'_, S, C> {
    fn drop(&mut self) {
        self.session.finish_frame(&self.view, self.timestamp_ns);
    }
}
