//! In-memory AR SDK driven by a script instead of a camera.
//!
//! [`SimulatedSdk`] implements [`ArSdk`] over a shared [`World`]. Tests and
//! the replay tool keep a [`SimulatedWorld`] handle to the same world and
//! mutate it between frames: add or merge planes, move the camera, finish
//! futures. Every reference the session takes is booked in a
//! [`ReferenceLedger`].

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use anchorage_core::error::SdkError;
use anchorage_core::math::{EusQuaternion, GeodeticCoordinate, GeospatialPose, RawPose};
use anchorage_core::sdk::{
    AnchorHandle, ArSdk, CloudAnchorState, FeatureMapQuality, FutureHandle, FutureState,
    HostResult, ImageTrackingMethod, NativeHit, NativePoint, PointCloudHandle, ResolveResult,
    SdkConfig, TerrainAnchorState, TerrainResult, TrackableHandle, TrackableKind, TrackingState,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ledger::{ObjectKind, ReferenceLedger};

const FRAME_INTERVAL_NS: i64 = 16_666_667;
const DEGREES_PER_METRE: f64 = 1e-5;
const IDENTITY_POSE: RawPose = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, PartialEq)]
struct SimPlane {
    center: RawPose,
    polygon: Vec<f32>,
    subsumed_by: Option<u64>,
    tracking: TrackingState,
}

#[derive(Debug, Clone, PartialEq)]
struct SimImage {
    index: i32,
    extent_x: f32,
    pose: RawPose,
    method: ImageTrackingMethod,
}

#[derive(Debug, Clone, PartialEq)]
struct SimAnchor {
    pose: RawPose,
    tracking: TrackingState,
    detached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureKind {
    Terrain,
    Host,
    Resolve,
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Unset,
    Terrain(TerrainAnchorState),
    Host(CloudAnchorState, Option<String>),
    Resolve(CloudAnchorState, RawPose),
}

#[derive(Debug, Clone, PartialEq)]
struct SimFuture {
    kind: FutureKind,
    state: FutureState,
    // Pose the terrain anchor lands at, or the anchor being hosted.
    target: RawPose,
    outcome: Outcome,
}

/// Everything the simulated SDK knows about.
#[derive(Debug)]
pub struct World {
    ledger: ReferenceLedger,
    next_id: u64,

    configured: Option<SdkConfig>,
    fail_configure: Option<SdkError>,
    fail_image_database: Option<SdkError>,
    depth_supported: bool,
    running: bool,
    pause_count: u32,
    resume_count: u32,
    update_count: u64,
    display: Option<(i32, u32, u32)>,
    timestamp_ns: i64,

    camera_state: TrackingState,
    camera_pose: RawPose,
    projection_requests: u32,

    planes: BTreeMap<u64, SimPlane>,
    staged_planes: Vec<u64>,
    frame_planes: Vec<u64>,
    images: BTreeMap<u64, SimImage>,
    staged_images: Vec<u64>,
    frame_images: Vec<u64>,
    point_trackables: BTreeSet<u64>,

    point_cloud: Option<Vec<NativePoint>>,
    fail_point_reads: bool,

    database_images: usize,
    database_enabled: bool,

    anchors: BTreeMap<u64, SimAnchor>,
    earth: Option<TrackingState>,
    geo_origin: GeodeticCoordinate,
    feature_map_quality: FeatureMapQuality,
    futures: BTreeMap<u64, SimFuture>,

    hits: Vec<(RawPose, u64)>,
    last_ray: Option<([f32; 3], [f32; 3])>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            ledger: ReferenceLedger::default(),
            next_id: 1,
            configured: None,
            fail_configure: None,
            fail_image_database: None,
            depth_supported: true,
            running: false,
            pause_count: 0,
            resume_count: 0,
            update_count: 0,
            display: None,
            timestamp_ns: 0,
            camera_state: TrackingState::Tracking,
            camera_pose: IDENTITY_POSE,
            projection_requests: 0,
            planes: BTreeMap::new(),
            staged_planes: Vec::new(),
            frame_planes: Vec::new(),
            images: BTreeMap::new(),
            staged_images: Vec::new(),
            frame_images: Vec::new(),
            point_trackables: BTreeSet::new(),
            point_cloud: None,
            fail_point_reads: false,
            database_images: 0,
            database_enabled: false,
            anchors: BTreeMap::new(),
            earth: None,
            geo_origin: GeodeticCoordinate::new(47.3769, 8.5417, 408.0),
            feature_map_quality: FeatureMapQuality::Sufficient,
            futures: BTreeMap::new(),
            hits: Vec::new(),
            last_ray: None,
        }
    }
}

impl World {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn require_earth(&self) -> Result<(), SdkError> {
        match self.earth {
            Some(TrackingState::Tracking) => Ok(()),
            Some(_) => Err(SdkError::NotTracking),
            None => Err(SdkError::Unavailable("earth")),
        }
    }

    fn to_geospatial(&self, pose: &RawPose) -> GeospatialPose {
        GeospatialPose {
            coordinate: GeodeticCoordinate::new(
                self.geo_origin.latitude - f64::from(pose[6]) * DEGREES_PER_METRE,
                self.geo_origin.longitude + f64::from(pose[4]) * DEGREES_PER_METRE,
                self.geo_origin.altitude + f64::from(pose[5]),
            ),
            eus_quaternion: [pose[0], pose[1], pose[2], pose[3]],
            horizontal_accuracy: 1.5,
            vertical_accuracy: 2.0,
            orientation_yaw_accuracy: 5.0,
        }
    }

    fn to_local(&self, coordinate: &GeodeticCoordinate, eus: &EusQuaternion) -> RawPose {
        [
            eus[0],
            eus[1],
            eus[2],
            eus[3],
            ((coordinate.longitude - self.geo_origin.longitude) / DEGREES_PER_METRE) as f32,
            (coordinate.altitude - self.geo_origin.altitude) as f32,
            (-(coordinate.latitude - self.geo_origin.latitude) / DEGREES_PER_METRE) as f32,
        ]
    }

    fn spawn_anchor(&mut self, pose: RawPose) -> AnchorHandle {
        let id = self.allocate_id();
        self.anchors.insert(
            id,
            SimAnchor {
                pose,
                tracking: TrackingState::Tracking,
                detached: false,
            },
        );
        self.ledger.acquire(ObjectKind::Anchor, id);
        AnchorHandle(id)
    }

    fn spawn_future(&mut self, kind: FutureKind, target: RawPose) -> FutureHandle {
        let id = self.allocate_id();
        self.futures.insert(
            id,
            SimFuture {
                kind,
                state: FutureState::Pending,
                target,
                outcome: Outcome::Unset,
            },
        );
        self.ledger.acquire(ObjectKind::Future, id);
        FutureHandle(id)
    }

    fn acquire_trackable(&mut self, id: u64) -> TrackableHandle {
        self.ledger.acquire(ObjectKind::Trackable, id);
        TrackableHandle(id)
    }

    fn finish(&mut self, future: FutureHandle, outcome: Outcome) -> bool {
        match self.futures.get_mut(&future.0) {
            Some(f) if f.state == FutureState::Pending => {
                f.state = FutureState::Done;
                f.outcome = outcome;
                true
            }
            _ => false,
        }
    }
}

/// Scripting handle onto the world behind a [`SimulatedSdk`].
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    inner: Rc<RefCell<World>>,
}

impl SimulatedWorld {
    fn world(&self) -> RefMut<'_, World> {
        self.inner.borrow_mut()
    }

    pub fn ledger(&self) -> Ref<'_, ReferenceLedger> {
        Ref::map(self.inner.borrow(), |world| &world.ledger)
    }

    pub fn set_depth_supported(&self, supported: bool) {
        self.world().depth_supported = supported;
    }

    pub fn fail_configure(&self, error: SdkError) {
        self.world().fail_configure = Some(error);
    }

    pub fn fail_image_database(&self, error: SdkError) {
        self.world().fail_image_database = Some(error);
    }

    pub fn configured(&self) -> Option<SdkConfig> {
        self.inner.borrow().configured.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    pub fn pause_count(&self) -> u32 {
        self.inner.borrow().pause_count
    }

    pub fn resume_count(&self) -> u32 {
        self.inner.borrow().resume_count
    }

    pub fn update_count(&self) -> u64 {
        self.inner.borrow().update_count
    }

    pub fn display_geometry(&self) -> Option<(i32, u32, u32)> {
        self.inner.borrow().display
    }

    pub fn projection_requests(&self) -> u32 {
        self.inner.borrow().projection_requests
    }

    pub fn set_camera(&self, state: TrackingState, pose: RawPose) {
        let mut world = self.world();
        world.camera_state = state;
        world.camera_pose = pose;
    }

    /// Adds a plane reported as updated on the next frame.
    pub fn add_plane(&self, center: RawPose, polygon: Vec<f32>) -> TrackableHandle {
        let mut world = self.world();
        let id = world.allocate_id();
        world.planes.insert(
            id,
            SimPlane {
                center,
                polygon,
                subsumed_by: None,
                tracking: TrackingState::Tracking,
            },
        );
        world.staged_planes.push(id);
        TrackableHandle(id)
    }

    pub fn move_plane(&self, plane: TrackableHandle, center: RawPose, polygon: Vec<f32>) {
        let mut world = self.world();
        if let Some(p) = world.planes.get_mut(&plane.0) {
            p.center = center;
            p.polygon = polygon;
            world.staged_planes.push(plane.0);
        }
    }

    /// Reports `plane` as updated next frame without changing it.
    pub fn touch_plane(&self, plane: TrackableHandle) {
        self.world().staged_planes.push(plane.0);
    }

    /// Reuses the handle value of a plane the SDK has let go of for a new
    /// physical plane, reported as updated next frame.
    pub fn recycle_plane(
        &self,
        plane: TrackableHandle,
        center: RawPose,
        polygon: Vec<f32>,
    ) -> TrackableHandle {
        let mut world = self.world();
        world.planes.insert(
            plane.0,
            SimPlane {
                center,
                polygon,
                subsumed_by: None,
                tracking: TrackingState::Tracking,
            },
        );
        world.staged_planes.push(plane.0);
        plane
    }

    pub fn subsume_plane(&self, plane: TrackableHandle, by: TrackableHandle) {
        if let Some(p) = self.world().planes.get_mut(&plane.0) {
            p.subsumed_by = Some(by.0);
        }
    }

    pub fn stop_plane(&self, plane: TrackableHandle) {
        if let Some(p) = self.world().planes.get_mut(&plane.0) {
            p.tracking = TrackingState::Stopped;
        }
    }

    pub fn add_image(
        &self,
        index: i32,
        extent_x: f32,
        pose: RawPose,
        method: ImageTrackingMethod,
    ) -> TrackableHandle {
        let mut world = self.world();
        let id = world.allocate_id();
        world.images.insert(
            id,
            SimImage {
                index,
                extent_x,
                pose,
                method,
            },
        );
        world.staged_images.push(id);
        TrackableHandle(id)
    }

    pub fn update_image(&self, image: TrackableHandle, pose: RawPose, method: ImageTrackingMethod) {
        let mut world = self.world();
        if let Some(i) = world.images.get_mut(&image.0) {
            i.pose = pose;
            i.method = method;
            world.staged_images.push(image.0);
        }
    }

    pub fn database_image_count(&self) -> usize {
        self.inner.borrow().database_images
    }

    pub fn is_image_database_enabled(&self) -> bool {
        self.inner.borrow().database_enabled
    }

    pub fn add_point_trackable(&self) -> TrackableHandle {
        let mut world = self.world();
        let id = world.allocate_id();
        world.point_trackables.insert(id);
        TrackableHandle(id)
    }

    /// `None` makes point cloud acquisition fail.
    pub fn set_point_cloud(&self, points: Option<Vec<NativePoint>>) {
        self.world().point_cloud = points;
    }

    pub fn fail_point_reads(&self, fail: bool) {
        self.world().fail_point_reads = fail;
    }

    pub fn set_hits(&self, hits: Vec<(RawPose, TrackableHandle)>) {
        self.world().hits = hits.into_iter().map(|(pose, t)| (pose, t.0)).collect();
    }

    pub fn last_ray(&self) -> Option<([f32; 3], [f32; 3])> {
        self.inner.borrow().last_ray
    }

    /// An anchor acquired outside the session, for handing over through
    /// `declare_anchor`.
    pub fn spawn_anchor(&self, pose: RawPose) -> AnchorHandle {
        self.world().spawn_anchor(pose)
    }

    pub fn set_anchor_tracking(&self, anchor: AnchorHandle, state: TrackingState) {
        if let Some(a) = self.world().anchors.get_mut(&anchor.0) {
            a.tracking = state;
        }
    }

    pub fn move_anchor(&self, anchor: AnchorHandle, pose: RawPose) {
        if let Some(a) = self.world().anchors.get_mut(&anchor.0) {
            a.pose = pose;
        }
    }

    pub fn is_anchor_detached(&self, anchor: AnchorHandle) -> bool {
        self.inner
            .borrow()
            .anchors
            .get(&anchor.0)
            .is_some_and(|a| a.detached)
    }

    pub fn set_earth(&self, state: Option<TrackingState>) {
        self.world().earth = state;
    }

    pub fn set_geo_origin(&self, origin: GeodeticCoordinate) {
        self.world().geo_origin = origin;
    }

    pub fn set_feature_map_quality(&self, quality: FeatureMapQuality) {
        self.world().feature_map_quality = quality;
    }

    /// Futures of `kind` still pending, oldest first.
    pub fn pending_futures(&self, kind: FutureKind) -> Vec<FutureHandle> {
        self.inner
            .borrow()
            .futures
            .iter()
            .filter(|(_, f)| f.kind == kind && f.state == FutureState::Pending)
            .map(|(id, _)| FutureHandle(*id))
            .collect()
    }

    pub fn complete_terrain(&self, future: FutureHandle, state: TerrainAnchorState) -> bool {
        self.world().finish(future, Outcome::Terrain(state))
    }

    pub fn complete_host(
        &self,
        future: FutureHandle,
        state: CloudAnchorState,
        cloud_anchor_id: Option<&str>,
    ) -> bool {
        self.world()
            .finish(future, Outcome::Host(state, cloud_anchor_id.map(str::to_owned)))
    }

    pub fn complete_resolve(&self, future: FutureHandle, state: CloudAnchorState, pose: RawPose) -> bool {
        self.world().finish(future, Outcome::Resolve(state, pose))
    }

    pub fn cancel_future(&self, future: FutureHandle) -> bool {
        match self.world().futures.get_mut(&future.0) {
            Some(f) if f.state == FutureState::Pending => {
                f.state = FutureState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Finishes every pending future of `kind` successfully. Hosted anchors
    /// get the id `cloud-<future>`.
    pub fn complete_all(&self, kind: FutureKind) -> usize {
        let pending = self.pending_futures(kind);
        for future in &pending {
            match kind {
                FutureKind::Terrain => {
                    self.complete_terrain(*future, TerrainAnchorState::Success);
                }
                FutureKind::Host => {
                    let id = format!("cloud-{}", future.0);
                    self.complete_host(*future, CloudAnchorState::Success, Some(&id));
                }
                FutureKind::Resolve => {
                    self.complete_resolve(*future, CloudAnchorState::Success, IDENTITY_POSE);
                }
            }
        }
        pending.len()
    }
}

/// [`ArSdk`] backed by a scripted [`World`].
#[derive(Debug)]
pub struct SimulatedSdk {
    inner: Rc<RefCell<World>>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(World::default())),
        }
    }

    pub fn world(&self) -> SimulatedWorld {
        SimulatedWorld {
            inner: Rc::clone(&self.inner),
        }
    }

    fn read(&self) -> Ref<'_, World> {
        self.inner.borrow()
    }

    fn write(&mut self) -> RefMut<'_, World> {
        self.inner.borrow_mut()
    }
}

impl ArSdk for SimulatedSdk {
    fn configure(&mut self, config: &SdkConfig) -> Result<(), SdkError> {
        let mut world = self.write();
        if let Some(err) = world.fail_configure.clone() {
            return Err(err);
        }
        world.configured = Some(config.clone());
        Ok(())
    }

    fn is_depth_supported(&self) -> bool {
        self.read().depth_supported
    }

    fn resume(&mut self) -> Result<(), SdkError> {
        let mut world = self.write();
        world.running = true;
        world.resume_count += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SdkError> {
        let mut world = self.write();
        world.running = false;
        world.pause_count += 1;
        Ok(())
    }

    fn set_display_geometry(&mut self, rotation: i32, width: u32, height: u32) {
        self.write().display = Some((rotation, width, height));
    }

    fn update(&mut self) -> Result<(), SdkError> {
        let mut world = self.write();
        if !world.running {
            return Err(SdkError::Status {
                call: "update",
                status: -3,
            });
        }
        world.update_count += 1;
        world.timestamp_ns += FRAME_INTERVAL_NS;
        world.frame_planes = std::mem::take(&mut world.staged_planes);
        world.frame_images = std::mem::take(&mut world.staged_images);
        debug!(
            target: "anchorage_providers::simulated",
            "frame {} planes={} images={}",
            world.update_count,
            world.frame_planes.len(),
            world.frame_images.len()
        );
        Ok(())
    }

    fn frame_timestamp_ns(&self) -> i64 {
        self.read().timestamp_ns
    }

    fn camera_tracking_state(&self) -> TrackingState {
        self.read().camera_state
    }

    fn camera_display_oriented_pose(&self) -> RawPose {
        self.read().camera_pose
    }

    fn camera_projection_matrix(&self, near: f32, far: f32) -> [f32; 16] {
        let mut world = self.inner.borrow_mut();
        world.projection_requests += 1;
        let aspect = match world.display {
            Some((_, w, h)) if h > 0 => w as f32 / h as f32,
            _ => 1.0,
        };
        let f = 1.0 / (std::f32::consts::FRAC_PI_6).tan();
        let mut m = [0.0_f32; 16];
        m[0] = f / aspect;
        m[5] = f;
        m[10] = (far + near) / (near - far);
        m[11] = -1.0;
        m[14] = 2.0 * far * near / (near - far);
        m
    }

    fn acquire_updated_trackables(&mut self, kind: TrackableKind) -> Vec<TrackableHandle> {
        let mut world = self.write();
        let ids = match kind {
            TrackableKind::Plane => world.frame_planes.clone(),
            TrackableKind::AugmentedImage => world.frame_images.clone(),
            TrackableKind::Point | TrackableKind::Other => Vec::new(),
        };
        ids.into_iter().map(|id| world.acquire_trackable(id)).collect()
    }

    fn trackable_kind(&self, trackable: TrackableHandle) -> TrackableKind {
        let world = self.read();
        if world.planes.contains_key(&trackable.0) {
            TrackableKind::Plane
        } else if world.images.contains_key(&trackable.0) {
            TrackableKind::AugmentedImage
        } else if world.point_trackables.contains(&trackable.0) {
            TrackableKind::Point
        } else {
            TrackableKind::Other
        }
    }

    fn trackable_tracking_state(&self, trackable: TrackableHandle) -> TrackingState {
        let world = self.read();
        if let Some(plane) = world.planes.get(&trackable.0) {
            return plane.tracking;
        }
        match world.images.get(&trackable.0) {
            Some(image) if image.method == ImageTrackingMethod::NotTracking => TrackingState::Paused,
            _ => TrackingState::Tracking,
        }
    }

    fn release_trackable(&mut self, trackable: TrackableHandle) {
        self.write().ledger.release(ObjectKind::Trackable, trackable.0);
    }

    fn acquire_subsuming_plane(&mut self, plane: TrackableHandle) -> Option<TrackableHandle> {
        let mut world = self.write();
        let parent = world.planes.get(&plane.0)?.subsumed_by?;
        Some(world.acquire_trackable(parent))
    }

    fn plane_center_pose(&self, plane: TrackableHandle) -> RawPose {
        self.read()
            .planes
            .get(&plane.0)
            .map_or(IDENTITY_POSE, |p| p.center)
    }

    fn plane_polygon(&self, plane: TrackableHandle) -> Vec<f32> {
        self.read()
            .planes
            .get(&plane.0)
            .map(|p| p.polygon.clone())
            .unwrap_or_default()
    }

    fn plane_contains_pose(&self, plane: TrackableHandle, pose: &RawPose) -> bool {
        let world = self.read();
        let Some(plane) = world.planes.get(&plane.0) else {
            return false;
        };
        // Axis-aligned planes only: compare against the outline's extent.
        let (dx, dz) = (pose[4] - plane.center[4], pose[6] - plane.center[6]);
        let xs = plane.polygon.iter().step_by(2);
        let zs = plane.polygon.iter().skip(1).step_by(2);
        let (min_x, max_x) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let (min_z, max_z) = zs.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        (min_x..=max_x).contains(&dx) && (min_z..=max_z).contains(&dz)
    }

    fn image_index(&self, image: TrackableHandle) -> i32 {
        self.read().images.get(&image.0).map_or(-1, |i| i.index)
    }

    fn image_extent_x(&self, image: TrackableHandle) -> f32 {
        self.read().images.get(&image.0).map_or(0.0, |i| i.extent_x)
    }

    fn image_center_pose(&self, image: TrackableHandle) -> RawPose {
        self.read()
            .images
            .get(&image.0)
            .map_or(IDENTITY_POSE, |i| i.pose)
    }

    fn image_tracking_method(&self, image: TrackableHandle) -> ImageTrackingMethod {
        self.read()
            .images
            .get(&image.0)
            .map_or(ImageTrackingMethod::NotTracking, |i| i.method)
    }

    fn hit_test_ray(&mut self, origin: [f32; 3], direction: [f32; 3]) -> Vec<NativeHit> {
        self.write().last_ray = Some((origin, direction));
        self.hit_test_screen(0.0, 0.0)
    }

    fn hit_test_screen(&mut self, _x: f32, _y: f32) -> Vec<NativeHit> {
        let mut world = self.write();
        let hits = world.hits.clone();
        hits.into_iter()
            .map(|(pose, id)| NativeHit {
                pose,
                trackable: world.acquire_trackable(id),
            })
            .collect()
    }

    fn acquire_point_cloud(&mut self) -> Result<PointCloudHandle, SdkError> {
        let mut world = self.write();
        if world.point_cloud.is_none() {
            return Err(SdkError::Unavailable("point cloud"));
        }
        let id = world.allocate_id();
        world.ledger.acquire(ObjectKind::PointCloud, id);
        Ok(PointCloudHandle(id))
    }

    fn point_cloud_points(&self, cloud: PointCloudHandle) -> Result<Vec<NativePoint>, SdkError> {
        let world = self.read();
        if world.fail_point_reads || world.ledger.held(ObjectKind::PointCloud, cloud.0) == 0 {
            return Err(SdkError::Status {
                call: "point_cloud_points",
                status: -1,
            });
        }
        Ok(world.point_cloud.clone().unwrap_or_default())
    }

    fn release_point_cloud(&mut self, cloud: PointCloudHandle) {
        self.write().ledger.release(ObjectKind::PointCloud, cloud.0);
    }

    fn create_image_database(&mut self) -> Result<(), SdkError> {
        let mut world = self.write();
        world.database_images = 0;
        world.database_enabled = false;
        Ok(())
    }

    fn add_database_image(
        &mut self,
        luminance: &[u8],
        width: u32,
        height: u32,
        _physical_width_m: Option<f32>,
    ) -> Result<i32, SdkError> {
        if luminance.len() != (width * height) as usize {
            return Err(SdkError::InvalidArgument("add_database_image"));
        }
        // A flat image has no features to track.
        if luminance.windows(2).all(|w| w[0] == w[1]) {
            return Err(SdkError::ImageInsufficientQuality);
        }
        let mut world = self.write();
        let index = world.database_images as i32;
        world.database_images += 1;
        Ok(index)
    }

    fn enable_image_database(&mut self) -> Result<(), SdkError> {
        let mut world = self.write();
        if let Some(err) = world.fail_image_database.clone() {
            return Err(err);
        }
        world.database_enabled = true;
        Ok(())
    }

    fn acquire_new_anchor(
        &mut self,
        pose: &RawPose,
        _trackable: Option<TrackableHandle>,
    ) -> Result<AnchorHandle, SdkError> {
        let mut world = self.write();
        if world.camera_state != TrackingState::Tracking {
            return Err(SdkError::NotTracking);
        }
        Ok(world.spawn_anchor(*pose))
    }

    fn anchor_pose(&self, anchor: AnchorHandle) -> RawPose {
        self.inner.borrow_mut().ledger.observe(ObjectKind::Anchor, anchor.0);
        self.read()
            .anchors
            .get(&anchor.0)
            .map_or(IDENTITY_POSE, |a| a.pose)
    }

    fn anchor_tracking_state(&self, anchor: AnchorHandle) -> TrackingState {
        self.inner.borrow_mut().ledger.observe(ObjectKind::Anchor, anchor.0);
        match self.read().anchors.get(&anchor.0) {
            Some(a) if !a.detached => a.tracking,
            _ => TrackingState::Stopped,
        }
    }

    fn detach_anchor(&mut self, anchor: AnchorHandle) {
        if let Some(a) = self.write().anchors.get_mut(&anchor.0) {
            a.detached = true;
        }
    }

    fn release_anchor(&mut self, anchor: AnchorHandle) {
        self.write().ledger.release(ObjectKind::Anchor, anchor.0);
    }

    fn earth_tracking_state(&self) -> Option<TrackingState> {
        self.read().earth
    }

    fn camera_geospatial_pose(&self) -> Result<GeospatialPose, SdkError> {
        let world = self.read();
        world.require_earth()?;
        Ok(world.to_geospatial(&world.camera_pose))
    }

    fn geospatial_pose_of(&self, pose: &RawPose) -> Result<GeospatialPose, SdkError> {
        let world = self.read();
        world.require_earth()?;
        Ok(world.to_geospatial(pose))
    }

    fn acquire_earth_anchor(
        &mut self,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<AnchorHandle, SdkError> {
        let mut world = self.write();
        world.require_earth()?;
        let pose = world.to_local(coordinate, eus);
        Ok(world.spawn_anchor(pose))
    }

    fn estimate_feature_map_quality(&self, _pose: &RawPose) -> Result<FeatureMapQuality, SdkError> {
        let world = self.read();
        if world.camera_state != TrackingState::Tracking {
            return Err(SdkError::NotTracking);
        }
        Ok(world.feature_map_quality)
    }

    fn resolve_anchor_on_terrain_async(
        &mut self,
        coordinate: &GeodeticCoordinate,
        eus: &EusQuaternion,
    ) -> Result<FutureHandle, SdkError> {
        let mut world = self.write();
        world.require_earth()?;
        let target = world.to_local(coordinate, eus);
        Ok(world.spawn_future(FutureKind::Terrain, target))
    }

    fn host_cloud_anchor_async(
        &mut self,
        anchor: AnchorHandle,
        ttl_days: u32,
    ) -> Result<FutureHandle, SdkError> {
        let mut world = self.write();
        if !(1..=365).contains(&ttl_days) {
            return Err(SdkError::InvalidArgument("host_cloud_anchor_async"));
        }
        let Some(target) = world.anchors.get(&anchor.0).map(|a| a.pose) else {
            return Err(SdkError::InvalidArgument("host_cloud_anchor_async"));
        };
        Ok(world.spawn_future(FutureKind::Host, target))
    }

    fn resolve_cloud_anchor_async(
        &mut self,
        cloud_anchor_id: &str,
    ) -> Result<FutureHandle, SdkError> {
        if cloud_anchor_id.is_empty() {
            return Err(SdkError::InvalidArgument("resolve_cloud_anchor_async"));
        }
        Ok(self.write().spawn_future(FutureKind::Resolve, IDENTITY_POSE))
    }

    fn future_state(&self, future: FutureHandle) -> FutureState {
        self.read()
            .futures
            .get(&future.0)
            .map_or(FutureState::Cancelled, |f| f.state)
    }

    fn acquire_terrain_result(&mut self, future: FutureHandle) -> TerrainResult {
        let mut world = self.write();
        let Some(f) = world.futures.get(&future.0).cloned() else {
            return TerrainResult {
                state: TerrainAnchorState::ErrorInternal,
                anchor: None,
            };
        };
        match f.outcome {
            Outcome::Terrain(TerrainAnchorState::Success) => TerrainResult {
                state: TerrainAnchorState::Success,
                anchor: Some(world.spawn_anchor(f.target)),
            },
            Outcome::Terrain(state) => TerrainResult {
                state,
                anchor: None,
            },
            _ => TerrainResult {
                state: TerrainAnchorState::ErrorInternal,
                anchor: None,
            },
        }
    }

    fn acquire_hosted_cloud_anchor_id(&mut self, future: FutureHandle) -> HostResult {
        match self.read().futures.get(&future.0).map(|f| &f.outcome) {
            Some(Outcome::Host(state, id)) => HostResult {
                state: *state,
                cloud_anchor_id: id.clone(),
            },
            _ => HostResult {
                state: CloudAnchorState::ErrorInternal,
                cloud_anchor_id: None,
            },
        }
    }

    fn acquire_resolved_cloud_anchor(&mut self, future: FutureHandle) -> ResolveResult {
        let mut world = self.write();
        let outcome = world.futures.get(&future.0).map(|f| f.outcome.clone());
        match outcome {
            Some(Outcome::Resolve(CloudAnchorState::Success, pose)) => ResolveResult {
                state: CloudAnchorState::Success,
                anchor: Some(world.spawn_anchor(pose)),
            },
            Some(Outcome::Resolve(state, _)) => ResolveResult {
                state,
                anchor: None,
            },
            _ => ResolveResult {
                state: CloudAnchorState::ErrorInternal,
                anchor: None,
            },
        }
    }

    fn release_future(&mut self, future: FutureHandle) {
        let mut world = self.write();
        world.ledger.release(ObjectKind::Future, future.0);
        if world.ledger.held(ObjectKind::Future, future.0) == 0 {
            world.futures.remove(&future.0);
        }
    }
}
