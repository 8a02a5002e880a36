//! Declarative changes to a [`SimulatedWorld`], loadable from YAML.

use std::collections::HashMap;

use anchorage_core::math::{GeodeticCoordinate, RawPose};
use anchorage_core::sdk::{
    CloudAnchorState, FeatureMapQuality, ImageTrackingMethod, NativePoint, TerrainAnchorState,
    TrackableHandle, TrackingState,
};
use log::{debug, warn};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::simulated::{FutureKind, SimulatedWorld};

/// Position plus yaw in degrees around +y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSpec {
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_deg: f32,
}

impl PoseSpec {
    pub fn to_raw(self) -> RawPose {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw_deg.to_radians());
        let q = rotation.quaternion();
        let [x, y, z] = self.position;
        [q.i, q.j, q.k, q.w, x, y, z]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    Camera {
        tracking: TrackingState,
        #[serde(default)]
        pose: PoseSpec,
    },
    AddPlane {
        name: String,
        center: PoseSpec,
        polygon: Vec<f32>,
    },
    MovePlane {
        name: String,
        center: PoseSpec,
        polygon: Vec<f32>,
    },
    SubsumePlane {
        name: String,
        by: String,
    },
    StopPlane {
        name: String,
    },
    AddImage {
        name: String,
        index: i32,
        width_m: f32,
        pose: PoseSpec,
    },
    UpdateImage {
        name: String,
        pose: PoseSpec,
        method: ImageTrackingMethod,
    },
    PointCloud {
        /// `[x, y, z, confidence]`; ids are assigned in order.
        points: Option<Vec<[f32; 4]>>,
    },
    Hits {
        /// Plane names hit, nearest first, with the hit pose.
        planes: Vec<(String, PoseSpec)>,
    },
    Earth {
        tracking: Option<TrackingState>,
        #[serde(default)]
        origin: Option<GeodeticCoordinate>,
    },
    FeatureMapQuality {
        quality: FeatureMapQuality,
    },
    CompleteAll {
        kind: FutureKind,
    },
    FailFutures {
        kind: FutureKind,
    },
}

/// Applies [`WorldEvent`]s, resolving the names they use to handles.
#[derive(Debug)]
pub struct ScriptedWorld {
    world: SimulatedWorld,
    trackables: HashMap<String, TrackableHandle>,
}

impl ScriptedWorld {
    pub fn new(world: SimulatedWorld) -> Self {
        Self {
            world,
            trackables: HashMap::new(),
        }
    }

    pub fn world(&self) -> &SimulatedWorld {
        &self.world
    }

    pub fn trackable(&self, name: &str) -> Option<TrackableHandle> {
        self.trackables.get(name).copied()
    }

    /// Applies `event`; events naming unknown trackables are skipped.
    pub fn apply(&mut self, event: &WorldEvent) {
        debug!(target: "anchorage_providers::scenario", "apply {event:?}");
        match event {
            WorldEvent::Camera { tracking, pose } => self.world.set_camera(*tracking, pose.to_raw()),
            WorldEvent::AddPlane {
                name,
                center,
                polygon,
            } => {
                let handle = self.world.add_plane(center.to_raw(), polygon.clone());
                self.trackables.insert(name.clone(), handle);
            }
            WorldEvent::MovePlane {
                name,
                center,
                polygon,
            } => {
                if let Some(handle) = self.lookup(name) {
                    self.world.move_plane(handle, center.to_raw(), polygon.clone());
                }
            }
            WorldEvent::SubsumePlane { name, by } => {
                if let (Some(plane), Some(parent)) = (self.lookup(name), self.lookup(by)) {
                    self.world.subsume_plane(plane, parent);
                    self.world.touch_plane(plane);
                }
            }
            WorldEvent::StopPlane { name } => {
                if let Some(plane) = self.lookup(name) {
                    self.world.stop_plane(plane);
                    self.world.touch_plane(plane);
                }
            }
            WorldEvent::AddImage {
                name,
                index,
                width_m,
                pose,
            } => {
                let handle = self.world.add_image(
                    *index,
                    *width_m,
                    pose.to_raw(),
                    ImageTrackingMethod::FullTracking,
                );
                self.trackables.insert(name.clone(), handle);
            }
            WorldEvent::UpdateImage { name, pose, method } => {
                if let Some(handle) = self.lookup(name) {
                    self.world.update_image(handle, pose.to_raw(), *method);
                }
            }
            WorldEvent::PointCloud { points } => {
                let points = points.as_ref().map(|points| {
                    points
                        .iter()
                        .enumerate()
                        .map(|(id, xyzc)| NativePoint {
                            xyzc: *xyzc,
                            id: id as i32,
                        })
                        .collect()
                });
                self.world.set_point_cloud(points);
            }
            WorldEvent::Hits { planes } => {
                let hits = planes
                    .iter()
                    .filter_map(|(name, pose)| Some((pose.to_raw(), self.lookup(name)?)))
                    .collect();
                self.world.set_hits(hits);
            }
            WorldEvent::Earth { tracking, origin } => {
                self.world.set_earth(*tracking);
                if let Some(origin) = origin {
                    self.world.set_geo_origin(*origin);
                }
            }
            WorldEvent::FeatureMapQuality { quality } => self.world.set_feature_map_quality(*quality),
            WorldEvent::CompleteAll { kind } => {
                self.world.complete_all(*kind);
            }
            WorldEvent::FailFutures { kind } => {
                for future in self.world.pending_futures(*kind) {
                    match kind {
                        FutureKind::Terrain => {
                            self.world
                                .complete_terrain(future, TerrainAnchorState::ErrorUnsupportedLocation);
                        }
                        FutureKind::Host => {
                            self.world
                                .complete_host(future, CloudAnchorState::ErrorNotAuthorized, None);
                        }
                        FutureKind::Resolve => {
                            self.world.complete_resolve(
                                future,
                                CloudAnchorState::ErrorCloudIdNotFound,
                                PoseSpec::default().to_raw(),
                            );
                        }
                    }
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<TrackableHandle> {
        let handle = self.trackable(name);
        if handle.is_none() {
            warn!(target: "anchorage_providers::scenario", "unknown trackable '{name}'");
        }
        handle
    }
}
