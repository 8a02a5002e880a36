use serde::{Deserialize, Serialize};

use crate::sdk::SdkConfig;

/// Session configuration. Everything except `sdk` can also be changed at
/// runtime through the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Diff planes every tracked frame.
    #[serde(default)]
    pub plane_detection: bool,
    /// Snapshot the point cloud every tracked frame.
    #[serde(default)]
    pub feature_points: bool,
    #[serde(default = "default_depth_near_z")]
    pub depth_near_z: f32,
    #[serde(default = "default_depth_far_z")]
    pub depth_far_z: f32,
    /// Pose (metres, radians) and outline (metres) change below which a
    /// plane is not reported as updated.
    #[serde(default = "default_plane_change_tolerance")]
    pub plane_change_tolerance: f32,
    #[serde(default)]
    pub sdk: SdkConfig,
}

fn default_depth_near_z() -> f32 {
    0.5
}

fn default_depth_far_z() -> f32 {
    1000.0
}

fn default_plane_change_tolerance() -> f32 {
    1e-4
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            plane_detection: false,
            feature_points: false,
            depth_near_z: default_depth_near_z(),
            depth_far_z: default_depth_far_z(),
            plane_change_tolerance: default_plane_change_tolerance(),
            sdk: SdkConfig::default(),
        }
    }
}
