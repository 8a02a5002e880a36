use serde::{Deserialize, Serialize};

/// Orientation in the East-Up-South frame, `[x, y, z, w]`.
pub type EusQuaternion = [f32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeodeticCoordinate {
    /// Degrees, WGS84.
    pub latitude: f64,
    /// Degrees, WGS84.
    pub longitude: f64,
    /// Metres above the WGS84 ellipsoid.
    pub altitude: f64,
}

impl GeodeticCoordinate {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Geodetic pose as reported by the Earth object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeospatialPose {
    pub coordinate: GeodeticCoordinate,
    pub eus_quaternion: EusQuaternion,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    pub orientation_yaw_accuracy: f64,
}

impl Default for GeospatialPose {
    fn default() -> Self {
        Self {
            coordinate: GeodeticCoordinate::default(),
            eus_quaternion: [0.0, 0.0, 0.0, 1.0],
            horizontal_accuracy: 0.0,
            vertical_accuracy: 0.0,
            orientation_yaw_accuracy: 0.0,
        }
    }
}
