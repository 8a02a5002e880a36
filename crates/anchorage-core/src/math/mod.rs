pub mod geo;
pub mod pose;

pub use geo::{EusQuaternion, GeodeticCoordinate, GeospatialPose};
pub use pose::{Pose, RawPose, Ray, pose_from_raw, pose_to_matrix, pose_to_raw};
