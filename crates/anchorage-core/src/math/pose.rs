use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Rigid transform in the session's local frame (y up, metres).
pub type Pose = Isometry3<f32>;

/// Native pose layout: `[qx, qy, qz, qw, px, py, pz]`.
pub type RawPose = [f32; 7];

pub fn pose_to_raw(pose: &Pose) -> RawPose {
    let q = pose.rotation.quaternion();
    let t = &pose.translation.vector;
    [q.i, q.j, q.k, q.w, t.x, t.y, t.z]
}

/// Builds a pose from the native layout. The quaternion is kept as delivered
/// so that `pose_to_raw(pose_from_raw(raw)) == raw` bit for bit.
pub fn pose_from_raw(raw: &RawPose) -> Pose {
    let rotation = UnitQuaternion::new_unchecked(Quaternion::new(raw[3], raw[0], raw[1], raw[2]));
    Isometry3::from_parts(Translation3::new(raw[4], raw[5], raw[6]), rotation)
}

/// Column-major 4x4 homogeneous matrix, the layout native `getMatrix` calls fill.
pub fn pose_to_matrix(pose: &Pose) -> [f32; 16] {
    let mut out = [0.0_f32; 16];
    out.copy_from_slice(pose.to_homogeneous().as_slice());
    out
}

/// Ray expressed relative to the camera (origin offset and direction).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// Moves a camera-relative ray into world space: the direction is
    /// normalised and rotated, the origin offset is rotated and added to the
    /// camera position.
    pub fn to_world(&self, camera: &Pose) -> Ray {
        let direction = camera.rotation * self.direction.normalize();
        let offset = camera.rotation * self.origin.coords;
        Ray {
            origin: Point3::from(camera.translation.vector + offset),
            direction,
        }
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Point3::origin(), -Vector3::z())
    }
}
