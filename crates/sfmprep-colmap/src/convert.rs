use glam::{DMat3, DQuat, DVec3};

use crate::error::ColmapError;
use crate::types::check_rotation;

/// A camera pose in the COLMAP convention.
///
/// The rotation is stored as (qw, qx, qy, qz) in the order of the `images.txt` columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColmapPose {
    /// Rotation quaternion (qw, qx, qy, qz).
    pub rotation: [f64; 4],
    /// Translation (tx, ty, tz).
    pub translation: [f64; 3],
}

/// Axis flip between the Bundler camera frame (y up, looking down -z) and the
/// viewer frame (y down, looking down +z).
fn axis_flip() -> DMat3 {
    DMat3::from_diagonal(DVec3::new(1.0, -1.0, -1.0))
}

/// Build a glam matrix from a row-major array.
pub(crate) fn mat3_from_rows(m: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(m).transpose()
}

/// Convert a glam matrix to a row-major array.
pub(crate) fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Convert a Bundler pose to the COLMAP convention.
///
/// The conversion goes through the viewer convention and must be applied in this order:
///
/// 1. `R1 = R^T`, camera center `C = -R1 * t`.
/// 2. `R3 = (R1 * diag(1, -1, -1))^T`.
/// 3. `t' = -(R3 * C)`.
///
/// `R3` is turned into a unit quaternion (x, y, z, w) and emitted as (-w, -x, -y, -z).
///
/// # Arguments
///
/// * `rotation` - The world-to-camera rotation, row-major.
/// * `translation` - The world-to-camera translation.
///
/// # Returns
///
/// The pose in the COLMAP convention.
///
/// # Errors
///
/// Returns [`ColmapError::MalformedPose`] when `rotation` is not a proper rotation.
///
/// Example:
///
/// ```
/// use sfmprep_colmap::convert::convert_pose;
///
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let pose = convert_pose(&rotation, &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(pose.translation, [1.0, -2.0, -3.0]);
/// ```
pub fn convert_pose(
    rotation: &[[f64; 3]; 3],
    translation: &[f64; 3],
) -> Result<ColmapPose, ColmapError> {
    check_rotation(rotation).map_err(|reason| ColmapError::MalformedPose { index: 0, reason })?;

    let flip = axis_flip();

    // bundler to viewer: camera-to-world rotation and camera center
    let r1 = mat3_from_rows(rotation).transpose();
    let center = -(r1 * DVec3::from_array(*translation));

    // viewer to colmap: flip the camera axes and go back to world-to-camera
    let r3 = (r1 * flip).transpose();
    let t = -(r3 * center);

    let q = rotation_to_quaternion(&r3);

    Ok(ColmapPose {
        rotation: [-q.w, -q.x, -q.y, -q.z],
        translation: t.to_array(),
    })
}

/// Whether a row-major matrix is a proper rotation within [`crate::types::ROTATION_TOLERANCE`].
pub fn is_rotation(m: &[[f64; 3]; 3]) -> bool {
    check_rotation(m).is_ok()
}

/// Convert a rotation matrix to a unit quaternion.
///
/// The component with the largest magnitude is recovered first from the diagonal
/// (or the trace) so the divisions never use a small denominator. Ties go to the
/// diagonal entries before the trace, and the recovered component is positive.
pub fn rotation_to_quaternion(m: &DMat3) -> DQuat {
    let (m00, m01, m02) = (m.x_axis.x, m.y_axis.x, m.z_axis.x);
    let (m10, m11, m12) = (m.x_axis.y, m.y_axis.y, m.z_axis.y);
    let (m20, m21, m22) = (m.x_axis.z, m.y_axis.z, m.z_axis.z);
    let trace = m00 + m11 + m22;

    let candidates = [m00, m11, m22, trace];
    let choice = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > candidates[best] { i } else { best });

    let (x, y, z, w) = match choice {
        0 => {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            (0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        }
        1 => {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            ((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
        }
        2 => {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            ((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
        }
        _ => {
            let s = 2.0 * (1.0 + trace).sqrt();
            ((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s)
        }
    };

    DQuat::from_xyzw(x, y, z, w).normalize()
}

/// Convert a COLMAP (qw, qx, qy, qz) quaternion to a row-major rotation matrix.
pub fn quaternion_to_rotation(q: &[f64; 4]) -> [[f64; 3]; 3] {
    let quat = DQuat::from_xyzw(q[1], q[2], q[3], q[0]).normalize();
    mat3_to_rows(&DMat3::from_quat(quat))
}

/// Undo [`convert_pose`] and recover the Bundler rotation and translation.
pub fn invert_colmap_pose(pose: &ColmapPose) -> ([[f64; 3]; 3], [f64; 3]) {
    let flip = axis_flip();

    // q and -q encode the same rotation, so the sign flip needs no undoing
    let r3 = mat3_from_rows(&quaternion_to_rotation(&pose.rotation));
    let center = -(r3.transpose() * DVec3::from_array(pose.translation));

    // flip is its own inverse
    let r1 = r3.transpose() * flip;
    let rotation = r1.transpose();
    let translation = -(rotation * center);

    (mat3_to_rows(&rotation), translation.to_array())
}
