use std::str::FromStr;

use crate::error::ColmapError;

/// The camera models a sparse model of this crate may contain.
///
/// Export only writes [`CameraModel::Pinhole`]; the others are accepted when reading
/// models refined by COLMAP itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModel {
    /// f, cx, cy
    SimplePinhole,
    /// fx, fy, cx, cy
    Pinhole,
    /// f, cx, cy, k
    SimpleRadial,
    /// f, cx, cy, k1, k2
    Radial,
    /// fx, fy, cx, cy, k1, k2, p1, p2
    OpenCv,
}

impl CameraModel {
    /// The model name used in cameras.txt.
    pub fn name(&self) -> &'static str {
        match self {
            CameraModel::SimplePinhole => "SIMPLE_PINHOLE",
            CameraModel::Pinhole => "PINHOLE",
            CameraModel::SimpleRadial => "SIMPLE_RADIAL",
            CameraModel::Radial => "RADIAL",
            CameraModel::OpenCv => "OPENCV",
        }
    }

    /// Number of PARAMS[] values of a camera line.
    pub fn num_params(&self) -> usize {
        match self {
            CameraModel::SimplePinhole => 3,
            CameraModel::Pinhole => 4,
            CameraModel::SimpleRadial => 4,
            CameraModel::Radial => 5,
            CameraModel::OpenCv => 8,
        }
    }
}

impl FromStr for CameraModel {
    type Err = ColmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            CameraModel::SimplePinhole,
            CameraModel::Pinhole,
            CameraModel::SimpleRadial,
            CameraModel::Radial,
            CameraModel::OpenCv,
        ]
        .into_iter()
        .find(|model| model.name() == s)
        .ok_or_else(|| ColmapError::ParseError(format!("Unsupported camera model: {s}")))
    }
}

/// A cameras.txt line.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id, starting at 1.
    pub camera_id: u32,
    /// Projection model.
    pub model: CameraModel,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Model parameters, [`CameraModel::num_params`] of them.
    pub params: Vec<f64>,
}

/// The two images.txt lines of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// File name relative to the image directory.
    pub name: String,
    /// Image id, starting at 1.
    pub image_id: u32,
    /// Id of the camera in cameras.txt.
    pub camera_id: u32,
    /// World-to-camera rotation (qw, qx, qy, qz).
    pub rotation: [f64; 4],
    /// World-to-camera translation.
    pub translation: [f64; 3],
    /// Observations as (x, y, point3d_id), -1 for unmatched keypoints.
    pub points2d: Vec<(f64, f64, i64)>,
}

/// A points3D.txt line.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    /// Point id.
    pub point3d_id: u64,
    /// World position.
    pub xyz: [f64; 3],
    /// Color.
    pub rgb: [u8; 3],
    /// Mean reprojection error.
    pub error: f64,
    /// Observations as (image_id, point2d_idx).
    pub track: Vec<(u32, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() -> Result<(), ColmapError> {
        assert_eq!("PINHOLE".parse::<CameraModel>()?, CameraModel::Pinhole);
        assert_eq!("OPENCV".parse::<CameraModel>()?.num_params(), 8);
        assert_eq!(CameraModel::SimpleRadial.name(), "SIMPLE_RADIAL");
        assert!(matches!(
            "THIN_PRISM_FISHEYE".parse::<CameraModel>(),
            Err(ColmapError::ParseError(_))
        ));
        Ok(())
    }
}
