use std::path::{Path, PathBuf};

use crate::error::ColmapError;

/// Tolerance used to accept a matrix as a rotation.
pub const ROTATION_TOLERANCE: f64 = 1e-6;

/// A camera pose as stored in a Bundler file.
///
/// The rotation is row-major and maps world points into the camera frame,
/// `x_cam = R * x_world + t`, with the camera looking down its negative z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    /// World-to-camera rotation, row-major.
    pub rotation: [[f64; 3]; 3],
    /// World-to-camera translation.
    pub translation: [f64; 3],
    /// Focal length in pixels.
    pub focal_length: f64,
    /// Radial distortion coefficients (k1, k2).
    pub radial_distortion: (f64, f64),
}

impl CameraPose {
    /// Create a pose without distortion.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3], focal_length: f64) -> Self {
        Self {
            rotation,
            translation,
            focal_length,
            radial_distortion: (0.0, 0.0),
        }
    }

    /// Check that the rotation is orthonormal with a positive determinant.
    ///
    /// # Arguments
    ///
    /// * `index` - The camera index reported in the error.
    pub fn validate(&self, index: usize) -> Result<(), ColmapError> {
        check_rotation(&self.rotation).map_err(|reason| ColmapError::MalformedPose { index, reason })
    }
}

/// Check that `m` is a proper rotation within [`ROTATION_TOLERANCE`].
///
/// Returns a description of the first violated property.
pub(crate) fn check_rotation(m: &[[f64; 3]; 3]) -> Result<(), String> {
    if m.iter().flatten().any(|v| !v.is_finite()) {
        return Err("rotation contains non-finite values".to_string());
    }

    // R * R^T must be the identity
    for i in 0..3 {
        for j in 0..3 {
            let dot = (0..3).map(|k| m[i][k] * m[j][k]).sum::<f64>();
            let expected = if i == j { 1.0 } else { 0.0 };
            if (dot - expected).abs() > ROTATION_TOLERANCE {
                return Err(format!(
                    "rows {i} and {j} are not orthonormal (dot = {dot:.9})"
                ));
            }
        }
    }

    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if (det - 1.0).abs() > ROTATION_TOLERANCE {
        return Err(format!("determinant is {det:.9}, expected 1"));
    }

    Ok(())
}

/// An input image of the reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    /// Path to the image file.
    pub path: PathBuf,
    /// Image size in pixels as (width, height).
    pub resolution: (u32, u32),
}

impl InputImage {
    /// Create a new input image, rejecting empty resolutions.
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Result<Self, ColmapError> {
        let path = path.into();
        if width == 0 || height == 0 {
            return Err(ColmapError::InvalidResolution {
                path,
                width,
                height,
            });
        }
        Ok(Self {
            path,
            resolution: (width, height),
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.resolution.0
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.resolution.1
    }

    /// The file name without its directory.
    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A parsed reconstruction: cameras and images paired by position.
///
/// Camera `i` was registered from image `i`; the source format carries no
/// other link between the two, so the order must never change.
#[derive(Debug, Clone)]
pub struct Bundle {
    cameras: Vec<CameraPose>,
    images: Vec<InputImage>,
    num_points: usize,
}

impl Bundle {
    /// Create a bundle, checking that cameras and images line up.
    pub fn new(cameras: Vec<CameraPose>, images: Vec<InputImage>) -> Result<Self, ColmapError> {
        if cameras.len() != images.len() {
            return Err(ColmapError::CountMismatch {
                cameras: cameras.len(),
                images: images.len(),
            });
        }
        Ok(Self {
            cameras,
            images,
            num_points: 0,
        })
    }

    /// Record the number of sparse points declared by the source file.
    pub fn with_num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// The camera poses in input order.
    pub fn cameras(&self) -> &[CameraPose] {
        &self.cameras
    }

    /// The input images in input order.
    pub fn images(&self) -> &[InputImage] {
        &self.images
    }

    /// Number of sparse points declared by the source file.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Number of camera/image pairs.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Whether the bundle has no cameras.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Iterate over (camera, image) pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&CameraPose, &InputImage)> {
        self.cameras.iter().zip(self.images.iter())
    }
}
