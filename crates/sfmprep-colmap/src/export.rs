use std::path::Path;

use crate::convert::convert_pose;
use crate::error::ColmapError;
use crate::io::colmap::{
    write_cameras_txt, write_images_txt, write_points3d_txt, CameraModel, ColmapCamera,
    ColmapImage,
};
use crate::resize::rescaled_size;
use crate::types::Bundle;

/// Name of the camera intrinsics file of a sparse model.
pub const CAMERAS_FILE_NAME: &str = "cameras.txt";

/// Name of the camera pose file of a sparse model.
pub const IMAGES_FILE_NAME: &str = "images.txt";

/// Name of the point file of a sparse model.
pub const POINTS3D_FILE_NAME: &str = "points3D.txt";

/// Intrinsics of a `PINHOLE` camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Horizontal focal length in pixels.
    pub fx: f64,
    /// Vertical focal length in pixels.
    pub fy: f64,
    /// Principal point x coordinate.
    pub cx: f64,
    /// Principal point y coordinate.
    pub cy: f64,
}

impl PinholeIntrinsics {
    /// Square pixels with the principal point at the image center.
    pub fn centered(width: u32, height: u32, focal_length: f64) -> Self {
        Self {
            width,
            height,
            fx: focal_length,
            fy: focal_length,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }

    /// The parameters in the `PINHOLE` order: fx, fy, cx, cy.
    pub fn params(&self) -> Vec<f64> {
        vec![self.fx, self.fy, self.cx, self.cy]
    }
}

/// Compute the intrinsics of a camera, optionally rescaled to a new image width.
///
/// The focal length is scaled by `target_width / width` so that `f / width` is unchanged,
/// and the principal point is taken from the new dimensions.
///
/// # Arguments
///
/// * `focal_length` - The focal length in pixels of the original image.
/// * `width` - The original image width.
/// * `height` - The original image height.
/// * `target_width` - The new width, or `None` to keep the original size.
///
/// Example:
///
/// ```
/// use sfmprep_colmap::export::rescale_intrinsics;
///
/// let intrinsics = rescale_intrinsics(3200.0, 4000, 3000, Some(1000)).unwrap();
/// assert_eq!((intrinsics.width, intrinsics.height), (1000, 750));
/// assert_eq!(intrinsics.fx, 800.0);
/// ```
pub fn rescale_intrinsics(
    focal_length: f64,
    width: u32,
    height: u32,
    target_width: Option<u32>,
) -> Result<PinholeIntrinsics, ColmapError> {
    let Some(target_width) = target_width else {
        return Ok(PinholeIntrinsics::centered(width, height, focal_length));
    };

    let (new_width, new_height) = rescaled_size(width, height, target_width)?;
    let scale = new_width as f64 / width as f64;

    Ok(PinholeIntrinsics::centered(
        new_width,
        new_height,
        focal_length * scale,
    ))
}

/// Write a bundle as a COLMAP text model into `sparse_dir`.
///
/// One `PINHOLE` camera and one image are written per camera/image pair, both with the
/// id `i + 1` for the pair at index `i`. Image names are base names. The point file is
/// written with an empty point list so the directory is a complete model.
///
/// The directory is created when missing and existing model files are overwritten.
///
/// # Arguments
///
/// * `bundle` - The cameras and images to write.
/// * `sparse_dir` - The output directory.
/// * `target_width` - Rescale the intrinsics to this image width.
///
/// # Returns
///
/// The number of cameras written.
///
/// # Errors
///
/// Fails before writing anything if a pose is malformed or the target width is zero.
pub fn write_camera_file(
    bundle: &Bundle,
    sparse_dir: impl AsRef<Path>,
    target_width: Option<u32>,
) -> Result<usize, ColmapError> {
    if target_width == Some(0) {
        return Err(ColmapError::InvalidTargetWidth);
    }

    let mut cameras = Vec::with_capacity(bundle.len());
    let mut images = Vec::with_capacity(bundle.len());

    for (index, (pose, image)) in bundle.iter().enumerate() {
        pose.validate(index)?;

        let colmap_pose = convert_pose(&pose.rotation, &pose.translation)?;

        let intrinsics = rescale_intrinsics(
            pose.focal_length,
            image.width(),
            image.height(),
            target_width,
        )?;

        let id = index as u32 + 1;
        cameras.push(ColmapCamera {
            camera_id: id,
            model: CameraModel::Pinhole,
            width: intrinsics.width as usize,
            height: intrinsics.height as usize,
            params: intrinsics.params(),
        });
        images.push(ColmapImage {
            name: image.file_name(),
            image_id: id,
            camera_id: id,
            rotation: colmap_pose.rotation,
            translation: colmap_pose.translation,
            points2d: Vec::new(),
        });
    }

    let sparse_dir = sparse_dir.as_ref();
    std::fs::create_dir_all(sparse_dir)?;

    write_cameras_txt(sparse_dir.join(CAMERAS_FILE_NAME), &cameras)?;
    write_images_txt(sparse_dir.join(IMAGES_FILE_NAME), &images)?;
    write_points3d_txt(sparse_dir.join(POINTS3D_FILE_NAME), &[])?;

    log::info!(
        "Wrote {} cameras to {}",
        cameras.len(),
        sparse_dir.display()
    );

    Ok(cameras.len())
}
