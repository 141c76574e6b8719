#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the conversion.
///
/// Defines [`ColmapError`] variants for malformed poses, parse failures and file access.
pub mod error;

/// Camera poses, input images and the [`types::Bundle`] pairing them.
pub mod types;

/// Pose conversion from the Bundler convention to the COLMAP convention.
///
/// See [`convert::convert_pose`] for the frame changes involved.
pub mod convert;

/// Writing a [`types::Bundle`] as a COLMAP sparse model.
pub mod export;

/// Bundler and COLMAP text formats.
pub mod io;

/// Output directory layout and dataset preparation helpers.
pub mod layout;

/// Area-averaging image rescaling.
pub mod resize;

pub use crate::convert::{convert_pose, ColmapPose};
pub use crate::error::ColmapError;
pub use crate::export::{rescale_intrinsics, write_camera_file, PinholeIntrinsics};
pub use crate::io::bundler::read_bundle;
pub use crate::resize::resize_images;
pub use crate::types::{Bundle, CameraPose, InputImage};
