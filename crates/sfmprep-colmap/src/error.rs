use std::path::PathBuf;

/// An error type for the colmap crate.
#[derive(thiserror::Error, Debug)]
pub enum ColmapError {
    /// Error reading or writing a file.
    #[error("Failed to manipulate the file. {0}")]
    IoError(#[from] std::io::Error),

    /// Error when a required input file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Parse error in one of the text formats.
    #[error("Parse error {0}")]
    ParseError(String),

    /// The camera rotation is not a proper rotation matrix.
    #[error("Malformed pose for camera {index}: {reason}")]
    MalformedPose {
        /// Zero-based index of the camera in the bundle.
        index: usize,
        /// What the check found.
        reason: String,
    },

    /// Cameras and images are paired by position and must have the same count.
    #[error("Bundle has {cameras} cameras but {images} images")]
    CountMismatch {
        /// Number of cameras.
        cameras: usize,
        /// Number of images.
        images: usize,
    },

    /// Image width or height is zero.
    #[error("Invalid resolution {width}x{height} for image {path}")]
    InvalidResolution {
        /// Path of the offending image.
        path: PathBuf,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// A pixel buffer does not hold width * height * channels values.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// The requested output width is zero.
    #[error("Target width must be positive")]
    InvalidTargetWidth,

    /// Error decoding or encoding an image.
    #[error("Failed to process the image. {0}")]
    ImageError(#[from] image::ImageError),
}
