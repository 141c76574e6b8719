use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ColmapError;
use crate::export::{CAMERAS_FILE_NAME, IMAGES_FILE_NAME};
use crate::io::bundler::list_image_files;
use crate::io::colmap::{read_images_txt, write_images_txt, ColmapImage};
use crate::types::base_name;

/// Output directories of a converted reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColmapLayout {
    /// Directory receiving cameras.txt, images.txt and points3D.txt.
    pub sparse_dir: PathBuf,
    /// Directory receiving the (possibly rescaled) images.
    pub images_dir: PathBuf,
}

impl ColmapLayout {
    /// The sparse model at the root of `out_dir`, images in `out_dir/images`.
    pub fn sparse_only(out_dir: impl AsRef<Path>) -> Self {
        let out_dir = out_dir.as_ref();
        Self {
            sparse_dir: out_dir.to_path_buf(),
            images_dir: out_dir.join("images"),
        }
    }

    /// The dense workspace hierarchy: `out_dir/stereo/sparse` and `out_dir/stereo/images`.
    pub fn stereo(out_dir: impl AsRef<Path>) -> Self {
        let stereo_dir = out_dir.as_ref().join("stereo");
        Self {
            sparse_dir: stereo_dir.join("sparse"),
            images_dir: stereo_dir.join("images"),
        }
    }

    /// Create both directories.
    pub fn create(&self) -> Result<(), ColmapError> {
        std::fs::create_dir_all(&self.sparse_dir)?;
        std::fs::create_dir_all(&self.images_dir)?;
        Ok(())
    }
}

/// Copy the textured mesh exported next to a RealityCapture directory.
///
/// The mesh is read from `<rc_dir>/../meshes` and written to `<out_dir>/../capreal`;
/// the texture is also copied as `texture.png`.
///
/// # Returns
///
/// Whether a mesh was found and copied.
pub fn copy_mesh(rc_dir: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<bool, ColmapError> {
    let mesh_dir = sibling_dir(rc_dir.as_ref(), "meshes");
    let capreal_dir = sibling_dir(out_dir.as_ref(), "capreal");

    let mesh = mesh_dir.join("mesh.obj");
    if !mesh.exists() {
        log::warn!("No mesh found at {}", mesh.display());
        return Ok(false);
    }

    std::fs::create_dir_all(&capreal_dir)?;
    std::fs::copy(&mesh, capreal_dir.join("mesh.obj"))?;

    let copies = [
        ("mesh.mtl", "mesh.mtl"),
        ("mesh_u1_v1.png", "mesh_u1_v1.png"),
        ("mesh_u1_v1.png", "texture.png"),
    ];
    for (src_name, dst_name) in copies {
        let src = mesh_dir.join(src_name);
        if src.exists() {
            std::fs::copy(&src, capreal_dir.join(dst_name))?;
        } else {
            log::warn!("Mesh companion {} is missing", src.display());
        }
    }

    log::info!("Copied mesh {} to {}", mesh.display(), capreal_dir.display());
    Ok(true)
}

/// `<dir>/../<name>`, resolving `dir` first so relative and trailing-dot paths work.
fn sibling_dir(dir: &Path, name: &str) -> PathBuf {
    let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    match dir.parent() {
        Some(parent) => parent.join(name),
        None => dir.join(name),
    }
}

/// Number of images copied by [`split_train_test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitCounts {
    /// Images copied to the train directory.
    pub train: usize,
    /// Images copied to the test directory.
    pub test: usize,
}

/// Split the images of a directory into `dataset_dir/train` and `dataset_dir/test`.
///
/// Images are taken in file name order and every `test_every`-th one, starting with the
/// first, goes to the test set. Copies are prefixed with `train_` or `test_`.
pub fn split_train_test(
    images_dir: impl AsRef<Path>,
    dataset_dir: impl AsRef<Path>,
    test_every: usize,
) -> Result<SplitCounts, ColmapError> {
    if test_every == 0 {
        return Err(ColmapError::ParseError(
            "test_every must be positive".to_string(),
        ));
    }

    let train_dir = dataset_dir.as_ref().join("train");
    let test_dir = dataset_dir.as_ref().join("test");
    std::fs::create_dir_all(&train_dir)?;
    std::fs::create_dir_all(&test_dir)?;

    let mut counts = SplitCounts::default();
    for (i, src) in list_image_files(images_dir)?.iter().enumerate() {
        let name = base_name(src);
        let dst = if i % test_every == 0 {
            counts.test += 1;
            test_dir.join(format!("test_{name}"))
        } else {
            counts.train += 1;
            train_dir.join(format!("train_{name}"))
        };
        log::debug!("Copying {} to {}", src.display(), dst.display());
        std::fs::copy(src, &dst)?;
    }

    log::info!(
        "Split {} images into {} train and {} test",
        counts.train + counts.test,
        counts.train,
        counts.test
    );
    Ok(counts)
}

/// Name of the canonical video copied by [`select_video`].
pub const CANONICAL_VIDEO_NAME: &str = "video.mp4";

/// The capture videos of a directory sorted by name, without the canonical copy.
fn list_videos(videos_dir: &Path) -> Result<Vec<PathBuf>, ColmapError> {
    let mut videos = std::fs::read_dir(videos_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"))
                && base_name(path) != CANONICAL_VIDEO_NAME
        })
        .collect::<Vec<_>>();
    videos.sort();
    Ok(videos)
}

/// Copy a capture video to `videos_dir/video.mp4`.
///
/// The named video is used when given, otherwise the last `.mp4` file in name order.
///
/// # Returns
///
/// The source video, or `None` when there is nothing to copy.
pub fn select_video(
    videos_dir: impl AsRef<Path>,
    name: Option<&str>,
) -> Result<Option<PathBuf>, ColmapError> {
    let videos_dir = videos_dir.as_ref();
    if !videos_dir.is_dir() {
        log::warn!("No video directory at {}", videos_dir.display());
        return Ok(None);
    }

    let source = match name {
        Some(name) => Some(videos_dir.join(name)).filter(|path| path.is_file()),
        None => list_videos(videos_dir)?.pop(),
    };

    let Some(source) = source else {
        log::warn!("No video to select in {}", videos_dir.display());
        return Ok(None);
    };

    let dst = videos_dir.join(CANONICAL_VIDEO_NAME);
    if source != dst {
        std::fs::copy(&source, &dst)?;
        log::info!("Copied video {} to {}", source.display(), dst.display());
    }
    Ok(Some(source))
}

/// Name of the list of extracted video frames, one image name per line.
pub const VIDEO_FRAMES_FILE_NAME: &str = "Video_Frames.txt";

/// Directory receiving the reconstruction backup made by [`backup_sfm_model`].
pub const SFM_BACKUP_DIR_NAME: &str = "colmap_sfmonly";

/// Back up `dataset_dir/colmap` to `dataset_dir/colmap_sfmonly` and empty `colmap/sparse/0`.
///
/// An existing backup is kept once as `colmap_sfmonly_1`; older ones are replaced.
///
/// # Returns
///
/// The backup directory.
pub fn backup_sfm_model(dataset_dir: impl AsRef<Path>) -> Result<PathBuf, ColmapError> {
    let dataset_dir = dataset_dir.as_ref();
    let colmap_dir = dataset_dir.join("colmap");
    if !colmap_dir.is_dir() {
        return Err(ColmapError::FileDoesNotExist(colmap_dir));
    }

    let backup_dir = dataset_dir.join(SFM_BACKUP_DIR_NAME);
    if backup_dir.exists() {
        let previous = dataset_dir.join(format!("{SFM_BACKUP_DIR_NAME}_1"));
        if previous.exists() {
            log::warn!("Replacing backup {}", backup_dir.display());
            std::fs::remove_dir_all(&backup_dir)?;
        } else {
            log::warn!("Moving backup {} to {}", backup_dir.display(), previous.display());
            std::fs::rename(&backup_dir, &previous)?;
        }
    }
    copy_dir_all(&colmap_dir, &backup_dir)?;

    let calib_dir = colmap_dir.join("sparse").join("0");
    if calib_dir.exists() {
        std::fs::remove_dir_all(&calib_dir)?;
    }
    std::fs::create_dir_all(&calib_dir)?;

    log::info!("Backed up {} to {}", colmap_dir.display(), backup_dir.display());
    Ok(backup_dir)
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), ColmapError> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// The cameras of one capture video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCameras {
    /// Frame prefix of the video, `Video<N>`.
    pub name: String,
    /// Directory holding the video's cameras.txt and images.txt.
    pub dir: PathBuf,
    /// Number of registered frames.
    pub num_images: usize,
}

/// Frame prefix of the `index`-th video in name order.
fn video_name(index: usize) -> String {
    format!("Video{index}")
}

/// Split a sparse model into one model per capture video.
///
/// Frames extracted from the `N`-th video (in name order) are named `Video<N>_...`. For
/// every video, the images of `sparse_dir/images.txt` that are listed in
/// `videos_dir/Video_Frames.txt` and carry its prefix are written to
/// `videos_dir/Video<N>/images.txt` without their observations, next to a copy of
/// `sparse_dir/cameras.txt`.
///
/// # Arguments
///
/// * `sparse_dir` - Directory of the calibrated model with all images.
/// * `videos_dir` - Directory of the capture videos and the frame list.
pub fn extract_video_cameras(
    sparse_dir: impl AsRef<Path>,
    videos_dir: impl AsRef<Path>,
) -> Result<Vec<VideoCameras>, ColmapError> {
    let (sparse_dir, videos_dir) = (sparse_dir.as_ref(), videos_dir.as_ref());

    let frames_path = videos_dir.join(VIDEO_FRAMES_FILE_NAME);
    if !frames_path.exists() {
        return Err(ColmapError::FileDoesNotExist(frames_path));
    }
    let frames = std::fs::read_to_string(&frames_path)?
        .split_whitespace()
        .map(str::to_string)
        .collect::<HashSet<_>>();

    let images = read_images_txt(sparse_dir.join(IMAGES_FILE_NAME))?;
    let cameras_path = sparse_dir.join(CAMERAS_FILE_NAME);

    let mut extracted = Vec::new();
    for index in 0..list_videos(videos_dir)?.len() {
        let name = video_name(index);
        let prefix = format!("{name}_");
        let video_images = images
            .iter()
            .filter(|image| frames.contains(&image.name) && image.name.starts_with(&prefix))
            .map(|image| ColmapImage {
                points2d: Vec::new(),
                ..image.clone()
            })
            .collect::<Vec<_>>();

        let dir = videos_dir.join(&name);
        std::fs::create_dir_all(&dir)?;
        write_images_txt(dir.join(IMAGES_FILE_NAME), &video_images)?;
        std::fs::copy(&cameras_path, dir.join(CAMERAS_FILE_NAME))?;

        log::info!("{name}: {} registered frames in {}", video_images.len(), dir.display());
        extracted.push(VideoCameras {
            name,
            dir,
            num_images: video_images.len(),
        });
    }

    if extracted.is_empty() {
        log::warn!("No video found in {}", videos_dir.display());
    }
    Ok(extracted)
}

/// Move the frames of every `videos_dir/Video<N>` into `images_dir/Video<N>`.
///
/// Frames already present at the destination stay where they are.
///
/// # Returns
///
/// The number of frames moved.
pub fn move_video_frames(
    images_dir: impl AsRef<Path>,
    videos_dir: impl AsRef<Path>,
) -> Result<usize, ColmapError> {
    let (images_dir, videos_dir) = (images_dir.as_ref(), videos_dir.as_ref());

    let mut video_names = std::fs::read_dir(videos_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.is_dir())
        .map(|path| base_name(&path))
        .collect::<Vec<_>>();
    video_names.sort();

    let images = list_image_files(images_dir)?;

    let mut moved = 0;
    for name in video_names {
        let dst_dir = images_dir.join(&name);
        std::fs::create_dir_all(&dst_dir)?;

        let prefix = format!("{name}_");
        for src in images.iter().filter(|path| base_name(path).starts_with(&prefix)) {
            let dst = dst_dir.join(base_name(src));
            if dst.exists() {
                continue;
            }
            std::fs::rename(src, &dst)?;
            moved += 1;
        }
        log::debug!("Moved frames of {name} to {}", dst_dir.display());
    }

    log::info!("Moved {moved} video frames into {}", images_dir.display());
    Ok(moved)
}
