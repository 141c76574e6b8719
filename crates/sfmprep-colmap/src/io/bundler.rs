use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::error::ColmapError;
use crate::io::parse_part;
use crate::types::{Bundle, CameraPose, InputImage};

/// Name of the Bundler file inside an export directory.
pub const BUNDLE_FILE_NAME: &str = "bundle.out";

/// Name of the image list written next to the Bundler file.
pub const IMAGE_LIST_FILE_NAME: &str = "list_images.txt";

/// Cameras and point count read from a Bundler v0.3 file.
#[derive(Debug)]
pub struct BundlerFile {
    /// The camera poses in file order.
    pub cameras: Vec<CameraPose>,
    /// The number of points declared in the header.
    pub num_points: usize,
}

/// Read a Bundler v0.3 file.
///
/// Lines starting with `#` are skipped. Points are counted from the header but not parsed.
///
/// # Arguments
///
/// * `path` - The path to the bundle.out file.
pub fn read_bundle_out(path: impl AsRef<Path>) -> Result<BundlerFile, ColmapError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ColmapError::FileDoesNotExist(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    parse_bundle_out(&content)
}

/// Whitespace separated tokens of a Bundler file with comment lines removed.
struct Tokens<I> {
    inner: I,
}

impl<'a, I: Iterator<Item = &'a str>> Tokens<I> {
    fn next<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, ColmapError>
    where
        T::Err: std::fmt::Display,
    {
        let token = self.inner.next().ok_or_else(|| {
            ColmapError::ParseError(format!("unexpected end of file, expected {what}"))
        })?;
        parse_part(token)
    }
}

/// Parse the content of a Bundler v0.3 file.
pub fn parse_bundle_out(content: &str) -> Result<BundlerFile, ColmapError> {
    let mut tokens = Tokens {
        inner: content
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .flat_map(str::split_whitespace),
    };

    let num_cameras: usize = tokens.next("camera count")?;
    let num_points: usize = tokens.next("point count")?;

    // a camera is 15 tokens of at least two bytes each
    let mut cameras = Vec::with_capacity(num_cameras.min(content.len() / 30));
    for _ in 0..num_cameras {
        let focal_length = tokens.next("focal length")?;
        let k1 = tokens.next("k1")?;
        let k2 = tokens.next("k2")?;

        let mut rotation = [[0.0; 3]; 3];
        for row in rotation.iter_mut() {
            for val in row.iter_mut() {
                *val = tokens.next("rotation")?;
            }
        }

        let mut translation = [0.0; 3];
        for val in translation.iter_mut() {
            *val = tokens.next("translation")?;
        }

        cameras.push(CameraPose {
            rotation,
            translation,
            focal_length,
            radial_distortion: (k1, k2),
        });
    }

    Ok(BundlerFile {
        cameras,
        num_points,
    })
}

/// Read an image list with one `<name> <width> <height>` line per image.
///
/// Relative names are resolved against the directory containing the list.
pub fn read_image_list(path: impl AsRef<Path>) -> Result<Vec<InputImage>, ColmapError> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let content = std::fs::read_to_string(path)?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let parts = line.split_whitespace().collect::<Vec<_>>();
            if parts.len() != 3 {
                return Err(ColmapError::ParseError(format!(
                    "Invalid image list line: {line}"
                )));
            }
            InputImage::new(
                base_dir.join(parts[0]),
                parse_part(parts[1])?,
                parse_part(parts[2])?,
            )
        })
        .collect()
}

/// Write an image list with one `<name> <width> <height>` line per image.
pub fn write_image_list(bundle: &Bundle, path: impl AsRef<Path>) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for image in bundle.images() {
        writeln!(
            writer,
            "{} {} {}",
            image.file_name(),
            image.width(),
            image.height()
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Whether the path has a jpg or png extension, in any case.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| ext == "jpg" || ext == "jpeg" || ext == "png")
}

/// List the jpg and png images of a directory sorted by file name.
pub fn list_image_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ColmapError> {
    let mut paths = std::fs::read_dir(dir.as_ref())?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.is_file() && is_image_file(path))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// List the images of a directory and read their dimensions from the file headers.
pub fn scan_images(dir: impl AsRef<Path>) -> Result<Vec<InputImage>, ColmapError> {
    list_image_files(dir)?
        .into_iter()
        .map(|path| {
            let (width, height) = image::image_dimensions(&path)?;
            InputImage::new(path, width, height)
        })
        .collect()
}

/// Read a RealityCapture export directory into a [`Bundle`].
///
/// The cameras come from `bundle.out`. The images come from `list_images.txt` when it
/// exists, otherwise from the sorted image files of the directory.
pub fn read_bundle(dir: impl AsRef<Path>) -> Result<Bundle, ColmapError> {
    let dir = dir.as_ref();
    let bundler = read_bundle_out(dir.join(BUNDLE_FILE_NAME))?;

    let list_path = dir.join(IMAGE_LIST_FILE_NAME);
    let images = if list_path.exists() {
        log::debug!("Reading image list {}", list_path.display());
        read_image_list(&list_path)?
    } else {
        log::debug!("No image list, scanning {}", dir.display());
        scan_images(dir)?
    };

    log::info!(
        "Read {} cameras and {} images from {}",
        bundler.cameras.len(),
        images.len(),
        dir.display()
    );

    Ok(Bundle::new(bundler.cameras, images)?.with_num_points(bundler.num_points))
}
