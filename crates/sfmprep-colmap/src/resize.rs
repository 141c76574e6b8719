use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer};
use rayon::prelude::*;

use crate::error::ColmapError;
use crate::types::base_name;

/// Compute the image size after rescaling to a target width.
///
/// The aspect ratio is kept and the height is rounded down, never below one pixel.
///
/// # Arguments
///
/// * `width` - The original width in pixels.
/// * `height` - The original height in pixels.
/// * `target_width` - The new width in pixels.
///
/// # Returns
///
/// The new (width, height).
///
/// Example:
///
/// ```
/// use sfmprep_colmap::resize::rescaled_size;
///
/// assert_eq!(rescaled_size(4000, 3000, 1000).unwrap(), (1000, 750));
/// ```
pub fn rescaled_size(
    width: u32,
    height: u32,
    target_width: u32,
) -> Result<(u32, u32), ColmapError> {
    if target_width == 0 {
        return Err(ColmapError::InvalidTargetWidth);
    }
    if width == 0 || height == 0 {
        return Err(ColmapError::InvalidResolution {
            path: PathBuf::new(),
            width,
            height,
        });
    }
    let new_height = (height as u64 * target_width as u64 / width as u64).max(1);
    Ok((target_width, new_height as u32))
}

/// Source pixels overlapping each destination pixel along one axis, with their weights.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 0.0).then_some((s, (overlap / (end - start)) as f32))
                })
                .collect()
        })
        .collect()
}

/// Resize an interleaved u8 image by area averaging.
///
/// Every destination pixel is the mean of the source area it covers, with partial
/// pixels weighted by their overlap. Rows are computed in parallel.
///
/// # Errors
///
/// Returns [`ColmapError::InvalidChannelShape`] when `src` does not hold
/// `src_width * src_height * channels` values.
pub fn resize_area(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    channels: usize,
    dst_width: usize,
    dst_height: usize,
) -> Result<Vec<u8>, ColmapError> {
    let expected = src_width * src_height * channels;
    if src.len() != expected {
        return Err(ColmapError::InvalidChannelShape(src.len(), expected));
    }

    let mut dst = vec![0u8; dst_width * dst_height * channels];
    if dst.is_empty() {
        return Ok(dst);
    }

    let x_weights = area_weights(src_width, dst_width);
    let y_weights = area_weights(src_height, dst_height);
    let src_stride = src_width * channels;

    dst.par_chunks_mut(dst_width * channels)
        .zip(y_weights.par_iter())
        .for_each(|(dst_row, wy)| {
            let mut acc = vec![0f32; channels];
            for (dst_px, wx) in dst_row.chunks_exact_mut(channels).zip(x_weights.iter()) {
                acc.iter_mut().for_each(|a| *a = 0.0);
                for &(sy, fy) in wy {
                    let row = &src[sy * src_stride..(sy + 1) * src_stride];
                    for &(sx, fx) in wx {
                        let w = fy * fx;
                        let px = &row[sx * channels..(sx + 1) * channels];
                        for (a, &v) in acc.iter_mut().zip(px) {
                            *a += w * v as f32;
                        }
                    }
                }
                for (out, a) in dst_px.iter_mut().zip(acc.iter()) {
                    *out = a.round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    Ok(dst)
}

/// Resize a decoded image by area averaging, keeping its channel layout.
///
/// Images with more than 8 bits per channel are reduced to 8 bits.
pub fn resize_image(
    image: &DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> Result<DynamicImage, ColmapError> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let (dst_w, dst_h) = (dst_width as usize, dst_height as usize);

    let resize = |raw: &[u8], channels: usize| {
        resize_area(raw, width, height, channels, dst_w, dst_h)
    };
    let buffer_error =
        || ColmapError::ParseError("resized buffer does not match image size".to_string());

    let resized = match image {
        DynamicImage::ImageLuma8(img) => DynamicImage::ImageLuma8(
            ImageBuffer::from_raw(dst_width, dst_height, resize(img.as_raw(), 1)?)
                .ok_or_else(buffer_error)?,
        ),
        DynamicImage::ImageLumaA8(img) => DynamicImage::ImageLumaA8(
            ImageBuffer::from_raw(dst_width, dst_height, resize(img.as_raw(), 2)?)
                .ok_or_else(buffer_error)?,
        ),
        img if img.color().has_alpha() => DynamicImage::ImageRgba8(
            ImageBuffer::from_raw(dst_width, dst_height, resize(img.to_rgba8().as_raw(), 4)?)
                .ok_or_else(buffer_error)?,
        ),
        img => DynamicImage::ImageRgb8(
            ImageBuffer::from_raw(dst_width, dst_height, resize(img.to_rgb8().as_raw(), 3)?)
                .ok_or_else(buffer_error)?,
        ),
    };

    Ok(resized)
}

/// Read an image, rescale it to `target_width` and write it to `dst`.
///
/// # Returns
///
/// The new (width, height).
pub fn resize_image_file(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    target_width: u32,
) -> Result<(u32, u32), ColmapError> {
    let image = image::open(src.as_ref())?;
    let (width, height) = rescaled_size(image.width(), image.height(), target_width)?;

    let resized = resize_image(&image, width, height)?;
    resized.save(dst.as_ref())?;

    log::debug!(
        "Resized {} to {}x{} into {}",
        src.as_ref().display(),
        width,
        height,
        dst.as_ref().display()
    );

    Ok((width, height))
}

/// Rescale images into `dst_dir`, keeping their file names.
///
/// The files are independent and processed in parallel.
///
/// # Returns
///
/// The written paths, in the order of `sources`.
pub fn resize_images(
    sources: &[PathBuf],
    dst_dir: impl AsRef<Path>,
    target_width: u32,
) -> Result<Vec<PathBuf>, ColmapError> {
    if target_width == 0 {
        return Err(ColmapError::InvalidTargetWidth);
    }
    let dst_dir = dst_dir.as_ref();
    std::fs::create_dir_all(dst_dir)?;

    let written = sources
        .par_iter()
        .map(|src| -> Result<PathBuf, ColmapError> {
            let dst = dst_dir.join(base_name(src));
            resize_image_file(src, &dst, target_width)?;
            Ok(dst)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Resized {} images to width {} in {}",
        written.len(),
        target_width,
        dst_dir.display()
    );

    Ok(written)
}

/// Copy images into `dst_dir`, keeping their file names.
pub fn copy_images(
    sources: &[PathBuf],
    dst_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, ColmapError> {
    let dst_dir = dst_dir.as_ref();
    std::fs::create_dir_all(dst_dir)?;

    let mut written = Vec::with_capacity(sources.len());
    for src in sources {
        let dst = dst_dir.join(base_name(src));
        std::fs::copy(src, &dst)?;
        written.push(dst);
    }

    log::info!("Copied {} images to {}", written.len(), dst_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_rescaled_size() -> Result<(), ColmapError> {
        assert_eq!(rescaled_size(4000, 3000, 1000)?, (1000, 750));
        assert_eq!(rescaled_size(1920, 1080, 1000)?, (1000, 562));
        assert_eq!(rescaled_size(100, 1, 10)?, (10, 1));
        assert!(matches!(
            rescaled_size(100, 100, 0),
            Err(ColmapError::InvalidTargetWidth)
        ));
        Ok(())
    }

    #[test]
    fn test_resize_area_halves() -> Result<(), ColmapError> {
        // 4x2 single channel -> 2x1: each output is the mean of a 2x2 block
        let src = [0u8, 10, 100, 200, 20, 30, 50, 50];
        let dst = resize_area(&src, 4, 2, 1, 2, 1)?;
        assert_eq!(dst, vec![15, 100]);
        Ok(())
    }

    #[test]
    fn test_resize_area_fractional() -> Result<(), ColmapError> {
        // 3 -> 2 pixels: the middle source pixel is split between both outputs
        let src = [0u8, 90, 180];
        let dst = resize_area(&src, 3, 1, 1, 2, 1)?;
        assert_eq!(dst, vec![30, 150]);
        Ok(())
    }

    #[test]
    fn test_resize_area_constant_image() -> Result<(), ColmapError> {
        let src = vec![77u8; 7 * 5 * 3];
        let dst = resize_area(&src, 7, 5, 3, 3, 2)?;
        assert_eq!(dst.len(), 3 * 2 * 3);
        assert!(dst.iter().all(|&v| v == 77));
        Ok(())
    }

    #[test]
    fn test_resize_area_buffer_size_mismatch() {
        let res = resize_area(&[0u8; 5], 4, 2, 1, 2, 1);
        assert!(matches!(res, Err(ColmapError::InvalidChannelShape(5, 8))));
    }

    #[test]
    fn test_resize_images_dimensions() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let src_dir = tmp_dir.path().join("src");
        std::fs::create_dir_all(&src_dir)?;

        let mut sources = Vec::new();
        for (i, (w, h)) in [(40u32, 30u32), (64, 48)].iter().enumerate() {
            let path = src_dir.join(format!("img_{i}.png"));
            RgbImage::from_pixel(*w, *h, Rgb([10, 20, 30])).save(&path)?;
            sources.push(path);
        }

        let dst_dir = tmp_dir.path().join("dst");
        let written = resize_images(&sources, &dst_dir, 20)?;

        assert_eq!(written, vec![dst_dir.join("img_0.png"), dst_dir.join("img_1.png")]);
        assert_eq!(image::image_dimensions(&written[0])?, (20, 15));
        assert_eq!(image::image_dimensions(&written[1])?, (20, 15));

        let resized = image::open(&written[1])?.to_rgb8();
        assert_eq!(resized.get_pixel(5, 5), &Rgb([10, 20, 30]));
        Ok(())
    }
}
