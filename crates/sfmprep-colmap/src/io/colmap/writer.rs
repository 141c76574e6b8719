use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use super::{ColmapCamera, ColmapImage, ColmapPoint3d};
use crate::error::ColmapError;

/// Write the cameras.txt file.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
/// * `cameras` - The cameras to write, one line each.
pub fn write_cameras_txt(
    path: impl AsRef<Path>,
    cameras: &[ColmapCamera],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);

    writeln!(writer, "# Camera list with one line of data per camera:")?;
    writeln!(writer, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
    writeln!(writer, "# Number of cameras: {}", cameras.len())?;

    for camera in cameras {
        write!(
            writer,
            "{} {} {} {}",
            camera.camera_id,
            camera.model.name(),
            camera.width,
            camera.height
        )?;
        for param in &camera.params {
            write!(writer, " {param}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the images.txt file.
///
/// Every image takes a pose line followed by its POINTS2D line, which is empty when
/// the image has no observations.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
/// * `images` - The images to write.
pub fn write_images_txt(path: impl AsRef<Path>, images: &[ColmapImage]) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);

    writeln!(writer, "# Image list with two lines of data per image:")?;
    writeln!(
        writer,
        "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME"
    )?;
    writeln!(writer, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;

    for image in images {
        let [qw, qx, qy, qz] = image.rotation;
        let [tx, ty, tz] = image.translation;
        writeln!(
            writer,
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} {} {}",
            image.image_id, image.camera_id, image.name
        )?;

        let points = image
            .points2d
            .iter()
            .map(|(x, y, id)| format!("{x} {y} {id}"))
            .collect::<Vec<_>>();
        writeln!(writer, "{}", points.join(" "))?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the points3D.txt file.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
/// * `points` - The points to write, one line each.
pub fn write_points3d_txt(
    path: impl AsRef<Path>,
    points: &[ColmapPoint3d],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);

    writeln!(writer, "# 3D point list with one line of data per point:")?;
    writeln!(
        writer,
        "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
    )?;
    writeln!(writer, "# Number of points: {}", points.len())?;

    for point in points {
        let [x, y, z] = point.xyz;
        let [r, g, b] = point.rgb;
        write!(writer, "{} {x} {y} {z} {r} {g} {b} {}", point.point3d_id, point.error)?;
        for (image_id, point2d_idx) in &point.track {
            write!(writer, " {image_id} {point2d_idx}")?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::colmap::{read_cameras_txt, read_images_txt, read_points3d_txt, CameraModel};

    #[test]
    fn test_write_read_model() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;

        let cameras = vec![ColmapCamera {
            camera_id: 1,
            model: CameraModel::Pinhole,
            width: 640,
            height: 480,
            params: vec![500.0, 500.0, 320.0, 240.0],
        }];
        let images = vec![
            ColmapImage {
                name: "a.jpg".to_string(),
                image_id: 1,
                camera_id: 1,
                rotation: [0.5, -0.5, 0.5, -0.5],
                translation: [1.0, -2.0, 0.25],
                points2d: vec![],
            },
            ColmapImage {
                name: "b.jpg".to_string(),
                image_id: 2,
                camera_id: 1,
                rotation: [1.0, 0.0, 0.0, 0.0],
                translation: [0.0, 0.0, 0.0],
                points2d: vec![(1.5, 2.5, 3)],
            },
        ];
        let points = vec![ColmapPoint3d {
            point3d_id: 3,
            xyz: [0.1, 0.2, 0.3],
            rgb: [10, 20, 30],
            error: 0.5,
            track: vec![(2, 0)],
        }];

        write_cameras_txt(tmp_dir.path().join("cameras.txt"), &cameras)?;
        write_images_txt(tmp_dir.path().join("images.txt"), &images)?;
        write_points3d_txt(tmp_dir.path().join("points3D.txt"), &points)?;

        assert_eq!(read_cameras_txt(tmp_dir.path().join("cameras.txt"))?, cameras);
        assert_eq!(read_images_txt(tmp_dir.path().join("images.txt"))?, images);
        assert_eq!(read_points3d_txt(tmp_dir.path().join("points3D.txt"))?, points);
        Ok(())
    }

    #[test]
    fn test_write_cameras_header() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cameras.txt");
        write_cameras_txt(&path, &[])?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "# Camera list with one line of data per camera:\n\
             #   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]\n\
             # Number of cameras: 0\n"
        );
        Ok(())
    }
}
