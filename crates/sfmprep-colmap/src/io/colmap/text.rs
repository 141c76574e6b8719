use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use super::{CameraModel, ColmapCamera, ColmapImage, ColmapPoint3d};
use crate::error::ColmapError;
use crate::io::parse_part;

/// Read the lines of a COLMAP text file, dropping the `#` header block.
fn read_data_lines(path: &Path) -> Result<Vec<String>, ColmapError> {
    if !path.exists() {
        return Err(ColmapError::FileDoesNotExist(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);

    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    read_data_lines(path.as_ref())?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_camera_line(line))
        .collect()
}

/// Read the points3D.txt file and return a vector of ColmapPoint3d structs.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    read_data_lines(path.as_ref())?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_point3d_line(line))
        .collect()
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Every image takes two lines: the pose line and a possibly empty POINTS2D line.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let mut lines = read_data_lines(path.as_ref())?;

    // a trailing newline after the last POINTS2D line is not an extra record
    while lines.len() % 2 == 1 && lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines
        .chunks(2)
        .map(|chunk| match chunk {
            [pose, points] => parse_image_line(pose, points),
            [pose] => parse_image_line(pose, ""),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect()
}

/// Parse exactly `N` values from a slice of tokens.
fn parse_array<T, const N: usize>(parts: &[&str], what: &str) -> Result<[T; N], ColmapError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("Invalid number of {what}")))
}

/// CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let model = parts[1].parse::<CameraModel>()?;
    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<f64>, _>>()?;
    if params.len() != model.num_params() {
        return Err(ColmapError::ParseError(format!(
            "{} takes {} parameters, got {}",
            model.name(),
            model.num_params(),
            params.len()
        )));
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)
fn parse_point3d_line(line: &str) -> Result<ColmapPoint3d, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    if parts.len() < 8 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(ColmapPoint3d {
        point3d_id: parse_part(parts[0])?,
        xyz: parse_array(&parts[1..4], "xyz coordinates")?,
        rgb: parse_array(&parts[4..7], "rgb values")?,
        error: parse_part(parts[7])?,
        track: parts[8..]
            .chunks_exact(2)
            .map(|chunk| -> Result<(u32, u32), ColmapError> {
                Ok((parse_part(chunk[0])?, parse_part(chunk[1])?))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_line(pose_line: &str, points_line: &str) -> Result<ColmapImage, ColmapError> {
    let parts = pose_line.split_whitespace().collect::<Vec<_>>();
    if parts.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let points = points_line.split_whitespace().collect::<Vec<_>>();

    Ok(ColmapImage {
        image_id: parse_part(parts[0])?,
        rotation: parse_array(&parts[1..5], "rotation coordinates")?,
        translation: parse_array(&parts[5..8], "translation coordinates")?,
        camera_id: parse_part(parts[8])?,
        // names may contain spaces
        name: parts[9..].join(" "),
        points2d: points
            .chunks_exact(3)
            .map(|chunk| -> Result<(f64, f64, i64), ColmapError> {
                Ok((
                    parse_part(chunk[0])?,
                    parse_part(chunk[1])?,
                    parse_part(chunk[2])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_images_with_empty_points() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            "# Image list with two lines of data per image:\n\
             #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME\n\
             #   POINTS2D[] as (X, Y, POINT3D_ID)\n\
             1 1 0 0 0 0.5 0.5 0.5 1 a.jpg\n\
             \n\
             2 0 1 0 0 1 2 3 2 b.jpg\n\
             10.5 20.5 -1 30 40 7\n"
        )?;

        let images = read_images_txt(file.path())?;
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "a.jpg");
        assert!(images[0].points2d.is_empty());
        assert_eq!(images[1].camera_id, 2);
        assert_eq!(images[1].rotation, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(images[1].points2d, vec![(10.5, 20.5, -1), (30.0, 40.0, 7)]);
        Ok(())
    }

    #[test]
    fn test_read_cameras() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "# Camera list with one line of data per camera:")?;
        writeln!(file, "1 PINHOLE 640 480 500 500 320 240")?;
        writeln!(file, "2 SIMPLE_RADIAL 320 240 250 160 120 0.01")?;

        let cameras = read_cameras_txt(file.path())?;
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].model, CameraModel::Pinhole);
        assert_eq!(cameras[1].model, CameraModel::SimpleRadial);
        assert_eq!(cameras[0].params, vec![500.0, 500.0, 320.0, 240.0]);
        assert_eq!(cameras[1].width, 320);
        Ok(())
    }

    #[test]
    fn test_read_cameras_bad_model() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "1 UNKNOWN 640 480 500")?;
        let res = read_cameras_txt(file.path());
        assert!(matches!(res, Err(ColmapError::ParseError(_))));
        Ok(())
    }

    #[test]
    fn test_read_cameras_wrong_param_count() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "1 PINHOLE 640 480 500 320 240")?;
        let res = read_cameras_txt(file.path());
        assert!(matches!(res, Err(ColmapError::ParseError(_))));
        Ok(())
    }

    #[test]
    fn test_read_points3d() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "# 3D point list with one line of data per point:")?;
        writeln!(file, "7 1.0 2.0 3.0 255 128 0 0.25 1 0 2 5")?;

        let points = read_points3d_txt(file.path())?;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].rgb, [255, 128, 0]);
        assert_eq!(points[0].track, vec![(1, 0), (2, 5)]);
        Ok(())
    }
}
