use std::path::Path;

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use sfmprep_colmap::convert::{convert_pose, invert_colmap_pose, ColmapPose};
use sfmprep_colmap::io::bundler::{read_bundle, write_image_list, IMAGE_LIST_FILE_NAME};
use sfmprep_colmap::io::colmap::{read_cameras_txt, read_images_txt};
use sfmprep_colmap::layout::ColmapLayout;
use sfmprep_colmap::{resize_images, write_camera_file, ColmapError};

const BUNDLE: &str = "# Bundle file v0.3
3 0
800 0 0
1 0 0
0 1 0
0 0 1
0 0 -2
400 0 0
0 0 -1
0 1 0
1 0 0
0.5 0 -3
640 0.1 0.01
0 -1 0
1 0 0
0 0 1
1 1 1
";

fn write_rc_dir(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("bundle.out"), BUNDLE)?;
    for (name, w, h) in [("a.png", 80, 60), ("b.png", 40, 30), ("c.png", 64, 36)] {
        RgbImage::from_pixel(w, h, Rgb([200, 100, 50])).save(dir.join(name))?;
    }
    Ok(())
}

#[test]
fn test_rc_to_colmap_stereo_rescaled() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let rc_dir = tmp_dir.path().join("rc");
    let out_dir = tmp_dir.path().join("colmap");
    write_rc_dir(&rc_dir)?;

    let bundle = read_bundle(&rc_dir)?;
    assert_eq!(bundle.len(), 3);

    let layout = ColmapLayout::stereo(&out_dir);
    layout.create()?;

    let target_width = 32;
    let count = write_camera_file(&bundle, &layout.sparse_dir, Some(target_width))?;
    let sources = bundle
        .images()
        .iter()
        .map(|image| image.path.clone())
        .collect::<Vec<_>>();
    let written = resize_images(&sources, &layout.images_dir, target_width)?;
    assert_eq!(count, written.len());

    let cameras = read_cameras_txt(layout.sparse_dir.join("cameras.txt"))?;
    let images = read_images_txt(layout.sparse_dir.join("images.txt"))?;

    for ((camera, image), path) in cameras.iter().zip(images.iter()).zip(written.iter()) {
        // intrinsics describe the rescaled file of the same name
        assert_eq!(layout.images_dir.join(&image.name), *path);
        let (w, h) = image::image_dimensions(path)?;
        assert_eq!((camera.width, camera.height), (w as usize, h as usize));
    }

    assert_eq!(
        images.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        vec!["a.png", "b.png", "c.png"]
    );
    assert_eq!(cameras[0].params, vec![320.0, 320.0, 16.0, 12.0]);
    assert_eq!(cameras[2].params, vec![320.0, 320.0, 16.0, 9.0]);
    Ok(())
}

#[test]
fn test_written_poses_invert_to_bundle() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let rc_dir = tmp_dir.path().join("rc");
    write_rc_dir(&rc_dir)?;

    let bundle = read_bundle(&rc_dir)?;
    write_camera_file(&bundle, tmp_dir.path(), None)?;
    let images = read_images_txt(tmp_dir.path().join("images.txt"))?;

    for (image, camera) in images.iter().zip(bundle.cameras()) {
        let pose = ColmapPose {
            rotation: image.rotation,
            translation: image.translation,
        };
        let expected = convert_pose(&camera.rotation, &camera.translation)?;
        assert_eq!(pose, expected);

        let (rotation, translation) = invert_colmap_pose(&pose);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], camera.rotation[i][j], epsilon = 1e-9);
            }
            assert_relative_eq!(translation[i], camera.translation[i], epsilon = 1e-9);
        }
    }
    Ok(())
}

#[test]
fn test_image_list_overrides_scan() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let rc_dir = tmp_dir.path().join("rc");
    write_rc_dir(&rc_dir)?;

    let bundle = read_bundle(&rc_dir)?;
    write_image_list(&bundle, rc_dir.join(IMAGE_LIST_FILE_NAME))?;

    // an extra image does not shift the pairing once the list exists
    RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])).save(rc_dir.join("0_extra.png"))?;
    let bundle = read_bundle(&rc_dir)?;
    assert_eq!(bundle.images()[0].file_name(), "a.png");
    assert_eq!(bundle.images()[2].resolution, (64, 36));
    Ok(())
}

#[test]
fn test_count_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let rc_dir = tmp_dir.path().join("rc");
    write_rc_dir(&rc_dir)?;
    std::fs::remove_file(rc_dir.join("c.png"))?;

    let res = read_bundle(&rc_dir);
    assert!(matches!(
        res,
        Err(ColmapError::CountMismatch {
            cameras: 3,
            images: 2
        })
    ));
    Ok(())
}
