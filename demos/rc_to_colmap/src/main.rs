use argh::FromArgs;
use std::path::PathBuf;

use sfmprep::colmap::{
    self,
    io::bundler::{write_image_list, IMAGE_LIST_FILE_NAME},
    io::colmap::{read_cameras_txt, read_images_txt},
    layout::{copy_mesh, ColmapLayout},
    resize::copy_images,
};

#[derive(FromArgs)]
/// Convert a RealityCapture export (bundle.out and images) to a COLMAP sparse model
struct Args {
    /// path to the RealityCapture export, containing bundle.out and the images
    #[argh(option)]
    rc_path: PathBuf,

    /// output directory of the COLMAP model
    #[argh(option)]
    colmap_path: PathBuf,

    /// create the full stereo/sparse and stereo/images hierarchy
    #[argh(switch)]
    create_colmap: bool,

    /// rescale the cameras and images to this width
    #[argh(option)]
    target_width: Option<u32>,

    /// copy the textured mesh from ../meshes to ../capreal (implied by --create-colmap)
    #[argh(switch)]
    copy_mesh: bool,

    /// read the written model back and check it
    #[argh(switch)]
    verify: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let bundle = colmap::read_bundle(&args.rc_path)?;

    // keep the image order used for this conversion next to the export
    let list_path = args.rc_path.join(IMAGE_LIST_FILE_NAME);
    if !list_path.exists() {
        write_image_list(&bundle, &list_path)?;
        log::info!("Wrote {}", list_path.display());
    }

    let layout = if args.create_colmap {
        ColmapLayout::stereo(&args.colmap_path)
    } else {
        ColmapLayout::sparse_only(&args.colmap_path)
    };
    layout.create()?;

    let num_cameras = colmap::write_camera_file(&bundle, &layout.sparse_dir, args.target_width)?;

    let sources = bundle
        .images()
        .iter()
        .map(|image| image.path.clone())
        .collect::<Vec<_>>();
    match args.target_width {
        Some(width) => colmap::resize_images(&sources, &layout.images_dir, width)?,
        None => copy_images(&sources, &layout.images_dir)?,
    };

    if args.create_colmap || args.copy_mesh {
        copy_mesh(&args.rc_path, &args.colmap_path)?;
    }

    if args.verify {
        let cameras = read_cameras_txt(layout.sparse_dir.join(colmap::export::CAMERAS_FILE_NAME))?;
        let images = read_images_txt(layout.sparse_dir.join(colmap::export::IMAGES_FILE_NAME))?;
        if cameras.len() != num_cameras || images.len() != num_cameras {
            return Err(format!(
                "model check failed: wrote {num_cameras} cameras, read {} cameras and {} images",
                cameras.len(),
                images.len()
            )
            .into());
        }
        log::info!("Model check passed");
    }

    log::info!(
        "Converted {} cameras into {}",
        num_cameras,
        layout.sparse_dir.display()
    );

    Ok(())
}
