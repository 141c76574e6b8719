use argh::FromArgs;
use std::path::PathBuf;

use sfmprep::colmap::layout::{backup_sfm_model, extract_video_cameras, move_video_frames};

#[derive(FromArgs)]
/// Split a calibrated COLMAP model into one camera path per capture video
struct Args {
    /// path to the dataset directory, with colmap/, images/ and videos/ subdirectories
    #[argh(option)]
    path: PathBuf,

    /// directory of the calibrated model, defaults to <path>/colmap/sparse
    #[argh(option)]
    sparse_dir: Option<PathBuf>,

    /// do not back up colmap/ to colmap_sfmonly/ before clearing sparse/0
    #[argh(switch)]
    skip_backup: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    if !args.skip_backup {
        backup_sfm_model(&args.path)?;
    }

    let sparse_dir = args
        .sparse_dir
        .unwrap_or_else(|| args.path.join("colmap").join("sparse"));
    let videos_dir = args.path.join("videos");

    let videos = extract_video_cameras(&sparse_dir, &videos_dir)?;
    for video in &videos {
        log::info!("{}: {} cameras", video.name, video.num_images);
    }

    // keep the video frames out of further processing
    move_video_frames(args.path.join("images"), &videos_dir)?;

    Ok(())
}
