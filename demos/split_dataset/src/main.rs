use argh::FromArgs;
use std::path::PathBuf;

use sfmprep::colmap::layout::{select_video, split_train_test};

#[derive(FromArgs)]
/// Split the images of a capture into train and test sets and pick its video
struct Args {
    /// path to the capture directory, with images/ and videos/ subdirectories
    #[argh(option)]
    path: PathBuf,

    /// name of the video to use, the last mp4 file otherwise
    #[argh(option)]
    video: Option<String>,

    /// every n-th image goes to the test set
    #[argh(option, default = "10")]
    test_every: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let counts = split_train_test(args.path.join("images"), &args.path, args.test_every)?;
    log::info!("train: {} test: {}", counts.train, counts.test);

    match select_video(args.path.join("videos"), args.video.as_deref())? {
        Some(video) => log::info!("Using video {}", video.display()),
        None => log::warn!("No video found"),
    }

    Ok(())
}
