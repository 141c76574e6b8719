use argh::FromArgs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sfmprep::pipeline::{
    params::{gpu_indices, parse_assignment, DEFAULT_QUALITY},
    ParamValue, ParameterSet, ProcessRunner, ProgramRegistry, QualityProfiles, RunOptions,
    StepBound, StepList, TaskPipeline,
};

#[derive(FromArgs)]
/// Run a photogrammetry pipeline defined as a list of external program steps
struct Args {
    /// path to the json step list
    #[argh(option)]
    steps: PathBuf,

    /// path to the json program registry
    #[argh(option)]
    programs: PathBuf,

    /// path to the json quality profiles
    #[argh(option)]
    profiles: Option<PathBuf>,

    /// reconstruction quality used to look up the profiles
    #[argh(option, default = "DEFAULT_QUALITY.to_string()")]
    quality: String,

    /// the first step to run
    #[argh(option)]
    from_step: Option<String>,

    /// the first step not to run
    #[argh(option)]
    to_step: Option<String>,

    /// log the commands without running them
    #[argh(switch)]
    dry_run: bool,

    /// a key=value parameter, may be repeated
    #[argh(option)]
    param: Vec<String>,

    /// number of gpus, used to derive gpu_indices
    #[argh(option, default = "2")]
    num_gpus: i64,

    /// path to the capture directory, available to the steps as ${path}
    #[argh(option)]
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let steps = StepList::from_file(&args.steps)?;
    let programs = ProgramRegistry::from_file(&args.programs)?;
    let mut pipeline = TaskPipeline::new(steps, programs)?;

    let assignments = args
        .param
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = ParameterSet::builder()
        .set("path", args.path.as_path())
        .set("quality", args.quality.as_str())
        .set("num_gpus", args.num_gpus)
        .extend(assignments);
    if let Some(profiles) = &args.profiles {
        builder = builder.apply_profiles(&QualityProfiles::from_file(profiles)?, &args.quality);
    }
    let params = builder
        .derive("gpu_indices", |values| {
            let num_gpus = values.get("num_gpus").and_then(ParamValue::as_int)?;
            Some(ParamValue::from(gpu_indices(num_gpus)))
        })
        .build();

    for (name, value) in params.iter() {
        log::debug!("{name} = {value}");
    }

    // stop before the next step on ctrl-c
    let cancel_token = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    let options = RunOptions {
        dry_run: args.dry_run,
        from: StepBound::from_name(args.from_step.as_deref()),
        to: StepBound::from_name(args.to_step.as_deref()),
        cancel: Some(cancel_token),
        ..Default::default()
    };

    let mut runner = ProcessRunner::new();
    let result = pipeline.run(&params, &mut runner, &options)?;

    for report in &result.steps {
        log::info!("{}: {:?}", report.name, report.outcome);
    }

    Ok(())
}
