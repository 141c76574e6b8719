use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::params::ParameterSet;
use crate::range::{range_bounds, RangePolicy, StepBound};
use crate::registry::ProgramRegistry;
use crate::runner::{CommandRunner, ResolvedCommand};
use crate::step::{PipelineStep, StepList};

/// Lifecycle of a [`TaskPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Steps and programs loaded and validated.
    Loaded,
    /// A run is in progress.
    Running,
    /// The last run finished every selected step.
    Completed,
    /// The last run stopped on an error.
    Failed,
}

/// Options of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log the resolved commands without starting any process.
    pub dry_run: bool,
    /// The first step to run.
    pub from: StepBound,
    /// The first step not to run.
    pub to: StepBound,
    /// The treatment of `to`.
    pub policy: RangePolicy,
    /// Checked before every step; the run stops once it is set.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran, or would have in a dry run.
    Ran,
    /// The step condition was false.
    Skipped,
}

/// The record of one step of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// The step name.
    pub name: String,
    /// What happened.
    pub outcome: StepOutcome,
    /// The command, for steps that ran.
    pub command: Option<ResolvedCommand>,
}

/// The record of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// The selected steps in order.
    pub steps: Vec<StepReport>,
    /// Whether no process was started.
    pub dry_run: bool,
}

impl RunResult {
    /// The (name, outcome) pairs in order.
    pub fn outcomes(&self) -> Vec<(&str, StepOutcome)> {
        self.steps
            .iter()
            .map(|report| (report.name.as_str(), report.outcome))
            .collect()
    }

    /// The commands of the steps that ran, in order.
    pub fn commands(&self) -> Vec<&ResolvedCommand> {
        self.steps
            .iter()
            .filter_map(|report| report.command.as_ref())
            .collect()
    }
}

/// Runs a list of external program steps one after the other.
///
/// Each step waits for the previous one to exit, since later steps read the files earlier
/// ones write. The first error stops the run; there is no retry and no rollback.
#[derive(Debug)]
pub struct TaskPipeline {
    steps: StepList,
    programs: ProgramRegistry,
    state: RunState,
}

impl TaskPipeline {
    /// Create a pipeline, checking that every step uses a registered program.
    pub fn new(steps: StepList, programs: ProgramRegistry) -> Result<Self, PipelineError> {
        if let Some(step) = steps
            .steps()
            .iter()
            .find(|step| !programs.contains(&step.program))
        {
            return Err(PipelineError::UnknownProgram {
                step: step.name.clone(),
                program: step.program.clone(),
            });
        }

        log::debug!(
            "Loaded pipeline with {} steps and {} programs",
            steps.len(),
            programs.len()
        );

        Ok(Self {
            steps,
            programs,
            state: RunState::Loaded,
        })
    }

    /// The current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The steps of the pipeline.
    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    /// The program registry.
    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    fn set_state(&mut self, state: RunState) {
        log::debug!("Pipeline state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Substitute the arguments of a step and look up its program.
    pub fn resolve(
        &self,
        step: &PipelineStep,
        params: &ParameterSet,
    ) -> Result<ResolvedCommand, PipelineError> {
        let args = step
            .templates()?
            .iter()
            .map(|template| {
                template
                    .resolve(params)
                    .map_err(|name| PipelineError::UnresolvedParameter {
                        step: step.name.clone(),
                        name,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let program = self
            .programs
            .get(&step.program)
            .ok_or_else(|| PipelineError::UnknownProgram {
                step: step.name.clone(),
                program: step.program.clone(),
            })?;

        Ok(ResolvedCommand {
            program: program.to_path_buf(),
            args,
        })
    }

    /// Run the selected steps.
    ///
    /// For each step in order: stop if cancelled, skip if its condition is false, resolve
    /// the command, then either log it (dry run) or run it and check the exit code.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameters of the run.
    /// * `runner` - Starts the processes. It is never called in a dry run.
    /// * `options` - Step range, dry run and cancellation.
    ///
    /// # Returns
    ///
    /// The outcome of every selected step.
    pub fn run(
        &mut self,
        params: &ParameterSet,
        runner: &mut dyn CommandRunner,
        options: &RunOptions,
    ) -> Result<RunResult, PipelineError> {
        self.set_state(RunState::Running);

        let result = self.run_steps(params, runner, options);
        match &result {
            Ok(_) => self.set_state(RunState::Completed),
            Err(e) => {
                log::error!("Pipeline failed: {e}");
                self.set_state(RunState::Failed);
            }
        }
        result
    }

    fn run_steps(
        &self,
        params: &ParameterSet,
        runner: &mut dyn CommandRunner,
        options: &RunOptions,
    ) -> Result<RunResult, PipelineError> {
        let all_steps = self.steps.steps();
        let range = range_bounds(all_steps, &options.from, &options.to, options.policy)?;
        let selected = &all_steps[range.clone()];

        log::info!(
            "Running {} of {} steps{}",
            selected.len(),
            all_steps.len(),
            if options.dry_run { " (dry run)" } else { "" }
        );

        let mut reports = Vec::with_capacity(selected.len());
        for (i, step) in selected.iter().enumerate() {
            let index = range.start + i;

            if options
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::SeqCst))
            {
                return Err(PipelineError::Cancelled {
                    next_step: step.name.clone(),
                });
            }

            if let Some(predicate) = &step.enabled_if {
                if !predicate.evaluate(params) {
                    log::info!(
                        "[{}/{}] Skipping {} ({predicate} is false)",
                        i + 1,
                        selected.len(),
                        step.name
                    );
                    reports.push(StepReport {
                        name: step.name.clone(),
                        outcome: StepOutcome::Skipped,
                        command: None,
                    });
                    continue;
                }
            }

            let command = self.resolve(step, params)?;
            log::info!("[{}/{}] {}: {command}", i + 1, selected.len(), step.name);

            if !options.dry_run {
                let exit_code = runner
                    .run(&command.program, &command.args)
                    .map_err(|source| PipelineError::Spawn {
                        step: step.name.clone(),
                        source,
                    })?;
                if exit_code != 0 {
                    return Err(PipelineError::StepFailed {
                        step: step.name.clone(),
                        index,
                        exit_code,
                    });
                }
            }

            reports.push(StepReport {
                name: step.name.clone(),
                outcome: StepOutcome::Ran,
                command: Some(command),
            });
        }

        Ok(RunResult {
            steps: reports,
            dry_run: options.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct ExitWith(i32);

    impl CommandRunner for ExitWith {
        fn run(&mut self, _program: &Path, _args: &[String]) -> std::io::Result<i32> {
            Ok(self.0)
        }
    }

    fn pipeline() -> Result<TaskPipeline, PipelineError> {
        let steps = StepList::new(vec![
            PipelineStep::new("first", "tool", ["${path}"]),
            PipelineStep::new("second", "tool", ["--flag"]),
        ])?;
        TaskPipeline::new(steps, ProgramRegistry::new().with_program("tool", "/bin/tool"))
    }

    #[test]
    fn test_unknown_program_at_load() -> Result<(), PipelineError> {
        let steps = StepList::new(vec![PipelineStep::new("a", "missing", ["x"])])?;
        let res = TaskPipeline::new(steps, ProgramRegistry::new().with_program("tool", "/bin/tool"));
        assert!(matches!(
            res,
            Err(PipelineError::UnknownProgram { step, program }) if step == "a" && program == "missing"
        ));
        Ok(())
    }

    #[test]
    fn test_state_transitions() -> Result<(), PipelineError> {
        let mut pipeline = pipeline()?;
        assert_eq!(pipeline.state(), RunState::Loaded);

        let params = ParameterSet::builder().set("path", "/data").build();
        let result = pipeline.run(&params, &mut ExitWith(0), &RunOptions::default())?;
        assert_eq!(pipeline.state(), RunState::Completed);
        assert_eq!(
            result.outcomes(),
            vec![("first", StepOutcome::Ran), ("second", StepOutcome::Ran)]
        );
        assert!(!result.dry_run);

        let res = pipeline.run(&params, &mut ExitWith(2), &RunOptions::default());
        assert!(matches!(
            res,
            Err(PipelineError::StepFailed { index: 0, exit_code: 2, .. })
        ));
        assert_eq!(pipeline.state(), RunState::Failed);
        Ok(())
    }

    #[test]
    fn test_failed_step_index_in_full_list() -> Result<(), PipelineError> {
        let mut pipeline = pipeline()?;
        let options = RunOptions {
            from: StepBound::Named("second".to_string()),
            ..Default::default()
        };
        let res = pipeline.run(&ParameterSet::default(), &mut ExitWith(1), &options);
        assert!(matches!(
            res,
            Err(PipelineError::StepFailed { index: 1, ref step, .. }) if step == "second"
        ));
        Ok(())
    }

    #[test]
    fn test_resolve() -> Result<(), PipelineError> {
        let pipeline = pipeline()?;
        let params = ParameterSet::builder().set("path", "/data").build();
        let command = pipeline.resolve(&pipeline.steps().steps()[0], &params)?;
        assert_eq!(command.program, Path::new("/bin/tool"));
        assert_eq!(command.args, vec!["/data".to_string()]);

        let res = pipeline.resolve(&pipeline.steps().steps()[0], &ParameterSet::default());
        assert!(matches!(
            res,
            Err(PipelineError::UnresolvedParameter { name, .. }) if name == "path"
        ));
        Ok(())
    }
}
