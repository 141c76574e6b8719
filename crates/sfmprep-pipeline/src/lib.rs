#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for loading and running pipelines.
pub mod error;

/// Run parameters, their builder and quality profiles.
///
/// See [`params::ParameterSetBuilder`] for how the parameter set of a run is assembled.
pub mod params;

/// Step conditions.
pub mod predicate;

/// Step range selection.
pub mod range;

/// Program registry.
pub mod registry;

/// Process execution.
///
/// Implement [`runner::CommandRunner`] to run steps somewhere else than in a child process.
pub mod runner;

/// Pipeline steps and step lists.
pub mod step;

/// Argument templates with `${name}` placeholders.
pub mod template;

mod pipeline;

pub use crate::error::PipelineError;
pub use crate::params::{ParamValue, ParameterSet, ParameterSetBuilder, QualityProfiles};
pub use crate::pipeline::{RunOptions, RunResult, RunState, StepOutcome, StepReport, TaskPipeline};
pub use crate::predicate::Predicate;
pub use crate::range::{select_range, RangePolicy, StepBound};
pub use crate::registry::ProgramRegistry;
pub use crate::runner::{CommandRunner, ProcessRunner, ResolvedCommand};
pub use crate::step::{PipelineStep, StepList};
