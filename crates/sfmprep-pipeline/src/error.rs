/// An error type for the pipeline crate.
///
/// Every error aborts the current run. Files written by completed steps are left in place.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A step name used as a range bound does not exist.
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// The pipeline was set up inconsistently, for example with a range ending before it starts.
    #[error("Invalid pipeline configuration. {0}")]
    Configuration(String),

    /// Two steps share a name.
    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    /// An argument references a parameter missing from the parameter set.
    #[error("Step {step} references unknown parameter {name}")]
    UnresolvedParameter {
        /// The step being resolved.
        step: String,
        /// The missing parameter.
        name: String,
    },

    /// A step names a program missing from the registry.
    #[error("Step {step} uses unknown program {program}")]
    UnknownProgram {
        /// The step naming the program.
        step: String,
        /// The missing program.
        program: String,
    },

    /// The external process exited with a non-zero status.
    #[error("Step {step} (#{index}) failed with exit code {exit_code}")]
    StepFailed {
        /// The failed step.
        step: String,
        /// Position of the step in the step list.
        index: usize,
        /// The exit code, -1 when the process was killed by a signal.
        exit_code: i32,
    },

    /// The external process could not be started.
    #[error("Failed to start step {step}. {source}")]
    Spawn {
        /// The step being started.
        step: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled between two steps.
    #[error("Run cancelled before step {next_step}")]
    Cancelled {
        /// The first step that did not run.
        next_step: String,
    },

    /// A step condition could not be parsed.
    #[error("Invalid predicate '{expression}': {reason}")]
    InvalidPredicate {
        /// The condition as written.
        expression: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Error parsing a JSON configuration file.
    #[error("Failed to parse the configuration. {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading a configuration file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),
}
