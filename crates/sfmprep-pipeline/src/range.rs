use std::ops::Range;

use crate::error::PipelineError;
use crate::step::PipelineStep;

/// One end of a step range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepBound {
    /// No bound: the first step, or past the last one.
    #[default]
    Unbounded,
    /// The step with this name.
    Named(String),
}

impl StepBound {
    /// A named bound, or unbounded for `None` and empty names.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.is_empty() => StepBound::Named(name.to_string()),
            _ => StepBound::Unbounded,
        }
    }
}

/// How [`select_range`] treats its end bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    /// The end bound is exclusive, except when it names the last step of the list and this
    /// is set: the last step is then included. A range whose start and end name the same
    /// step is empty either way.
    pub include_final_step: bool,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            include_final_step: true,
        }
    }
}

fn position(steps: &[PipelineStep], name: &str) -> Result<usize, PipelineError> {
    // first occurrence wins
    steps
        .iter()
        .position(|step| step.name == name)
        .ok_or_else(|| PipelineError::UnknownStep(name.to_string()))
}

/// The index range of the steps from `from` (inclusive) to `to` (exclusive).
///
/// See [`select_range`].
pub fn range_bounds(
    steps: &[PipelineStep],
    from: &StepBound,
    to: &StepBound,
    policy: RangePolicy,
) -> Result<Range<usize>, PipelineError> {
    let start = match from {
        StepBound::Unbounded => 0,
        StepBound::Named(name) => position(steps, name)?,
    };

    let end = match (from, to) {
        (_, StepBound::Unbounded) => steps.len(),
        (StepBound::Unbounded, StepBound::Named(name)) => {
            return Err(PipelineError::Configuration(format!(
                "end step {name} given without a start step"
            )));
        }
        (StepBound::Named(_), StepBound::Named(name)) => {
            let end = position(steps, name)?;
            // from == to selects nothing, even on the final step
            if policy.include_final_step && end + 1 == steps.len() && end > start {
                steps.len()
            } else {
                end
            }
        }
    };

    if end < start {
        return Err(PipelineError::Configuration(format!(
            "end step {:?} comes before start step {:?}",
            to, from
        )));
    }

    Ok(start..end)
}

/// Select the contiguous run of steps from `from` (inclusive) to `to` (exclusive).
///
/// # Arguments
///
/// * `steps` - The full step list.
/// * `from` - The first step to run.
/// * `to` - The first step not to run, see [`RangePolicy::include_final_step`].
/// * `policy` - The treatment of the end bound.
///
/// # Errors
///
/// [`PipelineError::UnknownStep`] when a bound names no step, and
/// [`PipelineError::Configuration`] when `to` is given without `from` or comes before it.
///
/// Example:
///
/// ```
/// use sfmprep_pipeline::{select_range, PipelineStep, RangePolicy, StepBound};
///
/// let steps = ["a", "b", "c", "d"]
///     .map(|name| PipelineStep::new(name, "echo", [name]));
/// let from = StepBound::Named("a".to_string());
/// let to = StepBound::Named("c".to_string());
/// let range = select_range(&steps, &from, &to, RangePolicy::default()).unwrap();
/// assert_eq!(range.len(), 2);
/// ```
pub fn select_range<'a>(
    steps: &'a [PipelineStep],
    from: &StepBound,
    to: &StepBound,
    policy: RangePolicy,
) -> Result<&'a [PipelineStep], PipelineError> {
    let range = range_bounds(steps, from, to, policy)?;
    Ok(&steps[range])
}
