use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::predicate::Predicate;
use crate::template::Template;

/// One external program invocation of a pipeline.
///
/// In JSON a step reads
/// `{"name": "...", "app": "...", "command_args": ["..."], "if": "..."}`;
/// `program`, `args` and `enabled_if` are accepted as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineStep {
    /// Unique name of the step.
    pub name: String,
    /// Key of the program in the registry.
    #[serde(rename = "app", alias = "program")]
    pub program: String,
    /// Argument templates, see [`Template`].
    #[serde(rename = "command_args", alias = "args", default)]
    pub args: Vec<String>,
    /// Condition enabling the step. Steps without one always run.
    #[serde(rename = "if", alias = "enabled_if", default)]
    pub enabled_if: Option<Predicate>,
}

impl PipelineStep {
    /// Create an unconditional step.
    pub fn new<I, S>(name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            enabled_if: None,
        }
    }

    /// Run the step only when `predicate` holds.
    pub fn with_condition(mut self, predicate: Predicate) -> Self {
        self.enabled_if = Some(predicate);
        self
    }

    /// Parse the argument templates.
    pub fn templates(&self) -> Result<Vec<Template>, PipelineError> {
        self.args
            .iter()
            .map(|arg| {
                Template::parse(arg).map_err(|reason| {
                    PipelineError::Configuration(format!(
                        "step {}: argument '{arg}': {reason}",
                        self.name
                    ))
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct StepFile {
    steps: Vec<PipelineStep>,
}

/// An ordered list of steps with unique names and valid argument templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepList {
    steps: Vec<PipelineStep>,
}

impl StepList {
    /// Check and wrap a list of steps.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DuplicateStep`] for a repeated name, [`PipelineError::Configuration`]
    /// for an argument template that does not parse.
    pub fn new(steps: Vec<PipelineStep>) -> Result<Self, PipelineError> {
        let mut names = HashSet::new();
        for step in &steps {
            if !names.insert(step.name.as_str()) {
                return Err(PipelineError::DuplicateStep(step.name.clone()));
            }
            step.templates()?;
        }
        Ok(Self { steps })
    }

    /// Parse a `{"steps": [...]}` document.
    pub fn from_json_str(s: &str) -> Result<Self, PipelineError> {
        let file: StepFile = serde_json::from_str(s)?;
        Self::new(file.steps)
    }

    /// Read a `{"steps": [...]}` JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let steps = Self::from_json_str(&content)?;
        log::debug!(
            "Loaded {} steps from {}",
            steps.len(),
            path.as_ref().display()
        );
        Ok(steps)
    }

    /// The steps in execution order.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Find a step by name.
    pub fn get(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEPS: &str = r#"{
        "steps": [
            {
                "name": "patch_match_stereo",
                "app": "colmap",
                "command_args": [
                    "patch_match_stereo",
                    "--workspace_path", "${path}/stereo",
                    "--PatchMatchStereo.gpu_index", "${gpu_indices}"
                ]
            },
            {
                "name": "texture_mesh",
                "program": "texturer",
                "args": ["${path}/mesh.ply"],
                "if": "with_texture"
            },
            {"name": "done", "app": "echo"}
        ]
    }"#;

    #[test]
    fn test_from_json() -> Result<(), PipelineError> {
        let steps = StepList::from_json_str(STEPS)?;
        assert_eq!(steps.len(), 3);

        let first = &steps.steps()[0];
        assert_eq!(first.program, "colmap");
        assert_eq!(first.args.len(), 5);
        assert_eq!(first.enabled_if, None);

        let texture = steps.get("texture_mesh").ok_or_else(|| {
            PipelineError::UnknownStep("texture_mesh".to_string())
        })?;
        assert_eq!(texture.program, "texturer");
        assert_eq!(
            texture.enabled_if,
            Some(Predicate::IsSet("with_texture".to_string()))
        );

        assert!(steps.get("done").is_some_and(|s| s.args.is_empty()));
        Ok(())
    }

    #[test]
    fn test_duplicate_names() {
        let res = StepList::new(vec![
            PipelineStep::new("a", "echo", ["1"]),
            PipelineStep::new("b", "echo", ["2"]),
            PipelineStep::new("a", "echo", ["3"]),
        ]);
        assert!(matches!(res, Err(PipelineError::DuplicateStep(name)) if name == "a"));
    }

    #[test]
    fn test_bad_template() {
        let res = StepList::new(vec![PipelineStep::new("a", "echo", ["${path"])]);
        assert!(matches!(res, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_bad_predicate_json() {
        let res = StepList::from_json_str(r#"{"steps": [{"name": "a", "app": "x", "if": "a b"}]}"#);
        assert!(matches!(res, Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("steps.json");
        std::fs::write(&path, STEPS)?;
        assert_eq!(StepList::from_file(&path)?, StepList::from_json_str(STEPS)?);
        Ok(())
    }
}
