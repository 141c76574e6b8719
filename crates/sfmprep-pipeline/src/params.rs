use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Name of the profile entry used when a parameter has no value for the selected quality.
pub const DEFAULT_QUALITY: &str = "default";

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// Any other text, paths included.
    Str(String),
}

impl ParamValue {
    /// Parse a command line value, trying bool, integer and float before falling back to text.
    pub fn parse_cli(s: &str) -> Self {
        match s {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = s.parse::<i64>() {
            return ParamValue::Int(v);
        }
        if let Ok(v) = s.parse::<f64>() {
            return ParamValue::Float(v);
        }
        ParamValue::Str(s.to_string())
    }

    /// Whether the value enables a conditional step.
    ///
    /// Numbers are true when non-zero, text when non-empty and not `false` or `0`.
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(v) => *v != 0,
            ParamValue::Float(v) => *v != 0.0,
            ParamValue::Str(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&Path> for ParamValue {
    fn from(v: &Path) -> Self {
        ParamValue::Str(v.to_string_lossy().into_owned())
    }
}

/// Parse a `key=value` command line assignment.
pub fn parse_assignment(s: &str) -> Result<(String, ParamValue), PipelineError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), ParamValue::parse_cli(value)))
        }
        _ => Err(PipelineError::Configuration(format!(
            "expected key=value, got '{s}'"
        ))),
    }
}

/// Comma separated device indices `0,1,..,n-1`.
pub fn gpu_indices(num_gpus: i64) -> String {
    (0..num_gpus.max(0))
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// The parameters of a run, frozen once built.
///
/// Steps only read it; there is no way to change a value after [`ParameterSetBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    /// Start assembling a parameter set.
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    /// The value of a parameter.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Whether the parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Assembles a [`ParameterSet`] from explicit values, profiles and derived values.
///
/// Explicit values always win: profiles and defaults only fill missing parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterSetBuilder {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set a parameter only if it has no value yet.
    pub fn set_default(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.entry(name.into()).or_insert_with(|| value.into());
        self
    }

    /// Set several parameters, replacing previous values.
    pub fn extend<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        self.values.extend(values);
        self
    }

    /// Fill the parameters missing so far from a quality profile table.
    pub fn apply_profiles(mut self, profiles: &QualityProfiles, quality: &str) -> Self {
        for name in profiles.names() {
            if self.values.contains_key(name) {
                continue;
            }
            if let Some(value) = profiles.lookup(name, quality) {
                log::debug!("Parameter {name} = {value} from quality profile '{quality}'");
                self.values.insert(name.to_string(), value.clone());
            }
        }
        self
    }

    /// Compute a parameter from the values assembled so far.
    ///
    /// The parameter is left unset when `f` returns `None`.
    pub fn derive<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&BTreeMap<String, ParamValue>) -> Option<ParamValue>,
    {
        if let Some(value) = f(&self.values) {
            self.values.insert(name.into(), value);
        }
        self
    }

    /// Freeze the parameters.
    pub fn build(self) -> ParameterSet {
        ParameterSet {
            values: self.values,
        }
    }
}

/// Per-parameter values for each reconstruction quality.
///
/// The JSON layout is `{"param": {"default": v, "low": v, ...}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct QualityProfiles {
    params: BTreeMap<String, BTreeMap<String, ParamValue>>,
}

impl QualityProfiles {
    /// Parse a profile table from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a profile table from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The parameter names of the table.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// The value of `name` for `quality`, falling back to the `default` entry.
    pub fn lookup(&self, name: &str, quality: &str) -> Option<&ParamValue> {
        let entries = self.params.get(name)?;
        entries
            .get(quality)
            .or_else(|| entries.get(DEFAULT_QUALITY))
    }
}
