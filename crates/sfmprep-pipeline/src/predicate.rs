use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::params::ParameterSet;

/// A condition enabling a step.
///
/// Supported forms are `name`, `!name`, `name == value` and `name != value`. The value may
/// be quoted. Comparisons are made on the text form of the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Predicate {
    /// The parameter is present and truthy.
    IsSet(String),
    /// The parameter is absent or falsy.
    NotSet(String),
    /// The parameter is present and equal to the value.
    Equals(String, String),
    /// The parameter is absent or different from the value.
    NotEquals(String, String),
}

fn parse_name(s: &str, expression: &str) -> Result<String, PipelineError> {
    let name = s.trim();
    let name = name
        .strip_prefix("${")
        .and_then(|n| n.strip_suffix('}'))
        .unwrap_or(name)
        .trim();

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PipelineError::InvalidPredicate {
            expression: expression.to_string(),
            reason: format!("invalid parameter name '{name}'"),
        });
    }
    Ok(name.to_string())
}

fn parse_literal(s: &str) -> String {
    let s = s.trim();
    ['"', '\'']
        .iter()
        .find_map(|&q| s.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
        .unwrap_or(s)
        .to_string()
}

impl Predicate {
    /// Parse a step condition.
    pub fn parse(expression: &str) -> Result<Self, PipelineError> {
        let trimmed = expression.trim();

        if let Some((name, value)) = trimmed.split_once("!=") {
            return Ok(Predicate::NotEquals(
                parse_name(name, expression)?,
                parse_literal(value),
            ));
        }
        if let Some((name, value)) = trimmed.split_once("==") {
            return Ok(Predicate::Equals(
                parse_name(name, expression)?,
                parse_literal(value),
            ));
        }
        if let Some(name) = trimmed.strip_prefix('!') {
            return Ok(Predicate::NotSet(parse_name(name, expression)?));
        }
        Ok(Predicate::IsSet(parse_name(trimmed, expression)?))
    }

    /// Evaluate the condition. Missing parameters count as unset.
    pub fn evaluate(&self, params: &ParameterSet) -> bool {
        match self {
            Predicate::IsSet(name) => params.get(name).is_some_and(|v| v.is_truthy()),
            Predicate::NotSet(name) => !params.get(name).is_some_and(|v| v.is_truthy()),
            Predicate::Equals(name, value) => {
                params.get(name).is_some_and(|v| v.to_string() == *value)
            }
            Predicate::NotEquals(name, value) => {
                !params.get(name).is_some_and(|v| v.to_string() == *value)
            }
        }
    }

    /// The parameter the condition reads.
    pub fn parameter(&self) -> &str {
        match self {
            Predicate::IsSet(name)
            | Predicate::NotSet(name)
            | Predicate::Equals(name, _)
            | Predicate::NotEquals(name, _) => name,
        }
    }
}

impl FromStr for Predicate {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::parse(s)
    }
}

impl TryFrom<String> for Predicate {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Predicate::parse(&s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IsSet(name) => write!(f, "{name}"),
            Predicate::NotSet(name) => write!(f, "!{name}"),
            Predicate::Equals(name, value) => write!(f, "{name} == {value}"),
            Predicate::NotEquals(name, value) => write!(f, "{name} != {value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::builder()
            .set("with_texture", true)
            .set("create_scene", false)
            .set("quality", "high")
            .set("num_gpus", 2i64)
            .build()
    }

    #[test]
    fn test_parse() -> Result<(), PipelineError> {
        assert_eq!(
            Predicate::parse("with_texture")?,
            Predicate::IsSet("with_texture".to_string())
        );
        assert_eq!(
            Predicate::parse(" !${create_scene} ")?,
            Predicate::NotSet("create_scene".to_string())
        );
        assert_eq!(
            Predicate::parse("quality == 'low'")?,
            Predicate::Equals("quality".to_string(), "low".to_string())
        );
        assert_eq!(
            Predicate::parse("quality!=\"high\"")?,
            Predicate::NotEquals("quality".to_string(), "high".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_parse_invalid() {
        for expression in ["", "!", "== low", "two words", "a-b"] {
            assert!(
                matches!(
                    Predicate::parse(expression),
                    Err(PipelineError::InvalidPredicate { .. })
                ),
                "{expression} should be rejected"
            );
        }
    }

    #[test]
    fn test_evaluate() -> Result<(), PipelineError> {
        let params = params();
        let cases = [
            ("with_texture", true),
            ("create_scene", false),
            ("missing", false),
            ("!missing", true),
            ("!with_texture", false),
            ("quality == high", true),
            ("quality == low", false),
            ("num_gpus == 2", true),
            ("missing != x", true),
            ("quality != high", false),
        ];
        for (expression, expected) in cases {
            assert_eq!(
                Predicate::parse(expression)?.evaluate(&params),
                expected,
                "{expression}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_display_roundtrip() -> Result<(), PipelineError> {
        for expression in ["a", "!a", "a == b", "a != b"] {
            assert_eq!(Predicate::parse(expression)?.to_string(), expression);
        }
        Ok(())
    }
}
