use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PipelineError;

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgramEntry {
    Path(PathBuf),
    Table { path: PathBuf },
}

impl From<ProgramEntry> for PathBuf {
    fn from(entry: ProgramEntry) -> Self {
        match entry {
            ProgramEntry::Path(path) | ProgramEntry::Table { path } => path,
        }
    }
}

/// Executables available to pipeline steps, by name.
///
/// In JSON each program is either a path or an object with a `path` field:
/// `{"colmap": {"path": "/opt/colmap/bin/colmap"}, "echo": "/bin/echo"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramRegistry {
    programs: BTreeMap<String, PathBuf>,
}

impl ProgramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a program.
    pub fn with_program(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(name, path);
        self
    }

    /// Add or replace a program.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.programs.insert(name.into(), path.into());
    }

    /// The executable registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.programs.get(name).map(PathBuf::as_path)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    /// Number of programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Parse a registry from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, PipelineError> {
        let entries: BTreeMap<String, ProgramEntry> = serde_json::from_str(s)?;
        Ok(Self {
            programs: entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
        })
    }

    /// Read a registry from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() -> Result<(), PipelineError> {
        let registry = ProgramRegistry::from_json_str(
            r#"{"colmap": {"path": "/opt/colmap/bin/colmap"}, "echo": "/bin/echo"}"#,
        )?;
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("colmap"), Some(Path::new("/opt/colmap/bin/colmap")));
        assert_eq!(registry.get("echo"), Some(Path::new("/bin/echo")));
        assert_eq!(registry.get("meshlab"), None);
        Ok(())
    }

    #[test]
    fn test_from_json_invalid() {
        let res = ProgramRegistry::from_json_str(r#"{"colmap": 3}"#);
        assert!(matches!(res, Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_with_program() {
        let registry = ProgramRegistry::new()
            .with_program("run", "./run.sh")
            .with_program("run", "./run2.sh");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("run"));
        assert_eq!(registry.get("run"), Some(Path::new("./run2.sh")));
    }
}
