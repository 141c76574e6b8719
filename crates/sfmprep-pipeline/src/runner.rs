use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A fully resolved step invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// The executable.
    pub program: PathBuf,
    /// The arguments, placeholders substituted.
    pub args: Vec<String>,
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Starts an external program and waits for it.
pub trait CommandRunner {
    /// Run `program` with `args` to completion.
    ///
    /// # Returns
    ///
    /// The exit code of the process, -1 when it was terminated by a signal.
    fn run(&mut self, program: &Path, args: &[String]) -> std::io::Result<i32>;
}

/// Runs steps as child processes sharing the terminal of the caller.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    /// A runner starting processes in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start processes in `dir` instead.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, program: &Path, args: &[String]) -> std::io::Result<i32> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command.status()?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_spaces() {
        let command = ResolvedCommand {
            program: PathBuf::from("/opt/colmap"),
            args: vec![
                "mapper".to_string(),
                "--path".to_string(),
                "/my data".to_string(),
                String::new(),
            ],
        };
        assert_eq!(command.to_string(), "/opt/colmap mapper --path \"/my data\" \"\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_exit_codes() -> Result<(), Box<dyn std::error::Error>> {
        let mut runner = ProcessRunner::new();
        let sh = Path::new("/bin/sh");

        assert_eq!(runner.run(sh, &["-c".to_string(), "exit 0".to_string()])?, 0);
        assert_eq!(runner.run(sh, &["-c".to_string(), "exit 3".to_string()])?, 3);
        assert_eq!(
            runner.run(sh, &["-c".to_string(), "kill -9 $$".to_string()])?,
            -1
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_working_dir() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let mut runner = ProcessRunner::new().with_working_dir(tmp_dir.path());
        let code = runner.run(
            Path::new("/bin/sh"),
            &["-c".to_string(), "touch marker".to_string()],
        )?;
        assert_eq!(code, 0);
        assert!(tmp_dir.path().join("marker").exists());
        Ok(())
    }

    #[test]
    fn test_process_runner_missing_program() {
        let mut runner = ProcessRunner::new();
        let res = runner.run(Path::new("/does/not/exist/program"), &[]);
        assert!(res.is_err());
    }
}
