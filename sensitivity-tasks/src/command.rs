//! Seam over the command that writes the static export.

use std::error::Error as StdError;
use std::process::{Command, ExitStatus};

use camino::Utf8Path;
use log::{debug, info};
use serde_json::Value;
use thiserror::Error;

use crate::{ExportOptions, TaskHandle};

/// Name of the management command producing the export.
pub const SYNC_RANDO_COMMAND: &str = "sync_rando";

/// Errors raised by an export command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportCommandError {
    /// The external program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The external program exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
    /// Failure reported by an in-process command.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

/// Produces the static export under a root directory.
pub trait ExportCommand: Send + Sync {
    /// Run the export into `root`.
    ///
    /// `task` identifies the running job so the command can report its own
    /// progress; `options` are the merged export options.
    fn run(
        &self,
        root: &Utf8Path,
        verbosity: u8,
        task: &TaskHandle,
        options: &ExportOptions,
    ) -> Result<(), ExportCommandError>;
}

/// Runs the export through an external management program.
///
/// The command line is
/// `<program> [prefix args] sync_rando <root> --verbosity=<n> --<key>=<value>...`.
/// String values are passed verbatim, `null` values are omitted and other
/// values are passed as JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExportCommand {
    program: String,
    prefix_args: Vec<String>,
}

impl ShellExportCommand {
    /// Invoke `program` directly.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// Insert arguments between the program and the command name, such as a
    /// `manage.py` script path.
    #[must_use]
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments passed to the program for one run.
    pub fn arguments(&self, root: &Utf8Path, verbosity: u8, options: &ExportOptions) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.push(SYNC_RANDO_COMMAND.to_owned());
        args.push(root.to_string());
        args.push(format!("--verbosity={verbosity}"));
        args.extend(options.iter().filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(text) => Some(format!("--{key}={text}")),
            other => Some(format!("--{key}={other}")),
        }));
        args
    }
}

impl ExportCommand for ShellExportCommand {
    fn run(
        &self,
        root: &Utf8Path,
        verbosity: u8,
        task: &TaskHandle,
        options: &ExportOptions,
    ) -> Result<(), ExportCommandError> {
        let args = self.arguments(root, verbosity, options);
        debug!("{}: running {} {:?}", task.name(), self.program, args);
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| ExportCommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ExportCommandError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        info!("{}: export written to {root}", task.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn options() -> ExportOptions {
        let mut options = ExportOptions::new();
        options.insert("url".into(), json!("http://rando.example"));
        options.insert("skip_tiles".into(), json!(true));
        options.insert("source".into(), Value::Null);
        options
    }

    #[test]
    fn arguments_follow_management_command_layout() {
        let command = ShellExportCommand::new("python").with_prefix_args(["manage.py"]);
        let args = command.arguments(Utf8Path::new("/var/rando"), 2, &options());
        assert_eq!(
            args,
            vec![
                "manage.py",
                "sync_rando",
                "/var/rando",
                "--verbosity=2",
                "--skip_tiles=true",
                "--url=http://rando.example",
            ]
        );
    }

    #[cfg(unix)]
    #[rstest]
    #[case("true", true)]
    #[case("false", false)]
    fn exit_status_decides_outcome(#[case] program: &str, #[case] succeeds: bool) {
        let command = ShellExportCommand::new(program);
        let task = TaskHandle::detached("test");
        let result = command.run(Utf8Path::new("/tmp"), 2, &task, &ExportOptions::new());
        assert_eq!(result.is_ok(), succeeds);
        if !succeeds {
            assert!(matches!(result, Err(ExportCommandError::Failed { .. })));
        }
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let command = ShellExportCommand::new("definitely-not-an-installed-program");
        let task = TaskHandle::detached("test");
        let result = command.run(Utf8Path::new("/tmp"), 2, &task, &ExportOptions::new());
        assert!(matches!(result, Err(ExportCommandError::Spawn { .. })));
    }
}
