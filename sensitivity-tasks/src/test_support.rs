//! Test doubles for the progress channel and the export command.
//!
//! Gated behind the `test-support` feature (and `cfg(test)`).

use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    ExportCommand, ExportCommandError, ExportOptions, Progress, ProgressMeta, ProgressReporter,
    TaskHandle,
};

/// Reporter that keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    updates: Mutex<Vec<ProgressMeta>>,
}

impl RecordingReporter {
    /// Updates received so far, oldest first.
    pub fn updates(&self) -> Vec<ProgressMeta> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, stage: &str, progress: Progress, message: &str) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ProgressMeta::new(stage, progress, message));
    }
}

/// Arguments of one [`RecordingCommand`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Export root.
    pub root: Utf8PathBuf,
    /// Requested verbosity.
    pub verbosity: u8,
    /// Name carried by the task handle.
    pub task: String,
    /// Merged options.
    pub options: ExportOptions,
}

/// Export command that records its invocations and optionally fails.
#[derive(Debug, Default)]
pub struct RecordingCommand {
    calls: Mutex<Vec<RecordedCall>>,
    failure: Option<String>,
}

impl RecordingCommand {
    /// Command that records the call and then fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::default(),
            failure: Some(message.into()),
        }
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExportCommand for RecordingCommand {
    fn run(
        &self,
        root: &Utf8Path,
        verbosity: u8,
        task: &TaskHandle,
        options: &ExportOptions,
    ) -> Result<(), ExportCommandError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                root: root.to_path_buf(),
                verbosity,
                task: task.name().to_owned(),
                options: options.clone(),
            });
        match &self.failure {
            Some(message) => Err(ExportCommandError::Other(message.clone().into())),
            None => Ok(()),
        }
    }
}
