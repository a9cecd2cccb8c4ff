//! Progress side-channel shared by jobs and the commands they drive.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Accepted but not started.
    Pending,
    /// Running; the latest progress payload is attached.
    Progress,
    /// Finished with a result.
    Success,
    /// Finished with an error.
    Failure,
}

impl TaskState {
    /// Whether no further transition can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Progress payload: `{name, current, total, infos}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMeta {
    /// Registered name of the reporting task.
    pub name: String,
    /// Completed units of work.
    pub current: u32,
    /// Total units of work.
    pub total: u32,
    /// Human-readable stage description.
    pub infos: String,
}

/// Fraction of work done, expressed as `current / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Completed units of work.
    pub current: u32,
    /// Total units of work.
    pub total: u32,
}

impl Progress {
    /// Construct a progress fraction.
    pub const fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }
}

/// Receives progress updates from a running task.
pub trait ProgressReporter: Send + Sync {
    /// Record that task `stage` reached `progress`, described by `message`.
    fn report(&self, stage: &str, progress: Progress, message: &str);
}

/// Reporter that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _stage: &str, _progress: Progress, _message: &str) {}
}

/// Handle identifying the running task, passed down to export commands so
/// they can publish finer-grained progress.
#[derive(Clone)]
pub struct TaskHandle {
    name: String,
    reporter: Arc<dyn ProgressReporter>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    /// Bind a task name to a reporter.
    pub fn new(name: impl Into<String>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            name: name.into(),
            reporter,
        }
    }

    /// Handle whose updates are discarded.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(NullReporter))
    }

    /// Registered name of the task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish a progress update under this task's name.
    pub fn report(&self, current: u32, total: u32, infos: &str) {
        self.reporter
            .report(&self.name, Progress::new(current, total), infos);
    }
}

impl ProgressMeta {
    /// Build the payload published for an update.
    pub fn new(stage: &str, progress: Progress, message: &str) -> Self {
        Self {
            name: stage.to_owned(),
            current: progress.current,
            total: progress.total,
            infos: message.to_owned(),
        }
    }
}
