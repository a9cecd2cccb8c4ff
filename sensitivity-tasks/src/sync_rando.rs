//! The "sync rando" export job.
//!
//! The job prepares the export root, announces itself on the progress
//! channel, merges the export options and hands over to the export command.
//! It performs no retries: whatever the command reports is returned as-is.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensitivity_fs::{DirCreation, create_dir_if_missing};

use crate::{ExportCommand, ExportCommandError, ExportOptions, TaskHandle, merge_options};

/// Registered name of the export task.
pub const SYNC_RANDO_TASK: &str = "geotrek.trekking.sync-rando";

/// Verbosity requested from the export command.
pub const SYNC_RANDO_VERBOSITY: u8 = 2;

/// Progress reported once the root is ready, out of [`INIT_TOTAL`].
pub const INIT_CURRENT: u32 = 5;
/// Total units of work announced by the job.
pub const INIT_TOTAL: u32 = 100;
/// Stage description published before the export starts.
pub const INIT_INFOS: &str = "Init sync ...";

/// Configuration the job runs with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncRandoSettings {
    /// Export root directory; only its last component is ever created.
    pub root: Utf8PathBuf,
    /// Configured export options; these take precedence over the caller's.
    #[serde(default)]
    pub options: ExportOptions,
}

impl SyncRandoSettings {
    /// Settings with no configured options.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: ExportOptions::new(),
        }
    }

    /// Replace the configured options.
    #[must_use]
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Terminal result of a task: `{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Registered name of the task.
    pub name: String,
}

/// Errors raised by [`launch_sync_rando`].
#[derive(Debug, Error)]
pub enum SyncRandoError {
    /// The export root could not be created.
    #[error("failed to create export root {path}: {source}")]
    CreateRoot {
        /// Root that was requested.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The export command failed.
    #[error(transparent)]
    Export(#[from] ExportCommandError),
}

/// Run the export job.
///
/// `url` is the caller-supplied public URL; it is only used when the
/// configured options carry none. Progress is published through `task`,
/// which is also forwarded to the command.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use sensitivity_tasks::{SYNC_RANDO_TASK, SyncRandoSettings, TaskHandle, launch_sync_rando};
/// use sensitivity_tasks::test_support::RecordingCommand;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::try_from(temp.path().join("rando"))?;
/// let command = RecordingCommand::default();
/// let task = TaskHandle::detached(SYNC_RANDO_TASK);
///
/// let result = launch_sync_rando(&SyncRandoSettings::new(&root), Some("http://x"), &command, &task)?;
/// assert_eq!(result.name, SYNC_RANDO_TASK);
/// assert!(root.is_dir());
/// # Ok(())
/// # }
/// ```
pub fn launch_sync_rando(
    settings: &SyncRandoSettings,
    url: Option<&str>,
    command: &dyn ExportCommand,
    task: &TaskHandle,
) -> Result<TaskResult, SyncRandoError> {
    info!("Sync rando started");
    prepare_root(&settings.root)?;
    task.report(INIT_CURRENT, INIT_TOTAL, INIT_INFOS);
    let options = merge_options(&settings.options, url);
    command.run(&settings.root, SYNC_RANDO_VERBOSITY, task, &options)?;
    info!("Sync rando ended");
    Ok(TaskResult {
        name: task.name().to_owned(),
    })
}

fn prepare_root(root: &Utf8Path) -> Result<(), SyncRandoError> {
    let created = create_dir_if_missing(root).map_err(|source| SyncRandoError::CreateRoot {
        path: root.to_path_buf(),
        source,
    })?;
    if created == DirCreation::Created {
        info!("created export root {root}");
    }
    Ok(())
}
