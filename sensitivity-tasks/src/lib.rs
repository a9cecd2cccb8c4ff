//! Background jobs for the sensitive areas engine.
//!
//! Responsibilities:
//! - Run the "sync rando" static export job.
//! - Publish job progress through a [`ProgressReporter`] side-channel.
//! - Dispatch jobs on Tokio's blocking pool and expose a polled status store.
//!
//! Boundaries:
//! - The export itself is delegated to an [`ExportCommand`]; this crate only
//!   prepares its inputs.
//! - No retries: failures are surfaced to the caller unchanged.
#![forbid(unsafe_code)]

mod command;
mod options;
mod progress;
mod runner;
mod sync_rando;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use command::{ExportCommand, ExportCommandError, SYNC_RANDO_COMMAND, ShellExportCommand};
pub use options::{ExportOptions, URL_OPTION, merge_options};
pub use progress::{
    NullReporter, Progress, ProgressMeta, ProgressReporter, TaskHandle, TaskState,
};
pub use runner::{TaskId, TaskRunner, TaskStatus, TaskStatusStore};
pub use sync_rando::{
    INIT_CURRENT, INIT_INFOS, INIT_TOTAL, SYNC_RANDO_TASK, SYNC_RANDO_VERBOSITY, SyncRandoError,
    SyncRandoSettings, TaskResult, launch_sync_rando,
};
