//! Error types emitted by the sensitivity CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use sensitivity_core::{SridError, StoreError};
use sensitivity_web::ApiError;
use thiserror::Error;

/// Errors emitted by the sensitivity CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A configured EPSG code has no known projection.
    #[error("invalid {field}: {source}")]
    InvalidSrid {
        field: &'static str,
        #[source]
        source: SridError,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Installing the logger failed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),
    /// Opening or querying the area store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The API rejected the request.
    #[error("request failed with status {}: {source}", .source.status())]
    Api {
        #[from]
        source: ApiError,
    },
    /// Opening the export options file failed.
    #[error("failed to open export options at {path:?}: {source}")]
    OpenExportOptions {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The export options file is not a JSON object.
    #[error("failed to parse export options JSON at {path:?}: {source}")]
    ParseExportOptions {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Building the async runtime failed.
    #[error("failed to start the task runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The background task panicked or was cancelled.
    #[error("task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// The export task finished in failure.
    #[error("task {name} failed: {message}")]
    TaskFailed { name: String, message: String },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
