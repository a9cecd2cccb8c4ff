//! `sync-rando` command: run the offline export and report its status.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::sync::Arc;

use sensitivity_fs::open_utf8_file;
use sensitivity_tasks::{
    ExportCommand, ExportOptions, SYNC_RANDO_TASK, ShellExportCommand, SyncRandoSettings,
    TaskRunner, TaskState, TaskStatus,
};

use crate::{
    ARG_EXPORT_PROGRAM, ARG_SYNC_RANDO_OPTIONS, ARG_SYNC_RANDO_ROOT, ARG_URL, CliError,
    ENV_EXPORT_PROGRAM, ENV_SYNC_RANDO_ROOT, require_existing, write_json,
};

/// CLI arguments for the `sync-rando` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create the export root (one level only), then run the \
                 external export program with the configured options. A \
                 `url` key in the options file takes precedence over --url.",
    about = "Run the sync rando export"
)]
#[ortho_config(prefix = "SENSITIVITY")]
pub(crate) struct SyncRandoArgs {
    /// Directory the export writes into; its parent must exist.
    #[arg(long = ARG_SYNC_RANDO_ROOT, value_name = "dir")]
    #[serde(default)]
    pub(crate) sync_rando_root: Option<Utf8PathBuf>,
    /// JSON file holding the base export options object.
    #[arg(long = ARG_SYNC_RANDO_OPTIONS, value_name = "path")]
    #[serde(default)]
    pub(crate) sync_rando_options: Option<Utf8PathBuf>,
    /// Public URL of the portal, used unless the options set one.
    #[arg(long = ARG_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Program running the export.
    #[arg(long = ARG_EXPORT_PROGRAM, value_name = "program")]
    #[serde(default)]
    pub(crate) export_program: Option<String>,
}

impl SyncRandoArgs {
    pub(crate) fn into_config(self) -> Result<SyncRandoConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncRandoConfig::try_from(merged)
    }
}

/// Resolved `sync-rando` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncRandoConfig {
    pub(crate) root: Utf8PathBuf,
    pub(crate) options_path: Option<Utf8PathBuf>,
    pub(crate) url: Option<String>,
    pub(crate) export_program: String,
}

impl TryFrom<SyncRandoArgs> for SyncRandoConfig {
    type Error = CliError;

    fn try_from(args: SyncRandoArgs) -> Result<Self, Self::Error> {
        let root = args.sync_rando_root.ok_or(CliError::MissingArgument {
            field: ARG_SYNC_RANDO_ROOT,
            env: ENV_SYNC_RANDO_ROOT,
        })?;
        let export_program = args.export_program.ok_or(CliError::MissingArgument {
            field: ARG_EXPORT_PROGRAM,
            env: ENV_EXPORT_PROGRAM,
        })?;
        Ok(Self {
            root,
            options_path: args.sync_rando_options,
            url: args.url,
            export_program,
        })
    }
}

/// Builds the export command for the current invocation.
pub(super) trait ExportCommandBuilder {
    fn build(&self, config: &SyncRandoConfig) -> Arc<dyn ExportCommand>;
}

pub(super) struct ShellExportCommandBuilder;

impl ExportCommandBuilder for ShellExportCommandBuilder {
    fn build(&self, config: &SyncRandoConfig) -> Arc<dyn ExportCommand> {
        Arc::new(ShellExportCommand::new(config.export_program.as_str()))
    }
}

pub(super) fn run_sync_rando(args: SyncRandoArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    run_sync_rando_with(args, &ShellExportCommandBuilder, writer)
}

pub(super) fn run_sync_rando_with(
    args: SyncRandoArgs,
    builder: &dyn ExportCommandBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let options = match &config.options_path {
        Some(path) => load_export_options(path)?,
        None => ExportOptions::new(),
    };
    let settings = SyncRandoSettings::new(config.root.clone()).with_options(options);
    let status = execute_sync_rando(settings, config.url.clone(), builder.build(&config))?;
    write_json(writer, &status)?;
    match status.state {
        TaskState::Failure => Err(CliError::TaskFailed {
            name: SYNC_RANDO_TASK.to_owned(),
            message: status.error.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

fn execute_sync_rando(
    settings: SyncRandoSettings,
    url: Option<String>,
    command: Arc<dyn ExportCommand>,
) -> Result<TaskStatus, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let runner = TaskRunner::new();
    let id = runtime.block_on(async {
        let (id, join) = runner.submit_sync_rando(settings, url, command);
        join.await?;
        Ok::<_, CliError>(id)
    })?;
    info!("task {id} finished");
    runner
        .statuses()
        .status(id)
        .ok_or_else(|| CliError::TaskFailed {
            name: SYNC_RANDO_TASK.to_owned(),
            message: format!("no status recorded for task {id}"),
        })
}

/// Load the base export options from a JSON object file.
pub(super) fn load_export_options(path: &Utf8Path) -> Result<ExportOptions, CliError> {
    require_existing(path, ARG_SYNC_RANDO_OPTIONS)?;
    let file = open_utf8_file(path).map_err(|source| CliError::OpenExportOptions {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        CliError::ParseExportOptions {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncRandoConfig, CliError> {
    let merged = SyncRandoArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SyncRandoConfig::try_from(merged)
}
