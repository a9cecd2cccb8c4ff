//! Command-line interface for the sensitive areas engine.
//!
//! `areas` and `trek-areas` print the public GeoJSON listings from a SQLite
//! store; `sync-rando` runs the offline export job and prints its final
//! status. Settings layer CLI flags over `SENSITIVITY_*` environment
//! variables over configuration files.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use sensitivity_core::Srid;
use serde::Serialize;
use std::io::Write;

mod error;
mod listing;
mod logging;
mod sync_rando;

pub use error::CliError;

use listing::{AreasArgs, TrekAreasArgs};
use sync_rando::SyncRandoArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_INTERNAL_SRID: &str = "internal-srid";
pub(crate) const ARG_API_SRID: &str = "api-srid";
pub(crate) const ARG_PRACTICES: &str = "practices";
pub(crate) const ARG_TREK: &str = "trek";
pub(crate) const ARG_SYNC_RANDO_ROOT: &str = "sync-rando-root";
pub(crate) const ARG_SYNC_RANDO_OPTIONS: &str = "sync-rando-options";
pub(crate) const ARG_URL: &str = "url";
pub(crate) const ARG_EXPORT_PROGRAM: &str = "export-program";
pub(crate) const ENV_DATABASE: &str = "SENSITIVITY_DATABASE";
pub(crate) const ENV_TREK: &str = "SENSITIVITY_TREK";
pub(crate) const ENV_SYNC_RANDO_ROOT: &str = "SENSITIVITY_SYNC_RANDO_ROOT";
pub(crate) const ENV_EXPORT_PROGRAM: &str = "SENSITIVITY_EXPORT_PROGRAM";

/// Reference system geometries are stored in unless configured otherwise.
pub(crate) const DEFAULT_INTERNAL_SRID: Srid = Srid::Lambert93;
/// Reference system API output uses unless configured otherwise.
pub(crate) const DEFAULT_API_SRID: Srid = Srid::Wgs84;

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let _logger = logging::init()?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Areas(args) => listing::run_areas_with(args, &mut stdout),
        Command::TrekAreas(args) => listing::run_trek_areas_with(args, &mut stdout),
        Command::SyncRando(args) => sync_rando::run_sync_rando(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "sensitivity",
    about = "Sensitive area listings and offline export for the trekking engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every published sensitive area as GeoJSON.
    Areas(AreasArgs),
    /// Print the published sensitive areas crossed by a public trek.
    TrekAreas(TrekAreasArgs),
    /// Run the offline "sync rando" export.
    SyncRando(SyncRandoArgs),
}

/// Resolve an optional EPSG code, falling back to `default`.
pub(crate) fn resolve_srid(
    code: Option<u32>,
    default: Srid,
    field: &'static str,
) -> Result<Srid, CliError> {
    code.map_or(Ok(default), |code| {
        Srid::from_code(code).map_err(|source| CliError::InvalidSrid { field, source })
    })
}

/// Fail unless `path` names an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match sensitivity_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `value` as pretty-printed JSON followed by a newline.
pub(crate) fn write_json<T>(writer: &mut dyn Write, value: &T) -> Result<(), CliError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
