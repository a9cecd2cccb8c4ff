//! `areas` and `trek-areas` commands.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use sensitivity_core::{Actor, Srid, SqliteStore};
use sensitivity_web::{Method, list_sensitive_areas, list_trek_sensitive_areas};

use crate::{
    ARG_API_SRID, ARG_DATABASE, ARG_INTERNAL_SRID, ARG_PRACTICES, ARG_TREK, CliError,
    DEFAULT_API_SRID, DEFAULT_INTERNAL_SRID, ENV_DATABASE, ENV_TREK, require_existing,
    resolve_srid, write_json,
};

/// CLI arguments for the `areas` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List existing, published sensitive areas as a GeoJSON \
                 feature collection, reprojected into the API reference \
                 system. Optionally keep only areas whose species is \
                 sensitive to at least one of the named practices.",
    about = "List published sensitive areas"
)]
#[ortho_config(prefix = "SENSITIVITY")]
pub(crate) struct AreasArgs {
    /// Path to the SQLite area store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// EPSG code geometries are stored in (default 2154).
    #[arg(long = ARG_INTERNAL_SRID, value_name = "code")]
    #[serde(default)]
    pub(crate) internal_srid: Option<u32>,
    /// EPSG code of the output (default 4326).
    #[arg(long = ARG_API_SRID, value_name = "code")]
    #[serde(default)]
    pub(crate) api_srid: Option<u32>,
    /// Comma-separated practice names.
    #[arg(long = ARG_PRACTICES, value_name = "names")]
    #[serde(default)]
    pub(crate) practices: Option<String>,
}

/// CLI arguments for the `trek-areas` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List the published sensitive areas crossed by the path of \
                 a public trek. Missing, deleted and unpublished treks are \
                 all reported as not found.",
    about = "List the sensitive areas of a trek"
)]
#[ortho_config(prefix = "SENSITIVITY")]
pub(crate) struct TrekAreasArgs {
    /// Identifier of the trek.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) trek: Option<u64>,
    /// Path to the SQLite area store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// EPSG code geometries are stored in (default 2154).
    #[arg(long = ARG_INTERNAL_SRID, value_name = "code")]
    #[serde(default)]
    pub(crate) internal_srid: Option<u32>,
    /// EPSG code of the output (default 4326).
    #[arg(long = ARG_API_SRID, value_name = "code")]
    #[serde(default)]
    pub(crate) api_srid: Option<u32>,
}

impl AreasArgs {
    pub(crate) fn into_config(self) -> Result<AreasConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AreasConfig::try_from(merged)
    }
}

impl TrekAreasArgs {
    pub(crate) fn into_config(self) -> Result<TrekAreasConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        TrekAreasConfig::try_from(merged)
    }
}

/// Store location and reference systems shared by the listing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) internal_srid: Srid,
    pub(crate) api_srid: Srid,
}

impl StoreConfig {
    fn resolve(
        database: Option<Utf8PathBuf>,
        internal_srid: Option<u32>,
        api_srid: Option<u32>,
    ) -> Result<Self, CliError> {
        let database = database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;
        Ok(Self {
            database,
            internal_srid: resolve_srid(internal_srid, DEFAULT_INTERNAL_SRID, ARG_INTERNAL_SRID)?,
            api_srid: resolve_srid(api_srid, DEFAULT_API_SRID, ARG_API_SRID)?,
        })
    }

    /// Open the existing store; a missing database is an error, not created.
    fn open(&self) -> Result<SqliteStore, CliError> {
        require_existing(&self.database, ARG_DATABASE)?;
        Ok(SqliteStore::open(&self.database, self.internal_srid)?)
    }
}

/// Resolved `areas` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AreasConfig {
    pub(crate) store: StoreConfig,
    pub(crate) practices: Option<String>,
}

impl TryFrom<AreasArgs> for AreasConfig {
    type Error = CliError;

    fn try_from(args: AreasArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.internal_srid, args.api_srid)?,
            practices: args.practices,
        })
    }
}

/// Resolved `trek-areas` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrekAreasConfig {
    pub(crate) store: StoreConfig,
    pub(crate) trek: u64,
}

impl TryFrom<TrekAreasArgs> for TrekAreasConfig {
    type Error = CliError;

    fn try_from(args: TrekAreasArgs) -> Result<Self, Self::Error> {
        let trek = args.trek.ok_or(CliError::MissingArgument {
            field: ARG_TREK,
            env: ENV_TREK,
        })?;
        Ok(Self {
            store: StoreConfig::resolve(args.database, args.internal_srid, args.api_srid)?,
            trek,
        })
    }
}

pub(super) fn run_areas_with(args: AreasArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = config.store.open()?;
    let areas = list_sensitive_areas(
        &store,
        &Actor::Anonymous,
        Method::Get,
        config.practices.as_deref(),
        config.store.api_srid,
    )?;
    info!(
        "listed {} sensitive areas from {}",
        areas.features.len(),
        config.store.database
    );
    write_json(writer, &areas)
}

pub(super) fn run_trek_areas_with(
    args: TrekAreasArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = config.store.open()?;
    let areas = list_trek_sensitive_areas(
        &store,
        &Actor::Anonymous,
        Method::Get,
        config.trek,
        config.store.api_srid,
    )?;
    info!(
        "listed {} sensitive areas for trek {}",
        areas.features.len(),
        config.trek
    );
    write_json(writer, &areas)
}

#[cfg(test)]
pub(crate) fn areas_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<AreasConfig, CliError> {
    let merged = AreasArgs::merge_from_layers(layers).map_err(CliError::from)?;
    AreasConfig::try_from(merged)
}
