//! Summary command implementation for the geofeature CLI.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geofeature_core::{FeatureDataStore, FeatureQueryParameters};
use geofeature_data::FileFeatureDataStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::load::{load_store, validate_files};
use crate::{ARG_FILES, CliError, ENV_SUMMARY_FILES};

/// CLI arguments for the `summary` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Load GeoJSON files and print one tab-separated line per \
                 feature set: source file, set name, provider and feature \
                 count.",
    about = "Summarise the feature sets in GeoJSON files"
)]
#[ortho_config(prefix = "GEOFEATURE")]
pub(crate) struct SummaryArgs {
    /// GeoJSON files to load.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) files: Vec<Utf8PathBuf>,
}

impl SummaryArgs {
    pub(crate) fn into_config(self) -> Result<SummaryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SummaryConfig::try_from(merged)
    }
}

/// Resolved `summary` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SummaryConfig {
    /// Files to load, in order.
    pub(crate) files: Vec<Utf8PathBuf>,
}

impl TryFrom<SummaryArgs> for SummaryConfig {
    type Error = CliError;

    fn try_from(args: SummaryArgs) -> Result<Self, Self::Error> {
        if args.files.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_FILES,
                env: ENV_SUMMARY_FILES,
            });
        }
        Ok(Self { files: args.files })
    }
}

pub(super) fn run_summary(args: SummaryArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_summary_with(args, &mut stdout)
}

pub(super) fn run_summary_with(
    args: SummaryArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_summary(&config, writer)
}

pub(super) fn execute_summary(
    config: &SummaryConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    validate_files(&config.files)?;
    let store = load_store(&config.files)?;
    for path in store.files() {
        write_file_summary(&store, &path, writer)?;
    }
    Ok(())
}

fn write_file_summary(
    store: &FileFeatureDataStore,
    path: &Utf8Path,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    for id in store.feature_set_ids_for_file(path) {
        let Some(set) = store.get_feature_set(id)? else {
            continue;
        };
        let count =
            store.query_features_count(&FeatureQueryParameters::new().with_feature_set_ids([id]))?;
        writeln!(
            writer,
            "{path}\t{name}\t{provider}\t{count}",
            name = set.name,
            provider = set.provider
        )
        .map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
