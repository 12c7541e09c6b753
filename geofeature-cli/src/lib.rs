//! Command-line interface for querying geofeature data files.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod load;
mod query;
mod summary;

pub use error::CliError;

use query::{QueryArgs, run_query};
use summary::{SummaryArgs, run_summary};

const ARG_FILES: &str = "files";
const ARG_QUERY_NAME: &str = "name";
const ARG_QUERY_PROVIDER: &str = "provider";
const ARG_QUERY_BBOX: &str = "bbox";
const ARG_QUERY_GEOMETRY_TYPE: &str = "geometry-type";
const ARG_QUERY_LIMIT: &str = "limit";
const ENV_QUERY_FILES: &str = "GEOFEATURE_CMDS_QUERY_FILES";
const ENV_SUMMARY_FILES: &str = "GEOFEATURE_CMDS_SUMMARY_FILES";

/// Run the geofeature CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Query(args) => run_query(args),
        Command::Summary(args) => run_summary(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "geofeature",
    about = "Load GeoJSON files into an in-memory feature store and query them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the features matching a query as JSON lines.
    Query(QueryArgs),
    /// Print one line per feature set with its feature count.
    Summary(SummaryArgs),
}

#[cfg(test)]
mod tests;
