//! Parser abstraction for file-backed feature content.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use geofeature_core::{DisplayThresholds, FeatureDefinition};
use thiserror::Error;

/// One feature set parsed from a file, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeatureSet {
    /// Provider recorded on the feature set.
    pub provider: String,
    /// Type recorded on the feature set.
    pub kind: String,
    /// Display name of the feature set.
    pub name: String,
    /// Display thresholds of the feature set.
    pub thresholds: DisplayThresholds,
    /// Features in file order.
    pub features: Vec<FeatureDefinition>,
}

/// Turns files of one format into feature sets.
///
/// A source is identified by its [`name`](Self::name). Content parsed by a
/// source stays current while the name, the
/// [`parse_version`](Self::parse_version) and the file itself are unchanged.
pub trait FeatureDataSource: Send + Sync {
    /// Stable identifier of this source.
    fn name(&self) -> &str;

    /// Version of the parsing rules. Bump it whenever the same file would
    /// parse differently.
    fn parse_version(&self) -> u32;

    /// Whether this source is willing to parse `path`.
    fn supports(&self, path: &Utf8Path) -> bool;

    /// Parse `path` into feature sets.
    ///
    /// # Errors
    ///
    /// [`DataSourceError`] when the file cannot be read or is malformed.
    fn parse(&self, path: &Utf8Path) -> Result<Vec<ParsedFeatureSet>, DataSourceError>;
}

/// Errors raised while parsing a file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataSourceError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being parsed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON or does not match the expected shape.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// File being parsed.
        path: Utf8PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// The file decoded but its content is invalid.
    #[error("invalid content in {path}: {reason}")]
    Invalid {
        /// File being parsed.
        path: Utf8PathBuf,
        /// What was wrong.
        reason: String,
    },
}
