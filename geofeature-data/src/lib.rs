//! File-backed feature data for geofeature.
//!
//! Responsibilities:
//! - Define the [`FeatureDataSource`] trait that turns files into feature
//!   sets.
//! - Provide a GeoJSON source.
//! - Provide [`FileFeatureDataStore`], an in-memory store populated from
//!   files that tracks which file each feature set came from and reloads
//!   files whose content changed.
//!
//! Boundaries:
//! - Indexing, querying and visibility are delegated to
//!   `geofeature-runtime`.
//! - Filesystem access goes through `geofeature-fs`.
//!
//! Invariants:
//! - A file is loaded at most once.
//! - Every loaded feature set belongs to exactly one file.

#![forbid(unsafe_code)]

pub mod geojson;
mod source;
mod store;

pub use geojson::{GEOJSON_PROVIDER, GeoJsonSource};
pub use source::{DataSourceError, FeatureDataSource, ParsedFeatureSet};
pub use store::{
    DEFAULT_FILE_STORE_URI, FILE_STORE_MODIFICATIONS, FileFeatureDataStore, FileStoreError,
    RefreshReport,
};
