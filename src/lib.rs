//! Facade crate for the geofeature spatial data store.
//!
//! This crate re-exports the core record, query and store types and exposes
//! the in-memory and file-backed store implementations behind feature flags.

#![forbid(unsafe_code)]

pub use geofeature_core::{
    AttributeSet, AttributeValue, ChangeEvent, ChangeListener, DisplayThresholds, Envelope,
    Feature, FeatureCursor, FeatureDataStore, FeatureDefinition, FeatureId, FeatureQueryParameters,
    FeatureSet, FeatureSetCursor, FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters,
    FeatureSetUpdate, FeatureUpdate, Geometry, GeometryClass, ListenerId, ModificationFlags,
    SpatialFilter, StoreError, Style, VisibilityFlags,
};

#[cfg(feature = "runtime")]
pub use geofeature_runtime::{QueryPlan, RuntimeFeatureDataStore, RuntimeStoreConfig};

#[cfg(feature = "file-store")]
pub use geofeature_data::{FeatureDataSource, FileFeatureDataStore, FileStoreError, GeoJsonSource};
