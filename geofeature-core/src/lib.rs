//! Core domain types for the geofeature data store.
//!
//! This crate defines the value types stored by a feature data store
//! (geometries, styles, attributes, features and feature sets), the query
//! parameter objects, capability flags, change events, and the
//! [`FeatureDataStore`] contract that engines implement.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod attributes;
pub mod capabilities;
pub mod cursor;
pub mod event;
pub mod feature;
pub mod geodesy;
pub mod geometry;
pub mod query;
pub mod store;
pub mod style;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use attributes::{AttributeError, AttributeSet, AttributeType, AttributeValue};
pub use capabilities::{FeatureProperties, ModificationFlags, VisibilityFlags};
pub use cursor::{Cursor, FeatureCursor, FeatureSetCursor};
pub use event::{ChangeEvent, ChangeListener, ListenerId};
pub use feature::{
    AttributeUpdateMode, DisplayThresholds, Feature, FeatureDefinition, FeatureId, FeatureSet,
    FeatureSetDefinition, FeatureSetId, FeatureSetUpdate, FeatureUpdate, INITIAL_VERSION,
};
pub use geometry::{Envelope, Geometry, GeometryClass};
pub use query::{
    DEFAULT_QUERY_TIMEOUT, FeatureOrder, FeatureQueryParameters, FeatureSetQueryParameters,
    ResolutionRange, SpatialFilter, WILDCARD,
};
pub use store::{FeatureDataStore, StoreError};
pub use style::{Argb, Style};
