//! Configuration for [`crate::RuntimeFeatureDataStore`].

use geofeature_core::{ModificationFlags, VisibilityFlags};

use crate::quadtree::{DEFAULT_MAX_DEPTH, DEFAULT_NODE_CAPACITY};

/// URI reported by stores built without an explicit one.
pub const DEFAULT_URI: &str = "memory://geofeature";

/// Configuration for [`crate::RuntimeFeatureDataStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStoreConfig {
    /// Mutations the store permits.
    pub modification_flags: ModificationFlags,
    /// Visibility granularities callers may control.
    pub visibility_flags: VisibilityFlags,
    /// Quadtree leaf capacity before a split.
    pub node_capacity: usize,
    /// Quadtree depth limit.
    pub max_depth: u32,
    /// Location reported by `uri()`.
    pub uri: String,
}

impl Default for RuntimeStoreConfig {
    fn default() -> Self {
        Self {
            modification_flags: ModificationFlags::all(),
            visibility_flags: VisibilityFlags::all(),
            node_capacity: DEFAULT_NODE_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            uri: DEFAULT_URI.to_owned(),
        }
    }
}

impl RuntimeStoreConfig {
    /// Default configuration restricted to `flags`.
    #[must_use]
    pub fn with_modification_flags(mut self, flags: ModificationFlags) -> Self {
        self.modification_flags = flags;
        self
    }

    /// Default configuration restricted to `flags`.
    #[must_use]
    pub fn with_visibility_flags(mut self, flags: VisibilityFlags) -> Self {
        self.visibility_flags = flags;
        self
    }

    /// Report `uri` from the store.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }
}
