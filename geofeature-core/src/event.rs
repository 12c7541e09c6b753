//! Change notifications delivered to registered listeners.

use crate::{FeatureDefinition, FeatureId, FeatureProperties, FeatureUpdate};

/// A change to a data store's content.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Coarse notification: anything may have changed.
    ContentChanged,
    /// A feature was inserted.
    FeatureInserted {
        /// Id of the new feature.
        id: FeatureId,
        /// Content the feature was created from.
        definition: FeatureDefinition,
        /// Version of the new feature.
        version: u64,
    },
    /// A feature was updated.
    FeatureUpdated {
        /// Id of the updated feature.
        id: FeatureId,
        /// Properties that changed.
        properties: FeatureProperties,
        /// New values of the changed properties.
        update: FeatureUpdate,
    },
    /// A feature was deleted.
    FeatureDeleted {
        /// Id of the removed feature.
        id: FeatureId,
    },
    /// A feature's effective visibility was set.
    FeatureVisibilityChanged {
        /// Id of the feature.
        id: FeatureId,
        /// New effective visibility.
        visible: bool,
    },
}

/// Receives change notifications from a data store.
///
/// Delivery is synchronous on the mutating thread. Listeners may call back
/// into the store.
pub trait ChangeListener: Send + Sync {
    /// Handle one change.
    fn on_change(&self, event: &ChangeEvent);
}

/// Handle returned when registering a listener, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);
