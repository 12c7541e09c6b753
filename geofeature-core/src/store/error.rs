use thiserror::Error;

use crate::{FeatureId, FeatureSetId};

/// Errors from [`crate::FeatureDataStore`] operations.
///
/// Capability and record checks run before any index is touched, so an error
/// always means the store is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store does not advertise the capability the operation needs.
    #[error("{operation} is not supported by this data store")]
    UnsupportedOperation {
        /// Name of the refused operation.
        operation: &'static str,
    },
    /// No feature has the given id.
    #[error("no feature with id {0}")]
    NoSuchFeature(FeatureId),
    /// No feature set has the given id.
    #[error("no feature set with id {0}")]
    NoSuchFeatureSet(FeatureSetId),
    /// An argument was malformed or conflicts with existing records.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },
    /// The store or cursor cannot serve the call in its current state.
    #[error("illegal state: {reason}")]
    IllegalState {
        /// What was wrong.
        reason: &'static str,
    },
    /// Waiting for the modify lock was abandoned; nothing was changed.
    #[error("interrupted while waiting for the modify lock")]
    Interrupted,
}
