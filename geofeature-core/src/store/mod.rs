//! The data-store contract shared by the in-memory engine and the
//! file-backed variant.
//!
//! [`FeatureDataStore`] covers record insertion, update and deletion, queries
//! through [`FeatureQueryParameters`] and [`FeatureSetQueryParameters`],
//! visibility control, bulk modification and change listeners. Every mutating
//! operation is gated by the store's advertised [`ModificationFlags`] or
//! [`VisibilityFlags`].

use std::sync::Arc;

use crate::{
    ChangeListener, Feature, FeatureCursor, FeatureDefinition, FeatureId, FeatureQueryParameters,
    FeatureSet, FeatureSetCursor, FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters,
    FeatureSetUpdate, FeatureUpdate, ListenerId, ModificationFlags, VisibilityFlags,
};

mod error;

pub use error::StoreError;

/// A thread-safe store of features grouped into feature sets.
///
/// # Examples
///
/// ```rust
/// use geofeature_core::{FeatureDataStore, FeatureQueryParameters, StoreError};
///
/// fn visible_names(store: &dyn FeatureDataStore) -> Result<Vec<String>, StoreError> {
///     let params = FeatureQueryParameters::new().visible_only();
///     Ok(store
///         .query_features(&params)?
///         .map(|feature| feature.name.clone())
///         .collect())
/// }
/// ```
pub trait FeatureDataStore: Send + Sync {
    /// Mutations this store permits.
    fn modification_flags(&self) -> ModificationFlags;

    /// Visibility granularities this store lets callers control.
    fn visibility_flags(&self) -> VisibilityFlags;

    /// Location identifying the store's content.
    fn uri(&self) -> &str;

    /// Insert a feature set, assigning an id when none is given.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`ModificationFlags::FEATURESET_INSERT`];
    /// `InvalidArgument` for a duplicate explicit id.
    fn insert_feature_set(
        &self,
        definition: FeatureSetDefinition,
    ) -> Result<Arc<FeatureSet>, StoreError>;

    /// Rename a feature set and/or change its display thresholds.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` when a needed flag is missing; `NoSuchFeatureSet`.
    fn update_feature_set(
        &self,
        id: FeatureSetId,
        update: FeatureSetUpdate,
    ) -> Result<Arc<FeatureSet>, StoreError>;

    /// Delete a feature set and every feature in it.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation`; `NoSuchFeatureSet`.
    fn delete_feature_set(&self, id: FeatureSetId) -> Result<(), StoreError>;

    /// Delete every feature set and feature.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`ModificationFlags::FEATURESET_DELETE`].
    fn delete_all_feature_sets(&self) -> Result<(), StoreError>;

    /// Insert a feature into an existing set.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation`; `NoSuchFeatureSet`; `InvalidArgument` for a
    /// duplicate explicit id.
    fn insert_feature(
        &self,
        feature_set: FeatureSetId,
        definition: FeatureDefinition,
    ) -> Result<Arc<Feature>, StoreError>;

    /// Apply a targeted update, bumping the version by one.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` when a flag for a touched property is missing;
    /// `NoSuchFeature`.
    fn update_feature(&self, id: FeatureId, update: FeatureUpdate)
    -> Result<Arc<Feature>, StoreError>;

    /// Delete one feature.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation`; `NoSuchFeature`.
    fn delete_feature(&self, id: FeatureId) -> Result<(), StoreError>;

    /// Delete every feature of a set, keeping the set.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation`; `NoSuchFeatureSet`.
    fn delete_all_features(&self, feature_set: FeatureSetId) -> Result<(), StoreError>;

    /// Look a feature up by id.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn get_feature(&self, id: FeatureId) -> Result<Option<Arc<Feature>>, StoreError>;

    /// Look a feature set up by id.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn get_feature_set(&self, id: FeatureSetId) -> Result<Option<Arc<FeatureSet>>, StoreError>;

    /// Stream the features matching `params`.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn query_features(&self, params: &FeatureQueryParameters)
    -> Result<FeatureCursor, StoreError>;

    /// Count the features matching `params`, honouring limit and offset.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize, StoreError>;

    /// Stream the feature sets matching `params`.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn query_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<FeatureSetCursor, StoreError>;

    /// Count the feature sets matching `params`, honouring limit and offset.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn query_feature_sets_count(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<usize, StoreError>;

    /// Set one feature's visibility.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`VisibilityFlags::FEATURE`];
    /// `NoSuchFeature`.
    fn set_feature_visible(&self, id: FeatureId, visible: bool) -> Result<(), StoreError>;

    /// Set the visibility of every feature matching `params`.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`VisibilityFlags::FEATURE`].
    fn set_features_visible(
        &self,
        params: &FeatureQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError>;

    /// Effective visibility of a feature.
    ///
    /// # Errors
    ///
    /// `NoSuchFeature`.
    fn is_feature_visible(&self, id: FeatureId) -> Result<bool, StoreError>;

    /// Set a feature set's default visibility, clearing per-feature overrides.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`VisibilityFlags::FEATURESET`];
    /// `NoSuchFeatureSet`.
    fn set_feature_set_visible(&self, id: FeatureSetId, visible: bool) -> Result<(), StoreError>;

    /// Set the visibility of every feature set matching `params`.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`VisibilityFlags::FEATURESET`].
    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError>;

    /// Whether a feature set has at least one visible feature.
    ///
    /// # Errors
    ///
    /// `NoSuchFeatureSet`.
    fn is_feature_set_visible(&self, id: FeatureSetId) -> Result<bool, StoreError>;

    /// Start a bulk modification on the calling thread.
    ///
    /// The modify lock stays held until the matching
    /// [`FeatureDataStore::end_bulk_modification`]; per-operation
    /// notifications are replaced by one `ContentChanged` at the end.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` without [`ModificationFlags::BULK_MODIFICATIONS`].
    fn begin_bulk_modification(&self) -> Result<(), StoreError>;

    /// End the innermost bulk modification begun on the calling thread.
    ///
    /// Changes are kept whether or not `successful` is set.
    ///
    /// # Errors
    ///
    /// `IllegalState` when the calling thread holds no bulk modification.
    fn end_bulk_modification(&self, successful: bool) -> Result<(), StoreError>;

    /// Whether a bulk modification is in progress.
    fn is_in_bulk_modification(&self) -> bool;

    /// Register a listener.
    fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId;

    /// Unregister a listener, returning whether it was registered.
    fn remove_change_listener(&self, id: ListenerId) -> bool;

    /// Earliest and latest feature timestamps, if any feature has one.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn time_bounds(&self) -> Result<Option<(i64, i64)>, StoreError>;

    /// Re-read backing content, if any, and notify listeners.
    ///
    /// # Errors
    ///
    /// `IllegalState` once disposed.
    fn refresh(&self) -> Result<(), StoreError>;

    /// Whether the store can still serve calls.
    fn is_available(&self) -> bool;

    /// Release all content; later calls fail with `IllegalState`.
    fn dispose(&self);

    /// Run `f` inside a bulk modification that always ends, including when
    /// `f` fails or panics.
    ///
    /// # Errors
    ///
    /// Errors from `begin_bulk_modification`, from `f`, or from ending the
    /// bulk modification.
    fn bulk_modification<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<R, StoreError>,
    {
        self.begin_bulk_modification()?;
        let mut scope = BulkScope {
            store: self,
            open: true,
        };
        let outcome = f(self);
        scope.open = false;
        self.end_bulk_modification(outcome.is_ok())?;
        outcome
    }
}

struct BulkScope<'a, S: FeatureDataStore> {
    store: &'a S,
    open: bool,
}

impl<S: FeatureDataStore> Drop for BulkScope<'_, S> {
    fn drop(&mut self) {
        if self.open {
            // Only reached while unwinding out of the closure.
            let _ended = self.store.end_bulk_modification(false);
        }
    }
}
