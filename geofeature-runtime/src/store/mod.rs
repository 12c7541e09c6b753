//! The in-memory [`FeatureDataStore`] engine.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use geofeature_core::{
    ChangeEvent, ChangeListener, Feature, FeatureCursor, FeatureDataStore, FeatureDefinition,
    FeatureId, FeatureQueryParameters, FeatureSet, FeatureSetCursor, FeatureSetDefinition,
    FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate, FeatureUpdate, ListenerId,
    ModificationFlags, StoreError, VisibilityFlags,
};

use crate::config::RuntimeStoreConfig;
use crate::gate::{ModifyGate, Release};
use crate::index::FeatureIndexes;
use crate::listeners::ListenerRegistry;
use crate::query::{self, QueryPlan};

/// Thread-safe in-memory feature store.
///
/// Every call takes the store's re-entrant modify lock, so a listener may
/// call back into the store from inside a notification.
///
/// # Examples
///
/// ```
/// use geofeature_core::{
///     FeatureDataStore, FeatureDefinition, FeatureQueryParameters, FeatureSetDefinition,
///     Geometry,
/// };
/// use geofeature_runtime::RuntimeFeatureDataStore;
///
/// # fn main() -> Result<(), geofeature_core::StoreError> {
/// let store = RuntimeFeatureDataStore::new();
/// let set = store.insert_feature_set(FeatureSetDefinition::new("src", "pts", "Set1"))?;
/// store.insert_feature(set.id, FeatureDefinition::new("A", Geometry::point(1.0, 1.0)))?;
///
/// let params = FeatureQueryParameters::new().with_names(["a"]);
/// assert_eq!(store.query_features_count(&params)?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RuntimeFeatureDataStore {
    config: RuntimeStoreConfig,
    gate: ModifyGate,
    indexes: Mutex<FeatureIndexes>,
    listeners: ListenerRegistry,
    disposed: AtomicBool,
}

/// Scoped hold on a store's modify lock.
///
/// The lock is re-entrant for the holding thread and released when the last
/// guard drops. A guard taken in bulk mode suppresses per-operation
/// notifications until it drops, then reports one
/// [`ChangeEvent::ContentChanged`] if anything changed.
#[derive(Debug)]
#[must_use = "the modify lock is released when the guard is dropped"]
pub struct ModifyLock<'a> {
    store: &'a RuntimeFeatureDataStore,
    bulk: bool,
    // Release must happen on the acquiring thread.
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ModifyLock<'_> {
    fn drop(&mut self) {
        match self.store.gate.exit(self.bulk) {
            Ok(release) => self.store.flush(release),
            Err(err) => log::warn!("releasing the modify lock failed: {err}"),
        }
    }
}

impl Default for RuntimeFeatureDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeFeatureDataStore {
    /// Store with every capability enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeStoreConfig::default())
    }

    /// Store with explicit configuration.
    #[must_use]
    pub fn with_config(config: RuntimeStoreConfig) -> Self {
        let indexes = FeatureIndexes::new(config.node_capacity, config.max_depth);
        Self {
            config,
            gate: ModifyGate::default(),
            indexes: Mutex::new(indexes),
            listeners: ListenerRegistry::default(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Configuration the store was built with.
    #[must_use]
    pub const fn config(&self) -> &RuntimeStoreConfig {
        &self.config
    }

    /// Take the modify lock, waiting as long as needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::IllegalState`] once disposed.
    pub fn acquire_modify_lock(&self, bulk: bool) -> Result<ModifyLock<'_>, StoreError> {
        self.acquire(bulk, None)
    }

    /// Take the modify lock, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Interrupted`] when another thread kept the lock for the
    /// whole timeout; [`StoreError::IllegalState`] once disposed.
    pub fn acquire_modify_lock_timeout(
        &self,
        bulk: bool,
        timeout: Duration,
    ) -> Result<ModifyLock<'_>, StoreError> {
        self.acquire(bulk, Some(timeout))
    }

    /// Plan a feature query without running it.
    ///
    /// # Errors
    ///
    /// [`StoreError::IllegalState`] once disposed.
    pub fn explain(&self, params: &FeatureQueryParameters) -> Result<QueryPlan, StoreError> {
        self.read(|indexes| query::plan_features(indexes, params))
    }

    /// Plan a feature-set query without running it.
    ///
    /// # Errors
    ///
    /// [`StoreError::IllegalState`] once disposed.
    pub fn explain_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<QueryPlan, StoreError> {
        self.read(|indexes| query::plan_feature_sets(indexes, params))
    }

    fn acquire(&self, bulk: bool, timeout: Option<Duration>) -> Result<ModifyLock<'_>, StoreError> {
        self.ensure_available()?;
        self.gate.enter(bulk, timeout)?;
        Ok(ModifyLock {
            store: self,
            bulk,
            _thread_bound: PhantomData,
        })
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(StoreError::IllegalState {
                reason: "the data store has been disposed",
            });
        }
        Ok(())
    }

    fn require(&self, needed: ModificationFlags, operation: &'static str) -> Result<(), StoreError> {
        if self.config.modification_flags.contains(needed) {
            Ok(())
        } else {
            Err(StoreError::UnsupportedOperation { operation })
        }
    }

    fn require_visibility(
        &self,
        needed: VisibilityFlags,
        operation: &'static str,
    ) -> Result<(), StoreError> {
        if self.config.visibility_flags.contains(needed) {
            Ok(())
        } else {
            Err(StoreError::UnsupportedOperation { operation })
        }
    }

    fn indexes(&self) -> MutexGuard<'_, FeatureIndexes> {
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&FeatureIndexes) -> R) -> Result<R, StoreError> {
        let _lock = self.acquire(false, None)?;
        let indexes = self.indexes();
        Ok(f(&indexes))
    }

    /// Deliver the event built by `event` unless a bulk modification is
    /// suppressing notifications.
    fn notify(&self, event: impl FnOnce() -> ChangeEvent) {
        if self.gate.suppress() || self.listeners.is_empty() {
            return;
        }
        self.listeners.dispatch(&event());
    }

    fn flush(&self, release: Release) {
        if release == Release::FlushContentChanged {
            self.listeners.dispatch(&ChangeEvent::ContentChanged);
        }
    }
}

fn definition_of(feature: &Feature) -> FeatureDefinition {
    FeatureDefinition {
        id: Some(feature.id),
        name: feature.name.clone(),
        geometry: feature.geometry.clone(),
        style: feature.style.clone(),
        attributes: feature.attributes.clone(),
        timestamp: feature.timestamp,
    }
}

impl FeatureDataStore for RuntimeFeatureDataStore {
    fn modification_flags(&self) -> ModificationFlags {
        self.config.modification_flags
    }

    fn visibility_flags(&self) -> VisibilityFlags {
        self.config.visibility_flags
    }

    fn uri(&self) -> &str {
        &self.config.uri
    }

    fn insert_feature_set(
        &self,
        definition: FeatureSetDefinition,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        self.ensure_available()?;
        self.require(ModificationFlags::FEATURESET_INSERT, "insert_feature_set")?;
        let _lock = self.acquire_modify_lock(false)?;
        let set = self.indexes().insert_set(definition)?;
        log::debug!("inserted feature set {} ({})", set.id, set.name);
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(set)
    }

    fn update_feature_set(
        &self,
        id: FeatureSetId,
        update: FeatureSetUpdate,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        self.ensure_available()?;
        let mut needed = ModificationFlags::FEATURESET_UPDATE;
        if update.name.is_some() {
            needed |= ModificationFlags::FEATURESET_NAME;
        }
        if update.thresholds.is_some() {
            needed |= ModificationFlags::FEATURESET_DISPLAY_THRESHOLDS;
        }
        self.require(needed, "update_feature_set")?;
        let _lock = self.acquire_modify_lock(false)?;
        let set = self.indexes().update_set(id, update)?;
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(set)
    }

    fn delete_feature_set(&self, id: FeatureSetId) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require(ModificationFlags::FEATURESET_DELETE, "delete_feature_set")?;
        let _lock = self.acquire_modify_lock(true)?;
        let removed = self.indexes().remove_set(id)?;
        log::debug!("deleted feature set {id} with {} features", removed.len());
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(())
    }

    fn delete_all_feature_sets(&self) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require(
            ModificationFlags::FEATURESET_DELETE,
            "delete_all_feature_sets",
        )?;
        let _lock = self.acquire_modify_lock(true)?;
        self.indexes().clear();
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(())
    }

    fn insert_feature(
        &self,
        feature_set: FeatureSetId,
        definition: FeatureDefinition,
    ) -> Result<Arc<Feature>, StoreError> {
        self.ensure_available()?;
        self.require(ModificationFlags::FEATURE_INSERT, "insert_feature")?;
        let _lock = self.acquire_modify_lock(false)?;
        let feature = self.indexes().insert_feature(feature_set, definition)?;
        self.notify(|| ChangeEvent::FeatureInserted {
            id: feature.id,
            definition: definition_of(&feature),
            version: feature.version,
        });
        Ok(feature)
    }

    fn update_feature(
        &self,
        id: FeatureId,
        update: FeatureUpdate,
    ) -> Result<Arc<Feature>, StoreError> {
        self.ensure_available()?;
        let properties = update.properties();
        self.require(properties.required_modifications(), "update_feature")?;
        let _lock = self.acquire_modify_lock(false)?;
        let feature = self.indexes().update_feature(id, &update)?;
        self.notify(|| ChangeEvent::FeatureUpdated {
            id,
            properties,
            update,
        });
        Ok(feature)
    }

    fn delete_feature(&self, id: FeatureId) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require(ModificationFlags::FEATURE_DELETE, "delete_feature")?;
        let _lock = self.acquire_modify_lock(false)?;
        self.indexes().remove_feature(id)?;
        self.notify(|| ChangeEvent::FeatureDeleted { id });
        Ok(())
    }

    fn delete_all_features(&self, feature_set: FeatureSetId) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require(ModificationFlags::FEATURE_DELETE, "delete_all_features")?;
        let _lock = self.acquire_modify_lock(true)?;
        let removed = self.indexes().remove_members(feature_set)?;
        log::debug!("deleted {} features of set {feature_set}", removed.len());
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(())
    }

    fn get_feature(&self, id: FeatureId) -> Result<Option<Arc<Feature>>, StoreError> {
        self.read(|indexes| indexes.feature(id).map(|entry| Arc::clone(&entry.record)))
    }

    fn get_feature_set(&self, id: FeatureSetId) -> Result<Option<Arc<FeatureSet>>, StoreError> {
        self.read(|indexes| indexes.set(id).map(|entry| Arc::clone(&entry.record)))
    }

    fn query_features(&self, params: &FeatureQueryParameters) -> Result<FeatureCursor, StoreError> {
        self.read(|indexes| query::select_features(indexes, params))
    }

    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize, StoreError> {
        Ok(self.query_features(params)?.count())
    }

    fn query_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<FeatureSetCursor, StoreError> {
        self.read(|indexes| query::select_feature_sets(indexes, params))
    }

    fn query_feature_sets_count(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<usize, StoreError> {
        Ok(self.query_feature_sets(params)?.count())
    }

    fn set_feature_visible(&self, id: FeatureId, visible: bool) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require_visibility(VisibilityFlags::FEATURE, "set_feature_visible")?;
        let _lock = self.acquire_modify_lock(false)?;
        let changed = self.indexes().set_feature_visible(id, visible)?;
        if changed {
            self.notify(|| ChangeEvent::FeatureVisibilityChanged { id, visible });
        }
        Ok(())
    }

    fn set_features_visible(
        &self,
        params: &FeatureQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require_visibility(VisibilityFlags::FEATURE, "set_features_visible")?;
        let _lock = self.acquire_modify_lock(true)?;
        let matched: Vec<FeatureId> = {
            let indexes = self.indexes();
            query::select_features(&indexes, params)
                .map(|feature| feature.id)
                .collect()
        };
        for id in matched {
            if self.indexes().set_feature_visible(id, visible)? {
                self.notify(|| ChangeEvent::FeatureVisibilityChanged { id, visible });
            }
        }
        Ok(())
    }

    fn is_feature_visible(&self, id: FeatureId) -> Result<bool, StoreError> {
        self.read(|indexes| indexes.is_feature_visible(id))?
    }

    fn set_feature_set_visible(&self, id: FeatureSetId, visible: bool) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require_visibility(VisibilityFlags::FEATURESET, "set_feature_set_visible")?;
        let _lock = self.acquire_modify_lock(false)?;
        if self.indexes().set_set_visible(id, visible)? {
            self.notify(|| ChangeEvent::ContentChanged);
        }
        Ok(())
    }

    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require_visibility(VisibilityFlags::FEATURESET, "set_feature_sets_visible")?;
        let _lock = self.acquire_modify_lock(true)?;
        let matched: Vec<FeatureSetId> = {
            let indexes = self.indexes();
            query::select_feature_sets(&indexes, params)
                .map(|set| set.id)
                .collect()
        };
        for id in matched {
            if self.indexes().set_set_visible(id, visible)? {
                self.notify(|| ChangeEvent::ContentChanged);
            }
        }
        Ok(())
    }

    fn is_feature_set_visible(&self, id: FeatureSetId) -> Result<bool, StoreError> {
        self.read(|indexes| indexes.is_set_visible(id))?
    }

    fn begin_bulk_modification(&self) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.require(
            ModificationFlags::BULK_MODIFICATIONS,
            "begin_bulk_modification",
        )?;
        self.gate.enter(true, None)?;
        log::debug!("bulk modification started");
        Ok(())
    }

    fn end_bulk_modification(&self, successful: bool) -> Result<(), StoreError> {
        let release = self.gate.exit(true)?;
        if !successful {
            log::warn!("bulk modification ended unsuccessfully; changes are kept");
        }
        log::debug!("bulk modification ended");
        self.flush(release);
        Ok(())
    }

    fn is_in_bulk_modification(&self) -> bool {
        self.gate.in_bulk()
    }

    fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn time_bounds(&self) -> Result<Option<(i64, i64)>, StoreError> {
        self.read(FeatureIndexes::time_bounds)
    }

    fn refresh(&self) -> Result<(), StoreError> {
        let _lock = self.acquire_modify_lock(false)?;
        self.notify(|| ChangeEvent::ContentChanged);
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        let Ok(lock) = self.acquire_modify_lock(false) else {
            return;
        };
        self.disposed.store(true, Ordering::Release);
        self.indexes().clear();
        self.listeners.clear();
        drop(lock);
        log::debug!("data store {} disposed", self.config.uri);
    }
}
