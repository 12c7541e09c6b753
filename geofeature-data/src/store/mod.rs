//! Feature store whose content is loaded from files.
//!
//! [`FileFeatureDataStore`] parses files through registered
//! [`FeatureDataSource`]s into an in-memory [`RuntimeFeatureDataStore`] and
//! remembers which feature sets came from which file. Each file's currency
//! (source name, parse version, length and modification time) is recorded at
//! load time; [`FileFeatureDataStore::refresh_files`] reloads files whose
//! currency no longer matches and drops files that disappeared.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use geofeature_core::{
    ChangeListener, Feature, FeatureCursor, FeatureDataStore, FeatureDefinition, FeatureId,
    FeatureQueryParameters, FeatureSet, FeatureSetCursor, FeatureSetDefinition, FeatureSetId,
    FeatureSetQueryParameters, FeatureSetUpdate, FeatureUpdate, ListenerId, ModificationFlags,
    StoreError, VisibilityFlags,
};
use geofeature_fs::FileStamp;
use geofeature_runtime::{RuntimeFeatureDataStore, RuntimeStoreConfig};
use thiserror::Error;

use crate::geojson::GeoJsonSource;
use crate::source::{DataSourceError, FeatureDataSource, ParsedFeatureSet};

/// URI reported by file stores built without an explicit one.
pub const DEFAULT_FILE_STORE_URI: &str = "file://geofeature";

/// Mutations a file store permits. Content comes from files, so callers may
/// only delete feature sets and group changes in bulk.
pub const FILE_STORE_MODIFICATIONS: ModificationFlags =
    ModificationFlags::FEATURESET_DELETE.union(ModificationFlags::BULK_MODIFICATIONS);

/// Errors raised while adding a file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FileStoreError {
    /// The file is already loaded.
    #[error("{path} is already loaded")]
    AlreadyLoaded {
        /// Offending file.
        path: Utf8PathBuf,
    },
    /// No registered source supports the file.
    #[error("no feature data source supports {path}")]
    NoSource {
        /// Offending file.
        path: Utf8PathBuf,
    },
    /// The file's metadata could not be read.
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        /// Offending file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The source failed to parse the file.
    #[error(transparent)]
    Source(#[from] DataSourceError),
    /// The backing store refused the parsed content.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of [`FileFeatureDataStore::refresh_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Files whose content was reloaded.
    pub reloaded: Vec<Utf8PathBuf>,
    /// Files dropped because they vanished or no longer parse.
    pub removed: Vec<Utf8PathBuf>,
}

impl RefreshReport {
    /// Whether the pass left every file untouched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Currency {
    source: String,
    parse_version: u32,
    stamp: FileStamp,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    currency: Currency,
    sets: Vec<FeatureSetId>,
}

#[derive(Debug, Default)]
struct Catalog {
    files: BTreeMap<Utf8PathBuf, CatalogEntry>,
    owners: BTreeMap<FeatureSetId, Utf8PathBuf>,
}

impl Catalog {
    fn record(&mut self, path: Utf8PathBuf, entry: CatalogEntry) {
        for id in &entry.sets {
            self.owners.insert(*id, path.clone());
        }
        self.files.insert(path, entry);
    }

    fn forget(&mut self, path: &Utf8Path) -> Option<CatalogEntry> {
        let entry = self.files.remove(path)?;
        for id in &entry.sets {
            self.owners.remove(id);
        }
        Some(entry)
    }

    /// Drop one set; a file left without sets is dropped too.
    fn forget_set(&mut self, id: FeatureSetId) {
        let Some(path) = self.owners.remove(&id) else {
            return;
        };
        let emptied = self.files.get_mut(&path).is_some_and(|entry| {
            entry.sets.retain(|set| *set != id);
            entry.sets.is_empty()
        });
        if emptied {
            self.files.remove(&path);
        }
    }

    fn clear(&mut self) {
        self.files.clear();
        self.owners.clear();
    }
}

/// In-memory feature store populated from files.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use geofeature_core::{FeatureDataStore, FeatureQueryParameters};
/// use geofeature_data::{FileFeatureDataStore, FileStoreError};
///
/// # fn main() -> Result<(), FileStoreError> {
/// let store = FileFeatureDataStore::geojson();
/// store.add_file(Utf8Path::new("harbours.geojson"))?;
/// let count = store.query_features_count(&FeatureQueryParameters::new())?;
/// println!("{count} features loaded");
/// # Ok(())
/// # }
/// ```
pub struct FileFeatureDataStore {
    inner: RuntimeFeatureDataStore,
    sources: Vec<Arc<dyn FeatureDataSource>>,
    catalog: Mutex<Catalog>,
}

impl fmt::Debug for FileFeatureDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|source| source.name()).collect();
        f.debug_struct("FileFeatureDataStore")
            .field("inner", &self.inner)
            .field("sources", &sources)
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl FileFeatureDataStore {
    /// Store that parses files with `sources`, trying them in order.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn FeatureDataSource>>) -> Self {
        Self::with_uri(sources, DEFAULT_FILE_STORE_URI)
    }

    /// Store reporting `uri` from [`FeatureDataStore::uri`].
    #[must_use]
    pub fn with_uri(sources: Vec<Arc<dyn FeatureDataSource>>, uri: impl Into<String>) -> Self {
        Self {
            inner: RuntimeFeatureDataStore::with_config(RuntimeStoreConfig::default().with_uri(uri)),
            sources,
            catalog: Mutex::new(Catalog::default()),
        }
    }

    /// Store that reads GeoJSON files.
    #[must_use]
    pub fn geojson() -> Self {
        Self::new(vec![Arc::new(GeoJsonSource)])
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn source_for(&self, path: &Utf8Path) -> Option<&Arc<dyn FeatureDataSource>> {
        self.sources.iter().find(|source| source.supports(path))
    }

    fn source_named(&self, name: &str) -> Option<&Arc<dyn FeatureDataSource>> {
        self.sources.iter().find(|source| source.name() == name)
    }

    /// Parse `path` and add its feature sets.
    ///
    /// Returns whether the file contributed any feature.
    ///
    /// # Errors
    ///
    /// [`FileStoreError`] when the file is already loaded, no source supports
    /// it, it cannot be read or parsed, or the store refuses the content.
    pub fn add_file(&self, path: &Utf8Path) -> Result<bool, FileStoreError> {
        if self.contains_file(path) {
            return Err(FileStoreError::AlreadyLoaded {
                path: path.to_owned(),
            });
        }
        let source = self
            .source_for(path)
            .ok_or_else(|| FileStoreError::NoSource {
                path: path.to_owned(),
            })?;
        let stamp = geofeature_fs::file_stamp(path).map_err(|err| FileStoreError::Inspect {
            path: path.to_owned(),
            source: err,
        })?;
        let parsed = source.parse(path)?;

        let _lock = self.inner.acquire_modify_lock(true)?;
        if self.contains_file(path) {
            return Err(FileStoreError::AlreadyLoaded {
                path: path.to_owned(),
            });
        }
        let (sets, feature_count) = self.load(parsed)?;
        log::debug!(
            "loaded {feature_count} features in {} sets from {path}",
            sets.len()
        );
        let currency = Currency {
            source: source.name().to_owned(),
            parse_version: source.parse_version(),
            stamp,
        };
        self.catalog()
            .record(path.to_owned(), CatalogEntry { currency, sets });
        Ok(feature_count > 0)
    }

    /// Insert parsed sets, undoing the partial load on failure.
    fn load(
        &self,
        parsed: Vec<ParsedFeatureSet>,
    ) -> Result<(Vec<FeatureSetId>, usize), StoreError> {
        let mut sets = Vec::with_capacity(parsed.len());
        let mut feature_count = 0_usize;
        let outcome = parsed.into_iter().try_for_each(|set| {
            let definition = FeatureSetDefinition::new(set.provider, set.kind, set.name)
                .with_thresholds(set.thresholds);
            let record = self.inner.insert_feature_set(definition)?;
            sets.push(record.id);
            for feature in set.features {
                self.inner.insert_feature(record.id, feature)?;
                feature_count += 1;
            }
            Ok(())
        });
        match outcome {
            Ok(()) => Ok((sets, feature_count)),
            Err(err) => {
                for id in sets {
                    if let Err(cleanup) = self.inner.delete_feature_set(id) {
                        log::warn!("failed to undo partial load of set {id}: {cleanup}");
                    }
                }
                Err(err)
            }
        }
    }

    /// Remove a file and every feature set loaded from it.
    ///
    /// Returns `false` when the file was not loaded.
    ///
    /// # Errors
    ///
    /// [`StoreError`] when the store refuses the deletion.
    pub fn remove_file(&self, path: &Utf8Path) -> Result<bool, StoreError> {
        let _lock = self.inner.acquire_modify_lock(true)?;
        let Some(entry) = self.catalog().forget(path) else {
            return Ok(false);
        };
        for id in entry.sets {
            self.inner.delete_feature_set(id)?;
        }
        log::debug!("removed {path}");
        Ok(true)
    }

    /// Whether `path` is loaded.
    #[must_use]
    pub fn contains_file(&self, path: &Utf8Path) -> bool {
        self.catalog().files.contains_key(path)
    }

    /// Every loaded file, in path order.
    #[must_use]
    pub fn files(&self) -> Vec<Utf8PathBuf> {
        self.catalog().files.keys().cloned().collect()
    }

    /// Feature sets loaded from `path`, empty when it is not loaded.
    #[must_use]
    pub fn feature_set_ids_for_file(&self, path: &Utf8Path) -> Vec<FeatureSetId> {
        self.catalog()
            .files
            .get(path)
            .map(|entry| entry.sets.clone())
            .unwrap_or_default()
    }

    /// File a feature set was loaded from.
    #[must_use]
    pub fn file_for_feature_set(&self, id: FeatureSetId) -> Option<Utf8PathBuf> {
        self.catalog().owners.get(&id).cloned()
    }

    /// Whether the loaded content of `path` still reflects the file: the
    /// same source at the same parse version would read the same bytes.
    /// Files that are not loaded, or can no longer be inspected, are not
    /// current.
    #[must_use]
    pub fn is_current(&self, path: &Utf8Path) -> bool {
        let Some(recorded) = self
            .catalog()
            .files
            .get(path)
            .map(|entry| entry.currency.clone())
        else {
            return false;
        };
        let Some(source) = self.source_named(&recorded.source) else {
            return false;
        };
        if source.parse_version() != recorded.parse_version {
            return false;
        }
        geofeature_fs::file_stamp(path).is_ok_and(|stamp| stamp == recorded.stamp)
    }

    /// Reload stale files and drop vanished ones. A pass that touches any
    /// file reports one content change; a pass over current files reports
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError`] when the store refuses a deletion. Files that fail to
    /// reload are logged and reported as removed.
    pub fn refresh_files(&self) -> Result<RefreshReport, StoreError> {
        let _lock = self.inner.acquire_modify_lock(true)?;
        let mut report = RefreshReport::default();
        for path in self.files() {
            if self.is_current(&path) {
                continue;
            }
            self.remove_file(&path)?;
            let still_present = geofeature_fs::file_is_file(&path).unwrap_or(false);
            if !still_present {
                log::debug!("{path} vanished; dropping its content");
                report.removed.push(path);
                continue;
            }
            match self.add_file(&path) {
                Ok(_) => report.reloaded.push(path),
                Err(err) => {
                    log::warn!("failed to reload {path}: {err}");
                    report.removed.push(path);
                }
            }
        }
        if !report.is_empty() {
            self.inner.refresh()?;
        }
        Ok(report)
    }

    fn refuse<T>(operation: &'static str) -> Result<T, StoreError> {
        Err(StoreError::UnsupportedOperation { operation })
    }
}

impl FeatureDataStore for FileFeatureDataStore {
    fn modification_flags(&self) -> ModificationFlags {
        FILE_STORE_MODIFICATIONS
    }

    fn visibility_flags(&self) -> VisibilityFlags {
        self.inner.visibility_flags()
    }

    fn uri(&self) -> &str {
        self.inner.uri()
    }

    fn insert_feature_set(
        &self,
        _definition: FeatureSetDefinition,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        Self::refuse("insert_feature_set")
    }

    fn update_feature_set(
        &self,
        _id: FeatureSetId,
        _update: FeatureSetUpdate,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        Self::refuse("update_feature_set")
    }

    fn delete_feature_set(&self, id: FeatureSetId) -> Result<(), StoreError> {
        let _lock = self.inner.acquire_modify_lock(true)?;
        self.inner.delete_feature_set(id)?;
        self.catalog().forget_set(id);
        Ok(())
    }

    fn delete_all_feature_sets(&self) -> Result<(), StoreError> {
        let _lock = self.inner.acquire_modify_lock(true)?;
        self.inner.delete_all_feature_sets()?;
        self.catalog().clear();
        Ok(())
    }

    fn insert_feature(
        &self,
        _feature_set: FeatureSetId,
        _definition: FeatureDefinition,
    ) -> Result<Arc<Feature>, StoreError> {
        Self::refuse("insert_feature")
    }

    fn update_feature(
        &self,
        _id: FeatureId,
        _update: FeatureUpdate,
    ) -> Result<Arc<Feature>, StoreError> {
        Self::refuse("update_feature")
    }

    fn delete_feature(&self, _id: FeatureId) -> Result<(), StoreError> {
        Self::refuse("delete_feature")
    }

    fn delete_all_features(&self, _feature_set: FeatureSetId) -> Result<(), StoreError> {
        Self::refuse("delete_all_features")
    }

    fn get_feature(&self, id: FeatureId) -> Result<Option<Arc<Feature>>, StoreError> {
        self.inner.get_feature(id)
    }

    fn get_feature_set(&self, id: FeatureSetId) -> Result<Option<Arc<FeatureSet>>, StoreError> {
        self.inner.get_feature_set(id)
    }

    fn query_features(&self, params: &FeatureQueryParameters) -> Result<FeatureCursor, StoreError> {
        self.inner.query_features(params)
    }

    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize, StoreError> {
        self.inner.query_features_count(params)
    }

    fn query_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<FeatureSetCursor, StoreError> {
        self.inner.query_feature_sets(params)
    }

    fn query_feature_sets_count(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<usize, StoreError> {
        self.inner.query_feature_sets_count(params)
    }

    fn set_feature_visible(&self, id: FeatureId, visible: bool) -> Result<(), StoreError> {
        self.inner.set_feature_visible(id, visible)
    }

    fn set_features_visible(
        &self,
        params: &FeatureQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError> {
        self.inner.set_features_visible(params, visible)
    }

    fn is_feature_visible(&self, id: FeatureId) -> Result<bool, StoreError> {
        self.inner.is_feature_visible(id)
    }

    fn set_feature_set_visible(&self, id: FeatureSetId, visible: bool) -> Result<(), StoreError> {
        self.inner.set_feature_set_visible(id, visible)
    }

    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<(), StoreError> {
        self.inner.set_feature_sets_visible(params, visible)
    }

    fn is_feature_set_visible(&self, id: FeatureSetId) -> Result<bool, StoreError> {
        self.inner.is_feature_set_visible(id)
    }

    fn begin_bulk_modification(&self) -> Result<(), StoreError> {
        self.inner.begin_bulk_modification()
    }

    fn end_bulk_modification(&self, successful: bool) -> Result<(), StoreError> {
        self.inner.end_bulk_modification(successful)
    }

    fn is_in_bulk_modification(&self) -> bool {
        self.inner.is_in_bulk_modification()
    }

    fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.inner.add_change_listener(listener)
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.inner.remove_change_listener(id)
    }

    fn time_bounds(&self) -> Result<Option<(i64, i64)>, StoreError> {
        self.inner.time_bounds()
    }

    fn refresh(&self) -> Result<(), StoreError> {
        self.refresh_files().map(|_| ())
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn dispose(&self) {
        self.inner.dispose();
        self.catalog().clear();
    }
}
