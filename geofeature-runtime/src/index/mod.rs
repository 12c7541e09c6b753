//! Record storage and the secondary indexes kept beside it.
//!
//! [`FeatureIndexes`] owns every record and keeps the id, name, geometry
//! class, set-name and spatial indexes consistent with them. Each mutating
//! method validates its inputs before touching any index, so an `Err` leaves
//! the indexes unchanged.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use geofeature_core::{
    Envelope, Feature, FeatureDefinition, FeatureId, FeatureSet, FeatureSetDefinition,
    FeatureSetId, FeatureSetUpdate, FeatureUpdate, GeometryClass, INITIAL_VERSION, StoreError,
};

use crate::quadtree::Quadtree;
use crate::visibility::VisibilityState;

/// A stored feature and its cached envelope.
#[derive(Debug, Clone)]
pub(crate) struct FeatureEntry {
    pub(crate) record: Arc<Feature>,
    pub(crate) envelope: Option<Envelope>,
}

/// A stored feature set, its members and their visibility.
#[derive(Debug, Clone)]
pub(crate) struct SetEntry {
    pub(crate) record: Arc<FeatureSet>,
    pub(crate) members: BTreeSet<FeatureId>,
    pub(crate) visibility: VisibilityState,
}

impl SetEntry {
    pub(crate) fn is_member_visible(&self, id: FeatureId) -> bool {
        self.visibility.is_feature_visible(id)
    }

    pub(crate) fn visible_count(&self) -> usize {
        self.visibility.visible_count(self.members.len())
    }

    pub(crate) fn visible_members(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.members
            .iter()
            .copied()
            .filter(|id| self.visibility.is_feature_visible(*id))
    }
}

/// Every record plus the indexes over them.
#[derive(Debug)]
pub(crate) struct FeatureIndexes {
    features: BTreeMap<FeatureId, FeatureEntry>,
    sets: BTreeMap<FeatureSetId, SetEntry>,
    names: HashMap<String, BTreeSet<FeatureId>>,
    geometry: BTreeMap<GeometryClass, BTreeSet<FeatureId>>,
    set_names: HashMap<String, BTreeSet<FeatureSetId>>,
    spatial: Quadtree<FeatureId>,
    timestamps: BTreeMap<i64, usize>,
    next_feature_id: u64,
    next_set_id: u64,
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn index_add<K, V>(index: &mut HashMap<String, BTreeSet<V>>, key: K, value: V)
where
    K: Into<String>,
    V: Ord,
{
    index.entry(key.into()).or_default().insert(value);
}

fn index_remove<V: Ord>(index: &mut HashMap<String, BTreeSet<V>>, key: &str, value: &V) {
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(value);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

impl FeatureIndexes {
    pub(crate) fn new(node_capacity: usize, max_depth: u32) -> Self {
        Self {
            features: BTreeMap::new(),
            sets: BTreeMap::new(),
            names: HashMap::new(),
            geometry: BTreeMap::new(),
            set_names: HashMap::new(),
            spatial: Quadtree::with_tuning(node_capacity, max_depth),
            timestamps: BTreeMap::new(),
            next_feature_id: 1,
            next_set_id: 1,
        }
    }

    pub(crate) fn feature(&self, id: FeatureId) -> Option<&FeatureEntry> {
        self.features.get(&id)
    }

    pub(crate) fn set(&self, id: FeatureSetId) -> Option<&SetEntry> {
        self.sets.get(&id)
    }

    pub(crate) fn features(&self) -> impl Iterator<Item = &FeatureEntry> + '_ {
        self.features.values()
    }

    pub(crate) fn sets(&self) -> impl Iterator<Item = &SetEntry> + '_ {
        self.sets.values()
    }

    pub(crate) fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub(crate) fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub(crate) const fn spatial(&self) -> &Quadtree<FeatureId> {
        &self.spatial
    }

    /// Features whose lowercased name is `key`.
    pub(crate) fn features_named(&self, key: &str) -> Option<&BTreeSet<FeatureId>> {
        self.names.get(key)
    }

    /// Feature sets whose lowercased name is `key`.
    pub(crate) fn sets_named(&self, key: &str) -> Option<&BTreeSet<FeatureSetId>> {
        self.set_names.get(key)
    }

    pub(crate) fn features_of_class(&self, class: GeometryClass) -> Option<&BTreeSet<FeatureId>> {
        self.geometry.get(&class)
    }

    /// Effective visibility of a stored feature.
    pub(crate) fn is_visible(&self, feature: &Feature) -> bool {
        self.sets
            .get(&feature.feature_set_id)
            .is_some_and(|set| set.is_member_visible(feature.id))
    }

    pub(crate) fn time_bounds(&self) -> Option<(i64, i64)> {
        let first = self.timestamps.keys().next()?;
        let last = self.timestamps.keys().next_back()?;
        Some((*first, *last))
    }

    pub(crate) fn insert_set(
        &mut self,
        definition: FeatureSetDefinition,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        let id = match definition.id {
            Some(id) if self.sets.contains_key(&id) => {
                return Err(StoreError::InvalidArgument {
                    reason: format!("feature set id {id} is already in use"),
                });
            }
            Some(id) => id,
            None => FeatureSetId(self.next_set_id),
        };
        self.next_set_id = self.next_set_id.max(id.0.saturating_add(1));

        let record = Arc::new(FeatureSet {
            id,
            provider: definition.provider,
            kind: definition.kind,
            name: definition.name,
            thresholds: definition.thresholds,
            version: definition.version.unwrap_or(INITIAL_VERSION),
        });
        index_add(&mut self.set_names, name_key(&record.name), id);
        self.sets.insert(
            id,
            SetEntry {
                record: Arc::clone(&record),
                members: BTreeSet::new(),
                visibility: VisibilityState::default(),
            },
        );
        Ok(record)
    }

    pub(crate) fn update_set(
        &mut self,
        id: FeatureSetId,
        update: FeatureSetUpdate,
    ) -> Result<Arc<FeatureSet>, StoreError> {
        let entry = self
            .sets
            .get_mut(&id)
            .ok_or(StoreError::NoSuchFeatureSet(id))?;
        let mut next = FeatureSet::clone(&entry.record);
        if let Some(name) = update.name {
            index_remove(&mut self.set_names, &name_key(&next.name), &id);
            index_add(&mut self.set_names, name_key(&name), id);
            next.name = name;
        }
        if let Some(thresholds) = update.thresholds {
            next.thresholds = thresholds;
        }
        next.version = next.version.saturating_add(1);
        let record = Arc::new(next);
        entry.record = Arc::clone(&record);
        Ok(record)
    }

    /// Remove a set and its members, returning the removed member ids.
    pub(crate) fn remove_set(&mut self, id: FeatureSetId) -> Result<Vec<FeatureId>, StoreError> {
        let removed = self.remove_members(id)?;
        if let Some(entry) = self.sets.remove(&id) {
            index_remove(&mut self.set_names, &name_key(&entry.record.name), &id);
        }
        Ok(removed)
    }

    /// Remove every member of a set, keeping the set.
    pub(crate) fn remove_members(
        &mut self,
        id: FeatureSetId,
    ) -> Result<Vec<FeatureId>, StoreError> {
        let entry = self
            .sets
            .get_mut(&id)
            .ok_or(StoreError::NoSuchFeatureSet(id))?;
        let members = std::mem::take(&mut entry.members);
        entry.visibility.clear_deviations();
        let removed: Vec<FeatureId> = members.into_iter().collect();
        for member in &removed {
            if let Some(feature) = self.features.remove(member) {
                self.unindex(&feature);
            }
        }
        Ok(removed)
    }

    pub(crate) fn clear(&mut self) {
        self.features.clear();
        self.sets.clear();
        self.names.clear();
        self.geometry.clear();
        self.set_names.clear();
        self.spatial.clear();
        self.timestamps.clear();
    }

    pub(crate) fn insert_feature(
        &mut self,
        set_id: FeatureSetId,
        definition: FeatureDefinition,
    ) -> Result<Arc<Feature>, StoreError> {
        if !self.sets.contains_key(&set_id) {
            return Err(StoreError::NoSuchFeatureSet(set_id));
        }
        let id = match definition.id {
            Some(id) if self.features.contains_key(&id) => {
                return Err(StoreError::InvalidArgument {
                    reason: format!("feature id {id} is already in use"),
                });
            }
            Some(id) => id,
            None => FeatureId(self.next_feature_id),
        };
        self.next_feature_id = self.next_feature_id.max(id.0.saturating_add(1));

        let record = Arc::new(Feature {
            feature_set_id: set_id,
            id,
            name: definition.name,
            geometry: definition.geometry,
            style: definition.style,
            attributes: definition.attributes,
            timestamp: definition.timestamp,
            version: INITIAL_VERSION,
        });
        let entry = FeatureEntry {
            envelope: record.geometry.envelope(),
            record: Arc::clone(&record),
        };
        self.index(&entry);
        self.features.insert(id, entry);
        if let Some(set) = self.sets.get_mut(&set_id) {
            set.members.insert(id);
        }
        Ok(record)
    }

    pub(crate) fn update_feature(
        &mut self,
        id: FeatureId,
        update: &FeatureUpdate,
    ) -> Result<Arc<Feature>, StoreError> {
        let entry = self
            .features
            .get_mut(&id)
            .ok_or(StoreError::NoSuchFeature(id))?;
        let previous = Arc::clone(&entry.record);
        let next = Arc::new(update.apply_to(&previous));
        let envelope = next.geometry.envelope();
        let old_envelope = entry.envelope;
        entry.record = Arc::clone(&next);
        entry.envelope = envelope;

        let old_key = name_key(&previous.name);
        let new_key = name_key(&next.name);
        if old_key != new_key {
            index_remove(&mut self.names, &old_key, &id);
            index_add(&mut self.names, new_key, id);
        }
        let (old_class, new_class) = (previous.geometry.class(), next.geometry.class());
        if old_class != new_class {
            self.remove_class(old_class, id);
            self.geometry.entry(new_class).or_default().insert(id);
        }
        if old_envelope != envelope {
            match (old_envelope, envelope) {
                (Some(old), Some(new)) => self.spatial.refresh(id, &old, new),
                (Some(old), None) => {
                    self.spatial.remove(id, &old);
                }
                (None, Some(new)) => self.spatial.insert(id, new),
                (None, None) => {}
            }
        }
        Ok(next)
    }

    pub(crate) fn remove_feature(&mut self, id: FeatureId) -> Result<Arc<Feature>, StoreError> {
        let entry = self
            .features
            .remove(&id)
            .ok_or(StoreError::NoSuchFeature(id))?;
        self.unindex(&entry);
        if let Some(set) = self.sets.get_mut(&entry.record.feature_set_id) {
            set.members.remove(&id);
            set.visibility.remove(id, set.members.len());
        }
        Ok(entry.record)
    }

    /// Set a feature's visibility, returning whether it changed.
    pub(crate) fn set_feature_visible(
        &mut self,
        id: FeatureId,
        visible: bool,
    ) -> Result<bool, StoreError> {
        let set_id = self
            .features
            .get(&id)
            .ok_or(StoreError::NoSuchFeature(id))?
            .record
            .feature_set_id;
        let set = self
            .sets
            .get_mut(&set_id)
            .ok_or(StoreError::NoSuchFeatureSet(set_id))?;
        let member_count = set.members.len();
        Ok(set.visibility.set_feature_visible(id, visible, member_count))
    }

    pub(crate) fn is_feature_visible(&self, id: FeatureId) -> Result<bool, StoreError> {
        let entry = self.features.get(&id).ok_or(StoreError::NoSuchFeature(id))?;
        Ok(self.is_visible(&entry.record))
    }

    /// Set a feature set's default visibility, returning whether any member
    /// changed.
    pub(crate) fn set_set_visible(
        &mut self,
        id: FeatureSetId,
        visible: bool,
    ) -> Result<bool, StoreError> {
        let set = self
            .sets
            .get_mut(&id)
            .ok_or(StoreError::NoSuchFeatureSet(id))?;
        Ok(set.visibility.set_visible(visible))
    }

    pub(crate) fn is_set_visible(&self, id: FeatureSetId) -> Result<bool, StoreError> {
        self.sets
            .get(&id)
            .map(|set| set.visibility.is_visible())
            .ok_or(StoreError::NoSuchFeatureSet(id))
    }

    fn index(&mut self, entry: &FeatureEntry) {
        let feature = &entry.record;
        index_add(&mut self.names, name_key(&feature.name), feature.id);
        self.geometry
            .entry(feature.geometry.class())
            .or_default()
            .insert(feature.id);
        match entry.envelope {
            Some(envelope) => self.spatial.insert(feature.id, envelope),
            None => log::warn!("feature {} has no envelope and is not spatially indexed", feature.id),
        }
        if let Some(timestamp) = feature.timestamp {
            *self.timestamps.entry(timestamp).or_default() += 1;
        }
    }

    fn unindex(&mut self, entry: &FeatureEntry) {
        let feature = &entry.record;
        index_remove(&mut self.names, &name_key(&feature.name), &feature.id);
        self.remove_class(feature.geometry.class(), feature.id);
        if let Some(envelope) = &entry.envelope {
            self.spatial.remove(feature.id, envelope);
        }
        if let Some(timestamp) = feature.timestamp {
            if let Some(count) = self.timestamps.get_mut(&timestamp) {
                *count -= 1;
                if *count == 0 {
                    self.timestamps.remove(&timestamp);
                }
            }
        }
    }

    fn remove_class(&mut self, class: GeometryClass, id: FeatureId) {
        if let Some(bucket) = self.geometry.get_mut(&class) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.geometry.remove(&class);
            }
        }
    }
}

#[cfg(test)]
mod tests;
