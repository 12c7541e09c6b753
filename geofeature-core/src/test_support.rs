//! Helpers shared by unit, behaviour and property tests across the
//! workspace.

use std::sync::{Mutex, PoisonError};

use crate::{
    AttributeSet, ChangeEvent, ChangeListener, FeatureDefinition, FeatureSetDefinition, Geometry,
};

/// Listener that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingListener {
    /// Create a listener with no recorded events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded `ContentChanged` events.
    #[must_use]
    pub fn content_changed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ChangeEvent::ContentChanged))
            .count()
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ChangeListener for RecordingListener {
    fn on_change(&self, event: &ChangeEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Point feature definition with no style and no attributes.
#[must_use]
pub fn point_feature(name: &str, x: f64, y: f64) -> FeatureDefinition {
    FeatureDefinition::new(name, Geometry::point(x, y))
}

/// Point feature definition carrying a single integer attribute.
#[must_use]
pub fn tagged_point_feature(name: &str, x: f64, y: f64, tag: i32) -> FeatureDefinition {
    let mut attributes = AttributeSet::new();
    attributes.set_int("tag", tag);
    point_feature(name, x, y).with_attributes(attributes)
}

/// Feature-set definition with no thresholds.
#[must_use]
pub fn feature_set(provider: &str, kind: &str, name: &str) -> FeatureSetDefinition {
    FeatureSetDefinition::new(provider, kind, name)
}
