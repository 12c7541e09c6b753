//! Per-feature-set visibility with a default and a deviation set.
//!
//! A set stores one default visibility and the ids of members whose
//! visibility differs from it. When every member deviates the deviations
//! collapse into a flipped default, so the deviation set never holds every
//! member of a non-empty set.

use std::collections::BTreeSet;

use geofeature_core::FeatureId;

/// Visibility state of one feature set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VisibilityState {
    default_visible: bool,
    deviations: BTreeSet<FeatureId>,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            default_visible: true,
            deviations: BTreeSet::new(),
        }
    }
}

impl VisibilityState {
    #[cfg(test)]
    pub(crate) const fn default_visible(&self) -> bool {
        self.default_visible
    }

    #[cfg(test)]
    pub(crate) fn deviation_count(&self) -> usize {
        self.deviations.len()
    }

    /// Effective visibility of a member.
    pub(crate) fn is_feature_visible(&self, id: FeatureId) -> bool {
        self.deviations.contains(&id) != self.default_visible
    }

    /// A set is visible when at least one member can be.
    pub(crate) fn is_visible(&self) -> bool {
        self.default_visible || !self.deviations.is_empty()
    }

    /// Number of visible members out of `member_count`.
    pub(crate) fn visible_count(&self, member_count: usize) -> usize {
        if self.default_visible {
            member_count.saturating_sub(self.deviations.len())
        } else {
            self.deviations.len()
        }
    }

    /// Set one member's visibility. Returns whether its effective visibility
    /// changed.
    pub(crate) fn set_feature_visible(
        &mut self,
        id: FeatureId,
        visible: bool,
        member_count: usize,
    ) -> bool {
        if self.is_feature_visible(id) == visible {
            return false;
        }
        if visible == self.default_visible {
            self.deviations.remove(&id);
        } else {
            self.deviations.insert(id);
            self.collapse(member_count);
        }
        true
    }

    /// Set the default and drop every deviation. Returns whether any
    /// member's effective visibility changed.
    pub(crate) fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.default_visible != visible || !self.deviations.is_empty();
        self.default_visible = visible;
        self.deviations.clear();
        changed
    }

    /// Forget a member that left the set; `member_count` is the size after
    /// removal.
    pub(crate) fn remove(&mut self, id: FeatureId, member_count: usize) {
        self.deviations.remove(&id);
        if member_count == 0 {
            self.deviations.clear();
        } else {
            self.collapse(member_count);
        }
    }

    /// Drop every deviation, keeping the default.
    pub(crate) fn clear_deviations(&mut self) {
        self.deviations.clear();
    }

    fn collapse(&mut self, member_count: usize) {
        if member_count > 0 && self.deviations.len() >= member_count {
            self.default_visible = !self.default_visible;
            self.deviations.clear();
        }
    }
}
