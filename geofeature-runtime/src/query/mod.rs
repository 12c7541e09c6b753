//! Cardinality-based query planning and execution.
//!
//! Every active filter dimension gets a cheap estimate taken from its index
//! size. The smallest estimate picks the primary index, with ties going to
//! the earlier dimension in [`PrimaryIndex`] order. The primary index yields
//! the candidates and every other active dimension is applied to them as a
//! filter chain while the cursor is consumed.

use std::collections::BTreeSet;
use std::sync::Arc;

use geofeature_core::{
    Cursor, FeatureCursor, FeatureId, FeatureQueryParameters, FeatureSetCursor,
    FeatureSetQueryParameters, SpatialFilter,
};

use crate::index::FeatureIndexes;

mod filter;
mod order;
mod wildcard;

use filter::{Candidate, FeatureFilter, FilterChain};
use wildcard::{WildcardSet, has_wildcard};

/// Index a query starts from, in tie-break precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimaryIndex {
    /// Explicit feature or feature-set ids.
    Ids,
    /// Members of the feature sets matching the set-level constraints.
    FeatureSet,
    /// Quadtree region lookup.
    Spatial,
    /// Visible members of every set.
    Visibility,
    /// Geometry-class buckets.
    GeometryType,
    /// Exact name buckets.
    Names,
    /// Every record.
    FullScan,
}

/// Estimated candidate count for one filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityEstimate {
    /// Dimension the estimate belongs to.
    pub index: PrimaryIndex,
    /// Approximate number of candidates.
    pub cardinality: usize,
}

/// The planner's choice for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Index the candidates come from.
    pub primary: PrimaryIndex,
    /// Estimates of every active dimension, in precedence order, ending with
    /// the full scan.
    pub estimates: Vec<CardinalityEstimate>,
}

impl QueryPlan {
    /// Estimate recorded for `index`, if that dimension was active.
    #[must_use]
    pub fn estimate(&self, index: PrimaryIndex) -> Option<usize> {
        self.estimates
            .iter()
            .find(|estimate| estimate.index == index)
            .map(|estimate| estimate.cardinality)
    }

    fn choose(estimates: Vec<CardinalityEstimate>, excluded: Option<PrimaryIndex>) -> Self {
        let primary = estimates
            .iter()
            .filter(|estimate| Some(estimate.index) != excluded)
            .fold(None::<&CardinalityEstimate>, |best, next| match best {
                Some(current) if current.cardinality <= next.cardinality => Some(current),
                _ => Some(next),
            })
            .map_or(PrimaryIndex::FullScan, |best| best.index);
        Self { primary, estimates }
    }
}

fn lowered_keys(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_lowercase()).collect()
}

/// Provider, type, set-id and set-name filters of a feature query.
fn set_identity_filters(params: &FeatureQueryParameters) -> Vec<FeatureFilter> {
    let mut filters = Vec::new();
    if let Some(providers) = &params.providers {
        filters.push(FeatureFilter::Provider(WildcardSet::new(providers)));
    }
    if let Some(types) = &params.types {
        filters.push(FeatureFilter::Type(WildcardSet::new(types)));
    }
    if let Some(ids) = &params.feature_set_ids {
        filters.push(FeatureFilter::SetId(ids.clone()));
    }
    if let Some(names) = &params.feature_set_names {
        filters.push(FeatureFilter::SetName(WildcardSet::new(names)));
    }
    filters
}

/// Every owning-set constraint of a feature query.
fn set_level_filters(params: &FeatureQueryParameters) -> FilterChain {
    let mut filters = set_identity_filters(params);
    if params.resolution.is_constrained() {
        filters.push(FeatureFilter::Resolution(params.resolution));
    }
    FilterChain::new(filters)
}

/// Choose the primary index of a feature query.
pub(crate) fn plan_features(
    indexes: &FeatureIndexes,
    params: &FeatureQueryParameters,
) -> QueryPlan {
    let full = indexes.feature_count();
    let mut estimates = Vec::new();
    let mut push = |index, cardinality| {
        estimates.push(CardinalityEstimate { index, cardinality });
    };

    if let Some(ids) = &params.ids {
        push(PrimaryIndex::Ids, ids.len());
    }
    if params.constrains_feature_sets() {
        let chain = set_level_filters(params);
        let cardinality = indexes
            .sets()
            .filter(|set| chain.accepts_set(&set.record))
            .map(|set| 1 + set.members.len())
            .sum();
        push(PrimaryIndex::FeatureSet, cardinality);
    }
    if let Some(filter) = &params.spatial_filter {
        let cardinality = indexes
            .spatial()
            .approximate_count_wrapped(&filter.envelope());
        push(PrimaryIndex::Spatial, cardinality);
    }
    if params.visible_only {
        let cardinality = indexes.sets().map(|set| 1 + set.visible_count()).sum();
        push(PrimaryIndex::Visibility, cardinality);
    }
    if let Some(classes) = &params.geometry_types {
        let members: usize = classes
            .iter()
            .filter_map(|class| indexes.features_of_class(*class))
            .map(BTreeSet::len)
            .sum();
        push(PrimaryIndex::GeometryType, classes.len() + members);
    }
    let mut excluded = None;
    if let Some(names) = &params.names {
        let cardinality = if has_wildcard(names) {
            excluded = Some(PrimaryIndex::Names);
            full
        } else {
            let keys = lowered_keys(names);
            let members: usize = keys
                .iter()
                .filter_map(|key| indexes.features_named(key))
                .map(BTreeSet::len)
                .sum();
            keys.len() + members
        };
        push(PrimaryIndex::Names, cardinality);
    }
    push(PrimaryIndex::FullScan, full);

    QueryPlan::choose(estimates, excluded)
}

fn primary_candidates(
    indexes: &FeatureIndexes,
    params: &FeatureQueryParameters,
    primary: PrimaryIndex,
) -> Vec<FeatureId> {
    match (primary, params) {
        (
            PrimaryIndex::Ids,
            FeatureQueryParameters {
                ids: Some(ids), ..
            },
        ) => ids
            .iter()
            .copied()
            .filter(|id| indexes.feature(*id).is_some())
            .collect(),
        (PrimaryIndex::FeatureSet, _) => {
            let chain = set_level_filters(params);
            indexes
                .sets()
                .filter(|set| chain.accepts_set(&set.record))
                .flat_map(|set| set.members.iter().copied())
                .collect()
        }
        (
            PrimaryIndex::Spatial,
            FeatureQueryParameters {
                spatial_filter: Some(filter),
                ..
            },
        ) => indexes.spatial().query_wrapped(&filter.envelope()),
        (PrimaryIndex::Visibility, _) => indexes
            .sets()
            .flat_map(|set| set.visible_members())
            .collect(),
        (
            PrimaryIndex::GeometryType,
            FeatureQueryParameters {
                geometry_types: Some(classes),
                ..
            },
        ) => classes
            .iter()
            .filter_map(|class| indexes.features_of_class(*class))
            .flat_map(|bucket| bucket.iter().copied())
            .collect(),
        (
            PrimaryIndex::Names,
            FeatureQueryParameters {
                names: Some(names), ..
            },
        ) => lowered_keys(names)
            .iter()
            .filter_map(|key| indexes.features_named(key))
            .flat_map(|bucket| bucket.iter().copied())
            .collect(),
        _ => indexes.features().map(|entry| entry.record.id).collect(),
    }
}

/// Filters for every active dimension the primary index did not already
/// apply, in evaluation order.
fn residual_chain(params: &FeatureQueryParameters, primary: PrimaryIndex) -> FilterChain {
    let mut filters = if primary == PrimaryIndex::FeatureSet {
        Vec::new()
    } else {
        set_identity_filters(params)
    };
    if let Some(ids) = params.ids.as_ref().filter(|_| primary != PrimaryIndex::Ids) {
        filters.push(FeatureFilter::Id(ids.clone()));
    }
    if let Some(names) = params.names.as_ref().filter(|_| primary != PrimaryIndex::Names) {
        filters.push(FeatureFilter::Name(WildcardSet::new(names)));
    }
    if let Some(classes) = params
        .geometry_types
        .as_ref()
        .filter(|_| primary != PrimaryIndex::GeometryType)
    {
        filters.push(FeatureFilter::GeometryType(classes.clone()));
    }
    match params.spatial_filter {
        Some(SpatialFilter::Region(region)) if primary != PrimaryIndex::Spatial => {
            filters.push(FeatureFilter::Region(region));
        }
        Some(SpatialFilter::Radius { center, radius_m }) => {
            filters.push(FeatureFilter::Radius { center, radius_m });
        }
        _ => {}
    }
    if params.resolution.is_constrained() && primary != PrimaryIndex::FeatureSet {
        filters.push(FeatureFilter::Resolution(params.resolution));
    }
    if params.visible_only && primary != PrimaryIndex::Visibility {
        filters.push(FeatureFilter::Visible);
    }
    FilterChain::new(filters)
}

fn candidate(indexes: &FeatureIndexes, id: FeatureId) -> Option<Candidate> {
    let entry = indexes.feature(id)?;
    let set = indexes.set(entry.record.feature_set_id)?;
    Some(Candidate {
        feature: Arc::clone(&entry.record),
        envelope: entry.envelope,
        set: Arc::clone(&set.record),
        visible: set.is_member_visible(id),
    })
}

/// Plan and run a feature query, snapshotting the primary candidates.
pub(crate) fn select_features(
    indexes: &FeatureIndexes,
    params: &FeatureQueryParameters,
) -> FeatureCursor {
    let plan = plan_features(indexes, params);
    log::debug!(
        "feature query starts from {:?} (estimates {:?})",
        plan.primary,
        plan.estimates
    );
    let chain = residual_chain(params, plan.primary);
    let mut ids = primary_candidates(indexes, params, plan.primary);
    ids.sort_unstable();
    ids.dedup();
    let candidates: Vec<Candidate> = ids
        .into_iter()
        .filter_map(|id| candidate(indexes, id))
        .collect();
    let offset = params.offset;
    let limit = params.limit.unwrap_or(usize::MAX);

    // Paging runs over id order whatever index produced the candidates.
    if params.order.is_empty() {
        return Cursor::new(
            candidates
                .into_iter()
                .filter(move |candidate| chain.accepts(candidate))
                .skip(offset)
                .take(limit)
                .map(|candidate| candidate.feature),
        );
    }
    let mut matched: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| chain.accepts(candidate))
        .collect();
    order::sort_candidates(&mut matched, &params.order);
    Cursor::new(
        matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|candidate| candidate.feature),
    )
}

/// Choose the primary index of a feature-set query.
pub(crate) fn plan_feature_sets(
    indexes: &FeatureIndexes,
    params: &FeatureSetQueryParameters,
) -> QueryPlan {
    let full = indexes.set_count();
    let mut estimates = Vec::new();
    if let Some(ids) = &params.ids {
        estimates.push(CardinalityEstimate {
            index: PrimaryIndex::Ids,
            cardinality: ids.len(),
        });
    }
    if params.visible_only {
        estimates.push(CardinalityEstimate {
            index: PrimaryIndex::Visibility,
            cardinality: indexes
                .sets()
                .filter(|set| set.visibility.is_visible())
                .count(),
        });
    }
    let mut excluded = None;
    if let Some(names) = &params.names {
        let cardinality = if has_wildcard(names) {
            excluded = Some(PrimaryIndex::Names);
            full
        } else {
            let keys = lowered_keys(names);
            let members: usize = keys
                .iter()
                .filter_map(|key| indexes.sets_named(key))
                .map(BTreeSet::len)
                .sum();
            keys.len() + members
        };
        estimates.push(CardinalityEstimate {
            index: PrimaryIndex::Names,
            cardinality,
        });
    }
    estimates.push(CardinalityEstimate {
        index: PrimaryIndex::FullScan,
        cardinality: full,
    });
    QueryPlan::choose(estimates, excluded)
}

/// Plan and run a feature-set query.
pub(crate) fn select_feature_sets(
    indexes: &FeatureIndexes,
    params: &FeatureSetQueryParameters,
) -> FeatureSetCursor {
    let plan = plan_feature_sets(indexes, params);
    log::debug!("feature-set query starts from {:?}", plan.primary);

    let candidates: Vec<_> = match (plan.primary, params) {
        (
            PrimaryIndex::Ids,
            FeatureSetQueryParameters {
                ids: Some(ids), ..
            },
        ) => ids.iter().filter_map(|id| indexes.set(*id)).collect(),
        (
            PrimaryIndex::Names,
            FeatureSetQueryParameters {
                names: Some(names), ..
            },
        ) => lowered_keys(names)
            .iter()
            .filter_map(|key| indexes.sets_named(key))
            .flat_map(|bucket| bucket.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| indexes.set(id))
            .collect(),
        (PrimaryIndex::Visibility, _) => indexes
            .sets()
            .filter(|set| set.visibility.is_visible())
            .collect(),
        _ => indexes.sets().collect(),
    };

    let mut filters = Vec::new();
    if let Some(providers) = &params.providers {
        filters.push(FeatureFilter::Provider(WildcardSet::new(providers)));
    }
    if let Some(types) = &params.types {
        filters.push(FeatureFilter::Type(WildcardSet::new(types)));
    }
    if let Some(ids) = params.ids.as_ref().filter(|_| plan.primary != PrimaryIndex::Ids) {
        filters.push(FeatureFilter::SetId(ids.clone()));
    }
    if let Some(names) = params.names.as_ref().filter(|_| plan.primary != PrimaryIndex::Names) {
        filters.push(FeatureFilter::SetName(WildcardSet::new(names)));
    }
    let chain = FilterChain::new(filters);
    let visible_only = params.visible_only && plan.primary != PrimaryIndex::Visibility;

    let mut matched: Vec<_> = candidates
        .into_iter()
        .filter(|set| !visible_only || set.visibility.is_visible())
        .map(|set| Arc::clone(&set.record))
        .collect();
    matched.sort_unstable_by_key(|set| set.id);
    matched.dedup_by_key(|set| set.id);
    Cursor::new(
        matched
            .into_iter()
            .filter(move |set| chain.accepts_set(set))
            .skip(params.offset)
            .take(params.limit.unwrap_or(usize::MAX)),
    )
}
