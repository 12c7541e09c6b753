//! Result ordering.

use std::cmp::Ordering;

use geofeature_core::FeatureOrder;
use geofeature_core::geodesy::distance_to_envelope;

use super::filter::Candidate;

/// Sort `candidates` by `order`, most significant criterion first. Ties left
/// by every criterion fall back to ascending feature id.
pub(crate) fn sort_candidates(candidates: &mut [Candidate], order: &[FeatureOrder]) {
    candidates.sort_by(|a, b| {
        order
            .iter()
            .map(|criterion| compare(criterion, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.feature.id.cmp(&b.feature.id))
    });
}

fn compare(criterion: &FeatureOrder, a: &Candidate, b: &Candidate) -> Ordering {
    match criterion {
        FeatureOrder::Resolution => compare_unbounded_last(
            a.set.thresholds.min_resolution(),
            b.set.thresholds.min_resolution(),
        ),
        FeatureOrder::FeatureSet => a.feature.feature_set_id.cmp(&b.feature.feature_set_id),
        FeatureOrder::Name => a
            .feature
            .name
            .to_lowercase()
            .cmp(&b.feature.name.to_lowercase()),
        FeatureOrder::Id => a.feature.id.cmp(&b.feature.id),
        FeatureOrder::Distance(point) => {
            let distance = |candidate: &Candidate| {
                candidate
                    .envelope
                    .map_or(f64::INFINITY, |envelope| distance_to_envelope(*point, &envelope))
            };
            distance(a).total_cmp(&distance(b))
        }
        FeatureOrder::GeometryType => a.feature.geometry.class().cmp(&b.feature.geometry.class()),
    }
}

fn compare_unbounded_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
