//! Residual predicates applied to the candidates of the primary index.

use std::collections::BTreeSet;
use std::sync::Arc;

use geo::Coord;
use geofeature_core::geodesy::distance_to_envelope;
use geofeature_core::{
    Envelope, Feature, FeatureId, FeatureSet, FeatureSetId, GeometryClass, ResolutionRange,
};

use super::wildcard::WildcardSet;
use crate::quadtree::wrapped_regions;

/// A feature snapshot with the context the filters need.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) feature: Arc<Feature>,
    pub(crate) envelope: Option<Envelope>,
    pub(crate) set: Arc<FeatureSet>,
    pub(crate) visible: bool,
}

/// One filter dimension of a feature query.
#[derive(Debug, Clone)]
pub(crate) enum FeatureFilter {
    Provider(WildcardSet),
    Type(WildcardSet),
    SetId(BTreeSet<FeatureSetId>),
    SetName(WildcardSet),
    Id(BTreeSet<FeatureId>),
    Name(WildcardSet),
    GeometryType(BTreeSet<GeometryClass>),
    Region(Envelope),
    /// Great-circle distance from the center to the nearest point of the
    /// feature envelope.
    Radius { center: Coord<f64>, radius_m: f64 },
    Resolution(ResolutionRange),
    Visible,
}

impl FeatureFilter {
    pub(crate) fn accepts(&self, candidate: &Candidate) -> bool {
        let feature = &candidate.feature;
        match self {
            Self::Visible => candidate.visible,
            Self::Id(ids) => ids.contains(&feature.id),
            Self::Name(names) => names.matches(&feature.name),
            Self::GeometryType(classes) => classes.contains(&feature.geometry.class()),
            Self::Region(region) => candidate
                .envelope
                .is_some_and(|envelope| region_intersects(region, &envelope)),
            Self::Radius { center, radius_m } => candidate
                .envelope
                .is_some_and(|envelope| distance_to_envelope(*center, &envelope) <= *radius_m),
            _ => self.accepts_set(&candidate.set),
        }
    }

    /// Apply a set-level filter to a feature set. Feature-level filters
    /// accept every set.
    pub(crate) fn accepts_set(&self, set: &FeatureSet) -> bool {
        match self {
            Self::Provider(providers) => providers.matches(&set.provider),
            Self::Type(types) => types.matches(&set.kind),
            Self::SetId(ids) => ids.contains(&set.id),
            Self::SetName(names) => names.matches(&set.name),
            Self::Resolution(range) => resolution_overlaps(set, range),
            _ => true,
        }
    }
}

/// Whether `envelope` intersects `region` or one of its copies a full turn
/// east or west.
pub(crate) fn region_intersects(region: &Envelope, envelope: &Envelope) -> bool {
    wrapped_regions(region).any(|shifted| shifted.intersects(envelope))
}

/// Whether a set's display thresholds overlap the requested window.
///
/// A set draws between its finest (`max_resolution`, default 0) and
/// coarsest (`min_resolution`, default unbounded) resolutions.
pub(crate) fn resolution_overlaps(set: &FeatureSet, range: &ResolutionRange) -> bool {
    let set_finest = set.thresholds.max_resolution().unwrap_or(0.0);
    let set_coarsest = set.thresholds.min_resolution().unwrap_or(f64::INFINITY);
    let wanted_a = range.max_resolution.unwrap_or(0.0);
    let wanted_b = range.min_resolution.unwrap_or(f64::INFINITY);
    let (wanted_finest, wanted_coarsest) = if wanted_a <= wanted_b {
        (wanted_a, wanted_b)
    } else {
        (wanted_b, wanted_a)
    };
    set_finest <= wanted_coarsest && wanted_finest <= set_coarsest
}

/// An ordered conjunction of filters.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilterChain {
    filters: Vec<FeatureFilter>,
}

impl FilterChain {
    pub(crate) const fn new(filters: Vec<FeatureFilter>) -> Self {
        Self { filters }
    }

    pub(crate) fn accepts(&self, candidate: &Candidate) -> bool {
        self.filters.iter().all(|filter| filter.accepts(candidate))
    }

    pub(crate) fn accepts_set(&self, set: &FeatureSet) -> bool {
        self.filters.iter().all(|filter| filter.accepts_set(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeature_core::{AttributeSet, DisplayThresholds, Geometry, INITIAL_VERSION};
    use rstest::{fixture, rstest};

    fn set_with(thresholds: DisplayThresholds) -> FeatureSet {
        FeatureSet {
            id: FeatureSetId(1),
            provider: "gpx".to_owned(),
            kind: "track".to_owned(),
            name: "Morning Run".to_owned(),
            thresholds,
            version: INITIAL_VERSION,
        }
    }

    #[fixture]
    fn candidate() -> Candidate {
        let geometry = Geometry::point(179.9, 0.0);
        Candidate {
            envelope: geometry.envelope(),
            feature: Arc::new(Feature {
                feature_set_id: FeatureSetId(1),
                id: FeatureId(5),
                name: "Buoy".to_owned(),
                geometry,
                style: None,
                attributes: AttributeSet::new(),
                timestamp: None,
                version: INITIAL_VERSION,
            }),
            set: Arc::new(set_with(DisplayThresholds::UNBOUNDED)),
            visible: false,
        }
    }

    #[rstest]
    fn chain_is_a_conjunction(candidate: Candidate) {
        let chain = FilterChain::new(vec![
            FeatureFilter::Provider(WildcardSet::new(&["GPX".to_owned()])),
            FeatureFilter::Name(WildcardSet::new(&["bu%".to_owned()])),
        ]);
        assert!(chain.accepts(&candidate));

        let chain = FilterChain::new(vec![
            FeatureFilter::Name(WildcardSet::new(&["bu%".to_owned()])),
            FeatureFilter::Visible,
        ]);
        assert!(!chain.accepts(&candidate));
    }

    #[rstest]
    fn region_filter_wraps_the_antimeridian(candidate: Candidate) {
        let across = FeatureFilter::Region(Envelope::from_bounds(-180.5, -1.0, -179.0, 1.0));
        assert!(across.accepts(&candidate));
        let elsewhere = FeatureFilter::Region(Envelope::from_bounds(0.0, -1.0, 1.0, 1.0));
        assert!(!elsewhere.accepts(&candidate));
    }

    #[rstest]
    fn radius_filter_tests_the_circle(candidate: Candidate) {
        let radius = |x: f64| {
            FeatureFilter::Radius {
                center: Coord { x, y: 0.0 },
                radius_m: 20_000.0,
            }
        };
        let near = radius(179.8);
        assert!(near.accepts(&candidate));
        let far = radius(179.0);
        assert!(!far.accepts(&candidate));
    }

    #[rstest]
    #[case(None, None, Some(50.0), Some(10.0), true)]
    #[case(Some(100.0), Some(20.0), Some(50.0), Some(10.0), true)]
    #[case(Some(100.0), Some(60.0), Some(50.0), Some(10.0), false)]
    #[case(Some(5.0), None, Some(50.0), Some(10.0), false)]
    #[case(Some(10.0), None, Some(50.0), Some(10.0), true)]
    #[case(Some(100.0), Some(20.0), None, Some(10.0), true)]
    fn resolution_windows_overlap(
        #[case] set_min: Option<f64>,
        #[case] set_max: Option<f64>,
        #[case] wanted_min: Option<f64>,
        #[case] wanted_max: Option<f64>,
        #[case] expected: bool,
    ) {
        let thresholds = DisplayThresholds::new(set_min, set_max).expect("valid thresholds");
        let range = ResolutionRange {
            min_resolution: wanted_min,
            max_resolution: wanted_max,
        };
        assert_eq!(
            resolution_overlaps(&set_with(thresholds), &range),
            expected
        );
    }
}
