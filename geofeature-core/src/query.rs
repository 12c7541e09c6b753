//! Query parameter objects for features and feature sets.
//!
//! Every field is optional; [`FeatureQueryParameters::default`] and
//! [`FeatureSetQueryParameters::default`] match everything. Provider, type
//! and name filters accept `%` as a SQL-LIKE wildcard and compare
//! case-insensitively.

use std::collections::BTreeSet;
use std::time::Duration;

use geo::Coord;

use crate::{Envelope, FeatureId, FeatureSetId, GeometryClass};

/// Wildcard character accepted by string filters.
pub const WILDCARD: char = '%';

/// Advisory query timeout used when none is given.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Spatial constraint of a feature query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialFilter {
    /// Features whose envelope intersects the region.
    Region(Envelope),
    /// Features within `radius_m` metres of `center`.
    Radius {
        /// Circle centre.
        center: Coord<f64>,
        /// Radius in metres.
        radius_m: f64,
    },
}

impl SpatialFilter {
    /// Region given by its upper-left and lower-right corners.
    #[must_use]
    pub fn region(upper_left: Coord<f64>, lower_right: Coord<f64>) -> Self {
        Self::Region(Envelope::from_corners(upper_left, lower_right))
    }

    /// Envelope handed to the spatial index.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        match self {
            Self::Region(envelope) => *envelope,
            Self::Radius { center, radius_m } => Envelope::around(*center, *radius_m),
        }
    }
}

/// Resolution window of a query, in metres per pixel.
///
/// A feature set matches when its display thresholds overlap the window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolutionRange {
    /// Coarsest resolution of interest.
    pub min_resolution: Option<f64>,
    /// Finest resolution of interest.
    pub max_resolution: Option<f64>,
}

impl ResolutionRange {
    /// Whether either bound is present.
    #[must_use]
    pub const fn is_constrained(&self) -> bool {
        self.min_resolution.is_some() || self.max_resolution.is_some()
    }
}

/// Sort criterion for feature queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureOrder {
    /// Owning set's coarsest display resolution, unbounded last.
    Resolution,
    /// Owning feature-set id.
    FeatureSet,
    /// Case-insensitive feature name.
    Name,
    /// Feature id.
    Id,
    /// Great-circle distance from the point to the feature's envelope.
    Distance(Coord<f64>),
    /// Geometry class.
    GeometryType,
}

/// Constraints of a feature query.
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use geofeature_core::{FeatureQueryParameters, SpatialFilter};
///
/// let params = FeatureQueryParameters::new()
///     .with_names(["abc%"])
///     .with_spatial_filter(SpatialFilter::region(
///         coord! { x: -1.0, y: 1.0 },
///         coord! { x: 1.0, y: -1.0 },
///     ))
///     .with_limit(10);
/// assert!(params.names.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQueryParameters {
    /// Providers of the owning sets.
    pub providers: Option<Vec<String>>,
    /// Types of the owning sets.
    pub types: Option<Vec<String>>,
    /// Names of the owning sets.
    pub feature_set_names: Option<Vec<String>>,
    /// Ids of the owning sets.
    pub feature_set_ids: Option<BTreeSet<FeatureSetId>>,
    /// Feature names.
    pub names: Option<Vec<String>>,
    /// Feature ids.
    pub ids: Option<BTreeSet<FeatureId>>,
    /// Spatial constraint.
    pub spatial_filter: Option<SpatialFilter>,
    /// Geometry classes.
    pub geometry_types: Option<BTreeSet<GeometryClass>>,
    /// Resolution window of the owning sets.
    pub resolution: ResolutionRange,
    /// Only effectively visible features.
    pub visible_only: bool,
    /// Sort criteria, most significant first.
    pub order: Vec<FeatureOrder>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
    /// Advisory timeout for pluggable backing stores.
    pub timeout: Duration,
}

impl Default for FeatureQueryParameters {
    fn default() -> Self {
        Self {
            providers: None,
            types: None,
            feature_set_names: None,
            feature_set_ids: None,
            names: None,
            ids: None,
            spatial_filter: None,
            geometry_types: None,
            resolution: ResolutionRange::default(),
            visible_only: false,
            order: Vec::new(),
            limit: None,
            offset: 0,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

fn owned_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl FeatureQueryParameters {
    /// Parameters matching every feature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to owning-set providers.
    #[must_use]
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = Some(owned_strings(providers));
        self
    }

    /// Restrict to owning-set types.
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(owned_strings(types));
        self
    }

    /// Restrict to owning-set names.
    #[must_use]
    pub fn with_feature_set_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_set_names = Some(owned_strings(names));
        self
    }

    /// Restrict to owning-set ids.
    #[must_use]
    pub fn with_feature_set_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = FeatureSetId>,
    {
        self.feature_set_ids = Some(ids.into_iter().collect());
        self
    }

    /// Restrict to feature names.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(owned_strings(names));
        self
    }

    /// Restrict to feature ids.
    #[must_use]
    pub fn with_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = FeatureId>,
    {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// Restrict spatially.
    #[must_use]
    pub fn with_spatial_filter(mut self, filter: SpatialFilter) -> Self {
        self.spatial_filter = Some(filter);
        self
    }

    /// Restrict to geometry classes.
    #[must_use]
    pub fn with_geometry_types<I>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = GeometryClass>,
    {
        self.geometry_types = Some(classes.into_iter().collect());
        self
    }

    /// Restrict to owning sets displayed within the resolution window.
    #[must_use]
    pub fn with_resolution(mut self, resolution: ResolutionRange) -> Self {
        self.resolution = resolution;
        self
    }

    /// Only return effectively visible features.
    #[must_use]
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Append a sort criterion.
    #[must_use]
    pub fn order_by(mut self, order: FeatureOrder) -> Self {
        self.order.push(order);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip leading results.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Whether any owning-set constraint is present.
    #[must_use]
    pub const fn constrains_feature_sets(&self) -> bool {
        self.providers.is_some()
            || self.types.is_some()
            || self.feature_set_ids.is_some()
            || self.feature_set_names.is_some()
            || self.resolution.is_constrained()
    }
}

/// Constraints of a feature-set query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureSetQueryParameters {
    /// Providers.
    pub providers: Option<Vec<String>>,
    /// Types.
    pub types: Option<Vec<String>>,
    /// Names.
    pub names: Option<Vec<String>>,
    /// Ids.
    pub ids: Option<BTreeSet<FeatureSetId>>,
    /// Only sets with at least one visible feature.
    pub visible_only: bool,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
}

impl FeatureSetQueryParameters {
    /// Parameters matching every feature set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to providers.
    #[must_use]
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = Some(owned_strings(providers));
        self
    }

    /// Restrict to types.
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(owned_strings(types));
        self
    }

    /// Restrict to names.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(owned_strings(names));
        self
    }

    /// Restrict to ids.
    #[must_use]
    pub fn with_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = FeatureSetId>,
    {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// Only return sets with at least one visible feature.
    #[must_use]
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip leading results.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}
