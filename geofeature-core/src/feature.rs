//! Feature and feature-set records and the definitions used to create and
//! update them.
//!
//! Records handed out by a data store are immutable snapshots. Changes go
//! through the store's update operations so its indexes stay consistent.

use std::fmt;

use crate::{AttributeSet, FeatureProperties, Geometry, StoreError, Style};

/// Identifier of a [`Feature`], unique within one data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FeatureId(pub u64);

/// Identifier of a [`FeatureSet`], unique within one data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FeatureSetId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for FeatureSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Version assigned to newly inserted records.
pub const INITIAL_VERSION: u64 = 1;

/// Display resolution thresholds of a feature set, in metres per pixel.
///
/// `min_resolution` is the coarsest resolution at which the set is drawn and
/// `max_resolution` the finest, so `min_resolution >= max_resolution` when
/// both are present. `None` means "no threshold".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawThresholds")
)]
pub struct DisplayThresholds {
    min_resolution: Option<f64>,
    max_resolution: Option<f64>,
}

/// Unchecked wire form of [`DisplayThresholds`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawThresholds {
    #[serde(default)]
    min_resolution: Option<f64>,
    #[serde(default)]
    max_resolution: Option<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawThresholds> for DisplayThresholds {
    type Error = StoreError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.min_resolution, raw.max_resolution)
    }
}

impl DisplayThresholds {
    /// No thresholds: the set displays at every resolution.
    pub const UNBOUNDED: Self = Self {
        min_resolution: None,
        max_resolution: None,
    };

    /// Validate and build thresholds. NaN is read as "no threshold".
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] when both thresholds are present and
    /// `min_resolution < max_resolution`.
    pub fn new(
        min_resolution: Option<f64>,
        max_resolution: Option<f64>,
    ) -> Result<Self, StoreError> {
        let min_resolution = min_resolution.filter(|value| !value.is_nan());
        let max_resolution = max_resolution.filter(|value| !value.is_nan());
        if let (Some(min), Some(max)) = (min_resolution, max_resolution) {
            if min < max {
                return Err(StoreError::InvalidArgument {
                    reason: format!(
                        "minimum resolution {min} must not be finer than maximum resolution {max}"
                    ),
                });
            }
        }
        Ok(Self {
            min_resolution,
            max_resolution,
        })
    }

    /// Coarsest display resolution.
    #[must_use]
    pub const fn min_resolution(&self) -> Option<f64> {
        self.min_resolution
    }

    /// Finest display resolution.
    #[must_use]
    pub const fn max_resolution(&self) -> Option<f64> {
        self.max_resolution
    }
}

/// Metadata describing a named group of features.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSet {
    /// Identifier.
    pub id: FeatureSetId,
    /// Parser or source that produced the set.
    pub provider: String,
    /// Free-form content type.
    pub kind: String,
    /// Display name.
    pub name: String,
    /// Resolution thresholds.
    pub thresholds: DisplayThresholds,
    /// Record version, bumped on every update.
    pub version: u64,
}

/// A geometry, style and attribute record belonging to a feature set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    /// Owning feature set.
    pub feature_set_id: FeatureSetId,
    /// Identifier.
    pub id: FeatureId,
    /// Display name.
    pub name: String,
    /// Geometry value.
    pub geometry: Geometry,
    /// Optional presentation style.
    pub style: Option<Style>,
    /// Typed attributes.
    pub attributes: AttributeSet,
    /// Milliseconds since the Unix epoch, when known.
    pub timestamp: Option<i64>,
    /// Record version, bumped on every update.
    pub version: u64,
}

/// Caller-supplied content of a new feature set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSetDefinition {
    /// Explicit id, or `None` to have one assigned.
    pub id: Option<FeatureSetId>,
    /// Parser or source that produced the set.
    pub provider: String,
    /// Free-form content type.
    pub kind: String,
    /// Display name.
    pub name: String,
    /// Resolution thresholds.
    pub thresholds: DisplayThresholds,
    /// Explicit version, or `None` for [`INITIAL_VERSION`].
    pub version: Option<u64>,
}

impl FeatureSetDefinition {
    /// Definition with no thresholds and engine-assigned id and version.
    pub fn new(
        provider: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            provider: provider.into(),
            kind: kind.into(),
            name: name.into(),
            thresholds: DisplayThresholds::UNBOUNDED,
            version: None,
        }
    }

    /// Set the display thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: DisplayThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Request an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: FeatureSetId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Caller-supplied content of a new feature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureDefinition {
    /// Explicit id, or `None` to have one assigned.
    pub id: Option<FeatureId>,
    /// Display name.
    pub name: String,
    /// Geometry value.
    pub geometry: Geometry,
    /// Optional presentation style.
    pub style: Option<Style>,
    /// Typed attributes.
    pub attributes: AttributeSet,
    /// Milliseconds since the Unix epoch, when known.
    pub timestamp: Option<i64>,
}

impl FeatureDefinition {
    /// Definition with no style, no attributes and no timestamp.
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: None,
            name: name.into(),
            geometry,
            style: None,
            attributes: AttributeSet::new(),
            timestamp: None,
        }
    }

    /// Attach a style.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Attach attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    /// Attach a timestamp in epoch milliseconds.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Request an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = Some(id);
        self
    }
}

/// How an attribute update combines with the stored attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeUpdateMode {
    /// Replace the stored set wholesale.
    #[default]
    Replace,
    /// Add new keys and replace existing ones, keeping the rest.
    Merge,
}

/// A targeted feature update. Only the properties that were set change.
///
/// # Examples
///
/// ```
/// use geofeature_core::{FeatureProperties, FeatureUpdate, Geometry};
///
/// let update = FeatureUpdate::new()
///     .name("Harbour")
///     .geometry(Geometry::point(1.0, 2.0));
/// assert_eq!(
///     update.properties(),
///     FeatureProperties::NAME | FeatureProperties::GEOMETRY
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureUpdate {
    name: Option<String>,
    geometry: Option<Geometry>,
    style: Option<Option<Style>>,
    attributes: Option<(AttributeSet, AttributeUpdateMode)>,
}

impl FeatureUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            geometry: None,
            style: None,
            attributes: None,
        }
    }

    /// Replace the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the geometry.
    #[must_use]
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Replace the style; `None` removes it.
    #[must_use]
    pub fn style(mut self, style: Option<Style>) -> Self {
        self.style = Some(style);
        self
    }

    /// Update the attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: AttributeSet, mode: AttributeUpdateMode) -> Self {
        self.attributes = Some((attributes, mode));
        self
    }

    /// Mask of the properties this update touches.
    #[must_use]
    pub fn properties(&self) -> FeatureProperties {
        let mut mask = FeatureProperties::empty();
        if self.name.is_some() {
            mask |= FeatureProperties::NAME;
        }
        if self.geometry.is_some() {
            mask |= FeatureProperties::GEOMETRY;
        }
        if self.style.is_some() {
            mask |= FeatureProperties::STYLE;
        }
        if self.attributes.is_some() {
            mask |= FeatureProperties::ATTRIBUTES;
        }
        mask
    }

    /// New name, when the update sets one.
    #[must_use]
    pub fn new_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// New geometry, when the update sets one.
    #[must_use]
    pub const fn new_geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// New style, when the update sets one. The inner `None` removes the style.
    #[must_use]
    pub const fn new_style(&self) -> Option<&Option<Style>> {
        self.style.as_ref()
    }

    /// New attributes and how to combine them, when the update sets them.
    #[must_use]
    pub const fn new_attributes(&self) -> Option<&(AttributeSet, AttributeUpdateMode)> {
        self.attributes.as_ref()
    }

    /// Produce the successor of `current` with this update applied and the
    /// version bumped by one.
    #[must_use]
    pub fn apply_to(&self, current: &Feature) -> Feature {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if let Some(geometry) = &self.geometry {
            next.geometry = geometry.clone();
        }
        if let Some(style) = &self.style {
            next.style.clone_from(style);
        }
        if let Some((attributes, mode)) = &self.attributes {
            match mode {
                AttributeUpdateMode::Replace => next.attributes = attributes.clone(),
                AttributeUpdateMode::Merge => next.attributes.merge(attributes),
            }
        }
        next.version = current.version.saturating_add(1);
        next
    }
}

/// A targeted feature-set update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSetUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New display thresholds.
    pub thresholds: Option<DisplayThresholds>,
}
