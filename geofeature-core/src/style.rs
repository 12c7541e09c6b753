//! Presentation styles attached to features.

/// Colour packed as `0xAARRGGBB`.
pub type Argb = u32;

/// How a feature is drawn.
///
/// Styles are opaque to the data store: they are stored, returned and
/// replaced wholesale, never indexed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Style {
    /// Outline drawn with the given colour and width in pixels.
    Stroke {
        /// Stroke colour.
        color: Argb,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Area fill.
    Fill {
        /// Fill colour.
        color: Argb,
    },
    /// Icon placed at the feature's points.
    Icon {
        /// Tint applied to the icon.
        color: Argb,
        /// Location of the icon image.
        uri: String,
    },
    /// Text label.
    Label {
        /// Label text.
        text: String,
        /// Text colour.
        color: Argb,
    },
    /// Several styles applied in order.
    Composite(Vec<Self>),
}

impl Style {
    /// Solid stroke helper.
    #[must_use]
    pub const fn stroke(color: Argb, width: f32) -> Self {
        Self::Stroke { color, width }
    }
}
