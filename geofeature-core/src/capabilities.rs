//! Capability bitmasks advertised by data stores.
//!
//! A store refuses any mutation whose flag it does not advertise with
//! [`crate::StoreError::UnsupportedOperation`], before touching its indexes.

use std::ops::{BitAnd, BitOr, BitOrAssign};

macro_rules! bitmask {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$flag_meta:meta])* $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(u32);

        impl $name {
            $($(#[$flag_meta])* pub const $flag: Self = Self($value);)*

            /// No flags.
            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Every defined flag.
            #[must_use]
            pub const fn all() -> Self {
                Self(0 $(| $value)*)
            }

            /// Raw bits.
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Build from raw bits, dropping undefined ones.
            #[must_use]
            pub const fn from_bits_truncate(bits: u32) -> Self {
                Self(bits & Self::all().0)
            }

            /// Whether every flag in `other` is set.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether no flag is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Flags set in either mask. Usable in constants.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Copy with the flags in `other` cleared.
            #[must_use]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

bitmask! {
    /// Mutations a data store permits.
    ModificationFlags {
        /// Insert feature sets.
        FEATURESET_INSERT = 0x1;
        /// Update feature sets.
        FEATURESET_UPDATE = 0x2;
        /// Delete feature sets.
        FEATURESET_DELETE = 0x4;
        /// Batch mutations with begin/end bulk modification.
        BULK_MODIFICATIONS = 0x8;
        /// Insert features.
        FEATURE_INSERT = 0x10;
        /// Update features.
        FEATURE_UPDATE = 0x20;
        /// Delete features.
        FEATURE_DELETE = 0x40;
        /// Rename feature sets.
        FEATURESET_NAME = 0x80;
        /// Change feature-set display thresholds.
        FEATURESET_DISPLAY_THRESHOLDS = 0x100;
        /// Rename features.
        FEATURE_NAME = 0x200;
        /// Replace feature geometry.
        FEATURE_GEOMETRY = 0x400;
        /// Replace feature style.
        FEATURE_STYLE = 0x800;
        /// Change feature attributes.
        FEATURE_ATTRIBUTES = 0x1000;
    }
}

bitmask! {
    /// Visibility granularities a data store lets callers control.
    VisibilityFlags {
        /// Per-feature visibility.
        FEATURE = 0x1;
        /// Per-feature-set visibility.
        FEATURESET = 0x2;
    }
}

bitmask! {
    /// Feature properties touched by an update.
    FeatureProperties {
        /// The name.
        NAME = 0x1;
        /// The geometry.
        GEOMETRY = 0x2;
        /// The style.
        STYLE = 0x4;
        /// The attributes.
        ATTRIBUTES = 0x8;
    }
}

impl FeatureProperties {
    /// Modification flags a store must advertise to apply these changes.
    #[must_use]
    pub fn required_modifications(self) -> ModificationFlags {
        let mut required = ModificationFlags::FEATURE_UPDATE;
        if self.contains(Self::NAME) {
            required |= ModificationFlags::FEATURE_NAME;
        }
        if self.contains(Self::GEOMETRY) {
            required |= ModificationFlags::FEATURE_GEOMETRY;
        }
        if self.contains(Self::STYLE) {
            required |= ModificationFlags::FEATURE_STYLE;
        }
        if self.contains(Self::ATTRIBUTES) {
            required |= ModificationFlags::FEATURE_ATTRIBUTES;
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn all_covers_every_modification_flag() {
        assert_eq!(ModificationFlags::all().bits(), 0x1FFF);
        assert_eq!(VisibilityFlags::all().bits(), 0x3);
    }

    #[rstest]
    fn from_bits_drops_unknown_flags() {
        assert_eq!(VisibilityFlags::from_bits_truncate(0xFF), VisibilityFlags::all());
    }

    #[rstest]
    #[case(FeatureProperties::NAME, ModificationFlags::FEATURE_NAME)]
    #[case(FeatureProperties::GEOMETRY, ModificationFlags::FEATURE_GEOMETRY)]
    #[case(FeatureProperties::STYLE, ModificationFlags::FEATURE_STYLE)]
    #[case(FeatureProperties::ATTRIBUTES, ModificationFlags::FEATURE_ATTRIBUTES)]
    fn updates_require_matching_flag(
        #[case] properties: FeatureProperties,
        #[case] flag: ModificationFlags,
    ) {
        let required = properties.required_modifications();
        assert!(required.contains(flag | ModificationFlags::FEATURE_UPDATE));
    }

    #[rstest]
    fn difference_clears_flags() {
        let flags = ModificationFlags::all().difference(ModificationFlags::FEATURE_DELETE);
        assert!(!flags.contains(ModificationFlags::FEATURE_DELETE));
        assert!(flags.contains(ModificationFlags::FEATURE_INSERT));
    }
}
