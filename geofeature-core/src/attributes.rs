//! Typed key-value attributes attached to features.
//!
//! An [`AttributeSet`] maps unique string keys to strongly typed values,
//! including arrays and nested sets. Typed getters fail with
//! [`AttributeError`] rather than coercing between types.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A strongly typed attribute value.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes.
    Binary(Vec<u8>),
    /// Array of 32-bit integers.
    IntArray(Vec<i32>),
    /// Array of 64-bit integers.
    LongArray(Vec<i64>),
    /// Array of doubles.
    DoubleArray(Vec<f64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of byte blobs.
    BinaryArray(Vec<Vec<u8>>),
    /// Nested attribute set.
    AttributeSet(AttributeSet),
}

impl AttributeValue {
    /// The type tag of this value.
    #[must_use]
    pub const fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Int(_) => AttributeType::Int,
            Self::Long(_) => AttributeType::Long,
            Self::Double(_) => AttributeType::Double,
            Self::String(_) => AttributeType::String,
            Self::Binary(_) => AttributeType::Binary,
            Self::IntArray(_) => AttributeType::IntArray,
            Self::LongArray(_) => AttributeType::LongArray,
            Self::DoubleArray(_) => AttributeType::DoubleArray,
            Self::StringArray(_) => AttributeType::StringArray,
            Self::BinaryArray(_) => AttributeType::BinaryArray,
            Self::AttributeSet(_) => AttributeType::AttributeSet,
        }
    }
}

// Doubles compare equal when both are NaN so that equality stays reflexive.
fn doubles_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => doubles_equal(*a, *b),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::IntArray(a), Self::IntArray(b)) => a == b,
            (Self::LongArray(a), Self::LongArray(b)) => a == b,
            (Self::DoubleArray(a), Self::DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| doubles_equal(*x, *y))
            }
            (Self::StringArray(a), Self::StringArray(b)) => a == b,
            (Self::BinaryArray(a), Self::BinaryArray(b)) => a == b,
            (Self::AttributeSet(a), Self::AttributeSet(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringArray(value)
    }
}

impl From<AttributeSet> for AttributeValue {
    fn from(value: AttributeSet) -> Self {
        Self::AttributeSet(value)
    }
}

/// Type tag reported by [`AttributeSet::attribute_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// [`AttributeValue::Int`].
    Int,
    /// [`AttributeValue::Long`].
    Long,
    /// [`AttributeValue::Double`].
    Double,
    /// [`AttributeValue::String`].
    String,
    /// [`AttributeValue::Binary`].
    Binary,
    /// [`AttributeValue::IntArray`].
    IntArray,
    /// [`AttributeValue::LongArray`].
    LongArray,
    /// [`AttributeValue::DoubleArray`].
    DoubleArray,
    /// [`AttributeValue::StringArray`].
    StringArray,
    /// [`AttributeValue::BinaryArray`].
    BinaryArray,
    /// [`AttributeValue::AttributeSet`].
    AttributeSet,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
            Self::IntArray => "int[]",
            Self::LongArray => "long[]",
            Self::DoubleArray => "double[]",
            Self::StringArray => "string[]",
            Self::BinaryArray => "binary[][]",
            Self::AttributeSet => "attribute set",
        };
        f.write_str(label)
    }
}

/// Errors from the typed [`AttributeSet`] getters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// No value is stored under the key.
    #[error("attribute {name:?} is not present")]
    Missing {
        /// Requested key.
        name: String,
    },
    /// A value exists but has a different type.
    #[error("attribute {name:?} holds {actual}, not {expected}")]
    TypeMismatch {
        /// Requested key.
        name: String,
        /// Type the caller asked for.
        expected: AttributeType,
        /// Type actually stored.
        actual: AttributeType,
    },
}

/// A typed key-value property map.
///
/// # Examples
///
/// ```
/// use geofeature_core::{AttributeError, AttributeSet};
///
/// let mut attributes = AttributeSet::new();
/// attributes.set_int("floors", 3);
/// attributes.set_string("use", "office".to_owned());
/// assert_eq!(attributes.get_int("floors"), Ok(3));
/// assert!(matches!(
///     attributes.get_long("floors"),
///     Err(AttributeError::TypeMismatch { .. })
/// ));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AttributeSet {
    values: BTreeMap<String, AttributeValue>,
}

macro_rules! typed_accessors {
    ($($get:ident, $set:ident, $variant:ident, $stored:ty, $out:ty, |$v:ident| $conv:expr;)*) => {
        impl AttributeSet {
            $(
                #[doc = concat!("Read a `", stringify!($variant), "` value.")]
                pub fn $get(&self, name: &str) -> Result<$out, AttributeError> {
                    match self.lookup(name)? {
                        AttributeValue::$variant($v) => Ok($conv),
                        other => Err(AttributeError::TypeMismatch {
                            name: name.to_owned(),
                            expected: AttributeType::$variant,
                            actual: other.attribute_type(),
                        }),
                    }
                }

                #[doc = concat!(
                    "Store a `", stringify!($variant),
                    "` value, returning any value it replaced."
                )]
                pub fn $set(&mut self, name: impl Into<String>, value: $stored) -> Option<AttributeValue> {
                    self.values.insert(name.into(), AttributeValue::$variant(value))
                }
            )*
        }
    };
}

typed_accessors! {
    get_int, set_int, Int, i32, i32, |v| *v;
    get_long, set_long, Long, i64, i64, |v| *v;
    get_double, set_double, Double, f64, f64, |v| *v;
    get_string, set_string, String, String, &str, |v| v.as_str();
    get_binary, set_binary, Binary, Vec<u8>, &[u8], |v| v.as_slice();
    get_int_array, set_int_array, IntArray, Vec<i32>, &[i32], |v| v.as_slice();
    get_long_array, set_long_array, LongArray, Vec<i64>, &[i64], |v| v.as_slice();
    get_double_array, set_double_array, DoubleArray, Vec<f64>, &[f64], |v| v.as_slice();
    get_string_array, set_string_array, StringArray, Vec<String>, &[String], |v| v.as_slice();
    get_binary_array, set_binary_array, BinaryArray, Vec<Vec<u8>>, &[Vec<u8>], |v| v.as_slice();
    get_attribute_set, set_attribute_set, AttributeSet, AttributeSet, &AttributeSet, |v| v;
}

impl AttributeSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Store any value, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.values.insert(name.into(), value.into())
    }

    /// Untyped lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Type of the value stored under `name`.
    #[must_use]
    pub fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.values.get(name).map(AttributeValue::attribute_type)
    }

    /// Whether a value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Remove and return the value stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.remove(name)
    }

    /// Keys in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Key-value pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Add every entry of `other`, replacing values under shared keys.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    fn lookup(&self, name: &str) -> Result<&AttributeValue, AttributeError> {
        self.values.get(name).ok_or_else(|| AttributeError::Missing {
            name: name.to_owned(),
        })
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeSet
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn populated() -> AttributeSet {
        let mut set = AttributeSet::new();
        set.set_int("int", 7);
        set.set_long("long", 1 << 40);
        set.set_double("double", 2.5);
        set.set_string("string", "text".to_owned());
        set.set_binary("binary", vec![1, 2, 3]);
        set.set_double_array("doubles", vec![1.0, f64::NAN]);
        set.set_binary_array("blobs", vec![vec![0], vec![1, 1]]);
        let mut nested = AttributeSet::new();
        nested.set_string("inner", "value".to_owned());
        set.set_attribute_set("nested", nested);
        set
    }

    #[rstest]
    fn typed_getters_return_stored_values(populated: AttributeSet) {
        assert_eq!(populated.get_int("int"), Ok(7));
        assert_eq!(populated.get_long("long"), Ok(1 << 40));
        assert_eq!(populated.get_string("string"), Ok("text"));
        assert_eq!(populated.get_binary("binary"), Ok(&[1_u8, 2, 3][..]));
        let nested = populated
            .get_attribute_set("nested")
            .expect("nested set should be present");
        assert_eq!(nested.get_string("inner"), Ok("value"));
    }

    #[rstest]
    fn missing_key_is_reported(populated: AttributeSet) {
        assert_eq!(
            populated.get_int("absent"),
            Err(AttributeError::Missing {
                name: "absent".to_owned()
            })
        );
    }

    #[rstest]
    fn wrong_type_is_reported(populated: AttributeSet) {
        assert_eq!(
            populated.get_string("int"),
            Err(AttributeError::TypeMismatch {
                name: "int".to_owned(),
                expected: AttributeType::String,
                actual: AttributeType::Int,
            })
        );
    }

    #[rstest]
    fn equality_is_structural_and_nan_aware(populated: AttributeSet) {
        let copy = populated.clone();
        assert_eq!(populated, copy);

        let mut changed = populated.clone();
        changed.set_double_array("doubles", vec![1.0, 2.0]);
        assert_ne!(populated, changed);
    }

    #[rstest]
    fn equal_values_of_different_types_differ() {
        let ints: AttributeSet = [("n", AttributeValue::Int(1))].into_iter().collect();
        let longs: AttributeSet = [("n", AttributeValue::Long(1))].into_iter().collect();
        assert_ne!(ints, longs);
    }

    #[rstest]
    fn merge_adds_and_replaces(mut populated: AttributeSet) {
        let update: AttributeSet = [("int", AttributeValue::Int(8)), ("new", "x".into())]
            .into_iter()
            .collect();
        populated.merge(&update);
        assert_eq!(populated.get_int("int"), Ok(8));
        assert_eq!(populated.get_string("new"), Ok("x"));
        assert!(populated.contains("binary"));
    }

    #[rstest]
    fn remove_and_clear(mut populated: AttributeSet) {
        assert!(populated.remove("int").is_some());
        assert!(!populated.contains("int"));
        assert_eq!(populated.attribute_type("long"), Some(AttributeType::Long));
        populated.clear();
        assert!(populated.is_empty());
        assert_eq!(populated.names().count(), 0);
    }
}
