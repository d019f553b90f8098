// Copyright 2024-2026, NVIDIA CORPORATION & AFFILIATES. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions
// are met:
//  * Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//  * Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//  * Neither the name of NVIDIA CORPORATION nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS ``AS IS'' AND ANY
// EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED.  IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY
// OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Typed feature values and per-example feature sets.
//!
//! A [`FeatureSet`] describes one example as an insertion-ordered mapping
//! from feature name to [`FeatureValue`]. Each value carries its complete
//! homogeneous list of elements inside the variant, so "every element of a
//! feature shares one type tag" holds by construction -- there is no runtime
//! type inspection anywhere downstream, only exhaustive matches.
//!
//! # Example
//!
//! ```rust
//! use score_pipeline::feature::{FeatureSet, FeatureValue};
//!
//! let mut set = FeatureSet::new();
//! set.insert("lp_length", FeatureValue::int(3));
//! set.insert("domain", FeatureValue::string("example.com"));
//!
//! assert_eq!(set.len(), 2);
//! assert_eq!(set.get("lp_length"), Some(&FeatureValue::int(3)));
//! ```

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FeatureValue
// ---------------------------------------------------------------------------

/// The value of a single named feature: a non-empty homogeneous list under
/// exactly one of the four supported type tags.
///
/// Scalars are represented as singleton lists, matching the record format
/// where every feature is a tagged value list.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// 64-bit floating-point elements.
    Float(Vec<f64>),
    /// Signed 64-bit integer elements.
    Int(Vec<i64>),
    /// UTF-8 string elements.
    Str(Vec<String>),
    /// Raw byte-sequence elements.
    Bytes(Vec<Vec<u8>>),
}

impl FeatureValue {
    /// Creates a singleton float value.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Float(vec![value])
    }

    /// Creates a singleton integer value.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int(vec![value])
    }

    /// Creates a singleton string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(vec![value.into()])
    }

    /// Creates a singleton raw-bytes value.
    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(vec![value.into()])
    }

    /// Returns the number of elements in the value list.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Bytes(v) => v.len(),
        }
    }

    /// Returns `true` if the value list has no elements.
    ///
    /// Empty lists are constructible (e.g. `FeatureValue::Int(vec![])`) but
    /// are rejected by the encoder as a shape error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the name of this value's type tag (`"float"`, `"int"`,
    /// `"string"` or `"bytes"`).
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Converts one JSON value into a feature value.
    ///
    /// Numbers become integers when integral and floats otherwise; strings
    /// become string features; arrays become homogeneous lists, with integer
    /// elements promoted to float when the array mixes the two numeric
    /// forms. JSON has no raw-bytes representation, so the bytes tag is never
    /// produced here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFeatureType`] for booleans, nulls, nested
    /// objects, nested arrays, and integers outside the signed 64-bit range;
    /// [`Error::InvalidFeatureShape`] for empty arrays and arrays mixing
    /// strings with numbers.
    pub fn from_json(feature: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(elements) => Self::list_from_json(feature, elements),
            _ => Ok(match JsonScalar::classify(feature, value)? {
                JsonScalar::Int(v) => Self::int(v),
                JsonScalar::Float(v) => Self::float(v),
                JsonScalar::Str(v) => Self::Str(vec![v]),
            }),
        }
    }

    /// Builds a homogeneous list value from the elements of a JSON array.
    fn list_from_json(feature: &str, elements: &[Value]) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::InvalidFeatureShape {
                feature: feature.to_owned(),
                detail: "empty value list".to_owned(),
            });
        }

        let scalars = elements
            .iter()
            .map(|v| JsonScalar::classify(feature, v))
            .collect::<Result<Vec<_>>>()?;

        let any_str = scalars.iter().any(|s| matches!(s, JsonScalar::Str(_)));
        let any_num = scalars.iter().any(|s| !matches!(s, JsonScalar::Str(_)));
        if any_str && any_num {
            return Err(Error::InvalidFeatureShape {
                feature: feature.to_owned(),
                detail: "mixed string and numeric elements".to_owned(),
            });
        }

        if any_str {
            let values = scalars
                .into_iter()
                .map(|s| match s {
                    JsonScalar::Str(v) => v,
                    _ => unreachable!("numeric element in all-string list"),
                })
                .collect();
            return Ok(Self::Str(values));
        }

        // All numeric: keep the integer tag only when every element is
        // integral, otherwise promote the whole list to float.
        if scalars.iter().all(|s| matches!(s, JsonScalar::Int(_))) {
            let values = scalars
                .into_iter()
                .map(|s| match s {
                    JsonScalar::Int(v) => v,
                    _ => unreachable!("non-integer element in all-integer list"),
                })
                .collect();
            Ok(Self::Int(values))
        } else {
            let values = scalars
                .into_iter()
                .map(|s| match s {
                    JsonScalar::Int(v) => v as f64,
                    JsonScalar::Float(v) => v,
                    JsonScalar::Str(_) => unreachable!("string element in numeric list"),
                })
                .collect();
            Ok(Self::Float(values))
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Float(values)
    }
}

impl From<Vec<i64>> for FeatureValue {
    fn from(values: Vec<i64>) -> Self {
        Self::Int(values)
    }
}

/// A single JSON scalar classified under the feature type tags.
enum JsonScalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl JsonScalar {
    /// Classifies one non-array JSON value, rejecting everything that has no
    /// feature type tag.
    fn classify(feature: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(Self::Int(v))
                } else if n.is_u64() {
                    Err(Error::InvalidFeatureType {
                        feature: feature.to_owned(),
                        found: format!("integer {n} outside the signed 64-bit range"),
                    })
                } else {
                    // as_f64 is infallible for finite JSON numbers.
                    Ok(Self::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Bool(_) => Err(Error::InvalidFeatureType {
                feature: feature.to_owned(),
                found: "boolean".to_owned(),
            }),
            Value::Null => Err(Error::InvalidFeatureType {
                feature: feature.to_owned(),
                found: "null".to_owned(),
            }),
            Value::Object(_) => Err(Error::InvalidFeatureType {
                feature: feature.to_owned(),
                found: "nested JSON object".to_owned(),
            }),
            Value::Array(_) => Err(Error::InvalidFeatureType {
                feature: feature.to_owned(),
                found: "nested array".to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// One example's named features, in insertion order.
///
/// Names are unique; inserting under an existing name replaces the previous
/// value. Equality is order-insensitive (map semantics), which is what makes
/// encode/decode round-trips comparable even though the canonical encoding
/// sorts names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    features: IndexMap<String, FeatureValue>,
}

impl FeatureSet {
    /// Creates an empty feature set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a feature, returning the previous value if the name was
    /// already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FeatureValue>,
    ) -> Option<FeatureValue> {
        self.features.insert(name.into(), value.into())
    }

    /// Returns the value for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    /// Returns the number of features in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the set has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a feature set from a JSON object.
    ///
    /// This is the DirectJson path: every member becomes one feature via
    /// [`FeatureValue::from_json`], preserving the object's member order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `value` is not a JSON object,
    /// or the per-feature conversion errors described on
    /// [`FeatureValue::from_json`].
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::MalformedInput(format!("example must be a JSON object, got: {value}"))
        })?;

        let mut set = Self::new();
        for (name, member) in object {
            let value = FeatureValue::from_json(name, member)?;
            set.insert(name.clone(), value);
        }
        Ok(set)
    }
}

impl<S: Into<String>, V: Into<FeatureValue>> FromIterator<(S, V)> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_constructors_are_singleton_lists() {
        assert_eq!(FeatureValue::float(3.5), FeatureValue::Float(vec![3.5]));
        assert_eq!(FeatureValue::int(7), FeatureValue::Int(vec![7]));
        assert_eq!(
            FeatureValue::string("hi"),
            FeatureValue::Str(vec!["hi".to_owned()])
        );
        assert_eq!(
            FeatureValue::bytes(vec![1u8, 2]),
            FeatureValue::Bytes(vec![vec![1, 2]])
        );
        assert_eq!(FeatureValue::int(7).len(), 1);
        assert!(!FeatureValue::int(7).is_empty());
    }

    #[test]
    fn json_number_dispatch() {
        let float = FeatureValue::from_json("x", &serde_json::json!(3.5)).unwrap();
        assert_eq!(float, FeatureValue::float(3.5));

        let int = FeatureValue::from_json("x", &serde_json::json!(7)).unwrap();
        assert_eq!(int, FeatureValue::int(7));

        let string = FeatureValue::from_json("x", &serde_json::json!("hi")).unwrap();
        assert_eq!(string, FeatureValue::string("hi"));
    }

    #[test]
    fn json_unsupported_types_are_rejected() {
        for value in [
            serde_json::json!(true),
            serde_json::json!(null),
            serde_json::json!({"nested": 1}),
            serde_json::json!([[1, 2]]),
        ] {
            let err = FeatureValue::from_json("x", &value).unwrap_err();
            assert!(
                matches!(err, Error::InvalidFeatureType { ref feature, .. } if feature == "x"),
                "expected InvalidFeatureType for {value}, got: {err}"
            );
        }
    }

    #[test]
    fn json_u64_overflow_is_a_type_error() {
        let value = serde_json::json!(u64::MAX);
        let err = FeatureValue::from_json("big", &value).unwrap_err();
        assert!(matches!(err, Error::InvalidFeatureType { .. }), "got: {err}");
    }

    #[test]
    fn json_lists_keep_or_promote_numeric_tags() {
        let ints = FeatureValue::from_json("x", &serde_json::json!([1, 2, 3])).unwrap();
        assert_eq!(ints, FeatureValue::Int(vec![1, 2, 3]));

        let promoted = FeatureValue::from_json("x", &serde_json::json!([1, 2.5])).unwrap();
        assert_eq!(promoted, FeatureValue::Float(vec![1.0, 2.5]));

        let strings = FeatureValue::from_json("x", &serde_json::json!(["a", "b"])).unwrap();
        assert_eq!(
            strings,
            FeatureValue::Str(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn json_bad_lists_are_shape_errors() {
        let empty = FeatureValue::from_json("x", &serde_json::json!([])).unwrap_err();
        assert!(matches!(empty, Error::InvalidFeatureShape { .. }));

        let mixed = FeatureValue::from_json("x", &serde_json::json!([1, "a"])).unwrap_err();
        assert!(matches!(mixed, Error::InvalidFeatureShape { .. }));
    }

    #[test]
    fn feature_set_preserves_insertion_order() {
        let set: FeatureSet = [
            ("lp_length", FeatureValue::int(3)),
            ("domain", FeatureValue::string("example.com")),
            ("lp_num", FeatureValue::int(0)),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["lp_length", "domain", "lp_num"]);
    }

    #[test]
    fn feature_set_equality_ignores_order() {
        let forward: FeatureSet = [("a", FeatureValue::int(1)), ("b", FeatureValue::int(2))]
            .into_iter()
            .collect();
        let reverse: FeatureSet = [("b", FeatureValue::int(2)), ("a", FeatureValue::int(1))]
            .into_iter()
            .collect();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn feature_set_insert_replaces_duplicates() {
        let mut set = FeatureSet::new();
        assert!(set.insert("x", FeatureValue::int(1)).is_none());
        let previous = set.insert("x", FeatureValue::int(2));
        assert_eq!(previous, Some(FeatureValue::int(1)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("x"), Some(&FeatureValue::int(2)));
    }

    #[test]
    fn feature_set_from_json_object() {
        let value = serde_json::json!({"a": 1, "x": 3.5, "s": "hi"});
        let set = FeatureSet::from_json(&value).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("a"), Some(&FeatureValue::int(1)));
        assert_eq!(set.get("x"), Some(&FeatureValue::float(3.5)));
        assert_eq!(set.get("s"), Some(&FeatureValue::string("hi")));
    }

    #[test]
    fn feature_set_from_json_rejects_non_objects() {
        let err = FeatureSet::from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)), "got: {err}");

        let err = FeatureSet::from_json(&serde_json::json!(5)).unwrap_err();
        assert!(format!("{err}").contains("JSON object"));
    }
}
