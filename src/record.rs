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

//! The binary record format and the feature encoder.
//!
//! An [`EncodedExample`] is one example's features serialized as a protobuf
//! [`ExampleRecord`]: a map from feature name to a value list tagged with one
//! of the four supported types. The format is self-describing (names and type
//! tags travel inside the record) and lossless for every [`FeatureValue`]
//! variant, so decoding an encoded example recovers exactly the features that
//! went in.
//!
//! The message structs are maintained by hand rather than generated, which
//! keeps the wire layout in one reviewable place and the build free of a
//! protoc dependency. Records are canonical: features are keyed through a
//! sorted map, so equal feature sets produce identical bytes no matter the
//! insertion order.

use std::collections::BTreeMap;

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feature::{FeatureSet, FeatureValue};

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

/// A list of 64-bit floats (packed `double` on the wire).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FloatList {
    #[prost(double, repeated, tag = "1")]
    pub values: Vec<f64>,
}

/// A list of signed 64-bit integers (`sint64`, so negatives stay small).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Int64List {
    #[prost(sint64, repeated, tag = "1")]
    pub values: Vec<i64>,
}

/// A list of UTF-8 strings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringList {
    #[prost(string, repeated, tag = "1")]
    pub values: Vec<String>,
}

/// A list of raw byte sequences.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub values: Vec<Vec<u8>>,
}

/// One feature's value list under exactly one type tag.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValueList {
    #[prost(oneof = "value_list::Kind", tags = "1, 2, 3, 4")]
    pub kind: Option<value_list::Kind>,
}

pub mod value_list {
    /// The type tag carried by a [`ValueList`](super::ValueList).
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        FloatList(super::FloatList),
        #[prost(message, tag = "2")]
        Int64List(super::Int64List),
        #[prost(message, tag = "3")]
        StringList(super::StringList),
        #[prost(message, tag = "4")]
        BytesList(super::BytesList),
    }
}

/// The root record message: feature name to tagged value list.
///
/// A `BTreeMap` rather than a `HashMap` keeps the field order, and therefore
/// the encoded bytes, deterministic.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExampleRecord {
    #[prost(btree_map = "string, message", tag = "1")]
    pub features: BTreeMap<String, ValueList>,
}

// ---------------------------------------------------------------------------
// EncodedExample
// ---------------------------------------------------------------------------

/// The serialized bytes of one example, ready for an inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample(Vec<u8>);

impl EncodedExample {
    /// Wraps already-serialized record bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the serialized record bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the example, returning the serialized record bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the serialized length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record is empty (an example with no features).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<EncodedExample> for Vec<u8> {
    fn from(example: EncodedExample) -> Self {
        example.into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// How integer features are written to the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerEncoding {
    /// Keep the signed 64-bit integer tag (the default; lossless).
    #[default]
    Int64,
    /// Write integers under the float tag. For models whose signatures only
    /// accept floating-point inputs; integers above 2^53 lose precision.
    WidenToFloat,
}

/// Serializes feature sets into [`EncodedExample`] records and back.
///
/// # Example
///
/// ```rust
/// use score_pipeline::feature::{FeatureSet, FeatureValue};
/// use score_pipeline::record::ExampleEncoder;
///
/// let encoder = ExampleEncoder::new();
/// let features: FeatureSet =
///     [("domain", FeatureValue::string("example.com"))].into_iter().collect();
///
/// let encoded = encoder.encode(&features)?;
/// assert_eq!(encoder.decode(&encoded)?, features);
/// # Ok::<(), score_pipeline::error::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleEncoder {
    integer_encoding: IntegerEncoding,
}

impl ExampleEncoder {
    /// Creates an encoder with the default integer policy ([`IntegerEncoding::Int64`]).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the integer encoding policy.
    #[must_use]
    pub fn with_integer_encoding(mut self, encoding: IntegerEncoding) -> Self {
        self.integer_encoding = encoding;
        self
    }

    /// Returns the active integer encoding policy.
    #[must_use]
    pub fn integer_encoding(&self) -> IntegerEncoding {
        self.integer_encoding
    }

    /// Encodes a feature set into record bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFeatureShape`] if any feature carries an
    /// empty value list.
    pub fn encode(&self, features: &FeatureSet) -> Result<EncodedExample> {
        let mut record = ExampleRecord::default();
        for (name, value) in features.iter() {
            if value.is_empty() {
                return Err(Error::InvalidFeatureShape {
                    feature: name.to_owned(),
                    detail: "empty value list".to_owned(),
                });
            }
            record
                .features
                .insert(name.to_owned(), self.tag_value(value));
        }
        Ok(EncodedExample(record.encode_to_vec()))
    }

    /// Decodes record bytes back into a feature set.
    ///
    /// Features come back in name order. Under the default integer policy
    /// this inverts [`encode`](Self::encode) exactly; under
    /// [`IntegerEncoding::WidenToFloat`] integer features decode as floats,
    /// since the record no longer remembers they were integers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordDecode`] if the bytes are not a valid record,
    /// and [`Error::InvalidFeatureShape`] if a feature entry carries no type
    /// tag.
    pub fn decode(&self, example: &EncodedExample) -> Result<FeatureSet> {
        let record = ExampleRecord::decode(example.as_bytes())?;
        let mut features = FeatureSet::new();
        for (name, value) in record.features {
            let kind = value.kind.ok_or_else(|| Error::InvalidFeatureShape {
                feature: name.clone(),
                detail: "record value has no type tag".to_owned(),
            })?;
            let value = match kind {
                value_list::Kind::FloatList(list) => FeatureValue::Float(list.values),
                value_list::Kind::Int64List(list) => FeatureValue::Int(list.values),
                value_list::Kind::StringList(list) => FeatureValue::Str(list.values),
                value_list::Kind::BytesList(list) => FeatureValue::Bytes(list.values),
            };
            features.insert(name, value);
        }
        Ok(features)
    }

    /// Maps a feature value to its wire representation under the active
    /// integer policy.
    fn tag_value(&self, value: &FeatureValue) -> ValueList {
        let kind = match value {
            FeatureValue::Float(values) => value_list::Kind::FloatList(FloatList {
                values: values.clone(),
            }),
            FeatureValue::Int(values) => match self.integer_encoding {
                IntegerEncoding::Int64 => value_list::Kind::Int64List(Int64List {
                    values: values.clone(),
                }),
                IntegerEncoding::WidenToFloat => value_list::Kind::FloatList(FloatList {
                    values: values.iter().map(|&v| v as f64).collect(),
                }),
            },
            FeatureValue::Str(values) => value_list::Kind::StringList(StringList {
                values: values.clone(),
            }),
            FeatureValue::Bytes(values) => value_list::Kind::BytesList(BytesList {
                values: values.clone(),
            }),
        };
        ValueList { kind: Some(kind) }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> FeatureSet {
        [
            ("score", FeatureValue::Float(vec![0.25, -1.5])),
            ("count", FeatureValue::Int(vec![7, -42])),
            ("domain", FeatureValue::string("example.com")),
            ("raw", FeatureValue::bytes(vec![0u8, 255, 17])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn round_trip_preserves_typed_features() {
        let encoder = ExampleEncoder::new();
        let features = sample_features();

        let encoded = encoder.encode(&features).unwrap();
        let decoded = encoder.decode(&encoded).unwrap();

        assert_eq!(decoded, features);
    }

    #[test]
    fn encoding_is_canonical_across_insertion_order() {
        let encoder = ExampleEncoder::new();
        let forward: FeatureSet = [
            ("a", FeatureValue::int(1)),
            ("b", FeatureValue::string("x")),
        ]
        .into_iter()
        .collect();
        let reverse: FeatureSet = [
            ("b", FeatureValue::string("x")),
            ("a", FeatureValue::int(1)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            encoder.encode(&forward).unwrap(),
            encoder.encode(&reverse).unwrap()
        );
    }

    #[test]
    fn empty_feature_set_encodes_to_empty_record() {
        let encoder = ExampleEncoder::new();
        let encoded = encoder.encode(&FeatureSet::new()).unwrap();
        assert!(encoded.is_empty());
        assert_eq!(encoder.decode(&encoded).unwrap(), FeatureSet::new());
    }

    #[test]
    fn empty_value_list_is_rejected() {
        let encoder = ExampleEncoder::new();
        let features: FeatureSet = [("bad", FeatureValue::Int(vec![]))].into_iter().collect();

        let err = encoder.encode(&features).unwrap_err();
        assert!(
            matches!(err, Error::InvalidFeatureShape { ref feature, .. } if feature == "bad"),
            "got: {err}"
        );
    }

    #[test]
    fn widen_to_float_rewrites_integer_tags() {
        let encoder = ExampleEncoder::new().with_integer_encoding(IntegerEncoding::WidenToFloat);
        let features: FeatureSet = [("n", FeatureValue::int(7))].into_iter().collect();

        let decoded = encoder.decode(&encoder.encode(&features).unwrap()).unwrap();
        assert_eq!(decoded.get("n"), Some(&FeatureValue::float(7.0)));
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        let encoder = ExampleEncoder::new();
        // Field 1, length-delimited, then nothing: a truncated record.
        let err = encoder
            .decode(&EncodedExample::from_bytes(vec![0x0a]))
            .unwrap_err();
        assert!(matches!(err, Error::RecordDecode(_)), "got: {err}");
    }

    #[test]
    fn value_list_without_tag_is_a_shape_error() {
        let record = ExampleRecord {
            features: [("untagged".to_owned(), ValueList { kind: None })]
                .into_iter()
                .collect(),
        };
        let encoded = EncodedExample::from_bytes(record.encode_to_vec());

        let err = ExampleEncoder::new().decode(&encoded).unwrap_err();
        assert!(matches!(err, Error::InvalidFeatureShape { .. }), "got: {err}");
    }
}
