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

//! Turning a raw request payload into per-example feature sets.
//!
//! Two source modes exist. [`ExampleSource::DirectJson`] parses the whole
//! payload as a JSON document whose object(s) already are feature mappings.
//! [`ExampleSource::Extractor`] splits the payload on `;` and hands each
//! token to a domain [`Extractor`] that knows how to validate it and derive
//! features from it (the built-in [`EmailLexical`] derives lexical features
//! from an email address).
//!
//! Either way the result is one [`Extracted`] slot per example, in payload
//! order. A slot can be invalid without failing the request; only two
//! conditions reject the payload outright: a DirectJson payload that is not
//! parseable JSON, and an extractor batch in which every token fails
//! validation.

use log::{debug, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::feature::{FeatureSet, FeatureValue};

/// Hint appended to the rejection message when a payload fails JSON parsing.
const JSON_FORMAT_HINT: &str = "Please enter JSON-formatted data to represent your features.";

/// Hint appended to rejection messages for inputs [`EmailLexical`] refuses.
const EMAIL_FORMAT_HINT: &str = "Please enter emails in the form: \"username@domain\".";

// ---------------------------------------------------------------------------
// Batch splitting
// ---------------------------------------------------------------------------

/// Splits a compound payload into per-example tokens on `;`.
///
/// No validation happens here. An empty payload yields a single empty token
/// rather than an empty batch, so result positions always line up with
/// payload positions.
///
/// # Example
///
/// ```rust
/// use score_pipeline::extract::split_batch;
///
/// assert_eq!(split_batch("a@x.io;b@y.io"), ["a@x.io", "b@y.io"]);
/// assert_eq!(split_batch(""), [""]);
/// ```
#[must_use]
pub fn split_batch(payload: &str) -> Vec<&str> {
    payload.split(';').collect()
}

// ---------------------------------------------------------------------------
// Extractor trait
// ---------------------------------------------------------------------------

/// A domain-specific parser turning one raw token into named features.
///
/// Implementations are chosen once at startup and shared across requests, so
/// they must be `Send + Sync`. The pipeline calls [`validate`](Self::validate)
/// before [`extract`](Self::extract); a token that fails validation occupies
/// its result slot as an error instead of reaching the encoder.
pub trait Extractor: Send + Sync {
    /// Returns `true` if `token` is well-formed input for this domain.
    fn validate(&self, token: &str) -> bool;

    /// Derives the features describing `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` cannot be parsed; for tokens accepted by
    /// [`validate`](Self::validate) this must succeed.
    fn extract(&self, token: &str) -> Result<FeatureSet>;

    /// One sentence telling the caller what well-formed input looks like,
    /// appended to rejection messages.
    fn format_hint(&self) -> &str;
}

// ---------------------------------------------------------------------------
// EmailLexical
// ---------------------------------------------------------------------------

/// Extracts lexical features from an email address.
///
/// A token is valid when it contains exactly one `@`. The features, in
/// order: `lp_length`, `lp_alpha`, `lp_num` and `lp_other` count the local
/// part's characters in total and per class, `domain_length` counts the
/// domain's characters, and `domain` carries the domain itself. Counts are
/// Unicode-aware (characters, not bytes); each character counts in exactly
/// one class (letter-numbers such as Roman numerals count as alphabetic),
/// so the three class counts always sum to `lp_length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailLexical;

impl EmailLexical {
    /// Splits `token` into local part and domain, or `None` if the token
    /// does not contain exactly one `@`.
    fn parse(token: &str) -> Option<(&str, &str)> {
        match token.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => Some((local, domain)),
            _ => None,
        }
    }
}

impl Extractor for EmailLexical {
    fn validate(&self, token: &str) -> bool {
        Self::parse(token).is_some()
    }

    fn extract(&self, token: &str) -> Result<FeatureSet> {
        let (local, domain) =
            Self::parse(token).ok_or_else(|| not_valid_data(token, EMAIL_FORMAT_HINT))?;

        let lp_length = local.chars().count() as i64;

        // is_alphabetic and is_numeric both match letter-numbers such as
        // Roman numerals, so each character is classified exactly once.
        let (mut lp_alpha, mut lp_num, mut lp_other) = (0i64, 0i64, 0i64);
        for c in local.chars() {
            if c.is_alphabetic() {
                lp_alpha += 1;
            } else if c.is_numeric() {
                lp_num += 1;
            } else {
                lp_other += 1;
            }
        }

        let mut features = FeatureSet::new();
        features.insert("lp_length", FeatureValue::int(lp_length));
        features.insert("lp_alpha", FeatureValue::int(lp_alpha));
        features.insert("lp_num", FeatureValue::int(lp_num));
        features.insert("lp_other", FeatureValue::int(lp_other));
        features.insert(
            "domain_length",
            FeatureValue::int(domain.chars().count() as i64),
        );
        features.insert("domain", FeatureValue::string(domain));
        Ok(features)
    }

    fn format_hint(&self) -> &str {
        EMAIL_FORMAT_HINT
    }
}

// ---------------------------------------------------------------------------
// Example sources
// ---------------------------------------------------------------------------

/// One positional slot of a batch after extraction.
#[derive(Debug)]
pub enum Extracted {
    /// The example's features, ready for encoding.
    Features(FeatureSet),
    /// The example failed validation or conversion; the batch continues
    /// without it and the slot reports this error.
    Invalid(Error),
}

impl Extracted {
    /// Returns `true` for the [`Extracted::Features`] variant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Features(_))
    }
}

/// The configured way of turning a payload into examples.
///
/// Resolved once at startup from the extractor configuration; requests never
/// switch modes.
pub enum ExampleSource {
    /// The payload is itself JSON: one feature object, or an array of them.
    /// The payload is not split on `;` in this mode.
    DirectJson,
    /// The payload is split on `;` and each token goes through the given
    /// domain extractor.
    Extractor(Box<dyn Extractor>),
}

impl std::fmt::Debug for ExampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectJson => f.write_str("DirectJson"),
            Self::Extractor(_) => f.write_str("Extractor(..)"),
        }
    }
}

impl ExampleSource {
    /// Produces the ordered example slots for `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] when nothing in the payload can be
    /// scored: a DirectJson payload that does not parse as a JSON object or
    /// array, or an extractor batch in which every token fails validation.
    /// Individual bad examples inside an otherwise usable payload come back
    /// as [`Extracted::Invalid`] slots instead.
    pub fn examples(&self, payload: &str) -> Result<Vec<Extracted>> {
        match self {
            Self::DirectJson => Self::json_examples(payload),
            Self::Extractor(extractor) => Self::extractor_examples(extractor.as_ref(), payload),
        }
    }

    fn json_examples(payload: &str) -> Result<Vec<Extracted>> {
        let document: Value = serde_json::from_str(payload)
            .map_err(|_| not_valid_data(payload, JSON_FORMAT_HINT))?;

        let batch = match document {
            Value::Object(_) => vec![document],
            Value::Array(elements) => elements,
            // A bare scalar parses but cannot be shaped into a batch.
            _ => return Err(not_valid_data(payload, JSON_FORMAT_HINT)),
        };
        debug!("parsed payload into {} example(s)", batch.len());

        let slots = batch
            .iter()
            .enumerate()
            .map(|(index, element)| match FeatureSet::from_json(element) {
                Ok(features) => Extracted::Features(features),
                Err(err) => {
                    warn!("example {index} dropped: {err}");
                    Extracted::Invalid(err)
                }
            })
            .collect();
        Ok(slots)
    }

    fn extractor_examples(extractor: &dyn Extractor, payload: &str) -> Result<Vec<Extracted>> {
        let tokens = split_batch(payload);
        let mut slots = Vec::with_capacity(tokens.len());

        for (index, token) in tokens.into_iter().enumerate() {
            if !extractor.validate(token) {
                let err = not_valid_data(token, extractor.format_hint());
                warn!("example {index} dropped: {err}");
                slots.push(Extracted::Invalid(err));
                continue;
            }
            match extractor.extract(token) {
                Ok(features) => {
                    debug!("example {index}: extracted {} feature(s)", features.len());
                    slots.push(Extracted::Features(features));
                }
                Err(err) => {
                    warn!("example {index} dropped: {err}");
                    slots.push(Extracted::Invalid(err));
                }
            }
        }

        // Mirrors the whole-batch rejection for inputs with nothing to score.
        if slots.iter().all(|slot| !slot.is_valid()) {
            return Err(not_valid_data(payload, extractor.format_hint()));
        }
        Ok(slots)
    }
}

/// Builds the user-facing rejection for unusable input.
fn not_valid_data(payload: &str, hint: &str) -> Error {
    Error::MalformedInput(format!("\"{payload}\" is not valid data. {hint}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
