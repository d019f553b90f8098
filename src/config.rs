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

//! Process-wide scoring configuration.
//!
//! A [`ScoringConfig`] is built once at startup and handed to the pipeline
//! by value; nothing reads configuration from ambient state afterwards. The
//! struct deserializes with serde so hosts can load it from whatever source
//! they already use, with every field except the model reference carrying
//! the conventional default.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::IntegerEncoding;

/// Which built-in example source the pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// The payload is JSON feature objects; no domain extraction.
    #[default]
    DirectJson,
    /// The payload is `;`-separated email addresses turned into lexical
    /// features.
    EmailLexical,
}

/// Immutable configuration for a [`Scorer`](crate::pipeline::Scorer).
///
/// # Example
///
/// ```rust
/// use score_pipeline::config::{ExtractorKind, ScoringConfig};
///
/// let config = ScoringConfig::new("models/spam")
///     .with_extractor(ExtractorKind::EmailLexical);
///
/// assert_eq!(config.signature(), "predict");
/// assert_eq!(config.tags(), ["serve"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    model: String,
    tags: Vec<String>,
    signature: String,
    input_key: String,
    output_key: String,
    extractor: ExtractorKind,
    integer_encoding: IntegerEncoding,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            tags: vec!["serve".to_owned()],
            signature: "predict".to_owned(),
            input_key: "examples".to_owned(),
            output_key: "probabilities".to_owned(),
            extractor: ExtractorKind::default(),
            integer_encoding: IntegerEncoding::default(),
        }
    }
}

impl ScoringConfig {
    /// Creates a configuration for the given model reference with every
    /// other field at its default.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets the tag set selecting the model graph variant.
    #[must_use]
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Sets the signature key selecting the model's input/output contract.
    #[must_use]
    pub fn with_signature(self, signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            ..self
        }
    }

    /// Sets the named input the encoded examples are fed under.
    #[must_use]
    pub fn with_input_key(self, key: impl Into<String>) -> Self {
        Self {
            input_key: key.into(),
            ..self
        }
    }

    /// Sets the named output the score is projected from.
    #[must_use]
    pub fn with_output_key(self, key: impl Into<String>) -> Self {
        Self {
            output_key: key.into(),
            ..self
        }
    }

    /// Selects the built-in example source.
    #[must_use]
    pub fn with_extractor(self, extractor: ExtractorKind) -> Self {
        Self { extractor, ..self }
    }

    /// Sets the integer feature encoding policy.
    #[must_use]
    pub fn with_integer_encoding(self, integer_encoding: IntegerEncoding) -> Self {
        Self {
            integer_encoding,
            ..self
        }
    }

    /// The model reference (a name or artifact path, backend-defined).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The tag set selecting the model graph variant.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The signature key.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The named input the encoded examples are fed under.
    #[must_use]
    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    /// The named output the score is projected from.
    #[must_use]
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// The configured example source.
    #[must_use]
    pub fn extractor(&self) -> ExtractorKind {
        self.extractor
    }

    /// The integer feature encoding policy.
    #[must_use]
    pub fn integer_encoding(&self) -> IntegerEncoding {
        self.integer_encoding
    }

    /// Checks the configuration is complete enough to serve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first empty required field.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(Error::Config("model reference is empty".to_owned()));
        }
        if self.tags.is_empty() {
            return Err(Error::Config("tag set is empty".to_owned()));
        }
        if self.signature.is_empty() {
            return Err(Error::Config("signature key is empty".to_owned()));
        }
        if self.input_key.is_empty() {
            return Err(Error::Config("input key is empty".to_owned()));
        }
        if self.output_key.is_empty() {
            return Err(Error::Config("output key is empty".to_owned()));
        }
        Ok(())
    }
}
