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

//! The scoring pipeline: payload in, labeled probabilities out.
//!
//! [`Scorer`] wires the stages together: the configured example source turns
//! the payload into per-example feature sets, the encoder serializes each
//! one, the gateway scores them, and the projector assembles a [`ScoreMap`]
//! keyed `ex0-res`, `ex1-res`, ... in payload order.
//!
//! A bad example does not fail the batch: its slot carries the error while
//! the rest score normally. Only three conditions fail the whole request:
//! a payload with nothing scorable in it (unparseable JSON, or every token
//! invalid), a misconfiguration caught at construction, and a backend
//! failure.
//!
//! # Example
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> score_pipeline::error::Result<()> {
//! use std::sync::Arc;
//!
//! use score_pipeline::config::ScoringConfig;
//! use score_pipeline::gateway::{OutputTensor, StaticGateway};
//! use score_pipeline::pipeline::Scorer;
//!
//! let gateway = StaticGateway::new("spam")
//!     .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]]));
//! let scorer = Scorer::new(ScoringConfig::new("spam"), Arc::new(gateway))?;
//!
//! let scores = scorer.score(r#"{"a": 1}"#).await?;
//! assert_eq!(scores["ex0-res"].score(), Some(0.8));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ExtractorKind, ScoringConfig};
use crate::error::{Error, Result};
use crate::extract::{EmailLexical, ExampleSource, Extracted, Extractor};
use crate::gateway::{InferenceGateway, InferenceRequest};
use crate::record::{EncodedExample, ExampleEncoder};

/// The response label for batch position `index`.
///
/// # Example
///
/// ```rust
/// use score_pipeline::pipeline::result_label;
/// assert_eq!(result_label(0), "ex0-res");
/// ```
#[must_use]
pub fn result_label(index: usize) -> String {
    format!("ex{index}-res")
}

// ---------------------------------------------------------------------------
// Outcomes and response bodies
// ---------------------------------------------------------------------------

/// What one batch position produced.
///
/// Serializes untagged: a scored example is a bare number, an invalid one is
/// an `{"error": ...}` object in its slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleOutcome {
    /// The positive-class probability for a scored example.
    Score(f64),
    /// The example never reached the model; the message says why.
    Invalid {
        /// Human-readable reason the example was rejected.
        error: String,
    },
}

impl ExampleOutcome {
    /// Wraps a rejection reason.
    #[must_use]
    pub fn invalid(reason: impl ToString) -> Self {
        Self::Invalid {
            error: reason.to_string(),
        }
    }

    /// Returns the score, or `None` for an invalid example.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Score(score) => Some(*score),
            Self::Invalid { .. } => None,
        }
    }
}

/// The assembled result mapping: one entry per batch position, in order.
pub type ScoreMap = IndexMap<String, ExampleOutcome>;

/// The JSON body handed back to the host web layer.
///
/// Serializes untagged, producing the two documented shapes: the score
/// mapping on success, `{"error": "..."}` on a whole-request failure. The
/// choice of HTTP status code stays with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Per-example results.
    Scores(ScoreMap),
    /// A whole-request failure.
    Error {
        /// Human-readable failure message.
        error: String,
    },
}

impl From<Result<ScoreMap>> for ResponseBody {
    fn from(result: Result<ScoreMap>) -> Self {
        match result {
            Ok(scores) => Self::Scores(scores),
            Err(err) => Self::Error {
                error: err.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// The assembled scoring pipeline.
///
/// Built once at startup from a validated [`ScoringConfig`] and a shared
/// gateway; every call to [`score`](Self::score) is an independent,
/// stateless pipeline execution, so one `Scorer` serves concurrent requests.
pub struct Scorer {
    config: ScoringConfig,
    source: ExampleSource,
    encoder: ExampleEncoder,
    gateway: Arc<dyn InferenceGateway>,
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("config", &self.config)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Scorer {
    /// Builds the pipeline with the configured built-in example source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete. This is
    /// the startup gate: a process that cannot build its `Scorer` must not
    /// serve.
    pub fn new(config: ScoringConfig, gateway: Arc<dyn InferenceGateway>) -> Result<Self> {
        let source = match config.extractor() {
            ExtractorKind::DirectJson => ExampleSource::DirectJson,
            ExtractorKind::EmailLexical => ExampleSource::Extractor(Box::new(EmailLexical)),
        };
        Self::with_source(config, source, gateway)
    }

    /// Builds the pipeline around a caller-supplied domain extractor,
    /// overriding the configured [`ExtractorKind`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is incomplete.
    pub fn with_extractor(
        config: ScoringConfig,
        extractor: Box<dyn Extractor>,
        gateway: Arc<dyn InferenceGateway>,
    ) -> Result<Self> {
        Self::with_source(config, ExampleSource::Extractor(extractor), gateway)
    }

    fn with_source(
        config: ScoringConfig,
        source: ExampleSource,
        gateway: Arc<dyn InferenceGateway>,
    ) -> Result<Self> {
        config.validate()?;
        let encoder = ExampleEncoder::new().with_integer_encoding(config.integer_encoding());
        Ok(Self {
            config,
            source,
            encoder,
            gateway,
        })
    }

    /// The configuration the pipeline was built with.
    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores one request payload.
    ///
    /// Returns one entry per batch position under the label
    /// `ex<position>-res`: the positive-class probability for examples that
    /// scored, an [`ExampleOutcome::Invalid`] marker for examples that
    /// failed extraction or encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] when nothing in the payload is
    /// scorable, and propagates gateway errors unchanged (a backend that
    /// cannot score one example cannot score any).
    pub async fn score(&self, payload: &str) -> Result<ScoreMap> {
        debug!("scoring payload of {} byte(s)", payload.len());
        let slots = self.source.examples(payload)?;

        let mut results = ScoreMap::new();
        for (index, slot) in slots.into_iter().enumerate() {
            let outcome = match slot {
                Extracted::Features(features) => match self.encoder.encode(&features) {
                    Ok(example) => ExampleOutcome::Score(self.infer_one(example).await?),
                    Err(err) => {
                        warn!("example {index} could not be encoded: {err}");
                        ExampleOutcome::invalid(err)
                    }
                },
                Extracted::Invalid(err) => ExampleOutcome::invalid(err),
            };
            results.insert(result_label(index), outcome);
        }
        debug!("scored {} example(s)", results.len());
        Ok(results)
    }

    /// Runs one encoded example through the gateway and projects its score.
    async fn infer_one(&self, example: EncodedExample) -> Result<f64> {
        let request = InferenceRequest::new(
            self.config.model(),
            self.config.tags().to_vec(),
            self.config.signature(),
        )
        .with_input(self.config.input_key(), vec![example]);

        let response = self.gateway.infer(request).await?;

        let key = self.config.output_key();
        let Some(tensor) = response.output(key) else {
            let available = response.output_keys();
            error!("no \"{key}\" output in response; available outputs: {available:?}");
            return Err(Error::UnexpectedResponse(format!(
                "no \"{key}\" output in response; available outputs: {available:?}"
            )));
        };

        tensor.positive_class_score().ok_or_else(|| {
            error!("output \"{key}\" has unexpected shape {:?}", tensor.shape());
            Error::UnexpectedOutputShape {
                key: key.to_owned(),
                shape: tensor.shape().to_vec(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ExtractorKind;
    use crate::feature::{FeatureSet, FeatureValue};
    use crate::gateway::{InferenceResponse, OutputTensor, StaticGateway};

    fn spam_gateway() -> Arc<StaticGateway> {
        Arc::new(
            StaticGateway::new("spam")
                .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]])),
        )
    }

    fn json_scorer() -> Scorer {
        Scorer::new(ScoringConfig::new("spam"), spam_gateway()).unwrap()
    }

    fn email_scorer() -> Scorer {
        let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
        Scorer::new(config, spam_gateway()).unwrap()
    }

    /// Gateway that records every request and answers with fixed outputs.
    struct RecordingGateway {
        calls: Mutex<Vec<InferenceRequest>>,
        outputs: InferenceResponse,
    }

    impl RecordingGateway {
        fn new(outputs: InferenceResponse) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outputs,
            }
        }
    }

    #[async_trait]
    impl InferenceGateway for RecordingGateway {
        async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
            self.calls.lock().unwrap().push(request);
            Ok(self.outputs.clone())
        }
    }

    #[tokio::test]
    async fn scores_a_single_json_object() {
        let scores = json_scorer().score(r#"{"a": 1}"#).await.unwrap();

        assert_eq!(scores.len(), 1);
        assert_eq!(scores["ex0-res"], ExampleOutcome::Score(0.8));
    }

    #[tokio::test]
    async fn object_and_singleton_array_behave_identically() {
        let scorer = json_scorer();
        let object = scorer.score(r#"{"a": 1}"#).await.unwrap();
        let array = scorer.score(r#"[{"a": 1}]"#).await.unwrap();
        assert_eq!(object, array);
    }

    #[tokio::test]
    async fn malformed_json_fails_the_whole_request() {
        let err = json_scorer().score("not-json").await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)), "got: {err}");

        let body = serde_json::to_value(ResponseBody::from(Err::<ScoreMap, _>(err))).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("error"));
    }

    #[tokio::test]
    async fn empty_json_batch_scores_to_an_empty_mapping() {
        let scores = json_scorer().score("[]").await.unwrap();
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn email_batch_keeps_invalid_slot_in_place() {
        let scores = email_scorer()
            .score("bob@example.com;nodomain")
            .await
            .unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores["ex0-res"], ExampleOutcome::Score(0.8));
        match &scores["ex1-res"] {
            ExampleOutcome::Invalid { error } => {
                assert!(error.starts_with("\"nodomain\" is not valid data."));
            }
            other => panic!("expected an invalid slot, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn result_labels_track_batch_positions() {
        let scores = email_scorer()
            .score("a@x.io;b@y.io;bad")
            .await
            .unwrap();

        let labels: Vec<&str> = scores.keys().map(String::as_str).collect();
        assert_eq!(labels, ["ex0-res", "ex1-res", "ex2-res"]);
    }

    #[tokio::test]
    async fn all_invalid_email_batch_fails_the_whole_request() {
        let err = email_scorer().score("nope;alsonope").await.unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)), "got: {err}");
    }

    #[tokio::test]
    async fn gateway_sees_one_call_per_valid_example() {
        let gateway = Arc::new(RecordingGateway::new(
            InferenceResponse::new()
                .with_output("probabilities", OutputTensor::matrix(vec![vec![0.1, 0.9]])),
        ));
        let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
        let scorer = Scorer::new(config, Arc::clone(&gateway) as Arc<dyn InferenceGateway>).unwrap();

        scorer
            .score("a@x.io;invalid;b@y.io")
            .await
            .unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        for call in calls.iter() {
            assert_eq!(call.model(), "spam");
            assert_eq!(call.tags(), ["serve"]);
            assert_eq!(call.signature(), "predict");
            let inputs: Vec<_> = call.inputs().collect();
            assert_eq!(inputs.len(), 1);
            let (key, examples) = inputs[0];
            assert_eq!(key, "examples");
            assert_eq!(examples.len(), 1);
        }
    }

    #[tokio::test]
    async fn unknown_input_key_aborts_the_request() {
        let config = ScoringConfig::new("spam").with_input_key("inputs");
        let scorer = Scorer::new(config, spam_gateway()).unwrap();

        let err = scorer.score(r#"{"a": 1}"#).await.unwrap_err();
        match err {
            Error::UnknownInputKey { key, available } => {
                assert_eq!(key, "inputs");
                assert_eq!(available, ["examples"]);
            }
            other => panic!("expected UnknownInputKey, got: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_output_key_aborts_the_request() {
        let gateway = Arc::new(
            StaticGateway::new("spam")
                .with_output("scores", OutputTensor::matrix(vec![vec![0.2, 0.8]])),
        );
        let scorer = Scorer::new(ScoringConfig::new("spam"), gateway).unwrap();

        let err = scorer.score(r#"{"a": 1}"#).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)), "got: {err}");
        assert!(format!("{err}").contains("scores"));
    }

    #[tokio::test]
    async fn single_column_output_is_an_unexpected_shape() {
        let gateway = Arc::new(
            StaticGateway::new("spam")
                .with_output("probabilities", OutputTensor::matrix(vec![vec![0.9]])),
        );
        let scorer = Scorer::new(ScoringConfig::new("spam"), gateway).unwrap();

        let err = scorer.score(r#"{"a": 1}"#).await.unwrap_err();
        assert!(
            matches!(err, Error::UnexpectedOutputShape { ref key, ref shape }
                if key == "probabilities" && shape == &[1, 1]),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn encode_failure_marks_the_slot_instead_of_aborting() {
        /// Extractor whose output cannot be encoded (empty value list).
        struct EmptyList;

        impl Extractor for EmptyList {
            fn validate(&self, _token: &str) -> bool {
                true
            }

            fn extract(&self, _token: &str) -> Result<FeatureSet> {
                Ok([("xs", FeatureValue::Int(vec![]))].into_iter().collect())
            }

            fn format_hint(&self) -> &str {
                "Anything goes."
            }
        }

        let scorer = Scorer::with_extractor(
            ScoringConfig::new("spam"),
            Box::new(EmptyList),
            spam_gateway(),
        )
        .unwrap();

        let scores = scorer.score("whatever").await.unwrap();
        match &scores["ex0-res"] {
            ExampleOutcome::Invalid { error } => assert!(error.contains("invalid shape")),
            other => panic!("expected an invalid slot, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn identical_requests_score_identically() {
        let scorer = email_scorer();
        let first = scorer.score("bob@example.com").await.unwrap();
        let second = scorer.score("bob@example.com").await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn construction_fails_on_incomplete_config() {
        let err = Scorer::new(ScoringConfig::default(), spam_gateway()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got: {err}");
    }

    #[test]
    fn response_bodies_serialize_to_the_documented_shapes() {
        let mut scores = ScoreMap::new();
        scores.insert(result_label(0), ExampleOutcome::Score(0.8));
        scores.insert(result_label(1), ExampleOutcome::invalid("\"x\" is not valid data."));

        let body = serde_json::to_value(ResponseBody::Scores(scores)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "ex0-res": 0.8,
                "ex1-res": {"error": "\"x\" is not valid data."},
            })
        );

        let error = serde_json::to_value(ResponseBody::Error {
            error: "boom".to_owned(),
        })
        .unwrap();
        assert_eq!(error, serde_json::json!({"error": "boom"}));
    }
}
