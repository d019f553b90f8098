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

//! Integration tests for the scoring pipeline.
//!
//! Tests that require a running scoring backend are gated behind the
//! `SCORING_TEST_URL` environment variable (with `SCORING_TEST_MODEL`
//! naming the served model, default `spam`). When the variable is not set,
//! only offline tests are executed; those drive the full pipeline against
//! in-process gateways.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use score_pipeline::config::{ExtractorKind, ScoringConfig};
use score_pipeline::error::{Error, Result};
use score_pipeline::feature::{FeatureSet, FeatureValue};
use score_pipeline::gateway::{
    GatewayOptions, GrpcGateway, InferenceGateway, InferenceRequest, InferenceResponse,
    OutputTensor, StaticGateway,
};
use score_pipeline::pipeline::{result_label, ExampleOutcome, ResponseBody, Scorer};
use score_pipeline::record::{ExampleEncoder, IntegerEncoding};

/// Helper to get the scoring backend URL from the environment.
fn backend_url() -> Option<String> {
    std::env::var("SCORING_TEST_URL").ok()
}

/// The model the online backend serves.
fn backend_model() -> String {
    std::env::var("SCORING_TEST_MODEL").unwrap_or_else(|_| "spam".to_owned())
}

/// A one-output response with the given positive-class probability.
fn probabilities(positive: f64) -> InferenceResponse {
    InferenceResponse::new().with_output(
        "probabilities",
        OutputTensor::matrix(vec![vec![1.0 - positive, positive]]),
    )
}

/// Gateway that decodes every record it receives before answering, so tests
/// can assert on the features the backend would see.
struct DecodingGateway {
    seen: Mutex<Vec<FeatureSet>>,
    outputs: InferenceResponse,
}

impl DecodingGateway {
    fn new(outputs: InferenceResponse) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            outputs,
        }
    }
}

#[async_trait]
impl InferenceGateway for DecodingGateway {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        let encoder = ExampleEncoder::new();
        for (_key, examples) in request.inputs() {
            for example in examples {
                self.seen.lock().unwrap().push(encoder.decode(example)?);
            }
        }
        Ok(self.outputs.clone())
    }
}

// ---------------------------------------------------------------------------
// Offline tests (no backend required)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn email_pipeline_end_to_end() {
    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]]));
    let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
    let scorer = Scorer::new(config, Arc::new(gateway)).unwrap();

    let scores = scorer.score("bob@example.com;nodomain").await.unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(scores["ex0-res"].score(), Some(0.8));
    assert_eq!(scores["ex1-res"].score(), None);

    let body = serde_json::to_value(ResponseBody::Scores(scores)).unwrap();
    assert_eq!(body["ex0-res"], serde_json::json!(0.8));
    assert!(body["ex1-res"]["error"]
        .as_str()
        .unwrap()
        .contains("not valid data"));
}

#[tokio::test]
async fn gateway_receives_decodable_records() {
    let gateway = Arc::new(DecodingGateway::new(probabilities(0.8)));
    let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
    let scorer = Scorer::new(config, Arc::clone(&gateway) as Arc<dyn InferenceGateway>).unwrap();

    scorer.score("bob@example.com").await.unwrap();

    let seen = gateway.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let features = &seen[0];
    assert_eq!(features.get("lp_length"), Some(&FeatureValue::int(3)));
    assert_eq!(features.get("lp_alpha"), Some(&FeatureValue::int(3)));
    assert_eq!(features.get("lp_num"), Some(&FeatureValue::int(0)));
    assert_eq!(features.get("lp_other"), Some(&FeatureValue::int(0)));
    assert_eq!(features.get("domain_length"), Some(&FeatureValue::int(11)));
    assert_eq!(
        features.get("domain"),
        Some(&FeatureValue::string("example.com"))
    );
}

#[tokio::test]
async fn integer_policy_reaches_the_wire() {
    let gateway = Arc::new(DecodingGateway::new(probabilities(0.6)));
    let config = ScoringConfig::new("spam").with_integer_encoding(IntegerEncoding::WidenToFloat);
    let scorer = Scorer::new(config, Arc::clone(&gateway) as Arc<dyn InferenceGateway>).unwrap();

    scorer.score(r#"{"x": 7}"#).await.unwrap();

    let seen = gateway.seen.lock().unwrap();
    assert_eq!(seen[0].get("x"), Some(&FeatureValue::float(7.0)));
}

#[tokio::test]
async fn result_mapping_matches_batch_cardinality() {
    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.5, 0.5]]));
    let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
    let scorer = Scorer::new(config, Arc::new(gateway)).unwrap();

    let scores = scorer.score("a@x.io;bad;b@y.io").await.unwrap();

    let labels: Vec<&str> = scores.keys().map(String::as_str).collect();
    let expected: Vec<String> = (0..3).map(result_label).collect();
    assert_eq!(labels, expected);
}

#[tokio::test]
async fn direct_json_object_and_array_agree() {
    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.3, 0.7]]));
    let scorer = Scorer::new(ScoringConfig::new("spam"), Arc::new(gateway)).unwrap();

    let object = scorer.score(r#"{"a": 1, "b": "hi"}"#).await.unwrap();
    let array = scorer.score(r#"[{"a": 1, "b": "hi"}]"#).await.unwrap();
    assert_eq!(object, array);
}

#[tokio::test]
async fn malformed_payload_is_a_single_error_body() {
    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.3, 0.7]]));
    let scorer = Scorer::new(ScoringConfig::new("spam"), Arc::new(gateway)).unwrap();

    let result = scorer.score("not-json").await;
    assert!(result.is_err());

    let body = serde_json::to_value(ResponseBody::from(result)).unwrap();
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1, "error body must carry nothing but the error");
    assert!(object["error"]
        .as_str()
        .unwrap()
        .contains("Please enter JSON-formatted data"));
}

#[test]
fn gateway_options_builder_chain() {
    let _options = GatewayOptions::default()
        .connect_timeout(Duration::from_secs(10))
        .request_timeout(Duration::from_secs(30))
        .max_message_size(256 * 1024 * 1024);
}

#[tokio::test]
async fn connect_rejects_invalid_urls() {
    let err = GrpcGateway::connect("not a url").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got: {err}");
}

#[tokio::test]
async fn connect_to_unroutable_address_fails() {
    // Use TEST-NET (RFC 5737) address which is guaranteed non-routable,
    // with a short timeout to avoid long waits.
    let options = GatewayOptions::default().connect_timeout(Duration::from_millis(200));
    let result = GrpcGateway::connect_with_options("http://192.0.2.1:1", options).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Online tests (require SCORING_TEST_URL)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn online_email_batch_scores() {
    let Some(url) = backend_url() else {
        eprintln!("Skipping online test: SCORING_TEST_URL not set");
        return;
    };
    let gateway = GrpcGateway::connect(&url).await.unwrap();
    let config = ScoringConfig::new(backend_model()).with_extractor(ExtractorKind::EmailLexical);
    let scorer = Scorer::new(config, Arc::new(gateway)).unwrap();

    let scores = scorer.score("bob@example.com").await.unwrap();
    match scores["ex0-res"] {
        ExampleOutcome::Score(score) => {
            assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
        }
        ref other => panic!("expected a score, got: {other:?}"),
    }
}

#[tokio::test]
async fn online_unknown_model_fails() {
    let Some(url) = backend_url() else {
        eprintln!("Skipping online test: SCORING_TEST_URL not set");
        return;
    };
    let gateway = GrpcGateway::connect(&url).await.unwrap();

    let request = InferenceRequest::new(
        "definitely-not-a-model",
        vec!["serve".to_owned()],
        "predict",
    );
    let result = gateway.infer(request).await;
    assert!(result.is_err(), "inference against a missing model must fail");
}
