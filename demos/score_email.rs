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

//! Email scoring walkthrough.
//!
//! Splits a `;`-separated payload of email addresses, derives lexical
//! features per address, and scores each example. Runs against an in-memory
//! backend so it works without any serving infrastructure; swap the
//! `StaticGateway` for `GrpcGateway::connect(url)` to score against a real
//! one.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example score_email
//! ```
//!
//! Optionally pass a custom payload (and turn on pipeline logs):
//!
//! ```bash
//! RUST_LOG=debug cargo run --example score_email -- "alice@corp.example;not-an-email"
//! ```

use std::sync::Arc;

use score_pipeline::config::{ExtractorKind, ScoringConfig};
use score_pipeline::gateway::{OutputTensor, StaticGateway};
use score_pipeline::pipeline::{ExampleOutcome, ResponseBody, Scorer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let payload = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bob@example.com;nodomain;carol2@mail.example".to_owned());

    // -- Pipeline setup ------------------------------------------------------

    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]]));

    let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
    let scorer = Scorer::new(config, Arc::new(gateway))?;

    // -- Scoring -------------------------------------------------------------

    println!("Scoring payload: {payload}");
    match scorer.score(&payload).await {
        Ok(scores) => {
            for (label, outcome) in &scores {
                match outcome {
                    ExampleOutcome::Score(score) => println!("  {label}: {score}"),
                    ExampleOutcome::Invalid { error } => println!("  {label}: rejected ({error})"),
                }
            }
            let body = serde_json::to_string_pretty(&ResponseBody::Scores(scores))?;
            println!("Response body:\n{body}");
        }
        Err(err) => println!("Request rejected: {err}"),
    }

    // -- Whole-batch rejection -----------------------------------------------

    // When no token validates, the request fails as one error body instead
    // of a mapping full of invalid slots.
    let rejected = ResponseBody::from(scorer.score("nonsense;more-nonsense").await);
    println!(
        "\nAll-invalid payload produces: {}",
        serde_json::to_string(&rejected)?
    );

    Ok(())
}
