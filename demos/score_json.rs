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

//! JSON feature-vector scoring walkthrough.
//!
//! In the DirectJson mode the payload already is the feature mapping: one
//! JSON object per example, or an array of them. Runs against an in-memory
//! backend so it works without any serving infrastructure.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example score_json
//! ```

use std::sync::Arc;

use score_pipeline::config::ScoringConfig;
use score_pipeline::gateway::{OutputTensor, StaticGateway};
use score_pipeline::pipeline::{ResponseBody, Scorer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let gateway = StaticGateway::new("spam")
        .with_output("probabilities", OutputTensor::matrix(vec![vec![0.35, 0.65]]));
    let scorer = Scorer::new(ScoringConfig::new("spam"), Arc::new(gateway))?;

    // A single object and its singleton-array form score identically.
    let payloads = [
        r#"{"age": 41, "income": 72000.5, "country": "DE"}"#,
        r#"[{"age": 41, "income": 72000.5, "country": "DE"}]"#,
        // The second element is not an object, so its slot reports an error
        // while the first still scores.
        r#"[{"age": 30}, 17]"#,
        // Unparseable payloads fail the whole request.
        "not-json",
    ];

    for payload in payloads {
        let body = ResponseBody::from(scorer.score(payload).await);
        println!("{payload}\n  -> {}\n", serde_json::to_string(&body)?);
    }

    Ok(())
}
