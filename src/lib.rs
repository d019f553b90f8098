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

//! Scoring pipeline for a served binary classifier.
//!
//! This crate turns a raw request payload into per-example probabilities:
//! it parses the payload into typed feature sets (directly as JSON, or
//! through a pluggable domain extractor), serializes each set into a
//! self-describing binary record, runs the records through an inference
//! backend behind the [`InferenceGateway`](gateway::InferenceGateway)
//! contract, and projects the backend's named outputs into a result mapping
//! labeled `ex0-res`, `ex1-res`, ... in payload order. The HTTP layer and
//! the model runtime stay outside: a host hands
//! [`Scorer::score`](pipeline::Scorer::score) a string and serializes the
//! returned mapping or error.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use score_pipeline::config::{ExtractorKind, ScoringConfig};
//! use score_pipeline::gateway::{OutputTensor, StaticGateway};
//! use score_pipeline::pipeline::{ResponseBody, Scorer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> score_pipeline::error::Result<()> {
//! // A stand-in backend; swap in GrpcGateway::connect(...) for a real one.
//! let gateway = StaticGateway::new("spam")
//!     .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]]));
//!
//! let config = ScoringConfig::new("spam").with_extractor(ExtractorKind::EmailLexical);
//! let scorer = Scorer::new(config, Arc::new(gateway))?;
//!
//! // One valid email, one invalid token: the bad slot reports its error
//! // while the rest of the batch still scores.
//! let scores = scorer.score("bob@example.com;nodomain").await?;
//! assert_eq!(scores["ex0-res"].score(), Some(0.8));
//! assert_eq!(scores["ex1-res"].score(), None);
//!
//! let body = serde_json::to_string(&ResponseBody::Scores(scores));
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`pipeline`] -- The [`Scorer`](pipeline::Scorer) entry point, result
//!   projection, and response bodies.
//! - [`extract`] -- Batch splitting and the [`Extractor`](extract::Extractor)
//!   trait with its built-in variants.
//! - [`feature`] -- Typed feature values and per-example feature sets.
//! - [`record`] -- The canonical binary record format and encoder.
//! - [`gateway`] -- The inference backend contract plus in-memory and gRPC
//!   implementations.
//! - [`config`] -- Startup configuration.
//! - [`error`] -- Error types and the [`Result`](error::Result) alias.
//! - [`wire`] -- Raw protobuf types of the remote scoring protocol.

pub mod config;
pub mod error;
pub mod extract;
pub mod feature;
pub mod gateway;
pub mod pipeline;
pub mod record;
pub mod wire;

/// Re-export of the pipeline entry point for convenience.
pub use pipeline::Scorer;
