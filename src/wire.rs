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

//! Protobuf messages for the remote scoring protocol.
//!
//! These are maintained by hand instead of generated, so the crate builds
//! without protoc. They encode identically to this schema:
//!
//! ```proto
//! syntax = "proto3";
//! package scoring;
//!
//! service Scoring {
//!   rpc Predict(PredictRequest) returns (PredictResponse);
//! }
//!
//! message PredictRequest {
//!   string model = 1;
//!   repeated string tags = 2;
//!   string signature = 3;
//!   map<string, ExampleBatch> inputs = 4;
//! }
//!
//! message ExampleBatch {
//!   repeated bytes records = 1;
//! }
//!
//! message PredictResponse {
//!   map<string, Tensor> outputs = 1;
//! }
//!
//! message Tensor {
//!   repeated int64 shape = 1;
//!   repeated double values = 2;
//! }
//! ```
//!
//! Backends signal errors through gRPC status codes rather than response
//! fields; [`GrpcGateway`](crate::gateway::GrpcGateway) documents how those
//! map onto the crate's error types.

use std::collections::BTreeMap;

/// Full method path of the unary predict call.
pub const PREDICT_PATH: &str = "/scoring.Scoring/Predict";

/// One scoring call: which model variant to invoke and the encoded examples
/// for each named input.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictRequest {
    /// Model reference (a name or artifact path, backend-defined).
    #[prost(string, tag = "1")]
    pub model: String,
    /// Tag set selecting the model graph variant to load.
    #[prost(string, repeated, tag = "2")]
    pub tags: Vec<String>,
    /// Signature key selecting the named input/output contract.
    #[prost(string, tag = "3")]
    pub signature: String,
    /// Input key to the batch of encoded example records.
    #[prost(btree_map = "string, message", tag = "4")]
    pub inputs: BTreeMap<String, ExampleBatch>,
}

/// A batch of serialized example records for one named input.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExampleBatch {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub records: Vec<Vec<u8>>,
}

/// The named output tensors of a successful predict call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictResponse {
    #[prost(btree_map = "string, message", tag = "1")]
    pub outputs: BTreeMap<String, Tensor>,
}

/// A dense numeric tensor in row-major order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tensor {
    #[prost(int64, repeated, tag = "1")]
    pub shape: Vec<i64>,
    #[prost(double, repeated, tag = "2")]
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn predict_request_round_trips() {
        let request = PredictRequest {
            model: "spam".to_owned(),
            tags: vec!["serve".to_owned()],
            signature: "predict".to_owned(),
            inputs: [(
                "examples".to_owned(),
                ExampleBatch {
                    records: vec![vec![1, 2, 3]],
                },
            )]
            .into_iter()
            .collect(),
        };

        let decoded = PredictRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn tensor_defaults_are_empty() {
        let tensor = Tensor::default();
        assert!(tensor.shape.is_empty());
        assert!(tensor.values.is_empty());
    }
}
