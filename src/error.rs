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

//! Error types for the scoring pipeline.
//!
//! This module defines [`Error`] -- the unified error type returned by all
//! fallible operations -- along with the [`Result`] type alias used throughout
//! the crate.
//!
//! Two families of failures flow through the same enum but are handled
//! differently at the pipeline boundary: payload and feature validation
//! errors ([`Error::MalformedInput`], [`Error::InvalidFeatureType`],
//! [`Error::InvalidFeatureShape`]) are recovered into structured response
//! bodies, while backend integration errors ([`Error::UnknownInputKey`],
//! [`Error::ModelNotFound`], [`Error::SignatureNotFound`],
//! [`Error::UnexpectedOutputShape`], transport failures) abort the whole
//! request and bubble up to the caller.

/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that may occur while turning a request payload into model scores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request payload could not be parsed into scoreable examples.
    ///
    /// The message is the complete, client-facing sentence; it is returned
    /// verbatim in the error response body.
    #[error("{0}")]
    MalformedInput(String),

    /// A value has no representation among the record format's type tags
    /// (float, integer, string, bytes).
    #[error("feature \"{feature}\" has unsupported type: {found}")]
    InvalidFeatureType {
        /// Name of the offending feature.
        feature: String,
        /// Description of the value that could not be represented.
        found: String,
    },

    /// A feature's value is not expressible as a non-empty homogeneous list.
    #[error("feature \"{feature}\" has invalid shape: {detail}")]
    InvalidFeatureShape {
        /// Name of the offending feature.
        feature: String,
        /// What made the shape unusable (empty list, mixed element types).
        detail: String,
    },

    /// A supplied input key is not part of the model's declared signature.
    ///
    /// `available` enumerates the keys the signature does accept so that a
    /// configuration mismatch can be diagnosed from the error alone.
    #[error("\"{key}\" is not a valid input key; choose from {available:?}")]
    UnknownInputKey {
        /// The rejected input key.
        key: String,
        /// The input keys the model signature declares.
        available: Vec<String>,
    },

    /// The referenced model artifact does not exist on the backend.
    #[error("model not found: {model}")]
    ModelNotFound {
        /// The model reference that could not be resolved.
        model: String,
    },

    /// The model has no signature under the requested signature key.
    #[error("signature \"{signature}\" not found in model {model}")]
    SignatureNotFound {
        /// The signature key that was requested.
        signature: String,
        /// The model the lookup ran against.
        model: String,
    },

    /// The output tensor at the projected key cannot yield a positive-class
    /// score (missing, empty, or fewer than two entries in its first row).
    #[error("output \"{key}\" has unexpected shape {shape:?}")]
    UnexpectedOutputShape {
        /// The output key the projector read.
        key: String,
        /// The shape the backend reported for that output.
        shape: Vec<i64>,
    },

    /// An encoded record could not be decoded back into features.
    #[error("record decode error: {0}")]
    RecordDecode(#[from] prost::DecodeError),

    /// The gRPC transport layer returned an error.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The backend returned a gRPC status that maps to no specific variant.
    #[error("gRPC error (code={code}): {message}")]
    Grpc {
        /// The gRPC status code.
        code: tonic::Code,
        /// The error message from the backend.
        message: String,
    },

    /// The backend answered, but the response is missing the data the
    /// caller asked for.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The pipeline was constructed with unusable configuration.
    ///
    /// Construction-time only; a misconfigured process refuses to serve
    /// rather than failing per-request.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Grpc {
            code: status.code(),
            message: status.message().to_owned(),
        }
    }
}
