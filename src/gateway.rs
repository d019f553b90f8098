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

//! The inference backend contract and its two built-in implementations.
//!
//! The pipeline never touches a model runtime directly; it builds an
//! [`InferenceRequest`] (model reference, tag set, signature key, and named
//! inputs of encoded examples) and hands it to an [`InferenceGateway`],
//! reading named [`OutputTensor`]s back from the [`InferenceResponse`].
//!
//! [`StaticGateway`] answers from a declared signature and fixed outputs --
//! the backend used by tests, demos, and local development.
//! [`GrpcGateway`] forwards the call to a remote scoring backend over a
//! tonic channel using the [`wire`](crate::wire) protocol.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::{debug, error};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use crate::error::{Error, Result};
use crate::record::EncodedExample;
use crate::wire;

/// Default maximum message size for gRPC (128 MiB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 128 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One inference call: which model variant to invoke, and the encoded
/// examples for each named input.
///
/// # Example
///
/// ```rust
/// use score_pipeline::gateway::InferenceRequest;
/// use score_pipeline::record::EncodedExample;
///
/// let request = InferenceRequest::new("spam", vec!["serve".to_owned()], "predict")
///     .with_input("examples", vec![EncodedExample::from_bytes(vec![])]);
///
/// assert_eq!(request.input_keys(), ["examples"]);
/// ```
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    model: String,
    tags: Vec<String>,
    signature: String,
    inputs: IndexMap<String, Vec<EncodedExample>>,
}

impl InferenceRequest {
    /// Creates a request for the given model reference, tag set and
    /// signature key, with no inputs attached yet.
    #[must_use]
    pub fn new(model: impl Into<String>, tags: Vec<String>, signature: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            tags,
            signature: signature.into(),
            inputs: IndexMap::new(),
        }
    }

    /// Attaches a batch of encoded examples under a named input key.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, examples: Vec<EncodedExample>) -> Self {
        self.inputs.insert(key.into(), examples);
        self
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

    /// The signature key selecting the named input/output contract.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Iterates over the named inputs in insertion order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &[EncodedExample])> {
        self.inputs
            .iter()
            .map(|(key, examples)| (key.as_str(), examples.as_slice()))
    }

    /// The input key names in insertion order.
    #[must_use]
    pub fn input_keys(&self) -> Vec<&str> {
        self.inputs.keys().map(String::as_str).collect()
    }

    /// Converts the request into its wire form.
    fn into_wire(self) -> wire::PredictRequest {
        wire::PredictRequest {
            model: self.model,
            tags: self.tags,
            signature: self.signature,
            inputs: self
                .inputs
                .into_iter()
                .map(|(key, examples)| {
                    let records = examples.into_iter().map(EncodedExample::into_bytes).collect();
                    (key, wire::ExampleBatch { records })
                })
                .collect(),
        }
    }
}

/// A dense numeric output tensor in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    shape: Vec<i64>,
    values: Vec<f64>,
}

impl OutputTensor {
    /// Creates a tensor from an explicit shape and row-major values.
    #[must_use]
    pub fn new(shape: Vec<i64>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    /// Creates a rank-2 tensor from rows (all rows must have equal length).
    ///
    /// # Example
    ///
    /// ```rust
    /// use score_pipeline::gateway::OutputTensor;
    ///
    /// let tensor = OutputTensor::matrix(vec![vec![0.2, 0.8]]);
    /// assert_eq!(tensor.shape(), [1, 2]);
    /// ```
    #[must_use]
    pub fn matrix(rows: Vec<Vec<f64>>) -> Self {
        let columns = rows.first().map_or(0, Vec::len);
        let shape = vec![rows.len() as i64, columns as i64];
        let values = rows.into_iter().flatten().collect();
        Self { shape, values }
    }

    /// Creates a rank-1 tensor.
    #[must_use]
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len() as i64],
            values,
        }
    }

    /// The tensor's shape.
    #[must_use]
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// The tensor's values in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns row `index` of a rank-2 tensor, or the whole value slice of a
    /// rank-1 tensor when `index` is 0. `None` for out-of-range rows, other
    /// ranks, or a shape the values do not fill.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        match *self.shape.as_slice() {
            [rows, columns] => {
                let rows = usize::try_from(rows).ok()?;
                let columns = usize::try_from(columns).ok()?;
                if index >= rows {
                    return None;
                }
                let start = index.checked_mul(columns)?;
                let end = start.checked_add(columns)?;
                self.values.get(start..end)
            }
            [length] => {
                let length = usize::try_from(length).ok()?;
                if index == 0 {
                    self.values.get(..length)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Returns the positive-class entry of a binary classifier's probability
    /// output: row 0, column 1. `None` when the tensor has no such entry.
    #[must_use]
    pub fn positive_class_score(&self) -> Option<f64> {
        self.row(0)?.get(1).copied()
    }
}

/// The named outputs of a successful inference call.
#[derive(Debug, Clone, Default)]
pub struct InferenceResponse {
    outputs: IndexMap<String, OutputTensor>,
}

impl InferenceResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named output tensor.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, tensor: OutputTensor) -> Self {
        self.outputs.insert(key.into(), tensor);
        self
    }

    /// Returns the output tensor stored under `key`.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&OutputTensor> {
        self.outputs.get(key)
    }

    /// The available output key names.
    #[must_use]
    pub fn output_keys(&self) -> Vec<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    /// Builds the domain response from its wire form.
    fn from_wire(body: wire::PredictResponse) -> Self {
        let mut response = Self::new();
        for (key, tensor) in body.outputs {
            response
                .outputs
                .insert(key, OutputTensor::new(tensor.shape, tensor.values));
        }
        response
    }
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// The inference backend contract consumed by the scoring pipeline.
///
/// Implementations own the loaded model artifact and must be safe to share
/// across concurrent requests; the pipeline only ever calls through `&self`.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Runs one inference call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when the model reference (or its
    /// requested tag variant) resolves to nothing,
    /// [`Error::SignatureNotFound`] when the artifact lacks the requested
    /// signature, and [`Error::UnknownInputKey`] when an input key is not
    /// part of the signature. Transport-level failures surface as
    /// [`Error::Transport`] or [`Error::Grpc`].
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse>;
}

// ---------------------------------------------------------------------------
// StaticGateway
// ---------------------------------------------------------------------------

/// An in-memory gateway standing in for a real model runtime.
///
/// It validates each request against a declared signature (model reference,
/// tag set, signature key, input keys) and answers with fixed outputs,
/// producing the same error contract a remote backend would. Defaults match
/// the pipeline's: tag set `["serve"]`, signature `"predict"`, input key
/// `"examples"`.
///
/// # Example
///
/// ```rust
/// use score_pipeline::gateway::{OutputTensor, StaticGateway};
///
/// let gateway = StaticGateway::new("spam")
///     .with_output("probabilities", OutputTensor::matrix(vec![vec![0.2, 0.8]]));
/// ```
#[derive(Debug, Clone)]
pub struct StaticGateway {
    model: String,
    tags: Vec<String>,
    signature: String,
    input_keys: Vec<String>,
    outputs: InferenceResponse,
}

impl StaticGateway {
    /// Creates a gateway serving the given model reference with the default
    /// signature declaration.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            tags: vec!["serve".to_owned()],
            signature: "predict".to_owned(),
            input_keys: vec!["examples".to_owned()],
            outputs: InferenceResponse::new(),
        }
    }

    /// Declares the tag set under which the model variant is available.
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

    /// Declares the signature key the model exposes.
    #[must_use]
    pub fn with_signature(self, signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            ..self
        }
    }

    /// Declares the input keys the signature accepts.
    #[must_use]
    pub fn with_input_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_keys: keys.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Adds a named output tensor returned by every successful call.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, tensor: OutputTensor) -> Self {
        self.outputs = self.outputs.with_output(key, tensor);
        self
    }

    /// Order-insensitive tag set comparison.
    fn serves_tags(&self, requested: &[String]) -> bool {
        requested.len() == self.tags.len() && requested.iter().all(|tag| self.tags.contains(tag))
    }
}

#[async_trait]
impl InferenceGateway for StaticGateway {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        if request.model() != self.model {
            return Err(Error::ModelNotFound {
                model: request.model().to_owned(),
            });
        }
        // A tag set the artifact was not exported under loads nothing.
        if !self.serves_tags(request.tags()) {
            return Err(Error::ModelNotFound {
                model: request.model().to_owned(),
            });
        }
        if request.signature() != self.signature {
            return Err(Error::SignatureNotFound {
                signature: request.signature().to_owned(),
                model: request.model().to_owned(),
            });
        }
        for (key, examples) in request.inputs() {
            if !self.input_keys.iter().any(|declared| declared == key) {
                return Err(Error::UnknownInputKey {
                    key: key.to_owned(),
                    available: self.input_keys.clone(),
                });
            }
            debug!("static gateway: {} example(s) under input \"{key}\"", examples.len());
        }
        Ok(self.outputs.clone())
    }
}

// ---------------------------------------------------------------------------
// GrpcGateway
// ---------------------------------------------------------------------------

/// Options for configuring the remote gateway connection.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use score_pipeline::gateway::GatewayOptions;
///
/// let options = GatewayOptions::default()
///     .connect_timeout(Duration::from_secs(10))
///     .request_timeout(Duration::from_secs(30))
///     .max_message_size(256 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    max_message_size: usize,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            request_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl GatewayOptions {
    /// Sets the timeout for establishing the initial connection.
    #[must_use]
    pub fn connect_timeout(self, timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
            ..self
        }
    }

    /// Sets the deadline applied to each individual predict call.
    #[must_use]
    pub fn request_timeout(self, timeout: Duration) -> Self {
        Self {
            request_timeout: Some(timeout),
            ..self
        }
    }

    /// Sets the maximum gRPC message size in bytes.
    ///
    /// Default: 128 MiB.
    #[must_use]
    pub fn max_message_size(self, size: usize) -> Self {
        Self {
            max_message_size: size,
            ..self
        }
    }
}

/// A gateway forwarding inference to a remote scoring backend over gRPC.
///
/// The gateway is cheaply cloneable -- clones share the same underlying
/// channel and can be used concurrently from multiple tasks.
///
/// Backend statuses map onto the error contract as follows: `NOT_FOUND`
/// becomes [`Error::ModelNotFound`] (the reference or its tag variant
/// resolves to nothing); `FAILED_PRECONDITION` becomes
/// [`Error::SignatureNotFound`]; every other status passes through as
/// [`Error::Grpc`] with the backend's message, which for input-key
/// mismatches carries the backend's own enumeration of valid keys.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> score_pipeline::error::Result<()> {
/// use score_pipeline::gateway::{GrpcGateway, InferenceGateway, InferenceRequest};
///
/// let gateway = GrpcGateway::connect("http://localhost:8500").await?;
/// let request = InferenceRequest::new("spam", vec!["serve".to_owned()], "predict");
/// let response = gateway.infer(request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GrpcGateway {
    grpc: tonic::client::Grpc<Channel>,
}

impl GrpcGateway {
    /// Connects to a scoring backend at the given URL with default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparseable URL and
    /// [`Error::Transport`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_options(url, GatewayOptions::default()).await
    }

    /// Connects to a scoring backend with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparseable URL and
    /// [`Error::Transport`] if the connection cannot be established.
    pub async fn connect_with_options(url: &str, options: GatewayOptions) -> Result<Self> {
        let mut endpoint = Endpoint::from_shared(url.to_owned())
            .map_err(|e| Error::Config(format!("invalid gateway URL: {e}")))?;

        if let Some(timeout) = options.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = options.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        let channel = endpoint.connect().await?;

        let grpc = tonic::client::Grpc::new(channel)
            .max_decoding_message_size(options.max_message_size)
            .max_encoding_message_size(options.max_message_size);

        Ok(Self { grpc })
    }
}

#[async_trait]
impl InferenceGateway for GrpcGateway {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        let mut grpc = self.grpc.clone();
        grpc.ready().await?;

        let model = request.model().to_owned();
        let signature = request.signature().to_owned();
        debug!(
            "predict: model={model} signature={signature} inputs={:?}",
            request.input_keys()
        );

        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(wire::PREDICT_PATH);
        let response: tonic::Response<wire::PredictResponse> = grpc
            .unary(tonic::Request::new(request.into_wire()), path, codec)
            .await
            .map_err(|status| {
                error!(
                    "predict failed for model {model} (code={:?}): {}",
                    status.code(),
                    status.message()
                );
                map_status(status, &model, &signature)
            })?;

        Ok(InferenceResponse::from_wire(response.into_inner()))
    }
}

/// Maps a backend status onto the gateway error contract.
fn map_status(status: tonic::Status, model: &str, signature: &str) -> Error {
    match status.code() {
        tonic::Code::NotFound => Error::ModelNotFound {
            model: model.to_owned(),
        },
        tonic::Code::FailedPrecondition => Error::SignatureNotFound {
            signature: signature.to_owned(),
            model: model.to_owned(),
        },
        _ => Error::from(status),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
