// SPDX-License-Identifier: MIT
//! Detector services (one-component P, three-component P, three-component
//! S): a per-sample probability stream at the model's native rate.

use serde::{Deserialize, Serialize};
use urts_worker::{Algorithm, ProcessError};

/// Minimum legal input length for a one-component detector, in samples.
pub const ONE_COMPONENT_MIN_LENGTH: usize = 1008;
/// A one-component detector's input length must be a multiple of this.
pub const ONE_COMPONENT_LENGTH_MULTIPLE: usize = 16;
/// Fixed input length for a three-component detector, in samples.
pub const THREE_COMPONENT_LENGTH: usize = 1008;

/// Which input-length contract a detector enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// Accepts any multiple of [`ONE_COMPONENT_LENGTH_MULTIPLE`] samples
    /// no shorter than [`ONE_COMPONENT_MIN_LENGTH`], processed with a
    /// sliding window.
    OneComponent,
    /// Accepts exactly [`THREE_COMPONENT_LENGTH`] samples.
    ThreeComponent,
}

/// A trained detector model. The model's internals are opaque to this
/// crate; only its input/output contract is specified here.
pub trait DetectorModel: Send + Sync {
    /// Which length contract this model enforces.
    fn kind(&self) -> DetectorKind;
    /// Native sampling rate of the model, in Hz.
    fn sampling_rate_hz(&self) -> f64;
    /// Start/end (half-open) of the central subregion of a three-component
    /// window whose posterior is considered valid. Unused for
    /// [`DetectorKind::OneComponent`].
    fn central_window(&self) -> (usize, usize);
    /// Resample/condition a raw signal onto the model's native rate.
    fn preprocess(&self, raw: &[f64]) -> Vec<f64>;
    /// Run inference on an already-preprocessed signal, returning a
    /// per-sample posterior in `[0, 1]`.
    fn infer(&self, preprocessed: &[f64]) -> Vec<f64>;
}

/// A request to a detector service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectorRequest {
    /// Raw signal in, preprocessed signal out. Diagnostic only.
    PreprocessOnly {
        /// Raw signal at an arbitrary sampling rate.
        raw: Vec<f64>,
    },
    /// Already-preprocessed signal in, posterior out.
    InferenceOnly {
        /// Signal at the model's native rate, satisfying its length
        /// contract.
        preprocessed: Vec<f64>,
    },
    /// Raw signal in, posterior out. The fast path.
    Combined {
        /// Raw signal at an arbitrary sampling rate.
        raw: Vec<f64>,
    },
}

/// A reply from a detector service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectorResponse {
    /// The preprocessed signal, for [`DetectorRequest::PreprocessOnly`].
    Preprocessed(Vec<f64>),
    /// The per-sample posterior, for the inference-bearing variants.
    Posterior(Vec<f64>),
}

fn validate_length(kind: DetectorKind, len: usize) -> Result<(), ProcessError> {
    match kind {
        DetectorKind::OneComponent => {
            if len < ONE_COMPONENT_MIN_LENGTH || len % ONE_COMPONENT_LENGTH_MULTIPLE != 0 {
                return Err(ProcessError::InvalidMessage(format!(
                    "one-component input length {len} must be a multiple of \
                     {ONE_COMPONENT_LENGTH_MULTIPLE} and at least {ONE_COMPONENT_MIN_LENGTH}"
                )));
            }
        }
        DetectorKind::ThreeComponent => {
            if len != THREE_COMPONENT_LENGTH {
                return Err(ProcessError::InvalidMessage(format!(
                    "three-component input length {len} must equal {THREE_COMPONENT_LENGTH}"
                )));
            }
        }
    }
    Ok(())
}

/// Handle one detector request against `model`.
pub fn handle(
    model: &dyn DetectorModel,
    request: DetectorRequest,
) -> Result<DetectorResponse, ProcessError> {
    match request {
        DetectorRequest::PreprocessOnly { raw } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw signal must not be empty".to_string(),
                ));
            }
            Ok(DetectorResponse::Preprocessed(model.preprocess(&raw)))
        }
        DetectorRequest::InferenceOnly { preprocessed } => {
            validate_length(model.kind(), preprocessed.len())?;
            Ok(DetectorResponse::Posterior(model.infer(&preprocessed)))
        }
        DetectorRequest::Combined { raw } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw signal must not be empty".to_string(),
                ));
            }
            let preprocessed = model.preprocess(&raw);
            validate_length(model.kind(), preprocessed.len())?;
            Ok(DetectorResponse::Posterior(model.infer(&preprocessed)))
        }
    }
}

/// Adapts a [`DetectorModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct DetectorAlgorithm<M> {
    model: M,
}

impl<M: DetectorModel> DetectorAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: DetectorModel + 'static> Algorithm for DetectorAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: DetectorRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}
