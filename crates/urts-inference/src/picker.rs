// SPDX-License-Identifier: MIT
//! Picker services (CNN one-component P, CNN three-component P, CNN
//! three-component S): refine an initial pick's onset time.

use serde::{Deserialize, Serialize};
use urts_worker::{Algorithm, ProcessError};

/// A trained picker model: a fixed-length snippet centered on an initial
/// pick in, a scalar time correction out.
pub trait PickerModel: Send + Sync {
    /// Exact input length this model expects, in samples.
    fn expected_signal_length(&self) -> usize;
    /// Native sampling rate of the model, in Hz.
    fn sampling_rate_hz(&self) -> f64;
    /// Resample/condition a raw snippet onto the model's native rate.
    fn preprocess(&self, raw: &[f64]) -> Vec<f64>;
    /// Run inference, returning a correction in seconds to add to the
    /// pick time the snippet was centered on.
    fn infer(&self, preprocessed: &[f64]) -> f64;
}

/// A request to a picker service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PickerRequest {
    /// Raw snippet in, preprocessed snippet out. Diagnostic only.
    PreprocessOnly {
        /// Raw snippet at an arbitrary sampling rate.
        raw: Vec<f64>,
    },
    /// Already-preprocessed snippet in, correction out.
    InferenceOnly {
        /// Snippet at the model's native rate and expected length.
        preprocessed: Vec<f64>,
    },
    /// Raw snippet in, correction out. The fast path.
    Combined {
        /// Raw snippet at an arbitrary sampling rate.
        raw: Vec<f64>,
    },
}

/// A reply from a picker service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PickerResponse {
    /// The preprocessed snippet, for [`PickerRequest::PreprocessOnly`].
    Preprocessed(Vec<f64>),
    /// Correction in seconds to add to the original pick time.
    Correction(f64),
}

fn validate_length(expected: usize, len: usize) -> Result<(), ProcessError> {
    if len != expected {
        return Err(ProcessError::InvalidMessage(format!(
            "input length {len} must equal the model's expected length of {expected}"
        )));
    }
    Ok(())
}

/// Handle one picker request against `model`.
pub fn handle(model: &dyn PickerModel, request: PickerRequest) -> Result<PickerResponse, ProcessError> {
    match request {
        PickerRequest::PreprocessOnly { raw } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw snippet must not be empty".to_string(),
                ));
            }
            Ok(PickerResponse::Preprocessed(model.preprocess(&raw)))
        }
        PickerRequest::InferenceOnly { preprocessed } => {
            validate_length(model.expected_signal_length(), preprocessed.len())?;
            Ok(PickerResponse::Correction(model.infer(&preprocessed)))
        }
        PickerRequest::Combined { raw } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw snippet must not be empty".to_string(),
                ));
            }
            let preprocessed = model.preprocess(&raw);
            validate_length(model.expected_signal_length(), preprocessed.len())?;
            Ok(PickerResponse::Correction(model.infer(&preprocessed)))
        }
    }
}

/// Adapts a [`PickerModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct PickerAlgorithm<M> {
    model: M,
}

impl<M: PickerModel> PickerAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: PickerModel + 'static> Algorithm for PickerAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: PickerRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}
