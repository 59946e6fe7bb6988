// SPDX-License-Identifier: MIT
//! First-motion classifier (CNN one-component P): polarity of the first
//! P-wave swing, classified from a fixed-length snippet centered on a
//! pick.

use serde::{Deserialize, Serialize};
use urts_model::FirstMotion;
use urts_worker::{Algorithm, ProcessError};

/// Default decision threshold, applied when a request does not supply
/// one.
pub const DEFAULT_THRESHOLD: f64 = 1.0 / 3.0;

/// A trained first-motion model: a fixed-length snippet centered on a
/// pick in, a posterior triple over `{up, down, unknown}` out.
pub trait FirstMotionModel: Send + Sync {
    /// Exact input length this model expects, in samples.
    fn expected_signal_length(&self) -> usize;
    /// Resample/condition a raw snippet onto the model's native rate.
    fn preprocess(&self, raw: &[f64]) -> Vec<f64>;
    /// Run inference, returning `(p_up, p_down, p_unknown)`.
    fn infer(&self, preprocessed: &[f64]) -> (f64, f64, f64);
}

/// A request to a first-motion classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FirstMotionRequest {
    /// Raw snippet in, preprocessed snippet out. Diagnostic only.
    PreprocessOnly {
        /// Raw snippet at an arbitrary sampling rate.
        raw: Vec<f64>,
    },
    /// Already-preprocessed snippet in, classification out.
    InferenceOnly {
        /// Snippet at the model's native rate and expected length.
        preprocessed: Vec<f64>,
        /// Decision threshold; defaults to [`DEFAULT_THRESHOLD`].
        threshold: Option<f64>,
    },
    /// Raw snippet in, classification out. The fast path.
    Combined {
        /// Raw snippet at an arbitrary sampling rate.
        raw: Vec<f64>,
        /// Decision threshold; defaults to [`DEFAULT_THRESHOLD`].
        threshold: Option<f64>,
    },
}

/// A reply from a first-motion classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FirstMotionResponse {
    /// The preprocessed snippet, for
    /// [`FirstMotionRequest::PreprocessOnly`].
    Preprocessed(Vec<f64>),
    /// The classification and the posterior triple it was decided from.
    Classification {
        /// The assigned first motion.
        first_motion: FirstMotion,
        /// Posterior of upward first motion.
        p_up: f64,
        /// Posterior of downward first motion.
        p_down: f64,
        /// Posterior of an unclassifiable first motion.
        p_unknown: f64,
    },
}

/// Apply the classification rule: the larger of `p_up`/`p_down` wins if
/// it exceeds both `threshold` and `p_unknown`; otherwise `Unknown`.
#[must_use]
pub fn classify(p_up: f64, p_down: f64, p_unknown: f64, threshold: f64) -> FirstMotion {
    let max_ud = p_up.max(p_down);
    if max_ud > threshold && max_ud > p_unknown {
        if p_up >= p_down {
            FirstMotion::Up
        } else {
            FirstMotion::Down
        }
    } else {
        FirstMotion::Unknown
    }
}

fn validate_length(expected: usize, len: usize) -> Result<(), ProcessError> {
    if len != expected {
        return Err(ProcessError::InvalidMessage(format!(
            "input length {len} must equal the model's expected length of {expected}"
        )));
    }
    Ok(())
}

/// Handle one first-motion request against `model`.
pub fn handle(
    model: &dyn FirstMotionModel,
    request: FirstMotionRequest,
) -> Result<FirstMotionResponse, ProcessError> {
    match request {
        FirstMotionRequest::PreprocessOnly { raw } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw snippet must not be empty".to_string(),
                ));
            }
            Ok(FirstMotionResponse::Preprocessed(model.preprocess(&raw)))
        }
        FirstMotionRequest::InferenceOnly {
            preprocessed,
            threshold,
        } => {
            validate_length(model.expected_signal_length(), preprocessed.len())?;
            let (p_up, p_down, p_unknown) = model.infer(&preprocessed);
            let first_motion = classify(p_up, p_down, p_unknown, threshold.unwrap_or(DEFAULT_THRESHOLD));
            Ok(FirstMotionResponse::Classification {
                first_motion,
                p_up,
                p_down,
                p_unknown,
            })
        }
        FirstMotionRequest::Combined { raw, threshold } => {
            if raw.is_empty() {
                return Err(ProcessError::InvalidMessage(
                    "raw snippet must not be empty".to_string(),
                ));
            }
            let preprocessed = model.preprocess(&raw);
            validate_length(model.expected_signal_length(), preprocessed.len())?;
            let (p_up, p_down, p_unknown) = model.infer(&preprocessed);
            let first_motion = classify(p_up, p_down, p_unknown, threshold.unwrap_or(DEFAULT_THRESHOLD));
            Ok(FirstMotionResponse::Classification {
                first_motion,
                p_up,
                p_down,
                p_unknown,
            })
        }
    }
}

/// Adapts a [`FirstMotionModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct FirstMotionAlgorithm<M> {
    model: M,
}

impl<M: FirstMotionModel> FirstMotionAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: FirstMotionModel + 'static> Algorithm for FirstMotionAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: FirstMotionRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}
