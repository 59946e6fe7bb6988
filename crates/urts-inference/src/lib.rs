// SPDX-License-Identifier: MIT
//! Request/reply contracts shared by every URTS inference service:
//! detectors, pickers, the first-motion classifier, the locator, and the
//! travel-time service. (The associator has its own crate, `urts-associator`,
//! since its interface is specific to the clustering problem rather than
//! this shared preprocess/infer skeleton.)
//!
//! Every service exposes the same three request shapes — preprocess-only,
//! inference-only, combined — and every model's internals stay opaque
//! behind a small trait this crate defines; only the input/output
//! contract, validated here, is shared.

pub mod detector;
pub mod first_motion;
pub mod locator;
pub mod picker;
pub mod travel_time;

pub use detector::{
    DetectorAlgorithm, DetectorKind, DetectorModel, DetectorRequest, DetectorResponse,
    ONE_COMPONENT_LENGTH_MULTIPLE, ONE_COMPONENT_MIN_LENGTH, THREE_COMPONENT_LENGTH,
};
pub use first_motion::{
    classify, FirstMotionAlgorithm, FirstMotionModel, FirstMotionRequest, FirstMotionResponse,
    DEFAULT_THRESHOLD,
};
pub use locator::{LocateRequest, LocateResponse, LocateSolution, LocatorAlgorithm, LocatorModel};
pub use picker::{PickerAlgorithm, PickerModel, PickerRequest, PickerResponse};
pub use travel_time::{
    Station, TravelTimeAlgorithm, TravelTimeEntry, TravelTimeModel, TravelTimeRequest,
    TravelTimeResponse,
};
