// SPDX-License-Identifier: MIT
//! Locator (`uLocator`): arrivals in, a located `Origin` out.

use serde::{Deserialize, Serialize};
use urts_model::{Arrival, Origin};
use urts_worker::{Algorithm, ProcessError};

/// A trained or algorithmic locator. Opaque to this crate; only the
/// input/output contract is specified here.
pub trait LocatorModel: Send + Sync {
    /// Compute a hypocenter and origin time from `arrivals`, optionally
    /// seeded by a hint `(latitude_deg, longitude_deg, depth_m)`.
    fn locate(&self, arrivals: &[Arrival], seed: Option<(f64, f64, f64)>) -> LocateSolution;
}

/// A locator's raw numeric output, before it is folded into an [`Origin`].
#[derive(Debug, Clone, Copy)]
pub struct LocateSolution {
    /// Latitude in degrees.
    pub latitude_deg: f64,
    /// Longitude in degrees.
    pub longitude_deg: f64,
    /// Depth in meters, positive down.
    pub depth_m: f64,
    /// Origin time, UTC, microseconds since the epoch.
    pub origin_time_micros: i64,
    /// Weighted RMS travel-time residual, seconds, if computed.
    pub weighted_rms_residual_s: Option<f64>,
    /// Azimuthal gap, degrees, if computed.
    pub azimuthal_gap_deg: Option<f64>,
    /// Distance to the nearest contributing station, meters, if computed.
    pub nearest_station_distance_m: Option<f64>,
}

/// A request to the locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateRequest {
    /// Arrivals to locate against. No hypocenter is required on them.
    pub arrivals: Vec<Arrival>,
    /// Optional seed latitude, degrees, as a hint to the locator.
    pub seed_latitude_deg: Option<f64>,
    /// Optional seed longitude, degrees, as a hint to the locator.
    pub seed_longitude_deg: Option<f64>,
    /// Optional seed depth, meters, as a hint to the locator.
    pub seed_depth_m: Option<f64>,
}

/// A reply from the locator: the located origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    /// The located origin.
    pub origin: Origin,
}

/// Handle one locate request against `model`. Arrival invariants
/// (no duplicate `(network, station, phase)`, no S preceding its
/// co-station P) are validated before the model ever runs.
pub fn handle(model: &dyn LocatorModel, request: LocateRequest) -> Result<LocateResponse, ProcessError> {
    if request.arrivals.is_empty() {
        return Err(ProcessError::InvalidMessage(
            "locate request must carry at least one arrival".to_string(),
        ));
    }
    // A throwaway origin at a dummy hypocenter, solely to reuse the model's
    // cross-arrival validation before running the (potentially expensive)
    // locator itself.
    Origin::new(0.0, 0.0, 0.0, 0, request.arrivals.clone())
        .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;

    let seed = match (
        request.seed_latitude_deg,
        request.seed_longitude_deg,
        request.seed_depth_m,
    ) {
        (Some(lat), Some(lon), Some(depth)) => Some((lat, lon, depth)),
        _ => None,
    };
    let solution = model.locate(&request.arrivals, seed);

    let mut origin = Origin::new(
        solution.latitude_deg,
        solution.longitude_deg,
        solution.depth_m,
        solution.origin_time_micros,
        request.arrivals,
    )
    .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))?;

    if let Some(residual) = solution.weighted_rms_residual_s {
        origin = origin.with_weighted_rms_residual(residual);
    }
    if let Some(gap) = solution.azimuthal_gap_deg {
        origin = origin
            .with_azimuthal_gap(gap)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))?;
    }
    if let Some(distance) = solution.nearest_station_distance_m {
        origin = origin
            .with_nearest_station_distance(distance)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))?;
    }

    Ok(LocateResponse { origin })
}

/// Adapts a [`LocatorModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct LocatorAlgorithm<M> {
    model: M,
}

impl<M: LocatorModel> LocatorAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: LocatorModel + 'static> Algorithm for LocatorAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: LocateRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}
