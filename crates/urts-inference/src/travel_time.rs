// SPDX-License-Identifier: MIT
//! Travel-time service: source plus stations in, a per-(station, phase)
//! travel-time table out, computed against a preloaded regional velocity
//! model.

use serde::{Deserialize, Serialize};
use urts_model::PhaseHint;
use urts_worker::{Algorithm, ProcessError};

/// A station the travel-time table is computed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Seismic network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Station latitude, degrees.
    pub latitude_deg: f64,
    /// Station longitude, degrees.
    pub longitude_deg: f64,
    /// Station elevation, meters above sea level.
    pub elevation_m: f64,
}

/// A trained or tabulated regional velocity model. Opaque to this crate;
/// only the input/output contract is specified here.
pub trait TravelTimeModel: Send + Sync {
    /// Travel time, in seconds, from a source at `source_depth_m` to a
    /// station at the given epicentral `distance_m`, for `phase`.
    fn travel_time_s(&self, source_depth_m: f64, distance_m: f64, phase: PhaseHint) -> f64;
}

/// A request to the travel-time service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelTimeRequest {
    /// Source latitude, degrees.
    pub source_latitude_deg: f64,
    /// Source longitude, degrees.
    pub source_longitude_deg: f64,
    /// Source depth, meters, positive down.
    pub source_depth_m: f64,
    /// Stations to compute travel times for.
    pub stations: Vec<Station>,
}

/// One entry in a travel-time table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelTimeEntry {
    /// Network code of the station this entry is for.
    pub network: String,
    /// Station code this entry is for.
    pub station: String,
    /// Phase this entry is for.
    pub phase: PhaseHint,
    /// Travel time in seconds from the source to this station.
    pub travel_time_s: f64,
}

/// A reply from the travel-time service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelTimeResponse {
    /// One entry per `(station, phase)` pair.
    pub entries: Vec<TravelTimeEntry>,
}

/// Great-circle epicentral distance on a spherical Earth, in meters.
#[must_use]
fn epicentral_distance_m(
    source_latitude_deg: f64,
    source_longitude_deg: f64,
    station_latitude_deg: f64,
    station_longitude_deg: f64,
) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let lat1 = source_latitude_deg.to_radians();
    let lat2 = station_latitude_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (station_longitude_deg - source_longitude_deg).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Handle one travel-time request against `model`.
pub fn handle(
    model: &dyn TravelTimeModel,
    request: TravelTimeRequest,
) -> Result<TravelTimeResponse, ProcessError> {
    if request.stations.is_empty() {
        return Err(ProcessError::InvalidMessage(
            "travel-time request must carry at least one station".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&request.source_latitude_deg) {
        return Err(ProcessError::InvalidMessage(format!(
            "source latitude {} out of range [-90, 90]",
            request.source_latitude_deg
        )));
    }

    let mut entries = Vec::with_capacity(request.stations.len() * 2);
    for station in &request.stations {
        let distance_m = epicentral_distance_m(
            request.source_latitude_deg,
            request.source_longitude_deg,
            station.latitude_deg,
            station.longitude_deg,
        );
        for phase in [PhaseHint::P, PhaseHint::S] {
            entries.push(TravelTimeEntry {
                network: station.network.clone(),
                station: station.station.clone(),
                phase,
                travel_time_s: model.travel_time_s(request.source_depth_m, distance_m, phase),
            });
        }
    }
    Ok(TravelTimeResponse { entries })
}

/// Adapts a [`TravelTimeModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct TravelTimeAlgorithm<M> {
    model: M,
}

impl<M: TravelTimeModel> TravelTimeAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: TravelTimeModel + 'static> Algorithm for TravelTimeAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: TravelTimeRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantVelocity;
    impl TravelTimeModel for ConstantVelocity {
        fn travel_time_s(&self, _source_depth_m: f64, distance_m: f64, phase: PhaseHint) -> f64 {
            let velocity_m_s = match phase {
                PhaseHint::P => 6_000.0,
                PhaseHint::S => 3_500.0,
            };
            distance_m / velocity_m_s
        }
    }

    // ── 1. an empty station list is rejected ─────────────────────────────

    #[test]
    fn rejects_empty_stations() {
        let request = TravelTimeRequest {
            source_latitude_deg: 40.0,
            source_longitude_deg: -111.0,
            source_depth_m: 5_000.0,
            stations: vec![],
        };
        let err = handle(&ConstantVelocity, request).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidMessage(_)));
    }

    // ── 2. one entry per (station, phase) pair, S slower than P ──────────

    #[test]
    fn produces_one_entry_per_station_phase_pair() {
        let request = TravelTimeRequest {
            source_latitude_deg: 40.0,
            source_longitude_deg: -111.0,
            source_depth_m: 5_000.0,
            stations: vec![Station {
                network: "UU".to_string(),
                station: "FORK".to_string(),
                latitude_deg: 40.5,
                longitude_deg: -111.8,
                elevation_m: 1_800.0,
            }],
        };
        let response = handle(&ConstantVelocity, request).unwrap();
        assert_eq!(response.entries.len(), 2);
        let p = response.entries.iter().find(|e| e.phase == PhaseHint::P).unwrap();
        let s = response.entries.iter().find(|e| e.phase == PhaseHint::S).unwrap();
        assert!(s.travel_time_s > p.travel_time_s);
    }
}
