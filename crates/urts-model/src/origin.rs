// SPDX-License-Identifier: MIT
use crate::{Arrival, ModelError, PhaseHint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum depth, in meters, an origin may be located at (above the free
/// surface, per the original locator's "surficial" convention).
pub const MIN_DEPTH_M: f64 = -8600.0;
/// Maximum depth, in meters, an origin may be located at.
pub const MAX_DEPTH_M: f64 = 800_000.0;

/// A candidate (or finalized) hypocenter produced by the associator and
/// locator, carrying the arrivals that constrain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude_deg: f64,
    /// Longitude in degrees. The sign convention is left to the consumer;
    /// this type does not normalize it.
    pub longitude_deg: f64,
    /// Depth in meters, positive down, `[-8600, 800000]`.
    pub depth_m: f64,
    /// Origin time, UTC, microseconds since the epoch.
    pub origin_time_micros: i64,
    /// Arrivals associated to this origin.
    pub arrivals: Vec<Arrival>,
    /// Optional weighted root-mean-squared travel-time residual, seconds.
    pub weighted_rms_residual_s: Option<f64>,
    /// Optional azimuthal gap, degrees, `(0, 360]`.
    pub azimuthal_gap_deg: Option<f64>,
    /// Optional distance to the nearest contributing station, meters.
    pub nearest_station_distance_m: Option<f64>,
}

impl Origin {
    /// Construct an origin, validating latitude, longitude, depth, and the
    /// cross-arrival invariants (no duplicate `(network, station, phase)`,
    /// and every S arrival at a station must not precede that station's P
    /// arrival).
    pub fn new(
        latitude_deg: f64,
        longitude_deg: f64,
        depth_m: f64,
        origin_time_micros: i64,
        arrivals: Vec<Arrival>,
    ) -> Result<Self, ModelError> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ModelError::OutOfRange {
                value: latitude_deg,
                min: -90.0,
                max: 90.0,
            });
        }
        if !(-180.0..=360.0).contains(&longitude_deg) {
            return Err(ModelError::OutOfRange {
                value: longitude_deg,
                min: -180.0,
                max: 360.0,
            });
        }
        if !(MIN_DEPTH_M..=MAX_DEPTH_M).contains(&depth_m) {
            return Err(ModelError::OutOfRange {
                value: depth_m,
                min: MIN_DEPTH_M,
                max: MAX_DEPTH_M,
            });
        }

        validate_arrivals(&arrivals)?;

        Ok(Self {
            latitude_deg,
            longitude_deg,
            depth_m,
            origin_time_micros,
            arrivals,
            weighted_rms_residual_s: None,
            azimuthal_gap_deg: None,
            nearest_station_distance_m: None,
        })
    }

    /// Set the azimuthal gap, rejecting values outside `(0, 360]`.
    pub fn with_azimuthal_gap(mut self, gap_deg: f64) -> Result<Self, ModelError> {
        if !(gap_deg > 0.0 && gap_deg <= 360.0) {
            return Err(ModelError::OutOfRange {
                value: gap_deg,
                min: 0.0,
                max: 360.0,
            });
        }
        self.azimuthal_gap_deg = Some(gap_deg);
        Ok(self)
    }

    /// Set the nearest-station distance, rejecting negative values.
    pub fn with_nearest_station_distance(mut self, distance_m: f64) -> Result<Self, ModelError> {
        if distance_m < 0.0 {
            return Err(ModelError::OutOfRange {
                value: distance_m,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        self.nearest_station_distance_m = Some(distance_m);
        Ok(self)
    }

    /// Set the weighted RMS residual.
    #[must_use]
    pub fn with_weighted_rms_residual(mut self, residual_s: f64) -> Self {
        self.weighted_rms_residual_s = Some(residual_s);
        self
    }

    /// True if a weighted RMS residual was set.
    #[must_use]
    pub fn has_weighted_rms_residual(&self) -> bool {
        self.weighted_rms_residual_s.is_some()
    }

    /// True if an azimuthal gap was set.
    #[must_use]
    pub fn has_azimuthal_gap(&self) -> bool {
        self.azimuthal_gap_deg.is_some()
    }

    /// True if a nearest-station distance was set.
    #[must_use]
    pub fn has_nearest_station_distance(&self) -> bool {
        self.nearest_station_distance_m.is_some()
    }
}

fn validate_arrivals(arrivals: &[Arrival]) -> Result<(), ModelError> {
    let mut seen: HashMap<(&str, &str, PhaseHint), ()> = HashMap::new();
    let mut p_time_by_station: HashMap<(&str, &str), i64> = HashMap::new();
    let mut s_time_by_station: HashMap<(&str, &str), i64> = HashMap::new();

    for arrival in arrivals {
        let channel = &arrival.pick.channel;
        let key = (channel.network.as_str(), channel.station.as_str(), arrival.pick.phase_hint);
        if seen.insert(key, ()).is_some() {
            return Err(ModelError::DuplicateArrival {
                network: channel.network.clone(),
                station: channel.station.clone(),
                phase: arrival.pick.phase_hint,
            });
        }
        let station_key = (channel.network.as_str(), channel.station.as_str());
        match arrival.pick.phase_hint {
            PhaseHint::P => {
                p_time_by_station.insert(station_key, arrival.pick.onset_time_micros);
            }
            PhaseHint::S => {
                s_time_by_station.insert(station_key, arrival.pick.onset_time_micros);
            }
        }
    }

    for (station_key, &s_time) in &s_time_by_station {
        if let Some(&p_time) = p_time_by_station.get(station_key) {
            if s_time < p_time {
                return Err(ModelError::PhaseOrderingViolation {
                    network: station_key.0.to_string(),
                    station: station_key.1.to_string(),
                });
            }
        }
    }

    Ok(())
}
