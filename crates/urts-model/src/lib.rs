// SPDX-License-Identifier: MIT
//! Core data model for the URTS real-time seismic processing pipeline.
//!
//! These types are value types: transports move them across process
//! boundaries by serializing and reconstructing, never by sharing
//! ownership. Optional fields are always `Option<T>` with a `has_*()`
//! predicate distinct from the accessor — never a sentinel value.

use serde::{Deserialize, Serialize};
use std::fmt;

mod origin;
pub use origin::{Origin, MAX_DEPTH_M, MIN_DEPTH_M};

/// Errors raised while constructing or validating model values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A channel identity component (network/station/channel/location) was empty.
    #[error("channel identity component must not be empty")]
    EmptyChannelComponent,
    /// A sample packet had zero samples.
    #[error("sample packet must contain at least one sample")]
    EmptyPacket,
    /// The nominal sampling rate was not positive.
    #[error("sampling rate must be positive, got {0}")]
    NonPositiveRate(f64),
    /// A value fell outside its documented inclusive range.
    #[error("value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// The offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// The standard error for a pick was not positive.
    #[error("standard error must be positive, got {0}")]
    NonPositiveStandardError(f64),
    /// An asymmetric uncertainty bound had lower > upper.
    #[error("lower uncertainty bound {lower} exceeds upper bound {upper}")]
    UncertaintyBoundsInverted {
        /// The lower bound that was supplied.
        lower: f64,
        /// The upper bound that was supplied.
        upper: f64,
    },
    /// A probability value fell outside [0, 1].
    #[error("probability sample {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),
    /// Two arrivals in the same origin shared a (network, station, phase) tuple.
    #[error("duplicate (network={network}, station={station}, phase={phase:?}) in origin arrivals")]
    DuplicateArrival {
        /// Network code of the offending arrivals.
        network: String,
        /// Station code of the offending arrivals.
        station: String,
        /// Phase shared by the duplicate arrivals.
        phase: PhaseHint,
    },
    /// An S arrival preceded its co-station P arrival.
    #[error("S arrival at {network}.{station} precedes its co-station P arrival")]
    PhaseOrderingViolation {
        /// Network code of the offending station.
        network: String,
        /// Station code of the offending station.
        station: String,
    },
}

/// A phase hint assigned to a pick: first P-wave or first S-wave arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseHint {
    /// Primary (compressional) wave arrival.
    P,
    /// Secondary (shear) wave arrival.
    S,
}

impl fmt::Display for PhaseHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P => write!(f, "P"),
            Self::S => write!(f, "S"),
        }
    }
}

/// Polarity of the first P-wave swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirstMotion {
    /// Upward first motion (compression).
    Up,
    /// Downward first motion (dilatation).
    Down,
    /// First motion could not be confidently classified.
    Unknown,
}

/// Review state of an arrival, from automatic detection through human sign-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewFlag {
    /// Produced entirely by the automatic pipeline.
    Automatic,
    /// Reviewed (but not finalized) by a human analyst.
    Human,
    /// Reviewed and finalized.
    Finalized,
}

/// The 4-tuple (network, station, channel, location-code) that sharding and
/// routing keys off of. All four components are non-empty, printable,
/// case-sensitive strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    /// Seismic network code (e.g. "UU").
    pub network: String,
    /// Station code (e.g. "FORK").
    pub station: String,
    /// Channel code (e.g. "HHZ").
    pub channel: String,
    /// Location code (e.g. "01").
    pub location_code: String,
}

impl ChannelId {
    /// Construct a channel identity, rejecting any empty component.
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        channel: impl Into<String>,
        location_code: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let id = Self {
            network: network.into(),
            station: station.into(),
            channel: channel.into(),
            location_code: location_code.into(),
        };
        if id.network.is_empty()
            || id.station.is_empty()
            || id.channel.is_empty()
            || id.location_code.is_empty()
        {
            return Err(ModelError::EmptyChannelComponent);
        }
        Ok(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.channel, self.location_code
        )
    }
}

/// A contiguous run of uniformly-sampled ground-motion data on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePacket {
    /// Channel this packet was recorded on.
    pub channel: ChannelId,
    /// Start time, UTC, microseconds since the epoch.
    pub start_time_micros: i64,
    /// Nominal sampling rate in Hz. Must be positive.
    pub sampling_rate_hz: f64,
    /// Dense sequence of samples, uniformly spaced at `sampling_rate_hz`
    /// within a tolerance of 1e-4 Hz.
    pub samples: Vec<f64>,
}

/// Tolerance, in Hz, within which a nominal sampling rate is considered
/// consistent with a packet's actual sample spacing.
pub const SAMPLING_RATE_TOLERANCE_HZ: f64 = 1e-4;

impl SamplePacket {
    /// Construct a sample packet, validating the non-empty and
    /// positive-rate invariants.
    pub fn new(
        channel: ChannelId,
        start_time_micros: i64,
        sampling_rate_hz: f64,
        samples: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyPacket);
        }
        if !(sampling_rate_hz > 0.0) {
            return Err(ModelError::NonPositiveRate(sampling_rate_hz));
        }
        Ok(Self {
            channel,
            start_time_micros,
            sampling_rate_hz,
            samples,
        })
    }

    /// Number of samples in the packet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the packet has no samples (never true for a validly
    /// constructed packet, but useful for callers holding a raw struct).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Derived end time: `start + (N - 1) / rate`, in microseconds.
    #[must_use]
    pub fn end_time_micros(&self) -> i64 {
        let duration_s = (self.samples.len() - 1) as f64 / self.sampling_rate_hz;
        self.start_time_micros + (duration_s * 1e6).round() as i64
    }

    /// Nominal sample period in microseconds.
    #[must_use]
    pub fn sample_period_micros(&self) -> f64 {
        1e6 / self.sampling_rate_hz
    }
}

/// A dense per-sample posterior probability broadcast, as produced by a
/// detector worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPacket {
    /// Channel (or pseudo-channel, for multi-component detectors) this
    /// packet describes.
    pub channel: ChannelId,
    /// Start time, UTC, microseconds since the epoch.
    pub start_time_micros: i64,
    /// Sampling rate of the posterior stream, in Hz.
    pub sampling_rate_hz: f64,
    /// Posterior values, each in `[0, 1]`.
    pub samples: Vec<f64>,
    /// Identifier of the algorithm that produced this packet.
    pub algorithm: String,
    /// Original channel tags whose joint processing produced this packet
    /// (e.g. all three components for a 3-C detector).
    pub source_channels: Vec<ChannelId>,
    /// Name of the positive class (e.g. "P").
    pub positive_class_name: String,
    /// Name of the negative class (e.g. "Noise").
    pub negative_class_name: String,
}

impl ProbabilityPacket {
    /// Construct a probability packet, validating non-emptiness, positive
    /// rate, and that every sample lies in `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: ChannelId,
        start_time_micros: i64,
        sampling_rate_hz: f64,
        samples: Vec<f64>,
        algorithm: impl Into<String>,
        source_channels: Vec<ChannelId>,
        positive_class_name: impl Into<String>,
        negative_class_name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyPacket);
        }
        if !(sampling_rate_hz > 0.0) {
            return Err(ModelError::NonPositiveRate(sampling_rate_hz));
        }
        for &value in &samples {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::ProbabilityOutOfRange(value));
            }
        }
        Ok(Self {
            channel,
            start_time_micros,
            sampling_rate_hz,
            samples,
            algorithm: algorithm.into(),
            source_channels,
            positive_class_name: positive_class_name.into(),
            negative_class_name: negative_class_name.into(),
        })
    }
}

/// Default standard error, in seconds, assigned to a pick when not
/// otherwise specified.
pub const DEFAULT_STANDARD_ERROR_S: f64 = 0.05;

/// A timestamped detection of a phase onset on a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Channel the pick was made on.
    pub channel: ChannelId,
    /// Onset time, UTC, microseconds since the epoch.
    pub onset_time_micros: i64,
    /// Phase hint assigned by the detector/picker.
    pub phase_hint: PhaseHint,
    /// Globally unique identifier, assigned by the incrementer service.
    pub identifier: u64,
    /// Standard error of the onset time, in seconds. Must be positive.
    pub standard_error_s: f64,
    /// Optional asymmetric lower uncertainty bound, in seconds.
    pub lower_uncertainty_bound_s: Option<f64>,
    /// Optional asymmetric upper uncertainty bound, in seconds.
    pub upper_uncertainty_bound_s: Option<f64>,
}

impl Pick {
    /// Construct a pick with the default standard error and no uncertainty
    /// bounds.
    pub fn new(
        channel: ChannelId,
        onset_time_micros: i64,
        phase_hint: PhaseHint,
        identifier: u64,
    ) -> Self {
        Self {
            channel,
            onset_time_micros,
            phase_hint,
            identifier,
            standard_error_s: DEFAULT_STANDARD_ERROR_S,
            lower_uncertainty_bound_s: None,
            upper_uncertainty_bound_s: None,
        }
    }

    /// Set the standard error, rejecting non-positive values.
    pub fn with_standard_error(mut self, standard_error_s: f64) -> Result<Self, ModelError> {
        if !(standard_error_s > 0.0) {
            return Err(ModelError::NonPositiveStandardError(standard_error_s));
        }
        self.standard_error_s = standard_error_s;
        Ok(self)
    }

    /// Set asymmetric uncertainty bounds, rejecting `lower > upper`.
    pub fn with_uncertainty_bounds(mut self, lower: f64, upper: f64) -> Result<Self, ModelError> {
        if lower > upper {
            return Err(ModelError::UncertaintyBoundsInverted {
                lower,
                upper,
            });
        }
        self.lower_uncertainty_bound_s = Some(lower);
        self.upper_uncertainty_bound_s = Some(upper);
        Ok(self)
    }

    /// True if an asymmetric lower uncertainty bound was set.
    #[must_use]
    pub fn has_lower_uncertainty_bound(&self) -> bool {
        self.lower_uncertainty_bound_s.is_some()
    }

    /// True if an asymmetric upper uncertainty bound was set.
    #[must_use]
    pub fn has_upper_uncertainty_bound(&self) -> bool {
        self.upper_uncertainty_bound_s.is_some()
    }
}

/// A pick that has been refined and associated to a candidate event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    /// The underlying (refined) pick.
    pub pick: Pick,
    /// First-motion polarity classification.
    pub first_motion: FirstMotion,
    /// Review state.
    pub review_flag: ReviewFlag,
    /// Optional travel time from the associated origin, in seconds.
    pub travel_time_s: Option<f64>,
    /// Optional quality score in `[0, 1]`.
    pub quality: Option<f64>,
    /// Optional subsource tag (e.g. originating detector instance).
    pub subsource: Option<String>,
}

impl Arrival {
    /// Construct an arrival from a pick with automatic review state and
    /// unknown first motion.
    #[must_use]
    pub fn new(pick: Pick) -> Self {
        Self {
            pick,
            first_motion: FirstMotion::Unknown,
            review_flag: ReviewFlag::Automatic,
            travel_time_s: None,
            quality: None,
            subsource: None,
        }
    }

    /// Set the quality score, rejecting values outside `[0, 1]`.
    pub fn with_quality(mut self, quality: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&quality) {
            return Err(ModelError::OutOfRange {
                value: quality,
                min: 0.0,
                max: 1.0,
            });
        }
        self.quality = Some(quality);
        Ok(self)
    }

    /// True if a travel time was set.
    #[must_use]
    pub fn has_travel_time(&self) -> bool {
        self.travel_time_s.is_some()
    }

    /// True if a quality score was set.
    #[must_use]
    pub fn has_quality(&self) -> bool {
        self.quality.is_some()
    }

    /// True if a subsource tag was set.
    #[must_use]
    pub fn has_subsource(&self) -> bool {
        self.subsource.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── 1. ChannelId rejects empty components ───────────────────────────

    #[test]
    fn channel_id_rejects_empty_component() {
        assert_eq!(
            ChannelId::new("", "FORK", "HHZ", "01"),
            Err(ModelError::EmptyChannelComponent)
        );
        assert_eq!(
            ChannelId::new("UU", "FORK", "HHZ", ""),
            Err(ModelError::EmptyChannelComponent)
        );
    }

    // ── 2. ChannelId Display round trips the dotted form ────────────────

    #[test]
    fn channel_id_display() {
        let id = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        assert_eq!(id.to_string(), "UU.FORK.HHZ.01");
    }

    // ── 3. SamplePacket rejects empty samples and non-positive rate ─────

    #[test]
    fn sample_packet_validation() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        assert_eq!(
            SamplePacket::new(chan.clone(), 0, 100.0, vec![]),
            Err(ModelError::EmptyPacket)
        );
        assert_eq!(
            SamplePacket::new(chan, 0, 0.0, vec![1.0]),
            Err(ModelError::NonPositiveRate(0.0))
        );
    }

    // ── 4. SamplePacket end time derivation ──────────────────────────────

    #[test]
    fn sample_packet_end_time() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let packet = SamplePacket::new(chan, 1_628_803_598_000_000, 100.0, samples).unwrap();
        assert_eq!(packet.end_time_micros(), 1_628_803_598_990_000);
    }

    // ── 5. ProbabilityPacket rejects out-of-range samples ────────────────

    #[test]
    fn probability_packet_rejects_out_of_range() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let err = ProbabilityPacket::new(
            chan,
            0,
            100.0,
            vec![0.5, 1.2],
            "detector",
            vec![],
            "P",
            "Noise",
        )
        .unwrap_err();
        assert_eq!(err, ModelError::ProbabilityOutOfRange(1.2));
    }

    // ── 6. Pick default standard error ───────────────────────────────────

    #[test]
    fn pick_default_standard_error() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let pick = Pick::new(chan, 1_628_803_599_000_000, PhaseHint::P, 42);
        assert_eq!(pick.standard_error_s, DEFAULT_STANDARD_ERROR_S);
        assert!(!pick.has_lower_uncertainty_bound());
    }

    // ── 7. Pick rejects inverted uncertainty bounds ──────────────────────

    #[test]
    fn pick_rejects_inverted_bounds() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let pick = Pick::new(chan, 0, PhaseHint::P, 1);
        let err = pick.with_uncertainty_bounds(0.5, 0.1).unwrap_err();
        assert_eq!(
            err,
            ModelError::UncertaintyBoundsInverted {
                lower: 0.5,
                upper: 0.1
            }
        );
    }

    // ── 8. Arrival optional-field predicates ─────────────────────────────

    #[test]
    fn arrival_optional_predicates() {
        let chan = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let pick = Pick::new(chan, 0, PhaseHint::P, 1);
        let arrival = Arrival::new(pick);
        assert!(!arrival.has_travel_time());
        assert!(!arrival.has_quality());
        assert!(!arrival.has_subsource());
        let arrival = arrival.with_quality(0.9).unwrap();
        assert!(arrival.has_quality());
    }
}
