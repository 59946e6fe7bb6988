// SPDX-License-Identifier: MIT
//! Analytic stand-ins for the trained models `urts-inference` and
//! `urts-associator` expect. None of these are fit on data; they exist so
//! a service can be started and exercised end to end before a
//! `modelWeightsFile` is available. Loading real weights is out of
//! scope here and left to a future model-runtime crate.

use urts_inference::{
    DetectorKind, DetectorModel, FirstMotionModel, LocateSolution, LocatorModel, PickerModel,
    TravelTimeModel,
};
use urts_model::{Arrival, PhaseHint, Pick};

/// A short-term/long-term average energy-ratio detector, run at whatever
/// rate its input arrives at (no resampling).
pub struct EnergyRatioDetector {
    kind: DetectorKind,
    short_window: usize,
    long_window: usize,
}

impl EnergyRatioDetector {
    /// A one-component detector with a 0.2s/2.0s STA/LTA pair at 100 Hz.
    #[must_use]
    pub const fn one_component() -> Self {
        Self {
            kind: DetectorKind::OneComponent,
            short_window: 20,
            long_window: 200,
        }
    }

    /// A three-component detector with the same windows, fixed to the
    /// model's required input length.
    #[must_use]
    pub const fn three_component() -> Self {
        Self {
            kind: DetectorKind::ThreeComponent,
            short_window: 20,
            long_window: 200,
        }
    }
}

impl DetectorModel for EnergyRatioDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn sampling_rate_hz(&self) -> f64 {
        100.0
    }

    fn central_window(&self) -> (usize, usize) {
        match self.kind {
            DetectorKind::OneComponent => (0, 0),
            DetectorKind::ThreeComponent => (400, 600),
        }
    }

    fn preprocess(&self, raw: &[f64]) -> Vec<f64> {
        raw.to_vec()
    }

    fn infer(&self, preprocessed: &[f64]) -> Vec<f64> {
        let n = preprocessed.len();
        let mut posterior = Vec::with_capacity(n);
        for i in 0..n {
            let short_start = i.saturating_sub(self.short_window);
            let long_start = i.saturating_sub(self.long_window);
            let sta = mean_square(&preprocessed[short_start..=i]);
            let lta = mean_square(&preprocessed[long_start..=i]).max(1e-12);
            let ratio = sta / lta;
            // Squash the ratio into (0, 1); a ratio of 1 (no anomaly)
            // maps to 0.5.
            posterior.push(ratio / (ratio + 1.0));
        }
        posterior
    }
}

fn mean_square(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|x| x * x).sum::<f64>() / window.len() as f64
}

/// A picker that trusts the initial pick and applies no correction.
pub struct ZeroCorrectionPicker {
    expected_length: usize,
}

impl ZeroCorrectionPicker {
    /// A picker expecting a 4-second snippet at 100 Hz.
    #[must_use]
    pub const fn new() -> Self {
        Self { expected_length: 400 }
    }
}

impl PickerModel for ZeroCorrectionPicker {
    fn expected_signal_length(&self) -> usize {
        self.expected_length
    }

    fn sampling_rate_hz(&self) -> f64 {
        100.0
    }

    fn preprocess(&self, raw: &[f64]) -> Vec<f64> {
        raw.to_vec()
    }

    fn infer(&self, _preprocessed: &[f64]) -> f64 {
        0.0
    }
}

/// A first-motion classifier that always abstains, reporting an even
/// posterior over all three outcomes.
pub struct UniformFirstMotion {
    expected_length: usize,
}

impl UniformFirstMotion {
    /// A classifier expecting a 2-second snippet at 100 Hz.
    #[must_use]
    pub const fn new() -> Self {
        Self { expected_length: 200 }
    }
}

impl FirstMotionModel for UniformFirstMotion {
    fn expected_signal_length(&self) -> usize {
        self.expected_length
    }

    fn preprocess(&self, raw: &[f64]) -> Vec<f64> {
        raw.to_vec()
    }

    fn infer(&self, _preprocessed: &[f64]) -> (f64, f64, f64) {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }
}

/// A locator that reports the seed hypocenter unchanged, or the origin
/// at `(0, 0, 0)` absent a seed, with an origin time taken from the
/// earliest arrival. Useful for exercising the service's wire contract
/// before a real solver is wired in.
pub struct SeedLocator;

impl LocatorModel for SeedLocator {
    fn locate(&self, arrivals: &[Arrival], seed: Option<(f64, f64, f64)>) -> LocateSolution {
        let (latitude_deg, longitude_deg, depth_m) = seed.unwrap_or((0.0, 0.0, 0.0));
        let origin_time_micros = arrivals
            .iter()
            .map(|a| a.pick.onset_time_micros)
            .min()
            .unwrap_or(0);
        LocateSolution {
            latitude_deg,
            longitude_deg,
            depth_m,
            origin_time_micros,
            weighted_rms_residual_s: None,
            azimuthal_gap_deg: None,
            nearest_station_distance_m: None,
        }
    }
}

/// A travel-time model assuming constant regional P/S velocities.
pub struct ConstantVelocityTravelTime {
    p_velocity_m_s: f64,
    s_velocity_m_s: f64,
}

impl ConstantVelocityTravelTime {
    /// A model with 6.0 km/s P and 3.5 km/s S velocities, typical of
    /// upper-crustal regional networks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            p_velocity_m_s: 6_000.0,
            s_velocity_m_s: 3_500.0,
        }
    }
}

impl TravelTimeModel for ConstantVelocityTravelTime {
    fn travel_time_s(&self, _source_depth_m: f64, distance_m: f64, phase: PhaseHint) -> f64 {
        let velocity_m_s = match phase {
            PhaseHint::P => self.p_velocity_m_s,
            PhaseHint::S => self.s_velocity_m_s,
        };
        distance_m / velocity_m_s
    }
}

/// Groups picks whose onset times fall within a fixed window of each
/// other, independent of which station they were made on. A real
/// associator would reason over travel-time-consistent moveout; this
/// is a placeholder that at least groups temporally coincident picks.
pub struct TimeWindowAssociator {
    window_s: f64,
}

impl TimeWindowAssociator {
    /// An associator grouping picks within 10 seconds of each other.
    #[must_use]
    pub const fn new() -> Self {
        Self { window_s: 10.0 }
    }
}

impl urts_associator::AssociatorModel for TimeWindowAssociator {
    fn associate(&self, picks: &[Pick]) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..picks.len()).collect();
        order.sort_by_key(|&i| picks[i].onset_time_micros);

        let window_micros = (self.window_s * 1_000_000.0) as i64;
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut anchor_time = 0i64;

        for index in order {
            let onset = picks[index].onset_time_micros;
            if current.is_empty() || onset - anchor_time <= window_micros {
                if current.is_empty() {
                    anchor_time = onset;
                }
                current.push(index);
            } else {
                groups.push(std::mem::take(&mut current));
                anchor_time = onset;
                current.push(index);
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_model::ChannelId;

    // ── 1. the energy-ratio detector produces one posterior per sample ───

    #[test]
    fn energy_ratio_detector_matches_input_length() {
        let detector = EnergyRatioDetector::one_component();
        let signal: Vec<f64> = (0..64).map(|i| f64::from(i % 7)).collect();
        let posterior = detector.infer(&signal);
        assert_eq!(posterior.len(), signal.len());
        assert!(posterior.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    // ── 2. the zero-correction picker reports no shift ────────────────────

    #[test]
    fn zero_correction_picker_reports_zero() {
        let picker = ZeroCorrectionPicker::new();
        assert!((picker.infer(&vec![0.0; picker.expected_signal_length()])).abs() < 1e-12);
    }

    // ── 3. the uniform first-motion model never commits to a polarity ────

    #[test]
    fn uniform_first_motion_is_even() {
        let (up, down, unknown) = UniformFirstMotion::new().infer(&[]);
        assert!((up - down).abs() < 1e-12);
        assert!((down - unknown).abs() < 1e-12);
    }

    // ── 4. the seed locator passes the seed through unchanged ────────────

    #[test]
    fn seed_locator_uses_seed_when_given() {
        let channel = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let arrivals = vec![Arrival::new(Pick::new(channel, 1_000, PhaseHint::P, 1))];
        let solution = SeedLocator.locate(&arrivals, Some((40.0, -111.0, 5_000.0)));
        assert!((solution.latitude_deg - 40.0).abs() < 1e-9);
        assert_eq!(solution.origin_time_micros, 1_000);
    }

    // ── 5. without a seed the locator falls back to (0, 0, 0) ────────────

    #[test]
    fn seed_locator_falls_back_without_seed() {
        let solution = SeedLocator.locate(&[], None);
        assert!((solution.latitude_deg - 0.0).abs() < 1e-12);
        assert!((solution.longitude_deg - 0.0).abs() < 1e-12);
    }

    // ── 6. S is slower than P at the same distance ────────────────────────

    #[test]
    fn constant_velocity_s_slower_than_p() {
        let model = ConstantVelocityTravelTime::new();
        let p = model.travel_time_s(5_000.0, 100_000.0, PhaseHint::P);
        let s = model.travel_time_s(5_000.0, 100_000.0, PhaseHint::S);
        assert!(s > p);
    }

    // ── 7. picks far apart in time land in separate groups ────────────────

    #[test]
    fn time_window_associator_splits_distant_picks() {
        let channel = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let picks = vec![
            Pick::new(channel.clone(), 0, PhaseHint::P, 1),
            Pick::new(channel.clone(), 1_000_000, PhaseHint::P, 2),
            Pick::new(channel, 60_000_000, PhaseHint::P, 3),
        ];
        let groups = TimeWindowAssociator::new().associate(&picks);
        assert_eq!(groups.len(), 2);
    }
}
