// SPDX-License-Identifier: MIT
//! Resamples an irregularly-sampled (or gappy) time series onto a uniform
//! grid using Wiggins monotone-cubic interpolation, zero-filling and
//! reporting any gap wider than 1.5x the nominal sample period.

use serde::{Deserialize, Serialize};
use urts_model::{ChannelId, SamplePacket};

/// Errors raised while resampling a series onto a uniform grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpError {
    /// Fewer than two input samples were supplied; a series of one point
    /// has no spacing to resample against.
    #[error("at least two samples are required, got {0}")]
    TooFewSamples(usize),
    /// `times` and `values` had different lengths.
    #[error("times and values must have equal length ({times} vs {values})")]
    LengthMismatch {
        /// Length of the `times` slice.
        times: usize,
        /// Length of the `values` slice.
        values: usize,
    },
    /// The input times were not strictly increasing.
    #[error("input times must be strictly increasing (found {prev} then {next})")]
    TimesNotIncreasing {
        /// The earlier of the offending pair.
        prev: i64,
        /// The later (non-increasing) of the offending pair.
        next: i64,
    },
    /// The requested target sampling rate was not positive.
    #[error("target sampling rate must be positive, got {0}")]
    NonPositiveRate(f64),
}

/// A contiguous span of the output grid that fell inside a gap too wide to
/// interpolate across, and was zero-filled instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Start time of the gap, UTC microseconds since the epoch.
    pub start_micros: i64,
    /// End time of the gap (inclusive of its last zero-filled sample).
    pub end_micros: i64,
}

/// A gap is declared once the spacing between consecutive input samples
/// exceeds this multiple of the nominal sample period.
pub const GAP_THRESHOLD_FACTOR: f64 = 1.5;

/// Resample an irregular series onto a uniform grid at `target_rate_hz`.
///
/// Segments whose surrounding input samples are closer together than
/// [`GAP_THRESHOLD_FACTOR`] times the nominal period are filled by
/// monotone-cubic (Fritsch-Carlson / Wiggins) interpolation; wider spans
/// are zero-filled and reported in the returned gap list.
pub fn resample_to_uniform_grid(
    channel: ChannelId,
    times_micros: &[i64],
    values: &[f64],
    target_rate_hz: f64,
) -> Result<(SamplePacket, Vec<Gap>), InterpError> {
    if times_micros.len() != values.len() {
        return Err(InterpError::LengthMismatch {
            times: times_micros.len(),
            values: values.len(),
        });
    }
    if times_micros.len() < 2 {
        return Err(InterpError::TooFewSamples(times_micros.len()));
    }
    if !(target_rate_hz > 0.0) {
        return Err(InterpError::NonPositiveRate(target_rate_hz));
    }
    for pair in times_micros.windows(2) {
        if pair[1] <= pair[0] {
            return Err(InterpError::TimesNotIncreasing {
                prev: pair[0],
                next: pair[1],
            });
        }
    }

    let nominal_period_micros = 1e6 / target_rate_hz;
    let gap_threshold_micros = GAP_THRESHOLD_FACTOR * nominal_period_micros;

    let start = times_micros[0];
    let end = *times_micros.last().expect("checked len >= 2 above");
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let grid_len = (((end - start) as f64) / nominal_period_micros).floor() as usize + 1;

    let tangents = pchip_tangents(times_micros, values);

    let mut samples = Vec::with_capacity(grid_len);
    let mut gaps: Vec<Gap> = Vec::new();
    let mut open_gap: Option<i64> = None;
    let mut search_from = 0usize;

    for i in 0..grid_len {
        #[allow(clippy::cast_possible_truncation)]
        let t = start + (i as f64 * nominal_period_micros).round() as i64;
        let j = bracket(times_micros, t, search_from);
        search_from = j;

        // A grid point landing exactly on an input sample is real data,
        // never a gap, regardless of how wide the neighboring segments are.
        if times_micros[j] == t {
            if let Some(gap_start) = open_gap.take() {
                gaps.push(Gap {
                    start_micros: gap_start,
                    end_micros: t - 1,
                });
            }
            samples.push(values[j]);
            continue;
        }
        if times_micros[j + 1] == t {
            if let Some(gap_start) = open_gap.take() {
                gaps.push(Gap {
                    start_micros: gap_start,
                    end_micros: t - 1,
                });
            }
            samples.push(values[j + 1]);
            continue;
        }

        let local_span = (times_micros[j + 1] - times_micros[j]) as f64;
        if local_span > gap_threshold_micros {
            samples.push(0.0);
            open_gap.get_or_insert(t);
        } else {
            if let Some(gap_start) = open_gap.take() {
                gaps.push(Gap {
                    start_micros: gap_start,
                    end_micros: t - 1,
                });
            }
            samples.push(hermite(times_micros, values, &tangents, j, t));
        }
    }
    if let Some(gap_start) = open_gap {
        gaps.push(Gap {
            start_micros: gap_start,
            end_micros: start + (grid_len as i64 - 1) * nominal_period_micros.round() as i64,
        });
    }

    let packet = SamplePacket::new(channel, start, target_rate_hz, samples)
        .expect("grid always has at least one sample and a positive rate");
    Ok((packet, gaps))
}

/// Binary search (with a forward-biased hint) for the index `j` such that
/// `times[j] <= t <= times[j + 1]`, clamped to the interior of `times`.
fn bracket(times: &[i64], t: i64, hint: usize) -> usize {
    let mut lo = hint.min(times.len() - 2);
    if times[lo] > t {
        lo = 0;
    }
    let mut hi = times.len() - 2;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if times[mid] <= t {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Fritsch-Carlson monotone tangents: a weighted harmonic mean of the
/// adjacent secant slopes, zeroed at local extrema to guarantee no
/// overshoot.
fn pchip_tangents(times: &[i64], values: &[f64]) -> Vec<f64> {
    let n = times.len();
    let h: Vec<f64> = times.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let d: Vec<f64> = (0..n - 1).map(|i| (values[i + 1] - values[i]) / h[i]).collect();

    let mut m = vec![0.0; n];
    m[0] = d[0];
    m[n - 1] = d[n - 2];
    for i in 1..n - 1 {
        let (d_prev, d_next) = (d[i - 1], d[i]);
        if d_prev == 0.0 || d_next == 0.0 || d_prev.signum() != d_next.signum() {
            m[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            m[i] = (w1 + w2) / (w1 / d_prev + w2 / d_next);
        }
    }
    m
}

/// Evaluate the cubic Hermite spline on `[times[j], times[j + 1]]` at `t`.
fn hermite(times: &[i64], values: &[f64], tangents: &[f64], j: usize, t: i64) -> f64 {
    let dx = (times[j + 1] - times[j]) as f64;
    let s = (t - times[j]) as f64 / dx;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    h00 * values[j] + h10 * dx * tangents[j] + h01 * values[j + 1] + h11 * dx * tangents[j + 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelId {
        ChannelId::new("UU", "FORK", "HHZ", "01").unwrap()
    }

    // ── 1. interpolation reproduces a linear ramp exactly ────────────────

    #[test]
    fn linear_ramp_is_reproduced_exactly() {
        let times: Vec<i64> = (0..10).map(|i| i * 10_000).collect();
        let values: Vec<f64> = times.iter().map(|&t| t as f64 / 1000.0).collect();
        let (packet, gaps) =
            resample_to_uniform_grid(channel(), &times, &values, 100.0).unwrap();
        assert!(gaps.is_empty());
        for (i, &sample) in packet.samples.iter().enumerate() {
            let t = i as i64 * 10_000;
            let expected = t as f64 / 1000.0;
            assert!((sample - expected).abs() < 1e-9, "expected {expected} got {sample} at {i}");
        }
    }

    // ── 2. wide gap is zero-filled and reported ──────────────────────────

    #[test]
    fn wide_gap_is_zero_filled_and_reported() {
        // 100 Hz nominal -> 10ms period; a 1s hole is far past the 15ms
        // threshold.
        let times = vec![0, 10_000, 1_010_000, 1_020_000];
        let values = vec![1.0, 1.0, 2.0, 2.0];
        let (packet, gaps) =
            resample_to_uniform_grid(channel(), &times, &values, 100.0).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start_micros, 20_000);
        let mid_index = (500_000 - 0) / 10_000;
        assert_eq!(packet.samples[mid_index as usize], 0.0);
    }

    // ── 3. rejects mismatched lengths ────────────────────────────────────

    #[test]
    fn rejects_length_mismatch() {
        let err = resample_to_uniform_grid(channel(), &[0, 1], &[1.0], 100.0).unwrap_err();
        assert_eq!(err, InterpError::LengthMismatch { times: 2, values: 1 });
    }

    // ── 4. rejects non-increasing times ──────────────────────────────────

    #[test]
    fn rejects_non_increasing_times() {
        let err =
            resample_to_uniform_grid(channel(), &[0, 0], &[1.0, 2.0], 100.0).unwrap_err();
        assert_eq!(err, InterpError::TimesNotIncreasing { prev: 0, next: 0 });
    }

    // ── 5. monotone data produces no overshoot ───────────────────────────

    #[test]
    fn monotone_input_has_no_overshoot() {
        let times: Vec<i64> = vec![0, 5_000, 30_000, 35_000];
        let values: Vec<f64> = vec![0.0, 1.0, 1.0, 5.0];
        let (packet, _gaps) = resample_to_uniform_grid(channel(), &times, &values, 200.0).unwrap();
        for &s in &packet.samples {
            assert!((0.0..=5.0).contains(&s), "overshoot: {s}");
        }
    }
}
