// SPDX-License-Identifier: MIT
//! Retry scheduling and deduplication for picks awaiting refinement
//! (association into a candidate origin).
//!
//! A pick that fails refinement is retried on a fixed wall-clock schedule
//! rather than a backoff curve: once at `first_try + 3s`, once more at
//! `first_try + 13s`, then dropped. A pick arriving for a channel that
//! already has one in flight within one sample period is treated as a
//! duplicate detection of the same onset; the one with the higher
//! detector posterior displaces the other.

use std::time::Duration;
use urts_model::ChannelId;
use urts_model::Pick;

/// Errors raised while scheduling or retrying a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// The pick has already failed its third attempt and must be dropped.
    #[error("exceeded number of retries")]
    ExceededRetries,
}

/// Delay from the first attempt to the second.
pub const FIRST_RETRY_DELAY: Duration = Duration::from_secs(3);
/// Additional delay from the second attempt to the third.
pub const SECOND_RETRY_DELAY: Duration = Duration::from_secs(10);

/// A pick awaiting refinement, together with the detector posterior that
/// accompanied it (used to break ties when a duplicate arrives).
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The pick itself.
    pub pick: Pick,
    /// Detector posterior that produced this pick, in `[0, 1]`. Higher
    /// wins when two candidates are judged to be the same onset.
    pub posterior: f64,
}

/// One entry in the retry queue: a candidate plus its schedule state.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEntry {
    candidate: Candidate,
    first_try_micros: i64,
    next_try_micros: i64,
    tries: u32,
}

impl RetryEntry {
    fn new(candidate: Candidate, now_micros: i64) -> Self {
        Self {
            candidate,
            first_try_micros: now_micros,
            next_try_micros: now_micros,
            tries: 0,
        }
    }

    /// The pick carried by this entry.
    #[must_use]
    pub fn pick(&self) -> &Pick {
        &self.candidate.pick
    }

    /// The detector posterior carried by this entry.
    #[must_use]
    pub fn posterior(&self) -> f64 {
        self.candidate.posterior
    }

    /// The time, in microseconds since the epoch, this entry is next due
    /// for a refinement attempt.
    #[must_use]
    pub fn next_try_micros(&self) -> i64 {
        self.next_try_micros
    }

    /// Number of attempts already made.
    #[must_use]
    pub fn tries(&self) -> u32 {
        self.tries
    }

    /// Record a failed refinement attempt, advancing the schedule.
    /// Returns [`RetryError::ExceededRetries`] once a third attempt has
    /// failed; the caller must drop the entry in that case.
    fn record_failure(&mut self) -> Result<(), RetryError> {
        self.tries += 1;
        match self.tries {
            1 => {
                self.next_try_micros =
                    self.first_try_micros + FIRST_RETRY_DELAY.as_micros() as i64;
                Ok(())
            }
            2 => {
                self.next_try_micros += SECOND_RETRY_DELAY.as_micros() as i64;
                Ok(())
            }
            _ => Err(RetryError::ExceededRetries),
        }
    }
}

/// Outcome of [`RefinementQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// No existing entry was close enough; the candidate was added fresh.
    Inserted,
    /// An existing entry was judged a duplicate and the new candidate's
    /// higher posterior displaced it; its retry schedule was reset.
    Replaced,
    /// An existing entry was judged a duplicate and it already had an
    /// equal or higher posterior; the new candidate was discarded.
    DuplicateIgnored,
}

/// A queue of picks awaiting refinement, deduplicated by channel and onset
/// proximity, and retried on the fixed wall-clock schedule.
#[derive(Debug)]
pub struct RefinementQueue {
    entries: Vec<RetryEntry>,
    dedup_window_micros: i64,
}

impl RefinementQueue {
    /// Construct an empty queue. `dedup_window_micros` is the maximum
    /// onset-time separation, in microseconds, within which two picks on
    /// the same channel are considered the same detection (typically one
    /// sample period of the detecting stream).
    #[must_use]
    pub fn new(dedup_window_micros: i64) -> Self {
        Self {
            entries: Vec::new(),
            dedup_window_micros,
        }
    }

    /// Number of entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the queue holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_duplicate(&self, channel: &ChannelId, onset_time_micros: i64) -> Option<usize> {
        self.entries.iter().position(|entry| {
            &entry.candidate.pick.channel == channel
                && (entry.candidate.pick.onset_time_micros - onset_time_micros).abs()
                    <= self.dedup_window_micros
        })
    }

    /// Add a candidate pick to the queue, resolving duplicates against
    /// any in-flight entry on the same channel within the dedup window.
    pub fn enqueue(&mut self, candidate: Candidate, now_micros: i64) -> EnqueueOutcome {
        let channel = candidate.pick.channel.clone();
        let onset = candidate.pick.onset_time_micros;
        if let Some(index) = self.find_duplicate(&channel, onset) {
            if candidate.posterior > self.entries[index].candidate.posterior {
                self.entries[index] = RetryEntry::new(candidate, now_micros);
                EnqueueOutcome::Replaced
            } else {
                EnqueueOutcome::DuplicateIgnored
            }
        } else {
            self.entries.push(RetryEntry::new(candidate, now_micros));
            EnqueueOutcome::Inserted
        }
    }

    /// Entries whose `next_try_micros` has elapsed, in queue order.
    #[must_use]
    pub fn due(&self, now_micros: i64) -> Vec<&RetryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.next_try_micros <= now_micros)
            .collect()
    }

    /// Remove and return an entry that refined successfully.
    pub fn remove_succeeded(&mut self, identifier: u64) -> Option<RetryEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.candidate.pick.identifier == identifier)?;
        Some(self.entries.remove(index))
    }

    /// Record a failed refinement attempt for the entry identified by
    /// `identifier`, advancing its retry schedule. If the entry has now
    /// exceeded its retry budget it is removed from the queue and
    /// [`RetryError::ExceededRetries`] is returned.
    pub fn record_failure(&mut self, identifier: u64) -> Result<(), RetryError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.candidate.pick.identifier == identifier);
        let Some(index) = index else {
            return Ok(());
        };
        match self.entries[index].record_failure() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.entries.remove(index);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_model::PhaseHint;

    fn channel() -> ChannelId {
        ChannelId::new("UU", "FORK", "HHZ", "01").unwrap()
    }

    fn candidate(onset_time_micros: i64, identifier: u64, posterior: f64) -> Candidate {
        Candidate {
            pick: Pick::new(channel(), onset_time_micros, PhaseHint::P, identifier),
            posterior,
        }
    }

    // ── 1. a fresh candidate on an empty queue is inserted ──────────────

    #[test]
    fn enqueue_fresh_candidate_is_inserted() {
        let mut queue = RefinementQueue::new(10_000);
        let outcome = queue.enqueue(candidate(0, 1, 0.9), 0);
        assert_eq!(outcome, EnqueueOutcome::Inserted);
        assert_eq!(queue.len(), 1);
    }

    // ── 2. a duplicate with a lower posterior is ignored ────────────────

    #[test]
    fn duplicate_with_lower_posterior_is_ignored() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(1_000_000, 1, 0.9), 0);
        let outcome = queue.enqueue(candidate(1_004_000, 2, 0.4), 0);
        assert_eq!(outcome, EnqueueOutcome::DuplicateIgnored);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.due(0)[0].pick().identifier, 1);
    }

    // ── 3. a duplicate with a higher posterior replaces the original ────

    #[test]
    fn duplicate_with_higher_posterior_replaces() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(1_000_000, 1, 0.4), 0);
        let outcome = queue.enqueue(candidate(1_004_000, 2, 0.9), 10);
        assert_eq!(outcome, EnqueueOutcome::Replaced);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.due(10)[0].pick().identifier, 2);
    }

    // ── 4. a candidate outside the dedup window is inserted separately ──

    #[test]
    fn candidate_outside_window_is_separate() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(0, 1, 0.9), 0);
        let outcome = queue.enqueue(candidate(50_000, 2, 0.1), 0);
        assert_eq!(outcome, EnqueueOutcome::Inserted);
        assert_eq!(queue.len(), 2);
    }

    // ── 5. a different channel never dedups against another ─────────────

    #[test]
    fn different_channel_never_dedups() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(0, 1, 0.9), 0);
        let other = ChannelId::new("UU", "RRI2", "HHZ", "01").unwrap();
        let pick = Pick::new(other, 0, PhaseHint::P, 2);
        let outcome = queue.enqueue(
            Candidate {
                pick,
                posterior: 0.1,
            },
            0,
        );
        assert_eq!(outcome, EnqueueOutcome::Inserted);
        assert_eq!(queue.len(), 2);
    }

    // ── 6. the retry schedule follows first_try+3s then +13s then drops ──

    #[test]
    fn retry_schedule_matches_fixed_offsets() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(0, 1, 0.9), 0);

        queue.record_failure(1).unwrap();
        assert_eq!(queue.due(0).len(), 0);
        assert_eq!(
            queue.due(FIRST_RETRY_DELAY.as_micros() as i64).len(),
            1
        );

        queue.record_failure(1).unwrap();
        let second_due = (FIRST_RETRY_DELAY + SECOND_RETRY_DELAY).as_micros() as i64;
        assert_eq!(queue.due(second_due - 1).len(), 0);
        assert_eq!(queue.due(second_due).len(), 1);

        let err = queue.record_failure(1).unwrap_err();
        assert_eq!(err, RetryError::ExceededRetries);
        assert!(queue.is_empty());
    }

    // ── 7. a successful refinement removes the entry ─────────────────────

    #[test]
    fn remove_succeeded_drops_entry() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(0, 1, 0.9), 0);
        let removed = queue.remove_succeeded(1).unwrap();
        assert_eq!(removed.pick().identifier, 1);
        assert!(queue.is_empty());
    }

    // ── 8. recording failure for an unknown identifier is a no-op ───────

    #[test]
    fn record_failure_unknown_identifier_is_noop() {
        let mut queue = RefinementQueue::new(10_000);
        queue.enqueue(candidate(0, 1, 0.9), 0);
        assert!(queue.record_failure(999).is_ok());
        assert_eq!(queue.len(), 1);
    }
}
