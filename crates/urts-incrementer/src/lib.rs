// SPDX-License-Identifier: MIT
//! A standalone incrementer: hands out monotone, non-decreasing 64-bit
//! identifier blocks backed by a durable key/value store, so a restart
//! never reissues an identifier already handed out.
//!
//! Counter state is kept as JSON on disk rather than the original
//! service's sqlite3 file — a single small file suits the workload (one
//! writer, infrequent persistence, no queries) and keeps this crate's
//! only dependency on the filesystem a `serde_json` blob, matching how
//! the rest of this workspace persists small local state.

mod service;

pub use service::{IncrementerAlgorithm, IncrementerRequest, IncrementerResponse};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Increment applied to a name the caller has never configured.
pub const DEFAULT_INCREMENT: i64 = 1;
/// Initial value a name starts from when first seen: the first id
/// returned is `initial_value + increment`.
pub const DEFAULT_INITIAL_VALUE: i64 = 0;

/// Errors raised by the incrementer.
#[derive(Debug, thiserror::Error)]
pub enum IncrementerError {
    /// The backing store could not be read or written. Per the source
    /// service's failure mode, every request is refused rather than risk
    /// issuing a duplicate identifier.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    /// `count` was zero; there is nothing to allocate.
    #[error("requested block count must be positive")]
    NonPositiveCount,
    /// An increment was not positive.
    #[error("increment must be positive, got {0}")]
    NonPositiveIncrement(i64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Counter {
    current: i64,
    increment: i64,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            current: DEFAULT_INITIAL_VALUE,
            increment: DEFAULT_INCREMENT,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterFile {
    counters: HashMap<String, Counter>,
}

/// A durable, file-backed incrementer. All operations take an internal
/// mutex, so concurrent callers are serialized: the store, not the
/// caller, is the source of truth for what has already been issued.
pub struct Incrementer {
    path: PathBuf,
    state: Mutex<CounterFile>,
}

impl Incrementer {
    /// Open (or create) the counter file at `path`. If `delete_if_exists`
    /// is set, any existing file at `path` is discarded and the
    /// incrementer starts from a clean slate.
    pub fn open(path: impl Into<PathBuf>, delete_if_exists: bool) -> Result<Self, IncrementerError> {
        let path = path.into();
        if delete_if_exists && path.exists() {
            fs::remove_file(&path).map_err(|e| IncrementerError::Unavailable(e.to_string()))?;
        }
        let state = if path.exists() {
            load(&path)?
        } else {
            CounterFile::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Set the increment applied to `name` going forward. Takes effect on
    /// the next [`Incrementer::next`] call for that name.
    pub fn set_increment(&self, name: &str, increment: i64) -> Result<(), IncrementerError> {
        if increment <= 0 {
            return Err(IncrementerError::NonPositiveIncrement(increment));
        }
        let mut state = self.state.lock();
        let counter = state.counters.entry(name.to_string()).or_default();
        counter.increment = increment;
        persist(&self.path, &state)
    }

    /// Set the initial value for `name`. Has no effect if `name` has
    /// already issued at least one identifier.
    pub fn set_initial_value(&self, name: &str, initial_value: i64) -> Result<(), IncrementerError> {
        let mut state = self.state.lock();
        let counter = state.counters.entry(name.to_string()).or_default();
        counter.current = initial_value;
        persist(&self.path, &state)
    }

    /// Allocate a contiguous block of `count` identifiers for `name`,
    /// returning `[id, id + increment, ..., id + (count - 1) * increment]`.
    /// Creates `name` with the default initial value and increment on
    /// first use.
    pub fn next(&self, name: &str, count: usize) -> Result<Vec<i64>, IncrementerError> {
        if count == 0 {
            return Err(IncrementerError::NonPositiveCount);
        }
        let mut state = self.state.lock();
        let counter = state.counters.entry(name.to_string()).or_default();
        let increment = counter.increment;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            counter.current += increment;
            ids.push(counter.current);
        }
        persist(&self.path, &state)?;
        Ok(ids)
    }

    /// The current value for `name`, or [`DEFAULT_INITIAL_VALUE`] if it
    /// has never been touched.
    #[must_use]
    pub fn current(&self, name: &str) -> i64 {
        self.state
            .lock()
            .counters
            .get(name)
            .map_or(DEFAULT_INITIAL_VALUE, |counter| counter.current)
    }
}

fn load(path: &Path) -> Result<CounterFile, IncrementerError> {
    let bytes = fs::read(path).map_err(|e| IncrementerError::Unavailable(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| IncrementerError::Unavailable(e.to_string()))
}

fn persist(path: &Path, state: &CounterFile) -> Result<(), IncrementerError> {
    let bytes =
        serde_json::to_vec_pretty(state).map_err(|e| IncrementerError::Unavailable(e.to_string()))?;
    fs::write(path, bytes).map_err(|e| IncrementerError::Unavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("urts-incrementer-test-{name}-{}.json", std::process::id()))
    }

    // ── 1. a fresh name starts from the default initial value ───────────

    #[test]
    fn fresh_name_starts_from_default() {
        let path = temp_path("fresh");
        let _ = fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        let ids = incrementer.next("pick", 3).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        let _ = fs::remove_file(&path);
    }

    // ── 2. identifiers never decrease across a reopen of the same file ──

    #[test]
    fn identifiers_persist_across_reopen() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);
        {
            let incrementer = Incrementer::open(&path, false).unwrap();
            incrementer.next("origin", 5).unwrap();
        }
        let reopened = Incrementer::open(&path, false).unwrap();
        let ids = reopened.next("origin", 2).unwrap();
        assert_eq!(ids, vec![6, 7]);
        let _ = fs::remove_file(&path);
    }

    // ── 3. delete_if_exists discards prior state ─────────────────────────

    #[test]
    fn delete_if_exists_resets_state() {
        let path = temp_path("reset");
        let _ = fs::remove_file(&path);
        {
            let incrementer = Incrementer::open(&path, false).unwrap();
            incrementer.next("pick", 10).unwrap();
        }
        let reset = Incrementer::open(&path, true).unwrap();
        let ids = reset.next("pick", 1).unwrap();
        assert_eq!(ids, vec![1]);
        let _ = fs::remove_file(&path);
    }

    // ── 4. a custom increment produces a contiguous block with that step ──

    #[test]
    fn custom_increment_steps_the_block() {
        let path = temp_path("increment");
        let _ = fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        incrementer.set_increment("batch", 100).unwrap();
        let ids = incrementer.next("batch", 3).unwrap();
        assert_eq!(ids, vec![100, 200, 300]);
        let _ = fs::remove_file(&path);
    }

    // ── 5. a zero-length request is rejected ─────────────────────────────

    #[test]
    fn rejects_zero_count() {
        let path = temp_path("zero");
        let _ = fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        let err = incrementer.next("pick", 0).unwrap_err();
        assert!(matches!(err, IncrementerError::NonPositiveCount));
        let _ = fs::remove_file(&path);
    }

    // ── 6. setting a non-positive increment is rejected ──────────────────

    #[test]
    fn rejects_non_positive_increment() {
        let path = temp_path("bad-increment");
        let _ = fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        let err = incrementer.set_increment("pick", 0).unwrap_err();
        assert!(matches!(err, IncrementerError::NonPositiveIncrement(0)));
        let _ = fs::remove_file(&path);
    }

    // ── 7. set_initial_value seeds the starting point for a fresh name ───

    #[test]
    fn set_initial_value_seeds_fresh_name() {
        let path = temp_path("seed");
        let _ = fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        incrementer.set_initial_value("origin", 1_000).unwrap();
        let ids = incrementer.next("origin", 1).unwrap();
        assert_eq!(ids, vec![1_001]);
        let _ = fs::remove_file(&path);
    }
}
