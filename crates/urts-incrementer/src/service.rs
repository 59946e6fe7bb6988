// SPDX-License-Identifier: MIT
//! Request/reply contract for the incrementer, so it can sit behind a
//! [`urts_worker::Algorithm`] the same way every other service does.

use crate::{Incrementer, IncrementerError};
use serde::{Deserialize, Serialize};
use urts_proto::wire::{from_cbor, to_cbor};
use urts_worker::{Algorithm, ProcessError};

/// A request against the incrementer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IncrementerRequest {
    /// Allocate a contiguous block of identifiers for `name`.
    Next {
        /// The name whose counter is incremented.
        name: String,
        /// Number of identifiers requested.
        count: usize,
    },
    /// Change the step applied to `name` going forward.
    SetIncrement {
        /// The name whose increment is reconfigured.
        name: String,
        /// The new increment, must be positive.
        increment: i64,
    },
    /// Seed the starting point for a name that has not yet issued an
    /// identifier.
    SetInitialValue {
        /// The name whose initial value is seeded.
        name: String,
        /// The new initial value.
        initial_value: i64,
    },
    /// Read `name`'s current value without allocating.
    Current {
        /// The name to read.
        name: String,
    },
}

/// The incrementer's answer to an [`IncrementerRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncrementerResponse {
    /// The allocated block, from [`IncrementerRequest::Next`].
    Ids(Vec<i64>),
    /// Acknowledges a configuration change.
    Ack,
    /// `name`'s current value, from [`IncrementerRequest::Current`].
    Current(i64),
}

/// Process one [`IncrementerRequest`] against `incrementer`.
pub fn handle(
    incrementer: &Incrementer,
    request: IncrementerRequest,
) -> Result<IncrementerResponse, ProcessError> {
    match request {
        IncrementerRequest::Next { name, count } => incrementer
            .next(&name, count)
            .map(IncrementerResponse::Ids)
            .map_err(incrementer_error_to_process_error),
        IncrementerRequest::SetIncrement { name, increment } => incrementer
            .set_increment(&name, increment)
            .map(|()| IncrementerResponse::Ack)
            .map_err(incrementer_error_to_process_error),
        IncrementerRequest::SetInitialValue { name, initial_value } => incrementer
            .set_initial_value(&name, initial_value)
            .map(|()| IncrementerResponse::Ack)
            .map_err(incrementer_error_to_process_error),
        IncrementerRequest::Current { name } => {
            Ok(IncrementerResponse::Current(incrementer.current(&name)))
        }
    }
}

fn incrementer_error_to_process_error(error: IncrementerError) -> ProcessError {
    match error {
        IncrementerError::NonPositiveCount | IncrementerError::NonPositiveIncrement(_) => {
            ProcessError::InvalidMessage(error.to_string())
        }
        IncrementerError::Unavailable(_) => ProcessError::AlgorithmFailure(error.to_string()),
    }
}

/// Adapts the incrementer to a [`urts_worker::Algorithm`] by CBOR-decoding
/// each request and CBOR-encoding its reply.
pub struct IncrementerAlgorithm {
    incrementer: Incrementer,
}

impl IncrementerAlgorithm {
    /// Build an algorithm backed by `incrementer`.
    #[must_use]
    pub const fn new(incrementer: Incrementer) -> Self {
        Self { incrementer }
    }
}

impl Algorithm for IncrementerAlgorithm {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: IncrementerRequest = from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.incrementer, request)?;
        to_cbor(&response).map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "urts-incrementer-service-test-{name}-{}.json",
            std::process::id()
        ))
    }

    // ── 1. Next round-trips through the algorithm ────────────────────────

    #[test]
    fn next_round_trips_through_algorithm() {
        let path = temp_path("next");
        let _ = std::fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        let algorithm = IncrementerAlgorithm::new(incrementer);
        let request = IncrementerRequest::Next {
            name: "pick".to_string(),
            count: 3,
        };
        let payload = to_cbor(&request).unwrap();
        let reply = algorithm.process(&payload).unwrap();
        let response: IncrementerResponse = from_cbor(&reply).unwrap();
        assert_eq!(response, IncrementerResponse::Ids(vec![1, 2, 3]));
        let _ = std::fs::remove_file(&path);
    }

    // ── 2. a zero count is reported as an invalid message ────────────────

    #[test]
    fn zero_count_is_invalid_message() {
        let path = temp_path("zero");
        let _ = std::fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        let err = handle(
            &incrementer,
            IncrementerRequest::Next {
                name: "pick".to_string(),
                count: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidMessage(_)));
        let _ = std::fs::remove_file(&path);
    }

    // ── 3. Current reads without allocating ──────────────────────────────

    #[test]
    fn current_reads_without_allocating() {
        let path = temp_path("current");
        let _ = std::fs::remove_file(&path);
        let incrementer = Incrementer::open(&path, false).unwrap();
        incrementer.next("origin", 2).unwrap();
        let response = handle(
            &incrementer,
            IncrementerRequest::Current {
                name: "origin".to_string(),
            },
        )
        .unwrap();
        assert_eq!(response, IncrementerResponse::Current(2));
        let _ = std::fs::remove_file(&path);
    }
}
