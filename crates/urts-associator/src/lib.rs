// SPDX-License-Identifier: MIT
//! Associator (`mAssociate`): a batch of picks in, candidate origins
//! out. The associator owns no state between requests — every call is
//! pure, a function of its input batch alone.
//!
//! The clustering algorithm itself (which picks across which stations
//! belong to the same event) is opaque and supplied by an
//! [`AssociatorModel`] implementation; this crate owns only the
//! request/reply contract and its validation.

use serde::{Deserialize, Serialize};
use urts_model::Pick;
use urts_worker::{Algorithm, ProcessError};

/// A trained or algorithmic associator. Opaque to this crate; only the
/// input/output contract is specified here.
pub trait AssociatorModel: Send + Sync {
    /// Partition `picks` into candidate origins, each expressed as the
    /// indices (into `picks`) of its contributing picks. A pick may
    /// appear in at most one group; picks that associate with nothing are
    /// simply omitted.
    fn associate(&self, picks: &[Pick]) -> Vec<Vec<usize>>;
}

/// A request to the associator: a batch of raw picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociateRequest {
    /// Picks to associate. Order is not significant to the contract, but
    /// is preserved in the response's index references.
    pub picks: Vec<Pick>,
}

/// A reply from the associator: one group of picks per candidate origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociateResponse {
    /// Candidate origins, each as the subset of input picks that
    /// contributed to it.
    pub candidate_origins: Vec<Vec<Pick>>,
}

/// Handle one associate request against `model`.
pub fn handle(
    model: &dyn AssociatorModel,
    request: AssociateRequest,
) -> Result<AssociateResponse, ProcessError> {
    if request.picks.is_empty() {
        return Err(ProcessError::InvalidMessage(
            "associate request must carry at least one pick".to_string(),
        ));
    }
    let groups = model.associate(&request.picks);
    let candidate_origins = groups
        .into_iter()
        .map(|indices| {
            indices
                .into_iter()
                .filter_map(|index| request.picks.get(index).cloned())
                .collect()
        })
        .collect();
    Ok(AssociateResponse { candidate_origins })
}

/// Adapts an [`AssociatorModel`] to the [`Algorithm`] contract a
/// `urts-worker` pool runs, encoding requests and replies as CBOR.
pub struct AssociatorAlgorithm<M> {
    model: M,
}

impl<M: AssociatorModel> AssociatorAlgorithm<M> {
    /// Wrap `model` for use in a worker pool.
    pub const fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: AssociatorModel + 'static> Algorithm for AssociatorAlgorithm<M> {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: AssociateRequest = urts_proto::wire::from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.model, request)?;
        urts_proto::wire::to_cbor(&response)
            .map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_model::{ChannelId, PhaseHint};

    struct PairAssociator;
    impl AssociatorModel for PairAssociator {
        fn associate(&self, picks: &[Pick]) -> Vec<Vec<usize>> {
            (0..picks.len())
                .collect::<Vec<_>>()
                .chunks(2)
                .map(<[usize]>::to_vec)
                .collect()
        }
    }

    fn pick(station: &str, id: u64) -> Pick {
        let channel = ChannelId::new("UU", station, "HHZ", "01").unwrap();
        Pick::new(channel, 0, PhaseHint::P, id)
    }

    // ── 1. an empty batch is rejected ────────────────────────────────────

    #[test]
    fn rejects_empty_batch() {
        let err = handle(&PairAssociator, AssociateRequest { picks: vec![] }).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidMessage(_)));
    }

    // ── 2. picks are partitioned into the model's candidate groups ──────

    #[test]
    fn partitions_into_candidate_origins() {
        let picks = vec![pick("FORK", 1), pick("MPU", 2), pick("RRI2", 3)];
        let response = handle(&PairAssociator, AssociateRequest { picks }).unwrap();
        assert_eq!(response.candidate_origins.len(), 2);
        assert_eq!(response.candidate_origins[0].len(), 2);
        assert_eq!(response.candidate_origins[1].len(), 1);
    }

    // ── 3. no pick appears in more than one candidate origin ─────────────

    #[test]
    fn no_pick_appears_twice() {
        let picks = vec![pick("FORK", 1), pick("MPU", 2), pick("RRI2", 3), pick("WTU", 4)];
        let response = handle(&PairAssociator, AssociateRequest { picks }).unwrap();
        let mut seen = std::collections::HashSet::new();
        for group in &response.candidate_origins {
            for p in group {
                assert!(seen.insert(p.identifier), "pick {} appeared twice", p.identifier);
            }
        }
        assert_eq!(seen.len(), 4);
    }
}
