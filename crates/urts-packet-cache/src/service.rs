// SPDX-License-Identifier: MIT
//! Request/reply contract for the packet cache, so it can sit behind a
//! [`urts_worker::Algorithm`] the same way every inference service does.

use crate::{CacheError, PacketCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use urts_interp::Gap;
use urts_model::{ChannelId, SamplePacket};
use urts_proto::wire::{from_cbor, to_cbor};
use urts_worker::{Algorithm, ProcessError};

/// A request against the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CacheRequest {
    /// Every cached packet overlapping `[start_micros, end_micros)`.
    GetWindow {
        /// Channel to read.
        channel: ChannelId,
        /// Window start, UTC microseconds.
        start_micros: i64,
        /// Window end, UTC microseconds (exclusive).
        end_micros: i64,
    },
    /// The window resampled onto a uniform grid.
    GetUniform {
        /// Channel to read.
        channel: ChannelId,
        /// Window start, UTC microseconds.
        start_micros: i64,
        /// Window end, UTC microseconds (exclusive).
        end_micros: i64,
        /// Target sampling rate of the resampled packet.
        target_rate_hz: f64,
    },
}

/// The cache's answer to a [`CacheRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CacheResponse {
    /// Raw cached packets overlapping the requested window, in onset order.
    Window(Vec<SamplePacket>),
    /// The requested window, resampled, with any wide gaps reported.
    Uniform {
        /// The resampled packet.
        packet: SamplePacket,
        /// Gaps zero-filled during resampling.
        gaps: Vec<Gap>,
    },
}

/// Process one [`CacheRequest`] against `cache`.
///
/// A channel the cache has never seen, or a window with no overlapping
/// data, is processing the request correctly and finding nothing — that is
/// reported as [`ProcessError::AlgorithmFailure`], not as a malformed
/// request.
pub fn handle(cache: &PacketCache, request: CacheRequest) -> Result<CacheResponse, ProcessError> {
    match request {
        CacheRequest::GetWindow {
            channel,
            start_micros,
            end_micros,
        } => cache
            .get_window(&channel, start_micros, end_micros)
            .map(CacheResponse::Window)
            .map_err(cache_error_to_process_error),
        CacheRequest::GetUniform {
            channel,
            start_micros,
            end_micros,
            target_rate_hz,
        } => cache
            .get_uniform(&channel, start_micros, end_micros, target_rate_hz)
            .map(|(packet, gaps)| CacheResponse::Uniform { packet, gaps })
            .map_err(cache_error_to_process_error),
    }
}

fn cache_error_to_process_error(error: CacheError) -> ProcessError {
    ProcessError::AlgorithmFailure(error.to_string())
}

/// Adapts the packet cache to a [`urts_worker::Algorithm`] by CBOR-decoding
/// each request and CBOR-encoding its reply.
pub struct CacheAlgorithm {
    cache: Arc<PacketCache>,
}

impl CacheAlgorithm {
    /// Build an algorithm backed by `cache`.
    #[must_use]
    pub const fn new(cache: Arc<PacketCache>) -> Self {
        Self { cache }
    }
}

impl Algorithm for CacheAlgorithm {
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let request: CacheRequest = from_cbor(payload)
            .map_err(|e| ProcessError::InvalidMessage(e.to_string()))?;
        let response = handle(&self.cache, request)?;
        to_cbor(&response).map_err(|e| ProcessError::AlgorithmFailure(e.to_string()))
    }
}
