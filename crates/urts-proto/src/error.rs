// SPDX-License-Identifier: MIT
use crate::version::Version;

/// Errors raised while encoding or decoding a wire message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// The envelope's `op` field did not name a message type this crate
    /// knows how to decode.
    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),
    /// The envelope parsed but the payload did not match its declared
    /// type.
    #[error("malformed message payload: {0}")]
    MalformedMessage(String),
    /// The envelope's version is incompatible with the version this crate
    /// speaks (major version must match exactly).
    #[error("version mismatch: expected major version {expected}, got {got}")]
    VersionMismatch {
        /// The version this crate implements.
        expected: Version,
        /// The version found on the wire.
        got: Version,
    },
    /// Serde's CBOR codec failed to encode or decode the envelope itself.
    #[error("CBOR codec error: {0}")]
    Codec(String),
    /// Length-prefixed framing was violated (oversized or truncated
    /// payload).
    #[error("frame error: {0}")]
    Frame(String),
}
