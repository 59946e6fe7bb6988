// SPDX-License-Identifier: MIT
//! CBOR serialization and length-prefixed framing for streaming transports.

use crate::error::ProtoError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Largest payload this crate will frame or accept, in bytes. Guards
/// against a malformed or hostile length prefix driving an unbounded
/// allocation.
pub const MAX_FRAME_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Number of bytes in a frame's length prefix.
pub const FRAME_HEADER_BYTES: usize = 4;

/// Serialize a value to CBOR.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtoError> {
    serde_cbor::to_vec(value).map_err(|e| ProtoError::Codec(e.to_string()))
}

/// Deserialize a value from CBOR.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtoError> {
    serde_cbor::from_slice(bytes).map_err(|e| ProtoError::Codec(e.to_string()))
}

/// Prefix a CBOR payload with its big-endian 4-byte length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ProtoError> {
    if payload.len() > MAX_FRAME_PAYLOAD_BYTES {
        return Err(ProtoError::Frame(format!(
            "payload of {} bytes exceeds the {MAX_FRAME_PAYLOAD_BYTES} byte limit",
            payload.len()
        )));
    }
    let mut framed = Vec::with_capacity(FRAME_HEADER_BYTES + payload.len());
    #[allow(clippy::cast_possible_truncation)]
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Parse a frame's 4-byte big-endian length header, validating it against
/// [`MAX_FRAME_PAYLOAD_BYTES`].
pub fn decode_frame_header(header: [u8; FRAME_HEADER_BYTES]) -> Result<usize, ProtoError> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_PAYLOAD_BYTES {
        return Err(ProtoError::Frame(format!(
            "frame header declares {len} bytes, exceeding the {MAX_FRAME_PAYLOAD_BYTES} byte limit"
        )));
    }
    Ok(len)
}
