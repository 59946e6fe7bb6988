// SPDX-License-Identifier: MIT
//! The envelope and message types exchanged between URTS services.

use crate::error::ProtoError;
use crate::version::Version;
use crate::wire;
use serde::{Deserialize, Serialize};
use urts_model::{Origin, Pick, ProbabilityPacket, SamplePacket};

/// Protocol version this crate encodes and accepts. Major version changes
/// are breaking; minor/patch changes must stay backward compatible.
pub const CURRENT_VERSION: Version = Version::new(1, 0, 0);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEnvelope {
    op: String,
    version: Version,
    ts: i64,
    payload: serde_cbor::Value,
}

/// One of the known payload types a URTS service exchanges, tagged and
/// versioned by its envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A contiguous run of waveform data on one channel.
    DataPacket(SamplePacket),
    /// A detector's posterior probability stream.
    Probability(ProbabilityPacket),
    /// A phase pick.
    Pick(Pick),
    /// A candidate or finalized hypocenter.
    Origin(Origin),
}

impl Message {
    /// The canonical string naming this message's type, used as the
    /// envelope's `op` field.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::DataPacket(_) => "DataPacket",
            Self::Probability(_) => "Probability",
            Self::Pick(_) => "Pick",
            Self::Origin(_) => "Origin",
        }
    }

    /// The protocol version this message is encoded with.
    #[must_use]
    pub const fn version(&self) -> Version {
        CURRENT_VERSION
    }

    /// Encode this message into a versioned, tagged envelope.
    pub fn encode(&self, timestamp_micros: i64) -> Result<Vec<u8>, ProtoError> {
        let payload = match self {
            Self::DataPacket(p) => serde_cbor::value::to_value(p),
            Self::Probability(p) => serde_cbor::value::to_value(p),
            Self::Pick(p) => serde_cbor::value::to_value(p),
            Self::Origin(p) => serde_cbor::value::to_value(p),
        }
        .map_err(|e| ProtoError::MalformedMessage(e.to_string()))?;

        let raw = RawEnvelope {
            op: self.type_tag().to_string(),
            version: self.version(),
            ts: timestamp_micros,
            payload,
        };
        wire::to_cbor(&raw)
    }

    /// Decode a message and the wall-clock timestamp its sender stamped
    /// it with.
    pub fn decode(bytes: &[u8]) -> Result<(Self, i64), ProtoError> {
        let raw: RawEnvelope = wire::from_cbor(bytes)?;
        if !raw.version.is_compatible_with(&CURRENT_VERSION) {
            return Err(ProtoError::VersionMismatch {
                expected: CURRENT_VERSION,
                got: raw.version,
            });
        }
        let from_payload = |v| serde_cbor::value::from_value(v).map_err(|e| ProtoError::MalformedMessage(e.to_string()));
        let message = match raw.op.as_str() {
            "DataPacket" => Self::DataPacket(from_payload(raw.payload)?),
            "Probability" => Self::Probability(from_payload(raw.payload)?),
            "Pick" => Self::Pick(from_payload(raw.payload)?),
            "Origin" => Self::Origin(from_payload(raw.payload)?),
            other => return Err(ProtoError::UnknownMessageType(other.to_string())),
        };
        Ok((message, raw.ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_model::{ChannelId, PhaseHint};

    fn sample_packet() -> SamplePacket {
        let channel = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        SamplePacket::new(channel, 0, 100.0, vec![1.0, 2.0, 3.0]).unwrap()
    }

    // ── 1. encode/decode round trip preserves payload and timestamp ─────

    #[test]
    fn data_packet_round_trip() {
        let message = Message::DataPacket(sample_packet());
        let bytes = message.encode(42).unwrap();
        let (decoded, ts) = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(ts, 42);
    }

    // ── 2. pick round trip ───────────────────────────────────────────────

    #[test]
    fn pick_round_trip() {
        let channel = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        let pick = Pick::new(channel, 1_000, PhaseHint::S, 7);
        let message = Message::Pick(pick);
        let bytes = message.encode(0).unwrap();
        let (decoded, _) = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    // ── 3. unknown op is rejected ─────────────────────────────────────────

    #[test]
    fn unknown_op_rejected() {
        let raw = RawEnvelope {
            op: "NotARealMessage".to_string(),
            version: CURRENT_VERSION,
            ts: 0,
            payload: serde_cbor::Value::Null,
        };
        let bytes = wire::to_cbor(&raw).unwrap();
        let err = Message::decode(&bytes).unwrap_err();
        assert_eq!(err, ProtoError::UnknownMessageType("NotARealMessage".to_string()));
    }

    // ── 4. incompatible major version is rejected ────────────────────────

    #[test]
    fn version_mismatch_rejected() {
        let message = Message::DataPacket(sample_packet());
        let payload = serde_cbor::value::to_value(sample_packet()).unwrap();
        let raw = RawEnvelope {
            op: message.type_tag().to_string(),
            version: Version::new(2, 0, 0),
            ts: 0,
            payload,
        };
        let bytes = wire::to_cbor(&raw).unwrap();
        let err = Message::decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            ProtoError::VersionMismatch {
                expected: CURRENT_VERSION,
                got: Version::new(2, 0, 0),
            }
        );
    }
}
