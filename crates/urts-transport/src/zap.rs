// SPDX-License-Identifier: MIT
//! Authentication level for a transport endpoint.
//!
//! No cryptography is implemented here; this is a placeholder that gives
//! every endpoint constructor a concrete value to accept, so the four
//! standard levels can be threaded through configuration and plumbed to a
//! real handshake later without changing any endpoint's signature.

/// An endpoint's authentication posture, named after the four
/// conventional ZeroMQ ZAP security levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZapOptions {
    /// No authentication or encryption at all.
    Grasslands,
    /// Plain username/password authentication, no encryption.
    Strawhouse {
        /// Username presented to the peer.
        username: String,
        /// Password presented to the peer.
        password: String,
    },
    /// Curve-based encryption with a known set of peer public keys, but
    /// no client authentication beyond key possession.
    Woodhouse {
        /// This endpoint's public key, opaque bytes.
        public_key: Vec<u8>,
    },
    /// Curve-based encryption plus an explicit allow-list of client
    /// public keys.
    Stonehouse {
        /// This endpoint's public key, opaque bytes.
        public_key: Vec<u8>,
        /// Public keys this endpoint will accept connections from.
        allowed_client_keys: Vec<Vec<u8>>,
    },
}

impl Default for ZapOptions {
    fn default() -> Self {
        Self::Grasslands
    }
}
