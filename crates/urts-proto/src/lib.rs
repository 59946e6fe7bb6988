// SPDX-License-Identifier: MIT
//! Wire codec for messages exchanged between URTS services: a versioned
//! envelope over CBOR, length-prefixed framing for streaming transports,
//! and a deterministic CBOR encoding for canonicalizing payloads.

mod canonical;
mod error;
mod message;
mod version;
pub mod wire;

pub use canonical::{decode_value, encode_value, CanonError, CborValue};
pub use error::ProtoError;
pub use message::{Message, CURRENT_VERSION};
pub use version::Version;
