// SPDX-License-Identifier: MIT
//! A minimal in-memory service directory: a name-to-address phonebook
//! that lets one service locate another without hardcoded addresses.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;

/// A registry of named service addresses.
#[derive(Default)]
pub struct ServiceDirectory {
    entries: RwLock<HashMap<String, SocketAddr>>,
}

impl ServiceDirectory {
    /// Build an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the address a named service is reachable at.
    pub fn register(&self, name: impl Into<String>, addr: SocketAddr) {
        self.entries.write().insert(name.into(), addr);
    }

    /// Look up a named service's address.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SocketAddr> {
        self.entries.read().get(name).copied()
    }

    /// Remove a named service, returning true if it was present.
    pub fn deregister(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Names of every currently registered service.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── 1. register + lookup round trip ──────────────────────────────────

    #[test]
    fn register_and_lookup() {
        let directory = ServiceDirectory::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        directory.register("packetCache", addr);
        assert_eq!(directory.lookup("packetCache"), Some(addr));
    }

    // ── 2. unknown name returns None ─────────────────────────────────────

    #[test]
    fn unknown_name_returns_none() {
        let directory = ServiceDirectory::new();
        assert_eq!(directory.lookup("nope"), None);
    }

    // ── 3. deregister removes the entry ──────────────────────────────────

    #[test]
    fn deregister_removes_entry() {
        let directory = ServiceDirectory::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        directory.register("packetCache", addr);
        assert!(directory.deregister("packetCache"));
        assert_eq!(directory.lookup("packetCache"), None);
        assert!(!directory.deregister("packetCache"));
    }
}
