// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use std::fmt;

/// A MAJOR.MINOR.PATCH protocol version. Two versions are wire-compatible
/// when their major components match; minor/patch only document additive
/// or corrective changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Incremented on a breaking wire change.
    pub major: u16,
    /// Incremented on a backward-compatible addition.
    pub minor: u16,
    /// Incremented on a backward-compatible fix.
    pub patch: u16,
}

impl Version {
    /// Construct a version from its three components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True if `self` and `other` share a major version and are therefore
    /// safe to exchange on the wire.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_major_is_compatible() {
        assert!(Version::new(1, 0, 0).is_compatible_with(&Version::new(1, 9, 3)));
    }

    #[test]
    fn different_major_is_incompatible() {
        assert!(!Version::new(2, 0, 0).is_compatible_with(&Version::new(1, 0, 0)));
    }
}
