//! Protocol version used to gate packet decoding

use serde::{Deserialize, Serialize};
use std::fmt;

/// NatNet protocol version `[major, minor, build, revision]`.
///
/// Only `major` and `minor` take part in decode gating. The derived ordering
/// compares all four components lexicographically, which agrees with
/// [`at_least`](Self::at_least) on the (major, minor) prefix.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl ProtocolVersion {
    /// Version assumed before any server info has been received.
    ///
    /// It is the lowest-capability field set: no skeletons, no labeled
    /// markers, no residuals, no high-resolution timestamps.
    pub const UNNEGOTIATED: Self = Self::new(0, 0, 0, 0);

    pub const fn new(major: u8, minor: u8, build: u8, revision: u8) -> Self {
        Self { major, minor, build, revision }
    }

    /// Build from the 4-byte array used on the wire.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.build, self.revision]
    }

    /// `true` when this version is at or above `major.minor`.
    pub const fn at_least(self, major: u8, minor: u8) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }

    /// `true` when no version has been negotiated yet.
    pub fn is_unnegotiated(self) -> bool {
        self == Self::UNNEGOTIATED
    }
}

impl From<[u8; 4]> for ProtocolVersion {
    fn from(bytes: [u8; 4]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn at_least_compares_major_then_minor() {
        let v = ProtocolVersion::new(2, 9, 0, 0);
        assert!(v.at_least(2, 9));
        assert!(v.at_least(2, 0));
        assert!(v.at_least(1, 99));
        assert!(!v.at_least(2, 10));
        assert!(!v.at_least(3, 0));

        // Build and revision never participate.
        assert!(ProtocolVersion::new(3, 0, 0, 0).at_least(3, 0));
        assert!(!ProtocolVersion::new(2, 11, 255, 255).at_least(3, 0));
    }

    #[test]
    fn display_is_dotted_quad() {
        assert_eq!(ProtocolVersion::new(3, 1, 0, 0).to_string(), "3.1.0.0");
        assert_eq!(ProtocolVersion::default().to_string(), "0.0.0.0");
        assert!(ProtocolVersion::default().is_unnegotiated());
    }

    proptest! {
        #[test]
        fn at_least_agrees_with_tuple_ordering(
            a in any::<[u8; 4]>(),
            major in any::<u8>(),
            minor in any::<u8>(),
        ) {
            let v = ProtocolVersion::from_bytes(a);
            prop_assert_eq!(v.at_least(major, minor), (v.major, v.minor) >= (major, minor));
        }
    }
}
