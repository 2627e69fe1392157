// ── Link-layer identity ──
//
// Every association record is keyed by a link-address. Controllers
// encode it two ways: as the trailing arcs of a table row OID (one
// decimal arc per byte) and as a raw 6-byte octet string payload.
// Both normalize to the same bare lowercase hex form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Link-layer address, normalized to bare lowercase hex (`001b22440102`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkAddress(String);

impl LinkAddress {
    /// Decode a row index such as `0.27.34.68.1.2`.
    ///
    /// Returns `None` for an empty suffix or any arc that is not a byte.
    pub fn from_oid_suffix(arcs: &[u32]) -> Option<Self> {
        if arcs.is_empty() {
            return None;
        }
        let mut hex = String::with_capacity(arcs.len() * 2);
        for arc in arcs {
            let byte = u8::try_from(*arc).ok()?;
            let _ = write!(hex, "{byte:02x}");
        }
        Some(Self(hex))
    }

    /// Hex-encode a raw octet string payload. Empty payloads yield `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(hex, "{byte:02x}");
        }
        Some(Self(hex))
    }

    /// All-zero addresses mark an unassociated slot.
    pub fn is_zero(&self) -> bool {
        is_zero_hex(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// `true` for an empty string or one made only of `'0'` characters.
pub(crate) fn is_zero_hex(hex: &str) -> bool {
    hex.bytes().all(|b| b == b'0')
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
