// ── Object identifiers and varbind values ──
//
// Owned, transport-independent representations of what a walk returns.
// The `snmp` crate hands out borrowed views tied to its receive buffer;
// everything is copied into these types before leaving the session.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Error;

/// A numeric object identifier, e.g. `1.3.6.1.4.1.14179.2.1.4.1.2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `prefix` is an ancestor of (or equal to) this OID.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The arcs that follow `prefix`, or `None` if `prefix` is not an ancestor.
    ///
    /// For table walks this is the row index, e.g. the six arcs of a
    /// link-address appended to a column OID.
    pub fn suffix_after(&self, prefix: &Oid) -> Option<&[u32]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Parse dotted notation. A single leading dot is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(Error::InvalidOid(s.to_owned()));
        }
        trimmed
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| Error::InvalidOid(s.to_owned())))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// A decoded varbind payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    OctetString(Vec<u8>),
    IpAddress(Ipv4Addr),
    Integer(i64),
    Unsigned(u64),
    /// Any other ASN.1 type; the walk keeps the row but the payload is unused.
    Other,
}

impl Value {
    /// Textual form for string-like payloads.
    ///
    /// `IpAddress` renders in dotted-quad form; octet strings are decoded
    /// as UTF-8 (lossily). Numeric and other types yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::IpAddress(ip) => Some(ip.to_string()),
            Self::Integer(_) | Self::Unsigned(_) | Self::Other => None,
        }
    }

    /// Raw bytes of an octet string payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::OctetString(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<snmp::Value<'_>> for Value {
    fn from(value: snmp::Value<'_>) -> Self {
        match value {
            snmp::Value::OctetString(bytes) => Self::OctetString(bytes.to_vec()),
            snmp::Value::IpAddress(octets) => Self::IpAddress(Ipv4Addr::from(octets)),
            snmp::Value::Integer(n) => Self::Integer(n),
            snmp::Value::Counter32(n) | snmp::Value::Unsigned32(n) | snmp::Value::Timeticks(n) => {
                Self::Unsigned(u64::from(n))
            }
            snmp::Value::Counter64(n) => Self::Unsigned(n),
            _ => Self::Other,
        }
    }
}

/// One row returned by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varbind {
    pub oid: Oid,
    pub value: Value,
}

impl Varbind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }
}
