use thiserror::Error;

/// Top-level error type for the `assocmap-snmp` crate.
///
/// Covers every failure mode of a controller session: address resolution,
/// socket I/O, protocol decoding and agent-reported errors.
/// `assocmap-core` never surfaces these to callers; a failed walk is
/// recorded as a failed poll and treated as an empty result.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Socket error (bind, connect, send).
    #[error("I/O error talking to {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// No response after all retries were exhausted.
    #[error("no response from {target} after {attempts} attempts")]
    Timeout { target: String, attempts: u32 },

    /// The controller address did not resolve to any socket address.
    #[error("cannot resolve controller address '{0}'")]
    Unresolvable(String),

    /// The session has been closed and cannot issue further requests.
    #[error("session to {0} is closed")]
    Closed(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// Malformed or unexpected PDU.
    #[error("protocol error from {target}: {message}")]
    Protocol { target: String, message: String },

    /// The agent answered with a non-zero error-status.
    #[error("agent {target} returned error-status {status}")]
    Agent { target: String, status: u32 },

    /// An object identifier string could not be parsed.
    #[error("invalid object identifier '{0}'")]
    InvalidOid(String),

    // ── Runtime ─────────────────────────────────────────────────────
    /// The blocking worker running the request panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Returns `true` if the request may succeed when repeated on a
    /// fresh socket. A session retries these within one walk.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Timeout { .. })
    }

    /// The controller address this error relates to, if known.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Io { target, .. }
            | Self::Timeout { target, .. }
            | Self::Protocol { target, .. }
            | Self::Agent { target, .. } => Some(target),
            Self::Unresolvable(target) | Self::Closed(target) => Some(target),
            Self::InvalidOid(_) | Self::Task(_) => None,
        }
    }
}
