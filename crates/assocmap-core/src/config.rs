// ── Runtime collection configuration ──
//
// These types describe *what* to poll and *how* to render firewall
// commands. They never touch disk: `assocmap-config` builds them from
// the configuration file and hands them in.

use std::time::Duration;

use assocmap_snmp::SessionOptions;

/// How long the driver waits between scheduled rounds by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the collection pipeline.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Controller addresses (`host` or `host:port`).
    pub controllers: Vec<String>,
    /// Interval between scheduled rounds. Zero disables the driver.
    pub poll_interval: Duration,
    /// Fixed protocol tuning shared by every controller session.
    pub session: SessionOptions,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            controllers: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            session: SessionOptions::default(),
        }
    }
}

/// Target set for generated membership commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpsetConfig {
    pub name: String,
    /// Entry lifetime in seconds.
    pub timeout: u64,
}

impl Default for IpsetConfig {
    fn default() -> Self {
        Self {
            name: "locafw".into(),
            timeout: 600,
        }
    }
}

/// One name-matching rule: every device on an access point whose name
/// matches `pattern` gets paired with each of `destinations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRule {
    /// Regular expression matched against access-point names.
    pub pattern: String,
    pub destinations: Vec<String>,
}

impl AclRule {
    pub fn new(pattern: impl Into<String>, destinations: Vec<String>) -> Self {
        Self {
            pattern: pattern.into(),
            destinations,
        }
    }
}
