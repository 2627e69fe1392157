// ── Per-controller results and round events ──

use std::collections::BTreeMap;

use serde::Serialize;

use super::kind::RecordKind;

/// A key → value mapping for one record kind.
///
/// Ordered so that listings and generated commands are stable.
pub type RecordMap = BTreeMap<String, String>;

/// IPv4 null address reported for devices without a lease.
pub const NULL_IP: &str = "0.0.0.0";

/// How a single controller's poll went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    Ok,
    Failed { reason: String },
}

impl PollOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// One controller's extracted answer for one kind in one round.
///
/// For `Join` the entries are the raw ownership table (device
/// link-address → access-point link-address); the reconciler resolves
/// them against the published `DeviceAssoc` and `ApAssoc` mappings.
#[derive(Debug, Clone)]
pub struct Extract {
    pub controller: String,
    pub kind: RecordKind,
    pub round: u64,
    pub entries: RecordMap,
    pub outcome: PollOutcome,
}

impl Extract {
    pub fn ok(controller: impl Into<String>, kind: RecordKind, round: u64, entries: RecordMap) -> Self {
        Self {
            controller: controller.into(),
            kind,
            round,
            entries,
            outcome: PollOutcome::Ok,
        }
    }

    /// A failed poll still counts toward the round, with no entries.
    pub fn failed(
        controller: impl Into<String>,
        kind: RecordKind,
        round: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            controller: controller.into(),
            kind,
            round,
            entries: RecordMap::new(),
            outcome: PollOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// Emitted once per (kind, round) when the last controller reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundEvent {
    pub kind: RecordKind,
    pub round: u64,
    /// Controllers that reported, including failed ones.
    pub controllers: usize,
    /// Entries in the published mapping.
    pub entries: usize,
    /// Controllers whose poll failed this round.
    pub failed: usize,
}
