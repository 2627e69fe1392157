// ── Per-controller poll health ──
//
// Latest outcome per (controller, kind), written by the reconciler as
// extracts arrive and read by the status endpoint.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::model::{Extract, PollOutcome, RecordKind};

/// The most recent poll of one kind on one controller.
#[derive(Debug, Clone, Serialize)]
pub struct PollStatus {
    pub controller: String,
    pub kind: RecordKind,
    pub round: u64,
    #[serde(flatten)]
    pub outcome: PollOutcome,
    pub entries: usize,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ControllerHealth {
    latest: DashMap<(String, RecordKind), PollStatus>,
}

impl ControllerHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an extract's outcome, replacing the previous one for its
    /// controller and kind.
    pub fn record(&self, extract: &Extract) {
        let status = PollStatus {
            controller: extract.controller.clone(),
            kind: extract.kind,
            round: extract.round,
            outcome: extract.outcome.clone(),
            entries: extract.entries.len(),
            at: Utc::now(),
        };
        self.latest
            .insert((extract.controller.clone(), extract.kind), status);
    }

    /// All statuses, ordered by controller then kind.
    pub fn snapshot(&self) -> Vec<PollStatus> {
        let mut all: Vec<PollStatus> = self.latest.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| (&a.controller, a.kind).cmp(&(&b.controller, b.kind)));
        all
    }

    /// Controllers whose latest poll of any kind failed.
    pub fn failing(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .latest
            .iter()
            .filter(|e| !e.value().outcome.is_ok())
            .map(|e| e.key().0.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
