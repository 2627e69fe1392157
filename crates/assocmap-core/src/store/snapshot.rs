// ── Published association snapshot ──
//
// One immutable mapping per record kind, swapped wholesale when a round
// completes. Readers load an `Arc` and keep a complete, consistent view
// for as long as they hold it, even across a concurrent replacement.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::watch;

use crate::model::{RecordKind, RecordMap};

/// A fully reconciled mapping as it was published.
#[derive(Debug, Default)]
pub struct Published {
    /// Round that produced this mapping. Zero means never published.
    pub round: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub entries: RecordMap,
}

/// Per-kind publication metadata, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub kind: RecordKind,
    pub round: u64,
    pub entries: usize,
    pub published_at: Option<DateTime<Utc>>,
}

/// The currently published association data.
///
/// The reconciler is the only writer; any number of readers may load
/// concurrently without locking.
pub struct SnapshotStore {
    device_assoc: ArcSwap<Published>,
    ap_assoc: ArcSwap<Published>,
    join: ArcSwap<Published>,
    controller_of: ArcSwap<Published>,
    last_publish: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (last_publish, _) = watch::channel(None);

        Self {
            device_assoc: ArcSwap::from_pointee(Published::default()),
            ap_assoc: ArcSwap::from_pointee(Published::default()),
            join: ArcSwap::from_pointee(Published::default()),
            controller_of: ArcSwap::from_pointee(Published::default()),
            last_publish,
        }
    }

    fn slot(&self, kind: RecordKind) -> &ArcSwap<Published> {
        match kind {
            RecordKind::DeviceAssoc => &self.device_assoc,
            RecordKind::ApAssoc => &self.ap_assoc,
            RecordKind::Join => &self.join,
            RecordKind::ControllerOf => &self.controller_of,
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Atomically replace the mapping for `kind`.
    ///
    /// Takes ownership of the finished buffer; nothing is copied.
    pub fn replace(&self, kind: RecordKind, entries: RecordMap, round: u64) {
        let now = Utc::now();
        self.slot(kind).store(Arc::new(Published {
            round,
            published_at: Some(now),
            entries,
        }));
        self.last_publish.send_replace(Some(now));
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current mapping for `kind` (cheap `Arc` clone).
    pub fn read(&self, kind: RecordKind) -> Arc<Published> {
        self.slot(kind).load_full()
    }

    /// Access-point name → ordered device IP list, from the `Join` mapping.
    pub fn associations(&self) -> BTreeMap<String, Vec<String>> {
        associations(&self.read(RecordKind::Join).entries)
    }

    pub fn summary(&self) -> Vec<KindSummary> {
        RecordKind::iter()
            .map(|kind| {
                let published = self.read(kind);
                KindSummary {
                    kind,
                    round: published.round,
                    entries: published.entries.len(),
                    published_at: published.published_at,
                }
            })
            .collect()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_publish(&self) -> Option<DateTime<Utc>> {
        *self.last_publish.borrow()
    }

    /// Subscribe to publication timestamps.
    pub fn subscribe(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_publish.subscribe()
    }

    /// How long ago anything was last published, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_publish().map(|t| Utc::now() - t)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Split each space-separated `Join` value into its device addresses.
pub fn associations(join: &RecordMap) -> BTreeMap<String, Vec<String>> {
    join.iter()
        .map(|(ap, ips)| {
            (
                ap.clone(),
                ips.split_whitespace().map(str::to_owned).collect(),
            )
        })
        .collect()
}
