// ── Reconciler ──
//
// Single consumer of every controller's extracts. Each queried kind has
// one accumulating `RoundBuffer`; when its countdown reaches zero the
// buffer is moved into the snapshot store, a fresh one is allocated for
// the next round, and a `RoundEvent` is broadcast.
//
// Invariant: a buffer's countdown starts at the controller count, drops
// by one per distinct controller report for its round, and reaches zero
// exactly once. After that, further reports for the same round are stale.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::model::{Extract, NULL_IP, RecordKind, RecordMap, RoundEvent, is_zero_hex};
use crate::store::{ControllerHealth, SnapshotStore};

/// Accumulator for one kind during one round.
#[derive(Debug)]
struct RoundBuffer {
    round: u64,
    remaining: usize,
    reported: HashSet<String>,
    failed: usize,
    entries: RecordMap,
}

impl RoundBuffer {
    fn new(round: u64, controllers: usize) -> Self {
        Self {
            round,
            remaining: controllers,
            reported: HashSet::new(),
            failed: 0,
            entries: RecordMap::new(),
        }
    }
}

pub struct Reconciler {
    controllers: usize,
    store: Arc<SnapshotStore>,
    health: Arc<ControllerHealth>,
    events: broadcast::Sender<RoundEvent>,
    device_assoc: RoundBuffer,
    ap_assoc: RoundBuffer,
    join: RoundBuffer,
    /// Access-point name → reporting controller, filled alongside `ap_assoc`.
    controller_of: RecordMap,
}

impl Reconciler {
    pub fn new(
        controllers: usize,
        store: Arc<SnapshotStore>,
        health: Arc<ControllerHealth>,
        events: broadcast::Sender<RoundEvent>,
    ) -> Self {
        Self {
            controllers,
            store,
            health,
            events,
            device_assoc: RoundBuffer::new(1, controllers),
            ap_assoc: RoundBuffer::new(1, controllers),
            join: RoundBuffer::new(1, controllers),
            controller_of: RecordMap::new(),
        }
    }

    /// Consume extracts until every sender is dropped.
    pub async fn run(mut self, mut results: mpsc::Receiver<Extract>) {
        while let Some(extract) = results.recv().await {
            self.apply(extract);
        }
        debug!("result queue closed, reconciler stopping");
    }

    /// Merge one extract. Returns the completion event if this report
    /// finished its round.
    pub fn apply(&mut self, extract: Extract) -> Option<RoundEvent> {
        self.health.record(&extract);

        let Extract {
            controller,
            kind,
            round,
            entries,
            outcome,
        } = extract;
        let controllers = self.controllers;

        let buffer = match kind {
            RecordKind::DeviceAssoc => &mut self.device_assoc,
            RecordKind::ApAssoc => &mut self.ap_assoc,
            RecordKind::Join => &mut self.join,
            RecordKind::ControllerOf => {
                warn!(%controller, "ignoring extract for derived kind {kind}");
                return None;
            }
        };

        // ── Round bookkeeping ──
        if round < buffer.round {
            debug!(%controller, %kind, round, current = buffer.round, "discarding stale result");
            return None;
        }
        if round > buffer.round {
            if !buffer.reported.is_empty() {
                warn!(
                    %kind,
                    abandoned = buffer.round,
                    missing = buffer.remaining,
                    "round never completed, starting round {round}"
                );
            }
            *buffer = RoundBuffer::new(round, controllers);
            if kind == RecordKind::ApAssoc {
                self.controller_of.clear();
            }
        }
        if !buffer.reported.insert(controller.clone()) {
            debug!(%controller, %kind, round, "duplicate report ignored");
            return None;
        }
        if !outcome.is_ok() {
            buffer.failed += 1;
        }

        // ── Merge ──
        match kind {
            RecordKind::DeviceAssoc => merge_overwrite(&mut buffer.entries, entries, &controller, kind),
            RecordKind::ApAssoc => {
                for (link, name) in &entries {
                    self.controller_of.insert(name.clone(), controller.clone());
                    debug!(%link, %name, %controller, "access point reported");
                }
                merge_overwrite(&mut buffer.entries, entries, &controller, kind);
            }
            RecordKind::Join => merge_join(&mut buffer.entries, &entries, &self.store),
            RecordKind::ControllerOf => {}
        }

        buffer.remaining = buffer.remaining.saturating_sub(1);
        if buffer.remaining > 0 {
            return None;
        }

        // ── Complete: move the buffer out, publish, start the next round ──
        let finished = std::mem::replace(buffer, RoundBuffer::new(round + 1, controllers));
        let event = RoundEvent {
            kind,
            round,
            controllers: finished.reported.len(),
            entries: finished.entries.len(),
            failed: finished.failed,
        };

        if kind == RecordKind::ApAssoc {
            let owners = std::mem::take(&mut self.controller_of);
            self.store.replace(RecordKind::ControllerOf, owners, round);
        }
        self.store.replace(kind, finished.entries, round);

        info!(
            %kind,
            round,
            entries = event.entries,
            failed = event.failed,
            "round complete, snapshot published"
        );
        // No subscribers is fine; the event is advisory.
        let _ = self.events.send(event.clone());
        Some(event)
    }
}

/// Plain key overwrite. Conflicting values from different controllers
/// are logged; the later report wins.
fn merge_overwrite(buffer: &mut RecordMap, entries: RecordMap, controller: &str, kind: RecordKind) {
    for (key, value) in entries {
        if let Some(previous) = buffer.get(&key) {
            if *previous != value {
                warn!(
                    %kind,
                    %key,
                    %previous,
                    %value,
                    %controller,
                    "conflicting values for one link-address, keeping latest"
                );
            }
        }
        buffer.insert(key, value);
    }
}

/// Resolve one controller's ownership table (device → access-point
/// link-address) against the published device and access-point mappings,
/// appending each device IP under its access point's name.
fn merge_join(buffer: &mut RecordMap, ownership: &RecordMap, store: &SnapshotStore) {
    let devices = store.read(RecordKind::DeviceAssoc);
    let access_points = store.read(RecordKind::ApAssoc);

    for (device, ap_link) in ownership {
        if is_zero_hex(ap_link) {
            continue;
        }
        let Some(ip) = devices.entries.get(device) else {
            continue;
        };
        if ip == NULL_IP {
            continue;
        }
        let Some(name) = access_points.entries.get(ap_link) else {
            continue;
        };

        buffer
            .entry(name.clone())
            .and_modify(|ips| {
                ips.push(' ');
                ips.push_str(ip);
            })
            .or_insert_with(|| ip.clone());
    }
}
