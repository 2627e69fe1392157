// Scripted walk client used by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use assocmap_snmp::{Error, Oid, Value, Varbind, WalkClient};

use crate::model::RecordKind;

pub(crate) struct FakeAgent {
    target: String,
    tables: HashMap<Oid, Vec<Varbind>>,
    delay: Duration,
    fail: bool,
    pub(crate) walks: AtomicUsize,
    closed: Arc<AtomicBool>,
}

impl FakeAgent {
    pub(crate) fn new(target: &str) -> Self {
        Self {
            target: target.to_owned(),
            tables: HashMap::new(),
            delay: Duration::ZERO,
            fail: false,
            walks: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a row under `kind`'s subtree, indexed by `suffix`.
    pub(crate) fn row(mut self, kind: RecordKind, suffix: &[u32], value: Value) -> Self {
        let Some(source) = kind.source() else {
            return self;
        };
        let root = source.root();
        let mut arcs = root.arcs().to_vec();
        arcs.extend_from_slice(suffix);
        self.tables
            .entry(root)
            .or_default()
            .push(Varbind::new(Oid::new(arcs), value));
        self
    }

    /// Set once `close` has been called; survives the agent being moved.
    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl WalkClient for FakeAgent {
    fn target(&self) -> &str {
        &self.target
    }

    async fn walk(&self, root: &Oid) -> Result<Vec<Varbind>, Error> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(Error::Timeout {
                target: self.target.clone(),
                attempts: 4,
            });
        }
        Ok(self.tables.get(root).cloned().unwrap_or_default())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
