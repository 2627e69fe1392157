// ── Collector ──
//
// Owns the background pipeline: a periodic driver feeding the intake,
// the dispatcher fanning requests out to controllers, and the reconciler
// publishing completed rounds into the snapshot store.
//
//   driver ──kind──▶ dispatcher ──extract──▶ reconciler ──▶ SnapshotStore
//                        ▲                       │
//                        └──── RoundEvent ───────┘

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use assocmap_snmp::{Session, SessionOptions, WalkClient};

use crate::config::CollectorConfig;
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::model::{RecordKind, RoundEvent};
use crate::reconcile::Reconciler;
use crate::store::{ControllerHealth, SnapshotStore};

const INTAKE_CHANNEL_SIZE: usize = 16;
const RESULT_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 64;

/// Handle to a running collection pipeline.
///
/// Cheaply cloneable via `Arc<CollectorInner>`.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    config: CollectorConfig,
    store: Arc<SnapshotStore>,
    health: Arc<ControllerHealth>,
    events: broadcast::Sender<RoundEvent>,
    /// `None` once shut down; dropping the last sender closes the intake.
    intake: Mutex<Option<mpsc::Sender<RecordKind>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Collector {
    /// Spawn the reconciler, the dispatcher and (unless the poll interval
    /// is zero) the periodic driver.
    ///
    /// `clients` must hold one client per configured controller, in any
    /// order; round completion counts them.
    pub fn start<C: WalkClient>(
        config: CollectorConfig,
        clients: Vec<C>,
        store: Arc<SnapshotStore>,
        health: Arc<ControllerHealth>,
    ) -> Result<Self, CoreError> {
        if clients.is_empty() {
            return Err(CoreError::NoControllers);
        }

        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_CHANNEL_SIZE);
        let (results_tx, results_rx) = mpsc::channel(RESULT_CHANNEL_SIZE);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let completions = events.subscribe();
        let cancel = CancellationToken::new();

        let reconciler = Reconciler::new(
            clients.len(),
            Arc::clone(&store),
            Arc::clone(&health),
            events.clone(),
        );
        let dispatcher = Dispatcher::new(clients, results_tx);
        info!(controllers = dispatcher.controllers(), "starting collector");

        let mut handles = vec![
            tokio::spawn(reconciler.run(results_rx)),
            tokio::spawn(dispatcher.run(intake_rx, completions)),
        ];

        if config.poll_interval.is_zero() {
            debug!("poll interval is zero, periodic driver disabled");
        } else {
            handles.push(tokio::spawn(driver_task(
                intake_tx.clone(),
                config.poll_interval,
                cancel.child_token(),
            )));
        }

        Ok(Self {
            inner: Arc::new(CollectorInner {
                config,
                store,
                health,
                events,
                intake: Mutex::new(Some(intake_tx)),
                cancel,
                task_handles: Mutex::new(handles),
            }),
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn health(&self) -> &Arc<ControllerHealth> {
        &self.inner.health
    }

    /// Subscribe to round-completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.inner.events.subscribe()
    }

    /// Queue a request for `kind`. Derived kinds are rejected.
    pub async fn request(&self, kind: RecordKind) -> Result<(), CoreError> {
        if kind.is_derived() {
            return Err(CoreError::NotQueryable { kind });
        }
        let intake = self
            .inner
            .intake
            .lock()
            .await
            .clone()
            .ok_or(CoreError::CollectorStopped)?;
        intake
            .send(kind)
            .await
            .map_err(|_| CoreError::CollectorStopped)
    }

    /// Run one full round (access points, devices, then ownership) and
    /// wait for the `Join` mapping to publish.
    pub async fn collect_once(&self) -> Result<RoundEvent, CoreError> {
        let mut events = self.subscribe();
        for kind in RecordKind::SCHEDULED {
            self.request(kind).await?;
        }

        loop {
            match events.recv().await {
                Ok(event) if event.kind == RecordKind::Join => return Ok(event),
                Ok(event) => debug!(kind = %event.kind, round = event.round, "round complete"),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "collect_once fell behind on round events");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(CoreError::CollectorStopped),
            }
        }
    }

    /// Stop the driver, close the intake and wait for in-flight walks to
    /// drain. Controller sessions are closed by the dispatcher on its way
    /// out. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.intake.lock().await.take();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "collector task ended abnormally");
            }
        }
        info!("collector stopped");
    }
}

// ── Sessions ─────────────────────────────────────────────────────────

/// Open one session per controller address.
///
/// A controller that cannot be resolved now still gets a lazily opened
/// session, so it keeps counting toward every round and is retried on
/// each poll.
pub async fn open_sessions(targets: &[String], options: &SessionOptions) -> Vec<Session> {
    join_all(targets.iter().map(|target| async move {
        match Session::connect(target.clone(), options.clone()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%target, error = %e, "controller unavailable, will retry on each poll");
                Session::new(target.clone(), options.clone())
            }
        }
    }))
    .await
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed the scheduled kinds into the intake every `period`, starting
/// immediately.
async fn driver_task(
    intake: mpsc::Sender<RecordKind>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                for kind in RecordKind::SCHEDULED {
                    if intake.send(kind).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::Ordering;

    use assocmap_snmp::Value;
    use pretty_assertions::assert_eq;

    use crate::testing::FakeAgent;

    const DEVICE: [u32; 6] = [0, 27, 34, 68, 1, 2];
    const AP: [u8; 6] = [0xaa, 0xbb, 0xcc, 0, 0x11, 0x22];

    fn lobby_agent(target: &str) -> FakeAgent {
        FakeAgent::new(target)
            .row(RecordKind::ApAssoc, &AP.map(u32::from), Value::OctetString(b"lobby".to_vec()))
            .row(RecordKind::DeviceAssoc, &DEVICE, Value::IpAddress(Ipv4Addr::new(10, 0, 0, 5)))
            .row(RecordKind::Join, &DEVICE, Value::OctetString(AP.to_vec()))
    }

    fn manual() -> CollectorConfig {
        CollectorConfig {
            poll_interval: Duration::ZERO,
            ..CollectorConfig::default()
        }
    }

    fn start(config: CollectorConfig, agents: Vec<FakeAgent>) -> Collector {
        Collector::start(
            config,
            agents,
            Arc::new(SnapshotStore::new()),
            Arc::new(ControllerHealth::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn refuses_to_start_without_controllers() {
        let result = Collector::start(
            manual(),
            Vec::<FakeAgent>::new(),
            Arc::new(SnapshotStore::new()),
            Arc::new(ControllerHealth::new()),
        );
        assert!(matches!(result, Err(CoreError::NoControllers)));
    }

    #[tokio::test]
    async fn collect_once_publishes_every_kind() {
        let collector = start(manual(), vec![lobby_agent("wlc1"), FakeAgent::new("wlc2").failing()]);

        let event = collector.collect_once().await.unwrap();
        assert_eq!(event.kind, RecordKind::Join);
        assert_eq!(event.controllers, 2);
        assert_eq!(event.failed, 1);

        let store = collector.store();
        assert_eq!(store.read(RecordKind::Join).entries["lobby"], "10.0.0.5");
        assert_eq!(store.read(RecordKind::ControllerOf).entries["lobby"], "wlc1");
        assert_eq!(store.associations()["lobby"], vec!["10.0.0.5"]);
        assert_eq!(collector.health().failing(), vec!["wlc2".to_owned()]);

        collector.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_sessions_and_stops_intake() {
        let agent = lobby_agent("wlc1");
        let closed = agent.closed_flag();
        let collector = start(manual(), vec![agent]);

        collector.shutdown().await;
        assert!(closed.load(Ordering::SeqCst));

        let err = collector.request(RecordKind::DeviceAssoc).await.unwrap_err();
        assert!(matches!(err, CoreError::CollectorStopped));
        // second shutdown is a no-op
        collector.shutdown().await;
    }

    #[tokio::test]
    async fn derived_requests_are_rejected() {
        let collector = start(manual(), vec![FakeAgent::new("wlc1")]);
        let err = collector.request(RecordKind::ControllerOf).await.unwrap_err();
        assert!(matches!(err, CoreError::NotQueryable { .. }));
        collector.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn driver_polls_on_its_interval() {
        let config = CollectorConfig {
            poll_interval: Duration::from_secs(10),
            ..CollectorConfig::default()
        };
        let collector = start(config, vec![lobby_agent("wlc1")]);
        let mut events = collector.subscribe();

        let mut joins = Vec::new();
        while joins.len() < 2 {
            let event = events.recv().await.unwrap();
            if event.kind == RecordKind::Join {
                joins.push(event.round);
            }
        }
        assert_eq!(joins, vec![1, 2]);
        assert!(collector.store().read(RecordKind::ApAssoc).round >= 2);

        collector.shutdown().await;
    }
}
