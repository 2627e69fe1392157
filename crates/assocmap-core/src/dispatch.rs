// ── Collection dispatcher ──
//
// Takes record-kind requests off the intake one at a time and fans each
// out to every controller in parallel. Extracts are forwarded to the
// reconciler as they land; the next request starts only once every
// controller has answered the current one.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use assocmap_snmp::WalkClient;

use crate::error::CoreError;
use crate::extract::extract;
use crate::model::{Extract, RecordKind, RoundEvent};

pub struct Dispatcher<C: WalkClient> {
    clients: Vec<C>,
    results: mpsc::Sender<Extract>,
    /// Last round number issued per queried kind.
    rounds: [u64; 3],
}

impl<C: WalkClient> Dispatcher<C> {
    pub fn new(clients: Vec<C>, results: mpsc::Sender<Extract>) -> Self {
        Self {
            clients,
            results,
            rounds: [0; 3],
        }
    }

    pub fn controllers(&self) -> usize {
        self.clients.len()
    }

    fn next_round(&mut self, kind: RecordKind) -> Result<u64, CoreError> {
        let slot = match kind {
            RecordKind::DeviceAssoc => 0,
            RecordKind::ApAssoc => 1,
            RecordKind::Join => 2,
            RecordKind::ControllerOf => return Err(CoreError::NotQueryable { kind }),
        };
        self.rounds[slot] += 1;
        Ok(self.rounds[slot])
    }

    /// Query every controller for `kind` and forward each extract as it
    /// completes. Returns the round number once all have been forwarded.
    pub async fn collect(&mut self, kind: RecordKind) -> Result<u64, CoreError> {
        let round = self.next_round(kind)?;
        debug!(%kind, round, controllers = self.clients.len(), "dispatching");

        let mut pending: FuturesUnordered<_> = self
            .clients
            .iter()
            .map(|client| extract(client, kind, round))
            .collect();

        while let Some(result) = pending.next().await {
            self.results
                .send(result)
                .await
                .map_err(|_| CoreError::CollectorStopped)?;
        }
        Ok(round)
    }

    async fn dispatch(&mut self, kind: RecordKind) {
        if let Err(e) = self.collect(kind).await {
            warn!(%kind, error = %e, "dispatch failed");
        }
    }

    /// Serve requests until the intake closes, then close every session.
    ///
    /// Completion events are checked before new requests so a finished
    /// `DeviceAssoc` round is followed by its `Join` as early as possible.
    /// Falling behind on events also issues a `Join`, since the missed
    /// events may include a `DeviceAssoc` completion.
    pub async fn run(
        mut self,
        mut intake: mpsc::Receiver<RecordKind>,
        mut completions: broadcast::Receiver<RoundEvent>,
    ) {
        let mut listening = true;

        loop {
            tokio::select! {
                biased;

                event = completions.recv(), if listening => match event {
                    Ok(RoundEvent { kind: RecordKind::DeviceAssoc, round, .. }) => {
                        debug!(round, "device associations complete, requesting ownership");
                        self.dispatch(RecordKind::Join).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // A skipped DeviceAssoc completion would otherwise
                        // leave this round without its Join.
                        warn!(missed, "dispatcher fell behind on round events, requesting ownership");
                        self.dispatch(RecordKind::Join).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => listening = false,
                },

                request = intake.recv() => match request {
                    Some(kind) => self.dispatch(kind).await,
                    None => break,
                },
            }
        }

        futures_util::future::join_all(self.clients.iter().map(|c| c.close())).await;
        info!(controllers = self.clients.len(), "intake closed, controller sessions released");
    }
}
