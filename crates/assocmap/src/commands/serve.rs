//! `serve`: poll continuously and answer queries until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use assocmap_config::collector_config;
use assocmap_core::{Collector, ControllerHealth, SnapshotStore, open_sessions};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;
use crate::server;
use crate::state::AppState;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;

    let addr: SocketAddr = match args.listen {
        Some(ref listen) => listen.parse().map_err(|_| CliError::Validation {
            field: "--listen".into(),
            reason: format!("expected host:port, got '{listen}'"),
        })?,
        None => config.listen_addr().map_err(|source| CliError::Config {
            path: global.config.display().to_string(),
            source,
        })?,
    };

    let mut collector_config = collector_config(&config);
    collector_config.poll_interval = Duration::from_secs(args.interval);

    let store = Arc::new(SnapshotStore::new());
    let health = Arc::new(ControllerHealth::new());
    let sessions = open_sessions(&collector_config.controllers, &collector_config.session).await;
    let collector = Collector::start(
        collector_config,
        sessions,
        Arc::clone(&store),
        Arc::clone(&health),
    )?;

    let state = Arc::new(AppState::new(config, global.config.clone(), store, health));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            collector.shutdown().await;
            return Err(CliError::Bind {
                addr: addr.to_string(),
                source,
            });
        }
    };
    info!(%addr, interval = args.interval, "query interface listening");

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(server::serve(listener, state, shutdown.clone()));

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            signal.map_err(CliError::from)
        }
        exited = &mut server => match exited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CliError::from(e)),
            Err(e) => {
                warn!(error = %e, "query interface task ended abnormally");
                Ok(())
            }
        },
    };

    shutdown.cancel();
    if !server.is_finished() {
        if let Err(e) = server.await {
            warn!(error = %e, "query interface task ended abnormally");
        }
    }
    collector.shutdown().await;
    outcome
}
