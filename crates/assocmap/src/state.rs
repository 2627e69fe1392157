// ── Application context ──
//
// Everything the query interface reads: the published snapshots, poll
// health, and the current configuration. The configuration is swapped
// whole on reload; readers keep whichever version they loaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use assocmap_config::{Config, ConfigError, load_config};
use assocmap_core::{ControllerHealth, SnapshotStore};

pub struct AppState {
    store: Arc<SnapshotStore>,
    health: Arc<ControllerHealth>,
    config: ArcSwap<Config>,
    config_path: PathBuf,
    /// Serializes reloads so two concurrent requests cannot interleave
    /// a read of the file with a swap.
    reload_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        store: Arc<SnapshotStore>,
        health: Arc<ControllerHealth>,
    ) -> Self {
        Self {
            store,
            health,
            config: ArcSwap::from_pointee(config),
            config_path,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn health(&self) -> &ControllerHealth {
        &self.health
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the configuration file and swap it in.
    ///
    /// On any failure the previous configuration stays in effect. The
    /// controller list and listen address are stored but only used by
    /// the next process start.
    pub async fn reload(&self) -> Result<Arc<Config>, ConfigError> {
        let _guard = self.reload_lock.lock().await;

        let next = match load_config(&self.config_path) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                warn!(path = %self.config_path.display(), error = %e, "reload failed, keeping previous configuration");
                return Err(e);
            }
        };

        let previous = self.config.load();
        if previous.controllers != next.controllers {
            warn!("controller list changed; restart to poll the new set");
        }
        if previous.web.listen != next.web.listen {
            warn!(listen = %next.web.listen, "listen address changed; restart to rebind");
        }

        self.config.store(Arc::clone(&next));
        info!(
            path = %self.config_path.display(),
            rules = next.acl.len(),
            ipset = %next.ipset.name,
            "configuration reloaded"
        );
        Ok(next)
    }
}
