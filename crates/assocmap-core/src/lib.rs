//! Association collection pipeline for wireless LAN controllers.
//!
//! Polls every configured controller for its station and access-point
//! tables, reconciles the per-controller answers round by round, and
//! publishes complete mappings that readers can query without locking:
//!
//! - **[`Collector`]**: facade owning the background tasks.
//!   [`start()`](Collector::start) spawns the periodic driver, the
//!   [`Dispatcher`] and the [`Reconciler`];
//!   [`collect_once()`](Collector::collect_once) runs a single full round.
//!
//! - **[`Dispatcher`]**: fans each [`RecordKind`] request out to every
//!   controller in parallel and issues the ownership (`Join`) request once
//!   device associations complete.
//!
//! - **[`Reconciler`]**: per-kind round buffers with a controller
//!   countdown; publishes finished buffers into the [`SnapshotStore`] and
//!   broadcasts a [`RoundEvent`].
//!
//! - **[`SnapshotStore`]**: one `ArcSwap` per kind. Readers always see a
//!   complete mapping, never one that is still accumulating.
//!
//! - **[`ipset_commands`]**: turns the published `Join` mapping and the
//!   configured [`AclRule`]s into firewall-set membership commands.
//!
//! This crate never touches disk; `assocmap-config` supplies the runtime
//! configuration types defined in [`config`].

pub mod acl;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod reconcile;
pub mod store;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use acl::{IpsetCommand, compile_pattern, ipset_commands};
pub use collector::{Collector, open_sessions};
pub use config::{AclRule, CollectorConfig, DEFAULT_POLL_INTERVAL, IpsetConfig};
pub use dispatch::Dispatcher;
pub use error::CoreError;
pub use extract::{RecordSource, extract};
pub use reconcile::Reconciler;
pub use store::{ControllerHealth, KindSummary, PollStatus, Published, SnapshotStore, associations};

pub use model::{Extract, LinkAddress, NULL_IP, PollOutcome, RecordKind, RecordMap, RoundEvent};

pub use assocmap_snmp::{Session, SessionOptions, WalkClient};
