// ── Shared state ──
//
// What the collection pipeline publishes and what readers consume.

mod health;
mod snapshot;

pub use health::{ControllerHealth, PollStatus};
pub use snapshot::{KindSummary, Published, SnapshotStore, associations};
