// ── Domain model ──

mod kind;
mod link_address;
mod record;

pub use kind::RecordKind;
pub use link_address::LinkAddress;
pub(crate) use link_address::is_zero_hex;
pub use record::{Extract, NULL_IP, PollOutcome, RecordMap, RoundEvent};
