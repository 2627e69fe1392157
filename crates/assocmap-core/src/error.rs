// ── Core error types ──
//
// Errors surfaced by assocmap-core. Per-controller protocol failures are
// absent: they are folded into failed polls by the
// extractor and never propagate past the reconciler.

use thiserror::Error;

use crate::model::RecordKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Rule errors ──────────────────────────────────────────────────
    #[error("Invalid ACL pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // ── Collection errors ────────────────────────────────────────────
    #[error("Record kind '{kind}' is derived and cannot be requested")]
    NotQueryable { kind: RecordKind },

    #[error("Collector is not running")]
    CollectorStopped,

    #[error("No controllers configured")]
    NoControllers,
}
