//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use assocmap_config::ConfigError;
use assocmap_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Could not load configuration from {path}")]
    #[diagnostic(
        code(assocmap::config),
        help(
            "Check the file, or point --config (ASSOCMAP_CONFIG) at another one.\n\
             Run: assocmap check-config --config {path}"
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid ACL pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(assocmap::acl_pattern),
        help("ACL names are regular expressions; escape literal metacharacters.")
    )]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(assocmap::validation))]
    Validation { field: String, reason: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(assocmap::bind),
        help("Is another instance running? Change web.listen or pass --listen.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Collection pipeline failed: {0}")]
    #[diagnostic(code(assocmap::collector))]
    Collector(CoreError),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(assocmap::render))]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidPattern { .. } => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Bind { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPattern { pattern, reason } => Self::InvalidPattern { pattern, reason },
            other => Self::Collector(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use assocmap_core::RecordKind;

    #[test]
    fn pattern_errors_keep_their_detail() {
        let err = CliError::from(CoreError::InvalidPattern {
            pattern: "(x".into(),
            reason: "unclosed group".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFIG);
        assert!(err.to_string().contains("(x"));
    }

    #[test]
    fn other_core_errors_are_general() {
        let err = CliError::from(CoreError::NotQueryable {
            kind: RecordKind::ControllerOf,
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
