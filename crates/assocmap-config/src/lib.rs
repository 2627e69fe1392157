//! Configuration for the association poller.
//!
//! A YAML (or TOML, by extension) file layered over built-in defaults and
//! `ASSOCMAP_`-prefixed environment overrides, validated, then translated
//! into the runtime types of `assocmap_core`. Key names follow the
//! long-standing file layout:
//!
//! ```yaml
//! web:
//!   listen: "0.0.0.0:8080"
//! controllers: ["10.1.0.2", "10.1.0.3"]
//! ipset:
//!   name: locafw
//!   timeout: 600
//! acl:
//!   - name: "^lobby"
//!     dstip: ["8.8.8.8"]
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use assocmap_core::{AclRule, CollectorConfig, IpsetConfig};

/// Default file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Prefix for environment overrides; `__` separates nested keys,
/// e.g. `ASSOCMAP_WEB__LISTEN`.
pub const ENV_PREFIX: &str = "ASSOCMAP_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub web: Web,

    /// Controller addresses, `host` or `host:port`.
    #[serde(default)]
    pub controllers: Vec<String>,

    #[serde(default)]
    pub ipset: Ipset,

    /// Ordered name-matching rules.
    #[serde(default)]
    pub acl: Vec<Acl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Web {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for Web {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ipset {
    #[serde(default = "default_ipset_name")]
    pub name: String,

    /// Entry lifetime in seconds.
    #[serde(default = "default_ipset_timeout")]
    pub timeout: u64,
}

impl Default for Ipset {
    fn default() -> Self {
        Self {
            name: default_ipset_name(),
            timeout: default_ipset_timeout(),
        }
    }
}

/// One rule: access points whose name matches `name` (a regular
/// expression) get their devices paired with every `dstip`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Acl {
    pub name: String,
    #[serde(default)]
    pub dstip: Vec<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_ipset_name() -> String {
    IpsetConfig::default().name
}
fn default_ipset_timeout() -> u64 {
    IpsetConfig::default().timeout
}

impl Config {
    /// Check everything that can be checked without touching the network.
    ///
    /// ACL patterns are deliberately left alone: a bad pattern fails
    /// command generation, not the load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controllers.is_empty() {
            return Err(ConfigError::Validation {
                field: "controllers".into(),
                reason: "at least one controller is required".into(),
            });
        }
        if let Some(blank) = self.controllers.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation {
                field: "controllers".into(),
                reason: format!("empty controller address '{blank}'"),
            });
        }

        self.listen_addr()?;

        if self.ipset.name.is_empty() || self.ipset.name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation {
                field: "ipset.name".into(),
                reason: format!(
                    "must be non-empty and contain no whitespace, got '{}'",
                    self.ipset.name
                ),
            });
        }
        Ok(())
    }

    /// The query interface's bind address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.web
            .listen
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "web.listen".into(),
                reason: format!("expected host:port, got '{}'", self.web.listen),
            })
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Layered sources: defaults, then the file, then the environment.
pub fn figment(path: &Path) -> Figment {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let figment = Figment::new().merge(Serialized::defaults(Config::default()));
    let figment = if is_toml {
        figment.merge(Toml::file(path))
    } else {
        figment.merge(Yaml::file(path))
    };

    // ASSOCMAP_CONFIG names the file itself and is not a key.
    figment.merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]))
}

/// Load and validate the configuration at `path`.
///
/// A missing file is an error rather than an empty configuration.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.try_exists()? {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Translation to core types ───────────────────────────────────────

/// Collector settings for `config`; protocol options stay at their
/// fixed defaults.
pub fn collector_config(config: &Config) -> CollectorConfig {
    CollectorConfig {
        controllers: config.controllers.clone(),
        ..CollectorConfig::default()
    }
}

pub fn ipset_config(config: &Config) -> IpsetConfig {
    IpsetConfig {
        name: config.ipset.name.clone(),
        timeout: config.ipset.timeout,
    }
}

pub fn acl_rules(config: &Config) -> Vec<AclRule> {
    config
        .acl
        .iter()
        .map(|acl| AclRule::new(acl.name.clone(), acl.dstip.clone()))
        .collect()
}
