//! Clap derive structures for the `assocmap` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use assocmap_config::DEFAULT_CONFIG_FILE;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// assocmap -- which wireless client sits on which access point
#[derive(Debug, Parser)]
#[command(
    name = "assocmap",
    version,
    about = "Poll wireless LAN controllers for client associations",
    long_about = "Polls every configured wireless LAN controller over SNMP, reconciles\n\
        their station and access-point tables into one association map, and\n\
        serves it over HTTP together with generated ipset membership commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (YAML, or TOML when the extension is .toml)
    #[arg(
        long,
        short = 'c',
        env = "ASSOCMAP_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        global = true
    )]
    pub config: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll controllers continuously and serve the query interface
    Serve(ServeArgs),

    /// Run one collection round and print the associations
    Collect(CollectArgs),

    /// Load and validate the configuration file
    #[command(name = "check-config")]
    CheckConfig,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Seconds between polling rounds
    #[arg(
        long,
        default_value_t = 10,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Listen address, overriding web.listen
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Print the generated ipset commands instead of the association table
    #[arg(long)]
    pub ipset: bool,
}
