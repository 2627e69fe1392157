//! `check-config`: load, validate and compile every ACL pattern.

use serde::Serialize;

use assocmap_config::acl_rules;
use assocmap_core::compile_pattern;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ConfigSummary {
    path: String,
    listen: String,
    controllers: Vec<String>,
    ipset: String,
    timeout: u64,
    acl_rules: usize,
}

fn detail(s: &ConfigSummary) -> String {
    [
        format!("Config:       {}", s.path),
        format!("Listen:       {}", s.listen),
        format!("Controllers:  {}", s.controllers.join(", ")),
        format!("Ipset:        {} (timeout {}s)", s.ipset, s.timeout),
        format!("ACL rules:    {}", s.acl_rules),
    ]
    .join("\n")
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;

    // Loading tolerates bad patterns; checking does not.
    let rules = acl_rules(&config);
    for rule in &rules {
        compile_pattern(rule)?;
    }

    let summary = ConfigSummary {
        path: global.config.display().to_string(),
        listen: config.web.listen.clone(),
        controllers: config.controllers.clone(),
        ipset: config.ipset.name.clone(),
        timeout: config.ipset.timeout,
        acl_rules: rules.len(),
    };

    let out = output::render_single(&global.output, &summary, detail, |s| s.path.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
