// ── Firewall-set membership commands ──
//
// Pairs every device on a matching access point with each destination
// of the matching rule. Rules are applied in order and a device matched
// by several rules yields one command per rule.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::config::{AclRule, IpsetConfig};
use crate::error::CoreError;
use crate::model::RecordMap;

/// One `ipset` membership command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpsetCommand {
    pub set: String,
    pub device: String,
    pub destination: String,
    pub timeout: u64,
}

impl fmt::Display for IpsetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "add {} {},{} {}",
            self.set, self.device, self.destination, self.timeout
        )
    }
}

/// Compile a rule's pattern. Failure names the offending pattern.
pub fn compile_pattern(rule: &AclRule) -> Result<Regex, CoreError> {
    Regex::new(&rule.pattern).map_err(|e| CoreError::InvalidPattern {
        pattern: rule.pattern.clone(),
        reason: e.to_string(),
    })
}

/// Generate commands from a `Join` mapping (access-point name →
/// space-separated device IPs).
///
/// An invalid pattern aborts generation for the whole rule set.
pub fn ipset_commands(
    join: &RecordMap,
    rules: &[AclRule],
    ipset: &IpsetConfig,
) -> Result<Vec<IpsetCommand>, CoreError> {
    let mut commands = Vec::new();

    for rule in rules {
        let pattern = compile_pattern(rule)?;
        for (name, devices) in join {
            if !pattern.is_match(name) {
                continue;
            }
            for device in devices.split_whitespace() {
                for destination in &rule.destinations {
                    commands.push(IpsetCommand {
                        set: ipset.name.clone(),
                        device: device.to_owned(),
                        destination: destination.clone(),
                        timeout: ipset.timeout,
                    });
                }
            }
        }
    }
    Ok(commands)
}
