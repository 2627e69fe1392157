//! `collect`: one full polling round, printed and discarded.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;

use assocmap_config::{acl_rules, collector_config, ipset_config};
use assocmap_core::{
    Collector, ControllerHealth, RecordKind, SnapshotStore, ipset_commands, open_sessions,
};

use crate::cli::{CollectArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Association {
    access_point: String,
    controller: Option<String>,
    devices: Vec<String>,
}

#[derive(Tabled)]
struct AssociationRow {
    #[tabled(rename = "Access Point")]
    access_point: String,
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Devices")]
    devices: String,
}

fn to_row(a: &Association) -> AssociationRow {
    AssociationRow {
        access_point: a.access_point.clone(),
        controller: a.controller.clone().unwrap_or_else(|| "-".into()),
        devices: a.devices.join(", "),
    }
}

pub async fn handle(args: CollectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;
    let mut collector_config = collector_config(&config);
    collector_config.poll_interval = Duration::ZERO;

    let sessions = open_sessions(&collector_config.controllers, &collector_config.session).await;
    let collector = Collector::start(
        collector_config,
        sessions,
        Arc::new(SnapshotStore::new()),
        Arc::new(ControllerHealth::new()),
    )?;

    let result = collector.collect_once().await;
    collector.shutdown().await;
    let event = result?;
    tracing::info!(round = event.round, failed = event.failed, "collection round complete");

    let store = collector.store();
    let out = if args.ipset {
        let join = store.read(RecordKind::Join);
        ipset_commands(&join.entries, &acl_rules(&config), &ipset_config(&config))?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        let owners = store.read(RecordKind::ControllerOf);
        let associations: Vec<Association> = store
            .associations()
            .into_iter()
            .map(|(access_point, devices)| Association {
                controller: owners.entries.get(&access_point).cloned(),
                access_point,
                devices,
            })
            .collect();

        output::render_list(
            &global.output,
            &associations,
            to_row,
            |a| format!("{} {}", a.access_point, a.devices.join(" ")),
        )?
    };

    for failing in collector.health().failing() {
        tracing::warn!(controller = %failing, "controller did not answer this round");
    }

    output::print_output(&out, global.quiet);
    Ok(())
}
