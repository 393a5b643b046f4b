use anyhow::Result;
use std::path::Path;

use crate::{
    application::{RepairStatus, RepairSummary, Repairer, select_records},
    export::write_audit,
    runtime::Runtime,
};

use super::{Config, load_resolved};

/// Bring the links of every selected record in line with a resolved chain
/// export.
#[tracing::instrument(skip(config))]
pub async fn repair<R: Runtime>(
    config: &Config<R>,
    input: &Path,
    audit: Option<&Path>,
    dry_run: bool,
) -> Result<RepairSummary> {
    let records = load_resolved(config, input)?;
    let selected = select_records(&records, config.options.deep, config.options.max_records);

    let node = config.member_node();
    let repairer = Repairer::new(&node).dry_run(dry_run);
    let outcomes = repairer.repair_all(&selected, &config.limiter()).await;

    for outcome in &outcomes {
        if outcome.status != RepairStatus::Unchanged {
            println!("{}: {}", outcome.identifier, outcome.status);
        }
    }
    if let Some(path) = audit {
        let rows: Vec<_> = outcomes.iter().map(|o| o.audit.clone()).collect();
        config.write_file(path, &write_audit(&rows)?)?;
    }

    let summary = RepairSummary::from_outcomes(&outcomes);
    println!("{}", summary);
    Ok(summary)
}
