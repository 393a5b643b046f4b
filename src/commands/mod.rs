//! One entry point per subcommand.
//!
//! Every command takes a [`Config`], reads its inputs through the runtime,
//! prints a human-readable report and writes its outputs back through the
//! runtime.

use anyhow::{Context, Result};
use std::path::Path;

use crate::{
    domain::model::{Finding, ResolvedLinkRecord, require_resolved},
    export::read_chains,
    runtime::Runtime,
};

mod batch;
mod check;
mod collect;
pub mod config;
mod mapping;
mod repair;
mod resolve;
mod sysmeta_info;

pub use batch::{BatchArgs, batch};
pub use check::{check_cross_source, check_internal};
pub use collect::collect;
pub use config::{Config, NodeOptions};
pub use mapping::make_doi_map;
pub use repair::repair;
pub use resolve::{ResolveOptions, resolve_unresolved};
pub use sysmeta_info::sysmeta_info;

/// Read a chain export and require every reference to be resolved.
fn load_resolved<R: Runtime>(config: &Config<R>, path: &Path) -> Result<Vec<ResolvedLinkRecord>> {
    let records = read_chains(&config.read_file(path)?)
        .with_context(|| format!("Failed to parse chain export {:?}", path))?;
    require_resolved(&records).with_context(|| format!("{:?} is not fully resolved", path))
}

/// Honour `--max-records`.
fn cap<T>(mut items: Vec<T>, max_records: usize) -> Vec<T> {
    if max_records > 0 {
        items.truncate(max_records);
    }
    items
}

fn print_findings(findings: &[Finding]) {
    if findings.is_empty() {
        println!("No findings.");
        return;
    }
    for finding in findings {
        println!("[{}] {}", finding.kind(), finding);
    }
}
