use anyhow::Result;
use log::info;
use std::path::Path;

use crate::{
    application::{self, compare_with_catalog, cross_check, select_records},
    export::{read_chains, read_observed, rows_from_chains},
    node::RevisionCatalog,
    runtime::Runtime,
};

use super::{Config, load_resolved, print_findings};

/// Check every chain against its own revisions.
///
/// `input` is an observed-links file, or a chain export when `from_chains`
/// is set. With `versions_url`, each series is also compared with the
/// repository catalogue.
#[tracing::instrument(skip(config))]
pub async fn check_internal<R: Runtime>(
    config: &Config<R>,
    input: &Path,
    from_chains: bool,
    versions_url: Option<&str>,
    report: Option<&Path>,
) -> Result<()> {
    let text = config.read_file(input)?;
    let rows = if from_chains {
        rows_from_chains(&read_chains(&text)?)
    } else {
        read_observed(&text)?
    };

    let mut internal = application::check_internal(&rows);
    if let Some(url) = versions_url {
        info!("Comparing {} series with {}", internal.chains.len(), url);
        let catalog = RevisionCatalog::new(config.http.clone(), url);
        let mismatches = compare_with_catalog(&internal.chains, &catalog, &config.limiter()).await;
        internal.findings.extend(mismatches);
    }

    print_findings(&internal.findings);
    println!(
        "Checked {} series: {} findings, {} rows skipped",
        internal.series_checked(),
        internal.findings.len(),
        internal.skipped_rows
    );

    if let Some(path) = report {
        config.write_file(path, &serde_json::to_vec_pretty(&internal.findings)?)?;
    }
    Ok(())
}

/// Compare a resolved chain export with the metadata on the node.
#[tracing::instrument(skip(config))]
pub async fn check_cross_source<R: Runtime>(
    config: &Config<R>,
    input: &Path,
    report: Option<&Path>,
) -> Result<()> {
    let records = load_resolved(config, input)?;
    let selected = select_records(&records, config.options.deep, config.options.max_records);
    let node = config.member_node();
    let result = cross_check(&node, &selected, &config.limiter()).await;

    print_findings(&result.findings);
    for unavailable in &result.unavailable {
        println!("[Unavailable] {}: {}", unavailable.identifier, unavailable.reason);
    }
    println!(
        "Checked {} records: {} findings, {} unavailable",
        result.checked,
        result.findings.len(),
        result.unavailable.len()
    );

    if let Some(path) = report {
        config.write_file(path, &serde_json::to_vec_pretty(&result)?)?;
    }
    Ok(())
}
