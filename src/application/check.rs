//! Internal and cross-source check use cases.

use log::{info, warn};

use super::fetch::fetch_snapshot;
use crate::burst::BurstLimiter;
use crate::domain::model::{
    ChainStore, FinalizedChains, Finding, ObservedRow, PackageIdentifier, ResolvedLinkRecord,
};
use crate::domain::service::{CrossSourceReport, check_chains, check_cross_source, compare_revisions};
use crate::node::{MetadataRepository, RevisionCatalog};

/// Outcome of checking observed links against each chain's own versions.
#[derive(Debug)]
pub struct InternalReport {
    pub chains: FinalizedChains,
    pub findings: Vec<Finding>,
    pub skipped_rows: usize,
}

impl InternalReport {
    pub fn series_checked(&self) -> usize {
        self.chains.len()
    }
}

/// Build the chain store from `rows` and check every series.
pub fn check_internal(rows: &[ObservedRow]) -> InternalReport {
    let mut store = ChainStore::new();
    let skipped_rows = store.ingest_all(rows);
    let chains = store.finalize();
    let findings = check_chains(&chains)
        .into_iter()
        .filter_map(|verdict| verdict.finding)
        .collect();
    InternalReport {
        chains,
        findings,
        skipped_rows,
    }
}

/// Compare every series with the repository catalogue.
///
/// Series the catalogue cannot answer for are logged and skipped.
pub async fn compare_with_catalog(
    chains: &FinalizedChains,
    catalog: &RevisionCatalog,
    limiter: &BurstLimiter,
) -> Vec<Finding> {
    let results = limiter
        .run(chains.records().iter().collect(), |record| async move {
            match catalog.revisions(&record.series).await {
                Ok(authoritative) => compare_revisions(record, &authoritative),
                Err(e) => {
                    warn!("Skipping catalogue check of {}: {:#}", record.series, e);
                    None
                }
            }
        })
        .await;
    results.into_iter().flatten().collect()
}

/// Records to check: only those with expected links unless `deep`, capped
/// at `max_records` when non-zero.
pub fn select_records(
    records: &[ResolvedLinkRecord],
    deep: bool,
    max_records: usize,
) -> Vec<ResolvedLinkRecord> {
    let selected = records
        .iter()
        .filter(|record| deep || record.has_expected_links())
        .cloned();
    if max_records > 0 {
        selected.take(max_records).collect()
    } else {
        selected.collect()
    }
}

/// Fetch metadata for the selected records and compare it with their links.
#[tracing::instrument(skip_all)]
pub async fn cross_check<M: MetadataRepository + ?Sized>(
    repo: &M,
    records: &[ResolvedLinkRecord],
    limiter: &BurstLimiter,
) -> CrossSourceReport {
    let identifiers: Vec<PackageIdentifier> =
        records.iter().map(|r| r.identifier.clone()).collect();
    info!("Checking {} records against their metadata", identifiers.len());
    let snapshot = fetch_snapshot(repo, &identifiers, limiter).await;
    check_cross_source(records, &snapshot)
}
