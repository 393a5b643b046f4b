//! Building the chain export from aggregation objects.

use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::burst::BurstLimiter;
use crate::domain::model::{
    ExternalLinkRecord, METADATA_PID_PREFIX, PackageIdentifier, Resolution,
};
use crate::domain::service::{OBSOLETED_BY, OBSOLETES, SystemMetadata};
use crate::node::MetadataRepository;

const DCTERMS_OPEN: &str = "<dcterms:identifier>";
const DCTERMS_CLOSE: &str = "</dcterms:identifier>";

/// The package metadata identifier named by an aggregation map.
///
/// Exactly one line may mention the metadata prefix.
pub fn extract_metadata_pid(object: &str) -> Option<&str> {
    let mut lines = object.lines().filter(|line| line.contains(METADATA_PID_PREFIX));
    let line = lines.next()?;
    if lines.next().is_some() {
        return None;
    }
    Some(
        line.trim()
            .trim_start_matches(DCTERMS_OPEN)
            .trim_end_matches(DCTERMS_CLOSE)
            .trim(),
    )
}

/// Fetch links and identifiers for each external id, then resolve the link
/// pointers against the rest of the batch.
#[tracing::instrument(skip_all, fields(count = external_ids.len()))]
pub async fn collect_chains<M: MetadataRepository + ?Sized>(
    repo: &M,
    external_ids: &[String],
    limiter: &BurstLimiter,
) -> Vec<ExternalLinkRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(external_ids.len());
    for id in external_ids {
        if seen.insert(id.as_str()) {
            unique.push(id.clone());
        } else {
            warn!("Ignoring duplicate external id {}", id);
        }
    }

    info!("Collecting chains for {} aggregations", unique.len());
    let mut records = limiter
        .run(unique, |external_id| collect_one(repo, external_id))
        .await;
    resolve_within_batch(&mut records);
    records
}

async fn collect_one<M: MetadataRepository + ?Sized>(
    repo: &M,
    external_id: String,
) -> ExternalLinkRecord {
    let mut record = ExternalLinkRecord::pending(external_id);

    let document = match repo.fetch_metadata(&record.external_id).await {
        Ok(raw) => SystemMetadata::parse(&raw).map_err(|e| {
            warn!("Unreadable metadata for {}: {}", record.external_id, e);
        }),
        Err(e) => {
            warn!("{:#}", e);
            Err(())
        }
    };
    match document {
        Ok(document) => {
            if let Some(obsoletes) = document.value(OBSOLETES) {
                record.obsoletes = Some(obsoletes);
                record.resolved_obsoletes = Some(Resolution::Unresolved);
            }
            if let Some(obsoleted_by) = document.value(OBSOLETED_BY) {
                record.obsoleted_by = Some(obsoleted_by);
                record.resolved_obsoleted_by = Some(Resolution::Unresolved);
            }
        }
        // Links unknown: both columns stay UNRESOLVED with no pointer, so the
        // record can never pass as one that expects no links.
        Err(()) => {
            record.resolved_obsoletes = Some(Resolution::Unresolved);
            record.resolved_obsoleted_by = Some(Resolution::Unresolved);
        }
    }

    match repo.fetch_object(&record.external_id).await {
        Ok(object) => match extract_metadata_pid(&object).map(PackageIdentifier::parse) {
            Some(Ok(pid)) => record.identifier = Resolution::Resolved(pid),
            Some(Err(e)) => warn!("Aggregation {} names a bad identifier: {}", record.external_id, e),
            None => warn!(
                "Aggregation {} does not name exactly one metadata identifier",
                record.external_id
            ),
        },
        Err(e) => warn!("{:#}", e),
    }

    record
}

/// Copy a neighbour's identifier into the pointer when the neighbour is in
/// the batch.
fn resolve_within_batch(records: &mut [ExternalLinkRecord]) {
    let known: HashMap<String, PackageIdentifier> = records
        .iter()
        .filter_map(|r| r.identifier.resolved().map(|pid| (r.external_id.clone(), pid.clone())))
        .collect();

    for record in records.iter_mut() {
        fill_pointer(&known, &record.obsoletes, &mut record.resolved_obsoletes);
        fill_pointer(&known, &record.obsoleted_by, &mut record.resolved_obsoleted_by);
    }
}

fn fill_pointer(
    known: &HashMap<String, PackageIdentifier>,
    pointer: &Option<String>,
    slot: &mut Option<Resolution>,
) {
    if !matches!(slot, Some(Resolution::Unresolved)) {
        return;
    }
    if let Some(pid) = pointer.as_ref().and_then(|external| known.get(external)) {
        *slot = Some(Resolution::Resolved(pid.clone()));
    }
}
