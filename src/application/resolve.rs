use std::collections::HashMap;
use std::fmt;

use log::info;

use crate::domain::model::{ExternalLinkRecord, Resolution};
use crate::resolve::ExternalResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub resolved: usize,
    pub remaining: usize,
}

impl fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resolved {} external ids, {} still unresolved",
            self.resolved, self.remaining
        )
    }
}

/// Look up every unresolved column of `records` through `resolver`.
///
/// Each distinct external id is looked up once.
#[tracing::instrument(skip_all)]
pub async fn resolve_unresolved<R: ExternalResolver + ?Sized>(
    resolver: &R,
    records: &mut [ExternalLinkRecord],
) -> ResolutionSummary {
    let mut pending: Vec<String> = Vec::new();
    for record in records.iter() {
        for reference in lookups(record) {
            if !pending.iter().any(|p| p == reference) {
                pending.push(reference.to_string());
            }
        }
    }
    info!("Resolving {} external ids", pending.len());

    let mut answers: HashMap<String, Resolution> = HashMap::new();
    for external_id in pending {
        let resolution = resolver.resolve(&external_id).await;
        answers.insert(external_id, resolution);
    }

    let answer = |external_id: &str| {
        answers
            .get(external_id)
            .cloned()
            .unwrap_or(Resolution::Unresolved)
    };
    for record in records.iter_mut() {
        if !record.identifier.is_resolved() {
            record.identifier = answer(&record.external_id);
        }
        if matches!(record.resolved_obsoletes, Some(Resolution::Unresolved)) {
            if let Some(external) = &record.obsoletes {
                record.resolved_obsoletes = Some(answer(external));
            }
        }
        if matches!(record.resolved_obsoleted_by, Some(Resolution::Unresolved)) {
            if let Some(external) = &record.obsoleted_by {
                record.resolved_obsoleted_by = Some(answer(external));
            }
        }
    }

    let mut remaining: Vec<&str> = Vec::new();
    for record in records.iter() {
        for reference in record.unresolved_references() {
            if !remaining.contains(&reference) {
                remaining.push(reference);
            }
        }
    }
    ResolutionSummary {
        resolved: answers.values().filter(|r| r.is_resolved()).count(),
        remaining: remaining.len(),
    }
}

/// External ids a resolver can answer for this record. A link column with
/// no pointer comes from unreadable metadata and needs a fresh collect.
fn lookups(record: &ExternalLinkRecord) -> Vec<&str> {
    let mut ids = Vec::new();
    if !record.identifier.is_resolved() {
        ids.push(record.external_id.as_str());
    }
    for (pointer, slot) in [
        (&record.obsoletes, &record.resolved_obsoletes),
        (&record.obsoleted_by, &record.resolved_obsoleted_by),
    ] {
        if let (Some(pointer), Some(Resolution::Unresolved)) = (pointer, slot) {
            ids.push(pointer.as_str());
        }
    }
    ids
}
