//! Expected links against the links physically present in fetched metadata.

use std::collections::{BTreeSet, HashSet};

use log::debug;
use serde::Serialize;

use super::repair::LinkAction;
use super::sysmeta::{OBSOLETED_BY, OBSOLETES, SystemMetadata};
use crate::domain::model::{
    FetchOutcome, Finding, MetadataSnapshot, PackageIdentifier, ResolvedLinkRecord, ValueMismatch,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableRecord {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CrossSourceReport {
    /// Coverage finding first, then one entry per diverging record.
    pub findings: Vec<Finding>,
    pub checked: usize,
    pub unavailable: Vec<UnavailableRecord>,
}

impl CrossSourceReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.unavailable.is_empty()
    }
}

/// Compare every record with the snapshot fetched for its identifier.
pub fn check_cross_source(
    records: &[ResolvedLinkRecord],
    snapshot: &MetadataSnapshot,
) -> CrossSourceReport {
    let mut report = CrossSourceReport::default();

    let mut documents = Vec::new();
    for (requested, outcome) in snapshot.iter() {
        match outcome {
            FetchOutcome::Fetched(raw) => match SystemMetadata::parse(raw) {
                Ok(document) => documents.push((requested, document)),
                Err(e) => report.unavailable.push(UnavailableRecord {
                    identifier: requested.to_string(),
                    reason: e.to_string(),
                }),
            },
            FetchOutcome::Unavailable(reason) => report.unavailable.push(UnavailableRecord {
                identifier: requested.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    let requested: HashSet<&PackageIdentifier> = records.iter().map(|r| &r.identifier).collect();
    let fetched: HashSet<PackageIdentifier> = documents
        .iter()
        .map(|(requested, document)| {
            document
                .identifier()
                .and_then(|raw| PackageIdentifier::parse(&raw).ok())
                .unwrap_or_else(|| (*requested).clone())
        })
        .collect();

    let missing: BTreeSet<String> = requested
        .iter()
        .filter(|id| !fetched.contains(**id))
        .map(ToString::to_string)
        .collect();
    let unexpected: BTreeSet<String> = fetched
        .iter()
        .filter(|id| !requested.contains(id))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        report.findings.push(Finding::CoverageGap {
            missing,
            unexpected,
        });
    }

    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(&record.identifier) {
            continue;
        }
        let Some((_, document)) = documents.iter().find(|(id, _)| **id == record.identifier)
        else {
            continue;
        };
        report.checked += 1;
        if let Some(finding) = compare(record, document) {
            debug!("{} diverges from its aggregation", record.identifier);
            report.findings.push(finding);
        }
    }

    report
}

/// Divergence between one record's expected links and a fetched document.
pub fn compare(record: &ResolvedLinkRecord, document: &SystemMetadata) -> Option<Finding> {
    let obsoletes = mismatch(record.obsoletes.as_ref(), document.value(OBSOLETES));
    let obsoleted_by = mismatch(record.obsoleted_by.as_ref(), document.value(OBSOLETED_BY));
    if obsoletes.is_none() && obsoleted_by.is_none() {
        return None;
    }
    Some(Finding::Divergence {
        identifier: record.identifier.to_string(),
        obsoletes,
        obsoleted_by,
    })
}

fn mismatch(expected: Option<&PackageIdentifier>, present: Option<String>) -> Option<ValueMismatch> {
    match LinkAction::decide(expected, present.as_deref()) {
        LinkAction::Ok => None,
        _ => Some(ValueMismatch {
            expected: expected.map(ToString::to_string).unwrap_or_default(),
            observed: present.unwrap_or_default(),
        }),
    }
}
