//! Local consistency of each chain against its own revision list.

use crate::domain::model::{ChainRecord, FinalizedChains, Finding, LinkList, ListMismatch};

/// Pass/fail result for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerdict<'a> {
    pub record: &'a ChainRecord,
    pub finding: Option<Finding>,
}

impl ChainVerdict<'_> {
    pub fn is_clean(&self) -> bool {
        self.finding.is_none()
    }
}

/// Compare both link lists of a finalized record with what its versions imply.
pub fn check_chain(record: &ChainRecord) -> Option<Finding> {
    let mut mismatches = Vec::new();
    let lists = [
        (
            LinkList::Obsoletes,
            &record.obsoletes_seen,
            record.expected_obsoletes(),
        ),
        (
            LinkList::ObsoletedBy,
            &record.obsoleted_by_seen,
            record.expected_obsoleted_by(),
        ),
    ];
    for (list, seen, expected) in lists {
        if seen.as_slice() != expected {
            mismatches.push(ListMismatch {
                list,
                seen: seen.clone(),
                expected: expected.to_vec(),
            });
        }
    }

    if mismatches.is_empty() {
        None
    } else {
        Some(Finding::BrokenChain {
            series: record.series.clone(),
            versions: record.versions.clone(),
            mismatches,
        })
    }
}

/// One verdict per series, in store order. Never stops at the first failure.
pub fn check_chains(chains: &FinalizedChains) -> Vec<ChainVerdict<'_>> {
    chains
        .records()
        .iter()
        .map(|record| ChainVerdict {
            record,
            finding: check_chain(record),
        })
        .collect()
}

/// Compare a record's versions with the repository's own revision list.
pub fn compare_revisions(record: &ChainRecord, authoritative: &[u64]) -> Option<Finding> {
    let mut authoritative = authoritative.to_vec();
    authoritative.sort_unstable();
    authoritative.dedup();

    if authoritative == record.versions {
        None
    } else {
        Some(Finding::RevisionListMismatch {
            series: record.series.clone(),
            authoritative,
            observed: record.versions.clone(),
        })
    }
}
