//! Per-series accumulation of observed revisions and links.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use super::identifier::PackageIdentifier;
use crate::error::ChainError;

/// One input row: an identifier and the raw links found in its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedRow {
    pub identifier: String,
    pub obsoletes: Option<String>,
    pub obsoleted_by: Option<String>,
}

impl ObservedRow {
    pub fn new(identifier: &str, obsoletes: Option<&str>, obsoleted_by: Option<&str>) -> Self {
        Self {
            identifier: identifier.to_string(),
            obsoletes: obsoletes.map(String::from),
            obsoleted_by: obsoleted_by.map(String::from),
        }
    }
}

/// Observed revisions and links of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub series: String,
    pub versions: Vec<u64>,
    pub obsoletes_seen: Vec<u64>,
    pub obsoleted_by_seen: Vec<u64>,
}

impl ChainRecord {
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            versions: Vec::new(),
            obsoletes_seen: Vec::new(),
            obsoleted_by_seen: Vec::new(),
        }
    }

    /// Sort all three lists; `versions` is an ordered set, so duplicates go.
    pub fn finalize(&mut self) {
        self.versions.sort_unstable();
        self.versions.dedup();
        self.obsoletes_seen.sort_unstable();
        self.obsoleted_by_seen.sort_unstable();
    }

    /// Every revision but the last is expected to be obsoleted by its successor.
    pub fn expected_obsoletes(&self) -> &[u64] {
        match self.versions.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn expected_obsoleted_by(&self) -> &[u64] {
        match self.versions.split_first() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

/// Series-keyed store, iterated in first-seen order.
///
/// Built by streaming rows through [`ChainStore::ingest`], then closed with
/// [`ChainStore::finalize`], which hands back the read-only snapshot the
/// checker works on.
#[derive(Debug, Default)]
pub struct ChainStore {
    records: Vec<ChainRecord>,
    index: HashMap<String, usize>,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one row. A malformed identifier or link rejects the whole row.
    pub fn ingest(&mut self, row: &ObservedRow) -> Result<(), ChainError> {
        let identifier = PackageIdentifier::parse(&row.identifier)?;
        let obsoletes = parse_optional(row.obsoletes.as_deref())?;
        let obsoleted_by = parse_optional(row.obsoleted_by.as_deref())?;

        let record = self.record_mut(identifier.series());
        record.versions.push(identifier.revision());
        if let Some(obsoletes) = obsoletes {
            record.obsoletes_seen.push(obsoletes.revision());
        }
        if let Some(obsoleted_by) = obsoleted_by {
            record.obsoleted_by_seen.push(obsoleted_by.revision());
        }
        Ok(())
    }

    /// Ingest every row, skipping malformed ones with a warning.
    /// Returns the number of rows skipped.
    pub fn ingest_all<'a, I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = &'a ObservedRow>,
    {
        let mut skipped = 0;
        for row in rows {
            if let Err(e) = self.ingest(row) {
                warn!("Skipping row for '{}': {}", row.identifier, e);
                skipped += 1;
            }
        }
        skipped
    }

    /// Sort every record and close the store.
    pub fn finalize(mut self) -> FinalizedChains {
        for record in &mut self.records {
            record.finalize();
        }
        FinalizedChains {
            records: self.records,
            index: self.index,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_mut(&mut self, series: &str) -> &mut ChainRecord {
        let i = match self.index.get(series) {
            Some(&i) => i,
            None => {
                self.records.push(ChainRecord::new(series));
                let i = self.records.len() - 1;
                self.index.insert(series.to_string(), i);
                i
            }
        };
        &mut self.records[i]
    }
}

/// Sorted, read-only chains.
#[derive(Debug, Default)]
pub struct FinalizedChains {
    records: Vec<ChainRecord>,
    index: HashMap<String, usize>,
}

impl FinalizedChains {
    pub fn get(&self, series: &str) -> Option<&ChainRecord> {
        self.index.get(series).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[ChainRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_optional(raw: Option<&str>) -> Result<Option<PackageIdentifier>, ChainError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => PackageIdentifier::parse(raw).map(Some),
    }
}
