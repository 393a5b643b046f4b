//! Write-once results of fetching metadata for a batch of identifiers.

use std::collections::HashMap;

use log::warn;

use super::identifier::PackageIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(String),
    /// Retries exhausted or the request was refused.
    Unavailable(String),
}

/// Fetched documents keyed by the identifier that was requested.
///
/// Each identifier is set exactly once; later writes are ignored.
#[derive(Debug, Default)]
pub struct MetadataSnapshot {
    entries: HashMap<PackageIdentifier, FetchOutcome>,
    order: Vec<PackageIdentifier>,
}

impl MetadataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the identifier already had an outcome.
    pub fn record(&mut self, identifier: PackageIdentifier, outcome: FetchOutcome) -> bool {
        if self.entries.contains_key(&identifier) {
            warn!("Metadata for {} already recorded; ignoring second result", identifier);
            return false;
        }
        self.order.push(identifier.clone());
        self.entries.insert(identifier, outcome);
        true
    }

    pub fn get(&self, identifier: &PackageIdentifier) -> Option<&FetchOutcome> {
        self.entries.get(identifier)
    }

    /// Entries in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&PackageIdentifier, &FetchOutcome)> {
        self.order.iter().filter_map(|id| self.entries.get(id).map(|o| (id, o)))
    }

    pub fn unavailable(&self) -> impl Iterator<Item = (&PackageIdentifier, &str)> {
        self.iter().filter_map(|(id, o)| match o {
            FetchOutcome::Unavailable(reason) => Some((id, reason.as_str())),
            FetchOutcome::Fetched(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
