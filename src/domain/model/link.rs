//! Expected links derived from the aggregation objects.

use serde::Serialize;

use super::identifier::PackageIdentifier;
use crate::error::ChainError;

/// Literal used in exports for a reference still waiting on a lookup.
pub const UNRESOLVED: &str = "UNRESOLVED";

/// Outcome of mapping an external identifier to a package identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PackageIdentifier),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&PackageIdentifier> {
        match self {
            Resolution::Resolved(pid) => Some(pid),
            Resolution::Unresolved => None,
        }
    }

    /// Column text for the chain export.
    pub fn as_column(&self) -> String {
        match self {
            Resolution::Resolved(pid) => pid.to_string(),
            Resolution::Unresolved => UNRESOLVED.to_string(),
        }
    }
}

/// One row of the chain export, before the resolution precondition is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalLinkRecord {
    pub external_id: String,
    pub obsoletes: Option<String>,
    pub obsoleted_by: Option<String>,
    pub identifier: Resolution,
    pub resolved_obsoletes: Option<Resolution>,
    pub resolved_obsoleted_by: Option<Resolution>,
}

impl ExternalLinkRecord {
    /// A freshly created record: nothing known yet.
    pub fn pending(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            obsoletes: None,
            obsoleted_by: None,
            identifier: Resolution::Unresolved,
            resolved_obsoletes: None,
            resolved_obsoleted_by: None,
        }
    }

    /// External ids that still need a lookup.
    pub fn unresolved_references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if !self.identifier.is_resolved() {
            refs.push(self.external_id.as_str());
        }
        if let Some(Resolution::Unresolved) = self.resolved_obsoletes {
            refs.push(self.obsoletes.as_deref().unwrap_or(self.external_id.as_str()));
        }
        if let Some(Resolution::Unresolved) = self.resolved_obsoleted_by {
            refs.push(
                self.obsoleted_by
                    .as_deref()
                    .unwrap_or(self.external_id.as_str()),
            );
        }
        refs
    }

    pub fn has_expected_links(&self) -> bool {
        self.resolved_obsoletes.is_some() || self.resolved_obsoleted_by.is_some()
    }

    /// Convert into a record usable by the checkers and the repair planner.
    pub fn to_resolved(&self) -> Result<ResolvedLinkRecord, ChainError> {
        let unresolved = self.unresolved_references();
        if !unresolved.is_empty() {
            return Err(ChainError::UnresolvedReferences {
                references: unresolved.into_iter().map(String::from).collect(),
            });
        }
        let resolved = |r: &Option<Resolution>| r.as_ref().and_then(|r| r.resolved().cloned());
        Ok(ResolvedLinkRecord {
            external_id: self.external_id.clone(),
            identifier: self.identifier.resolved().cloned().ok_or_else(|| {
                ChainError::UnresolvedReferences {
                    references: vec![self.external_id.clone()],
                }
            })?,
            obsoletes: resolved(&self.resolved_obsoletes),
            obsoleted_by: resolved(&self.resolved_obsoleted_by),
        })
    }
}

/// A record with every reference resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLinkRecord {
    pub external_id: String,
    pub identifier: PackageIdentifier,
    pub obsoletes: Option<PackageIdentifier>,
    pub obsoleted_by: Option<PackageIdentifier>,
}

impl ResolvedLinkRecord {
    pub fn has_expected_links(&self) -> bool {
        self.obsoletes.is_some() || self.obsoleted_by.is_some()
    }
}

/// Enforce the zero-unresolved precondition over a whole batch.
///
/// Either every record converts, or the error lists every reference that
/// still needs a lookup.
pub fn require_resolved(
    records: &[ExternalLinkRecord],
) -> Result<Vec<ResolvedLinkRecord>, ChainError> {
    let mut references = Vec::new();
    for record in records {
        for r in record.unresolved_references() {
            if !references.iter().any(|seen: &String| seen == r) {
                references.push(r.to_string());
            }
        }
    }
    if !references.is_empty() {
        return Err(ChainError::UnresolvedReferences { references });
    }
    records.iter().map(ExternalLinkRecord::to_resolved).collect()
}
