//! Error taxonomy for the chain consistency and repair engine.
//!
//! Consistency findings are not errors; see [`crate::domain::model::Finding`].
//! Transport problems live in [`crate::http::NodeError`] and are
//! downgraded to per-record markers by the application layer.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Input that does not decompose into a `scope/id/revision` identifier.
    #[error("Malformed identifier '{raw}': {reason}")]
    MalformedIdentifier { raw: String, reason: String },

    /// External references still waiting on a lookup. Blocks checking and repair.
    #[error(
        "{} unresolved reference(s) remain ({}). Run resolve-unresolved and use its output.",
        .references.len(),
        .references.join(", ")
    )]
    UnresolvedReferences { references: Vec<String> },

    /// A metadata document that could not be parsed or serialized.
    #[error("Invalid metadata document: {0}")]
    InvalidDocument(String),

    /// No element to insert a link after.
    #[error("No anchor element found for inserting <{tag}>")]
    MissingAnchor { tag: &'static str },
}

impl ChainError {
    pub fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        ChainError::MalformedIdentifier {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = ChainError::malformed("abc", "missing revision");
        assert_eq!(
            err.to_string(),
            "Malformed identifier 'abc': missing revision"
        );
    }

    #[test]
    fn test_unresolved_display_lists_references() {
        let err = ChainError::UnresolvedReferences {
            references: vec!["doi:10.1/a".into(), "doi:10.1/b".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 unresolved reference(s)"));
        assert!(msg.contains("doi:10.1/a, doi:10.1/b"));
        assert!(msg.contains("resolve-unresolved"));
    }
}
