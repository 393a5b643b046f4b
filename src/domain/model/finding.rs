//! Structured, non-fatal reports of detected inconsistencies.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Which of a chain's link lists disagrees with its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkList {
    Obsoletes,
    ObsoletedBy,
}

impl fmt::Display for LinkList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkList::Obsoletes => write!(f, "obsoletes"),
            LinkList::ObsoletedBy => write!(f, "obsoletedBy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMismatch {
    pub list: LinkList,
    pub seen: Vec<u64>,
    pub expected: Vec<u64>,
}

/// Expected and observed text of one link; empty string means absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueMismatch {
    pub expected: String,
    pub observed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Finding {
    BrokenChain {
        series: String,
        versions: Vec<u64>,
        mismatches: Vec<ListMismatch>,
    },
    Divergence {
        identifier: String,
        obsoletes: Option<ValueMismatch>,
        obsoleted_by: Option<ValueMismatch>,
    },
    CoverageGap {
        /// Requested but not retrieved.
        missing: BTreeSet<String>,
        /// Retrieved but not requested.
        unexpected: BTreeSet<String>,
    },
    RevisionListMismatch {
        series: String,
        authoritative: Vec<u64>,
        observed: Vec<u64>,
    },
}

impl Finding {
    pub fn kind(&self) -> &'static str {
        match self {
            Finding::BrokenChain { .. } => "BrokenChain",
            Finding::Divergence { .. } => "Divergence",
            Finding::CoverageGap { .. } => "CoverageGap",
            Finding::RevisionListMismatch { .. } => "RevisionListMismatch",
        }
    }
}

fn join(revisions: &[u64]) -> String {
    revisions
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_set(ids: &BTreeSet<String>) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::BrokenChain {
                series,
                versions,
                mismatches,
            } => {
                write!(f, "{}  {}", series, join(versions))?;
                for m in mismatches {
                    write!(
                        f,
                        "\n   ERROR: {} = {} != {}",
                        m.list,
                        join(&m.seen),
                        join(&m.expected)
                    )?;
                }
                Ok(())
            }
            Finding::Divergence {
                identifier,
                obsoletes,
                obsoleted_by,
            } => {
                write!(f, "{}", identifier)?;
                for (name, mismatch) in [("obsoletes", obsoletes), ("obsoletedBy", obsoleted_by)] {
                    if let Some(m) = mismatch {
                        write!(f, "\n   Expected {}={}", name, m.expected)?;
                        write!(f, "\n   Found {}   ={}", name, m.observed)?;
                    }
                }
                Ok(())
            }
            Finding::CoverageGap {
                missing,
                unexpected,
            } => {
                write!(f, "Requested but not retrieved: {}", join_set(missing))?;
                write!(f, "\nRetrieved but not requested: {}", join_set(unexpected))
            }
            Finding::RevisionListMismatch {
                series,
                authoritative,
                observed,
            } => write!(
                f,
                "{} - catalogue: {} - found: {}",
                series,
                join(authoritative),
                join(observed)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_chain_display() {
        let finding = Finding::BrokenChain {
            series: "edi/1".into(),
            versions: vec![1, 2, 3],
            mismatches: vec![ListMismatch {
                list: LinkList::ObsoletedBy,
                seen: vec![2],
                expected: vec![2, 3],
            }],
        };
        assert_eq!(
            finding.to_string(),
            "edi/1  1 2 3\n   ERROR: obsoletedBy = 2 != 2 3"
        );
    }

    #[test]
    fn test_divergence_display_only_mismatched_links() {
        let finding = Finding::Divergence {
            identifier: "edi/1/2".into(),
            obsoletes: None,
            obsoleted_by: Some(ValueMismatch {
                expected: "edi/1/3".into(),
                observed: String::new(),
            }),
        };
        let text = finding.to_string();
        assert!(text.contains("Expected obsoletedBy=edi/1/3"));
        assert!(!text.contains("Expected obsoletes="));
    }

    #[test]
    fn test_json_tagging() {
        let finding = Finding::CoverageGap {
            missing: ["a".to_string()].into_iter().collect(),
            unexpected: BTreeSet::new(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "coverageGap");
        assert_eq!(json["missing"][0], "a");
        assert_eq!(finding.kind(), "CoverageGap");
    }

    #[test]
    fn test_json_field_names_are_camel_case() {
        let finding = Finding::Divergence {
            identifier: "edi/1/2".into(),
            obsoletes: None,
            obsoleted_by: Some(ValueMismatch {
                expected: "edi/1/3".into(),
                observed: String::new(),
            }),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "divergence");
        assert_eq!(json["obsoletedBy"]["expected"], "edi/1/3");
        assert!(json.get("obsoleted_by").is_none());
    }
}
