//! Package identifiers: `(series, revision)` pairs.
//!
//! Accepted encodings:
//! - `https://pasta.lternet.edu/package/metadata/eml/knb-lter-and/2719/3`
//! - `knb-lter-and/2719/3`
//! - `knb-lter-and.2719.3` (the dotted form shown on landing pages)
//!
//! Equality, hashing and ordering only look at the series and the numeric
//! revision. The leading prefix is kept for rendering back into documents.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ChainError;

/// Prefix of package metadata identifiers in the target repository.
pub const METADATA_PID_PREFIX: &str = "https://pasta.lternet.edu/package/metadata/eml/";

#[derive(Debug, Clone)]
pub struct PackageIdentifier {
    prefix: String,
    series: String,
    revision: u64,
}

impl PackageIdentifier {
    pub fn new(series: impl Into<String>, revision: u64) -> Self {
        Self {
            prefix: String::new(),
            series: series.into(),
            revision,
        }
    }

    /// Parse a raw identifier. Same as `raw.parse()`.
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        raw.parse()
    }

    /// `scope/id`, with the numeric id normalized.
    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Same series, different revision.
    pub fn with_revision(&self, revision: u64) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }
}

impl FromStr for PackageIdentifier {
    type Err = ChainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChainError::malformed(raw, "empty identifier"));
        }

        let (prefix, scope, id, revision) = if trimmed.contains('/') {
            let mut parts = trimmed.rsplitn(4, '/');
            let revision = parts.next().unwrap_or_default();
            let id = parts.next();
            let scope = parts.next();
            let prefix = parts.next().map(|p| format!("{}/", p)).unwrap_or_default();
            match (scope, id) {
                (Some(scope), Some(id)) => (prefix, scope, id, revision),
                _ => {
                    return Err(ChainError::malformed(
                        raw,
                        "expected 'scope/id/revision'",
                    ));
                }
            }
        } else {
            let parts: Vec<&str> = trimmed.rsplitn(3, '.').collect();
            if parts.len() != 3 {
                return Err(ChainError::malformed(raw, "expected 'scope.id.revision'"));
            }
            (String::new(), parts[2], parts[1], parts[0])
        };

        if scope.is_empty() {
            return Err(ChainError::malformed(raw, "empty scope"));
        }
        let id: u64 = id
            .parse()
            .map_err(|_| ChainError::malformed(raw, format!("id '{}' is not a number", id)))?;
        let revision: u64 = revision.parse().map_err(|_| {
            ChainError::malformed(
                raw,
                format!("revision '{}' is not a non-negative integer", revision),
            )
        })?;

        Ok(Self {
            prefix,
            series: format!("{}/{}", scope, id),
            revision,
        })
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", self.prefix, self.series, self.revision)
    }
}

impl PartialEq for PackageIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.series == other.series && self.revision == other.revision
    }
}

impl Eq for PackageIdentifier {}

impl Hash for PackageIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.series.hash(state);
        self.revision.hash(state);
    }
}

impl PartialOrd for PackageIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.series
            .cmp(&other.series)
            .then(self.revision.cmp(&other.revision))
    }
}

impl Serialize for PackageIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let pid: PackageIdentifier = "https://pasta.lternet.edu/package/metadata/eml/knb-lter-and/2719/3"
            .parse()
            .unwrap();
        assert_eq!(pid.series(), "knb-lter-and/2719");
        assert_eq!(pid.revision(), 3);
        assert_eq!(pid.prefix(), METADATA_PID_PREFIX);
        assert_eq!(
            pid.to_string(),
            "https://pasta.lternet.edu/package/metadata/eml/knb-lter-and/2719/3"
        );
    }

    #[test]
    fn test_parse_bare_and_dotted() {
        let bare: PackageIdentifier = "knb-lter-and/2719/3".parse().unwrap();
        let dotted: PackageIdentifier = "knb-lter-and.2719.3".parse().unwrap();
        assert_eq!(bare, dotted);
        assert_eq!(bare.prefix(), "");
        assert_eq!(dotted.to_string(), "knb-lter-and/2719/3");
    }

    #[test]
    fn test_leading_zeros_compare_equal() {
        let a: PackageIdentifier = "edi/12/003".parse().unwrap();
        let b: PackageIdentifier = "edi/0012/3".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);

        use std::collections::HashSet;
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_prefix_does_not_affect_equality() {
        let a = PackageIdentifier::parse(&format!("{}edi/1/2", METADATA_PID_PREFIX)).unwrap();
        let b = PackageIdentifier::parse("edi/1/2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_is_numeric_by_revision() {
        let two: PackageIdentifier = "edi/1/2".parse().unwrap();
        let ten: PackageIdentifier = "edi/1/10".parse().unwrap();
        assert!(two < ten);
    }

    #[test]
    fn test_order_by_series_first() {
        let a: PackageIdentifier = "a/1/9".parse().unwrap();
        let b: PackageIdentifier = "b/1/1".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_malformed_inputs() {
        for raw in [
            "",
            "   ",
            "edi/1",
            "edi",
            "edi/1/x",
            "edi/1/-1",
            "edi/x/1",
            "/1/2",
            "edi.1",
            "UNRESOLVED",
            "FAILED",
        ] {
            let result = raw.parse::<PackageIdentifier>();
            assert!(
                matches!(result, Err(ChainError::MalformedIdentifier { .. })),
                "expected {:?} to be malformed",
                raw
            );
        }
    }

    #[test]
    fn test_with_revision_keeps_prefix() {
        let pid = PackageIdentifier::parse(&format!("{}edi/1/2", METADATA_PID_PREFIX)).unwrap();
        let next = pid.with_revision(3);
        assert_eq!(next.to_string(), format!("{}edi/1/3", METADATA_PID_PREFIX));
    }

    #[test]
    fn test_serialize_as_string() {
        let pid: PackageIdentifier = "edi/1/2".parse().unwrap();
        assert_eq!(serde_json::to_string(&pid).unwrap(), "\"edi/1/2\"");
    }
}
