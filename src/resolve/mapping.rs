use std::collections::HashMap;

use async_trait::async_trait;
use log::warn;

use super::ExternalResolver;
use crate::domain::model::{PackageIdentifier, Resolution};

/// Lookups against a precomputed `externalId -> identifier` table.
#[derive(Debug, Default)]
pub struct MappingResolver {
    map: HashMap<String, PackageIdentifier>,
}

impl MappingResolver {
    /// Build from raw pairs. Malformed identifiers are skipped with a warning;
    /// the first mapping of an external id wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = HashMap::new();
        for (external_id, raw) in pairs {
            match PackageIdentifier::parse(&raw) {
                Ok(pid) => {
                    map.entry(external_id).or_insert(pid);
                }
                Err(e) => warn!("Skipping mapping for '{}': {}", external_id, e),
            }
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl ExternalResolver for MappingResolver {
    async fn resolve(&self, external_id: &str) -> Resolution {
        match self.map.get(external_id) {
            Some(pid) => Resolution::Resolved(pid.clone()),
            None => Resolution::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mapping_resolver() {
        let resolver = MappingResolver::from_pairs(vec![
            ("doi:a".to_string(), "edi/1/1".to_string()),
            ("doi:a".to_string(), "edi/1/9".to_string()),
            ("doi:bad".to_string(), "not-an-identifier".to_string()),
        ]);

        assert_eq!(resolver.len(), 1);
        assert_eq!(
            resolver.resolve("doi:a").await,
            Resolution::Resolved("edi/1/1".parse().unwrap())
        );
        assert_eq!(resolver.resolve("doi:bad").await, Resolution::Unresolved);
        assert_eq!(resolver.resolve("doi:missing").await, Resolution::Unresolved);
    }
}
