//! Mapping external persistent identifiers to package identifiers.
//!
//! Resolvers never fail: anything that cannot be looked up comes back as
//! [`Resolution::Unresolved`].

mod landing_page;
mod mapping;

use async_trait::async_trait;
use log::debug;

use crate::domain::model::Resolution;

pub use landing_page::{LandingPageResolver, canonical_identifier, extract_pasta_identifier};
pub use mapping::MappingResolver;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalResolver: Send + Sync {
    async fn resolve(&self, external_id: &str) -> Resolution;
}

/// Tries each resolver in turn; the first `Resolved` answer wins.
pub struct ChainedResolver {
    resolvers: Vec<Box<dyn ExternalResolver>>,
}

impl ChainedResolver {
    pub fn new(resolvers: Vec<Box<dyn ExternalResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl ExternalResolver for ChainedResolver {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, external_id: &str) -> Resolution {
        for resolver in &self.resolvers {
            let resolution = resolver.resolve(external_id).await;
            if resolution.is_resolved() {
                return resolution;
            }
        }
        debug!("No resolver could resolve {}", external_id);
        Resolution::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PackageIdentifier;

    #[tokio::test]
    async fn test_chained_resolver_first_resolved_wins() {
        let mut first = MockExternalResolver::new();
        first
            .expect_resolve()
            .returning(|_| Resolution::Unresolved);

        let mut second = MockExternalResolver::new();
        second.expect_resolve().returning(|_| {
            Resolution::Resolved("edi/1/2".parse::<PackageIdentifier>().unwrap())
        });

        let mut third = MockExternalResolver::new();
        third.expect_resolve().never();

        let chained = ChainedResolver::new(vec![Box::new(first), Box::new(second), Box::new(third)]);
        let resolution = chained.resolve("doi:10.6073/x").await;
        assert_eq!(resolution.resolved().map(|p| p.to_string()).as_deref(), Some("edi/1/2"));
    }

    #[tokio::test]
    async fn test_chained_resolver_all_fail() {
        let mut only = MockExternalResolver::new();
        only.expect_resolve().returning(|_| Resolution::Unresolved);

        let chained = ChainedResolver::new(vec![Box::new(only)]);
        assert_eq!(chained.resolve("doi:x").await, Resolution::Unresolved);
        assert_eq!(
            ChainedResolver::new(Vec::new()).resolve("doi:x").await,
            Resolution::Unresolved
        );
    }
}
