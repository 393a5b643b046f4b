use log::warn;

use crate::burst::BurstLimiter;
use crate::domain::model::ObservedRow;
use crate::domain::service::{OBSOLETED_BY, OBSOLETES, SystemMetadata};
use crate::export::FAILED;
use crate::node::MetadataRepository;

/// One identifier per line; blank lines are skipped.
pub fn read_identifier_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// The links each identifier's metadata currently carries.
///
/// Records that cannot be fetched or parsed get `FAILED` in both link
/// columns, so the internal check skips them as malformed.
#[tracing::instrument(skip_all, fields(count = identifiers.len()))]
pub async fn observed_links<M: MetadataRepository + ?Sized>(
    repo: &M,
    identifiers: &[String],
    limiter: &BurstLimiter,
) -> Vec<ObservedRow> {
    limiter
        .run(identifiers.iter().collect(), |identifier| async move {
            let document = match repo.fetch_metadata(identifier).await {
                Ok(raw) => SystemMetadata::parse(&raw).map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            match document {
                Ok(document) => ObservedRow {
                    identifier: identifier.clone(),
                    obsoletes: document.value(OBSOLETES),
                    obsoleted_by: document.value(OBSOLETED_BY),
                },
                Err(e) => {
                    warn!("No links for {}: {:#}", identifier, e);
                    ObservedRow::new(identifier, Some(FAILED), Some(FAILED))
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::check_internal;
    use crate::domain::service::sysmeta::fixtures::sysmeta;
    use crate::node::MockMetadataRepository;
    use std::time::Duration;

    #[test]
    fn test_read_identifier_list() {
        assert_eq!(
            read_identifier_list("edi/1/1\n\n  edi/1/2  \n"),
            vec!["edi/1/1", "edi/1/2"]
        );
    }

    #[tokio::test]
    async fn test_observed_links_feed_the_internal_check() {
        let mut repo = MockMetadataRepository::new();
        repo.expect_fetch_metadata().returning(|id| match id {
            "edi/1/1" => Ok(sysmeta(id, None, Some("edi/1/2"))),
            "edi/1/2" => Ok(sysmeta(id, Some("edi/1/1"), None)),
            _ => Err(anyhow::anyhow!("not found")),
        });

        let ids = read_identifier_list("edi/1/1\nedi/1/2\nedi/2/1\n");
        let rows = observed_links(&repo, &ids, &BurstLimiter::new(2, Duration::ZERO)).await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ObservedRow::new("edi/1/1", None, Some("edi/1/2")));
        assert_eq!(rows[2], ObservedRow::new("edi/2/1", Some(FAILED), Some(FAILED)));

        let report = check_internal(&rows);
        assert!(report.findings.is_empty());
        assert_eq!(report.skipped_rows, 1);
    }
}
