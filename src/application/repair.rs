//! Fetch, plan and publish link repairs, one identifier at a time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::burst::BurstLimiter;
use crate::domain::model::{PackageIdentifier, ResolvedLinkRecord};
use crate::domain::service::plan_for;
use crate::export::AuditRow;
use crate::http::NodeError;
use crate::node::MetadataRepository;

/// One async mutex per identifier.
///
/// A repair holds its identifier's guard from the fetch until the update
/// returns, so a second repair of the same record always reads the first
/// one's result.
#[derive(Debug, Default)]
pub struct IdentifierLocks {
    locks: Mutex<HashMap<PackageIdentifier, Arc<Mutex<()>>>>,
}

impl IdentifierLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, identifier: &PackageIdentifier) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(identifier.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum RepairStatus {
    /// The corrected document was published.
    Repaired,
    /// Dry run: an update would have been published.
    Planned,
    /// Both links already match.
    Unchanged,
    /// The document could not be fetched.
    Unavailable(String),
    /// The repository refused the update.
    Rejected(String),
    /// The document could not be planned, e.g. no anchor element.
    Failed(String),
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStatus::Repaired => write!(f, "repaired"),
            RepairStatus::Planned => write!(f, "planned"),
            RepairStatus::Unchanged => write!(f, "unchanged"),
            RepairStatus::Unavailable(reason) => write!(f, "unavailable: {}", reason),
            RepairStatus::Rejected(reason) => write!(f, "rejected: {}", reason),
            RepairStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub identifier: PackageIdentifier,
    pub status: RepairStatus,
    pub audit: AuditRow,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairSummary {
    pub checked: usize,
    pub repaired: usize,
    pub planned: usize,
    pub unchanged: usize,
    pub unavailable: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl RepairSummary {
    pub fn from_outcomes(outcomes: &[RepairOutcome]) -> Self {
        let mut summary = Self {
            checked: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.status {
                RepairStatus::Repaired => summary.repaired += 1,
                RepairStatus::Planned => summary.planned += 1,
                RepairStatus::Unchanged => summary.unchanged += 1,
                RepairStatus::Unavailable(_) => summary.unavailable += 1,
                RepairStatus::Rejected(_) => summary.rejected += 1,
                RepairStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

impl fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} records: {} repaired, {} planned, {} unchanged, {} unavailable, {} rejected, {} failed",
            self.checked,
            self.repaired,
            self.planned,
            self.unchanged,
            self.unavailable,
            self.rejected,
            self.failed
        )
    }
}

pub struct Repairer<'a, M: MetadataRepository + ?Sized> {
    repo: &'a M,
    locks: IdentifierLocks,
    dry_run: bool,
}

impl<'a, M: MetadataRepository + ?Sized> Repairer<'a, M> {
    pub fn new(repo: &'a M) -> Self {
        Self {
            repo,
            locks: IdentifierLocks::new(),
            dry_run: false,
        }
    }

    /// Plan and audit without publishing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[tracing::instrument(skip_all, fields(identifier = %record.identifier))]
    pub async fn repair_one(&self, record: &ResolvedLinkRecord) -> RepairOutcome {
        let identifier = record.identifier.clone();
        let _guard = self.locks.acquire(&identifier).await;

        let original = match self.repo.fetch_metadata(&identifier.to_string()).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping repair of {}: {:#}", identifier, e);
                return RepairOutcome {
                    audit: AuditRow::unavailable(identifier.to_string()),
                    status: RepairStatus::Unavailable(format!("{:#}", e)),
                    identifier,
                };
            }
        };

        let plan = match plan_for(record, &original) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Cannot plan repair of {}: {}", identifier, e);
                return RepairOutcome {
                    audit: AuditRow::unplanned(identifier.to_string(), &original),
                    status: RepairStatus::Failed(e.to_string()),
                    identifier,
                };
            }
        };
        let audit = AuditRow::planned(&plan, &original);

        if !plan.needs_update() {
            debug!("{} already matches its chain", identifier);
            return RepairOutcome {
                identifier,
                status: RepairStatus::Unchanged,
                audit,
            };
        }
        if self.dry_run {
            info!(
                "Would update {} (obsoletes: {}, obsoletedBy: {})",
                identifier, plan.obsoletes, plan.obsoleted_by
            );
            return RepairOutcome {
                identifier,
                status: RepairStatus::Planned,
                audit,
            };
        }

        let status = match self
            .repo
            .update_metadata(&identifier, &plan.result_document)
            .await
        {
            Ok(()) => RepairStatus::Repaired,
            Err(e) if e.downcast_ref::<NodeError>().is_some() => {
                error!(
                    "Update of {} was rejected: {:#}\n{}",
                    identifier, e, plan.result_document
                );
                RepairStatus::Rejected(format!("{:#}", e))
            }
            // The node never answered; nothing was refused.
            Err(e) => {
                warn!("Update of {} did not reach the node: {:#}", identifier, e);
                RepairStatus::Unavailable(format!("{:#}", e))
            }
        };
        RepairOutcome {
            identifier,
            status,
            audit,
        }
    }

    /// Repair every record in bursts. Outcomes keep the input order.
    pub async fn repair_all(
        &self,
        records: &[ResolvedLinkRecord],
        limiter: &BurstLimiter,
    ) -> Vec<RepairOutcome> {
        info!("Repairing {} records", records.len());
        limiter
            .run(records.iter().collect(), |record| self.repair_one(record))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::LinkAction;
    use crate::domain::service::sysmeta::fixtures::sysmeta;
    use crate::node::MockMetadataRepository;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pid(raw: &str) -> PackageIdentifier {
        raw.parse().unwrap()
    }

    fn record(id: &str, obsoletes: Option<&str>, obsoleted_by: Option<&str>) -> ResolvedLinkRecord {
        ResolvedLinkRecord {
            external_id: format!("doi:{}", id),
            identifier: pid(id),
            obsoletes: obsoletes.map(pid),
            obsoleted_by: obsoleted_by.map(pid),
        }
    }

    fn limiter() -> BurstLimiter {
        BurstLimiter::new(10, Duration::ZERO)
    }

    /// Keeps documents in memory; both calls yield so repairs interleave.
    #[derive(Default)]
    struct InMemoryRepository {
        documents: std::sync::Mutex<HashMap<String, String>>,
        updates: AtomicUsize,
    }

    impl InMemoryRepository {
        fn with(id: &str, document: String) -> Self {
            let repo = Self::default();
            repo.documents
                .lock()
                .unwrap()
                .insert(id.to_string(), document);
            repo
        }
    }

    #[async_trait]
    impl MetadataRepository for InMemoryRepository {
        async fn fetch_metadata(&self, id: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let document = self.documents.lock().unwrap().get(id).cloned();
            document.ok_or_else(|| anyhow::anyhow!("no document for {}", id))
        }

        async fn fetch_object(&self, _id: &str) -> Result<String> {
            unreachable!()
        }

        async fn update_metadata(
            &self,
            identifier: &PackageIdentifier,
            document: &str,
        ) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.documents
                .lock()
                .unwrap()
                .insert(identifier.to_string(), document.to_string());
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_concurrent_repairs_of_one_identifier_are_serialized() {
        let repo = InMemoryRepository::with("edi/1/2", sysmeta("edi/1/2", Some("edi/1/1"), None));
        let repairer = Repairer::new(&repo);
        let target = record("edi/1/2", Some("edi/1/1"), Some("edi/1/3"));

        let outcomes = repairer
            .repair_all(&[target.clone(), target], &limiter())
            .await;

        let statuses: Vec<&RepairStatus> = outcomes.iter().map(|o| &o.status).collect();
        assert_eq!(statuses, vec![&RepairStatus::Repaired, &RepairStatus::Unchanged]);
        assert_eq!(repo.updates.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes[1].audit.obsoleted_by, Some(LinkAction::Ok));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_publish() {
        let mut repo = MockMetadataRepository::new();
        repo.expect_fetch_metadata()
            .returning(|_| Ok(sysmeta("edi/1/2", None, None)));
        repo.expect_update_metadata().never();

        let repairer = Repairer::new(&repo).dry_run(true);
        let outcome = repairer
            .repair_one(&record("edi/1/2", Some("edi/1/1"), None))
            .await;

        assert_eq!(outcome.status, RepairStatus::Planned);
        assert_eq!(outcome.audit.obsoletes, Some(LinkAction::Add));
        assert!(outcome.audit.revised_document.contains("<obsoletes>edi/1/1</obsoletes>"));
    }

    #[tokio::test]
    async fn test_unchanged_record_is_not_published() {
        let mut repo = MockMetadataRepository::new();
        repo.expect_fetch_metadata()
            .returning(|_| Ok(sysmeta("edi/1/2", Some("edi/1/1"), None)));
        repo.expect_update_metadata().never();

        let outcome = Repairer::new(&repo)
            .repair_one(&record("edi/1/2", Some("edi/1/1"), None))
            .await;
        assert_eq!(outcome.status, RepairStatus::Unchanged);
        assert_eq!(outcome.audit.original_document, Some(outcome.audit.revised_document.clone()));
    }

    #[test_log::test(tokio::test)]
    async fn test_failures_stay_per_record() {
        let mut repo = MockMetadataRepository::new();
        repo.expect_fetch_metadata().returning(|id| match id {
            "edi/1/1" => Err(anyhow::anyhow!("GET: failed after 3 attempts")),
            "edi/1/2" => Ok("<d1:systemMetadata xmlns:d1=\"urn:x\"/>".to_string()),
            _ => Ok(sysmeta(id, None, None)),
        });
        repo.expect_update_metadata().returning(|_, _| {
            Err(anyhow::Error::from(NodeError::Unauthorized { status: 403 })
                .context("Failed to update system metadata"))
        });

        let records = vec![
            record("edi/1/1", None, Some("edi/1/2")),
            record("edi/1/2", Some("edi/1/1"), None),
            record("edi/1/3", Some("edi/1/2"), None),
        ];
        let outcomes = Repairer::new(&repo).repair_all(&records, &limiter()).await;

        assert!(matches!(outcomes[0].status, RepairStatus::Unavailable(_)));
        assert_eq!(outcomes[0].audit.original_document, None);
        assert!(matches!(outcomes[1].status, RepairStatus::Failed(_)));
        assert!(matches!(outcomes[2].status, RepairStatus::Rejected(_)));

        let summary = RepairSummary::from_outcomes(&outcomes);
        assert_eq!(
            summary,
            RepairSummary {
                checked: 3,
                unavailable: 1,
                failed: 1,
                rejected: 1,
                ..RepairSummary::default()
            }
        );
    }

    #[test]
    fn test_summary_display() {
        let summary = RepairSummary {
            checked: 4,
            repaired: 2,
            unchanged: 2,
            ..RepairSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "Checked 4 records: 2 repaired, 0 planned, 2 unchanged, 0 unavailable, 0 rejected, 0 failed"
        );
    }

    #[tokio::test]
    async fn test_update_that_never_reached_the_node_is_unavailable() {
        let mut repo = MockMetadataRepository::new();
        repo.expect_fetch_metadata()
            .returning(|id| Ok(sysmeta(id, None, None)));
        repo.expect_update_metadata()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("operation timed out")));

        let outcome = Repairer::new(&repo)
            .repair_one(&record("edi/1/2", Some("edi/1/1"), None))
            .await;
        assert!(matches!(outcome.status, RepairStatus::Unavailable(_)));
        assert!(outcome.audit.original_document.is_some());
    }
}
