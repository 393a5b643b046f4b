use log::warn;

use crate::burst::BurstLimiter;
use crate::domain::model::{FetchOutcome, MetadataSnapshot, PackageIdentifier};
use crate::node::MetadataRepository;

/// Fetch system metadata for every identifier, in bursts.
///
/// A fetch that still fails after the client's retries becomes an
/// `Unavailable` entry; the rest of the batch carries on.
#[tracing::instrument(skip_all, fields(count = identifiers.len()))]
pub async fn fetch_snapshot<M: MetadataRepository + ?Sized>(
    repo: &M,
    identifiers: &[PackageIdentifier],
    limiter: &BurstLimiter,
) -> MetadataSnapshot {
    let results = limiter
        .run(identifiers.to_vec(), |identifier| async move {
            let outcome = match repo.fetch_metadata(&identifier.to_string()).await {
                Ok(document) => FetchOutcome::Fetched(document),
                Err(e) => {
                    warn!("Giving up on metadata for {}: {:#}", identifier, e);
                    FetchOutcome::Unavailable(format!("{:#}", e))
                }
            };
            (identifier, outcome)
        })
        .await;

    let mut snapshot = MetadataSnapshot::new();
    for (identifier, outcome) in results {
        snapshot.record(identifier, outcome);
    }
    snapshot
}
