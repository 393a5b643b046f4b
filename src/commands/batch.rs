use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::PathBuf;

use crate::{application::read_identifier_list, runtime::Runtime};

use super::{
    Config, ResolveOptions, check_cross_source, collect, repair, resolve_unresolved,
};

/// One slice of an external id list, run through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchArgs {
    pub ids: PathBuf,
    pub start: usize,
    /// Exclusive; negative means the end of the list.
    pub end: i64,
    pub prefix: String,
    pub resolver_url: String,
    pub dry_run: bool,
}

impl BatchArgs {
    fn output(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.prefix, suffix))
    }
}

fn slice(ids: Vec<String>, start: usize, end: i64) -> Vec<String> {
    let end = if end < 0 {
        ids.len()
    } else {
        (end as usize).min(ids.len())
    };
    let start = start.min(end);
    ids[start..end].to_vec()
}

/// collect, resolve, repair, then check what the node now holds.
///
/// Stops before repairing anything if references stay unresolved.
#[tracing::instrument(skip(config))]
pub async fn batch<R: Runtime>(config: &Config<R>, args: &BatchArgs) -> Result<()> {
    if !args.dry_run && config.options.cert.is_none() {
        warn!("No client certificate given; updates are likely to be rejected");
    }

    let ids = slice(
        read_identifier_list(&config.read_file(&args.ids)?),
        args.start,
        args.end,
    );
    info!("Batch {} covers {} external ids", args.prefix, ids.len());

    let dois = args.output("dois.txt");
    let mut listing = ids.join("\n");
    listing.push('\n');
    config.write_file(&dois, listing.as_bytes())?;

    let chains = args.output("obsolescence_chains.csv");
    collect(config, &dois, &chains).await?;

    let resolved = args.output("obsolescence_chains_resolved.csv");
    let options = ResolveOptions {
        resolver_url: args.resolver_url.clone(),
        ..ResolveOptions::default()
    };
    let summary = resolve_unresolved(config, &chains, &resolved, &options).await?;
    if summary.remaining > 0 {
        bail!(
            "{} external ids are still unresolved; fix {:?} and rerun repair",
            summary.remaining,
            resolved
        );
    }

    let audit = args.output("updates.tsv");
    repair(config, &resolved, Some(&audit), args.dry_run)
        .await
        .context("Repair step failed")?;

    let results = args.output("results.json");
    check_cross_source(config, &resolved, Some(&results)).await
}
