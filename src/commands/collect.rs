use anyhow::Result;
use std::path::Path;

use crate::{
    application::{collect_chains, read_identifier_list},
    export::write_chains,
    runtime::Runtime,
};

use super::{Config, cap};

/// Build a chain export from a list of external ids.
#[tracing::instrument(skip(config))]
pub async fn collect<R: Runtime>(config: &Config<R>, input: &Path, output: &Path) -> Result<()> {
    let ids = cap(
        read_identifier_list(&config.read_file(input)?),
        config.options.max_records,
    );
    let node = config.member_node();
    let records = collect_chains(&node, &ids, &config.limiter()).await;
    config.write_file(output, &write_chains(&records)?)?;

    let unresolved = records
        .iter()
        .filter(|r| !r.unresolved_references().is_empty())
        .count();
    println!(
        "Collected {} records into {:?} ({} with unresolved references)",
        records.len(),
        output,
        unresolved
    );
    Ok(())
}
