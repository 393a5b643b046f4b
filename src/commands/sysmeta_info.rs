use anyhow::Result;
use std::path::Path;

use crate::{
    application::{observed_links, read_identifier_list},
    export::{FAILED, write_observed},
    node::NodeType,
    runtime::Runtime,
};

use super::{Config, cap};

/// Export the links each identifier's metadata carries today.
#[tracing::instrument(skip(config))]
pub async fn sysmeta_info<R: Runtime>(
    config: &Config<R>,
    input: &Path,
    output: &Path,
    node_type: NodeType,
) -> Result<()> {
    let ids = cap(
        read_identifier_list(&config.read_file(input)?),
        config.options.max_records,
    );
    let node = config.node_of_type(node_type);
    let rows = observed_links(&node, &ids, &config.limiter()).await;
    config.write_file(output, &write_observed(&rows)?)?;

    let failed = rows
        .iter()
        .filter(|row| row.obsoletes.as_deref() == Some(FAILED))
        .count();
    println!(
        "Wrote links of {} identifiers to {:?} ({} failed)",
        rows.len(),
        output,
        failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::config;
    use super::*;
    use crate::domain::service::sysmeta::fixtures::sysmeta;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sysmeta_info_on_coordinating_node() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("pids.txt");
        let output = dir.path().join("observed.csv");
        std::fs::write(&input, "edi/1/2\nedi/9/1\n").unwrap();

        let mut server = mockito::Server::new_async().await;
        let _found = server
            .mock("GET", "/cn/v2/meta/edi%2F1%2F2")
            .with_status(200)
            .with_body(sysmeta("edi/1/2", Some("edi/1/1"), None))
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/cn/v2/meta/edi%2F9%2F1")
            .with_status(404)
            .create_async()
            .await;

        sysmeta_info(&config(&server.url()), &input, &output, NodeType::Cn)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "PID,obsoletes,obsoletedBy\nedi/1/2,edi/1/1,\nedi/9/1,FAILED,FAILED\n"
        );
    }
}
