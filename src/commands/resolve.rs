use anyhow::{Result, bail};
use log::info;
use std::path::{Path, PathBuf};

use crate::{
    application::{ResolutionSummary, resolve_unresolved as resolve_records},
    export::{read_chains, read_mapping, write_chains},
    resolve::{ChainedResolver, ExternalResolver, LandingPageResolver, MappingResolver},
    runtime::Runtime,
};

use super::Config;

pub const DEFAULT_RESOLVER_URL: &str = "https://doi.org";

/// Which resolvers to try, in order: the mapping file, then landing pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub mapping: Option<PathBuf>,
    pub resolver_url: String,
    pub landing_page: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            mapping: None,
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            landing_page: true,
        }
    }
}

/// Fill in the `UNRESOLVED` columns of a chain export.
#[tracing::instrument(skip(config))]
pub async fn resolve_unresolved<R: Runtime>(
    config: &Config<R>,
    input: &Path,
    output: &Path,
    options: &ResolveOptions,
) -> Result<ResolutionSummary> {
    let mut resolvers: Vec<Box<dyn ExternalResolver>> = Vec::new();
    if let Some(path) = &options.mapping {
        let mapping = MappingResolver::from_pairs(read_mapping(&config.read_file(path)?)?);
        info!("Loaded {} mappings from {:?}", mapping.len(), path);
        resolvers.push(Box::new(mapping));
    }
    if options.landing_page {
        resolvers.push(Box::new(LandingPageResolver::new(
            config.http.clone(),
            options.resolver_url.as_str(),
        )));
    }
    if resolvers.is_empty() {
        bail!("No resolver left: give --mapping or drop --no-landing-page");
    }

    let mut records = read_chains(&config.read_file(input)?)?;
    let summary = resolve_records(&ChainedResolver::new(resolvers), &mut records).await;
    config.write_file(output, &write_chains(&records)?)?;

    println!("{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::config;
    use super::*;
    use crate::export::read_chains;
    use tempfile::tempdir;

    const UNRESOLVED_CHAINS: &str = "doi,obsoletes,obsoletedBy,metadataPID,metadataObsoletesPID,metadataObsoletedByPID\n\
        doi:10.6073/b,doi:10.6073/a,,edi/1/2,UNRESOLVED,\n";

    #[tokio::test]
    async fn test_mapping_then_landing_page() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("chains.csv");
        let output = dir.path().join("resolved.csv");
        let mapping = dir.path().join("map.csv");
        std::fs::write(&input, UNRESOLVED_CHAINS).unwrap();
        std::fs::write(&mapping, "doi,pid\ndoi:10.6073/z,edi/9/9\n").unwrap();

        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/10.6073/a")
            .with_status(200)
            .with_body("<p>PASTA Identifier:</p><ul><li>https://pasta.lternet.edu/package/eml/edi/1/1</li></ul>")
            .create_async()
            .await;

        let options = ResolveOptions {
            mapping: Some(mapping),
            resolver_url: server.url(),
            landing_page: true,
        };
        let summary = resolve_unresolved(&config("http://127.0.0.1:9"), &input, &output, &options)
            .await
            .unwrap();

        page.assert_async().await;
        assert_eq!(summary, ResolutionSummary { resolved: 1, remaining: 0 });
        let records = read_chains(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(records[0].unresolved_references().is_empty());
    }

    #[tokio::test]
    async fn test_no_resolver_is_an_error() {
        let dir = tempdir().unwrap();
        let options = ResolveOptions {
            landing_page: false,
            ..ResolveOptions::default()
        };
        let result = resolve_unresolved(
            &config("http://127.0.0.1:9"),
            &dir.path().join("in.csv"),
            &dir.path().join("out.csv"),
            &options,
        )
        .await;
        assert!(result.is_err());
    }
}
