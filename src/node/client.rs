use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};

use crate::domain::model::PackageIdentifier;
use crate::http::HttpClient;

/// Which DataONE API a node serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum NodeType {
    /// Member node
    #[default]
    Mn,
    /// Coordinating node
    Cn,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Mn => "mn",
            NodeType::Cn => "cn",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// System metadata XML for any object id (package identifier or DOI).
    async fn fetch_metadata(&self, id: &str) -> Result<String>;

    /// The object bytes as text, e.g. an aggregation map.
    async fn fetch_object(&self, id: &str) -> Result<String>;

    /// Replace system metadata in place. No new revision is created.
    async fn update_metadata(&self, identifier: &PackageIdentifier, document: &str) -> Result<()>;
}

pub struct MemberNode {
    http: HttpClient,
    base_url: String,
    node_type: NodeType,
}

impl MemberNode {
    #[tracing::instrument(skip(http, base_url))]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            node_type: NodeType::Mn,
        }
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str, id: &str) -> String {
        format!(
            "{}/{}/v2/{}/{}",
            self.base_url,
            self.node_type,
            resource,
            urlencoding::encode(id)
        )
    }
}

/// File name the node logs for an uploaded document: `scope.id.revision.sysmeta.xml`.
pub fn sysmeta_file_name(identifier: &PackageIdentifier) -> String {
    format!(
        "{}.{}.sysmeta.xml",
        identifier.series().replace('/', "."),
        identifier.revision()
    )
}

#[async_trait]
impl MetadataRepository for MemberNode {
    #[tracing::instrument(skip(self))]
    async fn fetch_metadata(&self, id: &str) -> Result<String> {
        let url = self.url("meta", id);
        debug!("Fetching system metadata for {}...", id);
        self.http
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch system metadata for {}", id))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_object(&self, id: &str) -> Result<String> {
        let url = self.url("object", id);
        debug!("Fetching object {}...", id);
        self.http
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch object {}", id))
    }

    #[tracing::instrument(skip(self, document))]
    async fn update_metadata(&self, identifier: &PackageIdentifier, document: &str) -> Result<()> {
        // Updates always go to the member node API.
        let url = format!("{}/mn/v2/meta", self.base_url);
        let pid = identifier.to_string();
        let file_name = sysmeta_file_name(identifier);

        self.http
            .put_multipart(&url, || {
                let sysmeta = Part::bytes(document.as_bytes().to_vec())
                    .file_name(file_name.clone())
                    .mime_str("application/xml")?;
                Ok(Form::new().text("pid", pid.clone()).part("sysmeta", sysmeta))
            })
            .await
            .with_context(|| format!("Failed to update system metadata for {}", pid))?;

        info!("Updated system metadata for {}", pid);
        Ok(())
    }
}
