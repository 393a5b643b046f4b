use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client, Identity,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    burst::BurstLimiter,
    http::{HttpClient, RetryPolicy},
    node::{MemberNode, NodeType},
    runtime::Runtime,
};

/// Bearer token for the repository, if any.
pub const TOKEN_VAR: &str = "D1_AUTH_TOKEN";

/// Options shared by every subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOptions {
    pub node: String,
    pub base_url: Option<String>,
    pub cert: Option<PathBuf>,
    pub max_records: usize,
    pub deep: bool,
    pub burst_size: usize,
    pub pause: Duration,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            node: "gmn.lternet.edu".to_string(),
            base_url: None,
            cert: None,
            max_records: 0,
            deep: false,
            burst_size: 25,
            pause: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl NodeOptions {
    /// `--base-url` if given, else `https://<node>`.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.node),
        }
    }
}

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub http: HttpClient,
    pub options: NodeOptions,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, options: NodeOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(token) = runtime.env_var(TOKEN_VAR) {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using {} for authentication", TOKEN_VAR);
        }

        let mut builder = Client::builder()
            .user_agent("chainmend-cli")
            .timeout(options.timeout)
            .default_headers(headers);
        if let Some(cert) = &options.cert {
            let pem = runtime
                .read(cert)
                .with_context(|| format!("Failed to read client certificate {:?}", cert))?;
            let identity = Identity::from_pem(&pem)
                .with_context(|| format!("Invalid client certificate {:?}", cert))?;
            debug!("Using client certificate {:?}", cert);
            builder = builder.identity(identity);
        }
        let client = builder.build()?;

        let http = HttpClient::new(client).with_policy(RetryPolicy {
            delay: options.retry_delay,
            ..RetryPolicy::default()
        });

        Ok(Self {
            runtime,
            http,
            options,
        })
    }

    pub fn member_node(&self) -> MemberNode {
        self.node_of_type(NodeType::Mn)
    }

    pub fn node_of_type(&self, node_type: NodeType) -> MemberNode {
        MemberNode::new(self.http.clone(), self.options.base_url()).with_node_type(node_type)
    }

    pub fn limiter(&self) -> BurstLimiter {
        BurstLimiter::new(self.options.burst_size, self.options.pause)
    }

    pub fn read_file(&self, path: &Path) -> Result<String> {
        self.runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))
    }

    pub fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.runtime
            .write(path, contents)
            .with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Wrote {:?}", path);
        Ok(())
    }
}
