use async_trait::async_trait;
use log::warn;

use super::ExternalResolver;
use crate::domain::model::{PackageIdentifier, Resolution};
use crate::error::ChainError;
use crate::http::HttpClient;

const MARKER: &str = "PASTA Identifier:";
const PASTA_DOMAIN: &str = "pasta.lternet.edu";

/// Resolves a DOI by reading the identifier printed on its landing page.
pub struct LandingPageResolver {
    http: HttpClient,
    base_url: String,
}

impl LandingPageResolver {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }
}

/// Text of the first `<li>` after the identifier marker.
pub fn extract_pasta_identifier(html: &str) -> Option<&str> {
    let marker = html.find(MARKER)?;
    let rest = &html[marker..];
    let open = rest.find("<li>")? + "<li>".len();
    let close = rest[open..].find("</li>")?;
    Some(rest[open..open + close].trim())
}

/// Normalize a landing-page identifier into a metadata identifier.
///
/// After the PASTA domain every `.` becomes `/`, and `package/eml` becomes
/// `package/metadata/eml`.
pub fn canonical_identifier(raw: &str) -> Result<PackageIdentifier, ChainError> {
    let raw = raw.trim();
    let pid = match raw.find(PASTA_DOMAIN) {
        Some(i) => {
            let end = i + PASTA_DOMAIN.len();
            format!("{}{}", &raw[..end], raw[end..].replace('.', "/"))
        }
        None => raw.to_string(),
    };
    PackageIdentifier::parse(&pid.replace("package/eml", "package/metadata/eml"))
}

#[async_trait]
impl ExternalResolver for LandingPageResolver {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, external_id: &str) -> Resolution {
        let url = format!(
            "{}/{}",
            self.base_url,
            external_id.trim_start_matches("doi:")
        );
        let html = match self.http.get_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to resolve {}: {:#}", external_id, e);
                return Resolution::Unresolved;
            }
        };

        let Some(raw) = extract_pasta_identifier(&html) else {
            warn!("No identifier on the landing page of {}", external_id);
            return Resolution::Unresolved;
        };
        match canonical_identifier(raw) {
            Ok(pid) => Resolution::Resolved(pid),
            Err(e) => {
                warn!("Landing page of {} has an unusable identifier: {}", external_id, e);
                Resolution::Unresolved
            }
        }
    }
}
