use anyhow::{Context, Result};

use crate::http::HttpClient;

/// The repository's own list of revisions per series.
///
/// `GET {base_url}/{scope}/{id}` answers with revision numbers separated by
/// newlines.
pub struct RevisionCatalog {
    http: HttpClient,
    base_url: String,
}

impl RevisionCatalog {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    #[tracing::instrument(skip(self))]
    pub async fn revisions(&self, series: &str) -> Result<Vec<u64>> {
        let url = format!("{}/{}", self.base_url, series);
        let body = self
            .http
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch revision list for {}", series))?;
        parse_revisions(&body).with_context(|| format!("Bad revision list for {}", series))
    }
}

fn parse_revisions(body: &str) -> Result<Vec<u64>> {
    body.split_whitespace()
        .map(|r| {
            r.parse::<u64>()
                .with_context(|| format!("'{}' is not a revision number", r))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use reqwest::Client;

    #[test]
    fn test_parse_revisions() {
        assert_eq!(parse_revisions("1\n2\n5\n").unwrap(), vec![1, 2, 5]);
        assert!(parse_revisions("").unwrap().is_empty());
        assert!(parse_revisions("1\nx").is_err());
    }

    #[tokio::test]
    async fn test_revisions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/package/eml/edi/1")
            .with_status(200)
            .with_body("1\n2\n3\n")
            .create_async()
            .await;

        let catalog = RevisionCatalog::new(
            HttpClient::new(Client::new()).with_policy(RetryPolicy::immediate()),
            format!("{}/package/eml", server.url()),
        );
        let revisions = catalog.revisions("edi/1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(revisions, vec![1, 2, 3]);
    }
}
