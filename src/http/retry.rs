//! Which node answers are worth asking again, and how long to wait.
//!
//! | status        | read (GET)    | update (PUT)   | retried |
//! |---------------|---------------|----------------|---------|
//! | 401, 403      | Unauthorized  | Unauthorized   | no      |
//! | 404           | NotFound      | Rejected       | no      |
//! | 429           | Throttled     | Throttled      | yes     |
//! | other 4xx     | ClientError   | Rejected       | no      |
//! | 5xx           | ServerError   | ServerError    | yes     |
//!
//! Transport failures (connect, timeout, truncated body) are always retried.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response, StatusCode};
use thiserror::Error;
use xmltree::Element;

pub const MAX_ATTEMPTS: usize = 3;
pub const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on a wait requested through `Retry-After`.
pub const MAX_THROTTLE_WAIT: Duration = Duration::from_secs(60);

/// Fixed attempt count with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: MAX_ATTEMPTS,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Pause before the next attempt. A throttled answer waits at least as
    /// long as the node asked for.
    pub fn wait_after(&self, error: &anyhow::Error) -> Duration {
        match error.downcast_ref::<NodeError>() {
            Some(NodeError::Throttled {
                retry_after: Some(wait),
            }) => (*wait).max(self.delay),
            _ => self.delay,
        }
    }
}

/// An error status returned by the node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Not authorized (HTTP {status}). Updates need a client certificate (--cert) or D1_AUTH_TOKEN.")]
    Unauthorized { status: u16 },

    #[error("No such object on the node")]
    NotFound,

    /// The node refused an update. `detail` is the description from its
    /// exception document, or the raw body.
    #[error("Update rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Throttled by the node. Lower --burst-size or raise --pause-ms.")]
    Throttled { retry_after: Option<Duration> },

    #[error("Request failed with HTTP {status}")]
    ClientError { status: u16 },

    #[error("Node error (HTTP {status})")]
    ServerError { status: u16 },
}

impl NodeError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NodeError::Throttled { .. } | NodeError::ServerError { .. }
        )
    }
}

/// Whether a failed attempt should be repeated.
pub fn is_retryable(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<NodeError>()
        .is_none_or(NodeError::is_retryable)
}

/// Pass a success through; turn an error status into a [`NodeError`].
///
/// Rejected updates read the body so the node's explanation reaches the log.
pub async fn check_response(method: &Method, response: Response) -> Result<Response, NodeError> {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_retry_after);
    let is_update = *method == Method::PUT;

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NodeError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => NodeError::Throttled { retry_after },
        StatusCode::NOT_FOUND if !is_update => NodeError::NotFound,
        s if s.is_client_error() && is_update => NodeError::Rejected {
            status: s.as_u16(),
            detail: exception_detail(&response.text().await.unwrap_or_default()),
        },
        s if s.is_client_error() => NodeError::ClientError { status: s.as_u16() },
        s => NodeError::ServerError { status: s.as_u16() },
    })
}

/// Seconds form of `Retry-After`, capped at [`MAX_THROTTLE_WAIT`]. The
/// HTTP-date form is ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_THROTTLE_WAIT))
}

/// The `<description>` of a DataONE exception document, else the trimmed body.
fn exception_detail(body: &str) -> String {
    Element::parse(body.as_bytes())
        .ok()
        .and_then(|error| {
            error
                .get_child("description")
                .and_then(|d| d.get_text())
                .map(|text| text.trim().to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn answer(method: Method, status: usize, headers: &[(&str, &str)], body: &str) -> NodeError {
        let mut server = mockito::Server::new_async().await;
        let mut mock = server.mock(method.as_str(), "/mn/v2/meta").with_status(status);
        for (name, value) in headers {
            mock = mock.with_header(*name, *value);
        }
        let _m = mock.with_body(body).create_async().await;

        let response = reqwest::Client::new()
            .request(method.clone(), format!("{}/mn/v2/meta", server.url()))
            .send()
            .await
            .unwrap();
        check_response(&method, response).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found_on_read() {
        assert_eq!(answer(Method::GET, 404, &[], "").await, NodeError::NotFound);
    }

    #[tokio::test]
    async fn test_refused_update_carries_exception_description() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<error detailCode="4956" errorCode="400" name="InvalidSystemMetadata">
  <description>obsoletes refers to an unknown pid</description>
</error>"#;
        let err = answer(Method::PUT, 400, &[], body).await;
        assert_eq!(
            err,
            NodeError::Rejected {
                status: 400,
                detail: "obsoletes refers to an unknown pid".into(),
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_of_unknown_object_is_rejected() {
        let err = answer(Method::PUT, 404, &[], "no such pid").await;
        assert_eq!(
            err,
            NodeError::Rejected {
                status: 404,
                detail: "no such pid".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_forbidden_update_is_unauthorized() {
        let err = answer(Method::PUT, 403, &[], "").await;
        assert_eq!(err, NodeError::Unauthorized { status: 403 });
        assert!(err.to_string().contains("--cert"));
    }

    #[tokio::test]
    async fn test_throttling_is_retried_after_requested_wait() {
        let err = answer(Method::GET, 429, &[("retry-after", "7")], "").await;
        assert_eq!(
            err,
            NodeError::Throttled {
                retry_after: Some(Duration::from_secs(7)),
            }
        );
        assert!(err.is_retryable());

        let policy = RetryPolicy::default();
        assert_eq!(policy.wait_after(&err.into()), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let err = answer(Method::GET, 503, &[], "").await;
        assert_eq!(err, NodeError::ServerError { status: 503 });
        assert!(is_retryable(&err.into()));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("3600"), Some(MAX_THROTTLE_WAIT));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }

    #[test]
    fn test_wait_after_defaults_to_policy_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(RETRY_DELAY_MS));
        assert_eq!(
            policy.wait_after(&anyhow::anyhow!("connection reset")),
            policy.delay
        );
        let short = NodeError::Throttled {
            retry_after: Some(Duration::ZERO),
        };
        assert_eq!(policy.wait_after(&short.into()), policy.delay);
        assert_eq!(RetryPolicy::immediate().attempts, MAX_ATTEMPTS);
    }

    #[test]
    fn test_transport_failures_are_retried() {
        assert!(is_retryable(&anyhow::anyhow!("operation timed out")));
        assert!(!is_retryable(&NodeError::NotFound.into()));
        assert!(!is_retryable(
            &anyhow::Error::from(NodeError::Unauthorized { status: 401 }).context("PUT")
        ));
    }
}
