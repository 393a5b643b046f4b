//! HTTP client module with retry logic and error handling.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::{MAX_ATTEMPTS, NodeError, RETRY_DELAY_MS, RetryPolicy, is_retryable};
