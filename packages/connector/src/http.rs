//! Blocking HTTP client shared by the search index client and content fetches.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::error::{ConnectorError, Result};

/// User agent string identifying this connector.
const USER_AGENT: &str = concat!("oai-connector/", env!("CARGO_PKG_VERSION"));

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Timeout for auxiliary content downloads.
const CONTENT_TIMEOUT_SECS: u64 = 30;

/// Why a download did not produce a body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered, but not with success.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// No usable answer: connection refused, timeout, broken body.
    #[error("{0}")]
    Transport(String),
}

/// Create a configured HTTP client.
///
/// Must not be called from within an async context; the blocking client
/// owns its own runtime.
pub fn create_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Download a URL, retrying transient failures at most `max_retries` times.
///
/// Connection errors, timeouts and 5xx responses are retried with
/// exponential backoff. Client errors (4xx) are returned immediately.
pub fn download_bytes(
    client: &Client,
    url: &str,
    max_retries: u32,
) -> std::result::Result<Vec<u8>, FetchError> {
    let attempts = max_retries + 1;
    let mut last_error = FetchError::Transport("no attempt made".to_string());

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = RETRY_BASE_DELAY_MS * (1 << (attempt - 1));
            tracing::debug!(attempt, delay_ms = delay, "Retrying after delay");
            thread::sleep(Duration::from_millis(delay));
        }

        match client.get(url).send() {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(|e| FetchError::Transport(e.to_string()));
                }

                let body = response.text().unwrap_or_default();
                let failure = FetchError::Status {
                    status: status.as_u16(),
                    body: truncate(&body, 500),
                };
                if !status.is_server_error() {
                    return Err(failure);
                }
                tracing::warn!(
                    status = %status,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    "Server error"
                );
                last_error = failure;
            }
            Err(e) => {
                if !(e.is_connect() || e.is_timeout()) {
                    return Err(FetchError::Transport(e.to_string()));
                }
                tracing::warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    "Connection error"
                );
                last_error = FetchError::Transport(e.to_string());
            }
        }
    }

    Err(last_error)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Source of auxiliary record content, such as METS documents.
pub trait ContentSource: Send + Sync {
    /// Fetch the document at `url` as text.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// [`ContentSource`] backed by plain HTTP GET requests.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    max_retries: u32,
}

impl HttpContentSource {
    pub fn new(max_retries: u32) -> Result<Self> {
        Ok(Self {
            client: create_client(CONTENT_TIMEOUT_SECS)?,
            max_retries,
        })
    }
}

impl ContentSource for HttpContentSource {
    fn fetch(&self, url: &str) -> Result<String> {
        let bytes = download_bytes(&self.client, url, self.max_retries).map_err(|e| {
            ConnectorError::ContentFetch {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;
        String::from_utf8(bytes).map_err(|e| ConnectorError::ContentFetch {
            url: url.to_string(),
            message: format!("body is not UTF-8: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        assert!(create_client(5).is_ok());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP status 404: not found");
    }
}
