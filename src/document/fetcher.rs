// HTTP document fetcher.
//
// Downloads the text the caller points us at. Only http(s) URLs are
// accepted, the response must be 2xx, declared as text (or undeclared), no
// larger than the configured cap, and valid UTF-8.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

/// Why a document could not be fetched. Every variant is the caller's
/// problem (bad URL, or a URL that doesn't serve usable text).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("The url provided: '{url}' is not a valid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("The url provided: '{url}' uses an unsupported scheme (only http and https are allowed)")]
    UnsupportedScheme { url: String },

    #[error("The url provided: '{url}' did not respond within {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("The url provided: '{url}' could not be reached: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("The url provided: '{url}' gave the following error:\n{status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("The url provided: '{url}' did not return text content ({detail})")]
    NotText { url: String, detail: String },

    #[error("The url provided: '{url}' returned more than {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Source of document text.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dramatis/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            FetchError::Unreachable {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Parse and check a user-supplied URL.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
        }),
    }
}

/// A missing Content-Type is allowed (the UTF-8 check still applies);
/// a present one must be `text/*`.
pub fn is_text_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => value
            .split(';')
            .next()
            .map(|mime| mime.trim().to_ascii_lowercase().starts_with("text/"))
            .unwrap_or(false),
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = validate_url(url)?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_text_content_type(content_type.as_deref()) {
            return Err(FetchError::NotText {
                url: url.to_string(),
                detail: format!("content type {}", content_type.unwrap_or_default()),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(url, e))? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8(body).map_err(|_| FetchError::NotText {
            url: url.to_string(),
            detail: "body is not valid UTF-8".to_string(),
        })?;

        debug!(url, bytes = text.len(), "Fetched document");
        Ok(text)
    }
}
