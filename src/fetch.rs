//! Remote content fetchers.
//!
//! A fetcher performs exactly one read per call. There is no retry and no
//! backoff; a non-success status, a transport error and an undecodable body
//! all come back as errors in the network-failure class.

use crate::content::ContentPayload;
use crate::{Error, Result, SourceConfig};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(feature = "http")]
use log::debug;
#[cfg(feature = "http")]
use reqwest::blocking::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// Source of content records for a configured endpoint
pub trait ContentFetcher: Send + Sync {
    /// Perform one read against `source`. Must not touch the page.
    fn fetch(&self, source: &SourceConfig) -> Result<ContentPayload>;
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for Box<T> {
    fn fetch(&self, source: &SourceConfig) -> Result<ContentPayload> {
        (**self).fetch(source)
    }
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for Arc<T> {
    fn fetch(&self, source: &SourceConfig) -> Result<ContentPayload> {
        (**self).fetch(source)
    }
}

/// Fetcher backed by the microCMS REST API.
///
/// Uses a blocking client. Construct it outside of an async runtime; the
/// async entry points move calls onto blocking threads.
#[cfg(feature = "http")]
#[derive(Clone)]
pub struct MicroCmsFetcher {
    client: Client,
}

#[cfg(feature = "http")]
impl MicroCmsFetcher {
    pub fn new() -> Result<Self> {
        // No client-wide timeout: a source opts in through `timeout_ms`.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ContentFetcher for MicroCmsFetcher {
    fn fetch(&self, source: &SourceConfig) -> Result<ContentPayload> {
        let url = source.url()?;
        debug!("GET {} ({})", url, source.endpoint);

        let mut request = self
            .client
            .get(url.clone())
            .header(crate::API_KEY_HEADER, source.api_key.as_str())
            .header(reqwest::header::USER_AGENT, source.user_agent.as_str());
        if let Some(ms) = source.timeout_ms {
            request = request.timeout(Duration::from_millis(ms));
        }

        let response = request
            .send()
            .map_err(|e| Error::Network(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            // Keep the error body; microCMS explains auth and quota failures there
            let body = response.text().unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;
        ContentPayload::from_slice(&body)
    }
}

/// Canned response served by [`StaticFetcher`]
#[derive(Debug, Clone)]
pub enum StaticResponse {
    /// Successful response with this body
    Body(Vec<u8>),
    /// Non-success status with this body
    Status(u16, String),
}

/// Fetcher that serves canned bodies per endpoint.
///
/// Used for offline builds from content dumps and in tests. Endpoints with
/// no entry answer 404, the same as an unknown microCMS endpoint.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    responses: Arc<HashMap<String, StaticResponse>>,
    requests: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, endpoint: impl Into<String>, body: &serde_json::Value) -> Self {
        self.with_response(endpoint, StaticResponse::Body(body.to_string().into_bytes()))
    }

    pub fn with_status(self, endpoint: impl Into<String>, status: u16) -> Self {
        self.with_response(endpoint, StaticResponse::Status(status, String::new()))
    }

    pub fn with_response(mut self, endpoint: impl Into<String>, response: StaticResponse) -> Self {
        Arc::make_mut(&mut self.responses).insert(endpoint.into(), response);
        self
    }

    /// Load `{endpoint}.json` files from a content dump directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut fetcher = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(endpoint) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let endpoint = endpoint.to_string();
            let body = std::fs::read(&path)?;
            fetcher = fetcher.with_response(endpoint, StaticResponse::Body(body));
        }
        Ok(fetcher)
    }

    /// Number of fetches served so far (across clones).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ContentFetcher for StaticFetcher {
    fn fetch(&self, source: &SourceConfig) -> Result<ContentPayload> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(&source.endpoint) {
            Some(StaticResponse::Body(body)) => ContentPayload::from_slice(body),
            Some(StaticResponse::Status(status, body)) => Err(Error::HttpStatus {
                status: *status,
                body: body.clone(),
            }),
            None => Err(Error::HttpStatus {
                status: 404,
                body: format!("no content for endpoint '{}'", source.endpoint),
            }),
        }
    }
}
