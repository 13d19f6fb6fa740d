//! RFox Hydrate
//!
//! Content hydration for static pages backed by a headless CMS. A page is
//! loaded as an in-memory HTML document, content is fetched from microCMS,
//! mapped to a normalized view and written into designated page regions.
//! When the fetch fails or yields nothing usable, a fixed static fallback is
//! written instead so no region is ever left half rendered.
//!
//! # Features
//!
//! - **Declarative sections**: field-to-target tables and card templates
//!   consumed by one generic renderer
//! - **Explicit outcomes**: every target reports whether it was hydrated,
//!   fell back, or was absent from the page
//! - **Cancellation**: runs are tied to a token that models page teardown
//!
//! # Example
//!
//! ```no_run
//! use rfhydrate::{sections, Hydrator, MicroCmsFetcher, Page, SourceConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SourceConfig::new("solana-hiroshima", "toppage", "my-api-key");
//! let hydrator = Hydrator::new(MicroCmsFetcher::new()?).with_section(sections::toppage(source));
//!
//! let mut page = Page::parse(&std::fs::read_to_string("index.html")?);
//! for report in hydrator.run_all(&mut page) {
//!     let report = report?;
//!     println!("{}: {:?}", report.section, report.outcome);
//! }
//! println!("{}", page.html());
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::fmt;

pub mod error;
pub use error::{Error, Result};

pub mod cancel;
pub mod content;
pub mod fetch;
pub mod mapping;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod sections;

// Async entry points (blocking fetches raced against cancellation)
pub mod async_api;

pub use cancel::CancellationToken;
pub use content::{ContentPayload, ContentRecord, FieldValue, MediaRef};
#[cfg(feature = "http")]
pub use fetch::MicroCmsFetcher;
pub use fetch::{ContentFetcher, StaticFetcher};
pub use mapping::{map_record, FieldDefault, FieldKind, FieldSpec, Schema, SlotValue, View};
pub use page::Page;
pub use pipeline::{FallbackReason, Hydrator, Outcome, Pipeline, Section, SectionReport, TargetReport, TargetState};
pub use render::{Binding, CardVariant, Layout, RenderPlan, Template};

/// Header microCMS reads the API key from
pub const API_KEY_HEADER: &str = "X-MICROCMS-API-KEY";

/// Connection settings for one content endpoint
///
/// Each pipeline instance owns one of these; there is no process-wide
/// configuration. The defaults mirror a single-attempt read:
/// - no request timeout unless `timeout_ms` is set
/// - no retries (the fetcher never retries)
///
/// # Examples
///
/// ```
/// let cfg = rfhydrate::SourceConfig::new("solana-hiroshima", "toppage", "key");
/// assert_eq!(
///     cfg.url().unwrap().as_str(),
///     "https://solana-hiroshima.microcms.io/api/v1/toppage"
/// );
/// ```
#[derive(Clone)]
pub struct SourceConfig {
    /// microCMS service domain (the `{domain}` in `{domain}.microcms.io`)
    pub service_domain: String,
    /// API endpoint name, e.g. `toppage`
    pub endpoint: String,
    /// Key sent in the `X-MICROCMS-API-KEY` header
    pub api_key: String,
    /// Override for the API origin (proxies, local test servers)
    pub base_url: Option<String>,
    /// Optional request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// User agent string to send with requests
    pub user_agent: String,
}

impl SourceConfig {
    pub fn new(
        service_domain: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            service_domain: service_domain.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            base_url: None,
            timeout_ms: None,
            user_agent: format!("rfhydrate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Point the source at a different origin than `{domain}.microcms.io`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Check that the settings can produce a request.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_none() {
            let domain_ok = !self.service_domain.is_empty()
                && self
                    .service_domain
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !domain_ok {
                return Err(Error::ConfigError(format!(
                    "invalid service domain '{}'",
                    self.service_domain
                )));
            }
        }
        if self.endpoint.is_empty() || self.endpoint.contains('/') {
            return Err(Error::ConfigError(format!(
                "invalid endpoint '{}'",
                self.endpoint
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::ConfigError(format!(
                "missing API key for endpoint '{}'",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Full URL of the endpoint: `{origin}/api/v1/{endpoint}`.
    pub fn url(&self) -> Result<url::Url> {
        self.validate()?;
        let mut origin = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}.microcms.io", self.service_domain),
        };
        if !origin.ends_with('/') {
            origin.push('/');
        }
        let base = url::Url::parse(&origin)?;
        Ok(base.join(&format!("api/v1/{}", self.endpoint))?)
    }
}

// Keep the API key out of logs and panic messages.
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("service_domain", &self.service_domain)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Severity of a diagnostics entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

/// Diagnostics entry emitted while a section runs
///
/// Every entry is also forwarded to the `log` facade; handlers registered
/// with [`Hydrator::on_console`] receive them as well.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleMessage {
    /// Severity of the entry
    pub level: ConsoleLevel,
    /// Name of the section that produced the entry
    pub section: String,
    /// Textual content of the message
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let cfg = SourceConfig::new("solana-hiroshima", "recruitment", "k");
        assert_eq!(
            cfg.url().unwrap().as_str(),
            "https://solana-hiroshima.microcms.io/api/v1/recruitment"
        );
        assert!(cfg.timeout_ms.is_none());
    }

    #[test]
    fn test_base_url_override() {
        let cfg = SourceConfig::new("ignored", "heavy-visit-care", "k")
            .with_base_url("http://127.0.0.1:8080");
        assert_eq!(
            cfg.url().unwrap().as_str(),
            "http://127.0.0.1:8080/api/v1/heavy-visit-care"
        );
    }

    #[test]
    fn test_invalid_config() {
        assert!(SourceConfig::new("bad domain", "toppage", "k").validate().is_err());
        assert!(SourceConfig::new("ok", "a/b", "k").validate().is_err());
        assert!(SourceConfig::new("ok", "toppage", " ").validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = SourceConfig::new("d", "toppage", "secret-key");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
