//! Page rendering
//!
//! This module defines the contract the crawler uses to obtain a materialized
//! document for an address, and an HTTP implementation of it for
//! server-rendered pages. A browser-backed renderer that executes JavaScript
//! can implement the same trait.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Errors a renderer can report
///
/// The crawler treats every variant the same way: the document is stored
/// with status `error` and the traversal continues.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Fetch failed for {address}: {message}")]
    Fetch { address: String, message: String },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("HTTP {status} from {address}")]
    HttpStatus { address: String, status: u16 },

    #[error("Expected HTML from {address}, got '{content_type}'")]
    ContentMismatch {
        address: String,
        content_type: String,
    },

    #[error("Render failed for {address}: {message}")]
    Render { address: String, message: String },
}

/// A document as handed over by a renderer
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Final address of the document, after any redirects
    pub address: String,

    /// Title reported by the rendering engine, if it has one
    pub title_hint: Option<String>,

    /// Raw HTML markup
    pub markup: String,
}

/// Produces materialized documents for addresses
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders the document at `address`
    async fn render(&self, address: &str) -> Result<RenderedDocument, RenderError>;
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL)`.
///
/// # Example
///
/// ```no_run
/// use regatlas::config::UserAgentConfig;
/// use regatlas::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "regatlas".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer for server-rendered HTML, fetched with a plain GET
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Creates a renderer with a client built from the user agent settings
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, address: &str) -> Result<RenderedDocument, RenderError> {
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| classify_request_error(address, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(RenderError::ContentMismatch {
                address: address.to_string(),
                content_type,
            });
        }

        let final_address = response.url().to_string();
        let markup = response
            .text()
            .await
            .map_err(|e| classify_request_error(address, e))?;

        Ok(RenderedDocument {
            address: final_address,
            title_hint: None,
            markup,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

fn classify_request_error(address: &str, e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Timeout(address.to_string())
    } else {
        RenderError::Fetch {
            address: address.to_string(),
            message: e.to_string(),
        }
    }
}
