//! Page download.
//!
//! [`Fetcher`] is the seam the crawler talks to; [`HtmlFetcher`] is the
//! blocking reqwest implementation used by the binary. Tests substitute an
//! in-memory fetcher.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Why a page produced no HTML
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not HTML (content type {content_type:?})")]
    NotHtml { url: String, content_type: String },
}

/// Downloads the HTML body of a page.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Settings for [`HtmlFetcher`]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Redirects followed before giving up
    pub redirects: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            redirects: 3,
            timeout: Duration::from_secs(10),
            user_agent: concat!("quarry/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches pages over HTTP(S) and keeps only `200 OK` responses whose
/// content type is `text/html`.
///
/// The underlying client pools connections, so one fetcher should be shared
/// by every crawl task.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: Client,
}

impl HtmlFetcher {
    pub fn new(config: &FetchConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(config.redirects))
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HtmlFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let request_failed = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(request_failed)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_owned();
        if !is_html(&content_type) {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().map_err(request_failed)?;
        debug!(url = %url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

/// `text/html`, with or without parameters such as a charset
fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
}
