// src/fetch/http.rs
// =============================================================================
// This module performs the HTTP requests for crawling and collecting.
//
// Key functionality:
// - GET a page with a timeout, following up to 5 redirects
// - HTTP status codes are results, never errors (a 404 is data for us)
// - Probe a link with HEAD (lightweight, no body download)
// - Falls back to GET when a server refuses HEAD (405/501)
// - Categorizes transport failures (timeout, DNS, SSL, ...)
//
// Rust concepts:
// - thiserror: derive Display/Error for our own error enum
// - From<T>: lets `?` convert reqwest errors into FetchError
// =============================================================================

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Timeout for a full page fetch.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for a link existence probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("site-audit/", env!("CARGO_PKG_VERSION"));

// Why a request failed before we got any HTTP status back.
//
// The Display text doubles as the "reason" part of a broken-link entry,
// e.g. "https://example.com/x → request timed out".
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Too many redirects (redirect loop)
    #[error("too many redirects")]
    TooManyRedirects,
    /// Could not resolve hostname
    #[error("could not resolve hostname")]
    Dns,
    /// TCP connection could not be established
    #[error("connection failed")]
    Connect,
    /// SSL/TLS certificate error
    #[error("SSL certificate error")]
    Ssl,
    /// The URL could not be turned into a request
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Anything else reqwest reported
    #[error("{0}")]
    Other(String),
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        // Convert error to string once; reqwest hides most details in the chain
        let error_string = format!("{:?}", error).to_lowercase();

        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_builder() {
            FetchError::InvalidUrl(error.to_string())
        } else if error_string.contains("certificate")
            || error_string.contains("ssl")
            || error_string.contains("tls")
        {
            FetchError::Ssl
        } else if error.is_connect() {
            // Connection errors often mean DNS issues or host unreachable
            if error_string.contains("dns") || error_string.contains("resolve") {
                FetchError::Dns
            } else {
                FetchError::Connect
            }
        } else {
            FetchError::Other(error.to_string())
        }
    }
}

// A fetched page. The status can be anything, including 404 or 500.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    /// Response headers with lowercase names
    pub headers: BTreeMap<String, String>,
    /// Set-Cookie values, one entry per header line
    pub set_cookies: Vec<String>,
    /// Response body as text
    pub body: String,
}

impl FetchedPage {
    pub fn is_error_status(&self) -> bool {
        self.status >= 400
    }
}

// Result of probing a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Got a status below 400
    Alive(u16),
    /// Got a 4xx/5xx status
    HttpError(u16),
    /// Transport failure; holds the FetchError text
    Failed(String),
}

impl ProbeOutcome {
    // The reason text for a broken-link entry, None when the link is fine
    pub fn broken_reason(&self) -> Option<String> {
        match self {
            ProbeOutcome::Alive(_) => None,
            ProbeOutcome::HttpError(status) => Some(format!("HTTP {}", status)),
            ProbeOutcome::Failed(reason) => Some(reason.clone()),
        }
    }
}

// The shared HTTP client.
//
// reqwest::Client is reference counted inside, so cloning a Fetcher is cheap
// and every clone shares one connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    // Direct access for collectors that talk to JSON APIs
    pub fn client(&self) -> &Client {
        &self.client
    }

    // Fetches a page and returns status, final URL, headers and body.
    //
    // Any HTTP status is a successful result; only transport problems
    // (timeouts, DNS, TLS, redirect loops) are errors.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let set_cookies = set_cookie_values(response.headers());
        let headers = lowercase_headers(response.headers());
        let body = response.text().await?;

        Ok(FetchedPage {
            status,
            final_url,
            headers,
            set_cookies,
            body,
        })
    }

    // Fetches a page with the standard crawl timeout
    pub async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.get(url, PAGE_TIMEOUT).await
    }

    // Checks if a link exists without downloading it.
    //
    // First tries HEAD (faster, no body download). Some servers answer HEAD
    // with 405 Method Not Allowed or 501 Not Implemented even though the page
    // is fine, so those get a second chance with GET.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let head = self.client.head(url).timeout(PROBE_TIMEOUT).send().await;

        let status = match head {
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
                    Ok(response) => response.status(),
                    Err(e) => return ProbeOutcome::Failed(FetchError::from(e).to_string()),
                }
            }
            Ok(response) => response.status(),
            Err(e) => return ProbeOutcome::Failed(FetchError::from(e).to_string()),
        };

        if status.as_u16() >= 400 {
            ProbeOutcome::HttpError(status.as_u16())
        } else {
            ProbeOutcome::Alive(status.as_u16())
        }
    }
}

fn lowercase_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        // Repeated headers are joined the way HTTP allows
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        out.entry(name.as_str().to_lowercase())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
        .collect()
}
