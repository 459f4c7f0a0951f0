// src/collectors/mod.rs
// =============================================================================
// Collectors fetch one kind of signal about a site (performance, headers,
// accessibility, ...) and hand back a plain record.
//
// The contract every collector follows:
// - it is an async function returning anyhow::Result<Record>
// - it is invoked through `run_collector`, which logs, retries according
//   to the collector's RetryPolicy and turns a final error into
//   `Collected::Failed { error }`
// - a failed collector never stops the audit; scoring and the backlog
//   treat `{ "error": ... }` as "unknown"
//
// Submodules:
// - pagespeed: PageSpeed Insights performance scores and web vitals
// - headers: security headers and IPv6 reachability
// - a11y: accessibility checks over the rendered page
// - structured_data: JSON-LD detection
// - search_trend: Search Console clicks trend
// - uptime: Better Uptime monitor status
// - cookies: cookie / consent scan in headless Chromium
// - seo: the SEO crawl plus heuristics
// =============================================================================

pub mod a11y;
pub mod cookies;
pub mod headers;
pub mod pagespeed;
pub mod search_trend;
pub mod seo;
pub mod structured_data;
pub mod uptime;

use crate::fetch::{BrowserSession, RenderedPage};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

// What a collector produced: its record, or the reason it failed.
//
// Serialized as the record itself or as `{ "error": "..." }`, so the JSON
// stays readable and hand-written partial files can use either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Collected<T> {
    Failed { error: String },
    Ok(T),
}

impl<T> Collected<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        Collected::Failed { error: error.into() }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Collected::Ok(value) => Some(value),
            Collected::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Collected::Failed { error } => Some(error),
            Collected::Ok(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Collected::Failed { .. })
    }
}

// Small helpers for the very common `Option<Collected<T>>` fields
pub trait CollectedExt<T> {
    // The record, when the collector ran and succeeded
    fn record(&self) -> Option<&T>;
    // True only when the collector ran and failed
    fn errored(&self) -> bool;
}

impl<T> CollectedExt<T> for Option<Collected<T>> {
    fn record(&self) -> Option<&T> {
        self.as_ref().and_then(Collected::ok)
    }

    fn errored(&self) -> bool {
        self.as_ref().is_some_and(Collected::is_failed)
    }
}

// How often to try a collector and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub max_attempts: u32,
    /// Wait before attempt n+1 is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    // One attempt, no retry
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    // PageSpeed Insights throttles and times out regularly
    pub const fn pagespeed() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1500),
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    // Runs `operation` until it succeeds or the attempts run out
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    let message = format!("{e:#}");
                    warn!(collector = name, attempt, error = %message, ?delay, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

// Runs one collector with logging, retries and error isolation
pub async fn run_collector<T, F, Fut>(name: &str, policy: RetryPolicy, operation: F) -> Collected<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    println!("→ {}…", name);
    match policy.run(name, operation).await {
        Ok(value) => {
            info!(collector = name, "collector finished");
            println!("✓ {} done", name);
            Collected::Ok(value)
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(collector = name, error = %message, "collector failed");
            println!("✗ {} failed: {}", name, message);
            Collected::Failed { error: message }
        }
    }
}

// How a page-level collector looked at the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    /// Rendered in headless Chromium
    Browser,
    /// Only the HTML the server sent
    #[default]
    Static,
}

// Endpoints and credentials for the collectors that call external APIs.
//
// The base URLs are overridable so tests can point them at a local server.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub pagespeed_endpoint: String,
    pub pagespeed_api_key: Option<String>,
    pub uptime_api_base: String,
    pub uptime_token: Option<String>,
    pub search_api_base: String,
    pub search_token: Option<String>,
    pub search_property: Option<String>,
    /// Use headless Chromium for the cookie and accessibility scans
    pub use_browser: bool,
    /// Chromium binary; None lets chromiumoxide look for one
    pub chrome_path: Option<PathBuf>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            pagespeed_endpoint: pagespeed::DEFAULT_ENDPOINT.to_string(),
            pagespeed_api_key: None,
            uptime_api_base: uptime::DEFAULT_API_BASE.to_string(),
            uptime_token: None,
            search_api_base: search_trend::DEFAULT_API_BASE.to_string(),
            search_token: None,
            search_property: None,
            use_browser: true,
            chrome_path: None,
        }
    }
}

// Loads `url` in headless Chromium.
//
// None means no browser is available (disabled or failed to launch) and the
// caller should fall back to a static scan. A page that fails to load in a
// running browser is an error, like any other collector failure.
pub async fn render(settings: &CollectorSettings, url: &str, timeout: Duration) -> Option<anyhow::Result<RenderedPage>> {
    if !settings.use_browser {
        return None;
    }
    let session = match BrowserSession::launch(settings.chrome_path.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            let message = format!("{e:#}");
            warn!(error = %message, "headless browser unavailable, using a static scan");
            return None;
        }
    };
    let page = session.visit(url, timeout).await;
    session.close().await;
    Some(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        found: bool,
    }

    #[test]
    fn test_collected_serializes_as_record_or_error() {
        let ok: Collected<Sample> = Collected::Ok(Sample { found: true });
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"found":true}"#);

        let failed: Collected<Sample> = Collected::failed("timeout");
        assert_eq!(serde_json::to_string(&failed).unwrap(), r#"{"error":"timeout"}"#);

        let parsed: Collected<Sample> = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(parsed.error(), Some("boom"));
        let parsed: Collected<Sample> = serde_json::from_str(r#"{"found":false}"#).unwrap();
        assert_eq!(parsed.ok(), Some(&Sample { found: false }));
    }

    #[tokio::test]
    async fn test_render_is_skipped_when_browser_disabled() {
        let settings = CollectorSettings {
            use_browser: false,
            ..Default::default()
        };
        assert!(render(&settings, "https://jansen.nl", Duration::from_secs(1)).await.is_none());
    }

    #[test]
    fn test_scan_method_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ScanMethod::Browser).unwrap(), r#""browser""#);
        assert_eq!(ScanMethod::default(), ScanMethod::Static);
    }

    #[test]
    fn test_option_helpers() {
        let missing: Option<Collected<Sample>> = None;
        assert!(missing.record().is_none());
        assert!(!missing.errored());

        let failed = Some(Collected::<Sample>::failed("x"));
        assert!(failed.errored());
        assert!(failed.record().is_none());
    }

    #[tokio::test]
    async fn test_retry_policy_retries_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_attempts: 3, backoff: Duration::ZERO };
        let result = policy
            .run("flaky", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(anyhow!("attempt {n} failed"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_policy_surfaces_last_error() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_attempts: 2, backoff: Duration::ZERO };
        let result: anyhow::Result<()> = policy
            .run("broken", || {
                calls.set(calls.get() + 1);
                async { Err(anyhow!("still down")) }
            })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "still down");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_backoff_grows_per_attempt() {
        let policy = RetryPolicy::pagespeed();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_run_collector_isolates_failures() {
        let result: Collected<Sample> =
            run_collector("Broken", RetryPolicy::once(), || async { Err(anyhow!("503 Service Unavailable")) })
                .await;
        assert_eq!(result, Collected::failed("503 Service Unavailable"));

        let result = run_collector("Working", RetryPolicy::once(), || async { Ok(Sample { found: true }) }).await;
        assert_eq!(result, Collected::Ok(Sample { found: true }));
    }
}
