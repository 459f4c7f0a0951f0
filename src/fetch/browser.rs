// src/fetch/browser.rs
// =============================================================================
// Headless Chromium for the collectors that need what a visitor's browser
// actually does: cookies set from JavaScript, requests fired by tag managers
// and the DOM after scripts ran.
//
// Key functionality:
// - Launch Chromium (explicit path, or chromiumoxide's own detection)
// - Load one URL without touching the page, record every request it makes
// - Hand back cookies, rendered HTML and the visible body text
//
// Rust concepts:
// - tokio::spawn: the CDP handler must be polled or the browser stalls
// - Arc<Mutex<Vec<_>>>: the request listener task and visit() share a list
// =============================================================================

use anyhow::{anyhow, bail, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, EventRequestWillBeSent};
use futures::StreamExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

// Late requests (tag managers, pixels) still fire after the load event
const SETTLE: Duration = Duration::from_millis(1500);

// A cookie as the browser stored it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedCookie {
    pub name: String,
    pub domain: String,
    pub path: String,
    /// Seconds since the epoch, negative for session cookies
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl From<&Cookie> for RenderedCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            expires: cookie.expires,
            http_only: cookie.http_only,
            secure: cookie.secure,
            same_site: cookie.same_site.as_ref().map(|s| format!("{:?}", s)),
        }
    }
}

// Everything one page load produced
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    /// document.documentElement.outerHTML after scripts ran
    pub html: String,
    /// document.body.innerText
    pub body_text: String,
    pub cookies: Vec<RenderedCookie>,
    /// Every request URL the page made, in order
    pub requests: Vec<String>,
}

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(chrome_path: Option<&Path>) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser, handler })
    }

    // Loads `url` in a fresh tab without interacting with it
    pub async fn visit(&self, url: &str, timeout: Duration) -> Result<RenderedPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open a browser tab")?;

        let mut events = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("failed to listen for network requests")?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&requests);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Ok(mut urls) = sink.lock() {
                    urls.push(event.request.url.clone());
                }
            }
        });

        let navigation = tokio::time::timeout(timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;
        match navigation {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                listener.abort();
                bail!("navigation failed: {e}");
            }
            Err(_) => {
                listener.abort();
                bail!("navigation timed out after {}s", timeout.as_secs());
            }
        }
        tokio::time::sleep(SETTLE).await;

        let final_url = page
            .url()
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| url.to_string());
        let html = page.content().await.context("failed to read the rendered DOM")?;
        let body_text: String = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .context("failed to read the page text")?
            .into_value()
            .map_err(|e| anyhow!("unexpected page text: {e}"))?;
        let cookies = page
            .get_cookies()
            .await
            .context("failed to read cookies")?
            .iter()
            .map(RenderedCookie::from)
            .collect();

        listener.abort();
        let requests = requests.lock().map(|urls| urls.clone()).unwrap_or_default();
        debug!(url, final_url = %final_url, requests = requests.len(), "page rendered");

        if let Err(e) = page.close().await {
            debug!(error = %e, "closing the tab failed");
        }

        Ok(RenderedPage {
            final_url,
            html,
            body_text,
            cookies,
            requests,
        })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "closing Chromium failed");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}
