// src/collectors/cookies.rs
// =============================================================================
// Cookie and consent baseline of the landing page.
//
// We load the page the way a first-time visitor does, without clicking any
// banner, and look at what it does before consent:
// - cookies: what the browser stored (JavaScript included)
// - third-party calls: every request to a known tracking vendor
// - a consent banner: cookie/consent keywords in the visible text, or
//   cookie-ish element ids, classes and consent iframes
//
// Headless Chromium does the loading. Without a browser we fall back to the
// server's HTML and Set-Cookie headers, which misses anything injected by
// JavaScript, so the static vendor count is a lower bound.
// =============================================================================

use super::{render, CollectorSettings, ScanMethod};
use crate::fetch::{Fetcher, RenderedCookie, RenderedPage};
use anyhow::{anyhow, Result};
use chrono::DateTime;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(60);

const TRACKING_VENDORS: [&str; 15] = [
    "googletagmanager.com",
    "google-analytics.com",
    "doubleclick.net",
    "facebook.com",
    "connect.facebook.net",
    "hotjar.com",
    "clarity.ms",
    "matomo",
    "piwik",
    "snapads",
    "ttq",
    "twitter.com",
    "linkedin.com",
    "adservice.google.com",
    "stats.g.doubleclick.net",
];

const BANNER_KEYWORDS: [&str; 5] = ["cookie", "cookies", "privacy", "consent", "tracking"];

// <link rel> values that only warm up a connection, no resource is loaded
const RESOURCE_HINTS: [&str; 2] = ["preconnect", "dns-prefetch"];

static BANNER: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"#cookie, #cookies, .cookie, .cookies, [id*="cookie"], [class*="cookie"], iframe[src*="consent"]"#)
});
static RESOURCES: LazyLock<Selector> = LazyLock::new(|| selector("script[src], iframe[src], img[src], link[href]"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieInfo {
    pub name: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl From<&RenderedCookie> for CookieInfo {
    fn from(cookie: &RenderedCookie) -> Self {
        // Session cookies carry -1
        let expires = (cookie.expires > 0.0)
            .then(|| DateTime::from_timestamp(cookie.expires as i64, 0))
            .flatten()
            .map(|at| at.to_rfc3339());
        Self {
            name: cookie.name.clone(),
            domain: Some(cookie.domain.clone()).filter(|d| !d.is_empty()),
            path: Some(cookie.path.clone()).filter(|p| !p.is_empty()),
            expires,
            http_only: cookie.http_only,
            secure: cookie.secure,
            same_site: cookie.same_site.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyRequest {
    pub url: String,
    pub host: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieScan {
    #[serde(default)]
    pub banner_detected: bool,
    #[serde(default)]
    pub cookies: Vec<CookieInfo>,
    #[serde(default)]
    pub third_party_requests: Vec<ThirdPartyRequest>,
    #[serde(default)]
    pub total_requests: usize,
    #[serde(default)]
    pub method: ScanMethod,
}

pub async fn collect(fetcher: &Fetcher, settings: &CollectorSettings, url: &str) -> Result<CookieScan> {
    if let Some(rendered) = render(settings, url, TIMEOUT).await {
        return Ok(scan_rendered(&rendered?));
    }

    let page = fetcher.get(url, TIMEOUT).await?;
    if page.is_error_status() {
        return Err(anyhow!("HTTP {}", page.status));
    }
    let base = Url::parse(&page.final_url)?;
    Ok(scan(&base, &page.body, &page.set_cookies))
}

// Scan of a page loaded in the browser
pub fn scan_rendered(page: &RenderedPage) -> CookieScan {
    let requests: Vec<Url> = page
        .requests
        .iter()
        .filter_map(|u| Url::parse(u).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .collect();

    let document = Html::parse_document(&page.html);
    CookieScan {
        banner_detected: detect_banner(&page.body_text, &document),
        cookies: page.cookies.iter().map(CookieInfo::from).collect(),
        third_party_requests: vendor_requests(&requests),
        total_requests: requests.len(),
        method: ScanMethod::Browser,
    }
}

// Scan of the server's HTML and Set-Cookie headers only
pub fn scan(base: &Url, html: &str, set_cookies: &[String]) -> CookieScan {
    let document = Html::parse_document(html);

    let requests: Vec<Url> = document
        .select(&RESOURCES)
        .filter(|el| !is_resource_hint(el))
        .filter_map(|el| el.value().attr("src").or_else(|| el.value().attr("href")))
        .filter_map(|src| base.join(src).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .collect();

    CookieScan {
        banner_detected: detect_banner(&visible_text(&document), &document),
        cookies: set_cookies.iter().filter_map(|c| parse_set_cookie(c)).collect(),
        third_party_requests: vendor_requests(&requests),
        total_requests: requests.len(),
        method: ScanMethod::Static,
    }
}

fn vendor_requests(requests: &[Url]) -> Vec<ThirdPartyRequest> {
    requests
        .iter()
        .filter_map(|u| {
            let host = u.host_str()?;
            TRACKING_VENDORS
                .iter()
                .any(|vendor| host.contains(vendor))
                .then(|| ThirdPartyRequest {
                    url: u.to_string(),
                    host: host.to_string(),
                })
        })
        .collect()
}

fn is_resource_hint(element: &ElementRef) -> bool {
    element.value().name() == "link"
        && element
            .value()
            .attr("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| RESOURCE_HINTS.contains(&r.to_ascii_lowercase().as_str())))
}

// Text a visitor can read: <body> without script, style, noscript and template
fn visible_text(document: &Html) -> String {
    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };
    let mut out = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn detect_banner(visible_text: &str, document: &Html) -> bool {
    let text = visible_text.to_lowercase();
    BANNER_KEYWORDS.iter().any(|kw| text.contains(kw)) || document.select(&BANNER).next().is_some()
}

// Parses one Set-Cookie header value: "name=value; Path=/; Secure; ..."
pub fn parse_set_cookie(header: &str) -> Option<CookieInfo> {
    let mut parts = header.split(';').map(str::trim);
    let (name, _value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = CookieInfo {
        name: name.to_string(),
        ..Default::default()
    };
    for attribute in parts {
        let (key, value) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), Some(v.trim().to_string())),
            None => (attribute.to_ascii_lowercase(), None),
        };
        match key.as_str() {
            "domain" => cookie.domain = value,
            "path" => cookie.path = value,
            "expires" => cookie.expires = value,
            "max-age" if cookie.expires.is_none() => cookie.expires = value.map(|v| format!("max-age={}", v)),
            "httponly" => cookie.http_only = true,
            "secure" => cookie.secure = true,
            "samesite" => cookie.same_site = value,
            _ => {}
        }
    }
    Some(cookie)
}
