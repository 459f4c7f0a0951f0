// src/collectors/headers.rs
// =============================================================================
// Security headers and IPv6 support of the landing page.
//
// A header counts as present when the final response (after redirects)
// carries it, whatever its value. IPv6 support means the host has at least
// one AAAA record, which we learn from a normal DNS lookup.
// =============================================================================

use crate::fetch::Fetcher;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const REQUIRED_HEADERS: [&str; 6] = [
    "strict-transport-security",
    "content-security-policy",
    "x-content-type-options",
    "x-frame-options",
    "referrer-policy",
    "permissions-policy",
];

const TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderReport {
    /// All response headers, lowercase names
    #[serde(default)]
    pub present: BTreeMap<String, String>,
    /// Required security headers that were not sent
    #[serde(default)]
    pub missing: Vec<String>,
    /// Whether the host resolves to an IPv6 address
    #[serde(default)]
    pub ipv6: bool,
}

impl HeaderReport {
    pub fn is_missing(&self, header: &str) -> bool {
        self.missing.iter().any(|h| h.eq_ignore_ascii_case(header))
    }
}

pub async fn collect(fetcher: &Fetcher, url: &str) -> Result<HeaderReport> {
    let page = fetcher.get(url, TIMEOUT).await?;
    if page.is_error_status() {
        return Err(anyhow!("HTTP {}", page.status));
    }

    let missing = missing_headers(&page.headers);
    let ipv6 = supports_ipv6(&page.final_url).await.unwrap_or(false);

    Ok(HeaderReport {
        present: page.headers,
        missing,
        ipv6,
    })
}

pub fn missing_headers(present: &BTreeMap<String, String>) -> Vec<String> {
    REQUIRED_HEADERS
        .iter()
        .filter(|name| !present.contains_key(**name))
        .map(|name| name.to_string())
        .collect()
}

pub async fn supports_ipv6(url: &str) -> Result<bool> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL {}", url))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("URL has no host: {}", url))?;
    let port = parsed.port_or_known_default().unwrap_or(443);

    // Literal addresses need no lookup; strip the brackets url keeps on IPv6
    if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<std::net::IpAddr>() {
        return Ok(ip.is_ipv6());
    }

    let addresses = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("DNS lookup failed for {}", host))?;
    let ipv6 = addresses.into_iter().any(|addr| addr.is_ipv6());
    Ok(ipv6)
}
