// src/collectors/pagespeed.rs
// =============================================================================
// Performance via the PageSpeed Insights v5 API (Lighthouse in the cloud).
//
// We run the mobile strategy first and desktop second; running them one
// after the other keeps PSI from throttling us. Desktop is only tried when
// mobile worked, a failing mobile run almost always means the site or the
// API is unreachable.
// =============================================================================

use super::{run_collector, Collected, CollectorSettings, RetryPolicy};
use crate::fetch::Fetcher;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

// Lighthouse runs take a while
const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

// Core web vitals as Lighthouse reports them (milliseconds, CLS unitless)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebVitals {
    #[serde(rename = "LCP")]
    pub lcp: Option<f64>,
    #[serde(rename = "CLS")]
    pub cls: Option<f64>,
    #[serde(rename = "INP")]
    pub inp: Option<f64>,
    #[serde(rename = "TTFB")]
    pub ttfb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedRun {
    pub strategy: Strategy,
    /// Lighthouse performance score, 0.0 to 1.0
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub metrics: WebVitals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpeed {
    pub mobile: Collected<PageSpeedRun>,
    pub desktop: Collected<PageSpeedRun>,
}

impl PageSpeed {
    pub fn mobile_score(&self) -> Option<f64> {
        self.mobile.ok().and_then(|run| run.performance_score)
    }

    pub fn desktop_score(&self) -> Option<f64> {
        self.desktop.ok().and_then(|run| run.performance_score)
    }

    // LCP from mobile, falling back to desktop
    pub fn lcp(&self) -> Option<f64> {
        self.mobile
            .ok()
            .and_then(|run| run.metrics.lcp)
            .or_else(|| self.desktop.ok().and_then(|run| run.metrics.lcp))
    }
}

// Runs mobile, then desktop, each through the collector boundary
pub async fn collect(
    fetcher: &Fetcher,
    settings: &CollectorSettings,
    url: &str,
    policy: RetryPolicy,
) -> PageSpeed {
    let mobile = run_collector("PageSpeed (mobile)", policy, || {
        run_strategy(fetcher, settings, url, Strategy::Mobile)
    })
    .await;

    let desktop = if mobile.is_failed() {
        Collected::failed("skipped due to mobile error")
    } else {
        run_collector("PageSpeed (desktop)", policy, || {
            run_strategy(fetcher, settings, url, Strategy::Desktop)
        })
        .await
    };

    PageSpeed { mobile, desktop }
}

pub async fn run_strategy(
    fetcher: &Fetcher,
    settings: &CollectorSettings,
    url: &str,
    strategy: Strategy,
) -> Result<PageSpeedRun> {
    let mut query = vec![
        ("url", url.to_string()),
        ("strategy", strategy.as_str().to_string()),
        ("category", "performance".to_string()),
    ];
    if let Some(key) = &settings.pagespeed_api_key {
        query.push(("key", key.clone()));
    }

    let report: Value = fetcher
        .client()
        .get(&settings.pagespeed_endpoint)
        .query(&query)
        .timeout(TIMEOUT)
        .send()
        .await
        .context("PageSpeed request failed")?
        .error_for_status()?
        .json()
        .await
        .context("PageSpeed returned invalid JSON")?;

    Ok(parse_report(strategy, &report))
}

// Pulls the numbers we need out of a PSI response
pub fn parse_report(strategy: Strategy, report: &Value) -> PageSpeedRun {
    let lighthouse = report.get("lighthouseResult").unwrap_or(&Value::Null);
    let audit = |id: &str| {
        lighthouse
            .pointer(&format!("/audits/{}/numericValue", id))
            .and_then(Value::as_f64)
    };

    PageSpeedRun {
        strategy,
        performance_score: lighthouse
            .pointer("/categories/performance/score")
            .and_then(Value::as_f64),
        metrics: WebVitals {
            lcp: audit("largest-contentful-paint"),
            cls: audit("cumulative-layout-shift"),
            inp: audit("experimental-interaction-to-next-paint"),
            ttfb: audit("server-response-time"),
        },
    }
}
