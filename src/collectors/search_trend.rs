// src/collectors/search_trend.rs
// =============================================================================
// Organic search trend from the Search Console search analytics API.
//
// We ask for daily clicks over the last 90 days and compare the second half
// of the period with the first half:
//   more than 5% up   -> up
//   more than 5% down -> down
//   otherwise         -> flat
//
// The property is derived from the audited URL. Candidates, tried in order
// until one answers:
// 1. an explicit property (GSC_SITE_URL)
// 2. the domain property  sc-domain:<host>
// 3. the url-prefix property https://<host>/
//
// Authentication is a ready-made OAuth access token (GSC_ACCESS_TOKEN).
// =============================================================================

use crate::fetch::Fetcher;
use super::CollectorSettings;
use anyhow::{anyhow, Context, Result};
use chrono::{Duration as Days, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/webmasters/v3";

const TIMEOUT: Duration = Duration::from_secs(30);
const PERIOD_DAYS: i64 = 90;
const SAMPLE_DAYS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

// One day of search analytics, as the API returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTotals {
    pub clicks: f64,
    pub impressions: f64,
    pub avg_ctr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTrend {
    pub site_url: String,
    pub period_days: usize,
    pub totals: SearchTotals,
    pub trend: Trend,
    /// The last two weeks of rows
    #[serde(default)]
    pub sample: Vec<DailyRow>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<DailyRow>,
}

pub async fn collect(fetcher: &Fetcher, settings: &CollectorSettings, url: &str) -> Result<SearchTrend> {
    let token = settings
        .search_token
        .as_deref()
        .ok_or_else(|| anyhow!("Missing search console access token (GSC_ACCESS_TOKEN)"))?;

    let mut failures = Vec::new();
    for property in candidate_properties(settings.search_property.as_deref(), url) {
        match query(fetcher, &settings.search_api_base, token, &property).await {
            Ok(rows) => return Ok(summarize(&property, &rows)),
            Err(e) => {
                debug!(property = %property, error = %e, "search console property not accessible");
                failures.push(format!("{}: {}", property, e));
            }
        }
    }

    Err(anyhow!(
        "No accessible search console property for this URL (tried {})",
        failures.join("; ")
    ))
}

pub fn candidate_properties(explicit: Option<&str>, url: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(property) = explicit.filter(|p| !p.trim().is_empty()) {
        candidates.push(property.to_string());
    }
    if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        candidates.push(format!("sc-domain:{}", host));
        candidates.push(format!("https://{}/", host));
    }
    candidates
}

async fn query(fetcher: &Fetcher, api_base: &str, token: &str, property: &str) -> Result<Vec<DailyRow>> {
    let encoded: String = url::form_urlencoded::byte_serialize(property.as_bytes()).collect();
    let endpoint = format!("{}/sites/{}/searchAnalytics/query", api_base.trim_end_matches('/'), encoded);

    let end = Utc::now().date_naive();
    let start = end - Days::days(PERIOD_DAYS);
    let body = json!({
        "startDate": start.format("%Y-%m-%d").to_string(),
        "endDate": end.format("%Y-%m-%d").to_string(),
        "dimensions": ["date"],
        "rowLimit": 25000,
    });

    let response: QueryResponse = fetcher
        .client()
        .post(&endpoint)
        .bearer_auth(token)
        .json(&body)
        .timeout(TIMEOUT)
        .send()
        .await
        .context("search console request failed")?
        .error_for_status()?
        .json()
        .await
        .context("search console returned invalid JSON")?;

    Ok(response.rows)
}

pub fn trend_of(rows: &[DailyRow]) -> Trend {
    let half = rows.len() / 2;
    let first: f64 = rows[..half].iter().map(|r| r.clicks).sum();
    let second: f64 = rows[half..].iter().map(|r| r.clicks).sum();

    if second > first * 1.05 {
        Trend::Up
    } else if second < first * 0.95 {
        Trend::Down
    } else {
        Trend::Flat
    }
}

pub fn summarize(property: &str, rows: &[DailyRow]) -> SearchTrend {
    let clicks = rows.iter().map(|r| r.clicks).sum();
    let impressions = rows.iter().map(|r| r.impressions).sum();
    let avg_ctr = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| r.ctr).sum::<f64>() / rows.len() as f64
    };

    SearchTrend {
        site_url: property.to_string(),
        period_days: rows.len(),
        totals: SearchTotals {
            clicks,
            impressions,
            avg_ctr,
        },
        trend: trend_of(rows),
        sample: rows[rows.len().saturating_sub(SAMPLE_DAYS)..].to_vec(),
    }
}
