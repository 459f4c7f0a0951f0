// src/collectors/uptime.rs
// =============================================================================
// Uptime status from the Better Uptime monitors API.
//
// We list the account's monitors and pick the first one whose URL or name
// mentions the audited host. No token or no matching monitor is an error
// record, which the backlog turns into a "set up monitoring" item.
// =============================================================================

use super::CollectorSettings;
use crate::fetch::Fetcher;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://betteruptime.com/api/v2";

const TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeStatus {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    /// "up", "down", "paused", "maintenance", ...
    pub status: Option<String>,
    pub last_check_at: Option<String>,
    pub last_incident_at: Option<String>,
    pub expected_status_code: Option<u16>,
    pub monitor_type: Option<String>,
}

impl UptimeStatus {
    // True when the monitor reports a status other than "up"
    pub fn is_down(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s != "up")
    }
}

#[derive(Debug, Deserialize)]
struct MonitorList {
    #[serde(default)]
    data: Vec<Monitor>,
}

#[derive(Debug, Deserialize)]
struct Monitor {
    id: String,
    #[serde(default)]
    attributes: MonitorAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct MonitorAttributes {
    url: Option<String>,
    pronounceable_name: Option<String>,
    #[serde(alias = "name")]
    monitor_name: Option<String>,
    status: Option<String>,
    last_checked_at: Option<String>,
    last_incident_at: Option<String>,
    expected_status_codes: Option<Vec<u16>>,
    monitor_type: Option<String>,
}

impl MonitorAttributes {
    fn display_name(&self) -> Option<&str> {
        self.pronounceable_name
            .as_deref()
            .or(self.monitor_name.as_deref())
    }
}

pub async fn collect(fetcher: &Fetcher, settings: &CollectorSettings, url: &str) -> Result<UptimeStatus> {
    let token = settings
        .uptime_token
        .as_deref()
        .ok_or_else(|| anyhow!("Missing BETTERUPTIME_API_TOKEN"))?;

    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| anyhow!("URL has no host: {}", url))?;

    let endpoint = format!("{}/monitors", settings.uptime_api_base.trim_end_matches('/'));
    let monitors: MonitorList = fetcher
        .client()
        .get(&endpoint)
        .bearer_auth(token)
        .timeout(TIMEOUT)
        .send()
        .await
        .context("uptime API request failed")?
        .error_for_status()?
        .json()
        .await
        .context("uptime API returned invalid JSON")?;

    let monitor = monitors
        .data
        .into_iter()
        .find(|m| {
            let a = &m.attributes;
            a.url.as_deref().is_some_and(|u| u.contains(&host))
                || a.display_name().is_some_and(|n| n.contains(&host))
        })
        .ok_or_else(|| anyhow!("No monitor found for host {}", host))?;

    let a = monitor.attributes;
    Ok(UptimeStatus {
        id: monitor.id,
        name: a.display_name().map(str::to_string),
        url: a.url,
        status: a.status,
        last_check_at: a.last_checked_at,
        last_incident_at: a.last_incident_at,
        expected_status_code: a.expected_status_codes.and_then(|codes| codes.first().copied()),
        monitor_type: a.monitor_type,
    })
}
