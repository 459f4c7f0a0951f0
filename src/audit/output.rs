// src/audit/output.rs
// =============================================================================
// The persisted audit document: the raw record with scores and backlog.
//
// Written as pretty JSON to `<out_dir>/results_<domain>_<yyyyMMdd-HHmm>.json`,
// and read back by the `report` subcommand.
// =============================================================================

use super::data::AuditData;
use crate::backlog::{build_backlog, BacklogItem};
use crate::config::Thresholds;
use crate::scoring::{compute_scores, Scores};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").unwrap_or_else(|e| panic!("bad pattern: {e}")));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    #[serde(flatten)]
    pub raw: AuditData,
    pub scores: Scores,
    pub backlog: Vec<BacklogItem>,
}

impl AuditReport {
    // Scores and backlog for a finished record
    pub fn build(mut raw: AuditData, thresholds: &Thresholds) -> Self {
        raw.strip_reserved();
        let scores = compute_scores(&raw, thresholds);
        let backlog = build_backlog(&raw);
        Self { raw, scores, backlog }
    }

    // Reads a results file. A bare record without scores or backlog (a
    // hand-assembled file, say) gets them computed with default thresholds.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut value: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        let object = value
            .as_object_mut()
            .with_context(|| format!("{} does not contain a JSON object", path.display()))?;
        let scores = object.remove("scores");
        let backlog = object.remove("backlog");
        let raw: AuditData = serde_json::from_value(value)
            .with_context(|| format!("{} is not an audit record", path.display()))?;

        let scores = match scores {
            Some(scores) => serde_json::from_value(scores).context("invalid scores section")?,
            None => compute_scores(&raw, &Thresholds::default()),
        };
        let backlog = match backlog {
            Some(backlog) => serde_json::from_value(backlog).context("invalid backlog section")?,
            None => build_backlog(&raw),
        };
        Ok(Self { raw, scores, backlog })
    }
}

// results_<domain>_<stamp>.json, domain = URL without scheme, non-word runs as "_"
pub fn results_file_name<Tz>(site_url: &str, when: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let without_scheme = site_url
        .strip_prefix("https://")
        .or_else(|| site_url.strip_prefix("http://"))
        .unwrap_or(site_url);
    let domain = NON_WORD.replace_all(without_scheme, "_");
    format!("results_{}_{}.json", domain, when.format("%Y%m%d-%H%M"))
}

// Writes pretty JSON, creating parent directories
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// The HTML report sits next to the JSON it was rendered from
pub fn html_path_for(json_path: &Path) -> PathBuf {
    json_path.with_extension("html")
}
