// src/audit/pipeline.rs
// =============================================================================
// The full audit run for one site.
//
// Steps:
// 1. Detect a display name from the landing page
// 2. Run every collector, one after the other; a failing collector becomes
//    an `{ "error": ... }` record and the run goes on
// 3. Merge partial JSON documents (hand-written notes, output of other
//    scripts) on top of the live results
// 4. Score, build the backlog, write the JSON document and the HTML report
//
// Only steps that lose the result (writing files) can fail the run.
// =============================================================================

use super::data::AuditData;
use super::output::{html_path_for, results_file_name, save_json, AuditReport};
use crate::collectors::{
    a11y, cookies, headers, pagespeed, run_collector, search_trend, seo, structured_data, uptime, Collected,
    CollectedExt, CollectorSettings, RetryPolicy,
};
use crate::config::Thresholds;
use crate::crawl::{site_name, CrawlOptions};
use crate::fetch::Fetcher;
use crate::report::render_html;
use anyhow::{bail, Context, Result};
use chrono::{Local, SecondsFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub site_url: String,
    pub thresholds_path: PathBuf,
    pub out_dir: PathBuf,
    pub partials_dir: Option<PathBuf>,
    /// Stylesheet inlined into the HTML report
    pub css: String,
    pub crawl: CrawlOptions,
    pub settings: CollectorSettings,
    pub pagespeed_retry: RetryPolicy,
}

#[derive(Debug)]
pub struct AuditOutcome {
    pub json_path: PathBuf,
    pub html_path: PathBuf,
    pub report: AuditReport,
}

// The site URL must be an absolute http(s) URL
pub fn validate_site_url(site_url: &str) -> Result<Url> {
    let url = Url::parse(site_url).with_context(|| format!("Invalid site URL: {}", site_url))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("Site URL must be an http(s) URL with a host: {}", site_url);
    }
    Ok(url)
}

pub async fn run_audit(options: &AuditOptions) -> Result<AuditOutcome> {
    validate_site_url(&options.site_url)?;
    let fetcher = Fetcher::new().context("Failed to create HTTP client")?;

    println!("▶ Audit pipeline start: {}", options.site_url);
    let mut data = collect_all(&fetcher, options).await;

    if let Some(dir) = &options.partials_dir {
        for (path, partial) in load_partials(dir) {
            info!(path = %path.display(), "merging partial results");
            data.merge(partial);
        }
    }

    let thresholds = Thresholds::load(&options.thresholds_path);
    let report = AuditReport::build(data, &thresholds);

    let json_path = options
        .out_dir
        .join(results_file_name(&options.site_url, &Local::now()));
    save_json(&json_path, &report)?;

    let html_path = html_path_for(&json_path);
    std::fs::write(&html_path, render_html(&report, &options.css))
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    Ok(AuditOutcome {
        json_path,
        html_path,
        report,
    })
}

// Runs every collector in sequence and assembles the raw record
pub async fn collect_all(fetcher: &Fetcher, options: &AuditOptions) -> AuditData {
    let url = options.site_url.as_str();
    let settings = &options.settings;

    let name = detect_site_name(fetcher, url).await;
    let audit_date = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let mut data = AuditData::new(url, &name, audit_date);

    let speed = pagespeed::collect(fetcher, settings, url, options.pagespeed_retry).await;
    match speed.mobile.error() {
        Some(error) => println!("   PageSpeed unavailable: {}", error),
        None => println!(
            "   PageSpeed mobile/desktop: {} / {}",
            format_ratio(speed.mobile_score()),
            format_ratio(speed.desktop_score())
        ),
    }
    data.pagespeed = Some(Collected::Ok(speed));

    data.search_trend = Some(
        run_collector("Search trend (last 90d)", RetryPolicy::once(), || {
            search_trend::collect(fetcher, settings, url)
        })
        .await,
    );

    data.headers = Some(run_collector("Headers", RetryPolicy::once(), || headers::collect(fetcher, url)).await);
    if let Some(report) = data.headers.record() {
        println!("   Headers missing: {}", report.missing.join(", "));
    }

    data.a11y = Some(run_collector("Accessibility", RetryPolicy::once(), || a11y::collect(fetcher, settings, url)).await);
    if let Some(report) = data.a11y.record() {
        println!("   Accessibility issues: {}", report.total);
    }

    data.structured_data = Some(
        run_collector("Structured data", RetryPolicy::once(), || {
            structured_data::collect(fetcher, url)
        })
        .await,
    );

    data.uptime = Some(
        run_collector("Uptime", RetryPolicy::once(), || uptime::collect(fetcher, settings, url)).await,
    );

    data.cookies = Some(run_collector("Cookies", RetryPolicy::once(), || cookies::collect(fetcher, settings, url)).await);
    if let Some(scan) = data.cookies.record() {
        println!(
            "   Cookies: {}, third-party calls: {}",
            scan.cookies.len(),
            scan.third_party_requests.len()
        );
    }

    data.seo = Some(
        run_collector("SEO crawl", RetryPolicy::once(), || {
            seo::collect(fetcher, url, &options.crawl)
        })
        .await,
    );
    if let Some(audit) = data.seo.record() {
        println!(
            "   SEO: {} page(s), health {}/10",
            audit.summary.pages_analysed, audit.summary.health_score
        );
    }

    data
}

async fn detect_site_name(fetcher: &Fetcher, url: &str) -> String {
    match fetcher.get_page(url).await {
        Ok(page) => site_name(&page.body, url),
        Err(e) => {
            debug!(url, error = %e, "landing page not reachable, naming site after host");
            site_name("", url)
        }
    }
}

// Reads every `*.json` file in `dir`, in file name order.
//
// Files that can't be read or parsed are skipped with a warning.
pub fn load_partials(dir: &Path) -> Vec<(PathBuf, AuditData)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "partials directory not readable");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| match read_partial(&path) {
            Ok(partial) => Some((path, partial)),
            Err(e) => {
                let message = format!("{e:#}");
                warn!(path = %path.display(), error = %message, "skipping partial results file");
                None
            }
        })
        .collect()
}

fn read_partial(path: &Path) -> Result<AuditData> {
    let text = std::fs::read_to_string(path)?;
    let partial = serde_json::from_str(&text).context("not an audit record")?;
    Ok(partial)
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "n/a".to_string())
}
