// src/scoring.rs
// =============================================================================
// Chapter scores (0 - 10) with a traffic-light color.
//
// Five chapters, each computed from its own slice of the audit record:
// - technical: PageSpeed performance, mobile and desktop averaged
// - security: required header and IPv6
// - legal: cookies and third-party calls before consent
// - usability: accessibility issue count
// - marketing: search trend, structured data and the SEO crawl
//
// A collector that failed or did not run never makes scoring fail; each
// chapter documents what it assumes in that case.
//
// Rust concepts:
// - Pure functions: same record + same thresholds = same scores
// - i32 arithmetic with a final clamp, so penalties can't underflow a u8
// =============================================================================

use crate::audit::AuditData;
use crate::collectors::search_trend::Trend;
use crate::collectors::CollectedExt;
use crate::config::{ColorCutoffs, TechnicalThresholds, Thresholds};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Orange,
    Red,
}

impl Color {
    pub fn from_score(score: u8, cutoffs: &ColorCutoffs) -> Self {
        let score = i32::from(score);
        if score >= cutoffs.green {
            Color::Green
        } else if score >= cutoffs.orange {
            Color::Orange
        } else {
            Color::Red
        }
    }

    // Technical cutoffs are ratios; compare them on the 0-10 scale
    pub fn from_ratio_cutoffs(score: u8, cutoffs: &TechnicalThresholds) -> Self {
        let score = f64::from(score);
        if score >= cutoffs.green * 10.0 {
            Color::Green
        } else if score >= cutoffs.orange * 10.0 {
            Color::Orange
        } else {
            Color::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Orange => "orange",
            Color::Red => "red",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u8,
    pub color: Color,
}

impl ScoreEntry {
    fn new(score: i32, cutoffs: &ColorCutoffs) -> Self {
        let score = clamp(score);
        Self {
            score,
            color: Color::from_score(score, cutoffs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub technical: ScoreEntry,
    pub security: ScoreEntry,
    pub legal: ScoreEntry,
    pub usability: ScoreEntry,
    pub marketing: ScoreEntry,
}

impl Scores {
    // Chapters in report order, with a display label
    pub fn chapters(&self) -> [(&'static str, &ScoreEntry); 5] {
        [
            ("Technical", &self.technical),
            ("Security", &self.security),
            ("Legal", &self.legal),
            ("Usability", &self.usability),
            ("Marketing", &self.marketing),
        ]
    }
}

fn clamp(score: i32) -> u8 {
    // Fits after the clamp
    score.clamp(0, 10) as u8
}

pub fn compute_scores(data: &AuditData, thresholds: &Thresholds) -> Scores {
    Scores {
        technical: technical(data, &thresholds.technical),
        security: security(data, thresholds),
        legal: legal(data, thresholds),
        usability: usability(data, thresholds),
        marketing: marketing(data, thresholds),
    }
}

// Average of mobile and desktop; a missing run counts as 0
fn technical(data: &AuditData, cutoffs: &TechnicalThresholds) -> ScoreEntry {
    let pagespeed = data.pagespeed.record();
    let mobile = pagespeed.and_then(|p| p.mobile_score()).unwrap_or(0.0);
    let desktop = pagespeed.and_then(|p| p.desktop_score()).unwrap_or(0.0);

    let score = clamp((((mobile + desktop) / 2.0) * 10.0).round() as i32);
    ScoreEntry {
        score,
        color: Color::from_ratio_cutoffs(score, cutoffs),
    }
}

// IPv6 is only credited when the headers collector confirmed it
fn security(data: &AuditData, thresholds: &Thresholds) -> ScoreEntry {
    let t = &thresholds.security;
    let headers = data.headers.record();

    let mut score = 10;
    if headers.is_some_and(|h| h.is_missing(&t.required_header)) {
        score -= t.missing_header_penalty;
    }
    if !headers.is_some_and(|h| h.ipv6) {
        score -= t.no_ipv6_penalty;
    }
    ScoreEntry::new(score, &thresholds.colors)
}

fn legal(data: &AuditData, thresholds: &Thresholds) -> ScoreEntry {
    let t = &thresholds.legal;
    if data.cookies.errored() {
        return ScoreEntry::new(t.collector_error_score, &thresholds.colors);
    }

    let (third_party, first_party, banner) = data
        .cookies
        .record()
        .map(|c| (c.third_party_requests.len(), c.cookies.len(), c.banner_detected))
        .unwrap_or((0, 0, false));

    let mut score = t.base;
    if third_party > t.third_party.red || first_party > t.first_party_cookie_max {
        score -= t.red_penalty;
    } else if third_party > t.third_party.orange {
        score -= t.orange_penalty;
    }
    if (third_party > 0 || first_party > 0) && !banner {
        score -= t.missing_banner_penalty;
    }
    ScoreEntry::new(score, &thresholds.colors)
}

// Failed or not run: neutral 7
fn usability(data: &AuditData, thresholds: &Thresholds) -> ScoreEntry {
    let t = &thresholds.usability;
    let score = match data.a11y.record() {
        None => t.collector_error_score,
        Some(report) if report.total <= t.green_max => 10,
        Some(report) if report.total <= t.orange_max => 7,
        Some(_) => 3,
    };
    ScoreEntry::new(score, &thresholds.colors)
}

fn marketing(data: &AuditData, thresholds: &Thresholds) -> ScoreEntry {
    let t = &thresholds.marketing;
    let mut score = t.base;

    if data.search_trend.errored() {
        score -= t.search_error_penalty;
    } else if let Some(trend) = data.search_trend.record() {
        match trend.trend {
            Trend::Up => score += t.trend_up_bonus,
            Trend::Down => score -= t.trend_down_penalty,
            Trend::Flat => {}
        }
    }

    if !data.structured_data.record().is_some_and(|s| s.found) {
        score -= t.no_structured_data_penalty;
    }

    if let Some(seo) = data.seo.record() {
        let summary = &seo.summary;
        if summary.health_score >= t.health_green {
            score += 1;
        } else if summary.health_score < t.health_orange {
            score -= 1;
        }
        score -= t.broken_links.severity(summary.broken_links.len());
        score -= t.weak_titles.severity(summary.weak_titles);
        score -= t.missing_meta.severity(summary.missing_meta);
        score -= t.multi_h1.severity(summary.h1_not_single);
    }

    ScoreEntry::new(score, &thresholds.colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> AuditData {
        serde_json::from_value(value).unwrap()
    }

    fn pagespeed(mobile: f64, desktop: f64) -> AuditData {
        data(json!({
            "pagespeed": {
                "mobile": { "strategy": "mobile", "performanceScore": mobile },
                "desktop": { "strategy": "desktop", "performanceScore": desktop }
            }
        }))
    }

    #[test]
    fn test_technical_green_and_red() {
        let scores = compute_scores(&pagespeed(0.9, 0.9), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 9, color: Color::Green });

        let scores = compute_scores(&pagespeed(0.2, 0.2), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 2, color: Color::Red });

        let scores = compute_scores(&pagespeed(0.6, 0.4), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 5, color: Color::Orange });
    }

    #[test]
    fn test_technical_color_uses_rounded_score() {
        // 0.69 rounds to 7, which meets green (0.7 x 10)
        let scores = compute_scores(&pagespeed(0.69, 0.69), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 7, color: Color::Green });

        let scores = compute_scores(&pagespeed(0.64, 0.64), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 6, color: Color::Orange });

        let scores = compute_scores(&pagespeed(0.44, 0.44), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 4, color: Color::Orange });

        let scores = compute_scores(&pagespeed(0.34, 0.34), &Thresholds::default());
        assert_eq!(scores.technical, ScoreEntry { score: 3, color: Color::Red });
    }

    #[test]
    fn test_technical_missing_run_counts_as_zero() {
        let record = data(json!({
            "pagespeed": {
                "mobile": { "error": "timeout" },
                "desktop": { "error": "skipped due to mobile error" }
            }
        }));
        assert_eq!(compute_scores(&record, &Thresholds::default()).technical.score, 0);
        assert_eq!(compute_scores(&AuditData::default(), &Thresholds::default()).technical.score, 0);
    }

    #[test]
    fn test_security_penalties() {
        let t = Thresholds::default();
        let both = data(json!({ "headers": { "missing": ["content-security-policy"], "ipv6": false } }));
        assert_eq!(compute_scores(&both, &t).security, ScoreEntry { score: 5, color: Color::Orange });

        let clean = data(json!({ "headers": { "missing": [], "ipv6": true } }));
        assert_eq!(compute_scores(&clean, &t).security, ScoreEntry { score: 10, color: Color::Green });

        // Unknown IPv6 is not credited
        let failed = data(json!({ "headers": { "error": "HTTP 503" } }));
        assert_eq!(compute_scores(&failed, &t).security.score, 8);
    }

    #[test]
    fn test_legal() {
        let t = Thresholds::default();
        let failed = data(json!({ "cookies": { "error": "blocked" } }));
        assert_eq!(compute_scores(&failed, &t).legal.score, 6);

        let clean = data(json!({ "cookies": { "bannerDetected": true, "cookies": [], "thirdPartyRequests": [] } }));
        assert_eq!(compute_scores(&clean, &t).legal.score, 10);

        let one_tracker = data(json!({ "cookies": {
            "bannerDetected": true,
            "thirdPartyRequests": [{ "url": "https://www.googletagmanager.com/gtm.js", "host": "www.googletagmanager.com" }]
        } }));
        assert_eq!(compute_scores(&one_tracker, &t).legal.score, 6);

        let trackers: Vec<_> = (0..6)
            .map(|i| json!({ "url": format!("https://t{i}.doubleclick.net/"), "host": format!("t{i}.doubleclick.net") }))
            .collect();
        let many_no_banner = data(json!({ "cookies": { "bannerDetected": false, "thirdPartyRequests": trackers } }));
        assert_eq!(compute_scores(&many_no_banner, &t).legal, ScoreEntry { score: 2, color: Color::Red });
    }

    #[test]
    fn test_usability_buckets() {
        let t = Thresholds::default();
        let score = |total: usize| {
            let record = data(json!({ "a11y": { "total": total, "severities": { "error": 0, "warning": 0, "notice": 0 }, "issues": [] } }));
            compute_scores(&record, &t).usability.score
        };
        assert_eq!(score(0), 10);
        assert_eq!(score(10), 7);
        assert_eq!(score(11), 3);

        let failed = data(json!({ "a11y": { "error": "HTTP 500" } }));
        assert_eq!(compute_scores(&failed, &t).usability.score, 7);
    }

    #[test]
    fn test_marketing_adjustments() {
        let t = Thresholds::default();

        // Trend up, schema present, healthy crawl: 7 + 2 + 1
        let good = data(json!({
            "searchTrend": { "siteUrl": "sc-domain:jansen.nl", "periodDays": 90,
                             "totals": { "clicks": 1.0, "impressions": 1.0, "avgCtr": 0.1 }, "trend": "up" },
            "structuredData": { "found": true },
            "seo": { "seedUrl": "https://jansen.nl", "findings": [], "summary": {
                "pagesAnalysed": 3, "weakTitles": 0, "missingMeta": 0, "shortMeta": 0, "longMeta": 0,
                "h1NotSingle": 0, "duplicateTitles": [], "brokenLinks": [], "healthScore": 10 } }
        }));
        assert_eq!(compute_scores(&good, &t).marketing, ScoreEntry { score: 10, color: Color::Green });

        // Search failed, no schema, crawl not run: 7 - 1 - 2
        let poor = data(json!({ "searchTrend": { "error": "403" }, "structuredData": { "found": false } }));
        assert_eq!(compute_scores(&poor, &t).marketing.score, 4);

        // Many weak titles and broken links on an unhealthy crawl
        let broken: Vec<String> = (0..11).map(|i| format!("https://jansen.nl/{i} → HTTP 404")).collect();
        let bad_crawl = data(json!({
            "structuredData": { "found": true },
            "seo": { "seedUrl": "https://jansen.nl", "findings": [], "summary": {
                "pagesAnalysed": 20, "weakTitles": 11, "missingMeta": 4, "shortMeta": 4, "longMeta": 0,
                "h1NotSingle": 0, "duplicateTitles": [], "brokenLinks": broken, "healthScore": 4 } }
        }));
        // 7 - 1 (health) - 2 (broken) - 2 (weak) - 1 (meta)
        assert_eq!(compute_scores(&bad_crawl, &t).marketing.score, 1);
    }

    #[test]
    fn test_missing_thresholds_file_equals_defaults() {
        let record = pagespeed(0.55, 0.81);
        let from_missing = Thresholds::load(std::path::Path::new("/no/such/thresholds.yaml"));
        let explicit = Thresholds::from_yaml(include_str!("../audit/thresholds.yaml")).unwrap();
        assert_eq!(compute_scores(&record, &from_missing), compute_scores(&record, &explicit));
    }

    #[test]
    fn test_color_follows_score_only() {
        let cutoffs = ColorCutoffs::default();
        assert_eq!(Color::from_score(8, &cutoffs), Color::Green);
        assert_eq!(Color::from_score(7, &cutoffs), Color::Orange);
        assert_eq!(Color::from_score(5, &cutoffs), Color::Orange);
        assert_eq!(Color::from_score(4, &cutoffs), Color::Red);
    }
}
