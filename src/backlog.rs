// src/backlog.rs
// =============================================================================
// Turns the raw audit record into a prioritized list of fixes.
//
// Each rule looks at one slice of the record and adds at most one item.
// A rule whose input is missing simply does not fire.
//
// Priorities:
// - P1: basics, security, legal exposure; fix now
// - P2: performance and SEO with a noticeable effect
// - P3: nice to have, after the basics
//
// The final list is sorted by priority, then chapter name. The sort is
// stable, so items with the same priority and chapter keep rule order.
// =============================================================================

use crate::audit::AuditData;
use crate::collectors::search_trend::Trend;
use crate::collectors::CollectedExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chapter {
    Legal,
    Marketing,
    Security,
    Technical,
}

impl Chapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chapter::Legal => "Legal",
            Chapter::Marketing => "Marketing",
            Chapter::Security => "Security",
            Chapter::Technical => "Technical",
        }
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: String,
    pub title: String,
    pub why: String,
    pub impact: String,
    pub how: String,
    pub priority: Priority,
    pub chapter: Chapter,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_owner")]
    pub owner: String,
}

fn default_owner() -> String {
    "Dev".to_string()
}

// Collects items in rule order
struct Backlog(Vec<BacklogItem>);

impl Backlog {
    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        id: &str,
        priority: Priority,
        chapter: Chapter,
        title: &str,
        why: impl Into<String>,
        impact: &str,
        how: &str,
        tags: &[&str],
    ) {
        self.0.push(BacklogItem {
            id: id.to_string(),
            title: title.to_string(),
            why: why.into(),
            impact: impact.to_string(),
            how: how.to_string(),
            priority,
            chapter,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            owner: default_owner(),
        });
    }
}

pub fn build_backlog(data: &AuditData) -> Vec<BacklogItem> {
    let mut backlog = Backlog(Vec::new());

    security_rules(data, &mut backlog);
    legal_rules(data, &mut backlog);
    technical_rules(data, &mut backlog);
    marketing_rules(data, &mut backlog);
    seo_rules(data, &mut backlog);

    let mut items = backlog.0;
    items.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.chapter.as_str().cmp(b.chapter.as_str()))
    });
    items
}

fn security_rules(data: &AuditData, backlog: &mut Backlog) {
    let Some(headers) = data.headers.record() else {
        return;
    };

    if headers.is_missing("content-security-policy") {
        backlog.add(
            "sec_csp",
            Priority::P1,
            Chapter::Security,
            "Add a Content-Security-Policy (CSP) header",
            "CSP blocks injected scripts and limits clickjacking. The site does not send one.",
            "Smaller attack surface; in line with security header best practice.",
            "Start with a report-only policy that allows your own domains and CDNs, then enforce it \
             once the reports are clean. For example: default-src 'self'; img-src 'self' data: https:; \
             script-src 'self' https://www.googletagmanager.com; style-src 'self' 'unsafe-inline' https:; \
             frame-ancestors 'self'; base-uri 'self';",
            &["headers", "csp"],
        );
    }

    if !headers.ipv6 {
        backlog.add(
            "sec_ipv6",
            Priority::P2,
            Chapter::Security,
            "Enable IPv6 for the main domain",
            "The domain has no AAAA record.",
            "Better reach and latency on modern networks.",
            "Add AAAA records in DNS and make sure the hosting accepts IPv6 traffic.",
            &["ipv6", "dns"],
        );
    }
}

fn legal_rules(data: &AuditData, backlog: &mut Backlog) {
    if data.cookies.errored() {
        backlog.add(
            "legal_cookie_scan_fail",
            Priority::P1,
            Chapter::Legal,
            "Fix the cookie scan: the site did not load or blocked the scanner",
            "The automated consent check failed, so there is no reliable view of tracking and cookies.",
            "Uncertainty about GDPR and consent compliance.",
            "Check for bot protection, make the home page load without interaction and run the scan again.",
            &["cookies", "cmp"],
        );
        return;
    }
    let Some(cookies) = data.cookies.record() else {
        return;
    };

    let third_party = cookies.third_party_requests.len();
    if third_party > 0 {
        backlog.add(
            "legal_consent_blocking",
            Priority::P1,
            Chapter::Legal,
            "Load third-party scripts only after consent",
            format!("{} third-party call(s) were made before consent.", third_party),
            "GDPR compliance, lower fine risk, less data collected.",
            "Put every marketing tag behind a consent trigger (for example Consent Mode v2 in GTM) \
             and block them by default until the visitor agrees.",
            &["cmp", "gtm", "consent-mode"],
        );
    }

    let first_party = cookies.cookies.len();
    if first_party > 10 {
        backlog.add(
            "legal_cookie_hygiene",
            Priority::P2,
            Chapter::Legal,
            "Reduce the number of first-party cookies",
            format!("{} first-party cookies were set on the first visit.", first_party),
            "Better compliance and less stored data.",
            "Remove legacy cookies, shorten expiry times and combine preferences into one cookie.",
            &["cookies"],
        );
    }
}

fn technical_rules(data: &AuditData, backlog: &mut Backlog) {
    if let Some(pagespeed) = data.pagespeed.record() {
        if let Some(mobile) = pagespeed.mobile_score().filter(|score| *score < 0.5) {
            let lcp_seconds = pagespeed.lcp().unwrap_or(0.0) / 1000.0;
            backlog.add(
                "perf_mobile_lcp",
                Priority::P2,
                Chapter::Technical,
                "Lower the mobile LCP (hero media and critical CSS)",
                format!("Mobile Lighthouse score {:.2}; LCP about {:.1}s.", mobile, lcp_seconds),
                "Faster loading means more conversions and better rankings.",
                "Serve the hero image as WebP/AVIF with explicit dimensions, preload critical assets, \
                 cut render-blocking resources, lazy-load media below the fold and cache at the edge.",
                &["lcp", "images", "critical-css"],
            );
        }
    }

    if data.uptime.errored() {
        backlog.add(
            "uptime_monitoring",
            Priority::P2,
            Chapter::Technical,
            "Connect the site to an uptime monitor",
            "No monitor was found for this site, or the API token is missing.",
            "Outages are noticed sooner; SLAs can be backed by data.",
            "Create an HTTP monitor for the home page and route alerts to the support channel.",
            &["uptime", "monitoring"],
        );
    } else if let Some(uptime) = data.uptime.record().filter(|u| u.is_down()) {
        backlog.add(
            "uptime_incidents",
            Priority::P1,
            Chapter::Technical,
            "Investigate recent incidents and fix the cause",
            format!("Monitor status: {}.", uptime.status.as_deref().unwrap_or_default()),
            "Less downtime, higher reliability.",
            "Check hosting and application logs, add health checks and automatic restarts, tighten alerting.",
            &["incidents", "sla"],
        );
    }
}

fn marketing_rules(data: &AuditData, backlog: &mut Backlog) {
    if data.search_trend.errored() {
        backlog.add(
            "search_access",
            Priority::P1,
            Chapter::Marketing,
            "Grant the audit access to the Search Console property",
            "Search Console data is missing, so there is no view of trends or indexing.",
            "Less insight into organic performance.",
            "Add the audit account as a full user on the domain or URL-prefix property, \
             or pass the right property with --search-property.",
            &["search-console", "api"],
        );
    } else if data.search_trend.record().is_some_and(|t| t.trend == Trend::Down) {
        backlog.add(
            "search_trend_down",
            Priority::P2,
            Chapter::Marketing,
            "Turn around the organic trend (content and technique)",
            "Organic clicks went down over the last 90 days.",
            "More organic traffic in the medium term.",
            "Improve E-E-A-T and internal links, refresh the top 10 landing pages, \
             fix 404s and redirects, tune titles and meta descriptions.",
            &["seo", "content"],
        );
    }

    if data.structured_data.record().is_some_and(|s| !s.found) {
        backlog.add(
            "seo_schema",
            Priority::P2,
            Chapter::Marketing,
            "Add fitting structured data",
            "No schema.org markup was found; rich result opportunities are unused.",
            "Higher click-through in search results and better context for search engines.",
            "Add JSON-LD per page type (Organization, WebSite, Article, Product, FAQ) \
             and validate it with the Rich Results Test.",
            &["schema", "seo"],
        );
    }
}

fn seo_rules(data: &AuditData, backlog: &mut Backlog) {
    let Some(seo) = data.seo.record() else {
        return;
    };
    let summary = &seo.summary;

    if !summary.broken_links.is_empty() {
        backlog.add(
            "seo_broken_links",
            Priority::P2,
            Chapter::Marketing,
            "Fix broken links",
            format!("The crawl found {} broken link(s).", summary.broken_links.len()),
            "Visitors and crawlers stop hitting dead ends; link value is kept.",
            "Update or remove the links listed in the SEO section, or redirect the old URLs.",
            &["seo", "links"],
        );
    }

    if !summary.duplicate_titles.is_empty() {
        backlog.add(
            "seo_duplicate_titles",
            Priority::P3,
            Chapter::Marketing,
            "Make page titles unique",
            format!("{} title(s) are used on more than one page.", summary.duplicate_titles.len()),
            "Search engines can tell the pages apart.",
            "Give every page a title that describes its own content.",
            &["seo", "titles"],
        );
    }

    let meta = summary.short_meta;
    if meta > 0 {
        backlog.add(
            "seo_meta_descriptions",
            Priority::P3,
            Chapter::Marketing,
            "Write meta descriptions for every page",
            format!("{} page(s) have a missing or too short meta description.", meta),
            "Better snippets in search results and a higher click-through rate.",
            "Write a unique description of 50 to 160 characters per page.",
            &["seo", "meta"],
        );
    }

    if summary.weak_titles > 0 {
        backlog.add(
            "seo_weak_titles",
            Priority::P3,
            Chapter::Marketing,
            "Replace generic page titles",
            format!("{} page(s) have an empty or generic title such as \"Home\".", summary.weak_titles),
            "Titles that match search intent rank and convert better.",
            "Use the main topic plus the brand, for example \"Sourdough bread | Bakkerij Jansen\".",
            &["seo", "titles"],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> AuditData {
        serde_json::from_value(value).unwrap()
    }

    fn ids(items: &[BacklogItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_missing_csp_gives_one_p1_item() {
        let items = build_backlog(&data(json!({
            "headers": { "missing": ["content-security-policy", "permissions-policy"], "ipv6": true }
        })));
        let csp: Vec<_> = items.iter().filter(|i| i.id == "sec_csp").collect();
        assert_eq!(csp.len(), 1);
        assert_eq!(csp[0].priority, Priority::P1);
        assert_eq!(csp[0].chapter, Chapter::Security);
        assert_eq!(csp[0].owner, "Dev");
    }

    #[test]
    fn test_no_missing_headers_no_csp_item() {
        let items = build_backlog(&data(json!({ "headers": { "missing": [], "ipv6": true } })));
        assert!(items.is_empty());
    }

    #[test]
    fn test_absent_input_never_fires() {
        assert!(build_backlog(&AuditData::default()).is_empty());
    }

    #[test]
    fn test_collector_errors_become_items() {
        let items = build_backlog(&data(json!({
            "cookies": { "error": "net::ERR_CONNECTION_REFUSED" },
            "searchTrend": { "error": "403" },
            "uptime": { "error": "Missing BETTERUPTIME_API_TOKEN" },
            "headers": { "error": "HTTP 503" }
        })));
        assert_eq!(ids(&items), vec!["legal_cookie_scan_fail", "search_access", "uptime_monitoring"]);
    }

    #[test]
    fn test_sorted_by_priority_then_chapter() {
        let trackers = json!([{ "url": "https://connect.facebook.net/x.js", "host": "connect.facebook.net" }]);
        let items = build_backlog(&data(json!({
            "headers": { "missing": ["content-security-policy"], "ipv6": false },
            "cookies": { "bannerDetected": true, "thirdPartyRequests": trackers },
            "pagespeed": {
                "mobile": { "strategy": "mobile", "performanceScore": 0.31, "metrics": { "LCP": 5400.0 } },
                "desktop": { "strategy": "desktop", "performanceScore": 0.8 }
            },
            "uptime": { "id": "1", "status": "down" },
            "structuredData": { "found": false },
            "searchTrend": { "siteUrl": "sc-domain:jansen.nl", "periodDays": 90,
                             "totals": { "clicks": 1.0, "impressions": 1.0, "avgCtr": 0.1 }, "trend": "down" },
            "seo": { "seedUrl": "https://jansen.nl", "findings": [], "summary": {
                "pagesAnalysed": 3, "weakTitles": 3, "missingMeta": 3, "shortMeta": 3, "longMeta": 0,
                "h1NotSingle": 0, "duplicateTitles": ["home"],
                "brokenLinks": ["https://jansen.nl/oud → HTTP 404"], "healthScore": 10 } }
        })));

        assert_eq!(
            ids(&items),
            vec![
                "legal_consent_blocking",
                "sec_csp",
                "uptime_incidents",
                "search_trend_down",
                "seo_schema",
                "seo_broken_links",
                "sec_ipv6",
                "perf_mobile_lcp",
                "seo_duplicate_titles",
                "seo_meta_descriptions",
                "seo_weak_titles",
            ]
        );
        assert!(items.windows(2).all(|w| w[0].priority <= w[1].priority));

        let lcp = items.iter().find(|i| i.id == "perf_mobile_lcp").unwrap();
        assert_eq!(lcp.why, "Mobile Lighthouse score 0.31; LCP about 5.4s.");
    }

    #[test]
    fn test_serialized_shape() {
        let items = build_backlog(&data(json!({ "uptime": { "id": "1", "status": "paused" } })));
        let value = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(value["priority"], "P1");
        assert_eq!(value["chapter"], "Technical");
        assert_eq!(value["tags"], json!(["incidents", "sla"]));
    }
}
