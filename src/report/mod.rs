// src/report/mod.rs
// =============================================================================
// Renders an audit document as a single static HTML page.
//
// The stylesheet is inlined so the file can be mailed or opened offline.
// Every value that comes from the audited site or a collector is escaped;
// page titles, header values and error messages are not under our control.
//
// A collector that failed shows its error; one that did not run shows
// "Not collected". Rendering itself never fails.
// =============================================================================

use crate::audit::AuditReport;
use crate::backlog::BacklogItem;
use crate::classify::SeoAudit;
use crate::collectors::a11y::A11yReport;
use crate::collectors::cookies::CookieScan;
use crate::collectors::headers::{HeaderReport, REQUIRED_HEADERS};
use crate::collectors::pagespeed::{PageSpeed, PageSpeedRun};
use crate::collectors::search_trend::{SearchTrend, Trend};
use crate::collectors::structured_data::StructuredData;
use crate::collectors::uptime::UptimeStatus;
use crate::collectors::Collected;

pub const DEFAULT_CSS: &str = include_str!("../../assets/report.css");

// How many accessibility issues to list before cutting off
const MAX_A11Y_ISSUES: usize = 15;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_html(report: &AuditReport, css: &str) -> String {
    let raw = &report.raw;
    let name = if raw.site_name().is_empty() {
        raw.site_url()
    } else {
        raw.site_name()
    };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>Site audit: {}</title>\n", escape_html(name)));
    // A stylesheet can't close its own <style> element
    out.push_str(&format!("<style>\n{}\n</style>\n", css.replace("</style", "<\\/style")));
    out.push_str("</head>\n<body>\n");

    out.push_str("<header>\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape_html(name)));
    out.push_str(&format!(
        "<p class=\"meta\"><a href=\"{url}\">{url}</a> &middot; {date}</p>\n",
        url = escape_html(raw.site_url()),
        date = escape_html(raw.audit_date.as_deref().unwrap_or("")),
    ));
    out.push_str("</header>\n<main>\n");

    render_scores(&mut out, report);
    section(&mut out, "Performance", raw.pagespeed.as_ref(), render_pagespeed);
    section(&mut out, "Security headers", raw.headers.as_ref(), render_headers);
    section(&mut out, "Cookies and consent", raw.cookies.as_ref(), render_cookies);
    section(&mut out, "Accessibility", raw.a11y.as_ref(), render_a11y);
    section(&mut out, "SEO crawl", raw.seo.as_ref(), render_seo);
    section(&mut out, "Structured data", raw.structured_data.as_ref(), render_structured_data);
    section(&mut out, "Uptime", raw.uptime.as_ref(), render_uptime);
    section(&mut out, "Search trend", raw.search_trend.as_ref(), render_search_trend);
    render_backlog(&mut out, &report.backlog);
    render_notes(&mut out, &raw.notes);

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

// One <section>, with the collector's error or "Not collected" in place of data
fn section<T>(out: &mut String, title: &str, collected: Option<&Collected<T>>, render: fn(&mut String, &T)) {
    out.push_str(&format!("<section>\n<h2>{}</h2>\n", escape_html(title)));
    match collected {
        Some(Collected::Ok(record)) => render(out, record),
        Some(Collected::Failed { error }) => {
            out.push_str(&format!("<p class=\"error\">Not available: {}</p>\n", escape_html(error)));
        }
        None => out.push_str("<p class=\"muted\">Not collected</p>\n"),
    }
    out.push_str("</section>\n");
}

fn render_scores(out: &mut String, report: &AuditReport) {
    out.push_str("<section class=\"scores\">\n");
    for (label, entry) in report.scores.chapters() {
        out.push_str(&format!(
            "<div class=\"card {color}\"><span class=\"label\">{label}</span>\
             <span class=\"score\">{score}/10</span><span class=\"badge\">{color}</span></div>\n",
            color = entry.color,
            label = label,
            score = entry.score,
        ));
    }
    out.push_str("</section>\n");
}

// Two-column table of label / already escaped value
fn key_values(out: &mut String, rows: &[(&str, String)]) {
    out.push_str("<table class=\"kv\">\n");
    for (key, value) in rows {
        out.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>\n", escape_html(key), value));
    }
    out.push_str("</table>\n");
}

fn list(out: &mut String, items: impl IntoIterator<Item = String>) {
    out.push_str("<ul>\n");
    for item in items {
        out.push_str(&format!("<li>{}</li>\n", escape_html(&item)));
    }
    out.push_str("</ul>\n");
}

fn optional_number(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "n/a".to_string())
}

fn render_pagespeed(out: &mut String, speed: &PageSpeed) {
    out.push_str("<table>\n<tr><th></th><th>Score</th><th>LCP</th><th>CLS</th><th>INP</th><th>TTFB</th></tr>\n");
    for (label, run) in [("Mobile", &speed.mobile), ("Desktop", &speed.desktop)] {
        match run {
            Collected::Ok(run) => out.push_str(&pagespeed_row(label, run)),
            Collected::Failed { error } => out.push_str(&format!(
                "<tr><th>{}</th><td colspan=\"5\" class=\"error\">{}</td></tr>\n",
                label,
                escape_html(error)
            )),
        }
    }
    out.push_str("</table>\n");
}

fn pagespeed_row(label: &str, run: &PageSpeedRun) -> String {
    let ms = |v: f64| format!("{:.0} ms", v);
    format!(
        "<tr><th>{}</th><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        label,
        optional_number(run.performance_score, |s| format!("{:.0}", s * 100.0)),
        optional_number(run.metrics.lcp, ms),
        optional_number(run.metrics.cls, |v| format!("{:.3}", v)),
        optional_number(run.metrics.inp, ms),
        optional_number(run.metrics.ttfb, ms),
    )
}

fn render_headers(out: &mut String, headers: &HeaderReport) {
    out.push_str("<table>\n<tr><th>Header</th><th>Value</th></tr>\n");
    for name in REQUIRED_HEADERS {
        let cell = match headers.present.get(name) {
            Some(value) => format!("<td class=\"ok\">{}</td>", escape_html(value)),
            None => "<td class=\"error\">missing</td>".to_string(),
        };
        out.push_str(&format!("<tr><th>{}</th>{}</tr>\n", name, cell));
    }
    out.push_str("</table>\n");
    key_values(out, &[("IPv6", if headers.ipv6 { "yes" } else { "no" }.to_string())]);
}

fn render_cookies(out: &mut String, scan: &CookieScan) {
    key_values(
        out,
        &[
            ("Consent banner", if scan.banner_detected { "detected" } else { "not found" }.to_string()),
            ("First-party cookies", scan.cookies.len().to_string()),
            ("Third-party calls before consent", scan.third_party_requests.len().to_string()),
            ("Requests on first load", scan.total_requests.to_string()),
        ],
    );
    if !scan.third_party_requests.is_empty() {
        list(out, scan.third_party_requests.iter().map(|r| r.url.clone()));
    }
}

fn render_a11y(out: &mut String, report: &A11yReport) {
    key_values(
        out,
        &[
            ("Issues", report.total.to_string()),
            ("Errors", report.severities.error.to_string()),
            ("Warnings", report.severities.warning.to_string()),
            ("Notices", report.severities.notice.to_string()),
        ],
    );
    if report.issues.is_empty() {
        return;
    }
    out.push_str("<table>\n<tr><th>Check</th><th>Message</th><th>Element</th></tr>\n");
    for issue in report.issues.iter().take(MAX_A11Y_ISSUES) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><code>{}</code></td></tr>\n",
            escape_html(&issue.code),
            escape_html(&issue.message),
            escape_html(&issue.selector)
        ));
    }
    out.push_str("</table>\n");
    if report.issues.len() > MAX_A11Y_ISSUES {
        out.push_str(&format!(
            "<p class=\"muted\">and {} more</p>\n",
            report.issues.len() - MAX_A11Y_ISSUES
        ));
    }
}

fn render_seo(out: &mut String, audit: &SeoAudit) {
    let s = &audit.summary;
    key_values(
        out,
        &[
            ("Pages analysed", s.pages_analysed.to_string()),
            ("Health score", format!("{}/10", s.health_score)),
            ("Weak titles", s.weak_titles.to_string()),
            ("Missing meta descriptions", s.missing_meta.to_string()),
            ("Short meta descriptions", s.short_meta.to_string()),
            ("Long meta descriptions", s.long_meta.to_string()),
            ("Pages without exactly one h1", s.h1_not_single.to_string()),
        ],
    );
    if !s.broken_links.is_empty() {
        out.push_str("<h3>Broken links</h3>\n");
        list(out, s.broken_links.iter().cloned());
    }
    if !s.duplicate_titles.is_empty() {
        out.push_str("<h3>Duplicate titles</h3>\n");
        list(out, s.duplicate_titles.iter().cloned());
    }
}

fn render_structured_data(out: &mut String, data: &StructuredData) {
    if !data.found {
        out.push_str("<p>No JSON-LD found.</p>\n");
        return;
    }
    key_values(out, &[("Types", escape_html(&data.types.join(", ")))]);
}

fn render_uptime(out: &mut String, status: &UptimeStatus) {
    let text = |v: &Option<String>| escape_html(v.as_deref().unwrap_or("n/a"));
    key_values(
        out,
        &[
            ("Monitor", text(&status.name)),
            ("Status", text(&status.status)),
            ("Last check", text(&status.last_check_at)),
            ("Last incident", text(&status.last_incident_at)),
        ],
    );
}

fn render_search_trend(out: &mut String, trend: &SearchTrend) {
    let direction = match trend.trend {
        Trend::Up => "up",
        Trend::Down => "down",
        Trend::Flat => "flat",
    };
    key_values(
        out,
        &[
            ("Property", escape_html(&trend.site_url)),
            ("Trend", direction.to_string()),
            ("Clicks", format!("{:.0}", trend.totals.clicks)),
            ("Impressions", format!("{:.0}", trend.totals.impressions)),
            ("Average CTR", format!("{:.1}%", trend.totals.avg_ctr * 100.0)),
            ("Days", trend.period_days.to_string()),
        ],
    );
}

fn render_backlog(out: &mut String, backlog: &[BacklogItem]) {
    out.push_str("<section>\n<h2>Backlog</h2>\n");
    if backlog.is_empty() {
        out.push_str("<p>Nothing to fix.</p>\n</section>\n");
        return;
    }
    out.push_str("<table class=\"backlog\">\n<tr><th>Priority</th><th>Chapter</th><th>Item</th><th>How</th><th>Owner</th></tr>\n");
    for item in backlog {
        out.push_str(&format!(
            "<tr><td class=\"prio {prio_class}\">{prio}</td><td>{chapter}</td>\
             <td><strong>{title}</strong><br>{why}<br><em>{impact}</em></td><td>{how}</td><td>{owner}</td></tr>\n",
            prio_class = item.priority.to_string().to_lowercase(),
            prio = item.priority,
            chapter = item.chapter,
            title = escape_html(&item.title),
            why = escape_html(&item.why),
            impact = escape_html(&item.impact),
            how = escape_html(&item.how),
            owner = escape_html(&item.owner),
        ));
    }
    out.push_str("</table>\n</section>\n");
}

fn render_notes(out: &mut String, notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    out.push_str("<section>\n<h2>Notes</h2>\n");
    list(out, notes.iter().cloned());
    out.push_str("</section>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditData;
    use crate::config::Thresholds;
    use serde_json::json;

    fn report(value: serde_json::Value) -> AuditReport {
        let raw: AuditData = serde_json::from_value(value).unwrap();
        AuditReport::build(raw, &Thresholds::default())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_renders_every_section() {
        let html = render_html(
            &report(json!({
                "site": { "url": "https://jansen.nl", "name": "Bakkerij Jansen" },
                "auditDate": "2026-10-18T09:00:00+02:00",
                "headers": { "missing": ["content-security-policy"], "ipv6": true,
                             "present": { "x-frame-options": "SAMEORIGIN" } },
                "uptime": { "error": "Missing BETTERUPTIME_API_TOKEN" },
                "notes": ["Checked with the owner"]
            })),
            "body { color: #222; }",
        );

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>\nbody { color: #222; }\n</style>"));
        assert!(html.contains("<h1>Bakkerij Jansen</h1>"));
        assert!(html.contains("2026-10-18T09:00:00+02:00"));
        for title in ["Performance", "Security headers", "Cookies and consent", "Accessibility", "SEO crawl",
                      "Structured data", "Uptime", "Search trend", "Backlog", "Notes"] {
            assert!(html.contains(&format!("<h2>{}</h2>", title)), "missing section {}", title);
        }
        assert!(html.contains("Not available: Missing BETTERUPTIME_API_TOKEN"));
        assert!(html.contains("<td class=\"ok\">SAMEORIGIN</td>"));
        assert!(html.contains("Add a Content-Security-Policy (CSP) header"));
        assert!(html.contains("Checked with the owner"));
    }

    #[test]
    fn test_collected_values_are_escaped() {
        let html = render_html(
            &report(json!({
                "site": { "url": "https://jansen.nl", "name": "<script>alert(1)</script>" },
                "seo": { "seedUrl": "https://jansen.nl", "findings": [], "summary": {
                    "pagesAnalysed": 2, "weakTitles": 0, "missingMeta": 0, "shortMeta": 0, "longMeta": 0,
                    "h1NotSingle": 0, "duplicateTitles": ["<b>home</b>"], "brokenLinks": [], "healthScore": 10 } }
            })),
            DEFAULT_CSS,
        );
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<li>&lt;b&gt;home&lt;/b&gt;</li>"));
    }

    #[test]
    fn test_score_cards_carry_colors() {
        let html = render_html(&report(json!({ "site": { "url": "https://jansen.nl" } })), "");
        // No data: technical 0 red, usability neutral 7 orange
        assert!(html.contains("<div class=\"card red\"><span class=\"label\">Technical</span>"));
        assert!(html.contains("<div class=\"card orange\"><span class=\"label\">Usability</span>"));
        // Falls back to the URL when there is no name
        assert!(html.contains("<h1>https://jansen.nl</h1>"));
    }

    #[test]
    fn test_css_cannot_break_out_of_style() {
        let html = render_html(&report(json!({})), "a{}</style><script>x</script>");
        assert!(!html.contains("</style><script>"));
    }
}
