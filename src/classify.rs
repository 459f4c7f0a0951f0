// src/classify.rs
// =============================================================================
// Marketing heuristics on top of a finished crawl.
//
// Per page we flag:
// - weakTitle: empty, or a generic title like "Home", "Contact", "Over ons"
//   or anything starting with "Welkom"
// - metaTooShort: no meta description, or shorter than 50 characters
// - metaTooLong: meta description longer than 160 characters
//
// This is a pure function: no I/O, same input gives the same output.
// =============================================================================

use crate::crawl::{CrawlResult, PageRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const MIN_META_LENGTH: usize = 50;
pub const MAX_META_LENGTH: usize = 160;

static WEAK_TITLES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)^home$", r"(?i)^welkom", r"(?i)^over(\s+ons)?$", r"(?i)^contact$"]
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")))
        .collect()
});

// A crawled page plus the heuristics that fired for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFinding {
    pub url: String,
    pub title: String,
    pub weak_title: bool,
    pub meta_description_present: bool,
    pub meta_too_short: bool,
    pub meta_too_long: bool,
    pub h1_count: usize,
}

// Site-wide counts, plus what the crawl itself concluded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSummary {
    pub pages_analysed: usize,
    pub weak_titles: usize,
    pub missing_meta: usize,
    pub short_meta: usize,
    pub long_meta: usize,
    pub h1_not_single: usize,
    pub duplicate_titles: BTreeSet<String>,
    pub broken_links: Vec<String>,
    pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAudit {
    pub seed_url: String,
    pub findings: Vec<PageFinding>,
    pub summary: SeoSummary,
}

pub fn is_weak_title(title: &str) -> bool {
    let title = title.trim();
    title.is_empty() || WEAK_TITLES.iter().any(|rx| rx.is_match(title))
}

fn classify_page(page: &PageRecord) -> PageFinding {
    PageFinding {
        url: page.url.clone(),
        title: page.title.clone(),
        weak_title: is_weak_title(&page.title),
        meta_description_present: page.meta_description_present,
        meta_too_short: !page.meta_description_present
            || page.meta_description_length < MIN_META_LENGTH,
        meta_too_long: page.meta_description_length > MAX_META_LENGTH,
        h1_count: page.h1_count,
    }
}

pub fn classify(crawl: &CrawlResult) -> SeoAudit {
    let findings: Vec<PageFinding> = crawl.pages.iter().map(classify_page).collect();

    let count = |flag: fn(&PageFinding) -> bool| findings.iter().filter(|f| flag(f)).count();
    let summary = SeoSummary {
        pages_analysed: findings.len(),
        weak_titles: count(|f| f.weak_title),
        missing_meta: count(|f| !f.meta_description_present),
        short_meta: count(|f| f.meta_too_short),
        long_meta: count(|f| f.meta_too_long),
        h1_not_single: count(|f| f.h1_count != 1),
        duplicate_titles: crawl.duplicate_titles.clone(),
        broken_links: crawl.broken_links.clone(),
        health_score: crawl.health_score,
    };

    SeoAudit {
        seed_url: crawl.seed_url.clone(),
        findings,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, meta_length: Option<usize>, h1_count: usize) -> PageRecord {
        PageRecord {
            url: format!("https://jansen.nl/{}", title.to_lowercase().replace(' ', "-")),
            title: title.to_string(),
            meta_description_present: meta_length.is_some(),
            meta_description_length: meta_length.unwrap_or(0),
            h1_count,
        }
    }

    fn crawl(pages: Vec<PageRecord>) -> CrawlResult {
        CrawlResult {
            seed_url: "https://jansen.nl/".to_string(),
            crawled_pages: pages.len(),
            pages,
            duplicate_titles: BTreeSet::from(["home".to_string()]),
            broken_links: vec!["https://jansen.nl/x → HTTP 404".to_string()],
            missing_titles: 0,
            missing_metas: 0,
            many_h1_issues: 0,
            health_score: 9,
        }
    }

    #[test]
    fn test_weak_titles() {
        assert!(is_weak_title(""));
        assert!(is_weak_title("  "));
        assert!(is_weak_title("Home"));
        assert!(is_weak_title("HOME "));
        assert!(is_weak_title("Contact"));
        assert!(is_weak_title("over"));
        assert!(is_weak_title("Over ons"));
        assert!(is_weak_title("Welkom bij Bakkerij Jansen"));

        assert!(!is_weak_title("Home | Bakkerij Jansen"));
        assert!(!is_weak_title("Contact opnemen met Jansen"));
        assert!(!is_weak_title("Over ons team"));
        assert!(!is_weak_title("Vers brood in Utrecht"));
    }

    #[test]
    fn test_meta_length_flags() {
        let audit = classify(&crawl(vec![
            page("Geen meta", None, 1),
            page("Te kort", Some(49), 1),
            page("Precies goed", Some(50), 1),
            page("Maximaal", Some(160), 1),
            page("Te lang", Some(161), 1),
        ]));

        let short: Vec<bool> = audit.findings.iter().map(|f| f.meta_too_short).collect();
        let long: Vec<bool> = audit.findings.iter().map(|f| f.meta_too_long).collect();
        assert_eq!(short, vec![true, true, false, false, false]);
        assert_eq!(long, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_summary_counts_and_pass_through() {
        let audit = classify(&crawl(vec![
            page("Home", Some(80), 1),
            page("Brood en banket", None, 0),
            page("Welkom", Some(20), 2),
        ]));

        let summary = &audit.summary;
        assert_eq!(summary.pages_analysed, 3);
        assert_eq!(summary.weak_titles, 2);
        assert_eq!(summary.missing_meta, 1);
        assert_eq!(summary.short_meta, 2);
        assert_eq!(summary.long_meta, 0);
        assert_eq!(summary.h1_not_single, 2);
        assert_eq!(summary.duplicate_titles, BTreeSet::from(["home".to_string()]));
        assert_eq!(summary.broken_links.len(), 1);
        assert_eq!(summary.health_score, 9);
        assert_eq!(audit.seed_url, "https://jansen.nl/");
    }

    #[test]
    fn test_is_deterministic() {
        let input = crawl(vec![page("Home", Some(80), 1), page("Contact", None, 1)]);
        assert_eq!(classify(&input), classify(&input));
    }
}
