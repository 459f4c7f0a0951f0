// src/crawl/queue.rs
// =============================================================================
// This module implements the SEO crawl with a breadth-first approach.
//
// How it works:
// 1. Start with the seed URL in a queue
// 2. Fetch the page HTML (404s and friends become broken-link entries)
// 3. Record title, meta description and <h1> count for the page
// 4. Add same-origin links to the queue (if not visited and not queued)
// 5. Probe a sample of the page's links to find broken ones
// 6. Repeat until the queue is empty or max_pages pages were visited
//
// The crawl never fails: every problem ends up in `broken_links` and the
// crawl moves on to the next queued URL.
//
// Rust concepts:
// - HashSet: To track visited and queued URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// - Streams: For probing links concurrently
// =============================================================================

use super::health::{health_score, HealthInputs};
use super::links::{is_same_origin, resolve_link};
use super::page::analyze_page;
use crate::fetch::{Fetcher, ProbeOutcome};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

// How far the crawl is allowed to go
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum number of URLs to visit
    pub max_pages: usize,
    /// How many links per page get an existence probe
    pub per_page_link_checks: usize,
    /// Pause between page fetches so we do not hammer the server
    pub delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 50,
            per_page_link_checks: 20,
            delay: Duration::from_millis(100),
        }
    }
}

// One successfully crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Final URL after redirects, unique within a crawl
    pub url: String,
    pub title: String,
    pub meta_description_present: bool,
    pub meta_description_length: usize,
    pub h1_count: usize,
}

// Everything the crawl found out about a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub seed_url: String,
    pub crawled_pages: usize,
    /// Pages in visit order
    pub pages: Vec<PageRecord>,
    /// Lowercase titles used by two or more pages
    pub duplicate_titles: BTreeSet<String>,
    /// "<url> → <reason>" entries, first occurrence order
    pub broken_links: Vec<String>,
    pub missing_titles: usize,
    pub missing_metas: usize,
    pub many_h1_issues: usize,
    pub health_score: u8,
}

// Insertion-ordered set of broken links, keyed by (url, reason)
#[derive(Debug, Default)]
struct BrokenLinks {
    entries: Vec<(String, String)>,
    seen: HashSet<(String, String)>,
}

impl BrokenLinks {
    fn add(&mut self, url: &str, reason: impl Into<String>) {
        let entry = (url.to_string(), reason.into());
        if self.seen.insert(entry.clone()) {
            debug!(url = %entry.0, reason = %entry.1, "broken link");
            self.entries.push(entry);
        }
    }

    // A URL we managed to crawl is not broken, whatever a probe said earlier
    fn into_strings(self, recorded: &HashSet<String>) -> Vec<String> {
        self.entries
            .into_iter()
            .filter(|(url, _)| !recorded.contains(url))
            .map(|(url, reason)| format!("{} → {}", url, reason))
            .collect()
    }
}

// Crawls a website starting from a URL
//
// Parameters:
//   fetcher: shared HTTP client
//   seed_url: The URL to start crawling from
//   options: page budget, probe budget and politeness delay
//
// Returns: the CrawlResult, never an error
pub async fn crawl_site(fetcher: &Fetcher, seed_url: &str, options: &CrawlOptions) -> CrawlResult {
    let mut broken = BrokenLinks::default();

    // Parse and validate the starting URL
    let seed = match Url::parse(seed_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => {
            warn!(seed_url, "seed is not an http(s) URL, nothing to crawl");
            broken.add(seed_url, "invalid URL");
            return summarize(seed_url, Vec::new(), broken, &HashSet::new());
        }
    };

    // We'll only crawl pages on this origin (scheme + host + port)
    let origin = seed.origin();

    // Queue of pages to crawl
    // VecDeque allows efficient push/pop from both ends
    let mut queue = VecDeque::from([seed.to_string()]);
    let mut queued: HashSet<String> = queue.iter().cloned().collect();

    // Track visited URLs to avoid crawling the same page twice
    let mut visited: HashSet<String> = HashSet::new();

    // Final URLs we stored a PageRecord for
    let mut recorded: HashSet<String> = HashSet::new();
    let mut pages = Vec::new();

    while visited.len() < options.max_pages {
        let Some(url) = queue.pop_front() else {
            break;
        };
        queued.remove(&url);

        // Skip if already visited
        if !visited.insert(url.clone()) {
            continue;
        }

        info!(url = %url, visited = visited.len(), "crawling page");

        let page = match fetcher.get_page(&url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to fetch page");
                broken.add(&url, e.to_string());
                continue;
            }
        };

        if page.is_error_status() {
            broken.add(&url, format!("HTTP {}", page.status));
            continue;
        }

        // Two URLs can redirect to the same page, record it once
        if !recorded.insert(page.final_url.clone()) {
            debug!(url = %url, final_url = %page.final_url, "page already recorded");
            continue;
        }

        let analysis = analyze_page(&page.body);

        // Relative links resolve against where we actually ended up
        let base = Url::parse(&page.final_url).unwrap_or_else(|_| seed.clone());
        let links: Vec<Url> = analysis
            .hrefs
            .iter()
            .filter_map(|href| resolve_link(&base, href))
            .collect();

        for link in &links {
            if !is_same_origin(&origin, link) {
                continue;
            }
            let link = link.to_string();
            if !visited.contains(&link) && !recorded.contains(&link) && !queued.contains(&link) {
                queued.insert(link.clone());
                queue.push_back(link);
            }
        }

        for (link, reason) in probe_links(fetcher, &links, options.per_page_link_checks).await {
            broken.add(&link, reason);
        }

        pages.push(PageRecord {
            url: page.final_url.clone(),
            title: analysis.title.clone(),
            meta_description_present: analysis.meta_description.is_some(),
            meta_description_length: analysis.meta_description_length(),
            h1_count: analysis.h1_count,
        });

        // Polite crawling: small delay between requests
        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    info!(
        seed_url,
        pages = pages.len(),
        queued_left = queue.len(),
        "crawl finished"
    );

    summarize(seed_url, pages, broken, &recorded)
}

// Probes up to `limit` links at once and returns the broken ones.
//
// All probes of a page run concurrently and we wait for every one of them;
// `buffered` keeps the results in link order so the output is deterministic.
async fn probe_links(fetcher: &Fetcher, links: &[Url], limit: usize) -> Vec<(String, String)> {
    if limit == 0 || links.is_empty() {
        return Vec::new();
    }

    let checks = links.iter().take(limit).map(|link| {
        let url = link.to_string();
        async move {
            let outcome: ProbeOutcome = fetcher.probe(&url).await;
            (url, outcome)
        }
    });

    let outcomes: Vec<(String, ProbeOutcome)> = stream::iter(checks).buffered(limit).collect().await;

    outcomes
        .into_iter()
        .filter_map(|(url, outcome)| outcome.broken_reason().map(|reason| (url, reason)))
        .collect()
}

fn summarize(
    seed_url: &str,
    pages: Vec<PageRecord>,
    broken: BrokenLinks,
    recorded: &HashSet<String>,
) -> CrawlResult {
    let duplicate_titles = duplicate_titles(&pages);
    let broken_links = broken.into_strings(recorded);

    let missing_titles = pages.iter().filter(|p| p.title.is_empty()).count();
    let missing_metas = pages.iter().filter(|p| !p.meta_description_present).count();
    let many_h1_issues = pages.iter().filter(|p| p.h1_count != 1).count();

    let health = health_score(&HealthInputs {
        missing_titles,
        missing_metas,
        broken_links: broken_links.len(),
        duplicate_titles: duplicate_titles.len(),
        many_h1_issues,
    });

    CrawlResult {
        seed_url: seed_url.to_string(),
        crawled_pages: pages.len(),
        pages,
        duplicate_titles,
        broken_links,
        missing_titles,
        missing_metas,
        many_h1_issues,
        health_score: health,
    }
}

// Lowercase titles that appear on more than one page; empty titles do not count
fn duplicate_titles(pages: &[PageRecord]) -> BTreeSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for page in pages {
        *counts.entry(page.title.to_lowercase()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter(|(title, count)| *count > 1 && !title.is_empty())
        .map(|(title, _)| title)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick() -> CrawlOptions {
        CrawlOptions {
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn html_page(title: &str, body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(
            format!("<html><head><title>{title}</title></head><body>{body}</body></html>"),
            "text/html",
        )
    }

    // Answers GET and HEAD for a path
    async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(path(route)).respond_with(response).mount(server).await;
    }

    fn page(url: &str, title: &str, meta: bool, h1_count: usize) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            meta_description_present: meta,
            meta_description_length: if meta { 80 } else { 0 },
            h1_count,
        }
    }

    #[tokio::test]
    async fn test_single_page_without_links() {
        let server = MockServer::start().await;
        serve(&server, "/", html_page("Alleen", "<h1>Hoi</h1>")).await;

        let fetcher = Fetcher::new().unwrap();
        let result = crawl_site(&fetcher, &format!("{}/", server.uri()), &quick()).await;

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.crawled_pages, 1);
        assert!(result.broken_links.is_empty());
        assert!(result.duplicate_titles.is_empty());
        assert_eq!(result.pages[0].title, "Alleen");
        assert_eq!(result.pages[0].h1_count, 1);
    }

    #[tokio::test]
    async fn test_three_page_site_with_shared_titles_and_broken_link() {
        let server = MockServer::start().await;
        serve(&server, "/", html_page("Home", r#"<a href="/b">B</a><a href="/c">C</a>"#)).await;
        serve(&server, "/b", html_page("Home", r#"<a href="/">A</a><a href="/does-not-exist">x</a>"#)).await;
        serve(&server, "/c", html_page("HOME", r#"<a href="/b#top">B</a>"#)).await;

        let fetcher = Fetcher::new().unwrap();
        let seed = format!("{}/", server.uri());
        let result = crawl_site(&fetcher, &seed, &quick()).await;

        // Breadth-first: A, then B and C in link order
        let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec![seed.clone(), format!("{}/b", server.uri()), format!("{}/c", server.uri())]);

        assert_eq!(result.pages.len(), 3);
        assert_eq!(result.duplicate_titles, BTreeSet::from(["home".to_string()]));
        // Found by the probe on B and by crawling it, same entry both times
        assert_eq!(
            result.broken_links,
            vec![format!("{}/does-not-exist → HTTP 404", server.uri())]
        );
        assert_eq!(result.missing_metas, 3);
        assert_eq!(result.many_h1_issues, 3);
        assert_eq!(result.health_score, 10);
    }

    #[tokio::test]
    async fn test_redirect_targets_are_recorded_once() {
        let server = MockServer::start().await;
        serve(&server, "/", html_page("Start", r#"<a href="/a">A</a><a href="/b">B</a>"#)).await;
        serve(&server, "/a", ResponseTemplate::new(301).insert_header("Location", "/c")).await;
        serve(&server, "/b", ResponseTemplate::new(301).insert_header("Location", "/c")).await;
        serve(&server, "/c", html_page("Doel", "")).await;

        let fetcher = Fetcher::new().unwrap();
        let seed = format!("{}/", server.uri());
        let result = crawl_site(&fetcher, &seed, &quick()).await;

        let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec![seed.clone(), format!("{}/c", server.uri())]);
        assert_eq!(result.crawled_pages, 2);
        assert!(result.broken_links.is_empty());
        assert!(result.duplicate_titles.is_empty());
    }

    #[tokio::test]
    async fn test_respects_max_pages() {
        let server = MockServer::start().await;
        let links: String = (1..=10).map(|i| format!(r#"<a href="/p{i}">{i}</a>"#)).collect();
        serve(&server, "/", html_page("Start", &links)).await;
        for i in 1..=10 {
            serve(&server, &format!("/p{i}"), html_page(&format!("Pagina {i}"), "")).await;
        }

        let fetcher = Fetcher::new().unwrap();
        let options = CrawlOptions { max_pages: 4, ..quick() };
        let result = crawl_site(&fetcher, &format!("{}/", server.uri()), &options).await;

        assert_eq!(result.pages.len(), 4);
        let unique: HashSet<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[tokio::test]
    async fn test_external_links_are_probed_but_not_crawled() {
        let site = MockServer::start().await;
        let external = MockServer::start().await;
        serve(&external, "/ok", html_page("Extern", "")).await;
        serve(
            &site,
            "/",
            html_page(
                "Home",
                &format!(r#"<a href="{0}/ok">ok</a><a href="{0}/dead">dead</a>"#, external.uri()),
            ),
        )
        .await;

        let fetcher = Fetcher::new().unwrap();
        let result = crawl_site(&fetcher, &format!("{}/", site.uri()), &quick()).await;

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.broken_links, vec![format!("{}/dead → HTTP 404", external.uri())]);
    }

    #[tokio::test]
    async fn test_link_check_budget_per_page() {
        let site = MockServer::start().await;
        let external = MockServer::start().await;
        // Five dead external links, only the first two get probed
        let links: String = (1..=5)
            .map(|i| format!(r#"<a href="{}/dead{i}">{i}</a>"#, external.uri()))
            .collect();
        serve(&site, "/", html_page("Home", &links)).await;

        let fetcher = Fetcher::new().unwrap();
        let options = CrawlOptions { per_page_link_checks: 2, ..quick() };
        let result = crawl_site(&fetcher, &format!("{}/", site.uri()), &options).await;

        assert_eq!(
            result.broken_links,
            vec![
                format!("{}/dead1 → HTTP 404", external.uri()),
                format!("{}/dead2 → HTTP 404", external.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_broken_seed_is_recorded_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let seed = format!("{}/", server.uri());
        let result = crawl_site(&fetcher, &seed, &quick()).await;

        assert!(result.pages.is_empty());
        assert_eq!(result.broken_links, vec![format!("{seed} → HTTP 500")]);
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let fetcher = Fetcher::new().unwrap();
        let result = crawl_site(&fetcher, "mailto:someone@example.com", &quick()).await;
        assert!(result.pages.is_empty());
        assert_eq!(result.broken_links, vec!["mailto:someone@example.com → invalid URL"]);
        assert_eq!(result.health_score, 10);
    }

    #[tokio::test]
    async fn test_unreachable_seed_is_recorded() {
        let fetcher = Fetcher::new().unwrap();
        let result = crawl_site(&fetcher, "http://127.0.0.1:9/", &quick()).await;
        assert!(result.pages.is_empty());
        assert_eq!(result.broken_links.len(), 1);
        assert!(result.broken_links[0].starts_with("http://127.0.0.1:9/ → "));
    }

    #[test]
    fn test_duplicate_titles_ignore_case_and_empty() {
        let pages = vec![
            page("https://a.nl/1", "Home", true, 1),
            page("https://a.nl/2", "home", true, 1),
            page("https://a.nl/3", "", true, 1),
            page("https://a.nl/4", "", true, 1),
            page("https://a.nl/5", "Contact", true, 1),
        ];
        assert_eq!(duplicate_titles(&pages), BTreeSet::from(["home".to_string()]));
    }

    #[test]
    fn test_h1_counter() {
        let pages = vec![
            page("https://a.nl/1", "Een", true, 0),
            page("https://a.nl/2", "Twee", true, 2),
            page("https://a.nl/3", "Drie", true, 1),
        ];
        let result = summarize("https://a.nl/", pages, BrokenLinks::default(), &HashSet::new());
        assert_eq!(result.many_h1_issues, 2);
    }

    #[test]
    fn test_crawled_pages_are_never_broken() {
        let mut broken = BrokenLinks::default();
        broken.add("https://a.nl/b", "request timed out");
        broken.add("https://a.nl/x", "HTTP 404");
        broken.add("https://a.nl/x", "HTTP 404");

        let recorded = HashSet::from(["https://a.nl/b".to_string()]);
        let pages = vec![page("https://a.nl/b", "B", true, 1)];
        let result = summarize("https://a.nl/", pages, broken, &recorded);

        assert_eq!(result.broken_links, vec!["https://a.nl/x → HTTP 404"]);
    }
}
