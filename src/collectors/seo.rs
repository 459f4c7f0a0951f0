// src/collectors/seo.rs
// =============================================================================
// The SEO collector: crawl the site, then run the marketing heuristics.
//
// The crawl itself never fails, but a crawl that could not load a single
// page says nothing about the site's SEO. That case becomes an error record
// so scoring does not mistake "nothing crawled" for "nothing wrong".
// =============================================================================

use crate::classify::{classify, SeoAudit};
use crate::crawl::{crawl_site, CrawlOptions};
use crate::fetch::Fetcher;
use anyhow::{anyhow, Result};

pub async fn collect(fetcher: &Fetcher, url: &str, options: &CrawlOptions) -> Result<SeoAudit> {
    let crawl = crawl_site(fetcher, url, options).await;

    if crawl.pages.is_empty() {
        return Err(anyhow!(
            "no pages could be crawled ({})",
            crawl.broken_links.join(", ")
        ));
    }

    Ok(classify(&crawl))
}
