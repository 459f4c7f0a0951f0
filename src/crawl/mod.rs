// src/crawl/mod.rs
// =============================================================================
// This module handles the SEO crawl of a website.
//
// Features:
// - Breadth-first crawling starting from a URL
// - Same-origin restriction (doesn't crawl external sites)
// - Page budget (max_pages) and per-page link probe budget
// - Title / meta description / <h1> extraction per page
// - Duplicate titles, broken links and a 0-10 health score
//
// Submodules:
// - links: resolve href values into absolute URLs
// - page: pull the SEO signals out of one HTML document
// - queue: the crawl loop itself
// - health: the health score penalty table
// =============================================================================

mod health;
mod links;
mod page;
mod queue;

pub use page::site_name;
pub use queue::{crawl_site, CrawlOptions, CrawlResult, PageRecord};
