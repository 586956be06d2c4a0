//! Multi-page driver: fetch each page, extract independently, fold, dedupe once

use std::thread;
use std::time::Duration;
use tracing::info;

use crate::availability::Classifier;
use crate::dedup::dedupe;
use crate::detail::DetailEnricher;
use crate::extract::{Extractor, PageContext};
use crate::fetch::DocumentSource;
use crate::types::Record;

/// Records found on one page
#[derive(Debug, Clone)]
pub struct PageResult {
    pub url: String,
    pub records: Vec<Record>,
}

/// Visit `urls` in order, pausing `page_delay` between pages.
///
/// A page that cannot be fetched contributes an empty result.
pub fn crawl(
    source: &dyn DocumentSource,
    extractor: &Extractor,
    ctx: &PageContext,
    urls: &[String],
    page_delay: Duration,
    enricher: Option<&DetailEnricher>,
) -> Vec<PageResult> {
    let mut pages = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !page_delay.is_zero() {
            thread::sleep(page_delay);
        }
        println!("[{}/{}] Scraping {}...", i + 1, urls.len(), url);

        let doc = source.fetch(url);
        let mut records = extractor.extract(doc.as_ref(), ctx);
        if let Some(enricher) = enricher {
            records = enricher.enrich(records);
        }
        info!(url = %url, records = records.len(), "Page done");

        pages.push(PageResult {
            url: url.clone(),
            records,
        });
    }
    pages
}

/// Concatenate page results in order, then deduplicate
pub fn merge_pages(pages: Vec<PageResult>) -> Vec<Record> {
    let all = pages.into_iter().fold(Vec::new(), |mut acc, page| {
        acc.extend(page.records);
        acc
    });
    dedupe(all)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub pages_visited: usize,
    pub pages_with_data: usize,
    pub extracted: usize,
    pub unique: usize,
    pub available: usize,
}

impl Report {
    pub fn print(&self) {
        println!(
            "Visited {} pages ({} with data): {} records extracted, {} unique, {} still available.",
            self.pages_visited, self.pages_with_data, self.extracted, self.unique, self.available,
        );
    }
}

/// Merged records plus the available subset
pub struct Outcome {
    pub all: Vec<Record>,
    pub available: Vec<Record>,
    pub report: Report,
}

pub fn summarize(pages: Vec<PageResult>, classifier: &Classifier) -> Outcome {
    let pages_visited = pages.len();
    let pages_with_data = pages.iter().filter(|p| !p.records.is_empty()).count();
    let extracted = pages.iter().map(|p| p.records.len()).sum();

    let all = merge_pages(pages);
    let available = classifier.filter_available(all.clone());

    let report = Report {
        pages_visited,
        pages_with_data,
        extracted,
        unique: all.len(),
        available: available.len(),
    };
    Outcome {
        all,
        available,
        report,
    }
}

/// Unique URLs in first-seen order
pub fn unique_urls(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Heuristics;
    use crate::extract::Policy;
    use crate::fetch::StaticSource;

    const TABLE_PAGE: &str = "<table><tr><th>Name</th><th>Status</th></tr>\
        <tr><td>Alpha</td><td>In stock</td></tr>\
        <tr><td>Beta</td><td>Discontinued</td></tr></table>";

    const CARD_PAGE: &str = r#"
        <div class="product"><h2><a href="/Acme/A10">Acme A10</a></h2><span class="price">99</span></div>
        <div class="product"><h2><a href="/Acme/A12">Acme A12</a></h2><span class="status">Obsolete</span></div>"#;

    const CARD_PAGE_AGAIN: &str = r#"
        <div class="product"><h2><a href="/Acme/A10">Acme A10</a></h2><span class="price">120</span></div>"#;

    fn setup() -> (StaticSource, Extractor, PageContext, Classifier) {
        let source = StaticSource::new()
            .with_page("https://x/table", TABLE_PAGE)
            .with_page("https://x/cards", CARD_PAGE)
            .with_page("https://x/cards2", CARD_PAGE_AGAIN);
        let heuristics = Heuristics::default();
        let extractor = Extractor::standard(&heuristics, Policy::Fallback).unwrap();
        let ctx = PageContext::from_base_url("https://loudspeakerdatabase.com").unwrap();
        let classifier = Classifier::new(&heuristics.discontinued_keywords);
        (source, extractor, ctx, classifier)
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_page_end_to_end() {
        let (source, extractor, ctx, classifier) = setup();
        let pages = crawl(&source, &extractor, &ctx, &urls(&["https://x/table"]), Duration::ZERO, None);
        let outcome = summarize(pages, &classifier);

        assert_eq!(outcome.all.len(), 2);
        assert_eq!(outcome.available.len(), 1);
        assert_eq!(outcome.available[0].get("Name"), Some("Alpha"));
    }

    #[test]
    fn test_pages_fold_then_dedupe() {
        let (source, extractor, ctx, classifier) = setup();
        let pages = crawl(
            &source,
            &extractor,
            &ctx,
            &urls(&["https://x/cards", "https://x/missing", "https://x/cards2"]),
            Duration::ZERO,
            None,
        );
        assert_eq!(pages.len(), 3);
        assert!(pages[1].records.is_empty());

        let outcome = summarize(pages, &classifier);
        assert_eq!(
            outcome.report,
            Report {
                pages_visited: 3,
                pages_with_data: 2,
                extracted: 3,
                unique: 2,
                available: 1,
            }
        );
        // first-seen A10 keeps its price
        assert_eq!(outcome.available[0].get("price"), Some("99"));
    }

    #[test]
    fn test_details_fetched_once_per_link() {
        let detail_url = "https://loudspeakerdatabase.com/Acme/A10";
        let listing = r#"<div class="product-item speaker-card"><h2><a href="/Acme/A10">Acme A10</a></h2></div>"#;
        let source = StaticSource::new()
            .with_page("https://x/list", listing)
            .with_page("https://x/list2", CARD_PAGE_AGAIN)
            .with_page(detail_url, "<h1>Acme A10</h1><table><tr><th>Fs</th><td>28 Hz</td></tr></table>");
        let (_, extractor, ctx, classifier) = setup();
        let keywords = Heuristics::default().availability_keywords;
        let enricher = DetailEnricher::new(&source, &keywords, Duration::ZERO);

        let pages = crawl(
            &source,
            &extractor,
            &ctx,
            &urls(&["https://x/list", "https://x/list2"]),
            Duration::ZERO,
            Some(&enricher),
        );
        // one container, four matching class fragments
        assert_eq!(pages[0].records.len(), 4);
        assert!(pages
            .iter()
            .flat_map(|p| &p.records)
            .all(|r| r.get("Fs") == Some("28 Hz")));

        assert_eq!(source.requests_for("https://x/list"), 1);
        assert_eq!(source.requests_for("https://x/list2"), 1);
        assert_eq!(source.requests_for(detail_url), 1);

        let outcome = summarize(pages, &classifier);
        assert_eq!(outcome.all.len(), 1);
    }

    #[test]
    fn test_unique_urls() {
        let deduped = unique_urls(urls(&["a", "b", "a", "c", "b"]));
        assert_eq!(deduped, urls(&["a", "b", "c"]));
    }
}
