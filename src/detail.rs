//! Detail-page enrichment: spec tables and availability hints for one driver

use scraper::{ElementRef, Html, Node, Selector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::extract::text::{collapse_whitespace, element_text};
use crate::fetch::DocumentSource;
use crate::types::{Record, NAME, URL};

static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

pub const AVAILABILITY_INFO: &str = "availability_info";

/// Read a detail page into a record: `url`, `name` from the first
/// `h1`/`h2`, every two-cell table row as `label -> value`, and the first
/// text mentioning an availability keyword as `availability_info`.
pub fn parse_detail_page(doc: &Html, url: &str, availability_keywords: &[String]) -> Record {
    let mut details = Record::new();
    details.insert(URL, url);

    if let Some(heading) = doc.select(&HEADING_SEL).next() {
        let name = element_text(heading);
        if !name.is_empty() {
            details.insert(NAME, name);
        }
    }

    for row in doc.select(&ROW_SEL) {
        let mut cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"));
        if let (Some(label), Some(value)) = (cells.next(), cells.next()) {
            let label = element_text(label);
            if !label.is_empty() {
                details.insert(label, element_text(value));
            }
        }
    }

    if let Some(info) = find_availability_text(doc, availability_keywords) {
        details.insert(AVAILABILITY_INFO, info);
    }

    details
}

/// Keywords are tried in order; the first text node containing the keyword wins
fn find_availability_text(doc: &Html, keywords: &[String]) -> Option<String> {
    keywords.iter().find_map(|keyword| {
        let keyword = keyword.to_lowercase();
        doc.tree.values().find_map(|node| match node {
            Node::Text(text) if text.to_lowercase().contains(&keyword) => {
                Some(collapse_whitespace(text))
            }
            _ => None,
        })
    })
}

/// Fetches detail pages for records that link to one.
///
/// Each link is fetched at most once per enricher; later records with the
/// same link reuse the parsed page, failures included.
pub struct DetailEnricher<'a> {
    source: &'a dyn DocumentSource,
    availability_keywords: &'a [String],
    delay: Duration,
    visited: RefCell<HashMap<String, Option<Record>>>,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        availability_keywords: &'a [String],
        delay: Duration,
    ) -> Self {
        Self {
            source,
            availability_keywords,
            delay,
            visited: RefCell::new(HashMap::new()),
        }
    }

    /// Merge detail-page fields into each record that has a link.
    /// Records whose page cannot be fetched are left as they were.
    pub fn enrich(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .map(|mut record| {
                let Some(link) = record.detail_link().map(str::to_string) else {
                    return record;
                };
                if let Some(details) = self.details_for(&link, record.name()) {
                    record.merge(details);
                }
                record
            })
            .collect()
    }

    fn details_for(&self, link: &str, name: Option<&str>) -> Option<Record> {
        if let Some(cached) = self.visited.borrow().get(link) {
            debug!(url = %link, "Detail page already visited");
            return cached.clone();
        }

        if !self.visited.borrow().is_empty() && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        info!(name = name.unwrap_or("Unknown"), url = %link, "Fetching details");
        let details = match self.source.fetch(link) {
            Some(doc) => {
                let details = parse_detail_page(&doc, link, self.availability_keywords);
                debug!(fields = details.len(), "Parsed detail page");
                Some(details)
            }
            None => {
                debug!(url = %link, "No detail page");
                None
            }
        };
        self.visited
            .borrow_mut()
            .insert(link.to_string(), details.clone());
        details
    }
}
