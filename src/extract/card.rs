//! Records from repeated container elements (product cards, list items)

use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::text::{element_text, link_href, spaced_text, truncate_chars};
use super::{PageContext, Strategy};
use crate::config::Heuristics;
use crate::types::{Record, FULL_TEXT, NAME, URL};

/// Case-insensitive substring pattern for a class attribute
fn class_pattern(fragment: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", regex::escape(fragment)))
        .map_err(|e| anyhow!("Invalid class pattern '{}': {}", fragment, e))
}

fn container_selector(tags: &[String]) -> Result<Selector> {
    let joined = tags.join(", ");
    Selector::parse(&joined).map_err(|e| anyhow!("Invalid container tags '{}': {:?}", joined, e))
}

fn class_matches(el: &ElementRef, pattern: &Regex) -> bool {
    el.value().attr("class").is_some_and(|class| pattern.is_match(class))
}

/// First title-like element below `container`, in document order
fn find_title<'a>(container: ElementRef<'a>, title_tags: &[String]) -> Option<ElementRef<'a>> {
    container
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| title_tags.iter().any(|tag| tag == el.value().name()))
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim().to_lowercase()).collect()
}

/// Containers whose class matches one of the configured fragments.
///
/// Fragments are tried in priority order and a container is emitted once per
/// fragment it matches; the deduplicator collapses the repeats.
pub struct CardStrategy {
    containers: Selector,
    class_patterns: Vec<(String, Regex)>,
    title_tags: Vec<String>,
    fields: Vec<(String, Regex)>,
    full_text_limit: Option<usize>,
}

impl CardStrategy {
    pub fn new(heuristics: &Heuristics) -> Result<Self> {
        let class_patterns = heuristics
            .container_classes
            .iter()
            .map(|fragment| Ok((fragment.clone(), class_pattern(fragment)?)))
            .collect::<Result<Vec<_>>>()?;
        let fields = heuristics
            .card_fields
            .iter()
            .map(|field| Ok((field.clone(), class_pattern(field)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            containers: container_selector(&heuristics.container_tags)?,
            class_patterns,
            title_tags: lowercase_all(&heuristics.title_tags),
            fields,
            full_text_limit: heuristics.full_text_limit,
        })
    }

    fn parse_card(&self, container: ElementRef, ctx: &PageContext) -> Option<Record> {
        let title = find_title(container, &self.title_tags)?;
        let name = element_text(title);
        if name.is_empty() {
            return None;
        }

        let mut record = Record::new();
        record.insert(NAME, name);
        if let Some(href) = link_href(title) {
            record.insert(URL, ctx.resolve(href));
        }

        for (field, pattern) in &self.fields {
            let found = container
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .find(|el| class_matches(el, pattern));
            if let Some(el) = found {
                let text = element_text(el);
                if !text.is_empty() {
                    record.insert(field.as_str(), text);
                }
            }
        }

        record.insert(
            FULL_TEXT,
            truncate_chars(spaced_text(container), self.full_text_limit),
        );
        Some(record)
    }
}

impl Strategy for CardStrategy {
    fn name(&self) -> &'static str {
        "card"
    }

    fn extract(&self, doc: &Html, ctx: &PageContext) -> Vec<Record> {
        let mut records = Vec::new();
        for (fragment, pattern) in &self.class_patterns {
            let before = records.len();
            records.extend(
                doc.select(&self.containers)
                    .filter(|el| class_matches(el, pattern))
                    .filter_map(|el| self.parse_card(el, ctx)),
            );
            debug!(class = %fragment, cards = records.len() - before, "Matched containers");
        }
        records
    }
}

/// Last-resort pass over the first few generic containers of a page, class
/// names ignored. Titles that are too short or too long are skipped.
pub struct LooseCardStrategy {
    containers: Selector,
    title_tags: Vec<String>,
    limit: usize,
    title_min: usize,
    title_max: usize,
    full_text_limit: Option<usize>,
}

impl LooseCardStrategy {
    pub fn new(heuristics: &Heuristics) -> Result<Self> {
        Ok(Self {
            containers: container_selector(&heuristics.container_tags)?,
            title_tags: lowercase_all(&heuristics.title_tags),
            limit: heuristics.loose_container_limit,
            title_min: heuristics.loose_title_min,
            title_max: heuristics.loose_title_max,
            full_text_limit: heuristics.full_text_limit,
        })
    }
}

impl Strategy for LooseCardStrategy {
    fn name(&self) -> &'static str {
        "loose"
    }

    fn extract(&self, doc: &Html, ctx: &PageContext) -> Vec<Record> {
        doc.select(&self.containers)
            .take(self.limit)
            .filter_map(|container| {
                let title = find_title(container, &self.title_tags)?;
                let name = element_text(title);
                let len = name.chars().count();
                if len <= self.title_min || len >= self.title_max {
                    return None;
                }

                let mut record = Record::new();
                record.insert(NAME, name);
                if let Some(href) = link_href(title) {
                    record.insert(URL, ctx.resolve(href));
                }
                record.insert(
                    FULL_TEXT,
                    truncate_chars(spaced_text(container), self.full_text_limit),
                );
                Some(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <ul>
          <li class="product-card">
            <h3><a href="/Acme/A10">Acme A10</a></h3>
            <span class="Price">199 €</span>
            <span class="brand-name">Acme</span>
            <span class="stock-status">In stock</span>
          </li>
          <li class="product-card">
            <h3>Bolt B12</h3>
            <div class="availability">Discontinued</div>
          </li>
          <li class="product-card"><p>No title in here</p></li>
        </ul>"#;

    fn ctx() -> PageContext {
        PageContext::from_base_url("https://loudspeakerdatabase.com").unwrap()
    }

    fn cards(html: &str) -> Vec<Record> {
        let strategy = CardStrategy::new(&Heuristics::default()).unwrap();
        strategy.extract(&Html::parse_document(html), &ctx())
    }

    #[test]
    fn test_card_fields() {
        let records = cards(LISTING);
        // "product-card" matches both "product" and "card"
        assert_eq!(records.len(), 4);

        let first = &records[0];
        assert_eq!(first.name(), Some("Acme A10"));
        assert_eq!(first.get("url"), Some("https://loudspeakerdatabase.com/Acme/A10"));
        assert_eq!(first.get("price"), Some("199 €"));
        assert_eq!(first.get("brand"), Some("Acme"));
        assert_eq!(first.get("status"), Some("In stock"));
        assert!(first.get("full_text").unwrap().starts_with("Acme A10 199 €"));

        let second = &records[1];
        assert_eq!(second.name(), Some("Bolt B12"));
        assert_eq!(second.get("url"), None);
        assert_eq!(second.get("availability"), Some("Discontinued"));
    }

    #[test]
    fn test_container_reemitted_per_matching_pattern() {
        let records = cards(LISTING);
        assert_eq!(records[0], records[2]);
        assert_eq!(records[1], records[3]);
    }

    #[test]
    fn test_untitled_and_unmatched_containers_are_discarded() {
        assert!(cards("<div class=\"product\"><p>just text</p></div>").is_empty());
        assert!(cards("<div class=\"banner\"><h2>Sale</h2></div>").is_empty());
        assert!(cards("<span class=\"product\"><h2>Not a container tag</h2></span>").is_empty());
    }

    #[test]
    fn test_full_text_is_truncated() {
        let long = "x".repeat(500);
        let html = format!("<article class=\"speaker\"><h2>Alpha</h2><p>{}</p></article>", long);
        let records = cards(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("full_text").unwrap().chars().count(), 200);
    }

    #[test]
    fn test_loose_cards_filter_title_length() {
        let strategy = LooseCardStrategy::new(&Heuristics::default()).unwrap();
        let doc = Html::parse_document(
            "<div><h2>A10</h2></div>\
             <div><a href=\"/Acme/A12\">Acme A12</a> 12 inch</div>",
        );
        let records = strategy.extract(&doc, &ctx());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), Some("Acme A12"));
        assert_eq!(records[0].get("url"), Some("https://loudspeakerdatabase.com/Acme/A12"));
        assert_eq!(records[0].get("full_text"), Some("Acme A12 12 inch"));
    }
}
