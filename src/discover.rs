//! Home-page exploration: find links that probably lead to driver listings

use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::info;

use crate::extract::text::element_text;
use crate::extract::PageContext;

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static NAV_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("nav a[href], header a[href], menu a[href]").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordLink {
    pub text: String,
    pub href: String,
    pub keyword_matched: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Exploration {
    pub title: Option<String>,
    pub navigation: Vec<NavLink>,
    pub links: Vec<KeywordLink>,
}

impl Exploration {
    /// Absolute URLs of keyword links, in page order
    pub fn discover_pages(&self) -> Vec<String> {
        self.links.iter().map(|link| link.href.clone()).collect()
    }
}

/// Summarize a home page: its title, its navigation links, and every link
/// whose text or href mentions one of `keywords` (case-insensitive).
///
/// Keyword links are resolved against the base origin and listed once.
pub fn explore(doc: &Html, ctx: &PageContext, keywords: &[String]) -> Exploration {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let title = doc.select(&TITLE_SEL).next().map(element_text);

    let navigation = doc
        .select(&NAV_LINK_SEL)
        .filter_map(|a| {
            let text = element_text(a);
            let href = a.value().attr("href")?;
            (!text.is_empty()).then(|| NavLink {
                text,
                href: href.to_string(),
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&LINK_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let text = element_text(a);
        let text_lower = text.to_lowercase();
        let href_lower = href.to_lowercase();
        let Some(keyword) = keywords
            .iter()
            .find(|k| text_lower.contains(k.as_str()) || href_lower.contains(k.as_str()))
        else {
            continue;
        };

        let full_url = ctx.resolve(href);
        if seen.insert(full_url.clone()) {
            info!(text = %text, url = %full_url, "Found candidate page");
            links.push(KeywordLink {
                text,
                href: full_url,
                keyword_matched: keyword.clone(),
            });
        }
    }

    Exploration {
        title,
        navigation,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
        <html><head><title> Loudspeaker Database </title></head><body>
        <nav><a href="/">Home</a><a href="/Subwoofers">Subwoofers</a><a href="/x"> </a></nav>
        <a href="/Subwoofers">All subwoofers</a>
        <a href="/woofers/12">12 inch</a>
        <a href="https://shop.example/bass-drivers">Shop</a>
        <a href="/about">About</a>
        </body></html>"#;

    fn ctx() -> PageContext {
        PageContext::from_base_url("https://loudspeakerdatabase.com").unwrap()
    }

    #[test]
    fn test_explore_home_page() {
        let doc = Html::parse_document(HOME);
        let keywords = vec!["subwoofer".to_string(), "woofer".to_string(), "bass".to_string()];
        let exploration = explore(&doc, &ctx(), &keywords);

        assert_eq!(exploration.title.as_deref(), Some("Loudspeaker Database"));
        assert_eq!(exploration.navigation.len(), 2);
        assert_eq!(exploration.navigation[1].href, "/Subwoofers");

        assert_eq!(
            exploration.discover_pages(),
            vec![
                "https://loudspeakerdatabase.com/Subwoofers",
                "https://loudspeakerdatabase.com/woofers/12",
                "https://shop.example/bass-drivers",
            ]
        );
        assert_eq!(exploration.links[1].keyword_matched, "woofer");
    }

    #[test]
    fn test_explore_without_matches() {
        let doc = Html::parse_document("<a href=\"/about\">About</a>");
        let exploration = explore(&doc, &ctx(), &["subwoofer".to_string()]);
        assert!(exploration.title.is_none());
        assert!(exploration.links.is_empty());
    }
}
