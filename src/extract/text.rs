use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Collapse every whitespace run to one space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_space && !cleaned.is_empty() {
                cleaned.push(' ');
                prev_was_space = true;
            }
        } else {
            cleaned.push(c);
            prev_was_space = false;
        }
    }
    cleaned.trim_end().to_string()
}

/// Text content of an element, nodes concatenated as-is
pub fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text content with a space between every text node, for whole containers
pub fn spaced_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Cut to at most `max` characters
pub fn truncate_chars(text: String, max: Option<usize>) -> String {
    match max {
        Some(max) if text.chars().count() > max => text.chars().take(max).collect(),
        _ => text,
    }
}

/// The element's own href if it is a link, else the first link inside it
pub fn link_href<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    if el.value().name() == "a" {
        if let Some(href) = el.value().attr("href") {
            return Some(href);
        }
    }
    el.select(&LINK_SEL).next().and_then(|a| a.value().attr("href"))
}

/// Absolute hrefs pass through; relative ones are joined to `base` when possible
pub fn resolve_href(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }
    match base.map(|b| b.join(href)) {
        Some(Ok(joined)) => joined.to_string(),
        _ => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Alpha \n\t 10\"  "), "Alpha 10\"");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_element_and_spaced_text() {
        let doc = Html::parse_fragment("<div><b>Alpha</b>10 <span>Acme</span></div>");
        let sel = Selector::parse("div").unwrap();
        let div = doc.select(&sel).next().unwrap();
        assert_eq!(element_text(div), "Alpha10 Acme");
        assert_eq!(spaced_text(div), "Alpha 10 Acme");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("épuisé".to_string(), Some(3)), "épu");
        assert_eq!(truncate_chars("short".to_string(), Some(10)), "short");
        assert_eq!(truncate_chars("unbounded".to_string(), None), "unbounded");
    }

    #[test]
    fn test_resolve_href() {
        let base = Url::parse("https://loudspeakerdatabase.com").unwrap();
        assert_eq!(
            resolve_href(Some(&base), "/Acme/A10"),
            "https://loudspeakerdatabase.com/Acme/A10"
        );
        assert_eq!(
            resolve_href(Some(&base), "https://other.example/x"),
            "https://other.example/x"
        );
        assert_eq!(resolve_href(None, " /Acme/A10 "), "/Acme/A10");
    }
}
