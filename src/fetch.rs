//! Document sources: turn a URL into a parsed page, or nothing

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::Html;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::config::SiteConfig;

/// Anything that can hand out parsed pages.
///
/// Failures (network, status, timeout) are the source's business: callers
/// only ever see `None`.
pub trait DocumentSource {
    fn fetch(&self, url: &str) -> Option<Html>;
}

/// Blocking HTTP source with an optional on-disk response cache
pub struct HttpSource {
    client: reqwest::blocking::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpSource {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&site.accept_language)
                .context("Invalid accept_language header value")?,
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(site.user_agent.as_str())
            .default_headers(headers)
            .timeout(site.timeout())
            .build()?;
        Ok(Self {
            client,
            cache_dir: None,
        })
    }

    pub fn with_cache(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// `<cache>/<host>/<path>.html`, query dropped. Dot segments are
    /// resolved by the URL parser and never reach the file system; URLs that
    /// do not parse are not cached.
    fn url_to_cache_path(&self, url: &str) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str().filter(|h| !matches!(*h, "" | "." | ".."))?;
        let segments: Vec<&str> = parsed
            .path_segments()?
            .filter(|seg| !matches!(*seg, "" | "." | ".."))
            .collect();

        let Some((last, dirs)) = segments.split_last() else {
            return Some(cache_dir.join(format!("{}.html", host)));
        };
        let mut path = cache_dir.join(host);
        path.extend(dirs);
        path.push(format!("{}.html", last));
        Some(path)
    }

    fn write_cache(path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        let cache_path = self.url_to_cache_path(url);

        if let Some(path) = cache_path.as_ref().filter(|p| p.exists()) {
            debug!(url = %url, path = %path.display(), "Cache hit");
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read cache: {:?}", path));
        }

        let text = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status: {}", url))?
            .text()
            .with_context(|| format!("Failed to read response: {}", url))?;

        self.remember(url, &text);
        Ok(text)
    }

    /// Store a downloaded page. A cache that cannot be written only costs a
    /// warning; the page itself is still used.
    fn remember(&self, url: &str, text: &str) {
        let Some(path) = self.url_to_cache_path(url) else {
            return;
        };
        if let Err(e) = Self::write_cache(&path, text) {
            warn!(path = %path.display(), "Cache write failed: {:#}", e);
        }
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, url: &str) -> Option<Html> {
        match self.fetch_text(url) {
            Ok(text) => Some(Html::parse_document(&text)),
            Err(e) => {
                warn!(url = %url, "Retrieval failed: {:#}", e);
                None
            }
        }
    }
}

/// Canned pages keyed by URL; anything else is a retrieval failure.
/// Every request is recorded, served or not.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

#[cfg(test)]
impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|r| *r == url).count()
    }
}

#[cfg(test)]
impl DocumentSource for StaticSource {
    fn fetch(&self, url: &str) -> Option<Html> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages.get(url).map(|html| Html::parse_document(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_layout() {
        let source = HttpSource::new(&SiteConfig::default())
            .unwrap()
            .with_cache("cache");
        assert_eq!(
            source.url_to_cache_path("https://loudspeakerdatabase.com/subwoofers?page=2"),
            Some(PathBuf::from("cache/loudspeakerdatabase.com/subwoofers.html"))
        );
        assert_eq!(
            source.url_to_cache_path("https://loudspeakerdatabase.com/"),
            Some(PathBuf::from("cache/loudspeakerdatabase.com.html"))
        );
    }

    #[test]
    fn test_cache_is_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpSource::new(&SiteConfig::default())
            .unwrap()
            .with_cache(dir.path());
        let cached = dir.path().join("unreachable.invalid/list.html");
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, "<title>cached</title>").unwrap();

        assert!(source.fetch("https://unreachable.invalid/list").is_some());
    }

    #[test]
    fn test_cache_path_stays_inside_cache_dir() {
        let source = HttpSource::new(&SiteConfig::default())
            .unwrap()
            .with_cache("cache");
        assert_eq!(
            source.url_to_cache_path("https://x/../../tmp/evil"),
            Some(PathBuf::from("cache/x/tmp/evil.html"))
        );
        assert_eq!(
            source.url_to_cache_path("https://x/a/%2E%2E/b"),
            Some(PathBuf::from("cache/x/b.html"))
        );
        assert_eq!(source.url_to_cache_path("../../etc/passwd"), None);
        for url in ["https://x/../../tmp/evil", "https://x/a/./b/"] {
            let path = source.url_to_cache_path(url).unwrap();
            assert!(path.starts_with("cache/x"));
            assert!(!path.components().any(|c| c == std::path::Component::ParentDir));
        }
    }

    #[test]
    fn test_unwritable_cache_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let source = HttpSource::new(&SiteConfig::default())
            .unwrap()
            .with_cache(&blocker);

        assert!(HttpSource::write_cache(&blocker.join("x/list.html"), "<p>a</p>").is_err());
        // logged and swallowed
        source.remember("https://x/list", "<p>a</p>");
        assert!(!blocker.join("x").exists());
    }

    #[test]
    fn test_remember_then_serve_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpSource::new(&SiteConfig::default())
            .unwrap()
            .with_cache(dir.path());
        source.remember("https://unreachable.invalid/deep/list?page=3", "<title>kept</title>");
        assert!(dir.path().join("unreachable.invalid/deep/list.html").exists());
        assert!(source.fetch("https://unreachable.invalid/deep/list").is_some());
    }

    #[test]
    fn test_static_source() {
        let source = StaticSource::new().with_page("https://x/a", "<p>a</p>");
        assert!(source.fetch("https://x/a").is_some());
        assert!(source.fetch("https://x/b").is_none());
        assert_eq!(source.requests_for("https://x/a"), 1);
        assert_eq!(source.requests_for("https://x/b"), 1);
    }
}
