//! Site settings and heuristic vocabularies, loadable from a CONL file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "scraper.conl";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub site: SiteConfig,
    pub heuristics: Heuristics,
}

/// Where to look and how politely
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    /// Pause between listing pages
    pub page_delay_ms: u64,
    /// Pause between detail pages
    pub detail_delay_ms: u64,
    /// Tried by `scrape` when the home page links to nothing useful
    pub candidate_paths: Vec<String>,
    /// Always added by `sweep`
    pub sweep_paths: Vec<String>,
    pub discovery_keywords: Vec<String>,
    pub sweep_keywords: Vec<String>,
    pub max_discovered_links: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://loudspeakerdatabase.com".to_string(),
            user_agent: "Mozilla/5.0 (compatible; SubwooferScraper/1.0)".to_string(),
            accept_language: "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_secs: 30,
            page_delay_ms: 2000,
            detail_delay_ms: 1000,
            candidate_paths: strings(&[
                "/Subwoofers",
                "/subwoofers",
                "/woofers",
                "/database/subwoofers",
                "/speakers/subwoofers",
            ]),
            sweep_paths: strings(&[
                "/Subwoofers",
                "/subwoofers",
                "/woofers",
                "/database",
                "/browse",
                "/search",
                "/speakers/subwoofers",
                "/drivers/subwoofers",
            ]),
            discovery_keywords: strings(&["subwoofer", "woofer", "bass"]),
            sweep_keywords: strings(&[
                "subwoofer", "woofer", "bass", "speaker", "database", "browse", "search",
            ]),
            max_discovered_links: 20,
        }
    }
}

impl SiteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}

/// Vocabulary the extractors and the classifier match against.
///
/// All matching is case-insensitive substring matching; entries are plain
/// text, not regular expressions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Heuristics {
    /// Tags that may hold one product
    pub container_tags: Vec<String>,
    /// Class fragments marking a product container, highest priority first
    pub container_classes: Vec<String>,
    /// Tags that may carry a product's title, searched in document order
    pub title_tags: Vec<String>,
    /// Auxiliary fields looked up by class name inside a card
    pub card_fields: Vec<String>,
    pub discontinued_keywords: Vec<String>,
    /// Searched for on detail pages to fill `availability_info`
    pub availability_keywords: Vec<String>,
    pub full_text_limit: Option<usize>,
    pub loose_container_limit: usize,
    pub loose_title_min: usize,
    pub loose_title_max: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            container_tags: strings(&["div", "article", "li"]),
            container_classes: strings(&["product", "item", "speaker", "card"]),
            title_tags: strings(&["h1", "h2", "h3", "h4", "h5", "a"]),
            card_fields: strings(&[
                "price",
                "manufacturer",
                "model",
                "brand",
                "status",
                "availability",
            ]),
            discontinued_keywords: strings(&[
                "discontinued",
                "arrêté",
                "obsolete",
                "not available",
                "out of stock",
                "épuisé",
                "unavailable",
                "retired",
            ]),
            availability_keywords: strings(&[
                "available",
                "in stock",
                "en vente",
                "disponible",
                "discontinued",
            ]),
            full_text_limit: Some(200),
            loose_container_limit: 50,
            loose_title_min: 3,
            loose_title_max: 100,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Parse a CONL document. Missing fields keep their defaults.
    pub fn from_conl(content: &str) -> Result<Self> {
        let config: Config = serde_conl::from_str(content)?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_conl(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// An explicit path must exist; otherwise `scraper.conl` is used if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            tracing::info!(path = %default_path.display(), "Loading config");
            return Self::load_from_path(default_path);
        }
        Ok(Self::default())
    }
}
