pub mod card;
pub mod table;
pub mod text;

use anyhow::{Context, Result};
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::config::Heuristics;
use crate::types::Record;
pub use card::{CardStrategy, LooseCardStrategy};
pub use table::TableStrategy;

/// Per-page information strategies need besides the document itself
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Origin that relative links are resolved against
    pub base: Option<Url>,
}

impl PageContext {
    pub fn new(base: Option<Url>) -> Self {
        Self { base }
    }

    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        Ok(Self::new(Some(base)))
    }

    pub fn resolve(&self, href: &str) -> String {
        text::resolve_href(self.base.as_ref(), href)
    }
}

/// One way of finding records in a page
pub trait Strategy {
    fn name(&self) -> &'static str;

    fn extract(&self, doc: &Html, ctx: &PageContext) -> Vec<Record>;
}

/// How an [`Extractor`] combines its strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Policy {
    /// Stop at the first strategy that finds anything
    #[default]
    Fallback,
    /// Run every strategy and concatenate the results
    Combined,
}

/// Runs strategies in priority order under a [`Policy`]
pub struct Extractor {
    strategies: Vec<Box<dyn Strategy>>,
    policy: Policy,
}

impl Extractor {
    pub fn new(policy: Policy) -> Self {
        Self {
            strategies: Vec::new(),
            policy,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Tables, then class-matched cards
    pub fn standard(heuristics: &Heuristics, policy: Policy) -> Result<Self> {
        Ok(Self::new(policy)
            .with_strategy(TableStrategy)
            .with_strategy(CardStrategy::new(heuristics)?))
    }

    /// Tables, then class-matched cards, then any generic container
    pub fn manual(heuristics: &Heuristics, policy: Policy) -> Result<Self> {
        Ok(Self::standard(heuristics, policy)?.with_strategy(LooseCardStrategy::new(heuristics)?))
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// A missing document (failed retrieval) yields no records
    pub fn extract(&self, doc: Option<&Html>, ctx: &PageContext) -> Vec<Record> {
        let Some(doc) = doc else {
            return Vec::new();
        };

        let mut records = Vec::new();
        for strategy in &self.strategies {
            let found = strategy.extract(doc, ctx);
            debug!(strategy = strategy.name(), records = found.len(), "Strategy finished");
            if found.is_empty() {
                continue;
            }
            records.extend(found);
            if self.policy == Policy::Fallback {
                break;
            }
        }
        records
    }
}
