use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scraper::Html;
use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod availability;
mod config;
mod crawl;
mod dedup;
mod detail;
mod discover;
mod extract;
mod fetch;
mod interactive;
mod manual;
mod sink;
mod types;
mod utils;

use availability::Classifier;
use config::{Config, SiteConfig};
use crawl::{crawl, summarize, unique_urls, Outcome, PageResult};
use detail::DetailEnricher;
use discover::{explore, Exploration};
use extract::{Extractor, PageContext, Policy};
use fetch::{DocumentSource, HttpSource};
use interactive::{Session, FAREWELL};
use sink::{load_json, save_records, save_records_json, ALL_STEM, AVAILABLE_STEM};
use types::Record;
use utils::truncate;

const EXPLORATION_FILE: &str = "homepage_exploration.json";
const SAMPLE_SIZE: usize = 5;

#[derive(Parser)]
#[command(name = "subwoofer-scraper")]
#[command(about = "Find subwoofer drivers that are still on sale")]
struct Cli {
    /// CONL config file (defaults to ./scraper.conl when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory the JSON and CSV results are written to
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover listing pages from the home page and scrape them
    Scrape {
        /// Listing page to scrape instead of discovering them (repeatable)
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,
        /// Fetch each record's detail page and merge its fields
        #[arg(long)]
        details: bool,
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long, value_enum, default_value_t = Policy::Fallback)]
        policy: Policy,
    },
    /// Scrape the home page, every keyword link on it, and a list of known paths
    Sweep {
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long, value_enum, default_value_t = Policy::Combined)]
        policy: Policy,
    },
    /// Extract from a saved HTML file
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Policy::Fallback)]
        policy: Policy,
    },
    /// Re-run deduplication and filtering on a saved JSON result
    Refilter {
        #[arg(value_name = "JSON")]
        file: PathBuf,
    },
    /// Paste HTML or type records interactively
    Manual,
}

#[derive(Args)]
struct FetchArgs {
    /// Keep raw responses under DIR and reuse them on later runs
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,
}

/// Everything a run needs that comes from the config file
struct Run {
    config: Config,
    ctx: PageContext,
    classifier: Classifier,
    output_dir: PathBuf,
}

impl Run {
    fn new(config: Config, output_dir: PathBuf) -> Result<Self> {
        let ctx = PageContext::from_base_url(&config.site.base_url)?;
        let classifier = Classifier::new(&config.heuristics.discontinued_keywords);
        Ok(Self {
            config,
            ctx,
            classifier,
            output_dir,
        })
    }

    fn site(&self) -> &SiteConfig {
        &self.config.site
    }

    fn http_source(&self, fetch: FetchArgs) -> Result<HttpSource> {
        let source = HttpSource::new(self.site())?;
        Ok(match fetch.cache {
            Some(dir) => source.with_cache(dir),
            None => source,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    ctrlc::set_handler(|| {
        println!("\n\nInterrupted. {}", FAREWELL);
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;
    let run = Run::new(config, cli.output_dir)?;

    match cli.command {
        Commands::Scrape {
            urls,
            details,
            fetch,
            policy,
        } => run_scrape(&run, urls, details, fetch, policy),
        Commands::Sweep { fetch, policy } => run_sweep(&run, fetch, policy),
        Commands::Extract { file, policy } => run_extract(&run, &file, policy),
        Commands::Refilter { file } => run_refilter(&run, &file),
        Commands::Manual => run_manual(&run),
    }
}

fn run_scrape(
    run: &Run,
    urls: Vec<String>,
    details: bool,
    fetch: FetchArgs,
    policy: Policy,
) -> Result<()> {
    let source = run.http_source(fetch)?;
    let extractor = Extractor::standard(&run.config.heuristics, policy)?;

    let urls = if urls.is_empty() {
        discover_listing_pages(&source, run)
    } else {
        unique_urls(urls.iter().map(|url| run.ctx.resolve(url)))
    };
    info!(pages = urls.len(), policy = ?extractor.policy(), "Starting scrape");

    let enricher = details.then(|| {
        DetailEnricher::new(
            &source,
            &run.config.heuristics.availability_keywords,
            run.site().detail_delay(),
        )
    });
    let pages = crawl(
        &source,
        &extractor,
        &run.ctx,
        &urls,
        run.site().page_delay(),
        enricher.as_ref(),
    );
    finish(summarize(pages, &run.classifier), &run.output_dir);
    Ok(())
}

/// Keyword links from the home page, or the configured guesses when it has none
fn discover_listing_pages(source: &dyn DocumentSource, run: &Run) -> Vec<String> {
    let site = run.site();
    println!("Exploring {}...", site.base_url);

    let mut urls = source
        .fetch(&site.base_url)
        .map(|doc| explore(&doc, &run.ctx, &site.discovery_keywords).discover_pages())
        .unwrap_or_default();
    urls.truncate(site.max_discovered_links);

    if urls.is_empty() {
        info!("No listing links on the home page, trying known paths");
        urls = site.candidate_paths.iter().map(|p| run.ctx.resolve(p)).collect();
    }
    unique_urls(urls)
}

fn run_sweep(run: &Run, fetch: FetchArgs, policy: Policy) -> Result<()> {
    let source = run.http_source(fetch)?;
    let extractor = Extractor::standard(&run.config.heuristics, policy)?;
    let site = run.site();

    println!("Exploring {}...", site.base_url);
    let exploration = source
        .fetch(&site.base_url)
        .map(|doc| explore(&doc, &run.ctx, &site.sweep_keywords))
        .unwrap_or_default();
    report_exploration(&exploration);
    if let Err(e) = save_exploration(&exploration, &run.output_dir.join(EXPLORATION_FILE)) {
        eprintln!("Error saving exploration: {:#}", e);
    }

    let urls = unique_urls(
        iter::once(site.base_url.clone())
            .chain(
                exploration
                    .discover_pages()
                    .into_iter()
                    .take(site.max_discovered_links),
            )
            .chain(site.sweep_paths.iter().map(|p| run.ctx.resolve(p))),
    );
    info!(pages = urls.len(), policy = ?extractor.policy(), "Starting sweep");

    let pages = crawl(&source, &extractor, &run.ctx, &urls, site.page_delay(), None);
    finish(summarize(pages, &run.classifier), &run.output_dir);
    Ok(())
}

fn report_exploration(exploration: &Exploration) {
    println!(
        "Home page: {}",
        exploration.title.as_deref().unwrap_or("(no title)")
    );
    println!(
        "  {} navigation links, {} keyword links",
        exploration.navigation.len(),
        exploration.links.len()
    );
    for link in exploration.links.iter().take(SAMPLE_SIZE) {
        println!("  - {} [{}] {}", truncate(&link.text, 50), link.keyword_matched, link.href);
    }
}

fn save_exploration(exploration: &Exploration, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(exploration)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exploration saved to {}", path.display());
    Ok(())
}

fn run_extract(run: &Run, file: &Path, policy: Policy) -> Result<()> {
    let html = fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;
    let doc = Html::parse_document(&html);
    let extractor = Extractor::manual(&run.config.heuristics, policy)?;

    let page = PageResult {
        url: file.display().to_string(),
        records: extractor.extract(Some(&doc), &run.ctx),
    };
    finish(summarize(vec![page], &run.classifier), &run.output_dir);
    Ok(())
}

fn run_refilter(run: &Run, file: &Path) -> Result<()> {
    let page = PageResult {
        url: file.display().to_string(),
        records: load_json(file)?,
    };
    finish(summarize(vec![page], &run.classifier), &run.output_dir);
    Ok(())
}

fn run_manual(run: &Run) -> Result<()> {
    let extractor = Extractor::manual(&run.config.heuristics, Policy::Fallback)?;
    Session::new(
        io::stdin().lock(),
        io::stdout(),
        &extractor,
        &run.classifier,
        &run.ctx,
        &run.output_dir,
    )
    .run()
}

/// Print the totals, save both result sets, show a few survivors
fn finish(outcome: Outcome, output_dir: &Path) {
    println!();
    outcome.report.print();

    if outcome.all.is_empty() {
        println!("No subwoofers found. If the site renders its listings with JavaScript,");
        println!("save the page from a browser and use `extract` or `manual`.");
        return;
    }

    save_records(&outcome.available, output_dir, AVAILABLE_STEM);
    save_records_json(&outcome.all, output_dir, ALL_STEM);
    print_sample(&outcome.available);
}

fn print_sample(records: &[Record]) {
    if records.is_empty() {
        return;
    }
    println!("\nStill available (first {}):", records.len().min(SAMPLE_SIZE));
    for record in records.iter().take(SAMPLE_SIZE) {
        println!("  - {}", truncate(record.name().unwrap_or("N/A"), 80));
        if let Some(link) = record.link() {
            println!("    {}", link);
        }
    }
}
