//! Command line of the `harvest` binary.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use engine_logging::engine_info;
use harvester_engine::{
    render_links, write_links, HarvestError, Harvester, LinkExtractor, ParseError,
    ReqwestFetcher, SelectorExtractor,
};

use crate::config::{
    ConfigError, FileConfig, FormatArg, PaginationArg, ParsePolicyArg, RunConfig, StrategyArg,
};

/// Collect the permalinks of every post on a WordPress site.
#[derive(Debug, Parser)]
#[command(name = "harvest", version)]
#[command(about = "Collect post permalinks from a WordPress site", long_about = None)]
pub struct Cli {
    /// Site root URL or bare hostname (e.g. https://example.com/blog, myblog.wordpress.com).
    pub site: String,

    /// RON file with default settings; flags override it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where links come from. `auto` tries the REST APIs before the HTML pages.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Listing page addressing: `/page/N/`, `/?paged=N`, or the first retried as the second.
    #[arg(long, value_enum)]
    pub pagination: Option<PaginationArg>,

    /// Stop after this many listing pages.
    #[arg(long, value_name = "N")]
    pub max_pages: Option<u32>,

    /// Consecutive pages without new links that end pagination.
    #[arg(long, value_name = "N")]
    pub max_empty_pages: Option<u32>,

    /// What to do with a page that is not parseable HTML.
    #[arg(long, value_enum)]
    pub parse_policy: Option<ParsePolicyArg>,

    /// Pause between requests, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Per-request timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// CSS selector for permalink anchors; repeat to add more. Replaces the WordPress defaults.
    #[arg(long = "selector", value_name = "CSS")]
    pub selectors: Vec<String>,

    /// Sort links instead of keeping discovery order.
    #[arg(long)]
    pub sort: bool,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Write links to this file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write the log to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

pub async fn run(cli: Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let resolved = RunConfig::resolve(file, &cli)?;

    let extractor: Arc<dyn LinkExtractor> = match &resolved.selectors {
        Some(selectors) => Arc::new(SelectorExtractor::new(selectors)?),
        None => Arc::new(SelectorExtractor::wordpress()),
    };
    let fetcher = Arc::new(ReqwestFetcher::new(resolved.harvest.fetch.clone())?);
    let harvester = Harvester::with_parts(fetcher, extractor, resolved.harvest.clone());

    let mut report = harvester.harvest(&cli.site).await?;
    if resolved.sort {
        report.links.sort();
    }
    engine_info!(
        "{} links from {} ({:?})",
        report.links.len(),
        report.site,
        report.source
    );

    match &resolved.output {
        Some(path) => {
            let written = write_links(path, &report.links, resolved.format, &report.site)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "Found {} posts. Wrote {}",
                report.links.len(),
                written.display()
            );
        }
        None => {
            let text = render_links(&report.links, resolved.format, &report.site)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// 2 for bad input (site URL, config, selectors), 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(HarvestError::InvalidInput(_)) = err.downcast_ref::<HarvestError>() {
        return 2;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    if let Some(ParseError::Selector { .. }) = err.downcast_ref::<ParseError>() {
        return 2;
    }
    1
}
