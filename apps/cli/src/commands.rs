//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use eventfeed_core::pipeline::{FeedArtifacts, PeriodReport, ProgressReporter, RunSummary};
use eventfeed_core::{FeedSettings, enumerate_periods};
use eventfeed_extract::{CandidateLocator, PageSnapshot, extract_fields};
use eventfeed_fetcher::{Fetcher, load_snapshot_dir};
use eventfeed_shared::{
    AppConfig, EventFeedError, FetchConfig, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// EventFeed: turn a calendar page into an RSS feed.
#[derive(Parser)]
#[command(
    name = "eventfeed",
    version,
    about = "Scrape a calendar site month by month into a deduplicated RSS feed and summary page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.eventfeed/eventfeed.toml.
    #[arg(long, global = true, env = "EVENTFEED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape every period and write the feed and summary page.
    Run {
        /// Output directory (overrides output.dir).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Dump raw period pages here (overrides output.debug_dir).
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// Read period pages from a dump directory instead of the network.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Maximum concurrent fetches (overrides fetch.concurrency).
        #[arg(long)]
        concurrency: Option<u32>,

        /// Delay before each request in ms (overrides fetch.delay_ms).
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Pretend today is this date (YYYY-MM-DD) when choosing periods.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Print the periods a run would query, with their URLs.
    Periods {
        /// Pretend today is this date (YYYY-MM-DD).
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Run extraction on one saved page and print the raw fields as JSON.
    Extract {
        /// HTML file to read.
        file: PathBuf,

        /// URL the page was served from; relative links resolve against it.
        #[arg(long)]
        url: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "eventfeed=info",
        1 => "eventfeed=debug",
        _ => "eventfeed=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            out,
            debug_dir,
            replay,
            concurrency,
            delay_ms,
            today,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(dir) = out {
                config.output.dir = dir.to_string_lossy().into_owned();
            }
            if let Some(dir) = debug_dir {
                config.output.debug_dir = Some(dir.to_string_lossy().into_owned());
            }
            if let Some(n) = concurrency {
                config.fetch.concurrency = n;
            }
            if let Some(ms) = delay_ms {
                config.fetch.delay_ms = ms;
            }
            config.validate()?;
            cmd_run(&config, replay.as_deref(), today).await
        }
        Command::Periods { today } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_periods(&config, today)
        }
        Command::Extract { file, url } => cmd_extract(&file, url.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => {
                let config = resolve_config(config_path.as_deref())?;
                cmd_config_show(&config)
            }
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, replay: Option<&Path>, today: Option<NaiveDate>) -> Result<()> {
    let settings = FeedSettings::from_config(config)?;
    let now = settings.local_now();
    let periods = enumerate_periods(today.unwrap_or(now.date()));
    let fetcher = Fetcher::new(FetchConfig::from(config))?;

    info!(
        base_url = %config.source.base_url,
        periods = periods.len(),
        replay = replay.map(|p| p.display().to_string()),
        "starting run"
    );

    let reporter = CliProgress::new();
    let artifacts = match replay {
        Some(dir) => {
            reporter.phase("Loading snapshots");
            let pages = load_snapshot_dir(dir, &periods, |p| fetcher.url_for(p))?;
            eventfeed_core::assemble_pages(&pages, &settings, now, &reporter)?
        }
        None => eventfeed_core::run(&fetcher, &periods, &settings, now, &reporter).await?,
    };

    let out_dir = PathBuf::from(&config.output.dir);
    let (feed_path, summary_path) = write_artifacts(&out_dir, config, &artifacts)?;
    print_summary(&artifacts.summary, &feed_path, &summary_path);

    Ok(())
}

fn write_artifacts(
    dir: &Path,
    config: &AppConfig,
    artifacts: &FeedArtifacts,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).map_err(|e| EventFeedError::io(dir, e))?;

    let feed_path = dir.join(&config.output.feed_file);
    std::fs::write(&feed_path, &artifacts.feed_xml).map_err(|e| EventFeedError::io(&feed_path, e))?;

    let summary_path = dir.join(&config.output.summary_file);
    std::fs::write(&summary_path, &artifacts.summary_html)
        .map_err(|e| EventFeedError::io(&summary_path, e))?;

    info!(feed = %feed_path.display(), summary = %summary_path.display(), "artifacts written");
    Ok((feed_path, summary_path))
}

fn print_summary(summary: &RunSummary, feed_path: &Path, summary_path: &Path) {
    println!();
    println!("  Feed written successfully!");
    println!(
        "  Periods:  {} ({} fetched, {} empty, {} failed)",
        summary.periods, summary.fetched, summary.empty, summary.failed
    );
    println!(
        "  Candidates: {} ({} dropped)",
        summary.candidates, summary.dropped
    );
    println!(
        "  Events:   {} ({} with unknown dates, {} excluded)",
        summary.events, summary.unknown_dates, summary.excluded
    );
    println!("  Feed:     {}", feed_path.display());
    println!("  Summary:  {}", summary_path.display());
    println!();
}

fn cmd_periods(config: &AppConfig, today: Option<NaiveDate>) -> Result<()> {
    let settings = FeedSettings::from_config(config)?;
    let today = today.unwrap_or(settings.local_now().date());
    let fetcher = Fetcher::new(FetchConfig::from(config))?;

    for period in enumerate_periods(today) {
        println!("{period}  {}", fetcher.url_for(period)?);
    }
    Ok(())
}

fn cmd_extract(file: &Path, url: Option<&str>) -> Result<()> {
    let body = std::fs::read_to_string(file).map_err(|e| EventFeedError::io(file, e))?;

    let page_url = match url {
        Some(u) => Url::parse(u).map_err(|e| eyre!("invalid URL '{u}': {e}"))?,
        None => {
            let absolute = std::fs::canonicalize(file).map_err(|e| EventFeedError::io(file, e))?;
            Url::from_file_path(&absolute)
                .map_err(|()| eyre!("cannot build a URL for {}", absolute.display()))?
        }
    };

    let snapshot = PageSnapshot::parse(&body, page_url);
    let located = CandidateLocator::new().locate(&snapshot);
    let events: Vec<_> = located
        .candidates
        .iter()
        .filter_map(|c| extract_fields(c, &snapshot.url))
        .collect();

    let report = serde_json::json!({
        "url": snapshot.url.as_str(),
        "strategy": located.strategy,
        "candidates": located.candidates.len(),
        "events": events,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn period_processed(&self, report: &PeriodReport, current: usize, total: usize) {
        let period = report
            .period
            .map(|p| p.to_string())
            .unwrap_or_default();
        let status = match (&report.error, report.strategy) {
            (Some(_), _) => "fetch failed".to_string(),
            (None, Some(strategy)) => format!("{} events via {strategy}", report.events),
            (None, None) => "no events".to_string(),
        };
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {period}: {status}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
