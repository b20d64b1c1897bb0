use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, warn};

use peakbagger::client::Client;
use peakbagger::config::Settings;
use peakbagger::models::{Ascent, Peak};
use peakbagger::stats::{self, DateFilter, SeasonalScope, StatsOptions};
use peakbagger::{output, parser};

#[derive(Parser)]
#[command(name = "peakbagger", version, about = "Search and retrieve mountain peak data from PeakBagger.com")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Seconds between requests (overrides PEAKBAGGER_RATE_LIMIT)
    #[arg(long, global = true)]
    rate_limit: Option<f64>,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log requests and parser decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log everything, including rate-limit waits
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ScopeArg {
    /// Match month/day in every year
    #[default]
    AllYears,
    /// Match only dates near the reference date itself
    ReferenceYear,
}

impl From<ScopeArg> for SeasonalScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::AllYears => SeasonalScope::AllYears,
            ScopeArg::ReferenceYear => SeasonalScope::ReferenceYear,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Peak search, details, ascents and statistics
    Peak {
        #[command(subcommand)]
        command: PeakCommands,
    },
    /// Individual ascent reports
    Ascent {
        #[command(subcommand)]
        command: AscentCommands,
    },
}

#[derive(Subcommand)]
enum PeakCommands {
    /// Search peaks by name
    Search {
        query: String,
        /// Fetch the full peak page for every result
        #[arg(long)]
        full: bool,
    },
    /// Show one peak
    Show {
        #[arg(allow_hyphen_values = true)]
        pid: String,
    },
    /// List a peak's ascents, most recent first
    Ascents {
        #[arg(allow_hyphen_values = true)]
        pid: String,
        /// Max ascents to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Ascent statistics for a peak
    Stats {
        #[arg(allow_hyphen_values = true)]
        pid: String,
        /// Reference date for windows (YYYY-MM-DD, default: today)
        #[arg(long)]
        reference_date: Option<String>,
        /// Days either side of the reference day for the seasonal window
        #[arg(long, default_value_t = stats::DEFAULT_SEASONAL_WINDOW_DAYS)]
        seasonal_window: u32,
        #[arg(long, value_enum, default_value_t = ScopeArg::AllYears)]
        seasonal_scope: ScopeArg,
        /// Also list the ascents the statistics were computed from
        #[arg(long)]
        list_ascents: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Subcommand)]
enum AscentCommands {
    /// Show one ascent report
    Show { aid: String },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only ascents on or after this date (YYYY-MM-DD)
    #[arg(long)]
    after: Option<String>,
    /// Only ascents on or before this date (YYYY-MM-DD)
    #[arg(long)]
    before: Option<String>,
    /// Only ascents within this period from today, e.g. 3m, 1y, 10d
    #[arg(long, conflicts_with_all = ["after", "before"])]
    within: Option<String>,
    /// Only ascents with a GPX track
    #[arg(long)]
    with_gpx: bool,
    /// Only ascents with a trip report
    #[arg(long)]
    with_tr: bool,
}

impl FilterArgs {
    fn apply(&self, ascents: Vec<Ascent>, today: NaiveDate) -> Result<Vec<Ascent>> {
        let range = DateFilter::from_args(
            self.after.as_deref(),
            self.before.as_deref(),
            self.within.as_deref(),
            today,
        )?;
        let mut kept = range.apply(&ascents);
        if self.with_gpx {
            kept.retain(|a| a.has_gpx);
        }
        if self.with_tr {
            kept.retain(|a| a.has_trip_report);
        }
        debug!(before = ascents.len(), after = kept.len(), filters = ?self, "filtered ascents");
        Ok(kept)
    }
}

/// Shared state for one command run.
struct App {
    client: Client,
    format: OutputFormat,
    quiet: bool,
}

impl App {
    /// Progress notes go to stderr so JSON on stdout stays clean.
    fn note(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn emit_json(&self, value: &serde_json::Value) -> Result<()> {
        println!("{}", output::json(value)?);
        Ok(())
    }

    async fn search(&self, query: &str, full: bool) -> Result<()> {
        self.note(format!("Searching for '{query}'..."));
        let html = self.client.search(query).await?;
        let results = parser::parse_search_results(&html);
        if results.is_empty() {
            self.note(format!("No results found for '{query}'"));
            return Ok(());
        }

        if !full {
            return match self.format {
                OutputFormat::Json => {
                    self.emit_json(&json!(results.iter().map(|r| r.to_json()).collect::<Vec<_>>()))
                }
                OutputFormat::Text => {
                    println!("{}", output::search_results(&results));
                    Ok(())
                }
            };
        }

        self.note(format!("Fetching details for {} peak(s)...", results.len()));
        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(results.len() as u64)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );

        let mut peaks: Vec<Peak> = Vec::with_capacity(results.len());
        for result in &results {
            pb.set_message(result.name.clone());
            match self.client.get(&result.url, &[]).await {
                Ok(html) => match parser::parse_peak_detail(&html, &result.pid) {
                    Some(peak) => peaks.push(peak),
                    None => warn!(pid = %result.pid, "could not parse peak page"),
                },
                Err(e) => warn!(pid = %result.pid, error = %e, "failed to fetch peak page"),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if peaks.is_empty() {
            bail!("Could not load details for any of the {} result(s)", results.len());
        }
        match self.format {
            OutputFormat::Json => self.emit_json(&json!(peaks.iter().map(Peak::to_json).collect::<Vec<_>>())),
            OutputFormat::Text => {
                let blocks: Vec<String> = peaks.iter().map(output::peak_detail).collect();
                let separator = format!("\n\n{}\n\n", "-".repeat(80));
                println!("{}", blocks.join(separator.as_str()));
                Ok(())
            }
        }
    }

    async fn show_peak(&self, pid: &str) -> Result<()> {
        self.note(format!("Fetching peak {pid}..."));
        let html = self.client.peak(pid).await?;
        let Some(peak) = parser::parse_peak_detail(&html, pid) else {
            bail!("Failed to parse peak data for ID {pid}");
        };
        match self.format {
            OutputFormat::Json => self.emit_json(&peak.to_json()),
            OutputFormat::Text => {
                println!("{}", output::peak_detail(&peak));
                Ok(())
            }
        }
    }

    async fn fetch_ascents(&self, pid: &str, filters: &FilterArgs, today: NaiveDate) -> Result<Vec<Ascent>> {
        self.note(format!("Fetching ascents for peak {pid}..."));
        let html = self.client.peak_ascents(pid).await?;
        let ascents = match parser::parse_peak_ascents(&html, pid) {
            Some(ascents) if !ascents.is_empty() => ascents,
            _ => bail!("No ascents found for peak ID {pid}"),
        };
        self.note(format!("Found {} ascents", ascents.len()));

        let filtered = filters.apply(ascents, today)?;
        self.note(format!("{} ascents after filters", filtered.len()));
        Ok(filtered)
    }

    async fn list_ascents(&self, pid: &str, limit: Option<usize>, filters: &FilterArgs) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        let ascents = self.fetch_ascents(pid, filters, today).await?;
        let matched = ascents.len();
        let ascents = parser::most_recent(ascents, limit.unwrap_or(usize::MAX));

        match self.format {
            OutputFormat::Json => self.emit_json(&json!({
                "peak_id": pid,
                "total": matched,
                "ascents": ascents.iter().map(Ascent::to_json).collect::<Vec<_>>(),
            })),
            OutputFormat::Text => {
                println!("{}", output::ascents_table(&ascents));
                if ascents.len() < matched {
                    println!("\nShowing {} of {} ascents.", ascents.len(), matched);
                }
                Ok(())
            }
        }
    }

    async fn peak_stats(&self, pid: &str, opts: StatsOptions, list: bool, filters: &FilterArgs) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        let mut ascents = self.fetch_ascents(pid, filters, today).await?;
        let statistics = stats::calculate(&ascents, &opts);
        parser::sort_by_date(&mut ascents);

        match self.format {
            OutputFormat::Json => {
                let mut value = json!({ "peak_id": pid, "statistics": statistics.to_json() });
                if list {
                    value["ascents"] = json!(ascents.iter().map(Ascent::to_json).collect::<Vec<_>>());
                }
                self.emit_json(&value)
            }
            OutputFormat::Text => {
                println!("{}", output::statistics(&statistics));
                if list {
                    println!("\n{}", output::ascents_table(&ascents));
                }
                Ok(())
            }
        }
    }

    async fn show_ascent(&self, aid: &str) -> Result<()> {
        self.note(format!("Fetching ascent {aid}..."));
        let html = self.client.ascent(aid).await?;
        let Some(ascent) = parser::parse_ascent_detail(&html, aid) else {
            bail!("Failed to parse ascent data for ID {aid}");
        };
        match self.format {
            OutputFormat::Json => self.emit_json(&ascent.to_json()),
            OutputFormat::Text => {
                println!("{}", output::ascent_detail(&ascent));
                Ok(())
            }
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    let t0 = Instant::now();

    let mut settings = Settings::load().context("Failed to load PEAKBAGGER_* settings")?;
    if let Some(rate_limit) = cli.rate_limit {
        if !rate_limit.is_finite() || rate_limit < 0.0 {
            bail!("--rate-limit must be a non-negative number of seconds");
        }
        settings.rate_limit = rate_limit;
    }
    debug!(?settings, "settings loaded");

    let app = App {
        client: Client::new(settings).context("Failed to build HTTP client")?,
        format: cli.format,
        quiet: cli.quiet && !cli.verbose && !cli.debug,
    };

    let result = match cli.command {
        Commands::Peak { command } => match command {
            PeakCommands::Search { query, full } => app.search(&query, full).await,
            PeakCommands::Show { pid } => app.show_peak(&pid).await,
            PeakCommands::Ascents { pid, limit, filters } => app.list_ascents(&pid, limit, &filters).await,
            PeakCommands::Stats {
                pid,
                reference_date,
                seasonal_window,
                seasonal_scope,
                list_ascents,
                filters,
            } => {
                let reference = match reference_date.as_deref() {
                    Some(text) => stats::parse_bound(text).context("Invalid --reference-date")?,
                    None => chrono::Local::now().date_naive(),
                };
                let mut opts = StatsOptions::new(reference);
                opts.seasonal_window_days = seasonal_window;
                opts.seasonal_scope = seasonal_scope.into();
                app.peak_stats(&pid, opts, list_ascents, &filters).await
            }
        },
        Commands::Ascent { command } => match command {
            AscentCommands::Show { aid } => app.show_ascent(&aid).await,
        },
    };

    debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "done");
    result
}
