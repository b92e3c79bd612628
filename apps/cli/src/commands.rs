//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use embedplot_core::{IngestOutcome, IngestPipeline, IngestReport, ProgressReporter};
use embedplot_shared::{AppConfig, IngestConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// embedplot: turn a protein embedding release into plot-ready JSON.
#[derive(Parser)]
#[command(
    name = "embedplot",
    version,
    about = "Ingest protein embeddings, annotate them with keywords, and publish 2-D plot data.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.embedplot/embedplot.toml.
    #[arg(long, global = true, env = "EMBEDPLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Download the archive and, if it changed, rebuild and publish plot data.
    #[command(after_long_help = CHECKSUM_NOTE)]
    Run {
        /// Process the archive even if its checksum matches the stored one.
        #[arg(long)]
        force: bool,

        /// Keep the downloaded archive instead of deleting it.
        #[arg(long)]
        keep_archive: bool,

        /// Number of concurrent keyword lookups (overrides config).
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Run date used to name the output file (YYYY-MM-DD, defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        paths: PathOverrides,
    },

    /// Download the archive and report whether it differs from the last run.
    #[command(after_long_help = CHECKSUM_NOTE)]
    Check {
        /// Keep the downloaded archive instead of deleting it.
        #[arg(long)]
        keep_archive: bool,

        #[command(flatten)]
        paths: PathOverrides,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Shown under `run --help` and `check --help`.
const CHECKSUM_NOTE: &str = "\
Checksums are SHA-256 hex digests of the downloaded archive. A checksum file \
written by an MD5-based ingest never matches one, so the archive is treated \
as new the first time it is compared against such a file.";

/// Location overrides shared by `run` and `check`.
#[derive(clap::Args, Default)]
pub(crate) struct PathOverrides {
    /// Embedding archive URL (overrides config).
    #[arg(long)]
    pub embeddings_url: Option<Url>,

    /// Directory for the downloaded archive and the checksum file.
    #[arg(long)]
    pub ingest_dir: Option<PathBuf>,

    /// Directory the plot data JSON files are written to.
    #[arg(long)]
    pub plotdata_dir: Option<PathBuf>,
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
        0 => "embedplot=info",
        1 => "embedplot=debug",
        _ => "embedplot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            force,
            keep_archive,
            concurrency,
            date,
            paths,
        } => {
            let app = load_app_config(config_path)?;
            let mut ingest = resolve_ingest(&app, &paths)?;
            ingest.force = force;
            ingest.keep_archive = keep_archive;
            if let Some(n) = concurrency {
                ingest.keyword_concurrency = n;
            }
            cmd_run(&app, ingest, date).await
        }
        Command::Check {
            keep_archive,
            paths,
        } => {
            let app = load_app_config(config_path)?;
            let mut ingest = resolve_ingest(&app, &paths)?;
            ingest.keep_archive = keep_archive;
            cmd_check(&app, ingest).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// File config → runtime config, with CLI location overrides applied.
fn resolve_ingest(app: &AppConfig, paths: &PathOverrides) -> Result<IngestConfig> {
    let mut ingest = IngestConfig::try_from(app)?;
    if let Some(url) = &paths.embeddings_url {
        ingest.embeddings_url = url.clone();
    }
    if let Some(dir) = &paths.ingest_dir {
        ingest.ingest_dir = dir.clone();
    }
    if let Some(dir) = &paths.plotdata_dir {
        ingest.plotdata_dir = dir.clone();
    }
    Ok(ingest)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(app: &AppConfig, ingest: IngestConfig, date: Option<NaiveDate>) -> Result<()> {
    let run_date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    info!(
        url = %ingest.embeddings_url,
        %run_date,
        concurrency = ingest.keyword_concurrency,
        force = ingest.force,
        "starting ingest"
    );

    let pipeline = IngestPipeline::standard(ingest, &app.projection)?;
    let reporter = CliProgress::new();

    match pipeline
        .run(run_date, &reporter)
        .await
        .wrap_err("ingest run failed")?
    {
        IngestOutcome::Unchanged { checksum } => {
            println!("No new embedding release (checksum {checksum}); nothing to do.");
        }
        IngestOutcome::Published(report) => print_report(&report),
    }

    Ok(())
}

async fn cmd_check(app: &AppConfig, ingest: IngestConfig) -> Result<()> {
    let pipeline = IngestPipeline::standard(ingest, &app.projection)?;
    let reporter = CliProgress::new();

    let decision = pipeline.check(&reporter).await?;
    reporter.finish();

    if decision.is_new {
        println!("New embedding release available (checksum {}).", decision.checksum);
    } else {
        println!("Up to date (checksum {}).", decision.checksum);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!();
    println!("  Plot data published!");
    println!("  Date:       {}", report.run_date);
    println!("  Entries:    {}", report.entries);
    println!("  Width:      {}", report.vector_width);
    println!("  Categories: {}", report.categories);
    println!("  Keywords:   {}", report.keywords);
    println!("  Output:     {}", report.dated_path.display());
    println!("  Latest:     {}", report.latest_path.display());
    println!("  Checksum:   {}", report.checksum);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn lookup_progress(&self, completed: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching keywords [{completed}/{total}]"));
    }

    fn done(&self, _outcome: &IngestOutcome) {
        self.finish();
    }
}
