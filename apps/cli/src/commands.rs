//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncReadExt;
use tracing::info;

use arxiv_assistant_core::{
    PipelineOutcome, PipelineSettings, ProgressReporter, ResearchPipeline, keepalive,
    load_request,
};
use arxiv_assistant_discovery::{ArxivClient, DiscoveryOptions};
use arxiv_assistant_extractor::PaperExtractor;
use arxiv_assistant_llm::{ProviderTable, RoutedModel, validate_provider_credentials};
use arxiv_assistant_shared::{AppConfig, ResearchRequest, RunId, init_config, load_config};
use arxiv_assistant_storage::Storage;

use crate::event::parse_event;

/// User-Agent sent on every outbound request.
const USER_AGENT: &str = concat!("arxiv-assistant/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// arXiv research assistant: answer questions from recent papers.
#[derive(Parser)]
#[command(
    name = "arxiv-assistant",
    version,
    about = "Answer research questions by searching arXiv and analyzing the papers it finds.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print the event result as JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

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
    /// Research a question.
    Ask {
        /// The research question.
        question: String,

        /// Model identifier (defaults to the configured model).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run an `arxiv-research-assistant.search` event read from a file or stdin.
    Event {
        /// Event JSON file, or `-` for stdin.
        #[arg(default_value = "-")]
        file: String,
    },

    /// Replay a journaled run, skipping its completed steps.
    Resume {
        /// Run identifier as printed by `ask` or `runs`.
        run_id: String,
    },

    /// List journaled runs.
    Runs {
        /// Maximum number of runs to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Ping a URL periodically until interrupted.
    Keepalive {
        /// URL to ping (defaults to `[keepalive] url`).
        #[arg(long)]
        url: Option<String>,

        /// Seconds between pings (defaults to `[keepalive] interval_secs`).
        #[arg(long)]
        interval_secs: Option<u64>,
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
        0 => "arxiv_assistant=info",
        1 => "arxiv_assistant=debug",
        _ => "arxiv_assistant=trace",
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
    let json = cli.json;
    match cli.command {
        Command::Ask { question, model } => {
            let mut request = ResearchRequest::new(question);
            request.model = model;
            cmd_research(RunId::new(), request, json).await
        }
        Command::Event { file } => cmd_event(&file, json).await,
        Command::Resume { run_id } => cmd_resume(&run_id, json).await,
        Command::Runs { limit } => cmd_runs(limit).await,
        Command::Keepalive { url, interval_secs } => cmd_keepalive(url, interval_secs).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Research commands
// ---------------------------------------------------------------------------

/// One connection pool for every outbound call. Timeouts are set per request
/// by each client.
fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?)
}

fn build_pipeline(config: &AppConfig) -> Result<ResearchPipeline> {
    let http = http_client()?;
    let model = Arc::new(RoutedModel::new(http.clone(), config.providers.clone()));
    let papers = Arc::new(ArxivClient::new(
        http.clone(),
        &DiscoveryOptions::from(&config.arxiv),
    ));
    let content = Arc::new(PaperExtractor::new(http, &config.documents));
    Ok(ResearchPipeline::new(
        model,
        papers,
        content,
        PipelineSettings::from(config),
    ))
}

async fn cmd_event(file: &str, json: bool) -> Result<()> {
    let raw = if file == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        let path = PathBuf::from(file);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("cannot read event file '{}': {e}", path.display()))?
    };

    let request = parse_event(&raw)?;
    cmd_research(RunId::new(), request, json).await
}

async fn cmd_resume(run_id: &str, json: bool) -> Result<()> {
    let run_id: RunId = run_id
        .parse()
        .map_err(|e| eyre!("invalid run id '{run_id}': {e}"))?;

    let config = load_config()?;
    let storage = Storage::open(&config.journal.resolve_path()?).await?;
    let request = load_request(&storage, &run_id).await?;
    drop(storage);

    cmd_research(run_id, request, json).await
}

async fn cmd_research(run_id: RunId, mut request: ResearchRequest, json: bool) -> Result<()> {
    let config = load_config()?;
    if request.model.is_none() {
        request.model = Some(config.defaults.model.clone());
    }

    // Fail before touching the journal if the model cannot be routed.
    let table = ProviderTable::new(config.providers.clone());
    validate_provider_credentials(&table, request.model_id())?;

    let storage = Storage::open(&config.journal.resolve_path()?).await?;
    let pipeline = build_pipeline(&config)?;

    info!(%run_id, model = request.model_id(), "starting research run");

    let reporter = CliProgress::new(json);
    let outcome = pipeline
        .run_journaled(&storage, &run_id, &request, &reporter)
        .await;
    reporter.finish();
    let outcome = outcome.map_err(|e| eyre!("run {run_id} failed: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.event_result())?);
        return Ok(());
    }

    match outcome {
        PipelineOutcome::Answered(answer) => {
            println!("{}", answer.answer);
        }
        PipelineOutcome::NoQuery => {
            println!("The model did not produce a search query; no papers were analyzed.");
        }
    }
    eprintln!();
    eprintln!("  Run: {run_id}");

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
    fn new(hidden: bool) -> Self {
        if hidden {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn step_replayed(&self, step: &str) {
        self.spinner.println(format!("  ↺ {step} (from journal)"));
    }

    fn paper_extracted(&self, title: &str, ok: bool, current: usize, total: usize) {
        let mark = if ok { "✓" } else { "✗" };
        self.spinner
            .println(format!("  {mark} [{current}/{total}] {title}"));
    }
}

// ---------------------------------------------------------------------------
// Journal and maintenance commands
// ---------------------------------------------------------------------------

async fn cmd_runs(limit: u32) -> Result<()> {
    let config = load_config()?;
    let path = config.journal.resolve_path()?;
    if !path.exists() {
        println!("No runs yet.");
        return Ok(());
    }

    let storage = Storage::open_readonly(&path).await?;
    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs yet.");
        return Ok(());
    }

    for run in runs {
        let question = serde_json::from_str::<ResearchRequest>(&run.input_json)
            .map(|r| truncate(&r.input, 60))
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "{}  {:<9}  {}  {}",
            run.id,
            run.status.as_str(),
            run.created_at,
            question
        );
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

async fn cmd_keepalive(url: Option<String>, interval_secs: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let url = url
        .or(config.keepalive.url.clone())
        .ok_or_else(|| eyre!("no keep-alive URL: pass --url or set [keepalive] url"))?;
    let interval_secs = interval_secs.unwrap_or(config.keepalive.interval_secs);
    let interval = Duration::from_secs(interval_secs.max(1));

    let client = http_client()?;

    info!(%url, interval_secs = interval.as_secs(), "keep-alive started, Ctrl-C to stop");
    keepalive::run(&client, &url, interval, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
