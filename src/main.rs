//! Company-Miner main entry point
//!
//! This is the command-line interface for the Company-Miner scraping pipeline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use company_miner::analytics::{register_measurements, AnalyticsClient, NormalizationMap};
use company_miner::config::{load_config_with_hash, Config};
use company_miner::orchestrator::{collect_companies, process_companies, CompaniesRequest};
use company_miner::Orchestrator;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Company-Miner: company profile mining through a browser-automation platform
///
/// Company-Miner launches remote scraping agents, waits for them under a time
/// budget, validates their output and forwards the records to analytics.
#[derive(Parser, Debug)]
#[command(name = "company-miner")]
#[command(version = "1.0.0")]
#[command(about = "Company profile mining through a browser-automation platform", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the companies of a request file and forward them to analytics
    Scrape {
        /// JSON file with `task_id` and `companies`
        #[arg(long, value_name = "FILE")]
        request: PathBuf,

        /// Bearer token for the analytics service
        #[arg(long)]
        token: Option<String>,

        /// Print the result without contacting analytics
        #[arg(long)]
        no_forward: bool,
    },

    /// Search for company profiles matching a query
    Discover {
        query: String,
    },

    /// Register the source's measurements with analytics
    Initialize {
        /// Source module id assigned by analytics
        #[arg(long)]
        source_id: String,

        /// Bearer token for the analytics service
        #[arg(long)]
        token: String,
    },

    /// Validate the configuration and show what would be used
    DryRun,
}

/// Output of the `initialize` command
#[derive(Serialize)]
struct Registration {
    frequency: String,
    normalization_map: NormalizationMap,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Scrape {
            request,
            token,
            no_forward,
        } => handle_scrape(config, &request, token.as_deref(), no_forward).await,
        Command::Discover { query } => handle_discover(config, &query).await,
        Command::Initialize { source_id, token } => {
            handle_initialize(&config, &source_id, &token).await
        }
        Command::DryRun => {
            handle_dry_run(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("company_miner=info,warn"),
            1 => EnvFilter::new("company_miner=debug,info"),
            2 => EnvFilter::new("company_miner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancels remote waits on Ctrl-C
fn cancel_on_interrupt() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, abandoning the current run");
            let _ = cancel_tx.send(true);
        }
    });
    cancel_rx
}

/// Handles the scrape command
async fn handle_scrape(
    config: Config,
    request_path: &Path,
    token: Option<&str>,
    no_forward: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request file {}", request_path.display()))?;
    let request: CompaniesRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid request file {}", request_path.display()))?;

    tracing::info!(
        "Task {}: {} companies requested",
        request.task_id,
        request.companies.len()
    );

    let analytics = if no_forward {
        None
    } else {
        let Some(token) = token else {
            bail!("--token is required unless --no-forward is given");
        };
        Some((AnalyticsClient::new(&config.analytics)?, token))
    };

    let orchestrator = Orchestrator::new(config)?.with_cancellation(cancel_on_interrupt());

    let result = match analytics {
        Some((client, token)) => process_companies(&orchestrator, &client, token, &request)
            .await
            .context("Failed to report completion to analytics")?,
        None => collect_companies(&orchestrator, &request).await,
    };

    print_json(&result)
}

/// Handles the discover command
async fn handle_discover(config: Config, query: &str) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(config)?.with_cancellation(cancel_on_interrupt());

    match orchestrator.discover(query).await {
        Ok(companies) => print_json(&companies),
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the initialize command
async fn handle_initialize(config: &Config, source_id: &str, token: &str) -> anyhow::Result<()> {
    let client = AnalyticsClient::new(&config.analytics)?;
    let mut map = NormalizationMap::company(&config.source.name);

    register_measurements(&client, token, &mut map, source_id)
        .await
        .context("Failed to register measurements")?;

    print_json(&Registration {
        frequency: config.source.frequency.clone(),
        normalization_map: map,
    })
}

/// Handles the dry-run command: validates config and shows what would be used
fn handle_dry_run(config: &Config) {
    println!("=== Company-Miner Dry Run ===\n");

    println!("Platform:");
    println!("  Launch endpoint: {}", config.platform.launch_endpoint);
    println!("  Fetch endpoint: {}", config.platform.fetch_endpoint);
    println!("  Container endpoint: {}", config.platform.container_endpoint);
    println!("  Storage template: {}", config.platform.storage_template);
    println!(
        "  Session cookie: {}",
        if config.platform.session_cookie.is_some() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nAgents:");
    println!("  Company scraper: {}", config.agents.company_scraper);
    println!("  Discovery: {}", config.agents.discovery);
    println!("  Output filename: {}", config.agents.output_filename);

    println!("\nPolling:");
    println!("  Base interval: {}s", config.polling.base_interval_secs);
    println!(
        "  Retry delays: {}s (HTTP status), {}s (timeout), {}s (other)",
        config.polling.http_error_delay_secs,
        config.polling.timeout_delay_secs,
        config.polling.unexpected_error_delay_secs
    );
    println!("  Maximum runtime: {}s", config.polling.maximum_runtime_secs);

    println!("\nSource:");
    println!("  Name: {}", config.source.name);
    println!("  Domain marker: {}", config.source.domain_marker);
    println!("  URL channels: {}", config.source.url_channels.join(", "));
    println!("  Frequency: {}", config.source.frequency);

    println!("\nAnalytics:");
    println!("  Base URL: {}", config.analytics.base_url);

    println!("\n✓ Configuration is valid");
}
