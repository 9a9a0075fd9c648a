//! kpdash - Key-point analysis dashboard
//!
//! A CLI tool that ranks free-text records by argument quality, clusters
//! the best of them into key-points with a remote analysis service, links
//! the matched sentences to Wikipedia concepts and renders the results as
//! a text dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (configuration, dataset, remote service, join, selection)

mod analysis;
mod cli;
mod config;
mod dataset;
mod gateway;
mod models;
mod report;
mod session;

use anyhow::{bail, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use gateway::{AnalysisService, DebaterClient, Gateway};
use models::Dashboard;
use session::Session;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can raise verbosity
    let (mut config, config_path) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("kpdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    if let Err(e) = run(args, config).await {
        error!("Dashboard failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .kpdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the topic, dataset columns, and service endpoints.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the dashboard.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the dashboard workflow.
async fn run(args: Args, config: Config) -> Result<()> {
    if args.dry_run {
        return handle_dry_run(&config);
    }

    let api_key = match config.api_key() {
        Some(key) => key.to_string(),
        None => bail!(
            "No API key configured. Pass --api-key, set DEBATER_API_KEY, or set api.api_key in {}",
            CONFIG_FILE_NAME
        ),
    };

    if config.analysis.topic.trim().is_empty() {
        warn!("No topic configured; argument quality is scored against an empty topic");
    }

    let client = DebaterClient::new(&config.api, &api_key)
        .context("Failed to create analysis service client")?;
    let gateway = Gateway::new(client, config.analysis.poll_interval())
        .with_progress(config.general.progress);

    let bar_width = config.report.bar_width;
    let session = Session::open(gateway, config)?;

    eprintln!("🔬 Running key point analysis...");
    let dashboard = session.render(args.keypoint.as_deref()).await?;

    if let Some(ref path) = args.export_matches {
        let analysis = session.analyze().await?;
        report::export_matches(&analysis.rows, path)?;
        eprintln!("💾 Exported {} matches to {}", analysis.rows.len(), path.display());
    }

    if args.interactive {
        println!("{}", report::generate_markdown_report(&dashboard, bar_width));
        return run_interactive(&session, dashboard, bar_width).await;
    }

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard, bar_width),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write dashboard to {}", path.display()))?;
            eprintln!("\n✅ Dashboard saved to: {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Read key-point selections from stdin and print their charts.
///
/// A selection is a 1-based option number or a key-point name. An empty
/// line, `q`, or end of input ends the session.
async fn run_interactive<S: AnalysisService>(
    session: &Session<S>,
    dashboard: Dashboard,
    bar_width: usize,
) -> Result<()> {
    let keypoints = dashboard.keypoints;
    if keypoints.is_empty() {
        eprintln!("No key points to select.");
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("Select a key point [1-{}, q to quit]: ", keypoints.len());

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let selection = match parse_selection(&line, &keypoints) {
            Selection::Quit => break,
            Selection::OutOfRange(n) => {
                eprintln!("No key point numbered {}.", n);
                continue;
            }
            Selection::Keypoint(name) => name,
        };

        match session.render(Some(&selection)).await {
            Ok(Dashboard {
                selected: Some(view),
                ..
            }) => println!("{}", report::generate_selection_section(&view, bar_width)),
            Ok(_) => {}
            Err(e) => eprintln!("❌ {:#}", e),
        }
    }

    Ok(())
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Selection {
    Quit,
    /// A key-point name, either typed or looked up by number.
    Keypoint(String),
    OutOfRange(usize),
}

/// Interpret a selector line against the numbered `keypoints` options.
///
/// Names are passed through unchecked; the render pass rejects unknown ones.
fn parse_selection(line: &str, keypoints: &[String]) -> Selection {
    let input = line.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("q") {
        return Selection::Quit;
    }

    match input.parse::<usize>() {
        Ok(n) if (1..=keypoints.len()).contains(&n) => {
            Selection::Keypoint(keypoints[n - 1].clone())
        }
        Ok(n) => Selection::OutOfRange(n),
        Err(_) => Selection::Keypoint(input.to_string()),
    }
}

/// Handle --dry-run: load the dataset and report what would be sent.
fn handle_dry_run(config: &Config) -> Result<()> {
    eprintln!("\n🔍 Dry run: loading dataset (no service calls)...\n");

    let records = dataset::load(&config.dataset).with_context(|| {
        format!("Failed to load dataset {}", config.dataset.path.display())
    })?;

    let sent = records.len().min(config.analysis.top_k);
    println!("   Dataset: {}", config.dataset.path.display());
    println!("   Complete records: {}", records.len());
    println!("   Topic: {}", config.analysis.topic);
    println!(
        "   Would score {} sentences and send the top {} to domain '{}'",
        records.len(),
        sent,
        config.analysis.domain
    );
    println!(
        "   Key point settings: mapping threshold {}, {} key points",
        config.analysis.mapping_threshold, config.analysis.n_top_kps
    );

    eprintln!("\n✅ Dry run complete. No service calls were made.");
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Returns the path the configuration came from, if any. A config file
/// that exists but cannot be parsed is an error.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(CONFIG_FILE_NAME)))),
        None => Ok((Config::default(), None)),
    }
}
