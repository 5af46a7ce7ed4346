//! ClassInsight - grade statistics and AI insights for teachers
//!
//! A CLI tool that computes class, student and roster statistics from a
//! school dataset, asks a local Ollama model for pedagogical insights, and
//! saves the merged analyses in SQLite.
//!
//! Exit codes:
//!   0 - Success (new or saved analysis shown)
//!   1 - Runtime error (config, dataset, database, unknown id, etc.)
//!   2 - Analysis could not be generated (the last saved one is still shown)

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod insight;
mod models;
mod pipeline;
mod report;
mod store;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::Config;
use dataset::Dataset;
use error::InsightError;
use indicatif::{ProgressBar, ProgressStyle};
use insight::{ClientConfig, OllamaClient};
use models::{Class, GradingPolicy, Period, Student};
use pipeline::{InsightService, Regeneration};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use store::AnalysisStore;
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

    // Initialize logging
    init_logging(&args);

    info!("ClassInsight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            // Empty data and missing periods are expected conditions, not crashes.
            if let Some(insight_error) = e.downcast_ref::<InsightError>() {
                warn!("Analysis not generated: {}", insight_error);
                eprintln!("\n⚠️  {}", insight_error.user_message());
                std::process::exit(2);
            }
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .classinsight.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!(
        "✅ Created {} with default settings.",
        config::CONFIG_FILE_NAME
    );
    println!("   Edit it to customize the dataset, database, model and grading scale.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load the merged config and the dataset it points at.
fn prepare(args: &Args) -> Result<(Config, GradingPolicy, Dataset)> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    let policy = GradingPolicy::from(&config.grading);
    let dataset = Dataset::load(&config.general.dataset, &policy)?;
    Ok((config, policy, dataset))
}

/// Run the selected command. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::InitConfig => {
            handle_init_config()?;
            Ok(0)
        }
        Command::Stats { class, period } => {
            let (_, policy, dataset) = prepare(&args)?;
            let class = find_class(&dataset, class)?;
            let period = select_period(&dataset, period)?;

            let analysis = analysis::build_class_analysis(
                class,
                period,
                &dataset.roster(class.id),
                &dataset.grades,
                &dataset.subjects,
                &policy,
            )?;

            let content = match args.format {
                OutputFormat::Json => report::generate_json(&analysis)?,
                OutputFormat::Markdown => report::generate_stats_markdown(&analysis),
            };
            report::write_output(&content, args.output.as_deref())?;
            Ok(0)
        }
        Command::Class {
            class,
            period,
            force,
        } => {
            let (config, _, dataset) = prepare(&args)?;
            let class = find_class(&dataset, class)?;
            let period = select_period(&dataset, period)?;
            let service = open_service(&config)?;

            let outcome = with_spinner(
                &args,
                format!("Analyzing class {} in {}...", class.name, period.name),
                service.class_report(config.general.user_id, &dataset, class, period, force),
            )
            .await?;

            finish(&args, outcome, report::generate_class_markdown)
        }
        Command::Student { student, force } => {
            let (config, _, dataset) = prepare(&args)?;
            let student = find_student(&dataset, student)?;
            let service = open_service(&config)?;

            let outcome = with_spinner(
                &args,
                format!("Analyzing student {}...", student.name),
                service.student_report(config.general.user_id, &dataset, student, force),
            )
            .await?;

            finish(&args, outcome, report::generate_student_markdown)
        }
        Command::Roster { force } => {
            let (config, _, dataset) = prepare(&args)?;
            let service = open_service(&config)?;

            let outcome = with_spinner(
                &args,
                "Summarizing classes...".to_string(),
                service.roster_report(config.general.user_id, &dataset, force),
            )
            .await?;

            finish(&args, outcome, report::generate_roster_markdown)
        }
    }
}

/// Open the analysis store and connect the model client.
fn open_service(config: &Config) -> Result<InsightService<OllamaClient>> {
    let store = AnalysisStore::open(&config.general.database).with_context(|| {
        format!(
            "Failed to open database: {}",
            config.general.database.display()
        )
    })?;

    let client = OllamaClient::new(ClientConfig::from(&config.model))?;

    Ok(InsightService::new(client, store, config))
}

fn find_class(dataset: &Dataset, id: u64) -> Result<&Class> {
    dataset
        .class(id)
        .with_context(|| format!("Class {} not found in dataset", id))
}

fn find_student(dataset: &Dataset, id: u64) -> Result<&Student> {
    dataset
        .student(id)
        .with_context(|| format!("Student {} not found in dataset", id))
}

/// The requested period, or the latest configured one.
fn select_period(dataset: &Dataset, id: Option<u64>) -> Result<&Period> {
    match id {
        Some(id) => dataset
            .period(id)
            .with_context(|| format!("Period {} not found in dataset", id)),
        None => {
            let period = analysis::latest_period(&dataset.periods)?;
            info!("No period given, using the latest: {}", period);
            Ok(period)
        }
    }
}

/// Show a spinner on stderr while `task` runs.
async fn with_spinner<F: Future>(args: &Args, message: String, task: F) -> F::Output {
    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let output = task.await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    output
}

/// Print the outcome of a regeneration and pick the exit code.
fn finish<T: Serialize>(
    args: &Args,
    outcome: Regeneration<T>,
    render_markdown: fn(&T) -> String,
) -> Result<i32> {
    match &outcome {
        Regeneration::Cached { saved_at, .. } => {
            if !args.quiet {
                eprintln!(
                    "💾 Showing analysis saved at {} (use --force to regenerate).",
                    saved_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        Regeneration::Generated(_) => {
            if !args.quiet {
                eprintln!("✅ New analysis generated and saved.");
            }
        }
        Regeneration::FailedTransient { error, previous }
        | Regeneration::FailedPermanent { error, previous } => {
            eprintln!("⚠️  {}", error.user_message());
            if previous.is_some() {
                eprintln!("   Showing the last saved analysis instead.");
            }
        }
    }

    if let Some(report) = outcome.report() {
        let content = match args.format {
            OutputFormat::Json => report::generate_json(report)?,
            OutputFormat::Markdown => render_markdown(report),
        };
        report::write_output(&content, args.output.as_deref())?;

        if let Some(ref path) = args.output {
            if !args.quiet {
                eprintln!("📝 Report saved to: {}", path.display());
            }
        }
    }

    Ok(if outcome.error().is_some() { 2 } else { 0 })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
