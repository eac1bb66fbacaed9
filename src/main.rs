mod dedup;
mod error;
mod generate;
mod mask;
mod metrics;
mod pipeline;
mod settings;
mod table;
mod text;
mod xlsx;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, info_span};

use generate::orchestrator::{results_table, summarize};
use generate::{GeminiClient, GenerationOrchestrator, ThreadSleep};
use error::PipelineError;
use mask::{FixedSelector, RandomSelector};
use pipeline::ContentPipeline;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "promo_processor",
    about = "Normalize promo spreadsheets and generate marketing copy"
)]
struct Cli {
    /// Settings file (default: promo.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split URLs out of the content sheet, add the promo prefix, dedup
    Content {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Strip query strings from the url sheet and dedup
    Urls {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Normalize content, then request marketing copy for every row
    Generate {
        /// Read already-normalized rows from this sheet instead
        #[arg(long)]
        source: Option<PathBuf>,
        /// Where to write the id/request/content sheet
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max rows to send (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Run the content and url stages
    All,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error{}: {e:#}", error_kind(&e));
        std::process::exit(1);
    }
}

fn error_kind(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<PipelineError>() {
        Some(pe) if pe.is_configuration() => " (configuration)",
        Some(pe) if pe.is_io() => " (io)",
        _ => "",
    }
}

fn run(cli: Cli) -> Result<()> {
    let t0 = Instant::now();
    let mut settings = settings::load(cli.config.as_deref()).context("loading settings")?;
    let run_id = metrics::new_run_id();
    let _span = info_span!("run", %run_id).entered();
    info!(settings_loaded = ?settings, "starting promo processor");

    match cli.command {
        Commands::Content { input, output } => {
            override_path(&mut settings.content_in, input);
            override_path(&mut settings.content_out, output);
            let out = content_stage(&settings)?;
            println!("Saved {} rows to {:?}", out.len(), settings.content_out);
        }
        Commands::Urls { input, output } => {
            override_path(&mut settings.urls_in, input);
            override_path(&mut settings.urls_out, output);
            let out = url_stage(&settings)?;
            println!("Saved {} urls to {:?}", out.len(), settings.urls_out);
        }
        Commands::Generate {
            source,
            output,
            limit,
        } => {
            override_path(&mut settings.results_out, output);
            generate_stage(&settings, source.as_deref(), limit)?;
        }
        Commands::All => {
            let content = content_stage(&settings)?;
            println!("Saved {} rows to {:?}", content.len(), settings.content_out);
            let urls = url_stage(&settings)?;
            println!("Saved {} urls to {:?}", urls.len(), settings.urls_out);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn override_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn content_stage(settings: &Settings) -> Result<table::Table> {
    let pipeline = match settings.prefix_index {
        Some(i) => ContentPipeline::with_selector(
            &settings.prefixes,
            &mut FixedSelector(i),
            settings.strip_policy,
        )?,
        None => ContentPipeline::with_selector(
            &settings.prefixes,
            &mut RandomSelector,
            settings.strip_policy,
        )?,
    };
    pipeline::run_content_stage(&pipeline, &settings.content_in, &settings.content_out)
        .context("content stage")
}

fn url_stage(settings: &Settings) -> Result<table::Table> {
    pipeline::run_url_stage(&settings.urls_in, &settings.urls_out).context("url stage")
}

fn generate_stage(settings: &Settings, source: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let normalized = match source {
        Some(path) => xlsx::read_table(path)?,
        None => content_stage(settings)?,
    };
    let mut rows = pipeline::content_rows(&normalized)?;
    if let Some(n) = limit {
        rows.truncate(n);
    }
    if rows.is_empty() {
        println!("No content rows to send.");
        return Ok(());
    }

    let api_key = settings.require_api_key()?;
    let client = GeminiClient::new(
        &settings.api_base,
        &settings.model,
        api_key,
        Duration::from_secs(settings.request_timeout_secs),
    )?;
    let delay = Duration::from_secs(settings.request_delay_secs);
    info!(
        endpoint = client.endpoint(),
        rows = rows.len(),
        delay_secs = settings.request_delay_secs,
        "starting generation batch"
    );

    let results = GenerationOrchestrator::new(client, ThreadSleep, delay)
        .with_progress(true)
        .run(&rows);
    xlsx::write_table(&settings.results_out, &results_table(&results))
        .context("writing generation results")?;

    let summary = summarize(&results);
    println!(
        "Saved {} results to {:?} ({} ok, {} blocked, {} failed).",
        results.len(),
        settings.results_out,
        summary.succeeded,
        summary.blocked,
        summary.failed
    );
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
