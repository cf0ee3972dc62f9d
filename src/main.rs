// src/main.rs
use clap::Parser;
use std::fs::OpenOptions;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cv_tailor::cli::Cli;
use cv_tailor::core::OllamaClient;
use cv_tailor::{AppConfig, PdfOutcome, Pipeline, RunOutcome};

const DEBUG_LOG_FILE: &str = "cv_tailor_debug.log";

fn debug_enabled() -> bool {
    std::env::var("CV_TAILOR_DEBUG")
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "" | "0" | "false"))
        .unwrap_or(false)
}

fn init_logging() {
    let debug = debug_enabled();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    // Debug mode mirrors everything to a JSON log, cleared on startup
    let json_layer = if debug {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(DEBUG_LOG_FILE)
        {
            Ok(file) => Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false),
            ),
            Err(e) => {
                eprintln!("Warning: cannot open {}: {}", DEBUG_LOG_FILE, e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(json_layer)
        .init();
}

async fn run(cli: &Cli) -> cv_tailor::Result<RunOutcome> {
    let config = cli.apply(AppConfig::load(cli.config.as_deref())?);
    let client = OllamaClient::new(&config.inference)?;
    info!("Using model {} at {}", client.model(), config.inference.base_url);
    if !cli.skip_connection_check {
        client.check_connection().await?;
    }

    let mut pipeline = Pipeline::new(&config, &client);
    if cli.skip_pdf {
        pipeline = pipeline.without_pdf();
    }
    pipeline.run(cli.job_source()).await
}

fn print_summary(outcome: &RunOutcome) {
    println!("\n{}", "=".repeat(50));
    println!("GENERATION COMPLETE for {}", outcome.company);
    if !outcome.archetypes.is_empty() {
        println!("Archetypes: {}", outcome.archetypes.join(", "));
    }
    for artifact in &outcome.artifacts {
        println!("{}: {}", artifact.kind.doc_type(), artifact.markdown_path.display());
        match &artifact.pdf {
            PdfOutcome::Converted(engine) => {
                println!("  PDF ({}): {}", engine, artifact.pdf_path.display())
            }
            PdfOutcome::Failed(reason) => println!("  PDF failed: {}", reason),
            PdfOutcome::Skipped => {}
        }
    }
    if !outcome.warnings.is_empty() {
        println!("{} format warning(s), see log", outcome.warnings.len());
    }
    println!("{}", "=".repeat(50));
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(&cli).await {
        Ok(outcome) => {
            print_summary(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error in {}: {}", e.stage(), e);
            ExitCode::FAILURE
        }
    }
}
