mod artifacts;
mod config;
mod decision;
mod errors;
mod evidence;
mod llm_client;
mod models;
mod pipeline;
mod roster;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, FailurePolicy};
use crate::evidence::{stage_documents, PdfiumRasterizer};
use crate::llm_client::{LlmClient, ModelSelection};
use crate::pipeline::{run_batch, BatchOptions, Services};
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "resolver",
    about = "Drafts scholarship resolution proposals from an applicant roster and supporting PDFs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one batch from local files and exit
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Roster workbook (.xlsx)
    #[arg(long)]
    roster: PathBuf,
    /// Applicant documents: a directory or a .zip, one folder per applicant
    #[arg(long)]
    documents: Option<PathBuf>,
    /// Output directory (defaults to OUTPUT_DIR)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Override DECISION_FAILURE_POLICY (fail-fast | best-effort)
    #[arg(long)]
    policy: Option<FailurePolicy>,
    /// Override DECISION_CONCURRENCY
    #[arg(long)]
    concurrency: Option<usize>,
    /// Ignore any checkpoint left by an earlier, interrupted run
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resolver v{}", env!("CARGO_PKG_VERSION"));

    let services = build_services(&config)?;

    match cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(config, services, args).await,
        Command::Run(args) => run(config, services, args).await,
    }
}

fn build_services(config: &Config) -> Result<Services> {
    let llm = Arc::new(
        LlmClient::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            ModelSelection {
                decision: config.decision_model.clone(),
                vision: config.vision_model.clone(),
            },
        )
        .context("failed to build LLM client")?,
    );
    info!(
        "LLM client initialized (decision model: {}, vision model: {})",
        llm.models().decision,
        llm.models().vision
    );

    let rasterizer = PdfiumRasterizer::new(
        config.pdfium_library_path.as_deref(),
        config.render_target_width,
    )
    .context("failed to bind the pdfium library (set PDFIUM_LIBRARY_PATH)")?;
    info!("Pdfium rasterizer ready (target width {}px)", config.render_target_width);

    Ok(Services {
        rasterizer: Arc::new(rasterizer),
        renderer: llm.clone(),
        oracle: llm,
    })
}

async fn serve(config: Config, services: Services, args: ServeArgs) -> Result<()> {
    let port = args.port.unwrap_or(config.port);
    let state = AppState {
        config,
        services,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the intake UI has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run(config: Config, services: Services, args: RunArgs) -> Result<()> {
    let staged = args
        .documents
        .as_deref()
        .map(stage_documents)
        .transpose()
        .context("failed to stage applicant documents")?;

    let concurrency = args.concurrency.unwrap_or(config.decision_concurrency).max(1);
    let options = BatchOptions {
        policy: args.policy.unwrap_or(config.failure_policy),
        concurrency,
        fresh: args.fresh,
    };
    let output_dir = args.output.unwrap_or(config.output_dir);

    let summary = run_batch(&args.roster, staged, &output_dir, &services, &options)
        .await
        .with_context(|| format!("batch for {} failed", args.roster.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
