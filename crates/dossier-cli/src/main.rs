//! `dossier`: run persona-driven document analyses from the command line.

mod intake;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use dossier_core::{export_file_name, ProcessingResult, ReportSummary, ReportView, WorkflowEvent};
use dossier_runtime::{AnalysisSession, RuntimeConfig};

use crate::intake::{Intake, Samples};
use crate::render::render;

#[derive(Parser, Debug)]
#[command(name = "dossier", version, about = "Persona-driven document analysis")]
struct Cli {
    /// Increase log verbosity (-v for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an analysis from an intake file
    Run(RunArgs),

    /// Check an exported result against the schema and ordering rules
    Validate {
        /// Path to a result JSON export
        path: PathBuf,
    },

    /// Print sample personas and tasks as YAML
    Samples,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Intake file (.yaml, .yml or .json)
    intake: PathBuf,

    /// Write the export here (a directory gets the default file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the export to the current directory under the default name
    #[arg(long)]
    save: bool,

    /// Which view to print
    #[arg(long, default_value_t = ReportView::Overview)]
    view: ReportView,

    /// Runtime config YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible content
    #[arg(long)]
    seed: Option<u64>,

    /// Skip all pacing delays
    #[arg(long)]
    fast: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate { path } => validate(&path),
        Command::Samples => samples(),
    }
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.fast {
        config = config.fast();
    }

    let intake = Intake::from_path(&args.intake)?;
    let offered = intake.documents.len();

    let session = AnalysisSession::spawn(&config, config.synthesizer())?;
    let progress = tokio::spawn(log_progress(session.subscribe().await?));

    let admitted = session.ingest(intake.documents).await?;
    tracing::info!(offered, admitted, "Documents ingested");

    session
        .advance_from_upload()
        .await
        .context("Upload stage rejected the documents")?;
    session
        .submit_persona(intake.persona)
        .await
        .context("Persona stage rejected the persona")?;
    session
        .submit_task(intake.task)
        .await
        .context("Job stage rejected the task")?;

    let result = session.wait_for_result().await.context("Processing failed")?;
    session.shutdown().await?;
    let _ = progress.await;

    println!("{}", render(args.view, &result)?);

    if let Some(path) = export_path(args.output.as_deref(), args.save) {
        result
            .write_to(&path)
            .with_context(|| format!("Failed to write export {}", path.display()))?;
        tracing::info!(path = %path.display(), "Export written");
    }
    Ok(())
}

fn export_path(output: Option<&Path>, save: bool) -> Option<PathBuf> {
    let default_name = || export_file_name(chrono::Utc::now().timestamp_millis());
    match output {
        Some(dir) if dir.is_dir() => Some(dir.join(default_name())),
        Some(file) => Some(file.to_path_buf()),
        None if save => Some(PathBuf::from(default_name())),
        None => None,
    }
}

async fn log_progress(mut events: broadcast::Receiver<WorkflowEvent>) {
    let mut last_decile = 0;
    loop {
        match events.recv().await {
            Ok(WorkflowEvent::PhaseStarted { id, .. }) => {
                tracing::info!(phase = %id, "Phase started")
            }
            Ok(WorkflowEvent::Progress(p)) => {
                let decile = (p.overall / 10.0).floor() as u32;
                if decile > last_decile {
                    last_decile = decile;
                    tracing::info!(progress = %format!("{:.0}%", p.overall), "Processing");
                }
            }
            Ok(WorkflowEvent::Failed { phase_id, reason }) => {
                tracing::error!(phase = %phase_id, reason = %reason, "Phase failed")
            }
            Ok(WorkflowEvent::StageChanged { to, .. }) => {
                tracing::debug!(stage = %to, "Stage changed")
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn validate(path: &Path) -> Result<()> {
    let result = ProcessingResult::from_json_file(path)
        .with_context(|| format!("{} is not a valid result export", path.display()))?;
    let summary = ReportSummary::from_result(&result);

    println!("{}: valid", path.display());
    println!(
        "  {} documents, {} sections, {} key insights, {}% average relevance",
        summary.documents_analyzed,
        summary.sections_extracted,
        summary.key_insights,
        summary.average_relevance
    );
    Ok(())
}

fn samples() -> Result<()> {
    print!("{}", serde_yaml::to_string(&Samples::load())?);
    Ok(())
}
