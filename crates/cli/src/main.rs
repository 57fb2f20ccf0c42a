//! `qoe` command-line entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `.qoe/config.toml` (optional) and the
//!    command-line arguments.
//! 2. **Wire observability**: install `tracing-subscriber` with a JSON layer
//!    and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: build the [`llm::OpenAiProvider`], the
//!    shared [`nodes::AdjustmentPipeline`], and the [`ingest::DocumentAnalyzer`].
//! 4. **Run the subcommand** and print its result on stdout.
//!
//! A failed analysis is still printed (with `status: "failed"`); the process
//! exits non-zero only for configuration and I/O errors.

mod args;
mod config;
mod observability;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ingest::{classify_document, DocumentAnalyzer, ExtractedDocument};
use llm::{OpenAiProvider, ProviderConfig};
use nodes::AdjustmentPipeline;
use pipeline::{
    AdjustmentType, ClientName, MaterialityAmount, MaterialityPercentage, ProjectContext,
    ProjectName,
};
use tracing::info;

use crate::args::{AnalyzeArgs, ClassifyArgs, Cli, Command, DEFAULT_CONFIG_PATH};
use crate::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => analyze(args).await,
        Command::Classify(args) => classify(args),
        Command::AdjustmentTypes => {
            for kind in AdjustmentType::ALL {
                println!("{kind}");
            }
            Ok(())
        }
    }
}

async fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config_path = args
        .config
        .as_deref()
        .unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    let config = CliConfig::load(config_path, args.config.is_some())?;
    let _telemetry = observability::init(&config.telemetry)?;
    let generation = config.generation_settings()?;
    info!(
        config = %config_path.display(),
        model = generation.model.as_str(),
        file = %args.file.display(),
        "starting document analysis"
    );

    let project = project_context(&args, &config)?;
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let mut document = ExtractedDocument::new(file_name(&args.file), text);
    if let Some(kind) = args.document_type {
        document = document.with_document_type(kind);
    }

    let provider = OpenAiProvider::new(
        ProviderConfig::new(args.api_key.clone())
            .with_base_url(config.llm.base_url.clone())
            .with_request_timeout(Duration::from_secs(config.llm.request_timeout_secs))
            .with_generation(generation),
    )?;
    let pipeline = AdjustmentPipeline::new(Arc::new(provider), config.pipeline_config()?)?;
    let analyzer = DocumentAnalyzer::new(Arc::new(pipeline));

    let analysis = analyzer.analyze(document, project).await;
    info!(
        status = ?analysis.status,
        suggestions = analysis.adjustments.len(),
        degradations = analysis.degradations.len(),
        "document analysis finished"
    );
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn classify(args: ClassifyArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    println!("{}", classify_document(&file_name(&args.file), &text));
    Ok(())
}

fn project_context(args: &AnalyzeArgs, config: &CliConfig) -> Result<ProjectContext> {
    let project_name =
        ProjectName::new(args.project_name.clone()).context("--project-name must not be blank")?;
    let client_name =
        ClientName::new(args.client_name.clone()).context("--client-name must not be blank")?;
    let amount = args
        .materiality_amount
        .unwrap_or(config.project.materiality_amount);
    let percentage = args
        .materiality_percentage
        .unwrap_or(config.project.materiality_percentage);

    let mut project = ProjectContext::new(
        project_name,
        client_name,
        MaterialityAmount::new(amount)
            .with_context(|| format!("materiality amount {amount} must be a non-negative number"))?,
        MaterialityPercentage::new(percentage)
            .with_context(|| format!("materiality percentage {percentage} must be within 0-100"))?,
    );
    if let Some(base) = args.earnings_base {
        project = project.with_earnings_base(base);
    }
    Ok(project)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
