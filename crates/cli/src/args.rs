//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pipeline::DocumentType;

/// Default location of the optional configuration file.
pub const DEFAULT_CONFIG_PATH: &str = ".qoe/config.toml";

#[derive(Parser, Debug)]
#[command(
    name = "qoe",
    version,
    about = "Quality-of-earnings adjustment analysis for financial documents",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse a document's extracted text and print the result as JSON
    Analyze(AnalyzeArgs),
    /// Print the document type inferred from a file's name and content
    Classify(ClassifyArgs),
    /// List the adjustment type tags offered to the model
    AdjustmentTypes,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File containing the document's already-extracted text
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long)]
    pub project_name: String,

    #[arg(long)]
    pub client_name: String,

    /// Absolute materiality threshold (defaults to the configured value)
    #[arg(long, value_name = "AMOUNT")]
    pub materiality_amount: Option<f64>,

    /// Materiality as a percentage of earnings (defaults to the configured value)
    #[arg(long, value_name = "PERCENT")]
    pub materiality_percentage: Option<f64>,

    /// Earnings figure the materiality percentage applies to
    #[arg(long, value_name = "AMOUNT")]
    pub earnings_base: Option<f64>,

    /// Skip classification and use this type (gl, p_and_l, payroll, trial_balance, other)
    #[arg(long, value_name = "TYPE")]
    pub document_type: Option<DocumentType>,

    /// Configuration file; a missing file at the default location is ignored
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_parses_document_type() {
        let cli = Cli::try_parse_from([
            "qoe",
            "analyze",
            "pnl.txt",
            "--project-name",
            "Falcon",
            "--client-name",
            "Acme",
            "--document-type",
            "P_AND_L",
            "--materiality-amount",
            "2500",
            "--api-key",
            "sk-test",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.document_type, Some(DocumentType::ProfitAndLoss));
        assert_eq!(args.materiality_amount, Some(2500.0));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_unknown_document_type_is_rejected() {
        let result = Cli::try_parse_from([
            "qoe",
            "analyze",
            "x.txt",
            "--project-name",
            "p",
            "--client-name",
            "c",
            "--document-type",
            "balance_sheet",
            "--api-key",
            "k",
        ]);
        assert!(result.is_err());
    }
}
