use clap::{Parser, Subcommand, ValueEnum};
use quality_impact::config::AppConfig;
use quality_impact::error::AppError;
use quality_impact::telemetry;

use crate::demo::{run_catalog, CatalogArgs};
use crate::evaluate::{run_evaluation, EvaluateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "quality-impact",
    about = "Evaluate product factors and quality aspects against an architecture model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the demo catalog against an architecture model and print the outcome as JSON
    Evaluate(EvaluateArgs),
    /// List the factors, aspects and impacts of the demo catalog
    Catalog(CatalogArgs),
}

/// Scope kinds selectable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ScopeArg {
    #[default]
    System,
    Component,
    Pair,
    Infrastructure,
    Trace,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Evaluate(args) => run_evaluation(args, &config),
        Command::Catalog(args) => run_catalog(args, &config),
    }
}
