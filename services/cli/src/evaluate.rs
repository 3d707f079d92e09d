use std::fs;
use std::path::PathBuf;

use clap::Args;
use quality_impact::config::AppConfig;
use quality_impact::error::AppError;
use quality_impact::evaluation::{ActiveSubset, EvaluationModel, EvaluationOutcome};
use quality_impact::model::System;
use quality_impact::quality::{QualityModel, ScopeKind};
use tracing::info;

use crate::cli::ScopeArg;
use crate::demo::{demo_catalog, demo_system};

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Kind of entity to evaluate
    #[arg(long, value_enum, default_value_t = ScopeArg::System)]
    pub(crate) scope: ScopeArg,
    /// Entity id(s) for the scope; a component pair takes two
    #[arg(long = "target")]
    pub(crate) targets: Vec<String>,
    /// Product factor to activate (repeatable). Defaults to every factor applicable to the scope
    #[arg(long = "factor")]
    pub(crate) factors: Vec<String>,
    /// Quality aspect to activate (repeatable). Defaults to every aspect
    #[arg(long = "aspect")]
    pub(crate) aspects: Vec<String>,
    /// Architecture model as JSON; the bundled demo shop is used when omitted
    #[arg(long)]
    pub(crate) system: Option<PathBuf>,
    /// Pretty-print the JSON outcome
    #[arg(long)]
    pub(crate) pretty: bool,
}

impl ScopeArg {
    fn kind(self) -> ScopeKind {
        match self {
            ScopeArg::System => ScopeKind::System,
            ScopeArg::Component => ScopeKind::Component,
            ScopeArg::Pair => ScopeKind::ComponentPair,
            ScopeArg::Infrastructure => ScopeKind::Infrastructure,
            ScopeArg::Trace => ScopeKind::RequestTrace,
        }
    }

    fn expected_targets(self) -> usize {
        match self {
            ScopeArg::System => 0,
            ScopeArg::Pair => 2,
            ScopeArg::Component | ScopeArg::Infrastructure | ScopeArg::Trace => 1,
        }
    }
}

fn load_system(path: Option<PathBuf>) -> Result<System, AppError> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => demo_system(),
    }
}

fn active_subset(
    catalog: &QualityModel,
    scope: ScopeArg,
    factors: &[String],
    aspects: &[String],
) -> Result<ActiveSubset, AppError> {
    if factors.is_empty() && aspects.is_empty() {
        return Ok(ActiveSubset::for_scope_kind(catalog, scope.kind()));
    }
    Ok(ActiveSubset::from_ids(catalog, factors, aspects)?)
}

pub(crate) fn evaluate(
    catalog: &QualityModel,
    system: &System,
    args: &EvaluateArgs,
    config: &AppConfig,
) -> Result<EvaluationOutcome, AppError> {
    let expected = args.scope.expected_targets();
    if args.targets.len() != expected {
        return Err(AppError::Usage(format!(
            "{} scope takes {} --target value(s), got {}",
            args.scope.kind(),
            expected,
            args.targets.len()
        )));
    }

    let active = active_subset(catalog, args.scope, &args.factors, &args.aspects)?;
    let targets = &args.targets;
    let model = match args.scope {
        ScopeArg::System => EvaluationModel::for_system(catalog, system, active),
        ScopeArg::Component => EvaluationModel::for_component(catalog, system, &targets[0], active)?,
        ScopeArg::Pair => {
            EvaluationModel::for_component_pair(catalog, system, &targets[0], &targets[1], active)?
        }
        ScopeArg::Infrastructure => {
            EvaluationModel::for_infrastructure(catalog, system, &targets[0], active)?
        }
        ScopeArg::Trace => {
            EvaluationModel::for_request_trace(catalog, system, &targets[0], active)?
        }
    };

    Ok(model.with_settings(&config.evaluation).evaluate()?)
}

pub(crate) fn run_evaluation(args: EvaluateArgs, config: &AppConfig) -> Result<(), AppError> {
    let catalog = demo_catalog(&config.evaluation)?;
    let system = load_system(args.system.clone())?;

    info!(
        environment = ?config.environment,
        system = %system.name,
        scope = %args.scope.kind(),
        "evaluating architecture"
    );

    let outcome = evaluate(&catalog, &system, &args, config)?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{rendered}");
    Ok(())
}
