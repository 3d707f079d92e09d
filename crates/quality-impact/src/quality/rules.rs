//! Evaluation rules and numeric combination functions, registered by id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::measure::MeasureValue;
use super::node::{ProductFactor, QualityAspect};
use super::result::{EvaluationResult, ImpactAggregate, Tendency};
use super::weight::{FactorLevel, ImpactWeight};
use crate::evaluation::{EvaluatedProductFactor, EvaluationError, ImpactingPath};

pub type RuleFn =
    Arc<dyn Fn(&RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> + Send + Sync>;
pub type CombinationFn = Arc<dyn Fn(&[ImpactWeight]) -> f64 + Send + Sync>;

/// The generic rule every catalog ships.
pub const AGGREGATE_IMPACTS: &str = "aggregateImpacts";
/// Default combination: mean of the five-point scores, ignoring n/a.
pub const MEAN_IMPACT_SCORE: &str = "meanImpactScore";

/// Registry mapping evaluation-ids to rules and combination-ids to combination functions.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, RuleFn>,
    combinations: BTreeMap<String, CombinationFn>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `aggregateImpacts` and `meanImpactScore`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_rule(AGGREGATE_IMPACTS, aggregate_impacts)
            .register_combination(MEAN_IMPACT_SCORE, mean_impact_score);
        registry
    }

    pub fn register_rule<F>(&mut self, id: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&RuleContext<'_>) -> Result<EvaluationResult, EvaluationError>
            + Send
            + Sync
            + 'static,
    {
        self.rules.insert(id.into(), Arc::new(rule));
        self
    }

    pub fn register_combination<F>(&mut self, id: impl Into<String>, combination: F) -> &mut Self
    where
        F: Fn(&[ImpactWeight]) -> f64 + Send + Sync + 'static,
    {
        self.combinations.insert(id.into(), Arc::new(combination));
        self
    }

    pub fn rule(&self, id: &str) -> Option<&RuleFn> {
        self.rules.get(id)
    }

    pub fn combination(&self, id: &str) -> Option<&CombinationFn> {
        self.combinations.get(id)
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("combinations", &self.combinations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Node a rule is invoked for.
#[derive(Debug, Clone, Copy)]
pub enum RuleSubject<'a> {
    Factor(&'a ProductFactor),
    Aspect(&'a QualityAspect),
}

impl<'a> RuleSubject<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            RuleSubject::Factor(factor) => &factor.id,
            RuleSubject::Aspect(aspect) => &aspect.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            RuleSubject::Factor(factor) => &factor.name,
            RuleSubject::Aspect(aspect) => &aspect.name,
        }
    }
}

/// Read-only parameter bundle handed to a rule.
pub struct RuleContext<'a> {
    subject: RuleSubject<'a>,
    impacts: &'a [ImpactingPath],
    precondition: Option<&'a Value>,
    impacts_interpretation: Option<&'a str>,
    combination: Option<&'a CombinationFn>,
    measures: &'a BTreeMap<String, MeasureValue>,
    factors: &'a BTreeMap<String, EvaluatedProductFactor>,
}

impl<'a> RuleContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        subject: RuleSubject<'a>,
        impacts: &'a [ImpactingPath],
        precondition: Option<&'a Value>,
        impacts_interpretation: Option<&'a str>,
        combination: Option<&'a CombinationFn>,
        measures: &'a BTreeMap<String, MeasureValue>,
        factors: &'a BTreeMap<String, EvaluatedProductFactor>,
    ) -> Self {
        Self {
            subject,
            impacts,
            precondition,
            impacts_interpretation,
            combination,
            measures,
            factors,
        }
    }

    pub fn subject(&self) -> RuleSubject<'a> {
        self.subject
    }

    /// Impacting paths reaching the subject from active, already evaluated factors.
    pub fn impacts(&self) -> &'a [ImpactingPath] {
        self.impacts
    }

    pub fn impact_weights(&self) -> Vec<ImpactWeight> {
        self.impacts.iter().map(|path| path.weight).collect()
    }

    pub fn precondition(&self) -> Option<&'a Value> {
        self.precondition
    }

    pub fn impacts_interpretation(&self) -> Option<&'a str> {
        self.impacts_interpretation
    }

    pub fn measures(&self) -> &'a BTreeMap<String, MeasureValue> {
        self.measures
    }

    pub fn measure(&self, id: &str) -> Result<&'a MeasureValue, EvaluationError> {
        self.measures
            .get(id)
            .ok_or_else(|| EvaluationError::MissingMeasureValue {
                node: self.subject.id().to_string(),
                measure: id.to_string(),
            })
    }

    /// Numeric value of a measure; `None` when the measure is n/a.
    pub fn numeric_measure(&self, id: &str) -> Result<Option<f64>, EvaluationError> {
        match self.measure(id)? {
            MeasureValue::Number(value) => Ok(Some(*value)),
            MeasureValue::NotApplicable => Ok(None),
            MeasureValue::Enumerated(value) => Err(self.fail(format!(
                "measure `{id}` is enumerated (`{value}`) but a number was expected"
            ))),
        }
    }

    /// Record of an already evaluated factor. Rules should only look up their impacting factors.
    pub fn evaluated_factor(&self, id: &str) -> Option<&'a EvaluatedProductFactor> {
        self.factors.get(id)
    }

    /// Combine weights with the bound combination, or the mean score when none is bound.
    pub fn combine(&self, weights: &[ImpactWeight]) -> Result<f64, EvaluationError> {
        let score = match self.combination {
            Some(combination) => combination(weights),
            None => mean_impact_score(weights),
        };

        if score.is_finite() {
            Ok(score)
        } else {
            Err(self.fail(format!("combination produced non-finite score {score}")))
        }
    }

    pub fn fail(&self, message: impl Into<String>) -> EvaluationError {
        EvaluationError::Rule {
            node: self.subject.id().to_string(),
            message: message.into(),
        }
    }
}

pub fn mean_impact_score(weights: &[ImpactWeight]) -> f64 {
    let scores: Vec<f64> = weights
        .iter()
        .filter_map(|weight| weight.score())
        .map(f64::from)
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Combine the weights of every impacting path into a tendency.
pub fn aggregate_impacts(context: &RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> {
    let impacts = context.impact_weights();
    if impacts.is_empty() {
        return Ok(EvaluationResult::NotApplicable);
    }

    if impacts
        .iter()
        .all(|weight| *weight == ImpactWeight::NotApplicable)
    {
        return Ok(EvaluationResult::Aggregate(ImpactAggregate {
            tendency: Tendency::NotApplicable,
            impacts,
        }));
    }

    let score = context.combine(&impacts)?;
    Ok(EvaluationResult::Aggregate(ImpactAggregate {
        tendency: Tendency::classify(score),
        impacts,
    }))
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    AtMost(f64),
    Below(f64),
}

impl Bound {
    fn admits(self, value: f64) -> bool {
        match self {
            Bound::AtMost(limit) => value <= limit,
            Bound::Below(limit) => value < limit,
        }
    }
}

/// Ordered bands mapping a number onto a [`FactorLevel`]; the first admitting band wins.
#[derive(Debug, Clone)]
pub struct LevelBands {
    bands: Vec<(Bound, FactorLevel)>,
    otherwise: FactorLevel,
}

impl LevelBands {
    pub fn new(otherwise: FactorLevel) -> Self {
        Self {
            bands: Vec::new(),
            otherwise,
        }
    }

    pub fn at_most(mut self, limit: f64, level: FactorLevel) -> Self {
        self.bands.push((Bound::AtMost(limit), level));
        self
    }

    pub fn below(mut self, limit: f64, level: FactorLevel) -> Self {
        self.bands.push((Bound::Below(limit), level));
        self
    }

    pub fn classify(&self, value: f64) -> FactorLevel {
        self.bands
            .iter()
            .find(|(bound, _)| bound.admits(value))
            .map(|(_, level)| *level)
            .unwrap_or(self.otherwise)
    }
}

/// Rule mapping a single numeric measure through `bands`; an n/a measure yields n/a.
pub fn measure_bands(
    measure: impl Into<String>,
    bands: LevelBands,
) -> impl Fn(&RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> + Send + Sync + 'static
{
    let measure = measure.into();
    move |context: &RuleContext<'_>| {
        let result = match context.numeric_measure(&measure)? {
            Some(value) => EvaluationResult::Level(bands.classify(value)),
            None => EvaluationResult::NotApplicable,
        };
        Ok(result)
    }
}
