use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use super::active::ActiveSubset;
use super::error::EvaluationError;
use super::record::{
    CalculatedMeasure, EvaluatedProductFactor, EvaluatedQualityAspect, EvaluationOutcome,
    ImpactingPath,
};
use super::schedule::schedule;
use super::scope::Scope;
use crate::config::EvaluationSettings;
use crate::model::System;
use crate::quality::node::ResolvedEvaluation;
use crate::quality::{
    derive_impact_weight, AspectIndex, EvaluationResult, FactorIndex, ImpactIndex, MeasureValue,
    NodeKind, NodeRef, QualityModel, RuleContext, RuleSubject,
};

/// Evaluates the active factors and aspects of a catalog against one scope instance.
///
/// The catalog is only borrowed. Every call to [`EvaluationModel::evaluate`] starts from a fresh
/// [`RunState`], so instances for different scopes never share calculated values.
#[derive(Debug, Clone)]
pub struct EvaluationModel<'a> {
    catalog: &'a QualityModel,
    scope: Scope<'a>,
    active: ActiveSubset,
    reschedule_budget: Option<usize>,
}

/// Mutable state exclusively owned by one run.
#[derive(Debug, Default)]
struct RunState {
    measures: BTreeMap<String, MeasureValue>,
    factors: BTreeMap<String, EvaluatedProductFactor>,
    aspects: BTreeMap<String, EvaluatedQualityAspect>,
    order: Vec<String>,
}

impl<'a> EvaluationModel<'a> {
    pub fn new(catalog: &'a QualityModel, scope: Scope<'a>, active: ActiveSubset) -> Self {
        Self {
            catalog,
            scope,
            active,
            reschedule_budget: None,
        }
    }

    pub fn for_system(catalog: &'a QualityModel, system: &'a System, active: ActiveSubset) -> Self {
        Self::new(catalog, Scope::system(system), active)
    }

    pub fn for_component(
        catalog: &'a QualityModel,
        system: &'a System,
        component_id: &str,
        active: ActiveSubset,
    ) -> Result<Self, EvaluationError> {
        Ok(Self::new(
            catalog,
            Scope::component(system, component_id)?,
            active,
        ))
    }

    pub fn for_component_pair(
        catalog: &'a QualityModel,
        system: &'a System,
        first_id: &str,
        second_id: &str,
        active: ActiveSubset,
    ) -> Result<Self, EvaluationError> {
        Ok(Self::new(
            catalog,
            Scope::component_pair(system, first_id, second_id)?,
            active,
        ))
    }

    pub fn for_infrastructure(
        catalog: &'a QualityModel,
        system: &'a System,
        infrastructure_id: &str,
        active: ActiveSubset,
    ) -> Result<Self, EvaluationError> {
        Ok(Self::new(
            catalog,
            Scope::infrastructure(system, infrastructure_id)?,
            active,
        ))
    }

    pub fn for_request_trace(
        catalog: &'a QualityModel,
        system: &'a System,
        trace_id: &str,
        active: ActiveSubset,
    ) -> Result<Self, EvaluationError> {
        Ok(Self::new(
            catalog,
            Scope::request_trace(system, trace_id)?,
            active,
        ))
    }

    pub fn with_settings(mut self, settings: &EvaluationSettings) -> Self {
        self.reschedule_budget = settings.reschedule_budget;
        self
    }

    pub fn with_reschedule_budget(mut self, budget: Option<usize>) -> Self {
        self.reschedule_budget = budget;
        self
    }

    pub fn scope(&self) -> &Scope<'a> {
        &self.scope
    }

    pub fn active(&self) -> &ActiveSubset {
        &self.active
    }

    pub fn evaluate(&self) -> Result<EvaluationOutcome, EvaluationError> {
        info!(
            scope = %self.scope.kind(),
            entity = %self.scope.entity(),
            factors = self.active.factors().len(),
            aspects = self.active.aspects().len(),
            "starting evaluation run"
        );

        let order = schedule(self.catalog, &self.active, self.reschedule_budget)?;
        let mut state = RunState::default();

        for factor in order {
            self.evaluate_factor(factor, &mut state)?;
        }

        for aspect in self.active.aspects() {
            self.evaluate_aspect(*aspect, &mut state)?;
        }

        self.complete_measures(&mut state);
        link_records(&mut state);

        info!(
            measures = state.measures.len(),
            factors = state.factors.len(),
            aspects = state.aspects.len(),
            "evaluation run complete"
        );

        Ok(self.into_outcome(state))
    }

    fn evaluate_factor(
        &self,
        index: FactorIndex,
        state: &mut RunState,
    ) -> Result<(), EvaluationError> {
        let factor = self.catalog.factor(index);
        let measures = self.resolve_measures(index, state)?;
        let backward = self.incoming_paths(&factor.id, factor.incoming_impacts(), &state.factors)?;

        let (result, reasoning) = self.invoke(
            RuleSubject::Factor(factor),
            factor.evaluation.as_ref(),
            &backward,
            state,
        )?;

        let mut forward = Vec::new();
        for impact_index in factor.outgoing_impacts() {
            let impact = self.catalog.impact(*impact_index);
            if !self.active.contains(impact.target) {
                continue;
            }

            let weight = derive_impact_weight(&result, impact.impact_type, factor.curve)?;
            forward.push(ImpactingPath::for_impact(
                *impact_index,
                self.catalog.node_ref(impact.target),
                self.catalog.node_name(impact.target),
                impact.impact_type,
                weight,
            ));
        }

        debug!(factor = %factor.id, result = %result, "evaluated product factor");

        state.order.push(factor.id.clone());
        state.factors.insert(
            factor.id.clone(),
            EvaluatedProductFactor {
                id: factor.id.clone(),
                name: factor.name.clone(),
                factor_type: NodeKind::ProductFactor,
                result,
                reasoning,
                measures,
                forward_impacting_paths: forward,
                backward_impacting_paths: backward,
            },
        );

        Ok(())
    }

    fn evaluate_aspect(
        &self,
        index: AspectIndex,
        state: &mut RunState,
    ) -> Result<(), EvaluationError> {
        let aspect = self.catalog.aspect(index);
        let backward = self.incoming_paths(&aspect.id, aspect.incoming_impacts(), &state.factors)?;

        let (result, reasoning) = self.invoke(
            RuleSubject::Aspect(aspect),
            aspect.evaluation.as_ref(),
            &backward,
            state,
        )?;

        debug!(aspect = %aspect.id, result = %result, "evaluated quality aspect");

        state.aspects.insert(
            aspect.id.clone(),
            EvaluatedQualityAspect {
                id: aspect.id.clone(),
                name: aspect.name.clone(),
                factor_type: NodeKind::QualityAspect,
                high_level_aspect: aspect.high_level_aspect.clone(),
                result,
                reasoning,
                backward_impacting_paths: backward,
            },
        );

        Ok(())
    }

    /// Memoized measures the factor declares for this run's scope kind.
    fn resolve_measures(
        &self,
        index: FactorIndex,
        state: &mut RunState,
    ) -> Result<BTreeMap<String, MeasureValue>, EvaluationError> {
        let mut used = BTreeMap::new();

        for (_, measure) in self.catalog.factor_measures(index, self.scope.kind()) {
            if let Some(value) = state.measures.get(&measure.id) {
                used.insert(measure.id.clone(), value.clone());
                continue;
            }

            if !measure.is_calculation_available() {
                continue;
            }

            let value =
                measure
                    .calculate(&self.scope)
                    .map_err(|source| EvaluationError::Measure {
                        measure: measure.id.clone(),
                        source,
                    })?;
            state.measures.insert(measure.id.clone(), value.clone());
            used.insert(measure.id.clone(), value);
        }

        Ok(used)
    }

    /// Mirror the forward paths of active impacting factors onto the impacted node.
    fn incoming_paths(
        &self,
        node: &str,
        incoming: &[ImpactIndex],
        evaluated: &BTreeMap<String, EvaluatedProductFactor>,
    ) -> Result<Vec<ImpactingPath>, EvaluationError> {
        let mut paths = Vec::new();

        for impact_index in incoming {
            let impact = self.catalog.impact(*impact_index);
            if !self.active.contains_factor(impact.source) {
                continue;
            }

            let source = self.catalog.factor(impact.source);
            let missing = || EvaluationError::MissingUpstream {
                node: node.to_string(),
                source_id: source.id.clone(),
            };

            let forward = evaluated
                .get(&source.id)
                .ok_or_else(missing)?
                .forward_impacting_paths
                .iter()
                .find(|path| path.impact == Some(*impact_index))
                .ok_or_else(missing)?;

            paths.push(ImpactingPath::for_impact(
                *impact_index,
                NodeRef::factor(&source.id),
                &source.name,
                impact.impact_type,
                forward.weight,
            ));
        }

        Ok(paths)
    }

    fn invoke(
        &self,
        subject: RuleSubject<'_>,
        evaluation: Option<&ResolvedEvaluation>,
        impacts: &[ImpactingPath],
        state: &RunState,
    ) -> Result<(EvaluationResult, String), EvaluationError> {
        let Some(evaluation) = evaluation else {
            return Ok((
                EvaluationResult::NotApplicable,
                "no evaluation rule assigned".to_string(),
            ));
        };

        let context = RuleContext::new(
            subject,
            impacts,
            evaluation.binding.precondition.as_ref(),
            evaluation.binding.impacts_interpretation.as_deref(),
            evaluation.combination.as_ref(),
            &state.measures,
            &state.factors,
        );

        let result = (evaluation.rule)(&context)?;
        if let EvaluationResult::Numeric(value) = result {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvaluationError::OutOfRange { value });
            }
        }

        let reasoning = format!(
            "evaluated by `{}` over {} impact(s): {}",
            evaluation.binding.evaluation,
            impacts.len(),
            result
        );
        Ok((result, reasoning))
    }

    /// Best-effort pass calculating the remaining measures of this scope kind for display.
    fn complete_measures(&self, state: &mut RunState) {
        let kind = self.scope.kind();

        for (_, measure) in self.catalog.measures() {
            if measure.scope != kind
                || !measure.is_calculation_available()
                || state.measures.contains_key(&measure.id)
            {
                continue;
            }

            match measure.calculate(&self.scope) {
                Ok(value) => {
                    state.measures.insert(measure.id.clone(), value);
                }
                Err(err) => {
                    warn!(measure = %measure.id, error = %err, "skipping measure");
                }
            }
        }
    }

    fn into_outcome(&self, state: RunState) -> EvaluationOutcome {
        let entity = self.scope.entity();
        let calculated_measures = state
            .measures
            .into_iter()
            .filter_map(|(id, value)| {
                let measure = self
                    .catalog
                    .measure_index(&id)
                    .map(|index| self.catalog.measure(index))?;
                Some((
                    id,
                    CalculatedMeasure {
                        name: measure.name.clone(),
                        scope: measure.scope,
                        entity: entity.clone(),
                        value,
                        description: measure.calculation_description.clone(),
                    },
                ))
            })
            .collect();

        EvaluationOutcome {
            calculated_measures,
            evaluated_product_factors: state.factors,
            evaluated_quality_aspects: state.aspects,
            evaluation_order: state.order,
        }
    }
}

/// Second phase: point every path at the other side's record once all records exist.
fn link_records(state: &mut RunState) {
    let factors: BTreeSet<String> = state.factors.keys().cloned().collect();
    let aspects: BTreeSet<String> = state.aspects.keys().cloned().collect();
    let exists = |node: &NodeRef| match node.kind {
        NodeKind::ProductFactor => factors.contains(&node.id),
        NodeKind::QualityAspect => aspects.contains(&node.id),
    };
    let link = |path: &mut ImpactingPath| {
        if exists(&path.node) {
            path.linked = Some(path.node.clone());
        }
    };

    for record in state.factors.values_mut() {
        record
            .forward_impacting_paths
            .iter_mut()
            .chain(record.backward_impacting_paths.iter_mut())
            .for_each(link);
    }

    for record in state.aspects.values_mut() {
        record.backward_impacting_paths.iter_mut().for_each(link);
    }
}
