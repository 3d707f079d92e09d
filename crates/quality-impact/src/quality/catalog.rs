use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use super::measure::{Measure, MeasureCalculation, ScopeKind};
use super::node::{
    AspectIndex, EvaluationBinding, FactorIndex, Impact, ImpactIndex, MeasureIndex, NodeIndex,
    NodeRef, ProductFactor, QualityAspect, ResolvedEvaluation,
};
use super::rules::RuleRegistry;
use super::weight::{BucketCurve, ImpactType};

/// Declarative description of a measure. The calculation is attached in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureSpec {
    pub id: String,
    pub name: String,
    pub scope: ScopeKind,
    #[serde(default)]
    pub calculation_description: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip)]
    pub calculation: Option<MeasureCalculation>,
}

impl MeasureSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, scope: ScopeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scope,
            calculation_description: String::new(),
            sources: Vec::new(),
            calculation: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.calculation_description = description.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_calculation(mut self, calculation: MeasureCalculation) -> Self {
        self.calculation = Some(calculation);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub relevant_entities: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
    #[serde(default)]
    pub evaluation: Option<EvaluationBinding>,
    #[serde(default)]
    pub curve: Option<BucketCurve>,
}

impl FactorSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_measure(mut self, measure: impl Into<String>) -> Self {
        self.measures.push(measure.into());
        self
    }

    pub fn evaluated_by(mut self, binding: EvaluationBinding) -> Self {
        self.evaluation = Some(binding);
        self
    }

    pub fn with_curve(mut self, curve: BucketCurve) -> Self {
        self.curve = Some(curve);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub high_level_aspect: Option<String>,
    #[serde(default)]
    pub evaluation: Option<EvaluationBinding>,
}

impl AspectSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn under(mut self, high_level_aspect: impl Into<String>) -> Self {
        self.high_level_aspect = Some(high_level_aspect.into());
        self
    }

    pub fn evaluated_by(mut self, binding: EvaluationBinding) -> Self {
        self.evaluation = Some(binding);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSpec {
    pub source: String,
    pub target: String,
    pub impact_type: String,
}

impl ImpactSpec {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        impact_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            impact_type: impact_type.into(),
        }
    }
}

/// Data-only catalog as it may be declared in a document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSpec {
    #[serde(default)]
    pub measures: Vec<MeasureSpec>,
    #[serde(default)]
    pub factors: Vec<FactorSpec>,
    #[serde(default)]
    pub aspects: Vec<AspectSpec>,
    #[serde(default)]
    pub impacts: Vec<ImpactSpec>,
}

/// Referential-integrity failures detected while building a catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate measure id `{0}`")]
    DuplicateMeasure(String),
    #[error("duplicate node id `{0}` (factor and aspect ids share one namespace)")]
    DuplicateNode(String),
    #[error("factor `{factor}` references unknown measure `{measure}`")]
    UnknownMeasure { factor: String, measure: String },
    #[error("calculation attached to unknown measure `{0}`")]
    UnknownCalculationTarget(String),
    #[error("measure `{measure}` is declared for {declared} scope but its calculation expects {calculation}")]
    CalculationScopeMismatch {
        measure: String,
        declared: ScopeKind,
        calculation: ScopeKind,
    },
    #[error("impact source `{0}` is not a known product factor")]
    UnknownImpactSource(String),
    #[error("quality aspect `{0}` cannot be the source of an impact")]
    AspectAsImpactSource(String),
    #[error("impact target `{0}` is not a known product factor or quality aspect")]
    UnknownImpactTarget(String),
    #[error("factor `{0}` cannot impact itself")]
    SelfImpact(String),
    #[error("impact `{source_id}` -> `{target}` has unknown impact type `{impact_type}`")]
    UnknownImpactType {
        source_id: String,
        target: String,
        impact_type: String,
    },
    #[error("`{node}` uses evaluation `{evaluation}` which is not registered")]
    UnregisteredEvaluation { node: String, evaluation: String },
    #[error("`{node}` uses combination `{combination}` which is not registered")]
    UnregisteredCombination { node: String, combination: String },
}

/// Validates catalog specs against a rule registry and produces a [`QualityModel`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    spec: CatalogSpec,
    calculations: Vec<(String, MeasureCalculation)>,
    registry: RuleRegistry,
    default_curve: BucketCurve,
}

impl CatalogBuilder {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn default_curve(mut self, curve: BucketCurve) -> Self {
        self.default_curve = curve;
        self
    }

    pub fn extend(mut self, spec: CatalogSpec) -> Self {
        self.spec.measures.extend(spec.measures);
        self.spec.factors.extend(spec.factors);
        self.spec.aspects.extend(spec.aspects);
        self.spec.impacts.extend(spec.impacts);
        self
    }

    pub fn measure(mut self, measure: MeasureSpec) -> Self {
        self.spec.measures.push(measure);
        self
    }

    /// Attach a calculation to a measure declared elsewhere (e.g. in a data-only spec).
    pub fn calculation(mut self, measure: impl Into<String>, calculation: MeasureCalculation) -> Self {
        self.calculations.push((measure.into(), calculation));
        self
    }

    pub fn factor(mut self, factor: FactorSpec) -> Self {
        self.spec.factors.push(factor);
        self
    }

    pub fn aspect(mut self, aspect: AspectSpec) -> Self {
        self.spec.aspects.push(aspect);
        self
    }

    pub fn impact(mut self, impact: ImpactSpec) -> Self {
        self.spec.impacts.push(impact);
        self
    }

    pub fn build(self) -> Result<QualityModel, CatalogError> {
        let CatalogBuilder {
            spec,
            calculations,
            registry,
            default_curve,
        } = self;

        let mut measure_ids = HashMap::new();
        let mut measures = Vec::with_capacity(spec.measures.len());
        for measure in spec.measures {
            if measure_ids.contains_key(&measure.id) {
                return Err(CatalogError::DuplicateMeasure(measure.id));
            }
            measure_ids.insert(measure.id.clone(), MeasureIndex(measures.len()));
            measures.push(measure);
        }

        for (measure_id, calculation) in calculations {
            let index = measure_ids
                .get(&measure_id)
                .ok_or_else(|| CatalogError::UnknownCalculationTarget(measure_id.clone()))?;
            measures[index.0].calculation = Some(calculation);
        }

        let measures = measures
            .into_iter()
            .map(|spec| {
                if let Some(calculation) = &spec.calculation {
                    if calculation.scope() != spec.scope {
                        return Err(CatalogError::CalculationScopeMismatch {
                            measure: spec.id,
                            declared: spec.scope,
                            calculation: calculation.scope(),
                        });
                    }
                }
                Ok(Measure::new(
                    spec.id,
                    spec.name,
                    spec.scope,
                    spec.calculation_description,
                    spec.sources,
                    spec.calculation,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut node_ids: BTreeSet<String> = BTreeSet::new();
        let mut factor_ids = HashMap::new();
        let mut factors = Vec::with_capacity(spec.factors.len());
        for factor in spec.factors {
            if !node_ids.insert(factor.id.clone()) {
                return Err(CatalogError::DuplicateNode(factor.id));
            }

            let factor_measures = factor
                .measures
                .iter()
                .map(|measure| {
                    measure_ids
                        .get(measure)
                        .copied()
                        .ok_or_else(|| CatalogError::UnknownMeasure {
                            factor: factor.id.clone(),
                            measure: measure.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let evaluation = resolve_evaluation(&registry, &factor.id, factor.evaluation)?;

            factor_ids.insert(factor.id.clone(), FactorIndex(factors.len()));
            factors.push(ProductFactor {
                id: factor.id,
                name: factor.name,
                description: factor.description,
                categories: factor.categories,
                relevant_entities: factor.relevant_entities,
                curve: factor.curve.unwrap_or(default_curve),
                measures: factor_measures,
                outgoing: Vec::new(),
                incoming: Vec::new(),
                evaluation,
            });
        }

        let mut aspect_ids = HashMap::new();
        let mut aspects = Vec::with_capacity(spec.aspects.len());
        for aspect in spec.aspects {
            if !node_ids.insert(aspect.id.clone()) {
                return Err(CatalogError::DuplicateNode(aspect.id));
            }

            let evaluation = resolve_evaluation(&registry, &aspect.id, aspect.evaluation)?;

            aspect_ids.insert(aspect.id.clone(), AspectIndex(aspects.len()));
            aspects.push(QualityAspect {
                id: aspect.id,
                name: aspect.name,
                description: aspect.description,
                high_level_aspect: aspect.high_level_aspect,
                incoming: Vec::new(),
                evaluation,
            });
        }

        let mut impacts = Vec::with_capacity(spec.impacts.len());
        for impact in spec.impacts {
            let source = match factor_ids.get(&impact.source) {
                Some(index) => *index,
                None if aspect_ids.contains_key(&impact.source) => {
                    return Err(CatalogError::AspectAsImpactSource(impact.source))
                }
                None => return Err(CatalogError::UnknownImpactSource(impact.source)),
            };

            let target = if let Some(index) = factor_ids.get(&impact.target) {
                NodeIndex::Factor(*index)
            } else if let Some(index) = aspect_ids.get(&impact.target) {
                NodeIndex::Aspect(*index)
            } else {
                return Err(CatalogError::UnknownImpactTarget(impact.target));
            };

            if target == NodeIndex::Factor(source) {
                return Err(CatalogError::SelfImpact(impact.source));
            }

            let impact_type = impact.impact_type.parse::<ImpactType>().map_err(|_| {
                CatalogError::UnknownImpactType {
                    source_id: impact.source.clone(),
                    target: impact.target.clone(),
                    impact_type: impact.impact_type.clone(),
                }
            })?;

            let index = ImpactIndex(impacts.len());
            factors[source.0].outgoing.push(index);
            match target {
                NodeIndex::Factor(target) => factors[target.0].incoming.push(index),
                NodeIndex::Aspect(target) => aspects[target.0].incoming.push(index),
            }
            impacts.push(Impact {
                source,
                target,
                impact_type,
            });
        }

        Ok(QualityModel {
            measures,
            factors,
            aspects,
            impacts,
            measure_ids,
            factor_ids,
            aspect_ids,
        })
    }
}

fn resolve_evaluation(
    registry: &RuleRegistry,
    node: &str,
    binding: Option<EvaluationBinding>,
) -> Result<Option<ResolvedEvaluation>, CatalogError> {
    let Some(binding) = binding else {
        return Ok(None);
    };

    let rule = registry
        .rule(&binding.evaluation)
        .cloned()
        .ok_or_else(|| CatalogError::UnregisteredEvaluation {
            node: node.to_string(),
            evaluation: binding.evaluation.clone(),
        })?;

    let combination = match &binding.combination {
        Some(id) => Some(registry.combination(id).cloned().ok_or_else(|| {
            CatalogError::UnregisteredCombination {
                node: node.to_string(),
                combination: id.clone(),
            }
        })?),
        None => None,
    };

    Ok(Some(ResolvedEvaluation {
        binding,
        rule,
        combination,
    }))
}

/// Read-only, arena-backed catalog of measures, factors, aspects and impacts.
///
/// Built once and shared (typically behind an `Arc`) by every evaluation run.
#[derive(Debug)]
pub struct QualityModel {
    measures: Vec<Measure>,
    factors: Vec<ProductFactor>,
    aspects: Vec<QualityAspect>,
    impacts: Vec<Impact>,
    measure_ids: HashMap<String, MeasureIndex>,
    factor_ids: HashMap<String, FactorIndex>,
    aspect_ids: HashMap<String, AspectIndex>,
}

impl QualityModel {
    pub fn measure(&self, index: MeasureIndex) -> &Measure {
        &self.measures[index.0]
    }

    pub fn factor(&self, index: FactorIndex) -> &ProductFactor {
        &self.factors[index.0]
    }

    pub fn aspect(&self, index: AspectIndex) -> &QualityAspect {
        &self.aspects[index.0]
    }

    pub fn impact(&self, index: ImpactIndex) -> &Impact {
        &self.impacts[index.0]
    }

    pub fn measures(&self) -> impl Iterator<Item = (MeasureIndex, &Measure)> {
        self.measures
            .iter()
            .enumerate()
            .map(|(index, measure)| (MeasureIndex(index), measure))
    }

    pub fn factors(&self) -> impl Iterator<Item = (FactorIndex, &ProductFactor)> {
        self.factors
            .iter()
            .enumerate()
            .map(|(index, factor)| (FactorIndex(index), factor))
    }

    pub fn aspects(&self) -> impl Iterator<Item = (AspectIndex, &QualityAspect)> {
        self.aspects
            .iter()
            .enumerate()
            .map(|(index, aspect)| (AspectIndex(index), aspect))
    }

    pub fn measure_index(&self, id: &str) -> Option<MeasureIndex> {
        self.measure_ids.get(id).copied()
    }

    pub fn factor_index(&self, id: &str) -> Option<FactorIndex> {
        self.factor_ids.get(id).copied()
    }

    pub fn aspect_index(&self, id: &str) -> Option<AspectIndex> {
        self.aspect_ids.get(id).copied()
    }

    pub fn factor_by_id(&self, id: &str) -> Option<&ProductFactor> {
        self.factor_index(id).map(|index| self.factor(index))
    }

    pub fn aspect_by_id(&self, id: &str) -> Option<&QualityAspect> {
        self.aspect_index(id).map(|index| self.aspect(index))
    }

    /// Distinct source factors of the factor's incoming impacts, in declaration order.
    pub fn impacting_factors(&self, index: FactorIndex) -> Vec<FactorIndex> {
        let mut seen = BTreeSet::new();
        self.factor(index)
            .incoming
            .iter()
            .map(|impact| self.impact(*impact).source)
            .filter(|source| seen.insert(*source))
            .collect()
    }

    /// Targets of the factor's outgoing impacts, in declaration order.
    pub fn impacted_nodes(&self, index: FactorIndex) -> Vec<NodeIndex> {
        self.factor(index)
            .outgoing
            .iter()
            .map(|impact| self.impact(*impact).target)
            .collect()
    }

    /// Measures a factor declares for the given scope kind.
    pub fn factor_measures(
        &self,
        index: FactorIndex,
        scope: ScopeKind,
    ) -> impl Iterator<Item = (MeasureIndex, &Measure)> {
        self.factor(index)
            .measures
            .iter()
            .map(|measure| (*measure, self.measure(*measure)))
            .filter(move |(_, measure)| measure.scope == scope)
    }

    pub fn node_id(&self, node: NodeIndex) -> &str {
        match node {
            NodeIndex::Factor(index) => &self.factor(index).id,
            NodeIndex::Aspect(index) => &self.aspect(index).id,
        }
    }

    pub fn node_name(&self, node: NodeIndex) -> &str {
        match node {
            NodeIndex::Factor(index) => &self.factor(index).name,
            NodeIndex::Aspect(index) => &self.aspect(index).name,
        }
    }

    pub fn node_ref(&self, node: NodeIndex) -> NodeRef {
        match node {
            NodeIndex::Factor(index) => NodeRef::factor(&self.factor(index).id),
            NodeIndex::Aspect(index) => NodeRef::aspect(&self.aspect(index).id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::measure::MeasureValue;
    use crate::quality::rules::AGGREGATE_IMPACTS;

    fn builder() -> CatalogBuilder {
        CatalogBuilder::new(RuleRegistry::with_builtins())
            .measure(MeasureSpec::new(
                "numberOfServices",
                "Number of services",
                ScopeKind::System,
            ))
            .factor(FactorSpec::new("a", "A").with_measure("numberOfServices"))
            .factor(FactorSpec::new("b", "B"))
            .aspect(
                AspectSpec::new("availability", "Availability")
                    .evaluated_by(EvaluationBinding::new(AGGREGATE_IMPACTS)),
            )
    }

    #[test]
    fn builds_bidirectional_impact_indices() {
        let model = builder()
            .impact(ImpactSpec::new("a", "b", "positive"))
            .impact(ImpactSpec::new("b", "availability", "negative"))
            .build()
            .expect("catalog builds");

        let a = model.factor_index("a").expect("a exists");
        let b = model.factor_index("b").expect("b exists");
        assert_eq!(model.impacting_factors(b), vec![a]);
        assert_eq!(model.impacted_nodes(a), vec![NodeIndex::Factor(b)]);
        assert_eq!(
            model.aspect_by_id("availability").map(|aspect| aspect.incoming.len()),
            Some(1)
        );
        assert!(model.aspect_by_id("availability").is_some_and(|aspect| aspect.is_evaluable()));
        assert!(!model.factor(a).is_evaluable());
    }

    #[test]
    fn rejects_aspects_as_impact_sources() {
        let err = builder()
            .impact(ImpactSpec::new("availability", "a", "positive"))
            .build()
            .expect_err("aspects cannot impact");
        assert_eq!(err, CatalogError::AspectAsImpactSource("availability".to_string()));
    }

    #[test]
    fn rejects_unknown_references() {
        let err = builder()
            .impact(ImpactSpec::new("a", "ghost", "positive"))
            .build()
            .expect_err("unknown target");
        assert_eq!(err, CatalogError::UnknownImpactTarget("ghost".to_string()));

        let err = builder()
            .factor(FactorSpec::new("c", "C").with_measure("missing"))
            .build()
            .expect_err("unknown measure");
        assert!(matches!(err, CatalogError::UnknownMeasure { .. }));
    }

    #[test]
    fn rejects_unknown_impact_types_and_self_impacts() {
        let err = builder()
            .impact(ImpactSpec::new("a", "b", "sideways"))
            .build()
            .expect_err("unknown type");
        assert!(matches!(err, CatalogError::UnknownImpactType { .. }));

        let err = builder()
            .impact(ImpactSpec::new("a", "a", "positive"))
            .build()
            .expect_err("self impact");
        assert_eq!(err, CatalogError::SelfImpact("a".to_string()));
    }

    #[test]
    fn unregistered_rules_fail_at_load_time() {
        let err = builder()
            .factor(FactorSpec::new("c", "C").evaluated_by(EvaluationBinding::new("nope")))
            .build()
            .expect_err("rule missing");
        assert_eq!(
            err,
            CatalogError::UnregisteredEvaluation {
                node: "c".to_string(),
                evaluation: "nope".to_string(),
            }
        );

        let err = builder()
            .factor(FactorSpec::new("c", "C").evaluated_by(
                EvaluationBinding::new(AGGREGATE_IMPACTS).with_combination("median"),
            ))
            .build()
            .expect_err("combination missing");
        assert!(matches!(err, CatalogError::UnregisteredCombination { .. }));
    }

    #[test]
    fn factor_and_aspect_ids_share_a_namespace() {
        let err = builder()
            .aspect(AspectSpec::new("a", "Clash"))
            .build()
            .expect_err("duplicate id");
        assert_eq!(err, CatalogError::DuplicateNode("a".to_string()));
    }

    #[test]
    fn calculations_must_match_declared_scope() {
        let err = builder()
            .calculation(
                "numberOfServices",
                MeasureCalculation::component(|_, _| Ok(MeasureValue::Number(1.0))),
            )
            .build()
            .expect_err("scope mismatch");
        assert!(matches!(err, CatalogError::CalculationScopeMismatch { .. }));

        let model = builder()
            .calculation(
                "numberOfServices",
                MeasureCalculation::system(|system| {
                    Ok(MeasureValue::Number(system.services().count() as f64))
                }),
            )
            .build()
            .expect("catalog builds");
        let measure = model
            .measure_index("numberOfServices")
            .map(|index| model.measure(index))
            .expect("measure exists");
        assert!(measure.is_calculation_available());
    }

    #[test]
    fn catalog_specs_deserialize_from_json() {
        let spec: CatalogSpec = serde_json::from_str(
            r#"{
                "measures": [{"id": "m", "name": "M", "scope": "componentPair"}],
                "factors": [{"id": "f", "name": "F", "measures": ["m"], "curve": "squareRoot"}],
                "aspects": [{"id": "q", "name": "Q", "highLevelAspect": "reliability",
                             "evaluation": {"evaluation": "aggregateImpacts"}}],
                "impacts": [{"source": "f", "target": "q", "impactType": "positive"}]
            }"#,
        )
        .expect("spec parses");

        let model = CatalogBuilder::new(RuleRegistry::with_builtins())
            .extend(spec)
            .build()
            .expect("catalog builds");
        let factor = model.factor_by_id("f").expect("factor exists");
        assert_eq!(factor.curve, BucketCurve::SquareRoot);
        assert_eq!(factor.measures().len(), 1);
    }
}
