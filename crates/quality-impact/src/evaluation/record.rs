use std::collections::BTreeMap;

use serde::Serialize;

use crate::quality::{
    EvaluationResult, ImpactIndex, ImpactType, ImpactWeight, MeasureValue, NodeKind, NodeRef,
    ScopeKind,
};

/// One side's view of an impact between two evaluated nodes.
///
/// A forward path sits on the impacting factor and names the impacted node; a backward path sits
/// on the impacted node and names the impacting factor. Both views of one impact carry the same
/// weight. `linked` is filled in by the linking pass once the other side's record exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactingPath {
    pub node: NodeRef,
    pub name: String,
    pub impact_type: ImpactType,
    pub weight: ImpactWeight,
    pub linked: Option<NodeRef>,
    #[serde(skip)]
    pub(crate) impact: Option<ImpactIndex>,
}

impl ImpactingPath {
    /// Unlinked path not tied to a catalog impact.
    pub fn stub(
        node: NodeRef,
        name: impl Into<String>,
        impact_type: ImpactType,
        weight: ImpactWeight,
    ) -> Self {
        Self {
            node,
            name: name.into(),
            impact_type,
            weight,
            linked: None,
            impact: None,
        }
    }

    pub(crate) fn for_impact(
        impact: ImpactIndex,
        node: NodeRef,
        name: &str,
        impact_type: ImpactType,
        weight: ImpactWeight,
    ) -> Self {
        Self {
            impact: Some(impact),
            ..Self::stub(node, name, impact_type, weight)
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }
}

/// Per-run record of an evaluated product factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedProductFactor {
    pub id: String,
    pub name: String,
    pub factor_type: NodeKind,
    pub result: EvaluationResult,
    pub reasoning: String,
    /// Measures the factor declares for the run's scope, with their values.
    pub measures: BTreeMap<String, MeasureValue>,
    pub forward_impacting_paths: Vec<ImpactingPath>,
    pub backward_impacting_paths: Vec<ImpactingPath>,
}

/// Per-run record of an evaluated quality aspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedQualityAspect {
    pub id: String,
    pub name: String,
    pub factor_type: NodeKind,
    pub high_level_aspect: Option<String>,
    pub result: EvaluationResult,
    pub reasoning: String,
    pub backward_impacting_paths: Vec<ImpactingPath>,
}

/// Measure value as presented to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedMeasure {
    pub name: String,
    #[serde(rename = "type")]
    pub scope: ScopeKind,
    pub entity: String,
    pub value: MeasureValue,
    pub description: String,
}

/// Either kind of evaluated record, as returned when following a path.
#[derive(Debug, Clone, Copy)]
pub enum EvaluatedNode<'a> {
    Factor(&'a EvaluatedProductFactor),
    Aspect(&'a EvaluatedQualityAspect),
}

impl EvaluatedNode<'_> {
    pub fn result(&self) -> &EvaluationResult {
        match self {
            EvaluatedNode::Factor(factor) => &factor.result,
            EvaluatedNode::Aspect(aspect) => &aspect.result,
        }
    }
}

/// The three maps produced by one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    pub calculated_measures: BTreeMap<String, CalculatedMeasure>,
    pub evaluated_product_factors: BTreeMap<String, EvaluatedProductFactor>,
    pub evaluated_quality_aspects: BTreeMap<String, EvaluatedQualityAspect>,
    /// Ids of product factors in the order they were evaluated.
    pub evaluation_order: Vec<String>,
}

impl EvaluationOutcome {
    pub fn factor(&self, id: &str) -> Option<&EvaluatedProductFactor> {
        self.evaluated_product_factors.get(id)
    }

    pub fn aspect(&self, id: &str) -> Option<&EvaluatedQualityAspect> {
        self.evaluated_quality_aspects.get(id)
    }

    pub fn measure(&self, id: &str) -> Option<&CalculatedMeasure> {
        self.calculated_measures.get(id)
    }

    /// Follow a node reference into this run's records.
    pub fn resolve(&self, node: &NodeRef) -> Option<EvaluatedNode<'_>> {
        match node.kind {
            NodeKind::ProductFactor => self.factor(&node.id).map(EvaluatedNode::Factor),
            NodeKind::QualityAspect => self.aspect(&node.id).map(EvaluatedNode::Aspect),
        }
    }
}
