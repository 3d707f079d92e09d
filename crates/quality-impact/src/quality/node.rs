use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::{CombinationFn, RuleFn};
use super::weight::{BucketCurve, ImpactType};

/// Position of a measure inside the catalog arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeasureIndex(pub(crate) usize);

/// Position of a product factor inside the catalog arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactorIndex(pub(crate) usize);

/// Position of a quality aspect inside the catalog arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AspectIndex(pub(crate) usize);

/// Position of an impact inside the catalog arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImpactIndex(pub(crate) usize);

/// Either side of an impact target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeIndex {
    Factor(FactorIndex),
    Aspect(AspectIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    ProductFactor,
    QualityAspect,
}

impl NodeKind {
    pub const fn label(self) -> &'static str {
        match self {
            NodeKind::ProductFactor => "productFactor",
            NodeKind::QualityAspect => "qualityAspect",
        }
    }
}

/// Id-based reference to an evaluated node, safe to serialize without cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeRef {
    pub fn factor(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::ProductFactor,
            id: id.into(),
        }
    }

    pub fn aspect(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::QualityAspect,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind.label(), self.id)
    }
}

/// Directed, typed edge from a product factor to a product factor or quality aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impact {
    pub source: FactorIndex,
    pub target: NodeIndex,
    pub impact_type: ImpactType,
}

/// Evaluation-rule assignment as declared in a catalog.
///
/// `precondition` and `impacts_interpretation` are passed through to the rule untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationBinding {
    pub evaluation: String,
    #[serde(default)]
    pub precondition: Option<Value>,
    #[serde(default)]
    pub impacts_interpretation: Option<String>,
    #[serde(default)]
    pub combination: Option<String>,
}

impl EvaluationBinding {
    pub fn new(evaluation: impl Into<String>) -> Self {
        Self {
            evaluation: evaluation.into(),
            ..Self::default()
        }
    }

    pub fn with_combination(mut self, combination: impl Into<String>) -> Self {
        self.combination = Some(combination.into());
        self
    }

    pub fn with_precondition(mut self, precondition: Value) -> Self {
        self.precondition = Some(precondition);
        self
    }

    pub fn with_impacts_interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.impacts_interpretation = Some(interpretation.into());
        self
    }
}

/// Binding resolved against the registry while the catalog is built.
#[derive(Clone)]
pub struct ResolvedEvaluation {
    pub binding: EvaluationBinding,
    pub(crate) rule: RuleFn,
    pub(crate) combination: Option<CombinationFn>,
}

impl fmt::Debug for ResolvedEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEvaluation")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ProductFactor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub relevant_entities: Vec<String>,
    pub curve: BucketCurve,
    pub(crate) measures: Vec<MeasureIndex>,
    pub(crate) outgoing: Vec<ImpactIndex>,
    pub(crate) incoming: Vec<ImpactIndex>,
    pub(crate) evaluation: Option<ResolvedEvaluation>,
}

impl ProductFactor {
    pub fn measures(&self) -> &[MeasureIndex] {
        &self.measures
    }

    pub fn outgoing_impacts(&self) -> &[ImpactIndex] {
        &self.outgoing
    }

    pub fn incoming_impacts(&self) -> &[ImpactIndex] {
        &self.incoming
    }

    /// A factor without an assigned rule always evaluates to n/a.
    pub fn is_evaluable(&self) -> bool {
        self.evaluation.is_some()
    }

    pub fn evaluation(&self) -> Option<&EvaluationBinding> {
        self.evaluation.as_ref().map(|resolved| &resolved.binding)
    }
}

#[derive(Debug, Clone)]
pub struct QualityAspect {
    pub id: String,
    pub name: String,
    pub description: String,
    pub high_level_aspect: Option<String>,
    pub(crate) incoming: Vec<ImpactIndex>,
    pub(crate) evaluation: Option<ResolvedEvaluation>,
}

impl QualityAspect {
    pub fn incoming_impacts(&self) -> &[ImpactIndex] {
        &self.incoming
    }

    pub fn is_evaluable(&self) -> bool {
        self.evaluation.is_some()
    }

    pub fn evaluation(&self) -> Option<&EvaluationBinding> {
        self.evaluation.as_ref().map(|resolved| &resolved.binding)
    }
}
