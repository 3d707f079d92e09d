//! The quality-model catalog: measures, product factors, quality aspects and the impacts
//! between them, plus the registries of evaluation rules.

pub mod catalog;
pub mod measure;
pub mod node;
pub mod result;
pub mod rules;
pub mod weight;

pub use catalog::{
    AspectSpec, CatalogBuilder, CatalogError, CatalogSpec, FactorSpec, ImpactSpec, MeasureSpec,
    QualityModel,
};
pub use measure::{Measure, MeasureCalculation, MeasureError, MeasureResult, MeasureValue, ScopeKind};
pub use node::{
    AspectIndex, EvaluationBinding, FactorIndex, Impact, ImpactIndex, MeasureIndex, NodeIndex,
    NodeKind, NodeRef, ProductFactor, QualityAspect,
};
pub use result::{EvaluationResult, ImpactAggregate, Tendency};
pub use rules::{
    aggregate_impacts, measure_bands, mean_impact_score, CombinationFn, LevelBands, RuleContext,
    RuleFn, RuleRegistry, RuleSubject, AGGREGATE_IMPACTS, MEAN_IMPACT_SCORE,
};
pub use weight::{
    derive_impact_weight, exponential_map, linear_map, square_root_map, BucketCurve, FactorLevel,
    ImpactType, ImpactWeight, Polarity,
};
