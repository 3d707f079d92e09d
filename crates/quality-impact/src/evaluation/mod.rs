//! Evaluation runs: schedule the active factors, resolve measures, invoke rules, derive impact
//! weights and link the resulting records.

mod active;
mod engine;
mod error;
mod record;
mod schedule;
mod scope;

pub use active::ActiveSubset;
pub use engine::EvaluationModel;
pub use error::EvaluationError;
pub use record::{
    CalculatedMeasure, EvaluatedNode, EvaluatedProductFactor, EvaluatedQualityAspect,
    EvaluationOutcome, ImpactingPath,
};
pub use scope::Scope;
