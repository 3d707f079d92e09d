use crate::quality::{ImpactType, MeasureError, ScopeKind};

/// Failures that abort a single evaluation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("`{node}` requires measure `{measure}` which was not calculated in this run")]
    MissingMeasureValue { node: String, measure: String },
    #[error("numeric result {value} lies outside [0, 1]")]
    OutOfRange { value: f64 },
    #[error("impact type `{impact_type}` has no polarity and cannot be weighted")]
    NonPolarImpactType { impact_type: ImpactType },
    #[error("result `{result}` cannot be reduced to an ordinal level")]
    UnweightableResult { result: String },
    #[error("active product factors form a cycle; unable to schedule: {}", .factors.join(", "))]
    CyclicActiveSubset { factors: Vec<String> },
    #[error("reschedule budget of {budget} exhausted before all factors were ordered")]
    RescheduleBudgetExceeded { budget: usize },
    #[error("measure `{measure}` failed: {source}")]
    Measure {
        measure: String,
        #[source]
        source: MeasureError,
    },
    #[error("rule for `{node}` failed: {message}")]
    Rule { node: String, message: String },
    #[error("active id `{0}` is not part of the catalog")]
    UnknownActiveId(String),
    #[error("{kind} scope entity `{id}` does not exist in the architecture model")]
    UnknownScopeEntity { kind: ScopeKind, id: String },
    #[error("`{node}` is impacted by `{source_id}` which has not been evaluated")]
    MissingUpstream { node: String, source_id: String },
}
