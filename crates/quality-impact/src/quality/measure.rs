use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::evaluation::Scope;
use crate::model::{Component, Infrastructure, RequestTrace, System};

/// The kind of architecture-model slice a measure (or an evaluation run) operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeKind {
    System,
    Component,
    ComponentPair,
    Infrastructure,
    RequestTrace,
}

impl ScopeKind {
    pub const fn label(self) -> &'static str {
        match self {
            ScopeKind::System => "system",
            ScopeKind::Component => "component",
            ScopeKind::ComponentPair => "componentPair",
            ScopeKind::Infrastructure => "infrastructure",
            ScopeKind::RequestTrace => "requestTrace",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a measure calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureValue {
    Number(f64),
    Enumerated(String),
    NotApplicable,
}

impl MeasureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MeasureValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, MeasureValue::NotApplicable)
    }
}

impl From<f64> for MeasureValue {
    fn from(value: f64) -> Self {
        MeasureValue::Number(value)
    }
}

impl Serialize for MeasureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MeasureValue::Number(value) => serializer.serialize_f64(*value),
            MeasureValue::Enumerated(value) => serializer.serialize_str(value),
            MeasureValue::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

/// Failures raised while calculating a single measure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasureError {
    #[error("measure `{measure}` has no calculation")]
    Unavailable { measure: String },
    #[error("measure `{measure}` operates on {expected} scope but was invoked on {found}")]
    ScopeMismatch {
        measure: String,
        expected: ScopeKind,
        found: ScopeKind,
    },
    #[error("referenced entity `{0}` does not exist in the architecture model")]
    MissingEntity(String),
    #[error("calculation failed: {0}")]
    Calculation(String),
}

pub type MeasureResult = Result<MeasureValue, MeasureError>;

type SystemFn = dyn Fn(&System) -> MeasureResult + Send + Sync;
type ComponentFn = dyn Fn(&System, &Component) -> MeasureResult + Send + Sync;
type ComponentPairFn = dyn Fn(&System, &Component, &Component) -> MeasureResult + Send + Sync;
type InfrastructureFn = dyn Fn(&System, &Infrastructure) -> MeasureResult + Send + Sync;
type RequestTraceFn = dyn Fn(&System, &RequestTrace) -> MeasureResult + Send + Sync;

/// Calculation attached to a measure, typed by the scope it consumes.
#[derive(Clone)]
pub enum MeasureCalculation {
    System(Arc<SystemFn>),
    Component(Arc<ComponentFn>),
    ComponentPair(Arc<ComponentPairFn>),
    Infrastructure(Arc<InfrastructureFn>),
    RequestTrace(Arc<RequestTraceFn>),
}

impl MeasureCalculation {
    pub fn system<F>(calculation: F) -> Self
    where
        F: Fn(&System) -> MeasureResult + Send + Sync + 'static,
    {
        Self::System(Arc::new(calculation))
    }

    pub fn component<F>(calculation: F) -> Self
    where
        F: Fn(&System, &Component) -> MeasureResult + Send + Sync + 'static,
    {
        Self::Component(Arc::new(calculation))
    }

    pub fn component_pair<F>(calculation: F) -> Self
    where
        F: Fn(&System, &Component, &Component) -> MeasureResult + Send + Sync + 'static,
    {
        Self::ComponentPair(Arc::new(calculation))
    }

    pub fn infrastructure<F>(calculation: F) -> Self
    where
        F: Fn(&System, &Infrastructure) -> MeasureResult + Send + Sync + 'static,
    {
        Self::Infrastructure(Arc::new(calculation))
    }

    pub fn request_trace<F>(calculation: F) -> Self
    where
        F: Fn(&System, &RequestTrace) -> MeasureResult + Send + Sync + 'static,
    {
        Self::RequestTrace(Arc::new(calculation))
    }

    pub fn scope(&self) -> ScopeKind {
        match self {
            MeasureCalculation::System(_) => ScopeKind::System,
            MeasureCalculation::Component(_) => ScopeKind::Component,
            MeasureCalculation::ComponentPair(_) => ScopeKind::ComponentPair,
            MeasureCalculation::Infrastructure(_) => ScopeKind::Infrastructure,
            MeasureCalculation::RequestTrace(_) => ScopeKind::RequestTrace,
        }
    }

    fn invoke(&self, scope: &Scope<'_>) -> Option<MeasureResult> {
        match (self, *scope) {
            (MeasureCalculation::System(calculate), Scope::System(system)) => {
                Some(calculate(system))
            }
            (MeasureCalculation::Component(calculate), Scope::Component { system, component }) => {
                Some(calculate(system, component))
            }
            (
                MeasureCalculation::ComponentPair(calculate),
                Scope::ComponentPair {
                    system,
                    first,
                    second,
                },
            ) => Some(calculate(system, first, second)),
            (MeasureCalculation::Infrastructure(calculate), Scope::Infrastructure { system, node }) => {
                Some(calculate(system, node))
            }
            (MeasureCalculation::RequestTrace(calculate), Scope::RequestTrace { system, trace }) => {
                Some(calculate(system, trace))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for MeasureCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasureCalculation({})", self.scope())
    }
}

/// Catalog entry describing a measure. Immutable once the catalog is built.
#[derive(Debug, Clone)]
pub struct Measure {
    pub id: String,
    pub name: String,
    pub scope: ScopeKind,
    pub calculation_description: String,
    pub sources: Vec<String>,
    calculation: Option<MeasureCalculation>,
}

impl Measure {
    pub(crate) fn new(
        id: String,
        name: String,
        scope: ScopeKind,
        calculation_description: String,
        sources: Vec<String>,
        calculation: Option<MeasureCalculation>,
    ) -> Self {
        Self {
            id,
            name,
            scope,
            calculation_description,
            sources,
            calculation,
        }
    }

    pub fn is_calculation_available(&self) -> bool {
        self.calculation.is_some()
    }

    /// Run the calculation against a scope of the matching kind.
    pub fn calculate(&self, scope: &Scope<'_>) -> MeasureResult {
        let calculation = self
            .calculation
            .as_ref()
            .ok_or_else(|| MeasureError::Unavailable {
                measure: self.id.clone(),
            })?;

        calculation
            .invoke(scope)
            .ok_or_else(|| MeasureError::ScopeMismatch {
                measure: self.id.clone(),
                expected: self.scope,
                found: scope.kind(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> System {
        System {
            name: "shop".to_string(),
            ..System::default()
        }
    }

    #[test]
    fn unavailable_measure_refuses_to_calculate() {
        let measure = Measure::new(
            "m".to_string(),
            "M".to_string(),
            ScopeKind::System,
            String::new(),
            Vec::new(),
            None,
        );
        let system = system();

        assert!(!measure.is_calculation_available());
        assert_eq!(
            measure.calculate(&Scope::System(&system)),
            Err(MeasureError::Unavailable {
                measure: "m".to_string()
            })
        );
    }

    #[test]
    fn scope_mismatch_is_reported() {
        let measure = Measure::new(
            "m".to_string(),
            "M".to_string(),
            ScopeKind::Component,
            String::new(),
            Vec::new(),
            Some(MeasureCalculation::component(|_, _| Ok(MeasureValue::Number(1.0)))),
        );
        let system = system();

        match measure.calculate(&Scope::System(&system)) {
            Err(MeasureError::ScopeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, ScopeKind::Component);
                assert_eq!(found, ScopeKind::System);
            }
            other => panic!("expected scope mismatch, got {other:?}"),
        }
    }

    #[test]
    fn not_applicable_serializes_as_literal() {
        let json = serde_json::to_string(&vec![
            MeasureValue::Number(0.5),
            MeasureValue::Enumerated("compute".to_string()),
            MeasureValue::NotApplicable,
        ])
        .expect("serializes");
        assert_eq!(json, r#"[0.5,"compute","n/a"]"#);
    }
}
