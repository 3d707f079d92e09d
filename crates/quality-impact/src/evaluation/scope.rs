use super::error::EvaluationError;
use crate::model::{Component, Infrastructure, RequestTrace, System};
use crate::quality::ScopeKind;

/// The architecture-model slice one evaluation run is performed against.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    System(&'a System),
    Component {
        system: &'a System,
        component: &'a Component,
    },
    ComponentPair {
        system: &'a System,
        first: &'a Component,
        second: &'a Component,
    },
    Infrastructure {
        system: &'a System,
        node: &'a Infrastructure,
    },
    RequestTrace {
        system: &'a System,
        trace: &'a RequestTrace,
    },
}

impl<'a> Scope<'a> {
    pub fn system(system: &'a System) -> Self {
        Scope::System(system)
    }

    pub fn component(system: &'a System, component_id: &str) -> Result<Self, EvaluationError> {
        let component = lookup(ScopeKind::Component, component_id, system.component(component_id))?;
        Ok(Scope::Component { system, component })
    }

    pub fn component_pair(
        system: &'a System,
        first_id: &str,
        second_id: &str,
    ) -> Result<Self, EvaluationError> {
        let first = lookup(ScopeKind::ComponentPair, first_id, system.component(first_id))?;
        let second = lookup(ScopeKind::ComponentPair, second_id, system.component(second_id))?;
        Ok(Scope::ComponentPair {
            system,
            first,
            second,
        })
    }

    pub fn infrastructure(
        system: &'a System,
        infrastructure_id: &str,
    ) -> Result<Self, EvaluationError> {
        let node = lookup(
            ScopeKind::Infrastructure,
            infrastructure_id,
            system.infrastructure_node(infrastructure_id),
        )?;
        Ok(Scope::Infrastructure { system, node })
    }

    pub fn request_trace(system: &'a System, trace_id: &str) -> Result<Self, EvaluationError> {
        let trace = lookup(ScopeKind::RequestTrace, trace_id, system.request_trace(trace_id))?;
        Ok(Scope::RequestTrace { system, trace })
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::System(_) => ScopeKind::System,
            Scope::Component { .. } => ScopeKind::Component,
            Scope::ComponentPair { .. } => ScopeKind::ComponentPair,
            Scope::Infrastructure { .. } => ScopeKind::Infrastructure,
            Scope::RequestTrace { .. } => ScopeKind::RequestTrace,
        }
    }

    pub fn architecture(&self) -> &'a System {
        match *self {
            Scope::System(system)
            | Scope::Component { system, .. }
            | Scope::ComponentPair { system, .. }
            | Scope::Infrastructure { system, .. }
            | Scope::RequestTrace { system, .. } => system,
        }
    }

    /// Display label of the entity the run evaluates.
    pub fn entity(&self) -> String {
        match self {
            Scope::System(system) => system.name.clone(),
            Scope::Component { component, .. } => component.name.clone(),
            Scope::ComponentPair { first, second, .. } => {
                format!("{} / {}", first.name, second.name)
            }
            Scope::Infrastructure { node, .. } => node.name.clone(),
            Scope::RequestTrace { trace, .. } => trace.name.clone(),
        }
    }
}

fn lookup<'a, T>(kind: ScopeKind, id: &str, found: Option<&'a T>) -> Result<&'a T, EvaluationError> {
    found.ok_or_else(|| EvaluationError::UnknownScopeEntity {
        kind,
        id: id.to_string(),
    })
}
