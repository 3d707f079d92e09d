use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property bag entry attached to components and infrastructure nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// Structural role of a component within the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Service,
    BackingService,
    StorageBackingService,
    ProxyBackingService,
    BrokerBackingService,
}

impl ComponentKind {
    pub const fn label(self) -> &'static str {
        match self {
            ComponentKind::Service => "service",
            ComponentKind::BackingService => "backing service",
            ComponentKind::StorageBackingService => "storage backing service",
            ComponentKind::ProxyBackingService => "proxy backing service",
            ComponentKind::BrokerBackingService => "broker backing service",
        }
    }
}

/// How an endpoint is reached by its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointKind {
    Internal,
    External,
    MessageProducer,
    MessageConsumer,
}

impl EndpointKind {
    pub const fn is_asynchronous(self) -> bool {
        matches!(
            self,
            EndpointKind::MessageProducer | EndpointKind::MessageConsumer
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub kind: EndpointKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Ids of the data aggregates this component reads or writes.
    #[serde(default)]
    pub data_aggregates: Vec<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl Component {
    /// Declared replica count, `1` when the property is absent.
    pub fn replicas(&self) -> f64 {
        self.properties
            .get("replicas")
            .and_then(PropertyValue::as_number)
            .unwrap_or(1.0)
    }

    pub fn owns_endpoint(&self, endpoint_id: &str) -> bool {
        self.endpoints.iter().any(|endpoint| endpoint.id == endpoint_id)
    }
}

/// Directed connection from a component to an endpoint of another component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source_component: String,
    pub target_endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InfrastructureKind {
    Compute,
    Deployment,
}

impl InfrastructureKind {
    pub const fn label(self) -> &'static str {
        match self {
            InfrastructureKind::Compute => "compute",
            InfrastructureKind::Deployment => "deployment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub id: String,
    pub name: String,
    pub kind: InfrastructureKind,
    #[serde(default)]
    pub properties: Properties,
}

/// Places a component or infrastructure node on top of another infrastructure node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMapping {
    pub deployed_entity: String,
    pub underlying_infrastructure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAggregate {
    pub id: String,
    pub name: String,
}

/// A request entering through an external endpoint and the links it traverses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub id: String,
    pub name: String,
    pub external_endpoint: String,
    #[serde(default)]
    pub links: Vec<String>,
}
