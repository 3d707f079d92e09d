use serde::{Deserialize, Serialize};

use super::domain::{
    Component, ComponentKind, DataAggregate, DeploymentMapping, Endpoint, Infrastructure, Link,
    RequestTrace,
};

/// Complete architecture model handed over by the modeling front end.
///
/// The evaluation engine only ever reads from a `System`; every query helper below borrows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub infrastructure: Vec<Infrastructure>,
    #[serde(default)]
    pub deployment_mappings: Vec<DeploymentMapping>,
    #[serde(default)]
    pub data_aggregates: Vec<DataAggregate>,
    #[serde(default)]
    pub request_traces: Vec<RequestTrace>,
}

impl System {
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }

    pub fn infrastructure_node(&self, id: &str) -> Option<&Infrastructure> {
        self.infrastructure.iter().find(|node| node.id == id)
    }

    pub fn request_trace(&self, id: &str) -> Option<&RequestTrace> {
        self.request_traces.iter().find(|trace| trace.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    pub fn services(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|component| component.kind == ComponentKind::Service)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.components
            .iter()
            .flat_map(|component| component.endpoints.iter())
    }

    pub fn endpoint(&self, endpoint_id: &str) -> Option<&Endpoint> {
        self.endpoints().find(|endpoint| endpoint.id == endpoint_id)
    }

    /// Component exposing the given endpoint.
    pub fn endpoint_owner(&self, endpoint_id: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|component| component.owns_endpoint(endpoint_id))
    }

    /// Component a link points at, resolved through its target endpoint.
    pub fn link_target(&self, link: &Link) -> Option<&Component> {
        self.endpoint_owner(&link.target_endpoint)
    }

    pub fn outgoing_links<'a>(&'a self, component_id: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links
            .iter()
            .filter(move |link| link.source_component == component_id)
    }

    pub fn incoming_links<'a>(&'a self, component_id: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links.iter().filter(move |link| {
            self.link_target(link)
                .map(|target| target.id == component_id)
                .unwrap_or(false)
        })
    }

    pub fn is_asynchronous(&self, link: &Link) -> bool {
        self.endpoint(&link.target_endpoint)
            .map(|endpoint| endpoint.kind.is_asynchronous())
            .unwrap_or(false)
    }

    /// Infrastructure nodes an entity is directly deployed on.
    pub fn hosts_of<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.deployment_mappings
            .iter()
            .filter(move |mapping| mapping.deployed_entity == entity_id)
            .map(|mapping| mapping.underlying_infrastructure.as_str())
    }

    /// Entities directly deployed on the given infrastructure node.
    pub fn deployed_on<'a>(&'a self, infrastructure_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.deployment_mappings
            .iter()
            .filter(move |mapping| mapping.underlying_infrastructure == infrastructure_id)
            .map(|mapping| mapping.deployed_entity.as_str())
    }

    /// Components touching the given data aggregate.
    pub fn users_of_aggregate<'a>(
        &'a self,
        aggregate_id: &'a str,
    ) -> impl Iterator<Item = &'a Component> {
        self.components.iter().filter(move |component| {
            component
                .data_aggregates
                .iter()
                .any(|aggregate| aggregate == aggregate_id)
        })
    }
}
