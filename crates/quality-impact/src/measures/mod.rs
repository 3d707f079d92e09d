//! Architectural measure calculations, grouped by the scope they operate on.
//!
//! [`standard_measures`] bundles them as catalog specs so a catalog can reference them by id.

pub mod entity;
pub mod system;

use crate::quality::{MeasureCalculation, MeasureSpec, MeasureValue, ScopeKind};

pub const NUMBER_OF_SERVICES: &str = "numberOfServices";
pub const SERVICE_REPLICATION_LEVEL: &str = "serviceReplicationLevel";
pub const RATIO_OF_ASYNCHRONOUS_LINKS: &str = "ratioOfAsynchronousLinks";
pub const RATIO_OF_EXTERNAL_ENDPOINTS: &str = "ratioOfExternalEndpoints";
pub const RATIO_OF_SHARED_DATA_AGGREGATES: &str = "ratioOfSharedDataAggregates";
pub const RATIO_OF_COMPONENTS_ON_DEDICATED_INFRASTRUCTURE: &str =
    "ratioOfComponentsOnDedicatedInfrastructure";
pub const INCOMING_LINKS: &str = "incomingLinks";
pub const OUTGOING_LINKS: &str = "outgoingLinks";
pub const NUMBER_OF_ENDPOINTS: &str = "numberOfEndpoints";
pub const COMPONENT_REPLICATION: &str = "componentReplication";
pub const DEPLOYED_ON_SHARED_INFRASTRUCTURE: &str = "deployedOnSharedInfrastructure";
pub const LINKS_BETWEEN_COMPONENTS: &str = "linksBetweenComponents";
pub const SHARED_DATA_AGGREGATES: &str = "sharedDataAggregates";
pub const DEPLOYED_ENTITIES: &str = "deployedEntities";
pub const INFRASTRUCTURE_KIND: &str = "infrastructureKind";
pub const INVOLVED_COMPONENTS: &str = "involvedComponents";
pub const TRACE_LENGTH: &str = "traceLength";
pub const RATIO_OF_ASYNCHRONOUS_TRACE_LINKS: &str = "ratioOfAsynchronousTraceLinks";

/// `part / total`, or n/a when there is nothing to divide by.
pub(crate) fn ratio(part: usize, total: usize) -> MeasureValue {
    if total == 0 {
        MeasureValue::NotApplicable
    } else {
        MeasureValue::Number(part as f64 / total as f64)
    }
}

fn spec(
    id: &str,
    name: &str,
    scope: ScopeKind,
    description: &str,
    calculation: MeasureCalculation,
) -> MeasureSpec {
    MeasureSpec::new(id, name, scope)
        .described(description)
        .with_calculation(calculation)
}

/// Specs for every measure in this module, calculations attached.
pub fn standard_measures() -> Vec<MeasureSpec> {
    vec![
        spec(
            NUMBER_OF_SERVICES,
            "Number of services",
            ScopeKind::System,
            "Count of components of kind service.",
            MeasureCalculation::system(system::number_of_services),
        ),
        spec(
            SERVICE_REPLICATION_LEVEL,
            "Service replication level",
            ScopeKind::System,
            "Mean replica count across services; services without a replica property count once.",
            MeasureCalculation::system(system::service_replication_level),
        ),
        spec(
            RATIO_OF_ASYNCHRONOUS_LINKS,
            "Ratio of asynchronous links",
            ScopeKind::System,
            "Links targeting message endpoints divided by all links.",
            MeasureCalculation::system(system::ratio_of_asynchronous_links),
        ),
        spec(
            RATIO_OF_EXTERNAL_ENDPOINTS,
            "Ratio of external endpoints",
            ScopeKind::System,
            "External endpoints divided by all endpoints.",
            MeasureCalculation::system(system::ratio_of_external_endpoints),
        ),
        spec(
            RATIO_OF_SHARED_DATA_AGGREGATES,
            "Ratio of shared data aggregates",
            ScopeKind::System,
            "Data aggregates used by more than one component divided by all data aggregates.",
            MeasureCalculation::system(system::ratio_of_shared_data_aggregates),
        ),
        spec(
            RATIO_OF_COMPONENTS_ON_DEDICATED_INFRASTRUCTURE,
            "Ratio of components on dedicated infrastructure",
            ScopeKind::System,
            "Deployed components whose hosts carry no other component divided by deployed components.",
            MeasureCalculation::system(system::ratio_of_components_on_dedicated_infrastructure),
        ),
        spec(
            INCOMING_LINKS,
            "Incoming links",
            ScopeKind::Component,
            "Links targeting an endpoint of the component.",
            MeasureCalculation::component(entity::incoming_links),
        ),
        spec(
            OUTGOING_LINKS,
            "Outgoing links",
            ScopeKind::Component,
            "Links originating at the component.",
            MeasureCalculation::component(entity::outgoing_links),
        ),
        spec(
            NUMBER_OF_ENDPOINTS,
            "Number of endpoints",
            ScopeKind::Component,
            "Endpoints exposed by the component.",
            MeasureCalculation::component(entity::number_of_endpoints),
        ),
        spec(
            COMPONENT_REPLICATION,
            "Component replication",
            ScopeKind::Component,
            "Declared replica count of the component.",
            MeasureCalculation::component(entity::component_replication),
        ),
        spec(
            DEPLOYED_ON_SHARED_INFRASTRUCTURE,
            "Deployed on shared infrastructure",
            ScopeKind::Component,
            "1 when a host of the component carries another component, 0 otherwise.",
            MeasureCalculation::component(entity::deployed_on_shared_infrastructure),
        ),
        spec(
            LINKS_BETWEEN_COMPONENTS,
            "Links between components",
            ScopeKind::ComponentPair,
            "Links between the two components in either direction.",
            MeasureCalculation::component_pair(entity::links_between),
        ),
        spec(
            SHARED_DATA_AGGREGATES,
            "Shared data aggregates",
            ScopeKind::ComponentPair,
            "Data aggregates used by both components.",
            MeasureCalculation::component_pair(entity::shared_data_aggregates),
        ),
        spec(
            DEPLOYED_ENTITIES,
            "Deployed entities",
            ScopeKind::Infrastructure,
            "Components and infrastructure nodes deployed directly on the node.",
            MeasureCalculation::infrastructure(entity::deployed_entities),
        ),
        spec(
            INFRASTRUCTURE_KIND,
            "Infrastructure kind",
            ScopeKind::Infrastructure,
            "Whether the node is compute or deployment infrastructure.",
            MeasureCalculation::infrastructure(entity::infrastructure_kind),
        ),
        spec(
            INVOLVED_COMPONENTS,
            "Involved components",
            ScopeKind::RequestTrace,
            "Distinct components reached by the trace, including the entry component.",
            MeasureCalculation::request_trace(entity::involved_components),
        ),
        spec(
            TRACE_LENGTH,
            "Trace length",
            ScopeKind::RequestTrace,
            "Number of links traversed by the trace.",
            MeasureCalculation::request_trace(entity::trace_length),
        ),
        spec(
            RATIO_OF_ASYNCHRONOUS_TRACE_LINKS,
            "Ratio of asynchronous trace links",
            ScopeKind::RequestTrace,
            "Asynchronous links in the trace divided by all links in the trace.",
            MeasureCalculation::request_trace(entity::ratio_of_asynchronous_trace_links),
        ),
    ]
}
