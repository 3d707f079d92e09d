use crate::model::System;
use crate::quality::{MeasureResult, MeasureValue};

use super::ratio;

pub fn number_of_services(system: &System) -> MeasureResult {
    Ok(MeasureValue::Number(system.services().count() as f64))
}

/// Mean declared replica count across services.
pub fn service_replication_level(system: &System) -> MeasureResult {
    let replicas: Vec<f64> = system.services().map(|service| service.replicas()).collect();
    if replicas.is_empty() {
        return Ok(MeasureValue::NotApplicable);
    }
    Ok(MeasureValue::Number(
        replicas.iter().sum::<f64>() / replicas.len() as f64,
    ))
}

pub fn ratio_of_asynchronous_links(system: &System) -> MeasureResult {
    let asynchronous = system
        .links
        .iter()
        .filter(|link| system.is_asynchronous(link))
        .count();
    Ok(ratio(asynchronous, system.links.len()))
}

pub fn ratio_of_external_endpoints(system: &System) -> MeasureResult {
    let endpoints: Vec<_> = system.endpoints().collect();
    let external = endpoints
        .iter()
        .filter(|endpoint| endpoint.kind == crate::model::EndpointKind::External)
        .count();
    Ok(ratio(external, endpoints.len()))
}

/// Share of data aggregates used by more than one component.
pub fn ratio_of_shared_data_aggregates(system: &System) -> MeasureResult {
    let shared = system
        .data_aggregates
        .iter()
        .filter(|aggregate| system.users_of_aggregate(&aggregate.id).count() > 1)
        .count();
    Ok(ratio(shared, system.data_aggregates.len()))
}

/// Share of components whose hosts carry no other component.
pub fn ratio_of_components_on_dedicated_infrastructure(system: &System) -> MeasureResult {
    let deployed: Vec<_> = system
        .components
        .iter()
        .filter(|component| system.hosts_of(&component.id).next().is_some())
        .collect();

    let dedicated = deployed
        .iter()
        .filter(|component| {
            system.hosts_of(&component.id).all(|host| {
                system
                    .deployed_on(host)
                    .filter(|entity| system.component(entity).is_some())
                    .all(|entity| entity == component.id)
            })
        })
        .count();

    Ok(ratio(dedicated, deployed.len()))
}
