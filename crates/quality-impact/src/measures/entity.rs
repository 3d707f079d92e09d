//! Measures over a single component, a component pair, an infrastructure node or a request trace.

use std::collections::BTreeSet;

use crate::model::{Component, Infrastructure, RequestTrace, System};
use crate::quality::{MeasureError, MeasureResult, MeasureValue};

use super::ratio;

pub fn incoming_links(system: &System, component: &Component) -> MeasureResult {
    Ok(MeasureValue::Number(
        system.incoming_links(&component.id).count() as f64,
    ))
}

pub fn outgoing_links(system: &System, component: &Component) -> MeasureResult {
    Ok(MeasureValue::Number(
        system.outgoing_links(&component.id).count() as f64,
    ))
}

pub fn number_of_endpoints(_system: &System, component: &Component) -> MeasureResult {
    Ok(MeasureValue::Number(component.endpoints.len() as f64))
}

pub fn component_replication(_system: &System, component: &Component) -> MeasureResult {
    Ok(MeasureValue::Number(component.replicas()))
}

/// `1` when any host of the component also carries another component, `0` otherwise.
pub fn deployed_on_shared_infrastructure(system: &System, component: &Component) -> MeasureResult {
    let mut hosts = system.hosts_of(&component.id).peekable();
    if hosts.peek().is_none() {
        return Ok(MeasureValue::NotApplicable);
    }

    let shared = hosts.any(|host| {
        system
            .deployed_on(host)
            .any(|entity| entity != component.id && system.component(entity).is_some())
    });
    Ok(MeasureValue::Number(if shared { 1.0 } else { 0.0 }))
}

/// Links between the two components in either direction.
pub fn links_between(system: &System, first: &Component, second: &Component) -> MeasureResult {
    let count = system
        .links
        .iter()
        .filter(|link| {
            let target = system.link_target(link).map(|target| target.id.as_str());
            (link.source_component == first.id && target == Some(second.id.as_str()))
                || (link.source_component == second.id && target == Some(first.id.as_str()))
        })
        .count();
    Ok(MeasureValue::Number(count as f64))
}

pub fn shared_data_aggregates(
    _system: &System,
    first: &Component,
    second: &Component,
) -> MeasureResult {
    let first_aggregates: BTreeSet<&str> = first.data_aggregates.iter().map(String::as_str).collect();
    let shared = second
        .data_aggregates
        .iter()
        .filter(|aggregate| first_aggregates.contains(aggregate.as_str()))
        .count();
    Ok(MeasureValue::Number(shared as f64))
}

pub fn deployed_entities(system: &System, node: &Infrastructure) -> MeasureResult {
    Ok(MeasureValue::Number(system.deployed_on(&node.id).count() as f64))
}

pub fn infrastructure_kind(_system: &System, node: &Infrastructure) -> MeasureResult {
    Ok(MeasureValue::Enumerated(node.kind.label().to_string()))
}

fn trace_components<'a>(
    system: &'a System,
    trace: &RequestTrace,
) -> Result<BTreeSet<&'a str>, MeasureError> {
    let mut components = BTreeSet::new();
    if let Some(entry) = system.endpoint_owner(&trace.external_endpoint) {
        components.insert(entry.id.as_str());
    }

    for link_id in &trace.links {
        let link = system
            .link(link_id)
            .ok_or_else(|| MeasureError::MissingEntity(link_id.clone()))?;
        components.insert(link.source_component.as_str());
        if let Some(target) = system.link_target(link) {
            components.insert(target.id.as_str());
        }
    }

    Ok(components)
}

pub fn involved_components(system: &System, trace: &RequestTrace) -> MeasureResult {
    Ok(MeasureValue::Number(
        trace_components(system, trace)?.len() as f64,
    ))
}

pub fn trace_length(_system: &System, trace: &RequestTrace) -> MeasureResult {
    Ok(MeasureValue::Number(trace.links.len() as f64))
}

pub fn ratio_of_asynchronous_trace_links(system: &System, trace: &RequestTrace) -> MeasureResult {
    let mut asynchronous = 0;
    for link_id in &trace.links {
        let link = system
            .link(link_id)
            .ok_or_else(|| MeasureError::MissingEntity(link_id.clone()))?;
        if system.is_asynchronous(link) {
            asynchronous += 1;
        }
    }
    Ok(ratio(asynchronous, trace.links.len()))
}
