//! Architecture model consumed by the evaluation engine.
//!
//! These types mirror what the modeling front end produces: components with endpoints, the links
//! between them, infrastructure with deployment mappings, data aggregates and request traces.

pub mod domain;
mod system;

pub use domain::{
    Component, ComponentKind, DataAggregate, DeploymentMapping, Endpoint, EndpointKind,
    Infrastructure, InfrastructureKind, Link, Properties, PropertyValue, RequestTrace,
};
pub use system::System;
