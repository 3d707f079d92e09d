use clap::Args;
use quality_impact::config::{AppConfig, EvaluationSettings};
use quality_impact::error::AppError;
use quality_impact::evaluation::EvaluationError;
use quality_impact::measures::{self, standard_measures};
use quality_impact::model::System;
use quality_impact::quality::{
    measure_bands, AspectSpec, CatalogBuilder, CatalogError, EvaluationBinding, EvaluationResult,
    FactorLevel, FactorSpec, ImpactSpec, ImpactWeight, LevelBands, QualityModel,
    RuleContext, RuleRegistry, AGGREGATE_IMPACTS,
};
use serde::Serialize;
use serde_json::json;

const PESSIMISTIC_SCORE: &str = "pessimisticScore";
const IMPACT_LEVEL: &str = "impactLevel";

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print the catalog as JSON instead of a plain listing
    #[arg(long)]
    pub(crate) json: bool,
}

/// Lowest score among the applicable weights, so one bad impact dominates.
fn pessimistic_score(weights: &[ImpactWeight]) -> f64 {
    weights
        .iter()
        .filter_map(|weight| weight.score())
        .min()
        .map(f64::from)
        .unwrap_or(0.0)
}

/// Level of a factor driven only by the factors impacting it.
fn impact_level(context: &RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> {
    let weights = context.impact_weights();
    if weights.iter().all(|weight| *weight == ImpactWeight::NotApplicable) {
        return Ok(EvaluationResult::NotApplicable);
    }

    let score = context.combine(&weights)?;
    let level = if score >= 1.5 {
        FactorLevel::High
    } else if score >= 0.5 {
        FactorLevel::Moderate
    } else if score > 0.0 {
        FactorLevel::Low
    } else {
        FactorLevel::None
    };
    Ok(level.into())
}

/// Component coupling over both directions of traffic.
fn component_coupling(context: &RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> {
    let incoming = context.numeric_measure(measures::INCOMING_LINKS)?;
    let outgoing = context.numeric_measure(measures::OUTGOING_LINKS)?;
    let (Some(incoming), Some(outgoing)) = (incoming, outgoing) else {
        return Ok(EvaluationResult::NotApplicable);
    };

    let bands = LevelBands::new(FactorLevel::High)
        .at_most(0.0, FactorLevel::None)
        .below(3.0, FactorLevel::Low)
        .below(6.0, FactorLevel::Moderate);
    Ok(bands.classify(incoming + outgoing).into())
}

fn demo_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::with_builtins();
    registry
        .register_combination(PESSIMISTIC_SCORE, pessimistic_score)
        .register_rule(IMPACT_LEVEL, impact_level)
        .register_rule("componentCoupling", component_coupling)
        .register_rule(
            "serviceReplicationBands",
            measure_bands(
                measures::SERVICE_REPLICATION_LEVEL,
                LevelBands::new(FactorLevel::High)
                    .at_most(1.0, FactorLevel::None)
                    .below(3.0, FactorLevel::Low),
            ),
        )
        .register_rule(
            "asynchronousCommunicationBands",
            measure_bands(
                measures::RATIO_OF_ASYNCHRONOUS_LINKS,
                LevelBands::new(FactorLevel::High)
                    .at_most(0.0, FactorLevel::None)
                    .below(0.3, FactorLevel::Low)
                    .below(0.6, FactorLevel::Moderate),
            ),
        )
        .register_rule(
            "dataSharingBands",
            measure_bands(
                measures::RATIO_OF_SHARED_DATA_AGGREGATES,
                LevelBands::new(FactorLevel::High)
                    .at_most(0.0, FactorLevel::None)
                    .below(0.25, FactorLevel::Low)
                    .below(0.5, FactorLevel::Moderate),
            ),
        )
        .register_rule(
            "dedicatedInfrastructureBands",
            measure_bands(
                measures::RATIO_OF_COMPONENTS_ON_DEDICATED_INFRASTRUCTURE,
                LevelBands::new(FactorLevel::High)
                    .at_most(0.0, FactorLevel::None)
                    .below(0.5, FactorLevel::Low)
                    .below(0.8, FactorLevel::Moderate),
            ),
        )
        .register_rule(
            "componentReplicationBands",
            measure_bands(
                measures::COMPONENT_REPLICATION,
                LevelBands::new(FactorLevel::High)
                    .at_most(1.0, FactorLevel::None)
                    .below(3.0, FactorLevel::Low),
            ),
        )
        .register_rule(
            "pairCouplingBands",
            measure_bands(
                measures::LINKS_BETWEEN_COMPONENTS,
                LevelBands::new(FactorLevel::High)
                    .at_most(0.0, FactorLevel::None)
                    .at_most(1.0, FactorLevel::Low)
                    .below(4.0, FactorLevel::Moderate),
            ),
        )
        .register_rule(
            "hostDensityBands",
            measure_bands(
                measures::DEPLOYED_ENTITIES,
                LevelBands::new(FactorLevel::High)
                    .at_most(1.0, FactorLevel::None)
                    .below(3.0, FactorLevel::Low)
                    .below(5.0, FactorLevel::Moderate),
            ),
        )
        .register_rule(
            "traceSpreadBands",
            measure_bands(
                measures::INVOLVED_COMPONENTS,
                LevelBands::new(FactorLevel::High)
                    .at_most(2.0, FactorLevel::Low)
                    .below(4.0, FactorLevel::Moderate),
            ),
        );
    registry
}

fn factor(id: &str, name: &str, evaluation: &str) -> FactorSpec {
    FactorSpec::new(id, name).evaluated_by(EvaluationBinding::new(evaluation))
}

fn aspect(id: &str, name: &str, high_level_aspect: &str) -> AspectSpec {
    AspectSpec::new(id, name)
        .under(high_level_aspect)
        .evaluated_by(EvaluationBinding::new(AGGREGATE_IMPACTS))
}

/// Catalog of microservice product factors and the quality aspects they impact.
pub(crate) fn demo_catalog(settings: &EvaluationSettings) -> Result<QualityModel, CatalogError> {
    let impacts = [
        ("serviceReplication", "availability", "positive"),
        ("serviceReplication", "elasticity", "positive"),
        ("asynchronousCommunication", "looseCoupling", "positive"),
        ("asynchronousCommunication", "elasticity", "positive"),
        ("dataSharing", "looseCoupling", "strongly negative"),
        ("dedicatedInfrastructure", "faultTolerance", "positive"),
        ("looseCoupling", "modifiability", "strongly positive"),
        ("looseCoupling", "faultTolerance", "positive"),
        ("componentReplication", "availability", "positive"),
        ("componentCoupling", "modifiability", "negative"),
        ("pairCoupling", "modifiability", "negative"),
        ("hostDensity", "faultTolerance", "negative"),
        ("traceSpread", "availability", "negative"),
    ];

    let builder = standard_measures()
        .into_iter()
        .fold(CatalogBuilder::new(demo_registry()), CatalogBuilder::measure)
        .default_curve(settings.default_curve)
        .factor(
            factor("serviceReplication", "Service replication", "serviceReplicationBands")
                .with_measure(measures::SERVICE_REPLICATION_LEVEL),
        )
        .factor(
            factor(
                "asynchronousCommunication",
                "Asynchronous communication",
                "asynchronousCommunicationBands",
            )
            .with_measure(measures::RATIO_OF_ASYNCHRONOUS_LINKS),
        )
        .factor(
            factor("dataSharing", "Shared data", "dataSharingBands")
                .with_measure(measures::RATIO_OF_SHARED_DATA_AGGREGATES),
        )
        .factor(
            factor(
                "dedicatedInfrastructure",
                "Dedicated infrastructure",
                "dedicatedInfrastructureBands",
            )
            .with_measure(measures::RATIO_OF_COMPONENTS_ON_DEDICATED_INFRASTRUCTURE),
        )
        .factor(factor("looseCoupling", "Loose coupling", IMPACT_LEVEL))
        .factor(
            factor("componentReplication", "Component replication", "componentReplicationBands")
                .with_measure(measures::COMPONENT_REPLICATION),
        )
        .factor(
            factor("componentCoupling", "Component coupling", "componentCoupling")
                .with_measure(measures::INCOMING_LINKS)
                .with_measure(measures::OUTGOING_LINKS),
        )
        .factor(
            factor("pairCoupling", "Pairwise coupling", "pairCouplingBands")
                .with_measure(measures::LINKS_BETWEEN_COMPONENTS),
        )
        .factor(
            factor("hostDensity", "Host density", "hostDensityBands")
                .with_measure(measures::DEPLOYED_ENTITIES),
        )
        .factor(
            factor("traceSpread", "Request trace spread", "traceSpreadBands")
                .with_measure(measures::INVOLVED_COMPONENTS),
        )
        .aspect(aspect("availability", "Availability", "reliability"))
        .aspect(
            AspectSpec::new("faultTolerance", "Fault tolerance")
                .under("reliability")
                .evaluated_by(
                    EvaluationBinding::new(AGGREGATE_IMPACTS).with_combination(PESSIMISTIC_SCORE),
                ),
        )
        .aspect(aspect("elasticity", "Elasticity", "performanceEfficiency"))
        .aspect(aspect("modifiability", "Modifiability", "maintainability"));

    impacts
        .into_iter()
        .fold(builder, |builder, (source, target, impact_type)| {
            builder.impact(ImpactSpec::new(source, target, impact_type))
        })
        .build()
}

/// Small web shop: a gateway in front of three services, a broker and two databases.
pub(crate) fn demo_system() -> Result<System, AppError> {
    let system = serde_json::from_value(json!({
        "name": "Web shop",
        "components": [
            {
                "id": "gateway",
                "name": "API gateway",
                "kind": "proxyBackingService",
                "endpoints": [{ "id": "gateway-web", "name": "web", "kind": "external" }]
            },
            {
                "id": "catalog",
                "name": "Catalog service",
                "kind": "service",
                "endpoints": [{ "id": "catalog-api", "name": "api", "kind": "internal" }],
                "data_aggregates": ["product"],
                "properties": { "replicas": 2 }
            },
            {
                "id": "orders",
                "name": "Order service",
                "kind": "service",
                "endpoints": [{ "id": "orders-api", "name": "api", "kind": "internal" }],
                "data_aggregates": ["order", "product"],
                "properties": { "replicas": 3 }
            },
            {
                "id": "payments",
                "name": "Payment service",
                "kind": "service",
                "endpoints": [{ "id": "payments-events", "name": "events", "kind": "messageConsumer" }],
                "data_aggregates": ["order"]
            },
            {
                "id": "broker",
                "name": "Message broker",
                "kind": "brokerBackingService",
                "endpoints": [{ "id": "broker-topic", "name": "topic", "kind": "messageProducer" }]
            },
            {
                "id": "orders-db",
                "name": "Order database",
                "kind": "storageBackingService",
                "endpoints": [{ "id": "orders-db-sql", "name": "sql", "kind": "internal" }]
            }
        ],
        "links": [
            { "id": "gateway-catalog", "source_component": "gateway", "target_endpoint": "catalog-api" },
            { "id": "gateway-orders", "source_component": "gateway", "target_endpoint": "orders-api" },
            { "id": "orders-db", "source_component": "orders", "target_endpoint": "orders-db-sql" },
            { "id": "orders-catalog", "source_component": "orders", "target_endpoint": "catalog-api" },
            { "id": "orders-payments", "source_component": "orders", "target_endpoint": "payments-events" },
            { "id": "payments-broker", "source_component": "payments", "target_endpoint": "broker-topic" }
        ],
        "infrastructure": [
            { "id": "cluster", "name": "Kubernetes cluster", "kind": "deployment" },
            { "id": "vm-1", "name": "VM 1", "kind": "compute" },
            { "id": "vm-2", "name": "VM 2", "kind": "compute" }
        ],
        "deployment_mappings": [
            { "deployed_entity": "gateway", "underlying_infrastructure": "cluster" },
            { "deployed_entity": "catalog", "underlying_infrastructure": "cluster" },
            { "deployed_entity": "orders", "underlying_infrastructure": "cluster" },
            { "deployed_entity": "payments", "underlying_infrastructure": "cluster" },
            { "deployed_entity": "broker", "underlying_infrastructure": "vm-1" },
            { "deployed_entity": "orders-db", "underlying_infrastructure": "vm-2" },
            { "deployed_entity": "cluster", "underlying_infrastructure": "vm-1" }
        ],
        "data_aggregates": [
            { "id": "product", "name": "Product" },
            { "id": "order", "name": "Order" }
        ],
        "request_traces": [
            {
                "id": "checkout",
                "name": "Checkout",
                "external_endpoint": "gateway-web",
                "links": ["gateway-orders", "orders-catalog", "orders-db", "orders-payments"]
            },
            {
                "id": "browse",
                "name": "Browse products",
                "external_endpoint": "gateway-web",
                "links": ["gateway-catalog"]
            }
        ]
    }))?;
    Ok(system)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogView {
    factors: Vec<NodeView>,
    aspects: Vec<NodeView>,
    impacts: Vec<ImpactView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeView {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    measures: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImpactView {
    source: String,
    target: String,
    impact_type: String,
}

fn catalog_view(catalog: &QualityModel) -> CatalogView {
    let factors = catalog
        .factors()
        .map(|(_, factor)| NodeView {
            id: factor.id.clone(),
            name: factor.name.clone(),
            evaluation: factor.evaluation().map(|binding| binding.evaluation.clone()),
            measures: factor
                .measures()
                .iter()
                .map(|index| catalog.measure(*index).id.clone())
                .collect(),
        })
        .collect();

    let aspects = catalog
        .aspects()
        .map(|(_, aspect)| NodeView {
            id: aspect.id.clone(),
            name: aspect.name.clone(),
            evaluation: aspect.evaluation().map(|binding| binding.evaluation.clone()),
            measures: Vec::new(),
        })
        .collect();

    let impacts = catalog
        .factors()
        .flat_map(|(_, factor)| {
            factor.outgoing_impacts().iter().map(move |index| {
                let impact = catalog.impact(*index);
                ImpactView {
                    source: factor.id.clone(),
                    target: catalog.node_id(impact.target).to_string(),
                    impact_type: impact.impact_type.to_string(),
                }
            })
        })
        .collect();

    CatalogView {
        factors,
        aspects,
        impacts,
    }
}

pub(crate) fn run_catalog(args: CatalogArgs, config: &AppConfig) -> Result<(), AppError> {
    let catalog = demo_catalog(&config.evaluation)?;
    let view = catalog_view(&catalog);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Product factors");
    for factor in &view.factors {
        println!(
            "- {} ({}) evaluated by {} using [{}]",
            factor.id,
            factor.name,
            factor.evaluation.as_deref().unwrap_or("n/a"),
            factor.measures.join(", ")
        );
    }

    println!("\nQuality aspects");
    for aspect in &view.aspects {
        println!("- {} ({})", aspect.id, aspect.name);
    }

    println!("\nImpacts");
    for impact in &view.impacts {
        println!(
            "- {} -> {} [{}]",
            impact.source, impact.target, impact.impact_type
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_catalog_builds_with_default_settings() {
        let catalog = demo_catalog(&EvaluationSettings::default()).expect("demo catalog builds");
        let view = catalog_view(&catalog);
        assert_eq!(view.factors.len(), 10);
        assert_eq!(view.aspects.len(), 4);
        assert_eq!(view.impacts.len(), 13);
    }

    #[test]
    fn demo_system_references_resolve() {
        let system = demo_system().expect("demo system deserializes");
        for link in &system.links {
            assert!(system.link_target(link).is_some(), "link {}", link.id);
        }
        for trace in &system.request_traces {
            assert!(system.endpoint_owner(&trace.external_endpoint).is_some());
        }
    }

    #[test]
    fn pessimistic_score_ignores_not_applicable() {
        assert_eq!(
            pessimistic_score(&[
                ImpactWeight::Positive,
                ImpactWeight::NotApplicable,
                ImpactWeight::SlightlyNegative
            ]),
            -1.0
        );
        assert_eq!(pessimistic_score(&[ImpactWeight::NotApplicable]), 0.0);
    }
}
