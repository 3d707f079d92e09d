use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quality_impact::evaluation::{ActiveSubset, EvaluatedNode, EvaluationError, EvaluationModel};
use quality_impact::measures::{self, SERVICE_REPLICATION_LEVEL};
use quality_impact::model::System;
use quality_impact::quality::{
    measure_bands, AspectSpec, BucketCurve, CatalogBuilder, EvaluationBinding, EvaluationResult,
    FactorLevel, FactorSpec, ImpactSpec, ImpactWeight, LevelBands, MeasureCalculation,
    MeasureError, MeasureSpec, MeasureValue, NodeRef, QualityModel, RuleContext, RuleRegistry,
    ScopeKind, Tendency, AGGREGATE_IMPACTS,
};
use serde_json::json;

fn services(replicas: &[f64]) -> System {
    let components: Vec<_> = replicas
        .iter()
        .enumerate()
        .map(|(index, replicas)| {
            json!({
                "id": format!("svc-{index}"),
                "name": format!("Service {index}"),
                "kind": "service",
                "properties": { "replicas": replicas },
            })
        })
        .collect();

    serde_json::from_value(json!({ "name": "shop", "components": components }))
        .expect("system fixture deserializes")
}

fn replication_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule(
        "serviceReplicationBands",
        measure_bands(
            SERVICE_REPLICATION_LEVEL,
            LevelBands::new(FactorLevel::High)
                .at_most(1.0, FactorLevel::None)
                .below(3.0, FactorLevel::Low),
        ),
    );
    registry
}

fn replication_catalog() -> QualityModel {
    measures::standard_measures()
        .into_iter()
        .fold(CatalogBuilder::new(replication_registry()), CatalogBuilder::measure)
        .factor(
            FactorSpec::new("serviceReplication", "Service replication")
                .with_measure(SERVICE_REPLICATION_LEVEL)
                .evaluated_by(EvaluationBinding::new("serviceReplicationBands")),
        )
        .aspect(
            AspectSpec::new("availability", "Availability")
                .under("reliability")
                .evaluated_by(EvaluationBinding::new(AGGREGATE_IMPACTS)),
        )
        .impact(ImpactSpec::new("serviceReplication", "availability", "positive"))
        .build()
        .expect("replication catalog builds")
}

/// Level rule for chained factors: `high` without impacts, otherwise driven by the mean score.
fn follow_upstream(context: &RuleContext<'_>) -> Result<EvaluationResult, EvaluationError> {
    if context.impacts().is_empty() {
        return Ok(FactorLevel::High.into());
    }
    let score = context.combine(&context.impact_weights())?;
    let level = if score > 0.0 {
        FactorLevel::High
    } else {
        FactorLevel::Low
    };
    Ok(level.into())
}

fn chain_catalog() -> QualityModel {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule("followUpstream", follow_upstream);

    let factor = |id: &str| {
        FactorSpec::new(id, id.to_uppercase()).evaluated_by(EvaluationBinding::new("followUpstream"))
    };

    CatalogBuilder::new(registry)
        .factor(factor("a"))
        .factor(factor("b"))
        .factor(factor("c"))
        .impact(ImpactSpec::new("a", "b", "positive"))
        .impact(ImpactSpec::new("b", "c", "positive"))
        .build()
        .expect("chain catalog builds")
}

#[test]
fn replicated_services_yield_high_replication_and_positive_availability() {
    let catalog = replication_catalog();
    let system = services(&[1.0, 5.0]);

    let outcome = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect("evaluation succeeds");

    let level = outcome
        .measure(SERVICE_REPLICATION_LEVEL)
        .expect("replication level calculated");
    assert_eq!(level.value, MeasureValue::Number(3.0));
    assert_eq!(level.scope, ScopeKind::System);
    assert_eq!(level.entity, "shop");

    let factor = outcome.factor("serviceReplication").expect("factor evaluated");
    assert_eq!(factor.result, EvaluationResult::Level(FactorLevel::High));
    assert_eq!(
        factor.measures.get(SERVICE_REPLICATION_LEVEL),
        Some(&MeasureValue::Number(3.0))
    );

    let forward = &factor.forward_impacting_paths[0];
    assert_eq!(forward.node, NodeRef::aspect("availability"));
    assert_eq!(forward.weight, ImpactWeight::Positive);

    let aspect = outcome.aspect("availability").expect("aspect evaluated");
    assert_eq!(aspect.high_level_aspect.as_deref(), Some("reliability"));
    let aggregate = aspect.result.aggregate().expect("aggregate result");
    assert_eq!(aggregate.tendency, Tendency::Positive);
    assert_eq!(aggregate.impacts, vec![ImpactWeight::Positive]);

    let backward = &aspect.backward_impacting_paths[0];
    assert_eq!(backward.weight, forward.weight);
    assert_eq!(backward.linked, Some(NodeRef::factor("serviceReplication")));
    match outcome.resolve(&backward.node) {
        Some(EvaluatedNode::Factor(record)) => assert_eq!(record.id, "serviceReplication"),
        other => panic!("expected the factor record, got {other:?}"),
    }
}

#[test]
fn unused_measures_of_the_scope_kind_are_completed_for_display() {
    let catalog = replication_catalog();
    let system = services(&[2.0, 2.0, 2.0]);

    let outcome = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect("evaluation succeeds");

    assert_eq!(
        outcome
            .measure(measures::NUMBER_OF_SERVICES)
            .map(|measure| measure.value.clone()),
        Some(MeasureValue::Number(3.0))
    );
    assert_eq!(
        outcome
            .measure(measures::RATIO_OF_ASYNCHRONOUS_LINKS)
            .map(|measure| measure.value.clone()),
        Some(MeasureValue::NotApplicable)
    );
    assert!(outcome
        .calculated_measures
        .values()
        .all(|measure| measure.scope == ScopeKind::System));
}

#[test]
fn impacting_factors_are_evaluated_first_regardless_of_activation_order() {
    let catalog = chain_catalog();
    let system = System::default();

    for order in [["a", "b", "c"], ["c", "b", "a"]] {
        let active = ActiveSubset::from_ids(&catalog, order, Vec::<&str>::new())
            .expect("ids resolve");
        let outcome = EvaluationModel::for_system(&catalog, &system, active)
            .evaluate()
            .expect("chain evaluates");

        assert_eq!(outcome.evaluation_order, vec!["a", "b", "c"]);
        assert_eq!(
            outcome.factor("c").map(|factor| factor.result.clone()),
            Some(EvaluationResult::Level(FactorLevel::High))
        );
    }
}

#[test]
fn inactive_neighbours_are_ignored() {
    let catalog = chain_catalog();
    let system = System::default();
    let active =
        ActiveSubset::from_ids(&catalog, ["b"], Vec::<&str>::new()).expect("ids resolve");

    let outcome = EvaluationModel::for_system(&catalog, &system, active)
        .evaluate()
        .expect("single factor evaluates");

    let b = outcome.factor("b").expect("b evaluated");
    assert!(b.backward_impacting_paths.is_empty());
    assert!(b.forward_impacting_paths.is_empty());
    assert_eq!(b.result, EvaluationResult::Level(FactorLevel::High));
    assert!(outcome.factor("a").is_none());
}

#[test]
fn cyclic_active_factors_are_reported() {
    let catalog = CatalogBuilder::new(RuleRegistry::with_builtins())
        .factor(FactorSpec::new("a", "A"))
        .factor(FactorSpec::new("b", "B"))
        .impact(ImpactSpec::new("a", "b", "positive"))
        .impact(ImpactSpec::new("b", "a", "negative"))
        .build()
        .expect("cyclic catalog builds");
    let system = System::default();

    let err = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect_err("cycle detected");
    match err {
        EvaluationError::CyclicActiveSubset { mut factors } => {
            factors.sort();
            assert_eq!(factors, vec!["a", "b"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }

    let active = ActiveSubset::from_ids(&catalog, ["a"], Vec::<&str>::new()).expect("ids");
    assert!(EvaluationModel::for_system(&catalog, &system, active)
        .evaluate()
        .is_ok());
}

#[test]
fn reschedule_budget_bounds_requeues() {
    let catalog = chain_catalog();
    let system = System::default();
    let active = ActiveSubset::from_ids(&catalog, ["c", "b", "a"], Vec::<&str>::new())
        .expect("ids resolve");

    let err = EvaluationModel::for_system(&catalog, &system, active)
        .with_reschedule_budget(Some(0))
        .evaluate()
        .expect_err("budget exhausted");
    assert_eq!(err, EvaluationError::RescheduleBudgetExceeded { budget: 0 });
}

#[test]
fn measures_are_calculated_once_per_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule(
        "bands",
        measure_bands("counted", LevelBands::new(FactorLevel::Moderate)),
    );

    let catalog = CatalogBuilder::new(registry)
        .measure(
            MeasureSpec::new("counted", "Counted", ScopeKind::System).with_calculation(
                MeasureCalculation::system(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(MeasureValue::Number(0.5))
                }),
            ),
        )
        .factor(
            FactorSpec::new("first", "First")
                .with_measure("counted")
                .evaluated_by(EvaluationBinding::new("bands")),
        )
        .factor(
            FactorSpec::new("second", "Second")
                .with_measure("counted")
                .evaluated_by(EvaluationBinding::new("bands")),
        )
        .build()
        .expect("catalog builds");
    let system = System::default();
    let model = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog));

    model.evaluate().expect("first run");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    model.evaluate().expect("second run");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn numeric_results_are_bucketed_with_the_factor_curve() {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule("half", |_: &RuleContext<'_>| Ok(EvaluationResult::Numeric(0.5)));

    let catalog = CatalogBuilder::new(registry)
        .factor(FactorSpec::new("linear", "Linear").evaluated_by(EvaluationBinding::new("half")))
        .factor(
            FactorSpec::new("steep", "Steep")
                .with_curve(BucketCurve::Exponential)
                .evaluated_by(EvaluationBinding::new("half")),
        )
        .aspect(AspectSpec::new("target", "Target"))
        .impact(ImpactSpec::new("linear", "target", "positive"))
        .impact(ImpactSpec::new("steep", "target", "strongly negative"))
        .build()
        .expect("catalog builds");
    let system = System::default();

    let outcome = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect("evaluation succeeds");

    let weight = |id: &str| outcome.factor(id).expect("evaluated").forward_impacting_paths[0].weight;
    assert_eq!(weight("linear"), ImpactWeight::SlightlyPositive);
    assert_eq!(weight("steep"), ImpactWeight::Negative);

    let target = outcome.aspect("target").expect("aspect evaluated");
    assert_eq!(target.result, EvaluationResult::NotApplicable);
    assert_eq!(target.reasoning, "no evaluation rule assigned");
    assert_eq!(target.backward_impacting_paths.len(), 2);
}

#[test]
fn out_of_range_numeric_results_abort_the_run() {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule("tooHigh", |_: &RuleContext<'_>| Ok(EvaluationResult::Numeric(1.5)));

    let catalog = CatalogBuilder::new(registry)
        .factor(FactorSpec::new("f", "F").evaluated_by(EvaluationBinding::new("tooHigh")))
        .build()
        .expect("catalog builds");
    let system = System::default();

    let err = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect_err("result out of range");
    assert_eq!(err, EvaluationError::OutOfRange { value: 1.5 });
}

#[test]
fn rules_reading_undeclared_measures_fail() {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule(
        "peek",
        measure_bands(measures::NUMBER_OF_SERVICES, LevelBands::new(FactorLevel::Low)),
    );

    let catalog = measures::standard_measures()
        .into_iter()
        .fold(CatalogBuilder::new(registry), CatalogBuilder::measure)
        .factor(FactorSpec::new("f", "F").evaluated_by(EvaluationBinding::new("peek")))
        .build()
        .expect("catalog builds");
    let system = services(&[1.0]);

    let err = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect_err("measure was never declared");
    assert_eq!(
        err,
        EvaluationError::MissingMeasureValue {
            node: "f".to_string(),
            measure: measures::NUMBER_OF_SERVICES.to_string(),
        }
    );
}

#[test]
fn not_applicable_measures_propagate_to_aspects() {
    let mut registry = RuleRegistry::with_builtins();
    registry.register_rule(
        "asyncBands",
        measure_bands(
            measures::RATIO_OF_ASYNCHRONOUS_LINKS,
            LevelBands::new(FactorLevel::High).below(0.5, FactorLevel::Low),
        ),
    );

    let catalog = measures::standard_measures()
        .into_iter()
        .fold(CatalogBuilder::new(registry), CatalogBuilder::measure)
        .factor(
            FactorSpec::new("asyncCommunication", "Asynchronous communication")
                .with_measure(measures::RATIO_OF_ASYNCHRONOUS_LINKS)
                .evaluated_by(EvaluationBinding::new("asyncBands")),
        )
        .aspect(
            AspectSpec::new("elasticity", "Elasticity")
                .evaluated_by(EvaluationBinding::new(AGGREGATE_IMPACTS)),
        )
        .impact(ImpactSpec::new("asyncCommunication", "elasticity", "positive"))
        .build()
        .expect("catalog builds");
    let system = services(&[1.0]);

    let outcome = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect("evaluation succeeds");

    let factor = outcome.factor("asyncCommunication").expect("factor evaluated");
    assert!(factor.result.is_not_applicable());
    assert_eq!(
        factor.forward_impacting_paths[0].weight,
        ImpactWeight::NotApplicable
    );

    let aggregate = outcome
        .aspect("elasticity")
        .and_then(|aspect| aspect.result.aggregate())
        .expect("aggregate result");
    assert_eq!(aggregate.tendency, Tendency::NotApplicable);
    assert_eq!(aggregate.impacts, vec![ImpactWeight::NotApplicable]);
}

#[test]
fn failing_measures_outside_the_active_subset_are_skipped() {
    let catalog = CatalogBuilder::new(RuleRegistry::with_builtins())
        .measure(
            MeasureSpec::new("flaky", "Flaky", ScopeKind::System).with_calculation(
                MeasureCalculation::system(|_| Err(MeasureError::Calculation("boom".into()))),
            ),
        )
        .measure(
            MeasureSpec::new("steady", "Steady", ScopeKind::System)
                .with_calculation(MeasureCalculation::system(|_| Ok(MeasureValue::Number(1.0)))),
        )
        .factor(FactorSpec::new("uses-flaky", "Uses flaky").with_measure("flaky"))
        .build()
        .expect("catalog builds");
    let system = System::default();

    let outcome = EvaluationModel::for_system(&catalog, &system, ActiveSubset::default())
        .evaluate()
        .expect("failures outside active factors are not fatal");
    assert!(outcome.measure("flaky").is_none());
    assert!(outcome.measure("steady").is_some());

    let err = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog))
        .evaluate()
        .expect_err("declared measure fails");
    assert!(matches!(err, EvaluationError::Measure { ref measure, .. } if measure == "flaky"));
}

#[test]
fn unknown_ids_are_rejected_before_the_run() {
    let catalog = replication_catalog();
    let system = services(&[1.0]);

    let err = ActiveSubset::from_ids(&catalog, ["ghost"], Vec::<&str>::new())
        .expect_err("unknown factor id");
    assert_eq!(err, EvaluationError::UnknownActiveId("ghost".to_string()));

    let err = EvaluationModel::for_component(&catalog, &system, "ghost", ActiveSubset::default())
        .expect_err("unknown component");
    assert!(matches!(
        err,
        EvaluationError::UnknownScopeEntity { kind: ScopeKind::Component, .. }
    ));
}

#[test]
fn repeated_runs_serialize_identically() {
    let catalog = replication_catalog();
    let system = services(&[1.0, 2.0, 4.0]);
    let model = EvaluationModel::for_system(&catalog, &system, ActiveSubset::all(&catalog));

    let first = serde_json::to_value(model.evaluate().expect("first run")).expect("serializes");
    let second = serde_json::to_value(model.evaluate().expect("second run")).expect("serializes");
    assert_eq!(first, second);

    assert_eq!(
        first["evaluatedProductFactors"]["serviceReplication"]["result"],
        json!("low")
    );
    assert_eq!(
        first["calculatedMeasures"][SERVICE_REPLICATION_LEVEL]["type"],
        json!("system")
    );
    assert_eq!(
        first["evaluatedQualityAspects"]["availability"]["backwardImpactingPaths"][0]["weight"],
        json!("neutral")
    );
}
