use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use super::active::ActiveSubset;
use super::error::EvaluationError;
use crate::quality::{FactorIndex, QualityModel};

/// Order active factors so that every active impacting factor precedes the factors it impacts.
///
/// Factors are taken from the head of a queue; a factor still waiting on an active upstream factor
/// is requeued at the tail. A full rotation of the queue without progress means the remaining
/// factors are stuck behind a cycle. `budget` optionally caps the total number of requeues.
pub(crate) fn schedule(
    model: &QualityModel,
    active: &ActiveSubset,
    budget: Option<usize>,
) -> Result<Vec<FactorIndex>, EvaluationError> {
    let mut queue: VecDeque<FactorIndex> = active.factors().iter().copied().collect();
    let mut scheduled = BTreeSet::new();
    let mut order = Vec::with_capacity(queue.len());
    let mut stalled = 0usize;
    let mut requeues = 0usize;

    while let Some(factor) = queue.pop_front() {
        let waiting = model
            .impacting_factors(factor)
            .into_iter()
            .find(|upstream| active.contains_factor(*upstream) && !scheduled.contains(upstream));

        if let Some(upstream) = waiting {
            requeues += 1;
            if let Some(limit) = budget {
                if requeues > limit {
                    return Err(EvaluationError::RescheduleBudgetExceeded { budget: limit });
                }
            }

            debug!(
                factor = %model.factor(factor).id,
                waiting_on = %model.factor(upstream).id,
                "rescheduling factor"
            );
            queue.push_back(factor);
            stalled += 1;

            if stalled >= queue.len() {
                let factors = queue
                    .iter()
                    .map(|index| model.factor(*index).id.clone())
                    .collect();
                return Err(EvaluationError::CyclicActiveSubset { factors });
            }
            continue;
        }

        stalled = 0;
        scheduled.insert(factor);
        order.push(factor);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{CatalogBuilder, FactorSpec, ImpactSpec, RuleRegistry};

    fn chain() -> QualityModel {
        CatalogBuilder::new(RuleRegistry::with_builtins())
            .factor(FactorSpec::new("c", "C"))
            .factor(FactorSpec::new("b", "B"))
            .factor(FactorSpec::new("a", "A"))
            .impact(ImpactSpec::new("a", "b", "positive"))
            .impact(ImpactSpec::new("b", "c", "positive"))
            .build()
            .expect("catalog builds")
    }

    fn ids(model: &QualityModel, order: &[FactorIndex]) -> Vec<String> {
        order
            .iter()
            .map(|index| model.factor(*index).id.clone())
            .collect()
    }

    #[test]
    fn upstream_factors_come_first_regardless_of_queue_order() {
        let model = chain();

        let forward = ActiveSubset::from_ids(&model, ["a", "b", "c"], [] as [&str; 0])
            .expect("ids resolve");
        let reversed = ActiveSubset::from_ids(&model, ["c", "b", "a"], [] as [&str; 0])
            .expect("ids resolve");

        for active in [forward, reversed] {
            let order = schedule(&model, &active, None).expect("acyclic");
            assert_eq!(ids(&model, &order), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn inactive_upstream_factors_do_not_block() {
        let model = chain();
        let active =
            ActiveSubset::from_ids(&model, ["c", "b"], [] as [&str; 0]).expect("ids resolve");

        let order = schedule(&model, &active, None).expect("acyclic");
        assert_eq!(ids(&model, &order), vec!["b", "c"]);
    }

    #[test]
    fn cycles_are_reported_instead_of_looping() {
        let model = CatalogBuilder::new(RuleRegistry::with_builtins())
            .factor(FactorSpec::new("a", "A"))
            .factor(FactorSpec::new("b", "B"))
            .factor(FactorSpec::new("free", "Free"))
            .impact(ImpactSpec::new("a", "b", "positive"))
            .impact(ImpactSpec::new("b", "a", "negative"))
            .build()
            .expect("catalog builds");

        let err = schedule(&model, &ActiveSubset::all(&model), None).expect_err("cycle");
        match err {
            EvaluationError::CyclicActiveSubset { mut factors } => {
                factors.sort();
                assert_eq!(factors, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }

        let active =
            ActiveSubset::from_ids(&model, ["a", "free"], [] as [&str; 0]).expect("ids resolve");
        assert!(schedule(&model, &active, None).is_ok());
    }

    #[test]
    fn budget_caps_requeues() {
        let model = chain();
        let active = ActiveSubset::from_ids(&model, ["c", "b", "a"], [] as [&str; 0])
            .expect("ids resolve");

        assert_eq!(
            schedule(&model, &active, Some(1)),
            Err(EvaluationError::RescheduleBudgetExceeded { budget: 1 })
        );
        assert!(schedule(&model, &active, Some(10)).is_ok());
    }
}
