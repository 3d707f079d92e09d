use std::collections::BTreeSet;

use super::error::EvaluationError;
use crate::quality::{AspectIndex, FactorIndex, NodeIndex, QualityModel, ScopeKind};

/// User-selected factors and aspects for one run, in the order they were requested.
///
/// Impacts from or to nodes outside this subset are ignored for the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSubset {
    factors: Vec<FactorIndex>,
    aspects: Vec<AspectIndex>,
    factor_set: BTreeSet<FactorIndex>,
    aspect_set: BTreeSet<AspectIndex>,
}

impl ActiveSubset {
    /// Every factor and aspect of the catalog, in declaration order.
    pub fn all(model: &QualityModel) -> Self {
        let mut subset = Self::default();
        for (index, _) in model.factors() {
            subset.push_factor(index);
        }
        for (index, _) in model.aspects() {
            subset.push_aspect(index);
        }
        subset
    }

    /// Factors applicable to runs of `kind`, plus every aspect.
    ///
    /// A factor applies when it declares a measure of `kind`, or when it declares no measures and
    /// every factor impacting it applies.
    pub fn for_scope_kind(model: &QualityModel, kind: ScopeKind) -> Self {
        let mut applicable: BTreeSet<FactorIndex> = model
            .factors()
            .filter(|(index, _)| model.factor_measures(*index, kind).next().is_some())
            .map(|(index, _)| index)
            .collect();

        loop {
            let derived: Vec<FactorIndex> = model
                .factors()
                .filter(|(index, factor)| {
                    factor.measures().is_empty()
                        && !applicable.contains(index)
                        && !factor.incoming_impacts().is_empty()
                        && model
                            .impacting_factors(*index)
                            .iter()
                            .all(|source| applicable.contains(source))
                })
                .map(|(index, _)| index)
                .collect();

            if derived.is_empty() {
                break;
            }
            applicable.extend(derived);
        }

        let mut subset = Self::default();
        for (index, _) in model.factors() {
            if applicable.contains(&index) {
                subset.push_factor(index);
            }
        }
        for (index, _) in model.aspects() {
            subset.push_aspect(index);
        }
        subset
    }

    /// Resolve id lists against the catalog. Duplicates keep their first position.
    pub fn from_ids<F, A>(
        model: &QualityModel,
        factor_ids: F,
        aspect_ids: A,
    ) -> Result<Self, EvaluationError>
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        let mut subset = Self::default();

        for id in factor_ids {
            let id = id.as_ref();
            let index = model
                .factor_index(id)
                .ok_or_else(|| EvaluationError::UnknownActiveId(id.to_string()))?;
            subset.push_factor(index);
        }

        for id in aspect_ids {
            let id = id.as_ref();
            let index = model
                .aspect_index(id)
                .ok_or_else(|| EvaluationError::UnknownActiveId(id.to_string()))?;
            subset.push_aspect(index);
        }

        Ok(subset)
    }

    fn push_factor(&mut self, index: FactorIndex) {
        if self.factor_set.insert(index) {
            self.factors.push(index);
        }
    }

    fn push_aspect(&mut self, index: AspectIndex) {
        if self.aspect_set.insert(index) {
            self.aspects.push(index);
        }
    }

    pub fn factors(&self) -> &[FactorIndex] {
        &self.factors
    }

    pub fn aspects(&self) -> &[AspectIndex] {
        &self.aspects
    }

    pub fn contains_factor(&self, index: FactorIndex) -> bool {
        self.factor_set.contains(&index)
    }

    pub fn contains_aspect(&self, index: AspectIndex) -> bool {
        self.aspect_set.contains(&index)
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        match node {
            NodeIndex::Factor(index) => self.contains_factor(index),
            NodeIndex::Aspect(index) => self.contains_aspect(index),
        }
    }
}
