use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::weight::{FactorLevel, ImpactWeight};

/// Direction of an aggregated set of impacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tendency {
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Tendency {
    pub fn classify(score: f64) -> Self {
        if score < 0.0 {
            Tendency::Negative
        } else if score > 0.0 {
            Tendency::Positive
        } else {
            Tendency::Neutral
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Tendency::Negative => "negative",
            Tendency::Neutral => "neutral",
            Tendency::Positive => "positive",
            Tendency::NotApplicable => "n/a",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactAggregate {
    pub tendency: Tendency,
    pub impacts: Vec<ImpactWeight>,
}

impl ImpactAggregate {
    pub fn is_not_applicable(&self) -> bool {
        self.tendency == Tendency::NotApplicable
    }
}

/// Result of evaluating a product factor or a quality aspect.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Level(FactorLevel),
    /// Raw score in [0, 1].
    Numeric(f64),
    Weight(ImpactWeight),
    Aggregate(ImpactAggregate),
    NotApplicable,
}

impl EvaluationResult {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, EvaluationResult::NotApplicable)
    }

    pub fn level(&self) -> Option<FactorLevel> {
        match self {
            EvaluationResult::Level(level) => Some(*level),
            _ => None,
        }
    }

    pub fn aggregate(&self) -> Option<&ImpactAggregate> {
        match self {
            EvaluationResult::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

impl From<FactorLevel> for EvaluationResult {
    fn from(level: FactorLevel) -> Self {
        EvaluationResult::Level(level)
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationResult::Level(level) => f.write_str(level.label()),
            EvaluationResult::Numeric(value) => write!(f, "{value}"),
            EvaluationResult::Weight(weight) => f.write_str(weight.label()),
            EvaluationResult::Aggregate(aggregate) => {
                let impacts: Vec<&str> = aggregate.impacts.iter().map(|w| w.label()).collect();
                write!(
                    f,
                    "{} [{}]",
                    aggregate.tendency.label(),
                    impacts.join(", ")
                )
            }
            EvaluationResult::NotApplicable => f.write_str("n/a"),
        }
    }
}

impl Serialize for EvaluationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EvaluationResult::Level(level) => level.serialize(serializer),
            EvaluationResult::Numeric(value) => serializer.serialize_f64(*value),
            EvaluationResult::Weight(weight) => weight.serialize(serializer),
            EvaluationResult::Aggregate(aggregate) => {
                let mut state = serializer.serialize_struct("ImpactAggregate", 2)?;
                state.serialize_field("tendency", &aggregate.tendency)?;
                state.serialize_field("impacts", &aggregate.impacts)?;
                state.end()
            }
            EvaluationResult::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_serialize_to_display_shapes() {
        let results = vec![
            EvaluationResult::Level(FactorLevel::Moderate),
            EvaluationResult::Numeric(0.25),
            EvaluationResult::Weight(ImpactWeight::SlightlyNegative),
            EvaluationResult::Aggregate(ImpactAggregate {
                tendency: Tendency::NotApplicable,
                impacts: vec![ImpactWeight::NotApplicable, ImpactWeight::NotApplicable],
            }),
            EvaluationResult::NotApplicable,
        ];

        let json = serde_json::to_string(&results).expect("serializes");
        assert_eq!(
            json,
            r#"["moderate",0.25,"slightly negative",{"tendency":"n/a","impacts":["n/a","n/a"]},"n/a"]"#
        );
    }

    #[test]
    fn tendency_classification_is_sign_based() {
        assert_eq!(Tendency::classify(-0.1), Tendency::Negative);
        assert_eq!(Tendency::classify(0.0), Tendency::Neutral);
        assert_eq!(Tendency::classify(2.0 / 3.0), Tendency::Positive);
    }
}
