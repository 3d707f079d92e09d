//! Ordinal buckets, impact types and the impact-weight lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::EvaluationResult;
use crate::evaluation::EvaluationError;

/// Ordinal evaluation level of a product factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorLevel {
    None,
    Low,
    Moderate,
    High,
}

impl FactorLevel {
    pub const fn label(self) -> &'static str {
        match self {
            FactorLevel::None => "none",
            FactorLevel::Low => "low",
            FactorLevel::Moderate => "moderate",
            FactorLevel::High => "high",
        }
    }
}

/// Curve used to bucket a numeric result in [0, 1] into a [`FactorLevel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketCurve {
    #[default]
    Linear,
    Exponential,
    SquareRoot,
}

impl BucketCurve {
    /// Lower bounds of the `moderate` and `high` buckets.
    pub fn thresholds(self) -> (f64, f64) {
        let (moderate, high) = (1.0 / 3.0, 2.0 / 3.0);
        match self {
            BucketCurve::Linear => (moderate, high),
            BucketCurve::Exponential => (moderate * moderate, high * high),
            BucketCurve::SquareRoot => (f64::sqrt(moderate), f64::sqrt(high)),
        }
    }

    /// `0` maps to none, `(0, t1)` to low, `[t1, t2)` to moderate and `[t2, 1]` to high.
    pub fn bucket(self, value: f64) -> Result<FactorLevel, EvaluationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(EvaluationError::OutOfRange { value });
        }

        let (moderate, high) = self.thresholds();
        let level = if value == 0.0 {
            FactorLevel::None
        } else if value < moderate {
            FactorLevel::Low
        } else if value < high {
            FactorLevel::Moderate
        } else {
            FactorLevel::High
        };

        Ok(level)
    }
}

impl FromStr for BucketCurve {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "squareroot" | "square_root" | "sqrt" => Ok(Self::SquareRoot),
            other => Err(format!("unknown bucket curve `{other}`")),
        }
    }
}

pub fn linear_map(value: f64) -> Result<FactorLevel, EvaluationError> {
    BucketCurve::Linear.bucket(value)
}

pub fn exponential_map(value: f64) -> Result<FactorLevel, EvaluationError> {
    BucketCurve::Exponential.bucket(value)
}

pub fn square_root_map(value: f64) -> Result<FactorLevel, EvaluationError> {
    BucketCurve::SquareRoot.bucket(value)
}

/// Declared type of an impact between two catalog nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImpactType {
    StronglyNegative,
    Negative,
    Neutral,
    Positive,
    StronglyPositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl ImpactType {
    pub const fn label(self) -> &'static str {
        match self {
            ImpactType::StronglyNegative => "stronglyNegative",
            ImpactType::Negative => "negative",
            ImpactType::Neutral => "neutral",
            ImpactType::Positive => "positive",
            ImpactType::StronglyPositive => "stronglyPositive",
        }
    }

    pub const fn polarity(self) -> Option<Polarity> {
        match self {
            ImpactType::Positive | ImpactType::StronglyPositive => Some(Polarity::Positive),
            ImpactType::Negative | ImpactType::StronglyNegative => Some(Polarity::Negative),
            ImpactType::Neutral => None,
        }
    }
}

impl fmt::Display for ImpactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ImpactType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "stronglynegative" => Ok(Self::StronglyNegative),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            "stronglypositive" => Ok(Self::StronglyPositive),
            _ => Err(value.to_string()),
        }
    }
}

/// Qualitative contribution of one impact instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactWeight {
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "slightly negative")]
    SlightlyNegative,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "slightly positive")]
    SlightlyPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "mixed")]
    Mixed,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl ImpactWeight {
    /// Position on the five-point scale; `None` for weights that carry no score.
    pub const fn score(self) -> Option<i8> {
        match self {
            ImpactWeight::Negative => Some(-2),
            ImpactWeight::SlightlyNegative => Some(-1),
            ImpactWeight::Neutral | ImpactWeight::Mixed => Some(0),
            ImpactWeight::SlightlyPositive => Some(1),
            ImpactWeight::Positive => Some(2),
            ImpactWeight::NotApplicable => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ImpactWeight::Negative => "negative",
            ImpactWeight::SlightlyNegative => "slightly negative",
            ImpactWeight::Neutral => "neutral",
            ImpactWeight::SlightlyPositive => "slightly positive",
            ImpactWeight::Positive => "positive",
            ImpactWeight::Mixed => "mixed",
            ImpactWeight::NotApplicable => "n/a",
        }
    }
}

/// Weight an impact contributes given the evaluated result of its source factor.
pub fn derive_impact_weight(
    result: &EvaluationResult,
    impact_type: ImpactType,
    curve: BucketCurve,
) -> Result<ImpactWeight, EvaluationError> {
    let level = match result {
        EvaluationResult::NotApplicable => return Ok(ImpactWeight::NotApplicable),
        EvaluationResult::Aggregate(aggregate) if aggregate.is_not_applicable() => {
            return Ok(ImpactWeight::NotApplicable)
        }
        EvaluationResult::Level(level) => *level,
        EvaluationResult::Numeric(value) => curve.bucket(*value)?,
        EvaluationResult::Aggregate(_) | EvaluationResult::Weight(_) => {
            return Err(EvaluationError::UnweightableResult {
                result: result.to_string(),
            })
        }
    };

    let polarity = impact_type
        .polarity()
        .ok_or(EvaluationError::NonPolarImpactType { impact_type })?;

    let weight = match (polarity, level) {
        (_, FactorLevel::None | FactorLevel::Low) => ImpactWeight::Neutral,
        (Polarity::Positive, FactorLevel::Moderate) => ImpactWeight::SlightlyPositive,
        (Polarity::Positive, FactorLevel::High) => ImpactWeight::Positive,
        (Polarity::Negative, FactorLevel::Moderate) => ImpactWeight::SlightlyNegative,
        (Polarity::Negative, FactorLevel::High) => ImpactWeight::Negative,
    };

    Ok(weight)
}
