use std::env;
use std::fmt;

use crate::quality::BucketCurve;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the evaluation engine and its binaries.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub evaluation: EvaluationSettings,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("QIE_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let reschedule_budget = match env::var("QIE_RESCHEDULE_BUDGET") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidRescheduleBudget { value: raw.clone() })?,
            ),
            _ => None,
        };

        let default_curve = match env::var("QIE_BUCKET_CURVE") {
            Ok(raw) => raw
                .parse::<BucketCurve>()
                .map_err(|_| ConfigError::InvalidBucketCurve { value: raw.clone() })?,
            Err(_) => BucketCurve::default(),
        };

        let log_level = env::var("QIE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            evaluation: EvaluationSettings {
                reschedule_budget,
                default_curve,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Knobs applied to catalogs and evaluation runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSettings {
    /// Upper bound on requeues during scheduling; `None` relies on stall detection alone.
    pub reschedule_budget: Option<usize>,
    /// Curve used by factors that do not pick one.
    pub default_curve: BucketCurve,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidRescheduleBudget { value: String },
    InvalidBucketCurve { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRescheduleBudget { value } => write!(
                f,
                "QIE_RESCHEDULE_BUDGET must be a non-negative integer, got '{value}'"
            ),
            ConfigError::InvalidBucketCurve { value } => write!(
                f,
                "QIE_BUCKET_CURVE must be one of linear, exponential, squareRoot; got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("QIE_ENV");
        env::remove_var("QIE_LOG_LEVEL");
        env::remove_var("QIE_RESCHEDULE_BUDGET");
        env::remove_var("QIE_BUCKET_CURVE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.evaluation, EvaluationSettings::default());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_evaluation_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("QIE_ENV", "ci");
        env::set_var("QIE_RESCHEDULE_BUDGET", "64");
        env::set_var("QIE_BUCKET_CURVE", "square_root");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.evaluation.reschedule_budget, Some(64));
        assert_eq!(config.evaluation.default_curve, BucketCurve::SquareRoot);
    }

    #[test]
    fn rejects_malformed_budget() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("QIE_RESCHEDULE_BUDGET", "lots");
        let err = AppConfig::load().expect_err("budget must be numeric");
        reset_env();

        assert!(matches!(err, ConfigError::InvalidRescheduleBudget { ref value } if value == "lots"));
    }

    #[test]
    fn rejects_unknown_curve() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("QIE_BUCKET_CURVE", "sigmoid");
        let err = AppConfig::load().expect_err("curve must be known");
        reset_env();

        assert!(err.to_string().contains("sigmoid"));
    }
}
