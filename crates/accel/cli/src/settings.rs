//! Runner settings

use accel_cloud::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings that shape a run but not what it deploys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Throttling retry policy
    #[serde(default)]
    pub retry: BackoffConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub plan: PlanOutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Where the plan document goes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutputConfig {
    #[serde(default = "default_plan_path")]
    pub path: PathBuf,
}

impl Default for PlanOutputConfig {
    fn default() -> Self {
        Self {
            path: default_plan_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_plan_path() -> PathBuf {
    PathBuf::from("accelerator-plan.json")
}

impl RunnerSettings {
    /// Defaults, then the optional settings file, then `ACCEL_` variables
    /// (`ACCEL_RETRY__MAX_ATTEMPTS=3`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RunnerSettings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ACCEL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunnerSettings::default();
        assert_eq!(settings.retry.max_attempts, 10);
        assert_eq!(settings.retry.initial_delay_ms, 150);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.plan.path, PathBuf::from("accelerator-plan.json"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            "retry:\n  max_attempts: 3\n  initial_delay_ms: 10\n  max_delay_ms: 100\n  \
             multiplier: 2.0\n  jitter: false\nlogging:\n  level: debug\n",
        )
        .unwrap();

        let settings = RunnerSettings::load(path.to_str()).unwrap();
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(!settings.retry.jitter);
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.logging.json);
    }

    #[test]
    fn test_environment_overrides_with_single_underscore_prefix() {
        std::env::set_var("ACCEL_PLAN__PATH", "/tmp/env-plan.json");
        let settings = RunnerSettings::load(None);
        std::env::remove_var("ACCEL_PLAN__PATH");

        assert_eq!(
            settings.unwrap().plan.path,
            PathBuf::from("/tmp/env-plan.json")
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = RunnerSettings::load(Some("/nonexistent/accel-settings")).unwrap();
        assert_eq!(settings.retry.max_attempts, 10);
    }
}
