//! Configuration management for Quotagate.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QuotaError, Result};
use crate::ratelimit::{QuotaPolicy, TimeUnit};

/// Prefix of environment variables overriding file values,
/// e.g. `QUOTAGATE__QUOTA__CLIENT__LIMIT=5`.
const ENV_PREFIX: &str = "QUOTAGATE";
const ENV_SEPARATOR: &str = "__";

/// Main configuration for Quotagate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaGateConfig {
    /// Quota configuration
    #[serde(default)]
    pub quota: QuotaConfig,
}

/// Per-client and global quota rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Quota applied to each client separately
    #[serde(default = "default_client_rule")]
    pub client: QuotaRule,

    /// Quota shared by every client
    #[serde(default = "default_global_rule")]
    pub global: QuotaRule,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            client: default_client_rule(),
            global: default_global_rule(),
        }
    }
}

fn default_client_rule() -> QuotaRule {
    QuotaRule::per_unit(60, TimeUnit::Minute)
}

fn default_global_rule() -> QuotaRule {
    QuotaRule::per_unit(1000, TimeUnit::Minute)
}

/// A limit and its window length.
///
/// The window is given either in milliseconds or as a named unit, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRule {
    /// Requests allowed per window
    pub limit: u64,
    /// Window length in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_ms: Option<u64>,
    /// Window length as a named unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<TimeUnit>,
}

impl QuotaRule {
    pub fn per_unit(limit: u64, unit: TimeUnit) -> Self {
        Self {
            limit,
            window_ms: None,
            unit: Some(unit),
        }
    }

    pub fn per_millis(limit: u64, window_ms: u64) -> Self {
        Self {
            limit,
            window_ms: Some(window_ms),
            unit: None,
        }
    }

    /// Window length in milliseconds.
    pub fn window_length_ms(&self, scope: &str) -> Result<u64> {
        match (self.window_ms, self.unit) {
            (Some(ms), None) => Ok(ms),
            (None, Some(unit)) => Ok(unit.as_millis()),
            (Some(_), Some(_)) => Err(QuotaError::Config(format!(
                "{} quota sets both window_ms and unit",
                scope
            ))),
            (None, None) => Err(QuotaError::Config(format!(
                "{} quota needs window_ms or unit",
                scope
            ))),
        }
    }
}

impl QuotaConfig {
    /// Validate the rules into a policy the gate can enforce.
    pub fn to_policy(&self) -> Result<QuotaPolicy> {
        QuotaPolicy::new(
            self.client.limit,
            self.client.window_length_ms("client")?,
            self.global.limit,
            self.global.window_length_ms("global")?,
        )
    }
}

impl QuotaGateConfig {
    /// Load configuration from a YAML file, then apply `QUOTAGATE__*`
    /// environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading quota configuration");

        let contents = std::fs::read_to_string(path)?;
        Config::builder()
            .add_source(File::from_str(&contents, FileFormat::Yaml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| QuotaError::Config(format!("Failed to load {}: {}", path.display(), e)))
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| QuotaError::Config(format!("Failed to parse quota config: {}", e)))
    }

    /// Validated policy for this configuration.
    pub fn policy(&self) -> Result<QuotaPolicy> {
        self.quota.to_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Held by every test that reads or writes `QUOTAGATE__*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let policy = QuotaGateConfig::default().policy().unwrap();
        assert_eq!(policy.client_limit(), 60);
        assert_eq!(policy.client_window_ms().get(), 60_000);
        assert_eq!(policy.global_limit(), 1000);
        assert_eq!(policy.global_window_ms().get(), 60_000);
    }

    #[test]
    fn test_parse_millis_and_units() {
        let yaml = r#"
quota:
  client:
    limit: 2
    window_ms: 60000
  global:
    limit: 3
    unit: hour
"#;
        let config = QuotaGateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.quota.client, QuotaRule::per_millis(2, 60_000));
        assert_eq!(config.quota.global, QuotaRule::per_unit(3, TimeUnit::Hour));

        let policy = config.policy().unwrap();
        assert_eq!(policy.global_window_ms().get(), 3_600_000);
    }

    #[test]
    fn test_partial_config_keeps_other_default() {
        let yaml = r#"
quota:
  client:
    limit: 5
    unit: second
"#;
        let config = QuotaGateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.quota.client.limit, 5);
        assert_eq!(config.quota.global, default_global_rule());
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let cases = [
            "quota:\n  client:\n    limit: 0\n    unit: minute\n",
            "quota:\n  client:\n    limit: 5\n    window_ms: 0\n",
            "quota:\n  client:\n    limit: 5\n    window_ms: 100\n    unit: second\n",
            "quota:\n  global:\n    limit: 5\n",
        ];
        for yaml in cases {
            let config = QuotaGateConfig::from_yaml(yaml).unwrap();
            assert!(
                matches!(config.policy(), Err(QuotaError::Config(_))),
                "expected config error for {:?}",
                yaml
            );
        }
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let yaml = "quota:\n  client:\n    limit: 5\n    unit: fortnight\n";
        assert!(matches!(
            QuotaGateConfig::from_yaml(yaml),
            Err(QuotaError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_with_env_override() {
        let path = std::env::temp_dir().join(format!("quotagate-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "quota:\n  client:\n    limit: 2\n    window_ms: 1000\n",
        )
        .unwrap();

        let _env = ENV_LOCK.lock();
        std::env::set_var("QUOTAGATE__QUOTA__CLIENT__LIMIT", "7");
        let config = QuotaGateConfig::from_file(&path);
        std::env::remove_var("QUOTAGATE__QUOTA__CLIENT__LIMIT");
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.quota.client, QuotaRule::per_millis(7, 1000));
        assert_eq!(config.quota.global, default_global_rule());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let _env = ENV_LOCK.lock();
        let result = QuotaGateConfig::from_file("/nonexistent/quotagate.yaml");
        assert!(matches!(result, Err(QuotaError::Io(_))));
    }
}
