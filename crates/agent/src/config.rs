//! Agent configuration

use anyhow::{Context, Result};
use monitor_lib::{MonitorConfig, SensitivityLevel};
use serde::Deserialize;

use crate::workload::WorkloadConfig;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name used for the monitored pipeline in logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON document with the monitor configuration
    #[serde(default)]
    pub monitor_config_path: Option<String>,

    /// Overrides applied on top of the monitor configuration
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub sensitivity_level: Option<SensitivityLevel>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub auto_response: Option<bool>,

    /// Synthetic workload rate in units per second
    #[serde(default = "default_workload_rate")]
    pub workload_rate_per_sec: u32,

    /// Run a batch every this many workload ticks
    #[serde(default = "default_batch_every")]
    pub workload_batch_every: u64,

    #[serde(default = "default_batch_size")]
    pub workload_batch_size: usize,

    /// Reject every n-th synthetic request
    #[serde(default = "default_failure_every")]
    pub workload_failure_every: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "perf-monitor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_workload_rate() -> u32 {
    50
}

fn default_batch_every() -> u64 {
    500
}

fn default_batch_size() -> usize {
    150
}

fn default_failure_every() -> u64 {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            monitor_config_path: None,
            window_size: None,
            sensitivity_level: None,
            confidence_threshold: None,
            auto_response: None,
            workload_rate_per_sec: default_workload_rate(),
            workload_batch_every: default_batch_every(),
            workload_batch_size: default_batch_size(),
            workload_failure_every: default_failure_every(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// `AGENT_CONFIG_FILE` names the file; `AGENT_*` variables override it.
    pub fn load() -> Result<Self> {
        Self::from_env(std::env::vars().collect())
    }

    fn from_env(env: config::Map<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = env.get("AGENT_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("AGENT").source(Some(env)))
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    /// Resolve and validate the monitor configuration
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let mut monitor = match &self.monitor_config_path {
            Some(path) => {
                let document = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read monitor config {}", path))?;
                MonitorConfig::from_json(&document)
                    .with_context(|| format!("Invalid monitor config {}", path))?
            }
            None => MonitorConfig::default(),
        };

        if let Some(window_size) = self.window_size {
            monitor = monitor.with_window_size(window_size);
        }
        if let Some(level) = self.sensitivity_level {
            monitor = monitor.with_sensitivity(level);
        }
        if let Some(threshold) = self.confidence_threshold {
            monitor = monitor.with_confidence_threshold(threshold);
        }
        if let Some(enabled) = self.auto_response {
            monitor = monitor.with_auto_response(enabled);
        }

        monitor.validate()?;
        Ok(monitor)
    }

    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            rate_per_sec: self.workload_rate_per_sec,
            batch_every: self.workload_batch_every,
            batch_size: self.workload_batch_size,
            failure_every: self.workload_failure_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_monitor_config() {
        let config = AgentConfig::default().monitor_config().unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let agent = AgentConfig {
            window_size: Some(30),
            sensitivity_level: Some(SensitivityLevel::High),
            auto_response: Some(true),
            ..Default::default()
        };
        let config = agent.monitor_config().unwrap();
        assert_eq!(config.window_size, 30);
        assert_eq!(config.sensitivity_level, SensitivityLevel::High);
        assert!(config.auto_response);
    }

    #[test]
    fn test_monitor_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("monitor.json");
        std::fs::write(&path, r#"{"windowSize": 40, "confidenceThreshold": 0.9}"#).unwrap();

        let agent = AgentConfig {
            monitor_config_path: Some(path.to_string_lossy().into_owned()),
            window_size: Some(20),
            ..Default::default()
        };
        let config = agent.monitor_config().unwrap();
        // Overrides win over the file
        assert_eq!(config.window_size, 20);
        assert!((config.confidence_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let agent = AgentConfig {
            confidence_threshold: Some(1.5),
            ..Default::default()
        };
        assert!(agent.monitor_config().is_err());
    }

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_kept() {
        let agent = AgentConfig::from_env(env(&[
            ("AGENT_API_PORT", "9999"),
            ("AGENT_SENSITIVITY_LEVEL", "HIGH"),
            ("AGENT_WINDOW_SIZE", "30"),
        ]))
        .unwrap();

        assert_eq!(agent.api_port, 9999);
        assert_eq!(agent.sensitivity_level, Some(SensitivityLevel::High));
        assert_eq!(agent.window_size, Some(30));
        assert_eq!(agent.workload_batch_size, 150);
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let result = AgentConfig::from_env(env(&[
            ("AGENT_API_PORT", "9999"),
            ("AGENT_SENSITIVITY_LEVEL", "EXTREME"),
        ]));

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid agent configuration"));
    }

    #[test]
    fn test_config_file_then_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("agent.toml");
        std::fs::write(&path, "api_port = 7070\ninstance_name = \"factory-a\"\n").unwrap();

        let agent = AgentConfig::from_env(env(&[
            ("AGENT_CONFIG_FILE", path.to_str().unwrap()),
            ("AGENT_INSTANCE_NAME", "factory-b"),
        ]))
        .unwrap();

        assert_eq!(agent.api_port, 7070);
        assert_eq!(agent.instance_name, "factory-b");
    }

    #[test]
    fn test_missing_monitor_config_file() {
        let agent = AgentConfig {
            monitor_config_path: Some("/nonexistent/monitor.json".to_string()),
            ..Default::default()
        };
        assert!(agent.monitor_config().is_err());
    }
}
