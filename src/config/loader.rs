//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::MonitorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a configuration: file (if any), then environment overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    load_from(path, |name| std::env::var(name).ok())
}

fn load_from<F>(path: Option<&Path>, lookup: F) -> Result<MonitorConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => MonitorConfig::default(),
    };
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// `PORT` selects the dashboard port; an empty value is treated as unset.
pub fn apply_env_overrides<F>(config: &mut MonitorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
        config.server.port = port.trim().parse().map_err(|_| ConfigError::Env {
            name: "PORT",
            value: port.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_override() {
        let mut config = MonitorConfig::default();
        apply_env_overrides(&mut config, |name| (name == "PORT").then(|| "9123".to_string())).unwrap();
        assert_eq!(config.server.port, 9123);
    }

    #[test]
    fn test_empty_port_keeps_default() {
        let mut config = MonitorConfig::default();
        apply_env_overrides(&mut config, |_| Some(String::new())).unwrap();
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = MonitorConfig::default();
        let err = apply_env_overrides(&mut config, |_| Some("eighty".to_string())).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_load_file_then_env() {
        let path = std::env::temp_dir().join(format!("pod-monitor-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[reconciler]\ninterval_secs = 0\n").unwrap();

        let err = load_from(Some(&path), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));

        fs::write(&path, "[server]\nport = 7000\n[reconciler]\ninterval_secs = 2\n").unwrap();
        let config = load_from(Some(&path), |_| None).unwrap();
        assert_eq!(config.reconciler.interval_secs, 2);
        assert_eq!(config.server.port, 7000);

        let config = load_from(Some(&path), |name| (name == "PORT").then(|| "9000".to_string())).unwrap();
        assert_eq!(config.server.port, 9000);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = load_from(None, |_| None).unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.discovery.label_selector, "app=probe-demo");
    }
}
