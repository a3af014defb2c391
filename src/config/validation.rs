//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and timeouts > 0, ports valid)
//! - Check that the label selector parses
//! - Check static instances for missing or duplicate names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MonitorConfig;
use crate::discovery::LabelSelector;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid label selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("static instance #{0} has an empty name")]
    EmptyInstanceName(usize),

    #[error("static instance '{0}' is declared more than once")]
    DuplicateInstance(String),

    #[error("probe info path '{0}' must start with '/'")]
    InfoPath(String),
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("server.port", config.server.port as u64),
        ("server.request_timeout_secs", config.server.request_timeout_secs),
        ("server.max_body_bytes", config.server.max_body_bytes as u64),
        ("discovery.timeout_secs", config.discovery.timeout_secs),
        ("reconciler.interval_secs", config.reconciler.interval_secs),
        ("reconciler.max_concurrent_fetches", config.reconciler.max_concurrent_fetches as u64),
        ("probe.port", config.probe.port as u64),
        ("probe.timeout_secs", config.probe.timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if let Err(e) = LabelSelector::parse(&config.discovery.label_selector) {
        errors.push(ValidationError::Selector {
            selector: config.discovery.label_selector.clone(),
            reason: e.to_string(),
        });
    }

    if !config.probe.info_path.starts_with('/') {
        errors.push(ValidationError::InfoPath(config.probe.info_path.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for (i, instance) in config.discovery.instances.iter().enumerate() {
        if instance.name.trim().is_empty() {
            errors.push(ValidationError::EmptyInstanceName(i));
        } else if !seen.insert(instance.name.as_str()) {
            errors.push(ValidationError::DuplicateInstance(instance.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
