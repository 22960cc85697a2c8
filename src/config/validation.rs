//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout > 0, percentages, factor > 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoreConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::CoreConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human readable reason.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &CoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.control.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "control.timeout_secs",
            "must be greater than zero",
        ));
    }

    let percent = config.memory.slab_percent;
    if percent == 0 || percent > 100 {
        errors.push(ValidationError::new(
            "memory.slab_percent",
            format!("must be within 1..=100, got {}", percent),
        ));
    }

    let cache = &config.cache;
    if cache.factor_denominator == 0 {
        errors.push(ValidationError::new(
            "cache.factor_denominator",
            "must be greater than zero",
        ));
    } else if cache.factor_numerator <= cache.factor_denominator {
        errors.push(ValidationError::new(
            "cache.factor_numerator",
            format!(
                "growth factor {}/{} must be greater than 1",
                cache.factor_numerator, cache.factor_denominator
            ),
        ));
    }

    if cache.hashpower_init == 0 || cache.hashpower_init > 32 {
        errors.push(ValidationError::new(
            "cache.hashpower_init",
            format!("must be within 1..=32, got {}", cache.hashpower_init),
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
