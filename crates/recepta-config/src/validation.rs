// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and non-zero retry bounds.

use crate::diagnostic::ConfigError;
use crate::model::ReceptaConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ReceptaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {LOG_LEVELS:?}, got `{}`",
                config.agent.log_level
            ),
        });
    }

    if config.transport.max_reconnect_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: "transport.max_reconnect_attempts must be at least 1".to_string(),
        });
    }

    if config.transport.reconnect_delay_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.reconnect_delay_ms must be greater than 0".to_string(),
        });
    }

    if config.delivery.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: "delivery.max_attempts must be at least 1".to_string(),
        });
    }

    if config.delivery.retry_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.retry_interval_ms must be greater than 0".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.keystore.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "keystore.path must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
