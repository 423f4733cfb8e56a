// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recepta.toml` > `~/.config/recepta/recepta.toml`
//! > `/etc/recepta/recepta.toml` with environment variable overrides via the
//! `RECEPTA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ReceptaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/recepta/recepta.toml` (system-wide)
/// 3. `~/.config/recepta/recepta.toml` (user XDG config)
/// 4. `./recepta.toml` (local directory)
/// 5. `RECEPTA_*` environment variables
pub fn load_config() -> Result<ReceptaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReceptaConfig::default()))
        .merge(Toml::file("/etc/recepta/recepta.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("recepta/recepta.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("recepta.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ReceptaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReceptaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReceptaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReceptaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `RECEPTA_DELIVERY_MAX_ATTEMPTS` must map
/// to `delivery.max_attempts`, not `delivery.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("RECEPTA_").map(|key| {
        // The key arrives case-preserved with the prefix stripped; lowercase
        // it before section mapping.
        // Example: RECEPTA_TRANSPORT_RECONNECT_DELAY_MS -> "transport_reconnect_delay_ms"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("transport_", "transport.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("keystore_", "keystore.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_constants() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.transport.max_reconnect_attempts, 5);
        assert_eq!(config.transport.reconnect_delay_ms, 5000);
        assert_eq!(config.delivery.max_attempts, 3);
        assert_eq!(config.agent.name, "recepta");
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [transport]
            reconnect_delay_ms = 100

            [delivery]
            max_attempts = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.reconnect_delay_ms, 100);
        assert_eq!(config.delivery.max_attempts, 7);
        // Untouched sections keep defaults.
        assert_eq!(config.transport.max_reconnect_attempts, 5);
        assert_eq!(config.storage.database_path, "recepta.db");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [delivery]
            max_atempts = 3
            "#,
        );
        assert!(result.is_err(), "typo'd key should be rejected");
    }
}
