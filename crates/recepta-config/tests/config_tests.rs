// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for config loading, env overrides, and validation.

use serial_test::serial;

use recepta_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_config_round_trip() {
    let config = load_and_validate_str(
        r#"
        [agent]
        name = "frontdesk"
        log_level = "debug"

        [transport]
        max_reconnect_attempts = 5
        reconnect_delay_ms = 5000

        [delivery]
        max_attempts = 3
        retry_interval_ms = 2000

        [storage]
        database_path = "/var/lib/recepta/recepta.db"
        wal_mode = true

        [keystore]
        path = "/var/lib/recepta/credentials.json"
        "#,
    )
    .unwrap();

    assert_eq!(config.agent.name, "frontdesk");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.storage.database_path, "/var/lib/recepta/recepta.db");
    assert_eq!(config.keystore.path, "/var/lib/recepta/credentials.json");
}

#[test]
fn validation_failures_surface_as_diagnostics() {
    let errors = load_and_validate_str(
        r#"
        [delivery]
        max_attempts = 0
        "#,
    )
    .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("delivery.max_attempts"));
}

#[test]
fn parse_failure_on_wrong_type() {
    let result = load_config_from_str(
        r#"
        [transport]
        reconnect_delay_ms = "soon"
        "#,
    );
    assert!(result.is_err());
}

#[test]
#[serial]
fn env_var_overrides_toml() {
    // SAFETY: test is serialized; no other thread reads the environment.
    unsafe {
        std::env::set_var("RECEPTA_DELIVERY_MAX_ATTEMPTS", "9");
    }

    let config = recepta_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/recepta.toml",
    ))
    .unwrap();
    assert_eq!(config.delivery.max_attempts, 9);

    unsafe {
        std::env::remove_var("RECEPTA_DELIVERY_MAX_ATTEMPTS");
    }
}

#[test]
#[serial]
fn env_var_maps_underscored_keys() {
    unsafe {
        std::env::set_var("RECEPTA_TRANSPORT_RECONNECT_DELAY_MS", "250");
    }

    let config = recepta_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/recepta.toml",
    ))
    .unwrap();
    assert_eq!(config.transport.reconnect_delay_ms, 250);

    unsafe {
        std::env::remove_var("RECEPTA_TRANSPORT_RECONNECT_DELAY_MS");
    }
}
