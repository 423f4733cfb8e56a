// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Converts Figment deserialization errors into miette diagnostics so config
//! mistakes render as readable, actionable messages at startup.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration could not be parsed or deserialized.
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(recepta::config::parse),
        help("check key names and value types against the documented [agent], [transport], [delivery], [storage], and [keystore] sections")
    )]
    Parse {
        /// Figment's description of the failure, including the profile path.
        message: String,
    },

    /// A value parsed fine but violates a semantic constraint.
    #[error("{message}")]
    #[diagnostic(code(recepta::config::validation))]
    Validation { message: String },
}

/// Convert a figment error (which may aggregate several failures) into a
/// list of diagnostics.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render a list of config errors to stderr as miette reports.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(error.to_string());
        eprintln!("{report:?}");
        if let Some(help) = error.help() {
            eprintln!("  help: {help}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figment_errors_become_parse_diagnostics() {
        let err = crate::loader::load_config_from_str("agent = 42").unwrap_err();
        let errors = figment_to_config_errors(err);
        assert!(!errors.is_empty());
        assert!(matches!(errors[0], ConfigError::Parse { .. }));
    }

    #[test]
    fn validation_errors_render() {
        let errors = vec![ConfigError::Validation {
            message: "delivery.max_attempts must be at least 1, got 0".into(),
        }];
        // Smoke test: rendering must not panic.
        render_errors(&errors);
    }
}
