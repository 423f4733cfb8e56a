// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recepta messaging core.

use thiserror::Error;

/// The primary error type used across all Recepta components and traits.
#[derive(Debug, Error)]
pub enum ReceptaError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport errors (session open failure, send failure, protocol faults).
    ///
    /// These are recovered locally via the reconnect/retry policies and are
    /// never allowed to escape the connection or delivery loops.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A send was attempted while the transport session is not connected.
    #[error("transport not connected")]
    NotConnected,

    /// A connect sequence is already in flight; only one may run at a time.
    #[error("connect already in progress")]
    ConnectInProgress,

    /// The remote end terminated the session. Terminal: requires re-pairing.
    #[error("session logged out by remote; re-pairing required")]
    LoggedOut,

    /// Storage backend errors (database open, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Reply generator errors (upstream failure, malformed output).
    #[error("reply generator error: {message}")]
    Replier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential store errors (file I/O, corrupt credential blob).
    #[error("credential store error: {source}")]
    Credentials {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReceptaError {
    /// Convenience constructor for transport errors without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            ReceptaError::NotConnected.to_string(),
            "transport not connected"
        );
        assert_eq!(
            ReceptaError::ConnectInProgress.to_string(),
            "connect already in progress"
        );
        let e = ReceptaError::transport("socket reset");
        assert_eq!(e.to_string(), "transport error: socket reset");
    }

    #[test]
    fn storage_error_carries_source() {
        let e = ReceptaError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(e.to_string().contains("disk full"));
    }
}
