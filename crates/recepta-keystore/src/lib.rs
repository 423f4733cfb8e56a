// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable session credential storage for the Recepta messaging core.
//!
//! Persists the transport's opaque credential blob across restarts so
//! reconnection never requires re-pairing.

pub mod store;

pub use store::CredentialStore;
