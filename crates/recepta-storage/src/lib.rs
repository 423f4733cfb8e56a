// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Recepta messaging core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! operations for conversations and messages. Conversation creation is an
//! upsert keyed on the peer's external id.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod repository;

pub use database::Database;
pub use models::*;
pub use repository::SqliteStore;
