// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use tracing::debug;

use recepta_core::ReceptaError;

/// Handle to the SQLite database, with migrations applied.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ReceptaError> {
        Self::open_with_journal(path, true).await
    }

    /// Open with an explicit journal mode choice (`wal_mode = false` keeps
    /// SQLite's default rollback journal).
    pub async fn open_with_journal(path: &str, wal_mode: bool) -> Result<Self, ReceptaError> {
        // Connection::open reports a plain rusqlite error, unlike `call`.
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ReceptaError::Storage { source: Box::new(e) })?;

        let pragmas = if wal_mode {
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;"
        } else {
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;"
        };

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        // Migrations return their own error type, so they ride inside the
        // closure's Ok value.
        conn.call(|conn| -> Result<Result<(), ReceptaError>, rusqlite::Error> {
            Ok(crate::migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. All query modules go
    /// through this single handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), ReceptaError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .close()
            .await
            .map_err(|e| ReceptaError::Storage { source: Box::new(e) })?;
        Ok(())
    }
}

/// Bridge tokio-rusqlite errors into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ReceptaError {
    ReceptaError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('conversations', 'messages')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_in_missing_directory_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let bad_path = dir.path().join("no").join("such").join("dir.db");

        let result = Database::open(bad_path.to_str().unwrap()).await;
        assert!(matches!(result, Err(ReceptaError::Storage { .. })));
    }

    #[tokio::test]
    async fn open_is_idempotent_across_restarts() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen_test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open must not re-run migrations destructively.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
