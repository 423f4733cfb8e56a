// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed credential store with crash-safe writes.
//!
//! Credentials are written to a temp file, fsynced, then renamed over the
//! live file, so the store never acknowledges a rotation that could be lost
//! to a crash. The blob itself stays opaque; its format belongs to the
//! transport library.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use recepta_core::ReceptaError;
use recepta_core::types::CredentialBlob;

/// Durable storage for transport session credentials.
///
/// Exclusively owned: no other component reads or writes the underlying
/// file. Read once at startup, written on every rotation event.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously saved credentials, or a fresh empty set if none exist.
    ///
    /// A corrupt file is an error rather than a silent fresh start: wiping
    /// credentials would force an unwanted re-pairing.
    pub async fn load(&self) -> Result<CredentialBlob, ReceptaError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<CredentialBlob, ReceptaError> {
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let blob = serde_json::from_slice(&bytes)
                        .map_err(|e| ReceptaError::Credentials { source: Box::new(e) })?;
                    debug!(path = %path.display(), "loaded saved credentials");
                    Ok(blob)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!(path = %path.display(), "no saved credentials, starting fresh");
                    Ok(CredentialBlob::fresh())
                }
                Err(e) => Err(ReceptaError::Credentials { source: Box::new(e) }),
            }
        })
        .await
        .map_err(|e| ReceptaError::Internal(format!("credential load task panicked: {e}")))?
    }

    /// Persists a rotated credential blob before acknowledging it.
    ///
    /// The write is atomic: temp file in the same directory, fsync, rename.
    pub async fn save(&self, blob: &CredentialBlob) -> Result<(), ReceptaError> {
        let path = self.path.clone();
        let bytes = serde_json::to_vec_pretty(blob)
            .map_err(|e| ReceptaError::Credentials { source: Box::new(e) })?;

        tokio::task::spawn_blocking(move || -> Result<(), ReceptaError> {
            write_atomic(&path, &bytes).map_err(|e| ReceptaError::Credentials { source: Box::new(e) })
        })
        .await
        .map_err(|e| ReceptaError::Internal(format!("credential save task panicked: {e}")))??;

        debug!(path = %self.path.display(), "credentials persisted");
        Ok(())
    }
}

/// Write `bytes` to `path` atomically: temp file + fsync + rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_missing_file_returns_fresh_set() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));

        let blob = store.load().await.unwrap();
        assert!(blob.is_fresh());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));

        let blob = CredentialBlob {
            version: 1,
            data: serde_json::json!({"noise_key": "abc", "registration_id": 42}),
        };
        store.save(&blob).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(!loaded.is_fresh());
        assert_eq!(loaded.data["registration_id"], 42);
    }

    #[tokio::test]
    async fn save_overwrites_previous_rotation() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));

        for generation in 0..3 {
            let blob = CredentialBlob {
                version: 1,
                data: serde_json::json!({"generation": generation}),
            };
            store.save(&blob).await.unwrap();
        }

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.data["generation"], 2);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let store = CredentialStore::new(&path);

        store.save(&CredentialBlob::fresh()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_fresh_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, b"not json{{{").unwrap();

        let store = CredentialStore::new(&path);
        let result = store.load().await;
        assert!(matches!(result, Err(ReceptaError::Credentials { .. })));
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/creds.json");
        let store = CredentialStore::new(&path);

        store.save(&CredentialBlob::fresh()).await.unwrap();
        assert!(path.exists());
    }
}
