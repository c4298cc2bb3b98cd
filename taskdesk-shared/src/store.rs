//! JSON document store
//!
//! All users and tasks live in a single JSON document on disk:
//!
//! ```json
//! { "users": [ ... ], "tasks": [ ... ] }
//! ```
//!
//! There is no cache. Every operation loads the whole document, and every
//! mutation writes the whole document back. Writes go to a uniquely named
//! sibling temp file which is then renamed over the target, so a reader never
//! observes a torn file.
//!
//! [`DocumentStore::read`] and [`DocumentStore::mutate`] serialize on an
//! in-process mutex, so two concurrent load→mutate→save cycles cannot lose each
//! other's updates. Nothing protects against a second process writing the
//! same file.
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_shared::store::{DocumentStore, StoreError};
//!
//! # async fn example() -> Result<(), StoreError> {
//! let store = DocumentStore::open("data/db.json").await?;
//!
//! let user_count = store.read(|doc| Ok::<_, StoreError>(doc.users.len())).await?;
//! println!("{} users", user_count);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{task::Task, user::User};

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the document failed
    #[error("Document I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document does not have the expected shape
    #[error("Document at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory document could not be serialized
    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The single persisted unit: every user and every task, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
}

/// File-backed store for the [`Document`]
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DocumentStore {
    /// Opens the store at `path`, creating the parent directory and an empty
    /// document if none exists yet
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` if the directory or file cannot be created or read
    /// - `StoreError::Corrupt` if an existing document does not parse
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };

        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| store.io_error(source))?;
        }

        // Surface a corrupt document at startup rather than on first request
        let document = store.load().await?;
        info!(
            path = %store.path.display(),
            users = document.users.len(),
            tasks = document.tasks.len(),
            "Document store ready"
        );

        Ok(store)
    }

    /// Path of the persisted document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full document from disk
    ///
    /// On first run (file absent) an empty document is persisted and returned.
    ///
    /// Callers that go on to mutate the result should use [`Self::mutate`]
    /// instead, which holds the store lock across the whole cycle.
    pub async fn load(&self) -> Result<Document, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No document found, initializing");
                let document = Document::default();
                self.save(&document).await?;
                Ok(document)
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// Replaces the persisted document with `document`
    ///
    /// The JSON is written and synced to a temp file next to the target, then
    /// renamed into place.
    pub async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(document).map_err(StoreError::Serialize)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let temp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let result = self.write_then_rename(&temp_path, &payload).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn write_then_rename(&self, temp_path: &Path, payload: &[u8]) -> Result<(), StoreError> {
        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|source| self.io_error(source))?;
        file.write_all(payload)
            .await
            .map_err(|source| self.io_error(source))?;
        file.sync_all().await.map_err(|source| self.io_error(source))?;
        drop(file);

        tokio::fs::rename(temp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    /// Runs `operation` against a freshly loaded document under the store lock
    pub async fn read<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&Document) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let document = self.load().await?;
        operation(&document)
    }

    /// Runs a full load → mutate → save cycle under the store lock
    ///
    /// The document is saved only if `operation` returns `Ok`; on `Err` the
    /// in-memory changes are dropped and the file is left untouched.
    pub async fn mutate<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let result = operation(&mut document)?;
        self.save(&document).await?;
        Ok(result)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
