//! Task attachment storage
//!
//! An upload arrives as a staged temp file plus the client-supplied original
//! filename. [`AttachmentStore::store`] moves the staged file into a per-user
//! directory under a generated name and returns the public reference recorded
//! on the task:
//!
//! ```text
//! {uploads_dir}/{user_id}/{uuid}-{sanitized_name}   on disk
//! /uploads/{user_id}/{uuid}-{sanitized_name}        on the task
//! ```
//!
//! Original filenames are attacker-controlled. Only the final path component
//! survives sanitization, and the generated prefix keeps two uploads with the
//! same name from overwriting each other. The unsanitized name is kept as
//! metadata for display.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// URL prefix under which uploads are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Longest sanitized filename kept, in characters
const MAX_FILENAME_CHARS: usize = 100;

/// Error type for attachment operations
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to prepare upload directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move upload into {path}: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An uploaded file waiting in the staging directory
#[derive(Debug, Clone)]
pub struct IncomingAttachment {
    /// Where the upload transport left the bytes
    pub temp_path: PathBuf,

    /// Filename as sent by the client, unsanitized
    pub original_name: String,
}

/// An attachment moved into its final location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Public reference, e.g. `/uploads/{user_id}/{stored_name}`
    pub url: String,

    /// Filename as sent by the client
    pub original_name: String,

    /// Location on disk
    pub path: PathBuf,
}

/// Owns the uploads and staging directories
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    uploads_dir: PathBuf,
    staging_dir: PathBuf,
}

impl AttachmentStore {
    /// Creates the store, making sure both directories exist
    pub async fn new(
        uploads_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
    ) -> Result<Self, AttachmentError> {
        let store = Self {
            uploads_dir: uploads_dir.into(),
            staging_dir: staging_dir.into(),
        };

        create_dir(&store.uploads_dir).await?;
        create_dir(&store.staging_dir).await?;

        Ok(store)
    }

    /// Root of the public uploads tree
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Returns a fresh, unused path in the staging directory
    pub fn staging_path(&self) -> PathBuf {
        self.staging_dir.join(Uuid::new_v4().simple().to_string())
    }

    /// Moves a staged upload into `user_id`'s directory
    ///
    /// The per-user directory is created on demand. The file is renamed, not
    /// copied, unless the staging and uploads directories sit on different
    /// filesystems.
    pub async fn store(
        &self,
        user_id: Uuid,
        incoming: IncomingAttachment,
    ) -> Result<StoredAttachment, AttachmentError> {
        let user_dir = self.uploads_dir.join(user_id.to_string());
        create_dir(&user_dir).await?;

        let stored_name = format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            sanitize_filename(&incoming.original_name)
        );
        let target = user_dir.join(&stored_name);

        move_file(&incoming.temp_path, &target)
            .await
            .map_err(|source| AttachmentError::Move {
                path: target.clone(),
                source,
            })?;

        debug!(%user_id, path = %target.display(), "Stored attachment");

        Ok(StoredAttachment {
            url: format!("{}/{}/{}", UPLOADS_URL_PREFIX, user_id, stored_name),
            original_name: incoming.original_name,
            path: target,
        })
    }

    /// Removes a file left behind by a failed request
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to discard upload"),
        }
    }
}

async fn create_dir(path: &Path) -> Result<(), AttachmentError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| AttachmentError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Cross-device rename: fall back to copy + remove
            if tokio::fs::copy(from, to).await.is_err() {
                return Err(rename_err);
            }
            tokio::fs::remove_file(from).await
        }
    }
}

/// Reduces a client-supplied filename to a safe single path component
///
/// Keeps the last `/`- or `\`-separated component, replaces anything outside
/// `[A-Za-z0-9._-]` with `_`, strips leading dots, and caps the length. Falls
/// back to `file` when nothing usable remains.
///
/// ```
/// use taskdesk_shared::attachment::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("my report.pdf"), "my_report.pdf");
/// assert_eq!(sanitize_filename(".."), "file");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}
