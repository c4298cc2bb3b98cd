//! Task model and document operations
//!
//! Tasks are personal: every operation is scoped to the owning user's ID, and
//! a task owned by someone else is reported exactly like a task that does not
//! exist. Callers get `TaskError::NotFound` in both cases.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► (update)* ──► delete
//! ```
//!
//! - `createdAt` is set once at creation
//! - `updatedAt` is absent until the first update, then bumped on every update
//! - `attachment` is set at creation only and never changes afterward
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_shared::attachment::AttachmentStore;
//! use taskdesk_shared::models::task::{CreateTask, Task, TaskError, UpdateTask};
//! use taskdesk_shared::store::DocumentStore;
//! use uuid::Uuid;
//!
//! # async fn example(store: &DocumentStore, files: &AttachmentStore) -> Result<(), TaskError> {
//! let owner = Uuid::new_v4();
//!
//! let task = Task::create(store, files, owner, CreateTask {
//!     title: "buy milk".to_string(),
//!     ..Default::default()
//! }).await?;
//!
//! Task::update(store, owner, task.id, UpdateTask {
//!     description: Some("2 litres".to_string()),
//!     ..Default::default()
//! }).await?;
//!
//! let deleted = Task::delete(store, owner, task.id).await?;
//! assert_eq!(deleted.id, task.id);
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::attachment::{AttachmentError, AttachmentStore, IncomingAttachment};
use crate::store::{DocumentStore, StoreError};

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No task with this ID is owned by the caller
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A personal task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user; never reassigned
    pub user_id: Uuid,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Public reference to the uploaded file, if any
    #[serde(default)]
    pub attachment: Option<String>,

    /// Filename the client uploaded the attachment under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,

    /// Creation time in epoch milliseconds
    pub created_at: i64,

    /// Last update time in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub attachment: Option<IncomingAttachment>,
}

/// Input for updating a task
///
/// `None` leaves a field unchanged; `Some(String::new())` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateTask {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Task {
    /// Lists the user's tasks in insertion order
    pub async fn list_for_user(store: &DocumentStore, user_id: Uuid) -> Result<Vec<Self>, TaskError> {
        store
            .read(|doc| {
                Ok(doc
                    .tasks
                    .iter()
                    .filter(|t| t.user_id == user_id)
                    .cloned()
                    .collect())
            })
            .await
    }

    /// Creates a task, moving its attachment (if any) into place first
    ///
    /// If the document cannot be saved, the moved attachment is removed again.
    ///
    /// # Errors
    ///
    /// - `TaskError::Attachment` if the upload cannot be moved into place
    /// - `TaskError::Store` if the document cannot be loaded or saved
    pub async fn create(
        store: &DocumentStore,
        attachments: &AttachmentStore,
        user_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, TaskError> {
        let stored = match data.attachment {
            Some(incoming) => Some(attachments.store(user_id, incoming).await?),
            None => None,
        };

        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: data.title,
            description: data.description,
            attachment: stored.as_ref().map(|s| s.url.clone()),
            attachment_name: stored.as_ref().map(|s| s.original_name.clone()),
            created_at: Utc::now().timestamp_millis(),
            updated_at: None,
        };

        let result = store
            .mutate(|doc| {
                doc.tasks.push(task.clone());
                Ok::<_, TaskError>(())
            })
            .await;

        if let Err(err) = result {
            if let Some(stored) = &stored {
                attachments.discard(&stored.path).await;
            }
            return Err(err);
        }

        debug!(task_id = %task.id, %user_id, "Created task");
        Ok(task)
    }

    /// Updates the provided fields of one of the user's tasks
    ///
    /// `updatedAt` is bumped even when neither field is provided.
    ///
    /// # Errors
    ///
    /// - `TaskError::NotFound` if no task with `id` is owned by `user_id`
    /// - `TaskError::Store` if the document cannot be loaded or saved
    pub async fn update(
        store: &DocumentStore,
        user_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Self, TaskError> {
        store
            .mutate(|doc| {
                let task = doc
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == id && t.user_id == user_id)
                    .ok_or(TaskError::NotFound)?;

                if let Some(title) = data.title {
                    task.title = title;
                }
                if let Some(description) = data.description {
                    task.description = description;
                }
                task.updated_at = Some(Utc::now().timestamp_millis());

                Ok(task.clone())
            })
            .await
    }

    /// Deletes one of the user's tasks and returns it
    ///
    /// The attachment file, if any, is left on disk.
    ///
    /// # Errors
    ///
    /// - `TaskError::NotFound` if no task with `id` is owned by `user_id`
    /// - `TaskError::Store` if the document cannot be loaded or saved
    pub async fn delete(store: &DocumentStore, user_id: Uuid, id: Uuid) -> Result<Self, TaskError> {
        store
            .mutate(|doc| {
                let index = doc
                    .tasks
                    .iter()
                    .position(|t| t.id == id && t.user_id == user_id)
                    .ok_or(TaskError::NotFound)?;

                Ok(doc.tasks.remove(index))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<DocumentStore>,
        files: AttachmentStore,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path().join("data").join("db.json"))
            .await
            .unwrap();
        let files = AttachmentStore::new(dir.path().join("uploads"), dir.path().join("tmp"))
            .await
            .unwrap();
        Fixture {
            _dir: dir,
            store: Arc::new(store),
            files,
        }
    }

    fn titled(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();

        let task = Task::create(&fx.store, &fx.files, owner, titled("buy milk"))
            .await
            .unwrap();

        assert_eq!(task.user_id, owner);
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.description, "");
        assert!(task.attachment.is_none());
        assert!(task.updated_at.is_none());

        let tasks = Task::list_for_user(&fx.store, owner).await.unwrap();
        assert_eq!(tasks, vec![task]);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let fx = fixture().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        Task::create(&fx.store, &fx.files, alice, titled("alice's")).await.unwrap();

        assert!(Task::list_for_user(&fx.store, bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        for title in ["one", "two", "three"] {
            Task::create(&fx.store, &fx.files, owner, titled(title)).await.unwrap();
            Task::create(&fx.store, &fx.files, other, titled("noise")).await.unwrap();
        }

        let titles: Vec<String> = Task::list_for_user(&fx.store, owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_create_with_attachment() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();

        let temp_path = fx.files.staging_path();
        tokio::fs::write(&temp_path, b"pdf bytes").await.unwrap();

        let task = Task::create(
            &fx.store,
            &fx.files,
            owner,
            CreateTask {
                title: "with file".to_string(),
                description: String::new(),
                attachment: Some(IncomingAttachment {
                    temp_path: temp_path.clone(),
                    original_name: "report.pdf".to_string(),
                }),
            },
        )
        .await
        .unwrap();

        let url = task.attachment.clone().unwrap();
        assert!(url.starts_with(&format!("/uploads/{}/", owner)));
        assert!(url.ends_with("-report.pdf"));
        assert_eq!(task.attachment_name.as_deref(), Some("report.pdf"));
        assert!(!temp_path.exists());

        let stored_name = url.rsplit('/').next().unwrap();
        let on_disk = fx
            .files
            .uploads_dir()
            .join(owner.to_string())
            .join(stored_name);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"pdf bytes");
    }

    #[tokio::test]
    async fn test_update_only_title() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();
        let task = Task::create(
            &fx.store,
            &fx.files,
            owner,
            CreateTask {
                title: "old".to_string(),
                description: "keep me".to_string(),
                attachment: None,
            },
        )
        .await
        .unwrap();

        let updated = Task::update(
            &fx.store,
            owner,
            task.id,
            UpdateTask {
                title: Some("new".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "new");
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at.is_some());

        let listed = Task::list_for_user(&fx.store, owner).await.unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_empty_string_clears() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();
        let task = Task::create(
            &fx.store,
            &fx.files,
            owner,
            CreateTask {
                title: "t".to_string(),
                description: "d".to_string(),
                attachment: None,
            },
        )
        .await
        .unwrap();

        let updated = Task::update(
            &fx.store,
            owner,
            task.id,
            UpdateTask {
                title: None,
                description: Some(String::new()),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "t");
        assert_eq!(updated.description, "");
    }

    #[tokio::test]
    async fn test_noop_update_still_bumps_updated_at() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();
        let task = Task::create(&fx.store, &fx.files, owner, titled("same"))
            .await
            .unwrap();

        let updated = Task::update(&fx.store, owner, task.id, UpdateTask::default())
            .await
            .unwrap();

        assert_eq!(updated.title, "same");
        assert!(updated.updated_at.unwrap() >= task.created_at);
    }

    #[tokio::test]
    async fn test_other_owner_gets_not_found() {
        let fx = fixture().await;
        let alice = Uuid::new_v4();
        let mallory = Uuid::new_v4();
        let task = Task::create(&fx.store, &fx.files, alice, titled("private"))
            .await
            .unwrap();

        let update = Task::update(
            &fx.store,
            mallory,
            task.id,
            UpdateTask {
                title: Some("pwned".to_string()),
                description: None,
            },
        )
        .await;
        assert!(matches!(update, Err(TaskError::NotFound)));

        let delete = Task::delete(&fx.store, mallory, task.id).await;
        assert!(matches!(delete, Err(TaskError::NotFound)));

        // Same error as a task that never existed
        let missing = Task::delete(&fx.store, mallory, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(TaskError::NotFound)));

        let listed = Task::list_for_user(&fx.store, alice).await.unwrap();
        assert_eq!(listed, vec![task]);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_task() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();
        let keep = Task::create(&fx.store, &fx.files, owner, titled("keep")).await.unwrap();
        let gone = Task::create(&fx.store, &fx.files, owner, titled("gone")).await.unwrap();

        let deleted = Task::delete(&fx.store, owner, gone.id).await.unwrap();
        assert_eq!(deleted, gone);

        assert_eq!(Task::list_for_user(&fx.store, owner).await.unwrap(), vec![keep]);
        assert!(matches!(
            Task::delete(&fx.store, owner, gone.id).await,
            Err(TaskError::NotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_both_persist() {
        let fx = fixture().await;
        let owner = Uuid::new_v4();

        let (a, b) = tokio::join!(
            Task::create(&fx.store, &fx.files, owner, titled("first")),
            Task::create(&fx.store, &fx.files, owner, titled("second")),
        );
        a.unwrap();
        b.unwrap();

        let mut titles: Vec<String> = Task::list_for_user(&fx.store, owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_serialized_shape() {
        let task = Task {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "t".to_string(),
            description: String::new(),
            attachment: None,
            attachment_name: None,
            created_at: 1,
            updated_at: None,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["userId"], "00000000-0000-0000-0000-000000000000");
        assert!(value["attachment"].is_null());
        assert!(value.get("attachmentName").is_none());
        assert!(value.get("updatedAt").is_none());
    }

    #[test]
    fn test_update_payload_distinguishes_absent_from_empty() {
        let absent: UpdateTask = serde_json::from_str("{}").unwrap();
        assert_eq!(absent, UpdateTask::default());

        let empty: UpdateTask = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert_eq!(empty.title.as_deref(), Some(""));
        assert!(empty.description.is_none());
    }
}
