//! Task endpoints
//!
//! Every route here takes [`AuthUser`], so a request without a valid bearer
//! token is rejected with 401 before the body is read. Tasks belonging to
//! other users are indistinguishable from missing ones (404).
//!
//! - `GET /api/tasks` - List the caller's tasks
//! - `POST /api/tasks` - Create a task (multipart: `title`, `description`, `attachment`)
//! - `PUT /api/tasks/:id` - Update `title` and/or `description`
//! - `DELETE /api/tasks/:id` - Delete a task

use crate::{
    app::{AppState, AuthUser},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use taskdesk_shared::{
    attachment::{AttachmentStore, IncomingAttachment},
    models::task::{CreateTask, Task, UpdateTask},
};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

/// Response to a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted: Task,
}

/// List the caller's tasks in creation order
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_for_user(&state.store, user.user_id).await?;
    Ok(Json(tasks))
}

/// Create a task from a multipart form
///
/// The `attachment` part, if present with a filename, is streamed to the
/// staging directory and then moved under the caller's upload directory.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed multipart body
/// - `413 Payload Too Large`: Body exceeds the configured upload limit
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let mut multipart = multipart?;

    let mut form = CreateTask::default();
    if let Err(err) = read_task_form(&mut multipart, &state.attachments, &mut form).await {
        if let Some(staged) = form.attachment.take() {
            state.attachments.discard(&staged.temp_path).await;
        }
        return Err(err);
    }

    let staged = form.attachment.as_ref().map(|a| a.temp_path.clone());
    let task = match Task::create(&state.store, &state.attachments, user.user_id, form).await {
        Ok(task) => task,
        Err(err) => {
            if let Some(path) = staged {
                state.attachments.discard(&path).await;
            }
            return Err(err.into());
        }
    };

    info!(
        task_id = %task.id,
        user_id = %user.user_id,
        has_attachment = task.attachment.is_some(),
        "Created task"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

/// Update the title and/or description of one of the caller's tasks
///
/// Absent or `null` fields are left unchanged.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON
/// - `404 Not Found`: No such task for this user
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateTask>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let Json(changes) = body?;

    let task = Task::update(&state.store, user.user_id, id, changes).await?;
    Ok(Json(task))
}

/// Delete one of the caller's tasks
///
/// The attachment file, if any, stays on disk.
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_task_id(&id)?;

    let deleted = Task::delete(&state.store, user.user_id, id).await?;
    info!(task_id = %deleted.id, user_id = %user.user_id, "Deleted task");

    Ok(Json(DeleteResponse { ok: true, deleted }))
}

/// Task IDs that are not UUIDs cannot exist
fn parse_task_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("not found".to_string()))
}

/// Reads the multipart form into `form`
///
/// On error, a staged attachment may already be recorded in `form`; the
/// caller discards it.
async fn read_task_form(
    multipart: &mut Multipart,
    attachments: &AttachmentStore,
    form: &mut CreateTask,
) -> ApiResult<()> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => form.title = field.text().await?,
            "description" => form.description = field.text().await?,
            "attachment" => {
                // Browsers send an empty file part when nothing was chosen
                let original_name = match field.file_name() {
                    Some(file_name) if !file_name.is_empty() => file_name.to_string(),
                    _ => continue,
                };

                let temp_path = attachments.staging_path();
                if let Err(err) = stage_upload(&mut field, &temp_path).await {
                    attachments.discard(&temp_path).await;
                    return Err(err);
                }

                let incoming = IncomingAttachment {
                    temp_path,
                    original_name,
                };
                if let Some(previous) = form.attachment.replace(incoming) {
                    attachments.discard(&previous.temp_path).await;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Streams one multipart field to `path`
async fn stage_upload(field: &mut Field<'_>, path: &FsPath) -> ApiResult<()> {
    let io_error = |e: std::io::Error| {
        ApiError::InternalError(format!("Failed to stage upload {}: {}", path.display(), e))
    };

    let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(io_error)?;
    }
    file.flush().await.map_err(io_error)?;

    Ok(())
}
