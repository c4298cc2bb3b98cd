//! User model and document operations
//!
//! Users are created at registration and never removed. Usernames are unique
//! and compared case-sensitively; uniqueness is checked by a linear scan of
//! the document while the store lock is held, so two concurrent registrations
//! of the same name cannot both succeed.
//!
//! # Persisted shape
//!
//! ```json
//! {
//!   "id": "2b1f0c9e-...",
//!   "username": "alice",
//!   "passwordHash": "$argon2id$v=19$m=65536,t=3,p=4$...",
//!   "createdAt": 1700000000000
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{DocumentStore, StoreError};

/// Error type for user operations
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Another user already registered this username
    #[error("username taken")]
    UsernameTaken,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID, generated at creation
    pub id: Uuid,

    /// Unique, case-sensitive login name
    pub username: String,

    /// Argon2id PHC string
    ///
    /// Never leaves the store except to be verified; use [`User::profile`]
    /// for anything sent to a client.
    pub password_hash: String,

    /// Creation time in epoch milliseconds
    pub created_at: i64,
}

/// Public view of a user: everything except the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,

    /// Already-hashed password (NOT plaintext)
    pub password_hash: String,
}

impl User {
    /// Returns the public profile for this user
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
        }
    }

    /// Registers a new user
    ///
    /// # Errors
    ///
    /// - `UserError::UsernameTaken` if the username is already registered; the
    ///   existing record is left untouched
    /// - `UserError::Store` if the document cannot be loaded or saved
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use taskdesk_shared::models::user::{CreateUser, User, UserError};
    /// # use taskdesk_shared::store::DocumentStore;
    /// # async fn example(store: &DocumentStore) -> Result<(), UserError> {
    /// let user = User::create(store, CreateUser {
    ///     username: "alice".to_string(),
    ///     password_hash: "$argon2id$...".to_string(),
    /// }).await?;
    /// println!("Created user: {}", user.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(store: &DocumentStore, data: CreateUser) -> Result<Self, UserError> {
        store
            .mutate(|doc| {
                if doc.users.iter().any(|u| u.username == data.username) {
                    return Err(UserError::UsernameTaken);
                }

                let user = User {
                    id: Uuid::new_v4(),
                    username: data.username,
                    password_hash: data.password_hash,
                    created_at: Utc::now().timestamp_millis(),
                };
                doc.users.push(user.clone());

                Ok(user)
            })
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(store: &DocumentStore, id: Uuid) -> Result<Option<Self>, StoreError> {
        store
            .read(|doc| Ok(doc.users.iter().find(|u| u.id == id).cloned()))
            .await
    }

    /// Finds a user by exact username
    pub async fn find_by_username(
        store: &DocumentStore,
        username: &str,
    ) -> Result<Option<Self>, StoreError> {
        store
            .read(|doc| Ok(doc.users.iter().find(|u| u.username == username).cloned()))
            .await
    }
}
