//! Bearer-token authentication gate
//!
//! [`authenticate`] turns a request's headers into an [`AuthContext`] or an
//! [`AuthError`]. It has no side effects on the request; the HTTP layer calls
//! it explicitly (through an extractor) and passes the resulting identity to
//! the handler. The identity it returns is the only authorization context a
//! handler may use.
//!
//! # Checks, in order
//!
//! 1. `Authorization: Bearer <token>` is present → else `MissingToken`
//! 2. The token verifies against the secret → else `InvalidToken`
//! 3. The token's user still exists in the document → else `UnknownUser`
//!
//! Tokens live for days while the user set can change underneath them, which
//! is why step 3 exists.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::User;
use crate::store::{DocumentStore, StoreError};

/// Authenticated identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
}

/// Error type for the authentication gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header
    #[error("Missing token")]
    MissingToken,

    /// Token failed signature, expiry, or format checks
    #[error("Invalid token")]
    InvalidToken(#[source] JwtError),

    /// Token is valid but its user no longer exists
    #[error("Invalid token (user not found)")]
    UnknownUser,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts the bearer token from the `Authorization` header
///
/// The scheme must be exactly `Bearer` followed by a single space and a
/// non-empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Resolves request headers to an authenticated user
///
/// # Errors
///
/// - `AuthError::MissingToken` if there is no usable bearer token
/// - `AuthError::InvalidToken` if the token fails verification
/// - `AuthError::UnknownUser` if the token's user is not in the document
/// - `AuthError::Store` if the document cannot be read
pub async fn authenticate(
    headers: &HeaderMap,
    secret: &str,
    store: &DocumentStore,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret).map_err(AuthError::InvalidToken)?;

    let user = User::find_by_id(store, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext {
        user_id: user.id,
        username: user.username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use crate::models::user::CreateUser;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use tempfile::TempDir;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn store_with_user(username: &str) -> (TempDir, DocumentStore, User) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path().join("db.json")).await.unwrap();
        let user = User::create(
            &store,
            CreateUser {
                username: username.to_string(),
                password_hash: "unused".to_string(),
            },
        )
        .await
        .unwrap();
        (dir, store, user)
    }

    fn token_for(user_id: Uuid, ttl: Duration) -> String {
        create_token(&Claims::new(user_id, ttl), SECRET).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");

        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers_with("Basic abc")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers_with("bearer abc")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers_with("Bearer ")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers_with("abc")), Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_authenticate_valid_token() {
        let (_dir, store, user) = store_with_user("alice").await;
        let headers = headers_with(&format!("Bearer {}", token_for(user.id, Duration::hours(1))));

        let ctx = authenticate(&headers, SECRET, &store).await.unwrap();
        assert_eq!(
            ctx,
            AuthContext {
                user_id: user.id,
                username: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_token_resolves_only_to_its_user() {
        let (_dir, store, alice) = store_with_user("alice").await;
        let bob = User::create(
            &store,
            CreateUser {
                username: "bob".to_string(),
                password_hash: "unused".to_string(),
            },
        )
        .await
        .unwrap();

        let alice_headers = headers_with(&format!("Bearer {}", token_for(alice.id, Duration::hours(1))));
        let bob_headers = headers_with(&format!("Bearer {}", token_for(bob.id, Duration::hours(1))));

        assert_eq!(authenticate(&alice_headers, SECRET, &store).await.unwrap().user_id, alice.id);
        assert_eq!(authenticate(&bob_headers, SECRET, &store).await.unwrap().user_id, bob.id);
    }

    #[tokio::test]
    async fn test_authenticate_missing_header() {
        let (_dir, store, _user) = store_with_user("alice").await;

        let result = authenticate(&HeaderMap::new(), SECRET, &store).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_authenticate_bad_tokens() {
        let (_dir, store, user) = store_with_user("alice").await;

        let expired = headers_with(&format!("Bearer {}", token_for(user.id, Duration::seconds(-10))));
        assert!(matches!(
            authenticate(&expired, SECRET, &store).await,
            Err(AuthError::InvalidToken(JwtError::Expired))
        ));

        let wrong_key = create_token(&Claims::new(user.id, Duration::hours(1)), "other-secret").unwrap();
        let forged = headers_with(&format!("Bearer {}", wrong_key));
        assert!(matches!(
            authenticate(&forged, SECRET, &store).await,
            Err(AuthError::InvalidToken(JwtError::InvalidSignature))
        ));

        let garbage = headers_with("Bearer not.a.token");
        assert!(matches!(
            authenticate(&garbage, SECRET, &store).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let (_dir, store, _user) = store_with_user("alice").await;
        let headers = headers_with(&format!("Bearer {}", token_for(Uuid::new_v4(), Duration::hours(1))));

        let result = authenticate(&headers, SECRET, &store).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }
}
