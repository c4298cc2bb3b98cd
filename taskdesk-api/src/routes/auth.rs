//! Authentication endpoints
//!
//! - `POST /api/auth/register` - Register a new user and get a token
//! - `POST /api/auth/login` - Exchange credentials for a token
//!
//! Both respond with `{ "token": "...", "user": { "id": "...", "username": "..." } }`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User, UserProfile},
};
use tracing::info;
use validator::Validate;

const MISSING_FIELDS: &str = "username and password required";
const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Credentials sent to register or login
///
/// Missing fields deserialize as empty strings so that they fail validation
/// with the same message as blank ones.
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[serde(default)]
    #[validate(length(min = 1, message = "username and password required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "username and password required"))]
    pub password: String,
}

/// Successful register/login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,

    /// The authenticated user, without the password hash
    pub user: UserProfile,
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Missing username/password or malformed JSON
/// - `409 Conflict`: Username already registered
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = body?;
    validate(&req)?;

    password::validate_password_strength(&req.password).map_err(ApiError::BadRequest)?;

    if User::find_by_username(&state.store, &req.username).await?.is_some() {
        return Err(ApiError::Conflict("username taken".to_string()));
    }

    let params = state.config.password;
    let plaintext = req.password;
    let password_hash = blocking(move || password::hash_password(&plaintext, &params)).await??;

    // Uniqueness is enforced again under the store lock
    let user = User::create(
        &state.store,
        CreateUser {
            username: req.username,
            password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "Registered user");

    issue_token(&state, &user)
}

/// Login endpoint
///
/// # Errors
///
/// - `400 Bad Request`: Missing username/password or malformed JSON
/// - `401 Unauthorized`: Unknown username or wrong password
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = body?;
    validate(&req)?;

    let user = User::find_by_username(&state.store, &req.username).await?;

    // Unknown usernames still pay for one verification
    let hash = match &user {
        Some(user) => user.password_hash.clone(),
        None => state.decoy_hash().await?,
    };
    let plaintext = req.password;
    let valid = blocking(move || password::verify_password(&plaintext, &hash)).await??;

    let user = match user {
        Some(user) if valid => user,
        _ => return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())),
    };

    info!(user_id = %user.id, "User logged in");

    issue_token(&state, &user)
}

fn validate(req: &Credentials) -> ApiResult<()> {
    req.validate()
        .map_err(|_| ApiError::BadRequest(MISSING_FIELDS.to_string()))
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<Json<AuthResponse>> {
    let claims = jwt::Claims::new(user.id, state.config.token_ttl());
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// Runs CPU-bound password work off the async runtime
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::InternalError(format!("Password task failed: {}", e)))
}
