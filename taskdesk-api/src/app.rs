//! Application state and router builder
//!
//! This module defines the shared application state, the [`AuthUser`]
//! extractor that gates task routes, and the function that assembles the
//! Axum router with all routes and middleware.
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_api::{app::AppState, config::Config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::open(config).await?;
//! let app = taskdesk_api::app::build_router(state);
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header, request::Parts, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskdesk_shared::{
    attachment::{AttachmentStore, UPLOADS_URL_PREFIX},
    auth::{
        middleware::{authenticate, AuthContext},
        password,
    },
    store::DocumentStore,
};
use tokio::sync::OnceCell;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// The JSON document holding users and tasks
    pub store: Arc<DocumentStore>,

    /// Uploaded file storage
    pub attachments: Arc<AttachmentStore>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Hash checked when a login names an unknown user
    decoy_hash: Arc<OnceCell<String>>,
}

const DECOY_PASSWORD: &str = "taskdesk-decoy-password";

impl AppState {
    /// Creates application state from already-opened stores
    pub fn new(store: DocumentStore, attachments: AttachmentStore, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            attachments: Arc::new(attachments),
            config: Arc::new(config),
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Opens the document and prepares the upload directories
    ///
    /// # Errors
    ///
    /// Fails if a directory cannot be created or the document is corrupt.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let store = DocumentStore::open(config.document_path()).await?;
        let attachments = AttachmentStore::new(
            &config.storage.uploads_dir,
            &config.storage.tmp_uploads_dir,
        )
        .await?;

        Ok(Self::new(store, attachments, config))
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Returns a hash made with the configured cost parameters
    ///
    /// Verifying against it costs the same as verifying a real user's
    /// password. Computed on first use and shared by all clones.
    pub async fn decoy_hash(&self) -> Result<String, ApiError> {
        let params = self.config.password;
        let hash = self
            .decoy_hash
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || password::hash_password(DECOY_PASSWORD, &params))
                    .await
                    .map_err(|e| ApiError::InternalError(format!("Password task failed: {}", e)))?
                    .map_err(ApiError::from)
            })
            .await?;

        Ok(hash.clone())
    }
}

/// Authenticated user, resolved from the bearer token
///
/// Taking `AuthUser` as a handler argument is what makes a route
/// authenticated. A request without a valid token never reaches the handler.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = authenticate(&parts.headers, state.jwt_secret(), &state.store).await?;
        Ok(AuthUser(ctx))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /api/
/// │   ├── GET    /health            # Health check (public)
/// │   ├── /auth/
/// │   │   ├── POST /register
/// │   │   └── POST /login
/// │   └── /tasks/                   # Authenticated
/// │       ├── GET    /
/// │       ├── POST   /              # multipart
/// │       ├── PUT    /:id
/// │       └── DELETE /:id
/// ├── /uploads/*                    # Stored attachments
/// └── /*                            # Public dir, falling back to index.html
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Request body limit (API routes only)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        );

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .layer(DefaultBodyLimit::max(state.config.api.max_upload_bytes));

    let public_dir = &state.config.storage.public_dir;
    // Unknown paths get index.html with 200; 404 only when index.html is missing
    let spa = ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html")));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api_routes)
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(&state.config.storage.uploads_dir))
        .fallback_service(spa)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.is_production()))
        .with_state(state)
}
