//! Health check endpoint
//!
//! ```text
//! GET /api/health
//! ```
//!
//! ```json
//! { "ok": true, "env": "production" }
//! ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true while the server is answering
    pub ok: bool,

    /// Deployment environment name
    pub env: String,
}

/// Health check handler
///
/// Does not touch the document, so it answers even if storage is unhealthy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        env: state.config.api.env.clone(),
    })
}
