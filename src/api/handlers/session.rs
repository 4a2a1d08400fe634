use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::login_error_response;
use crate::auth::{
    types::{LnurlResponse, SessionStatusResponse},
    AuthState,
};

/// Poll a login session. The first poll that observes `VERIFIED` consumes it.
#[utoipa::path(
    get,
    path = "/v1/auth/session/{session_id}",
    params(
        ("session_id" = String, Path, description = "Login session identifier")
    ),
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
        (status = 404, description = "Session not found, expired or consumed", body = LnurlResponse)
    ),
    tag = "auth"
)]
pub async fn session(
    Path(session_id): Path<String>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match auth_state.login().session_status(&session_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => login_error_response(&err).into_response(),
    }
}
