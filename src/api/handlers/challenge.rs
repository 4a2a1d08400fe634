use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::login_error_response;
use crate::auth::{
    types::{ChallengeResponse, LnurlResponse},
    AuthState,
};

/// Issue a new login session and its `k1` challenge.
#[utoipa::path(
    post,
    path = "/v1/auth/challenge",
    responses(
        (status = 201, description = "Challenge issued", body = ChallengeResponse),
        (status = 500, description = "Secret store unavailable", body = LnurlResponse)
    ),
    tag = "auth"
)]
pub async fn challenge(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    match auth_state
        .login()
        .issue_challenge(auth_state.config().public_url())
        .await
    {
        Ok(challenge) => (StatusCode::CREATED, Json(challenge)).into_response(),
        Err(err) => login_error_response(&err).into_response(),
    }
}
