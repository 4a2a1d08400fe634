use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::{collections::HashMap, sync::Arc};

use super::login_error_response;
use crate::auth::{types::LnurlResponse, AuthState};

pub const USAGE_MESSAGE: &str =
    "Invalid request. Expected querystring as follows: k1=SECRET&sig=SIGNATURE&key=LINKING_PUBKEY";

/// LNURL-auth callback: the wallet presents `sig` over `k1` and its linking `key`.
///
/// The `k1` query parameter is informational; verification always uses the
/// secret stored for `session_id`.
///
/// A callback with no query parameters at all gets the LNURL usage message.
/// As soon as any parameter is present, a missing `sig` or `key` is reported
/// by name.
#[utoipa::path(
    get,
    path = "/v1/auth/lnurl/{session_id}",
    params(
        ("session_id" = String, Path, description = "Login session identifier"),
        ("sig" = Option<String>, Query, description = "Hex DER signature over k1"),
        ("key" = Option<String>, Query, description = "Hex compressed linking public key"),
        ("k1" = Option<String>, Query, description = "Hex challenge, ignored for verification")
    ),
    responses(
        (status = 200, description = "Login verified", body = LnurlResponse),
        (status = 400, description = "Missing/invalid parameters or signature", body = LnurlResponse),
        (status = 404, description = "Session not found or expired", body = LnurlResponse),
        (status = 500, description = "Secret store unavailable", body = LnurlResponse)
    ),
    tag = "auth"
)]
pub async fn lnurl_login(
    Path(session_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if params.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(LnurlResponse::error(USAGE_MESSAGE.to_string())),
        )
            .into_response();
    }

    match auth_state.login().complete_login(&session_id, &params).await {
        Ok(()) => (StatusCode::OK, Json(LnurlResponse::ok())).into_response(),
        Err(err) => login_error_response(&err).into_response(),
    }
}
