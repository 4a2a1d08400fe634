//! HTTP handlers.
//!
//! Auth handlers are thin: they pull parameters out of the request, call the
//! [`LoginService`](crate::auth::LoginService) and translate a
//! [`LoginError`](crate::auth::LoginError) into status code and LNURL body.

pub mod challenge;
pub mod health;
pub mod lnurl_login;
pub mod root;
pub mod session;

use axum::{http::StatusCode, Json};
use tracing::{debug, error, warn};

use crate::auth::{types::LnurlResponse, LoginError};

/// Log a login failure at a level matching its cause and build the response.
pub(crate) fn login_error_response(err: &LoginError) -> (StatusCode, Json<LnurlResponse>) {
    match err {
        LoginError::Unavailable(reason) => error!("login failed: {reason}"),
        LoginError::InvalidSignature
        | LoginError::InvalidPublicKey
        | LoginError::InvalidSignatureEncoding => warn!("login rejected: {err}"),
        _ => debug!("login rejected: {err}"),
    }

    (err.status(), Json(LnurlResponse::error(err.message())))
}
