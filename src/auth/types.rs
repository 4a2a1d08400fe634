//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::store::SessionStatus;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub session_id: String,
    /// Hex-encoded 32-byte challenge the wallet signs.
    pub k1: String,
    /// Callback URL the wallet calls with `sig` and `key`.
    pub url: String,
    /// `url` as a bech32 `lnurl1...` token, ready for a QR code.
    pub lnurl: String,
}

/// LNURL status body: `{"status":"OK"}` or `{"status":"ERROR","reason":..}`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LnurlResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LnurlResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            reason: None,
        }
    }

    #[must_use]
    pub fn error(reason: String) -> Self {
        Self {
            status: "ERROR".to_string(),
            reason: Some(reason),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionStatusResponse {
    pub status: SessionStatus,
    /// Hex-encoded linking key, present once the login is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
