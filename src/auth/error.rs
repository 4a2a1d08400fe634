//! Login failure taxonomy and its client-facing mapping.

use axum::http::StatusCode;
use thiserror::Error;

/// Message shared by unknown and expired sessions.
pub const SESSION_MESSAGE: &str = "Session not found or expired";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Missing required parameter: \"{0}\"")]
    MissingParameter(&'static str),
    #[error("Invalid hex encoding for parameter: \"{0}\"")]
    MalformedEncoding(&'static str),
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

impl LoginError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_)
            | Self::MalformedEncoding(_)
            | Self::InvalidPublicKey
            | Self::InvalidSignatureEncoding
            | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::SessionNotFound | Self::SessionExpired => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client.
    ///
    /// Key and signature parse failures collapse into `Invalid signature`, and
    /// both session variants share one message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::MissingParameter(_) | Self::MalformedEncoding(_) | Self::InvalidSignature => {
                self.to_string()
            }
            Self::InvalidPublicKey | Self::InvalidSignatureEncoding => {
                Self::InvalidSignature.to_string()
            }
            Self::SessionNotFound | Self::SessionExpired => SESSION_MESSAGE.to_string(),
            Self::Unavailable(_) => "Service unavailable".to_string(),
        }
    }
}
