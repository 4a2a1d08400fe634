//! # Lnauth (LNURL-auth login service)
//!
//! `lnauth` lets a client prove control of a secp256k1 key by signing a
//! one-time, server-issued challenge (`k1`). The server verifies the signature
//! against the claimed linking key and marks the login session as verified.
//!
//! ## Flow
//!
//! 1. `POST /v1/auth/challenge` issues a session and a 32-byte random `k1`,
//!    and returns the callback URL encoded as an `lnurl1...` token.
//! 2. The wallet decodes the token, signs `k1` and calls the callback with
//!    `sig` and `key`.
//! 3. The login orchestrator validates the parameters, resolves `k1` from the
//!    secret store (never from the request), verifies the signature and moves
//!    the session from `PENDING` to `VERIFIED` with a single atomic transition.
//! 4. The frontend polls `GET /v1/auth/session/{id}`; the first poll that sees
//!    `VERIFIED` consumes the session.
//!
//! Unknown and expired sessions produce the same response so callers cannot
//! probe which session identifiers ever existed.

pub mod api;
pub mod auth;
pub mod cli;
pub mod lnurl;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
