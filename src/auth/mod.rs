//! LNURL-auth core.
//!
//! - [`params`] turns raw callback parameters into a typed [`LoginRequest`].
//! - [`verifier`] checks a secp256k1 signature over the session `k1`.
//! - [`store`] owns sessions and their atomic status transitions.
//! - [`login`] composes them and maps outcomes to client-facing errors.
//!
//! ## Failed attempts
//!
//! An invalid signature leaves the session `PENDING` so a wallet can retry,
//! but after `max_failed_attempts` failures the store expires it. Set the
//! limit to zero to disable the lockout.

pub mod error;
pub mod login;
pub mod params;
mod state;
pub mod store;
pub mod types;
pub mod verifier;

pub use error::LoginError;
pub use login::LoginService;
pub use params::LoginRequest;
pub use state::{AuthConfig, AuthState};
pub use store::{MemoryStore, SecretStore, SessionStatus};
