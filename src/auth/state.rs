//! Auth configuration and shared state.

use std::sync::Arc;
use std::time::Duration;

use super::login::LoginService;
use super::store::{MemoryStore, SecretStore};

const DEFAULT_CHALLENGE_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_url: String,
    challenge_ttl_seconds: u64,
    max_failed_attempts: u32,
    store_timeout_ms: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_url: String) -> Self {
        // Callback paths are appended, so drop any trailing slash once here.
        let public_url = public_url.trim_end_matches('/').to_string();

        Self {
            public_url,
            challenge_ttl_seconds: DEFAULT_CHALLENGE_TTL_SECONDS,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_challenge_ttl_seconds(mut self, seconds: u64) -> Self {
        self.challenge_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_store_timeout_ms(mut self, millis: u64) -> Self {
        self.store_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    #[must_use]
    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_seconds)
    }

    /// Zero disables the lockout.
    #[must_use]
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

pub struct AuthState {
    config: AuthConfig,
    login: LoginService,
}

impl AuthState {
    pub fn new(config: AuthConfig, store: Arc<dyn SecretStore>) -> Self {
        let login = LoginService::new(store, config.store_timeout());
        Self { config, login }
    }

    /// State backed by an in-process [`MemoryStore`] sized from `config`.
    #[must_use]
    pub fn in_memory(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::new(
            config.challenge_ttl(),
            config.max_failed_attempts(),
        ));
        Self::new(config, store)
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn login(&self) -> &LoginService {
        &self.login
    }
}
