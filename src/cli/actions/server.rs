use crate::{
    api,
    auth::{AuthConfig, AuthState},
    cli::telemetry,
};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub public_url: String,
    pub challenge_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub store_timeout_ms: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the public URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    check_public_url(&args.public_url)?;

    let auth_config = AuthConfig::new(args.public_url)
        .with_challenge_ttl_seconds(args.challenge_ttl_seconds)
        .with_max_failed_attempts(args.max_failed_attempts)
        .with_store_timeout_ms(args.store_timeout_ms);

    debug!("Auth config: {:?}", auth_config);
    info!(
        "Challenges expire after {}s, callbacks point at {}",
        auth_config.challenge_ttl().as_secs(),
        auth_config.public_url()
    );

    let auth_state = Arc::new(AuthState::in_memory(auth_config));

    let result = api::new(args.port, auth_state).await;

    telemetry::shutdown_tracer();

    result
}

/// Wallets resolve the callback from the encoded URL, so it must be absolute http(s).
fn check_public_url(public_url: &str) -> Result<()> {
    let parsed =
        Url::parse(public_url).with_context(|| format!("Invalid public URL: {public_url}"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(anyhow!("Unsupported public URL scheme: {scheme}")),
    }

    if parsed.host_str().is_none() {
        return Err(anyhow!("Public URL must include a host: {public_url}"));
    }

    Ok(())
}
