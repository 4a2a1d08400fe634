//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        public_url: auth_opts.public_url,
        challenge_ttl_seconds: auth_opts.challenge_ttl_seconds,
        max_failed_attempts: auth_opts.max_failed_attempts,
        store_timeout_ms: auth_opts.store_timeout_ms,
    }))
}
