use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_CHALLENGE_TTL_SECONDS: &str = "challenge-ttl-seconds";
pub const ARG_MAX_FAILED_ATTEMPTS: &str = "max-failed-attempts";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";

#[derive(Debug)]
pub struct Options {
    pub public_url: String,
    pub challenge_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub store_timeout_ms: u64,
}

impl Options {
    /// Read auth options from validated matches.
    ///
    /// # Errors
    /// Returns an error if a required option is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let public_url = matches
            .get_one::<String>(ARG_PUBLIC_URL)
            .cloned()
            .context("missing required argument: --public-url")?;

        Ok(Self {
            public_url,
            challenge_ttl_seconds: matches
                .get_one::<u64>(ARG_CHALLENGE_TTL_SECONDS)
                .copied()
                .unwrap_or(300),
            max_failed_attempts: matches
                .get_one::<u32>(ARG_MAX_FAILED_ATTEMPTS)
                .copied()
                .unwrap_or(5),
            store_timeout_ms: matches
                .get_one::<u64>(ARG_STORE_TIMEOUT_MS)
                .copied()
                .unwrap_or(2_000),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Public base URL wallets use to reach the login callback")
                .env("LNAUTH_PUBLIC_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CHALLENGE_TTL_SECONDS)
                .long(ARG_CHALLENGE_TTL_SECONDS)
                .help("Lifetime of an issued challenge in seconds")
                .env("LNAUTH_CHALLENGE_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MAX_FAILED_ATTEMPTS)
                .long(ARG_MAX_FAILED_ATTEMPTS)
                .help("Invalid signatures tolerated per session before it expires (0 disables)")
                .env("LNAUTH_MAX_FAILED_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Deadline for a single secret store call in milliseconds")
                .env("LNAUTH_STORE_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
