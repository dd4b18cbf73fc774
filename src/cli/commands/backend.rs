use crate::auth::{
    provider::FallbackPolicy, primary::DEFAULT_API_BASE_URL,
    validation::DEFAULT_ALLOWED_DOMAIN,
};
use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, builder::BoolishValueParser};
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_HOSTED_URL: &str = "hosted-url";
pub const ARG_HOSTED_KEY: &str = "hosted-key";
pub const ARG_SKIP_PRIMARY: &str = "skip-primary";
pub const ARG_ALLOWED_DOMAIN: &str = "allowed-domain";
pub const ARG_STATE_FILE: &str = "state-file";
pub const ARG_FALLBACK_POLICY: &str = "fallback-policy";
pub const ARG_TIMEOUT: &str = "timeout-seconds";

pub const DEFAULT_STATE_FILE: &str = ".impulse/session.json";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Impulse API base URL (primary backend)")
                .env("IMPULSE_API_URL")
                .default_value(DEFAULT_API_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_HOSTED_URL)
                .long(ARG_HOSTED_URL)
                .help("Hosted auth provider project URL (secondary backend)")
                .env("IMPULSE_HOSTED_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_HOSTED_KEY)
                .long(ARG_HOSTED_KEY)
                .help("Hosted auth provider public API key")
                .env("IMPULSE_HOSTED_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_SKIP_PRIMARY)
                .long(ARG_SKIP_PRIMARY)
                .help("Go straight to the hosted provider")
                .env("IMPULSE_SKIP_PRIMARY")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new())
                .global(true),
        )
        .arg(
            Arg::new(ARG_ALLOWED_DOMAIN)
                .long(ARG_ALLOWED_DOMAIN)
                .help("Only email addresses in this domain may sign in or sign up")
                .env("IMPULSE_ALLOWED_DOMAIN")
                .default_value(DEFAULT_ALLOWED_DOMAIN)
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_FILE)
                .long(ARG_STATE_FILE)
                .help("File holding the persisted session")
                .env("IMPULSE_STATE_FILE")
                .default_value(DEFAULT_STATE_FILE)
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new(ARG_FALLBACK_POLICY)
                .long(ARG_FALLBACK_POLICY)
                .help("When to fall back to the next backend: classified, markers or compat")
                .env("IMPULSE_FALLBACK_POLICY")
                .default_value("compat")
                .value_parser(|value: &str| value.parse::<FallbackPolicy>())
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Per-request timeout in seconds")
                .env("IMPULSE_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..=300))
                .global(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_url: String,
    pub hosted_url: Option<String>,
    pub hosted_key: Option<SecretString>,
    pub skip_primary: bool,
    pub allowed_domain: String,
    pub state_file: PathBuf,
    pub fallback_policy: FallbackPolicy,
    pub timeout_seconds: u64,
}

impl Options {
    /// Reads and cross-checks the backend arguments.
    ///
    /// # Errors
    /// Returns an error if a URL does not parse or the hosted provider is
    /// incompletely configured.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        Url::parse(&api_url).with_context(|| format!("invalid --{ARG_API_URL}: {api_url}"))?;

        let hosted_url = matches
            .get_one::<String>(ARG_HOSTED_URL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if let Some(url) = &hosted_url {
            Url::parse(url).with_context(|| format!("invalid --{ARG_HOSTED_URL}: {url}"))?;
        }

        let hosted_key = matches
            .get_one::<String>(ARG_HOSTED_KEY)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(SecretString::from);

        if hosted_url.is_some() && hosted_key.is_none() {
            bail!("missing required argument: --{ARG_HOSTED_KEY} (required with --{ARG_HOSTED_URL})");
        }

        let skip_primary = matches.get_flag(ARG_SKIP_PRIMARY);
        if skip_primary && hosted_url.is_none() {
            bail!("--{ARG_SKIP_PRIMARY} requires --{ARG_HOSTED_URL}");
        }

        Ok(Self {
            api_url,
            hosted_url,
            hosted_key,
            skip_primary,
            allowed_domain: matches
                .get_one::<String>(ARG_ALLOWED_DOMAIN)
                .cloned()
                .unwrap_or_else(|| DEFAULT_ALLOWED_DOMAIN.to_string()),
            state_file: matches
                .get_one::<PathBuf>(ARG_STATE_FILE)
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            fallback_policy: matches
                .get_one::<FallbackPolicy>(ARG_FALLBACK_POLICY)
                .cloned()
                .unwrap_or_default(),
            timeout_seconds: matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10),
        })
    }
}
