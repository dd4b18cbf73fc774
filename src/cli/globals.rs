use crate::auth::{
    ApiBackend, Authenticator, EmailPolicy, FallbackPolicy, FileStore, HostedBackend,
    SessionManager, http,
};
use crate::cli::commands::backend::Options;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;

/// Configuration shared by every subcommand.
#[derive(Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub hosted_url: Option<String>,
    pub hosted_key: Option<SecretString>,
    pub skip_primary: bool,
    pub allowed_domain: String,
    pub state_file: PathBuf,
    pub fallback_policy: FallbackPolicy,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            api_url: options.api_url,
            hosted_url: options.hosted_url,
            hosted_key: options.hosted_key,
            skip_primary: options.skip_primary,
            allowed_domain: options.allowed_domain,
            state_file: options.state_file,
            fallback_policy: options.fallback_policy,
            timeout: Duration::from_secs(options.timeout_seconds),
        }
    }

    #[must_use]
    pub fn user_agent() -> String {
        format!("{} ({})", crate::APP_USER_AGENT, crate::GIT_COMMIT_HASH)
    }

    /// Loads the persisted session from the state file.
    ///
    /// # Errors
    /// Returns an error if the state file exists but cannot be read.
    pub fn session(&self) -> Result<Arc<SessionManager>> {
        let store = Arc::new(FileStore::new(&self.state_file));
        let session = Arc::new(SessionManager::new(store));
        session
            .restore()
            .with_context(|| format!("failed to read {}", self.state_file.display()))?;
        Ok(session)
    }

    /// Builds the provider chain: the API first, then the hosted provider when
    /// one is configured.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the session store cannot be set up.
    pub fn authenticator(&self) -> Result<Authenticator> {
        let client = http::client(&Self::user_agent(), self.timeout)
            .context("failed to build HTTP client")?;

        let mut authenticator =
            Authenticator::new(self.session()?, EmailPolicy::new(&self.allowed_domain))
                .with_policy(self.fallback_policy.clone())
                .with_provider(Arc::new(ApiBackend::new(client.clone(), &self.api_url)));

        if let (Some(url), Some(key)) = (&self.hosted_url, &self.hosted_key) {
            authenticator = authenticator
                .with_provider(Arc::new(HostedBackend::new(client, url, key.clone())))
                .skip_primary(self.skip_primary);
        }

        debug!(
            providers = authenticator.chain().len(),
            policy = %self.fallback_policy,
            "authenticator ready"
        );

        Ok(authenticator)
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("api_url", &self.api_url)
            .field("hosted_url", &self.hosted_url)
            .field("hosted_key", &self.hosted_key.as_ref().map(|_| "***"))
            .field("skip_primary", &self.skip_primary)
            .field("allowed_domain", &self.allowed_domain)
            .field("state_file", &self.state_file)
            .field("fallback_policy", &self.fallback_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}
