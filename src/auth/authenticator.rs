//! Login, signup, logout, token verification and password reset over an
//! ordered provider chain.
//!
//! Providers are tried in order. A failure the [`FallbackPolicy`] accepts moves
//! on to the next provider; any other failure is returned as-is. Each provider
//! is tried at most once per call, so with the usual primary/hosted pair there
//! is at most one fallback.

use crate::auth::{
    errors::{AuthError, AuthResult, BackendError},
    provider::{AuthProvider, FallbackPolicy},
    session::SessionManager,
    types::{Session, SignupMetadata, SignupOutcome},
    validation::EmailPolicy,
};
use secrecy::SecretString;
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::{debug, info, instrument, warn};

type ProviderCall<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

pub struct Authenticator {
    providers: Vec<Arc<dyn AuthProvider>>,
    policy: FallbackPolicy,
    skip_primary: bool,
    emails: EmailPolicy,
    session: Arc<SessionManager>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("Authenticator")
            .field("providers", &providers)
            .field("policy", &self.policy)
            .field("skip_primary", &self.skip_primary)
            .field("emails", &self.emails)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    #[must_use]
    pub fn new(session: Arc<SessionManager>, emails: EmailPolicy) -> Self {
        Self {
            providers: Vec::new(),
            policy: FallbackPolicy::default(),
            skip_primary: false,
            emails,
            session,
        }
    }

    /// Appends a provider to the end of the chain. The first one added is the
    /// primary.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sends every call straight to the secondary provider.
    #[must_use]
    pub const fn skip_primary(mut self, skip: bool) -> Self {
        self.skip_primary = skip;
        self
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn email_policy(&self) -> &EmailPolicy {
        &self.emails
    }

    /// Providers in the order they are tried.
    #[must_use]
    pub fn chain(&self) -> &[Arc<dyn AuthProvider>] {
        if self.skip_primary {
            self.providers.get(1..).unwrap_or(&[])
        } else {
            &self.providers
        }
    }

    /// Signs in and stores the session. Every failure, validation included,
    /// leaves the session empty.
    ///
    /// # Errors
    /// Returns `Validation` for rejected input, `Backend` when the chain
    /// fails, `Storage` when the session cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> AuthResult<Session> {
        let result = self.try_login(email, password).await;

        match &result {
            Ok(session) => info!(email = %session.email, "logged in"),
            Err(err) => {
                self.session.clear_quietly();
                warn!("login failed: {err}");
            }
        }

        result
    }

    async fn try_login(&self, email: &str, password: &SecretString) -> AuthResult<Session> {
        let credentials = self.emails.credentials(email, password)?;

        let (provider, grant) = self
            .run_chain("login", |provider| provider.sign_in(&credentials))
            .await?;

        debug!(provider, "sign-in accepted");

        let session = Session::from_grant(provider, &credentials.email, grant);
        Ok(self.session.establish(session)?)
    }

    /// Creates an account. The session is left alone: the caller decides
    /// between asking for email verification and logging in.
    ///
    /// # Errors
    /// Returns `Validation` for rejected input and `Backend` when the chain fails.
    #[instrument(skip(self, password, metadata))]
    pub async fn signup(
        &self,
        email: &str,
        password: &SecretString,
        metadata: &SignupMetadata,
    ) -> AuthResult<SignupOutcome> {
        let credentials = self.emails.credentials(email, password)?;

        let (_, outcome) = self
            .run_chain("signup", |provider| provider.sign_up(&credentials, metadata))
            .await?;

        info!(
            provider = %outcome.provider,
            requires_verification = outcome.requires_verification,
            "account created"
        );

        Ok(outcome)
    }

    /// Clears the local session, then asks the issuing provider (every
    /// provider when the issuer is unknown) to drop its own. Provider failures
    /// are logged and never returned.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let session = self.session.snapshot().session;

        self.session.clear_quietly();

        let Some(token) = session.access_token else {
            debug!("no access token, skipping provider sign-out");
            return;
        };

        for provider in self.issuers(session.provider.as_deref()) {
            if let Err(err) = provider.sign_out(&token).await {
                warn!(provider = provider.name(), "provider sign-out failed: {err}");
            }
        }

        info!("logged out");
    }

    /// Checks the stored token with the provider that issued it and refreshes
    /// the user record. When the issuer is unknown (a restored session), each
    /// provider is asked in turn and a rejection moves on to the next one.
    /// The session ends only when every provider asked rejected the token; an
    /// unreachable provider leaves it as is.
    ///
    /// # Errors
    /// Returns `NotLoggedIn` without a session, `Backend` when no provider
    /// accepts the token.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> AuthResult<Session> {
        let session = self.session.snapshot().session;
        let Some(token) = session.access_token else {
            return Err(AuthError::NotLoggedIn);
        };

        let mut rejection = None;
        let mut outage = None;
        let mut unsupported = None;

        for provider in self.issuers(session.provider.as_deref()) {
            match provider.verify(&token).await {
                Ok(user) => {
                    debug!(provider = provider.name(), "token verified");
                    return Ok(self.session.refresh(
                        provider.name(),
                        user_email_verified(&user),
                        Some(user),
                    ));
                }
                Err(err @ BackendError::Rejected { .. }) => {
                    debug!(provider = provider.name(), "token rejected: {err}");
                    rejection = Some(err);
                }
                Err(err @ BackendError::Unsupported { .. }) => {
                    debug!(provider = provider.name(), "{err}");
                    unsupported = Some(err);
                }
                Err(err) if self.policy.should_advance(&err) => {
                    warn!(
                        provider = provider.name(),
                        "provider unavailable, trying next: {err}"
                    );
                    outage = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        match (outage, rejection, unsupported) {
            (Some(err), _, _) => Err(err.into()),
            (None, Some(err), _) => {
                self.session.clear_quietly();
                warn!("stored token rejected: {err}");
                Err(err.into())
            }
            (None, None, Some(err)) => Err(err.into()),
            (None, None, None) => Err(AuthError::NoProvider),
        }
    }

    /// Providers that may hold the session for `issuer`: that provider alone
    /// when it is known and configured, otherwise the whole chain.
    fn issuers(&self, issuer: Option<&str>) -> Vec<&Arc<dyn AuthProvider>> {
        let known: Vec<&Arc<dyn AuthProvider>> = issuer
            .map(|name| {
                self.providers
                    .iter()
                    .filter(|provider| provider.name() == name)
                    .collect()
            })
            .unwrap_or_default();

        if known.is_empty() {
            self.chain().iter().collect()
        } else {
            known
        }
    }

    /// Sends a password-reset email through the first provider that supports it.
    ///
    /// # Errors
    /// Returns `Validation` for rejected input and `Backend` when the chain fails.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = self.emails.check_email(email)?;

        let (provider, ()) = self
            .run_chain("password reset", |provider| provider.reset_password(&email))
            .await?;

        info!(provider, "password reset requested");
        Ok(())
    }

    /// Walks the chain until a provider succeeds or fails in a way the policy
    /// does not accept. Returns the winning provider's name with its result.
    async fn run_chain<'s, 'c, T, F>(
        &'s self,
        operation: &str,
        call: F,
    ) -> AuthResult<(&'c str, T)>
    where
        's: 'c,
        F: Fn(&'c dyn AuthProvider) -> ProviderCall<'c, T>,
    {
        let mut last_error = None;

        for provider in self.chain() {
            let provider: &'c dyn AuthProvider = provider.as_ref();

            match call(provider).await {
                Ok(value) => return Ok((provider.name(), value)),
                Err(err) if self.policy.should_advance(&err) => {
                    warn!(
                        provider = provider.name(),
                        operation, "provider unavailable, trying next: {err}"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_error.map_or(AuthError::NoProvider, AuthError::from))
    }
}

fn user_email_verified(user: &serde_json::Value) -> bool {
    user.get("email_verified")
        .or_else(|| user.get("emailVerified"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or_else(|| crate::auth::hosted::email_confirmed(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_email_verified_reads_either_shape() {
        assert!(user_email_verified(&json!({"email_verified": true})));
        assert!(!user_email_verified(&json!({"emailVerified": false})));
        assert!(user_email_verified(
            &json!({"email_confirmed_at": "2024-01-01T00:00:00Z"})
        ));
        assert!(!user_email_verified(&json!({"id": "u-1"})));
    }
}
