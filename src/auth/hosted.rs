//! Client for the hosted auth provider, the secondary backend. Speaks the
//! provider's REST surface under `/auth/v1`: password grant, signup, logout,
//! recover and current-user lookup. Every call carries the project's public
//! API key; user-scoped calls add the user's bearer token.

use crate::auth::{
    errors::BackendError,
    http,
    provider::AuthProvider,
    types::{Credentials, Grant, SignupMetadata, SignupOutcome},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{info_span, instrument};

const PROVIDER: &str = "hosted";

#[derive(Clone)]
pub struct HostedBackend {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for HostedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

impl HostedBackend {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        http::build_url(&self.base_url, path)
    }

    /// Request authorized with the public key only.
    fn anonymous(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(self.api_key.expose_secret())
    }

    /// Request on behalf of a signed-in user.
    fn as_user(&self, request: RequestBuilder, access_token: &SecretString) -> RequestBuilder {
        request
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(access_token.expose_secret())
    }
}

#[async_trait]
impl AuthProvider for HostedBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Grant, BackendError> {
        let url = self.url("/auth/v1/token?grant_type=password");
        let span = info_span!("hosted.sign_in", http.method = "POST", url = %url);
        let request = self.anonymous(self.client.post(&url)).json(&json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        }));

        let body = http::send(PROVIDER, request, span)
            .await?
            .ok_or_else(|| unexpected("empty sign-in response"))?;

        let access_token = string_field(&body, "access_token")
            .ok_or_else(|| unexpected("no access_token in sign-in response"))?;
        let user = body.get("user").cloned();

        Ok(Grant {
            access_token: SecretString::from(access_token),
            email_verified: user.as_ref().is_some_and(email_confirmed),
            user,
        })
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: &SignupMetadata,
    ) -> Result<SignupOutcome, BackendError> {
        let url = self.url("/auth/v1/signup");
        let span = info_span!("hosted.sign_up", http.method = "POST", url = %url);
        let request = self.anonymous(self.client.post(&url)).json(&json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
            "data": metadata.to_json(),
        }));

        let body = http::send(PROVIDER, request, span)
            .await?
            .ok_or_else(|| unexpected("empty sign-up response"))?;

        // With email confirmation on, the provider returns the bare user and
        // no session.
        Ok(match string_field(&body, "access_token") {
            Some(token) => SignupOutcome {
                provider: PROVIDER.to_string(),
                access_token: Some(SecretString::from(token)),
                user: body.get("user").cloned(),
                requires_verification: false,
            },
            None => SignupOutcome {
                provider: PROVIDER.to_string(),
                access_token: None,
                user: Some(body),
                requires_verification: true,
            },
        })
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        let url = self.url("/auth/v1/logout");
        let span = info_span!("hosted.sign_out", http.method = "POST", url = %url);
        let request = self.as_user(self.client.post(&url), access_token);

        http::send(PROVIDER, request, span).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn verify(&self, access_token: &SecretString) -> Result<Value, BackendError> {
        let url = self.url("/auth/v1/user");
        let span = info_span!("hosted.user", http.method = "GET", url = %url);
        let request = self.as_user(self.client.get(&url), access_token);

        http::send(PROVIDER, request, span)
            .await?
            .ok_or_else(|| unexpected("empty user response"))
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn reset_password(&self, email: &str) -> Result<(), BackendError> {
        let url = self.url("/auth/v1/recover");
        let span = info_span!("hosted.recover", http.method = "POST", url = %url);
        let request = self
            .anonymous(self.client.post(&url))
            .json(&json!({ "email": email }));

        http::send(PROVIDER, request, span).await?;
        Ok(())
    }
}

/// A user counts as verified once the provider recorded a confirmation time.
pub(crate) fn email_confirmed(user: &Value) -> bool {
    ["email_confirmed_at", "confirmed_at"]
        .iter()
        .any(|field| user.get(field).is_some_and(|value| !value.is_null()))
}

fn string_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn unexpected(message: &str) -> BackendError {
    BackendError::UnexpectedResponse {
        provider: PROVIDER.to_string(),
        message: message.to_string(),
    }
}
