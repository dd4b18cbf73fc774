//! Client for the Impulse API service, the primary backend.
//!
//! Endpoints: `POST /auth/login`, `POST /auth/register`, `GET /auth/verify`
//! (bearer). The service keeps no server-side session, so sign-out is local.

use crate::auth::{
    errors::BackendError,
    http,
    provider::AuthProvider,
    types::{Credentials, Grant, SignupMetadata, SignupOutcome},
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info_span, instrument};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

const PROVIDER: &str = "api";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_map")]
    metadata: &'a Map<String, Value>,
}

fn is_empty_map(map: &&Map<String, Value>) -> bool {
    map.is_empty()
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(alias = "token")]
    access_token: Option<String>,
    user: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct ApiBackend {
    client: Client,
    base_url: String,
}

impl ApiBackend {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        http::build_url(&self.base_url, path)
    }
}

#[async_trait]
impl AuthProvider for ApiBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Grant, BackendError> {
        let url = self.url("/auth/login");
        let span = info_span!("api.login", http.method = "POST", url = %url);
        let request = self.client.post(&url).json(&LoginRequest {
            email: &credentials.email,
            password: credentials.password.expose_secret(),
        });

        let body = http::send(PROVIDER, request, span).await?;
        let response: TokenResponse = decode(body)?;

        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| unexpected("no access_token in login response"))?;

        Ok(Grant {
            access_token: SecretString::from(access_token),
            email_verified: email_verified(response.user.as_ref()),
            user: response.user,
        })
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: &SignupMetadata,
    ) -> Result<SignupOutcome, BackendError> {
        let url = self.url("/auth/register");
        let span = info_span!("api.register", http.method = "POST", url = %url);
        let request = self.client.post(&url).json(&RegisterRequest {
            email: &credentials.email,
            password: credentials.password.expose_secret(),
            name: metadata.display_name.as_deref(),
            metadata: &metadata.extra,
        });

        let response: TokenResponse = match http::send(PROVIDER, request, span).await? {
            Some(body) => decode(Some(body))?,
            None => TokenResponse {
                access_token: None,
                user: None,
            },
        };

        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from);

        Ok(SignupOutcome {
            provider: PROVIDER.to_string(),
            requires_verification: access_token.is_none(),
            access_token,
            user: response.user,
        })
    }

    #[instrument(skip_all, fields(provider = PROVIDER))]
    async fn verify(&self, access_token: &SecretString) -> Result<Value, BackendError> {
        let url = self.url("/auth/verify");
        let span = info_span!("api.verify", http.method = "GET", url = %url);
        let request = self.client.get(&url).bearer_auth(access_token.expose_secret());

        let body = http::send(PROVIDER, request, span)
            .await?
            .ok_or_else(|| unexpected("empty verify response"))?;

        // Either `{"user": {...}}` or the bare user object.
        if let Some(user) = body.get("user").filter(|user| user.is_object()) {
            return Ok(user.clone());
        }
        Ok(body)
    }
}

/// Missing flag means the service only hands out tokens to verified accounts.
fn email_verified(user: Option<&Value>) -> bool {
    user.and_then(|user| {
        user.get("email_verified")
            .or_else(|| user.get("emailVerified"))
            .and_then(Value::as_bool)
    })
    .unwrap_or(true)
}

fn decode(body: Option<Value>) -> Result<TokenResponse, BackendError> {
    let body = body.ok_or_else(|| unexpected("empty response body"))?;
    serde_json::from_value(body).map_err(|err| unexpected(&err.to_string()))
}

fn unexpected(message: &str) -> BackendError {
    BackendError::UnexpectedResponse {
        provider: PROVIDER.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn backend(server: &MockServer) -> ApiBackend {
        let client = http::client("impulse-test/0.1", http::DEFAULT_TIMEOUT).unwrap();
        ApiBackend::new(client, server.uri())
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "student@utdallas.edu".to_string(),
            password: SecretString::from("pw".to_string()),
        }
    }

    #[tokio::test]
    async fn sign_in_returns_token_and_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "student@utdallas.edu", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-1",
                "user": {"id": 7, "email": "student@utdallas.edu", "email_verified": false}
            })))
            .mount(&server)
            .await;

        let grant = backend(&server).sign_in(&credentials()).await?;
        assert_eq!(grant.access_token.expose_secret(), "tok-1");
        assert!(!grant.email_verified);
        assert_eq!(grant.user.unwrap()["id"], json!(7));
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_accepts_token_alias() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-2"})))
            .mount(&server)
            .await;

        let grant = backend(&server).sign_in(&credentials()).await?;
        assert_eq!(grant.access_token.expose_secret(), "tok-2");
        assert!(grant.email_verified);
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_not_found_is_unreachable() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        let err = backend(&server).sign_in(&credentials()).await.unwrap_err();
        assert!(err.is_unreachable());
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_unauthorized_is_rejected() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server).sign_in(&credentials()).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Rejected {
                provider: "api".to_string(),
                status: Some(401),
                message: "Invalid credentials".to_string(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_without_token_is_unexpected() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {}})))
            .mount(&server)
            .await;

        let err = backend(&server).sign_in(&credentials()).await.unwrap_err();
        assert!(matches!(err, BackendError::UnexpectedResponse { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_sends_name_and_reports_verification() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({
                "email": "student@utdallas.edu",
                "password": "pw",
                "name": "Temoc"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "Check your inbox",
                "user": {"id": 9}
            })))
            .mount(&server)
            .await;

        let outcome = backend(&server)
            .sign_up(&credentials(), &SignupMetadata::with_display_name("Temoc"))
            .await?;
        assert!(outcome.requires_verification);
        assert!(outcome.access_token.is_none());
        assert_eq!(outcome.provider, "api");
        Ok(())
    }

    #[tokio::test]
    async fn verify_sends_bearer_and_unwraps_user() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/verify"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 7, "email_verified": true}
            })))
            .mount(&server)
            .await;

        let user = backend(&server)
            .verify(&SecretString::from("tok-1".to_string()))
            .await?;
        assert_eq!(user, json!({"id": 7, "email_verified": true}));
        Ok(())
    }

    #[test]
    fn email_verified_defaults_to_true() {
        assert!(email_verified(None));
        assert!(email_verified(Some(&json!({"id": 1}))));
        assert!(!email_verified(Some(&json!({"emailVerified": false}))));
    }
}
