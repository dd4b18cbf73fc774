//! HTTP helpers shared by the backend adapters. They apply one timeout policy,
//! classify transport failures as unreachable, and turn error bodies into short
//! user-facing messages. Callers pass tokens in; nothing here stores them.

use crate::auth::errors::BackendError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{Instrument, Span, debug};

/// Default request timeout applied to every backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;
/// JSON fields backends use to carry an error message, in lookup order.
const MESSAGE_FIELDS: [&str; 5] = ["message", "error_description", "msg", "error", "detail"];

/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn client(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// Joins a base URL and a path with exactly one slash between them.
#[must_use]
pub fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Sends the request inside `span` and returns the decoded JSON body, or
/// `None` for an empty success body.
pub(crate) async fn send(
    provider: &str,
    request: RequestBuilder,
    span: Span,
) -> Result<Option<Value>, BackendError> {
    let response = request
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(provider, &err))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| map_request_error(provider, &err))?;

    debug!(provider, status = status.as_u16(), "backend responded");

    if !status.is_success() {
        return Err(classify_status(provider, status, &body));
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&body)
        .map(Some)
        .map_err(|err| BackendError::UnexpectedResponse {
            provider: provider.to_string(),
            message: format!("failed to decode response: {err}"),
        })
}

/// A 404 means the endpoint is not deployed, which is an outage from the
/// caller's point of view. Every other failure status is a rejection.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> BackendError {
    if status == StatusCode::NOT_FOUND {
        BackendError::Unreachable {
            provider: provider.to_string(),
            message: format!("{status}"),
        }
    } else {
        BackendError::Rejected {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            message: error_message(body),
        }
    }
}

pub(crate) fn map_request_error(provider: &str, err: &reqwest::Error) -> BackendError {
    if err.is_decode() {
        return BackendError::UnexpectedResponse {
            provider: provider.to_string(),
            message: format!("failed to decode response: {err}"),
        };
    }

    let message = if err.is_timeout() {
        "Failed to fetch: request timed out".to_string()
    } else {
        format!("Failed to fetch: {err}")
    };

    BackendError::Unreachable {
        provider: provider.to_string(),
        message,
    }
}

/// Pulls the message out of a JSON error body, falling back to the trimmed
/// raw text.
pub(crate) fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        MESSAGE_FIELDS
            .iter()
            .find_map(|field| json.get(field).and_then(Value::as_str).map(str::to_string))
    });

    sanitize_body(from_json.as_deref().unwrap_or(body))
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_with_single_slash() {
        assert_eq!(
            build_url("http://localhost:8000/", "/auth/login"),
            "http://localhost:8000/auth/login"
        );
        assert_eq!(
            build_url("http://localhost:8000", "auth/login"),
            "http://localhost:8000/auth/login"
        );
        assert_eq!(build_url("  ", "/auth/login"), "/auth/login");
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(
            error_message(r#"{"message":"Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"detail":"nope"}"#), "nope");
    }

    #[test]
    fn error_message_sanitizes_raw_text() {
        assert_eq!(error_message("   "), "Request failed.");
        assert_eq!(error_message(" boom \n"), "boom");
        assert_eq!(error_message(&"x".repeat(500)).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn not_found_is_unreachable() {
        let err = classify_status("api", StatusCode::NOT_FOUND, "");
        assert!(err.is_unreachable());
        assert!(err.to_string().contains("404"));

        let err = classify_status("api", StatusCode::UNAUTHORIZED, r#"{"message":"bad"}"#);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "bad");
    }
}
