//! Provider seam. Each authentication backend implements [`AuthProvider`] and
//! reports failures as a classified [`BackendError`]; [`FallbackPolicy`]
//! decides whether the authenticator moves on to the next provider.

use crate::auth::{
    errors::BackendError,
    types::{Credentials, Grant, SignupMetadata, SignupOutcome},
};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Error text that historically meant "the backend is not there".
pub const DEFAULT_FALLBACK_MARKERS: [&str; 3] = ["404", "Failed to fetch", "Load failed"];

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Password sign-in.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Grant, BackendError>;

    /// Account creation. Some providers return a session right away, others
    /// only after the address is confirmed.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: &SignupMetadata,
    ) -> Result<SignupOutcome, BackendError>;

    /// Invalidates the provider-side session. Providers without server-side
    /// sessions keep the default no-op.
    async fn sign_out(&self, _access_token: &SecretString) -> Result<(), BackendError> {
        Ok(())
    }

    /// Returns the user record the token belongs to.
    async fn verify(&self, _access_token: &SecretString) -> Result<Value, BackendError> {
        Err(BackendError::Unsupported {
            provider: self.name().to_string(),
            operation: "token verification",
        })
    }

    async fn reset_password(&self, _email: &str) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            provider: self.name().to_string(),
            operation: "password reset",
        })
    }
}

/// When to advance from a failing provider to the next one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Only on errors classified as unreachable or unsupported.
    Classified,
    /// Only when the error text contains one of the markers.
    Markers(Vec<String>),
    /// Either of the above, with the default markers.
    #[default]
    Compat,
}

impl FallbackPolicy {
    #[must_use]
    pub fn markers() -> Self {
        Self::Markers(
            DEFAULT_FALLBACK_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        )
    }

    #[must_use]
    pub fn should_advance(&self, err: &BackendError) -> bool {
        match self {
            Self::Classified => classified(err),
            Self::Markers(markers) => contains_marker(err, markers.as_slice()),
            Self::Compat => {
                classified(err) || contains_marker(err, DEFAULT_FALLBACK_MARKERS.as_slice())
            }
        }
    }
}

fn classified(err: &BackendError) -> bool {
    matches!(
        err,
        BackendError::Unreachable { .. } | BackendError::Unsupported { .. }
    )
}

fn contains_marker<S: AsRef<str>>(err: &BackendError, markers: &[S]) -> bool {
    // Unexpected payloads are never treated as an outage.
    if matches!(err, BackendError::UnexpectedResponse { .. }) {
        return false;
    }
    let text = err.to_string();
    markers.iter().any(|marker| text.contains(marker.as_ref()))
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classified => write!(f, "classified"),
            Self::Markers(_) => write!(f, "markers"),
            Self::Compat => write!(f, "compat"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "classified" => Ok(Self::Classified),
            "markers" => Ok(Self::markers()),
            "compat" => Ok(Self::Compat),
            other => Err(format!(
                "invalid fallback policy '{other}', expected classified, markers or compat"
            )),
        }
    }
}
