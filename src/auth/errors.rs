//! Error types for the auth subsystem. Backends classify their own failures so
//! the authenticator can decide whether to fall back without inspecting
//! transport details.

use thiserror::Error;

/// Input problems caught before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email must be a valid address")]
    InvalidEmail,
    #[error("email must end with @{0}")]
    EmailDomain(String),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Failure reported by a single backend adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached (connection failure, timeout, missing endpoint).
    #[error("{provider} unreachable: {message}")]
    Unreachable {
        provider: String,
        message: String,
    },
    /// The backend answered and refused the request.
    #[error("{message}")]
    Rejected {
        provider: String,
        status: Option<u16>,
        message: String,
    },
    /// The backend answered with a payload we could not interpret.
    #[error("unexpected response from {provider}: {message}")]
    UnexpectedResponse {
        provider: String,
        message: String,
    },
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },
}

impl BackendError {
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Unreachable { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::UnexpectedResponse { provider, .. }
            | Self::Unsupported { provider, .. } => provider,
        }
    }

    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// HTTP status of a rejection, when the backend sent one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => *status,
            _ => None,
        }
    }
}

/// Failure reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session storage lock poisoned")]
    Poisoned,
}

/// Error surfaced by [`crate::auth::Authenticator`] operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no authentication provider is configured")]
    NoProvider,
    #[error("not logged in")]
    NotLoggedIn,
}

impl AuthError {
    /// True when every provider in the chain was unreachable.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_unreachable())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
