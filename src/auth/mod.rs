//! Client-side authentication: session store, provider chain and route guard.
//!
//! Flow overview: a form submit (here, a CLI command) calls
//! [`Authenticator::login`] or [`Authenticator::signup`]. The authenticator
//! validates the email domain, tries the primary API service, and falls back
//! to the hosted provider when the primary is unreachable. A successful login
//! is written through [`SessionManager`], which persists the token and email
//! and notifies subscribers; [`RouteGuard`] reacts to the new state.
//!
//! Tokens and passwords are `SecretString`s end to end and must never be logged.

pub mod authenticator;
pub mod errors;
pub mod guard;
pub mod hosted;
pub mod http;
pub mod primary;
pub mod provider;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;

pub use self::authenticator::Authenticator;
pub use self::errors::{AuthError, AuthResult, BackendError, StorageError, ValidationError};
pub use self::guard::{Access, Guarded, Page, Protected, RouteGuard, post_login_destination};
pub use self::hosted::HostedBackend;
pub use self::primary::ApiBackend;
pub use self::provider::{AuthProvider, FallbackPolicy};
pub use self::session::SessionManager;
pub use self::store::{FileStore, KeyValueStore, MemoryStore};
pub use self::types::{Credentials, Grant, Session, SessionState, SignupMetadata, SignupOutcome};
pub use self::validation::{EmailPolicy, validate_password_confirmation};
