//! Session and credential types shared by the providers, the session store and
//! the guard. Tokens and passwords are held as `SecretString` so they never show
//! up in `Debug` output or logs.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

/// Authenticated client-side state.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub logged_in: bool,
    pub email_verified: bool,
    pub email: String,
    pub access_token: Option<SecretString>,
    /// Name of the provider that issued the token. Not persisted: a restored
    /// session learns it on the next successful verification.
    pub provider: Option<String>,
    /// Opaque user record as returned by whichever backend issued the token.
    pub user: Option<Value>,
}

impl Session {
    /// Builds the logged-in session for `email` from a provider grant. Every
    /// provider goes through here so both paths produce the same shape.
    #[must_use]
    pub fn from_grant(provider: &str, email: &str, grant: Grant) -> Self {
        Self {
            logged_in: true,
            email_verified: grant.email_verified,
            email: email.to_string(),
            access_token: Some(grant.access_token),
            provider: Some(provider.to_string()),
            user: grant.user,
        }
    }

    /// Session rebuilt from the two persisted keys.
    #[must_use]
    pub fn restored(email: String, access_token: SecretString) -> Self {
        Self {
            logged_in: true,
            email_verified: true,
            email,
            access_token: Some(access_token),
            provider: None,
            user: None,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(ExposeSecret::expose_secret)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.logged_in
            && !self.email_verified
            && self.email.is_empty()
            && self.access_token.is_none()
            && self.provider.is_none()
            && self.user.is_none()
    }
}

/// Session plus the loading flag consumers need before trusting it.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub is_loading: bool,
    pub session: Session,
}

impl SessionState {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            session: Session::default(),
        }
    }

    #[must_use]
    pub fn ready(session: Session) -> Self {
        Self {
            is_loading: false,
            session,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.is_loading && self.session.logged_in
    }
}

/// Validated login input. Built by [`crate::auth::validation::EmailPolicy`].
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Extra profile fields sent with a signup.
#[derive(Clone, Debug, Default)]
pub struct SignupMetadata {
    pub display_name: Option<String>,
    pub extra: Map<String, Value>,
}

impl SignupMetadata {
    #[must_use]
    pub fn with_display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            extra: Map::new(),
        }
    }

    /// Flattened JSON object: the extra fields plus `display_name` when set.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut data = self.extra.clone();
        if let Some(name) = &self.display_name {
            data.insert("display_name".to_string(), Value::String(name.clone()));
        }
        Value::Object(data)
    }
}

/// Successful sign-in as reported by a provider.
#[derive(Clone, Debug)]
pub struct Grant {
    pub access_token: SecretString,
    pub email_verified: bool,
    pub user: Option<Value>,
}

/// Raw signup result. No session is created from it; the caller decides
/// whether to prompt for email verification or continue.
#[derive(Clone, Debug)]
pub struct SignupOutcome {
    pub provider: String,
    pub access_token: Option<SecretString>,
    pub user: Option<Value>,
    pub requires_verification: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_grant_takes_input_email_and_token() {
        let grant = Grant {
            access_token: SecretString::from("abc".to_string()),
            email_verified: true,
            user: Some(json!({"id": "u1", "email": "STUDENT@utdallas.edu"})),
        };
        let session = Session::from_grant("hosted", "student@utdallas.edu", grant);

        assert!(session.logged_in);
        assert_eq!(session.provider.as_deref(), Some("hosted"));
        assert_eq!(session.email, "student@utdallas.edu");
        assert_eq!(session.access_token(), Some("abc"));
        assert!(session.user.is_some());
    }

    #[test]
    fn default_session_is_empty() {
        assert!(Session::default().is_empty());
        let restored = Session::restored(
            "a@utdallas.edu".to_string(),
            SecretString::from("t".to_string()),
        );
        assert!(!restored.is_empty());
    }

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::restored(
            "a@utdallas.edu".to_string(),
            SecretString::from("super-secret-token".to_string()),
        );
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn loading_state_is_not_authenticated() {
        let mut state = SessionState::loading();
        state.session.logged_in = true;
        assert!(!state.is_authenticated());
        state.is_loading = false;
        assert!(state.is_authenticated());
    }

    #[test]
    fn metadata_json_includes_display_name() {
        let mut metadata = SignupMetadata::with_display_name("Temoc");
        metadata
            .extra
            .insert("major".to_string(), Value::String("CS".to_string()));

        assert_eq!(
            metadata.to_json(),
            json!({"display_name": "Temoc", "major": "CS"})
        );
    }
}
