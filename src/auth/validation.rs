//! Input checks that run before any backend is contacted.

use crate::auth::{errors::ValidationError, types::Credentials};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::LazyLock;

/// Institutional domain accepted when none is configured.
pub const DEFAULT_ALLOWED_DOMAIN: &str = "utdallas.edu";

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[must_use]
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Email domain allow-list applied before any backend is contacted.
#[derive(Clone, Debug)]
pub struct EmailPolicy {
    domain: String,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAIN)
    }
}

impl EmailPolicy {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        Self {
            domain: domain.trim().trim_start_matches('@').to_lowercase(),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the trimmed address when it is well formed and inside the
    /// allowed domain. The domain comparison ignores case.
    ///
    /// # Errors
    /// Returns `InvalidEmail` for malformed input and `EmailDomain` for
    /// addresses outside the allow-list.
    pub fn check_email(&self, email: &str) -> Result<String, ValidationError> {
        let email = email.trim();
        if !valid_email(email) {
            return Err(ValidationError::InvalidEmail);
        }

        let suffix = format!("@{}", self.domain);
        if email.to_lowercase().ends_with(&suffix) {
            Ok(email.to_string())
        } else {
            Err(ValidationError::EmailDomain(self.domain.clone()))
        }
    }

    /// Validates the pair and builds the transient credentials.
    ///
    /// # Errors
    /// Returns a `ValidationError` when the email is rejected or the password is empty.
    pub fn credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Credentials, ValidationError> {
        let email = self.check_email(email)?;
        if password.expose_secret().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }

        Ok(Credentials {
            email,
            password: password.clone(),
        })
    }
}

/// Signup forms ask for the password twice.
///
/// # Errors
/// Returns `PasswordMismatch` when the two entries differ.
pub fn validate_password_confirmation(
    password: &SecretString,
    confirmation: &SecretString,
) -> Result<(), ValidationError> {
    if password.expose_secret() == confirmation.expose_secret() {
        Ok(())
    } else {
        Err(ValidationError::PasswordMismatch)
    }
}
