//! # Impulse auth
//!
//! Authentication state for the Impulse student events app: a session store
//! persisted in two local keys, an authenticator that tries the Impulse API
//! first and falls back to the hosted auth provider when the API cannot be
//! reached, and a route guard that sends signed-out visitors to the login page
//! and back again.
//!
//! ## Fallback
//!
//! Each backend classifies its failures as unreachable, rejected, unexpected
//! or unsupported. Only unreachable (and unsupported) failures move on to the
//! next backend; a rejection such as wrong credentials is returned to the
//! caller immediately. Any login failure leaves the session empty.
//!
//! ## Email domain
//!
//! Only institutional addresses (`@utdallas.edu` by default) are accepted, and
//! the check runs before any network call.

pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_user_agent() {
        assert!(APP_USER_AGENT.starts_with("impulse-auth/"));
    }
}
