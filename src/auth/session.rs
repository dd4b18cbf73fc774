//! Session store. Holds the current `SessionState` behind a watch channel so
//! guards and views can subscribe to changes, and mirrors the token and email
//! into the persistent key-value store.
//!
//! Mutations are crate-private: only the authenticator writes the session.
//! Whenever `is_loading` is false, the persisted pair and the in-memory session
//! agree.

use crate::auth::{
    errors::StorageError,
    store::{ACCESS_TOKEN_KEY, KeyValueStore, USER_EMAIL_KEY},
    types::{Session, SessionState},
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates an empty session in the loading state. Call [`Self::restore`]
    /// to finish loading.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self { store, state }
    }

    /// Loads the persisted token and email. A session is restored only when
    /// both keys are present; a lone key is removed, and so is storage that
    /// does not parse. Loading ends even when storage fails, leaving the empty
    /// session.
    ///
    /// # Errors
    /// Returns a `StorageError` when the store cannot be read.
    pub fn restore(&self) -> Result<SessionState, StorageError> {
        let result = match self.read_persisted() {
            Err(StorageError::Json(err)) => {
                warn!("session storage unreadable, starting signed out: {err}");
                Ok(None)
            }
            other => other,
        };

        let session = match &result {
            Ok(Some((email, token))) => Session::restored(email.clone(), token.clone()),
            Ok(None) => {
                // Half a pair never authenticates anyone.
                if let Err(err) = self.remove_persisted() {
                    warn!("failed to remove partial session: {err}");
                }
                Session::default()
            }
            Err(err) => {
                warn!("failed to restore session: {err}");
                Session::default()
            }
        };

        debug!(logged_in = session.logged_in, "session restored");

        let state = SessionState::ready(session);
        self.state.send_replace(state.clone());

        result.map(|_| state)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Persists then publishes a logged-in session. If persisting fails the
    /// session is cleared instead, so memory and storage never disagree.
    pub(crate) fn establish(&self, session: Session) -> Result<Session, StorageError> {
        if let Err(err) = self.write_persisted(&session) {
            self.clear_quietly();
            return Err(err);
        }

        self.state.send_replace(SessionState::ready(session.clone()));
        Ok(session)
    }

    /// Records the provider that accepted the token and replaces the opaque
    /// user record and verification flag, without touching the persisted pair.
    pub(crate) fn refresh(
        &self,
        provider: &str,
        email_verified: bool,
        user: Option<serde_json::Value>,
    ) -> Session {
        self.state.send_modify(|state| {
            state.session.provider = Some(provider.to_string());
            state.session.email_verified = email_verified;
            if user.is_some() {
                state.session.user = user;
            }
        });
        self.state.borrow().session.clone()
    }

    /// Removes the persisted pair and publishes the empty session. The
    /// in-memory state is reset even when storage fails.
    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        let result = self.remove_persisted();
        self.state.send_replace(SessionState::ready(Session::default()));
        result
    }

    pub(crate) fn clear_quietly(&self) {
        if let Err(err) = self.clear() {
            warn!("failed to clear persisted session: {err}");
        }
    }

    fn read_persisted(&self) -> Result<Option<(String, SecretString)>, StorageError> {
        let token = self.store.get(ACCESS_TOKEN_KEY)?;
        let email = self.store.get(USER_EMAIL_KEY)?;

        Ok(match (email, token) {
            (Some(email), Some(token)) if !email.is_empty() && !token.is_empty() => {
                Some((email, SecretString::from(token)))
            }
            _ => None,
        })
    }

    fn write_persisted(&self, session: &Session) -> Result<(), StorageError> {
        let token = session.access_token().unwrap_or_default();
        self.store.set(ACCESS_TOKEN_KEY, token)?;
        self.store.set(USER_EMAIL_KEY, &session.email)
    }

    fn remove_persisted(&self) -> Result<(), StorageError> {
        let token = self.store.remove(ACCESS_TOKEN_KEY);
        let email = self.store.remove(USER_EMAIL_KEY);
        token.and(email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        store::{FileStore, MemoryStore},
        types::Grant,
    };

    fn manager() -> (Arc<MemoryStore>, SessionManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone());
        (store, manager)
    }

    fn session(email: &str, token: &str) -> Session {
        Session::from_grant(
            "api",
            email,
            Grant {
                access_token: SecretString::from(token.to_string()),
                email_verified: true,
                user: None,
            },
        )
    }

    #[test]
    fn starts_loading_and_empty() {
        let (_, manager) = manager();
        let state = manager.snapshot();
        assert!(state.is_loading);
        assert!(state.session.is_empty());
    }

    #[test]
    fn restore_with_both_keys_logs_in() {
        let (store, manager) = manager();
        store.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        store.set(USER_EMAIL_KEY, "student@utdallas.edu").unwrap();

        let state = manager.restore().unwrap();
        assert!(!state.is_loading);
        assert!(state.session.logged_in);
        assert_eq!(state.session.email, "student@utdallas.edu");
        assert_eq!(state.session.access_token(), Some("abc"));
    }

    #[test]
    fn restore_with_partial_pair_clears_it() {
        let (store, manager) = manager();
        store.set(USER_EMAIL_KEY, "student@utdallas.edu").unwrap();

        let state = manager.restore().unwrap();
        assert!(!state.is_loading);
        assert!(state.session.is_empty());
        assert_eq!(store.get(USER_EMAIL_KEY).unwrap(), None);
    }

    #[test]
    fn restore_discards_corrupt_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let manager = SessionManager::new(Arc::new(FileStore::new(&path)));
        let state = manager.restore().unwrap();

        assert!(!state.is_loading);
        assert!(state.session.is_empty());
        assert!(!path.exists());

        manager
            .establish(session("student@utdallas.edu", "abc"))
            .unwrap();
        manager.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn establish_and_clear_over_corrupt_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = Arc::new(FileStore::new(&path));
        let manager = SessionManager::new(store.clone());

        manager
            .establish(session("student@utdallas.edu", "abc"))
            .unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), Some("abc".to_string()));

        std::fs::write(&path, "{not json").unwrap();
        manager.clear().unwrap();
        assert!(!path.exists());
        assert!(manager.snapshot().session.is_empty());
    }

    #[test]
    fn establish_persists_and_publishes() {
        let (store, manager) = manager();
        let mut rx = manager.subscribe();

        manager
            .establish(session("student@utdallas.edu", "abc"))
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.is_authenticated());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), Some("abc".to_string()));
        assert_eq!(
            store.get(USER_EMAIL_KEY).unwrap(),
            Some("student@utdallas.edu".to_string())
        );
    }

    #[test]
    fn clear_removes_both_keys() {
        let (store, manager) = manager();
        manager
            .establish(session("student@utdallas.edu", "abc"))
            .unwrap();

        manager.clear().unwrap();

        assert!(manager.snapshot().session.is_empty());
        assert!(!manager.snapshot().is_loading);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_EMAIL_KEY).unwrap(), None);
    }

    #[test]
    fn refresh_keeps_token_and_updates_user() {
        let (_, manager) = manager();
        manager
            .establish(session("student@utdallas.edu", "abc"))
            .unwrap();

        let refreshed = manager.refresh("hosted", false, Some(serde_json::json!({"id": "u1"})));
        assert_eq!(refreshed.access_token(), Some("abc"));
        assert_eq!(refreshed.provider.as_deref(), Some("hosted"));
        assert!(!refreshed.email_verified);
        assert_eq!(refreshed.user, Some(serde_json::json!({"id": "u1"})));
    }
}
