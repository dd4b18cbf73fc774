//! Route guard. Wraps any [`Page`] and decides, from the current
//! [`SessionState`], whether to render it, wait for the session to load, or
//! send the visitor to the login route with the original path attached.
//!
//! This is a UX guard only; the backends still enforce access.

use crate::auth::types::{Session, SessionState};
use tokio::sync::watch;
use tracing::debug;
use url::form_urlencoded;

pub mod paths {
    pub const HOME: &str = "/";
    pub const LOGIN: &str = "/login";
    pub const SIGNUP: &str = "/signup";
    pub const VERIFY_EMAIL: &str = "/verify-email";
}

/// Query parameter carrying the path to return to after login.
pub const REDIRECT_PARAM: &str = "redirect";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// Session still loading; render nothing that depends on auth state.
    Pending,
    Granted,
    Redirect(String),
}

/// Anything the guard can wrap.
pub trait Page {
    type Output;

    fn render(&self, session: &Session) -> Self::Output;
}

impl<F, O> Page for F
where
    F: Fn(&Session) -> O,
{
    type Output = O;

    fn render(&self, session: &Session) -> O {
        self(session)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guarded<T> {
    Pending,
    Render(T),
    Redirect(String),
}

#[derive(Clone, Debug)]
pub struct RouteGuard {
    login_route: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(paths::LOGIN)
    }
}

impl RouteGuard {
    #[must_use]
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
        }
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Decides access to `path` for a protected route.
    #[must_use]
    pub fn check(&self, path: &str, state: &SessionState) -> Access {
        if state.is_loading {
            return Access::Pending;
        }
        if state.session.logged_in {
            return Access::Granted;
        }

        let target = self.login_redirect(path);
        debug!(path, target = %target, "redirecting unauthenticated visitor");
        Access::Redirect(target)
    }

    /// Decides access to the login and signup pages: signed-in visitors are
    /// sent on to where they were going.
    #[must_use]
    pub fn check_guest(&self, query: Option<&str>, state: &SessionState) -> Access {
        if state.is_loading {
            Access::Pending
        } else if state.session.logged_in {
            Access::Redirect(post_login_destination(query))
        } else {
            Access::Granted
        }
    }

    /// Login URL that brings the visitor back to `path` afterwards.
    #[must_use]
    pub fn login_redirect(&self, path: &str) -> String {
        if !is_local_path(path) || path == self.login_route || path == paths::HOME {
            return self.login_route.clone();
        }

        let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
        format!("{}?{REDIRECT_PARAM}={encoded}", self.login_route)
    }

    /// Waits until the session has finished loading, then decides.
    pub async fn wait_until_ready(
        &self,
        path: &str,
        session: &mut watch::Receiver<SessionState>,
    ) -> Access {
        let ready = session
            .wait_for(|state| !state.is_loading)
            .await
            .map(|state| state.clone());

        let state = match ready {
            Ok(state) => state,
            Err(_) => session.borrow().clone(),
        };

        self.check(path, &state)
    }

    #[must_use]
    pub fn protect<P: Page>(&self, page: P) -> Protected<P> {
        Protected {
            guard: self.clone(),
            page,
        }
    }
}

/// A page that only renders for signed-in visitors.
#[derive(Clone, Debug)]
pub struct Protected<P> {
    guard: RouteGuard,
    page: P,
}

impl<P: Page> Protected<P> {
    pub fn view(&self, path: &str, state: &SessionState) -> Guarded<P::Output> {
        match self.guard.check(path, state) {
            Access::Pending => Guarded::Pending,
            Access::Granted => Guarded::Render(self.page.render(&state.session)),
            Access::Redirect(target) => Guarded::Redirect(target),
        }
    }

    /// Renders once the session has loaded, reacting to the next state change
    /// when it is still loading.
    pub async fn view_when_ready(
        &self,
        path: &str,
        session: &mut watch::Receiver<SessionState>,
    ) -> Guarded<P::Output> {
        match self.guard.wait_until_ready(path, session).await {
            Access::Pending => Guarded::Pending,
            Access::Granted => {
                let state = session.borrow().clone();
                Guarded::Render(self.page.render(&state.session))
            }
            Access::Redirect(target) => Guarded::Redirect(target),
        }
    }
}

/// Where to go after a successful login, read from the login URL's query.
/// Only local absolute paths are honoured; anything else goes home.
#[must_use]
pub fn post_login_destination(query: Option<&str>) -> String {
    query
        .map(|query| query.trim_start_matches('?'))
        .and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == REDIRECT_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| paths::HOME.to_string())
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn signed_in() -> SessionState {
        SessionState::ready(Session::restored(
            "student@utdallas.edu".to_string(),
            SecretString::from("abc".to_string()),
        ))
    }

    fn signed_out() -> SessionState {
        SessionState::ready(Session::default())
    }

    #[test]
    fn loading_session_is_pending() {
        let guard = RouteGuard::default();
        assert_eq!(guard.check("/events", &SessionState::loading()), Access::Pending);
        assert_eq!(
            guard.check_guest(None, &SessionState::loading()),
            Access::Pending
        );
    }

    #[test]
    fn signed_out_visitor_is_redirected_with_origin() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check("/events/42", &signed_out()),
            Access::Redirect("/login?redirect=%2Fevents%2F42".to_string())
        );
        assert_eq!(
            guard.check("/", &signed_out()),
            Access::Redirect("/login".to_string())
        );
    }

    #[test]
    fn signed_in_visitor_is_granted() {
        let guard = RouteGuard::default();
        assert_eq!(guard.check("/profile", &signed_in()), Access::Granted);
    }

    #[test]
    fn redirect_round_trips_to_destination() {
        let guard = RouteGuard::default();
        let Access::Redirect(target) = guard.check("/events?tab=mine", &signed_out()) else {
            panic!("expected redirect");
        };
        let query = target.split_once('?').map(|(_, query)| query);
        assert_eq!(post_login_destination(query), "/events?tab=mine");
    }

    #[test]
    fn destination_rejects_external_targets() {
        assert_eq!(post_login_destination(None), "/");
        assert_eq!(post_login_destination(Some("redirect=https://evil.example")), "/");
        assert_eq!(post_login_destination(Some("?redirect=%2F%2Fevil.example")), "/");
        assert_eq!(post_login_destination(Some("redirect=%2Fprofile")), "/profile");
    }

    #[test]
    fn guest_pages_send_signed_in_visitors_on() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check_guest(Some("redirect=%2Fprofile"), &signed_in()),
            Access::Redirect("/profile".to_string())
        );
        assert_eq!(guard.check_guest(None, &signed_out()), Access::Granted);
    }

    #[test]
    fn protected_page_renders_with_session() {
        let guard = RouteGuard::default();
        let page = guard.protect(|session: &Session| format!("hello {}", session.email));

        assert_eq!(
            page.view("/profile", &signed_in()),
            Guarded::Render("hello student@utdallas.edu".to_string())
        );
        assert_eq!(
            page.view("/profile", &signed_out()),
            Guarded::Redirect("/login?redirect=%2Fprofile".to_string())
        );
        assert_eq!(
            page.view("/profile", &SessionState::loading()),
            Guarded::Pending
        );
    }

    #[tokio::test]
    async fn waits_for_loading_to_finish() {
        let (tx, mut rx) = watch::channel(SessionState::loading());
        let guard = RouteGuard::default();

        let handle = tokio::spawn(async move {
            guard.wait_until_ready("/events", &mut rx).await
        });

        tx.send_replace(signed_out());

        let access = handle.await.ok();
        assert_eq!(
            access,
            Some(Access::Redirect("/login?redirect=%2Fevents".to_string()))
        );
    }
}
