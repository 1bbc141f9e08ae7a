//! Route guard for the admin views.
//!
//! A protected view renders only for an authenticated session whose user's
//! first role is on the allow-list. Anything else is sent to the login view.
//! The guard never clears a session itself; a rejected token is only dropped
//! when the server answers 401.

use crate::session::{Session, SessionStore, User};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Role ids allowed into the admin console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAllowList(BTreeSet<u64>);

impl RoleAllowList {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, role_id: u64) -> bool {
        self.0.contains(&role_id)
    }

    /// Whether the user's first listed role is allowed
    pub fn permits(&self, user: &User) -> bool {
        user.primary_role()
            .is_some_and(|role| self.contains(role.id))
    }
}

impl Default for RoleAllowList {
    fn default() -> Self {
        Self::new([1, 2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Users,
    Products,
    Privacy,
    Blogs,
    Videos,
    Titles,
    SocialLinks,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Users => "/users",
            Route::Products => "/products",
            Route::Privacy => "/privacy",
            Route::Blogs => "/blogs",
            Route::Videos => "/videos",
            Route::Titles => "/titles",
            Route::SocialLinks => "/social-links",
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a navigation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Render(Route),
    /// Go to `to`; `replace` means the history entry is replaced, so going
    /// back does not return to the refused view
    Redirect { to: Route, replace: bool },
}

const TO_LOGIN: Decision = Decision::Redirect {
    to: Route::Login,
    replace: true,
};

/// Decide whether `route` may render for `session`
pub fn decide(session: &Session, allowed: &RoleAllowList, route: Route) -> Decision {
    if !route.is_protected() {
        return Decision::Render(route);
    }
    if !session.is_authenticated() {
        return TO_LOGIN;
    }
    match session.current_user() {
        Some(user) if allowed.permits(user) => Decision::Render(route),
        _ => TO_LOGIN,
    }
}

pub struct RouteGuard {
    session: Rc<SessionStore>,
    allowed: RoleAllowList,
}

impl RouteGuard {
    pub fn new(session: Rc<SessionStore>, allowed: RoleAllowList) -> Self {
        Self { session, allowed }
    }

    pub fn allowed(&self) -> &RoleAllowList {
        &self.allowed
    }

    pub fn check(&self, route: Route) -> Decision {
        let decision = decide(&self.session.snapshot(), &self.allowed, route);
        if let Decision::Redirect { to, .. } = decision {
            tracing::debug!(from = %route, to = %to, "navigation redirected");
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_user;
    use crate::storage::MemoryStorage;

    fn guard() -> RouteGuard {
        let store = Rc::new(SessionStore::open(Box::new(MemoryStorage::new())));
        RouteGuard::new(store, RoleAllowList::default())
    }

    #[test]
    fn test_empty_session_redirects_to_login() {
        let guard = guard();
        assert_eq!(
            guard.check(Route::Users),
            Decision::Redirect {
                to: Route::Login,
                replace: true
            }
        );
    }

    #[test]
    fn test_role_outside_allow_list_redirects() {
        let guard = guard();
        guard.session.login("abc", test_user(3)).unwrap();
        assert_eq!(guard.check(Route::Products), TO_LOGIN);

        // The guard leaves the session in place
        assert!(guard.session.is_authenticated());
    }

    #[test]
    fn test_admin_role_renders() {
        let guard = guard();
        guard.session.login("abc", test_user(1)).unwrap();
        assert_eq!(guard.check(Route::Products), Decision::Render(Route::Products));
        assert_eq!(guard.check(Route::Dashboard), Decision::Render(Route::Dashboard));
    }

    #[test]
    fn test_only_first_role_counts() {
        let mut user = test_user(3);
        user.roles.push(crate::session::Role {
            id: 1,
            name: "admin".to_string(),
        });
        let session = Session {
            token: Some("abc".to_string()),
            current_user: Some(user),
            is_authenticated: true,
        };
        assert_eq!(decide(&session, &RoleAllowList::default(), Route::Users), TO_LOGIN);
    }

    #[test]
    fn test_authenticated_without_user_redirects() {
        let session = Session {
            token: Some("abc".to_string()),
            current_user: None,
            is_authenticated: true,
        };
        assert_eq!(decide(&session, &RoleAllowList::default(), Route::Blogs), TO_LOGIN);

        let mut no_roles = test_user(1);
        no_roles.roles.clear();
        let session = Session {
            current_user: Some(no_roles),
            ..session
        };
        assert_eq!(decide(&session, &RoleAllowList::default(), Route::Blogs), TO_LOGIN);
    }

    #[test]
    fn test_login_view_is_public() {
        let guard = guard();
        assert_eq!(guard.check(Route::Login), Decision::Render(Route::Login));
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Dashboard.to_string(), "/");
        assert_eq!(Route::SocialLinks.path(), "/social-links");
        assert!(!Route::Login.is_protected());
        assert!(Route::Videos.is_protected());
    }

    #[test]
    fn test_custom_allow_list() {
        let allowed = RoleAllowList::new([5]);
        assert!(allowed.permits(&test_user(5)));
        assert!(!allowed.permits(&test_user(1)));
        assert!(allowed.contains(5));
    }
}
