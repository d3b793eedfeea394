//! Navigation access control.

use crate::navigation::{HOME_PATH, LoginRedirect, is_login_location};
use crate::routes::RouteMeta;
use crate::store::SessionState;

/// Notice shown when a non-admin is turned away from the back office.
pub const ADMIN_ONLY_NOTICE: &str = "You do not have access to the back office.";

/// What navigation should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// A guard decision and the notice to show with it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub decision: GuardDecision,
    pub notice: Option<&'static str>,
}

impl GuardOutcome {
    const fn proceed() -> Self {
        Self {
            decision: GuardDecision::Proceed,
            notice: None,
        }
    }

    fn redirect(to: impl Into<String>) -> Self {
        Self {
            decision: GuardDecision::Redirect(to.into()),
            notice: None,
        }
    }

    #[must_use]
    pub const fn is_proceed(&self) -> bool {
        matches!(self.decision, GuardDecision::Proceed)
    }
}

/// Decides whether a navigation may happen.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard;

impl RouteGuard {
    /// Evaluate navigation to `location`, declared with `meta`, for `session`.
    ///
    /// - anonymous user on a session-only route: login, returning to `location`
    /// - non-admin on an admin route: home, with [`ADMIN_ONLY_NOTICE`]
    /// - logged-in user on the login page: home
    /// - anything else proceeds
    #[must_use]
    pub fn evaluate(location: &str, meta: &RouteMeta, session: &SessionState) -> GuardOutcome {
        if is_login_location(location) && session.logged_in {
            return GuardOutcome::redirect(HOME_PATH);
        }

        if meta.needs_session() && !session.logged_in {
            return GuardOutcome::redirect(LoginRedirect::returning_to(location).location());
        }

        if meta.requires_admin && !session.is_admin() {
            return GuardOutcome {
                decision: GuardDecision::Redirect(HOME_PATH.to_string()),
                notice: Some(ADMIN_ONLY_NOTICE),
            };
        }

        GuardOutcome::proceed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cablestore_core::UserProfile;

    use super::*;

    fn session(logged_in: bool, admin: bool) -> SessionState {
        let user: UserProfile = serde_json::from_value(serde_json::json!({
            "id": 1,
            "email": "buyer@acme.test",
            "role": if admin { "admin" } else { "user" },
        }))
        .unwrap();
        SessionState {
            user: logged_in.then_some(user),
            logged_in,
        }
    }

    #[test]
    fn test_anonymous_on_protected_route_goes_to_login() {
        let outcome = RouteGuard::evaluate("/checkout", &RouteMeta::AUTHENTICATED, &session(false, false));
        assert_eq!(
            outcome.decision,
            GuardDecision::Redirect("/login?redirect=%2Fcheckout".to_string())
        );
        assert!(outcome.notice.is_none());
    }

    #[test]
    fn test_anonymous_on_admin_route_goes_to_login() {
        let outcome = RouteGuard::evaluate("/admin/users", &RouteMeta::ADMIN, &session(false, false));
        assert_eq!(
            outcome.decision,
            GuardDecision::Redirect("/login?redirect=%2Fadmin%2Fusers".to_string())
        );
    }

    #[test]
    fn test_non_admin_on_admin_route_goes_home_never_login() {
        let outcome = RouteGuard::evaluate("/admin/dashboard", &RouteMeta::ADMIN, &session(true, false));
        assert_eq!(outcome.decision, GuardDecision::Redirect("/".to_string()));
        assert_eq!(outcome.notice, Some(ADMIN_ONLY_NOTICE));
    }

    #[test]
    fn test_admin_only_without_auth_flag_still_needs_session() {
        let meta = RouteMeta {
            requires_admin: true,
            ..RouteMeta::PUBLIC
        };
        let outcome = RouteGuard::evaluate("/admin/costs", &meta, &session(false, false));
        assert!(matches!(outcome.decision, GuardDecision::Redirect(ref to) if to.starts_with("/login")));
    }

    #[test]
    fn test_login_while_authenticated_goes_home() {
        let outcome = RouteGuard::evaluate(
            "/login?redirect=%2Fcheckout",
            &RouteMeta::PUBLIC,
            &session(true, false),
        );
        assert_eq!(outcome.decision, GuardDecision::Redirect("/".to_string()));
    }

    #[test]
    fn test_proceed_cases() {
        assert!(RouteGuard::evaluate("/products", &RouteMeta::PUBLIC, &session(false, false)).is_proceed());
        assert!(RouteGuard::evaluate("/login", &RouteMeta::PUBLIC, &session(false, false)).is_proceed());
        assert!(RouteGuard::evaluate("/checkout", &RouteMeta::AUTHENTICATED, &session(true, false)).is_proceed());
        assert!(RouteGuard::evaluate("/admin/orders", &RouteMeta::ADMIN, &session(true, true)).is_proceed());
    }
}
