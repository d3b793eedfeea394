//! Current location tracking and login redirects.
//!
//! A forced logout does not navigate by itself. It returns a
//! [`LoginRedirect`] inside the error, and the top-level controller
//! ([`crate::Storefront::handle_error`]) performs the navigation.

use tokio::sync::watch;

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";
/// Path of the home page.
pub const HOME_PATH: &str = "/";
/// Query parameter carrying the return target on the login page.
pub const RETURN_PARAM: &str = "redirect";

/// Navigation to the login page that remembers where the user was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    return_to: Option<String>,
}

impl LoginRedirect {
    /// Redirect that returns to `path` after login.
    ///
    /// Home and the login page itself are not worth returning to.
    #[must_use]
    pub fn returning_to(path: &str) -> Self {
        let return_to = (!path.is_empty() && path != HOME_PATH && !is_login_location(path))
            .then(|| path.to_string());
        Self { return_to }
    }

    /// Path to return to after a successful login.
    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    /// Login location with the return target encoded, e.g.
    /// `/login?redirect=%2Fcheckout`.
    #[must_use]
    pub fn location(&self) -> String {
        self.return_to.as_ref().map_or_else(
            || LOGIN_PATH.to_string(),
            |path| format!("{LOGIN_PATH}?{RETURN_PARAM}={}", urlencoding::encode(path)),
        )
    }

    /// Read the return target back out of a login location.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let (path, query) = location.split_once('?').unwrap_or((location, ""));
        if path != LOGIN_PATH {
            return None;
        }
        let return_to = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == RETURN_PARAM)
            .and_then(|(_, value)| urlencoding::decode(value).ok())
            .map(std::borrow::Cow::into_owned);
        Some(Self { return_to })
    }
}

/// Whether `location` (path plus optional query) is the login page.
#[must_use]
pub fn is_login_location(location: &str) -> bool {
    location.split('?').next() == Some(LOGIN_PATH)
}

/// Tracks the current location of the storefront.
///
/// One instance per [`crate::Storefront`]; observers can subscribe to
/// location changes.
#[derive(Debug)]
pub struct Navigator {
    current: watch::Sender<String>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Create a navigator positioned at home.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(HOME_PATH.to_string());
        Self { current }
    }

    /// Current location.
    #[must_use]
    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    /// Record that navigation to `location` happened.
    pub fn set_current(&self, location: &str) {
        self.current.send_replace(location.to_string());
    }

    /// Subscribe to location changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    /// Redirect for a forced logout, or `None` if already on the login page.
    #[must_use]
    pub fn login_redirect(&self) -> Option<LoginRedirect> {
        let current = self.current.borrow();
        (!is_login_location(&current)).then(|| LoginRedirect::returning_to(&current))
    }
}
