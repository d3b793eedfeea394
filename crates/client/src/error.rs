//! Unified error handling with Sentry breadcrumbs.
//!
//! Every manager operation returns `Result<T, ClientError>`. The variants map
//! onto four failure classes ([`ErrorKind`]) that decide what the caller does:
//! force a login, retry later, show the server's message, or fix local state.

use cablestore_core::{CartItemId, UserProfile};
use thiserror::Error;

use crate::navigation::LoginRedirect;

/// Failure to get any response for a single attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The attempt exceeded the configured request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not connect to the backend.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other failure before a response arrived.
    #[error("network error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Persistent credential storage failed.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure class of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401: the session is over; never retried.
    AuthExpired,
    /// Network failure or 5xx after retries ran out.
    Transient,
    /// Any other 4xx; never retried.
    ClientRejected,
    /// Rejected locally before any network call.
    LocalPrecondition,
    /// Local fault (bad payload, storage error).
    Internal,
}

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered 401 and the session was torn down.
    #[error("Session expired")]
    SessionExpired {
        /// Where to send the user; `None` when already on the login page.
        redirect: Option<LoginRedirect>,
    },

    /// Network failure or server error that survived every retry.
    #[error("Service unavailable after {attempts} attempt(s): {message}")]
    Transient {
        status: Option<u16>,
        attempts: u32,
        message: String,
        detail: Option<String>,
    },

    /// The backend rejected the request (4xx other than 401).
    #[error("Request rejected ({status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    /// The operation needs a logged-in session.
    #[error("Login required")]
    LoginRequired { redirect: Option<LoginRedirect> },

    /// The cart has no line with this ID.
    #[error("Cart item not found: {0}")]
    ItemNotInCart(CartItemId),

    /// Response body did not match the expected shape.
    #[error("Invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Credential store failed.
    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),
}

/// Shown for a 403 without a server-provided detail.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Permission denied: you are not allowed to perform this action.";
/// Shown when an anonymous user attempts a session-only action.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to your business account first.";
/// Shown after a forced logout.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

impl ClientError {
    /// Failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionExpired { .. } => ErrorKind::AuthExpired,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Rejected { .. } => ErrorKind::ClientRejected,
            Self::LoginRequired { .. } | Self::ItemNotInCart(_) => ErrorKind::LocalPrecondition,
            Self::Decode(_) | Self::InvalidUrl(_) | Self::Credentials(_) => ErrorKind::Internal,
        }
    }

    /// Server-provided `detail` text, if the backend sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } | Self::Transient { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the final response, if one arrived.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { .. } => Some(401),
            Self::Rejected { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            _ => None,
        }
    }

    /// Navigation this error asks the top-level controller to perform.
    #[must_use]
    pub const fn redirect(&self) -> Option<&LoginRedirect> {
        match self {
            Self::SessionExpired { redirect } | Self::LoginRequired { redirect } => {
                redirect.as_ref()
            }
            _ => None,
        }
    }

    /// Text to show the user.
    ///
    /// The server's `detail` verbatim when present, otherwise a message for
    /// the failure class, otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        match self {
            Self::SessionExpired { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::LoginRequired { .. } => LOGIN_REQUIRED_MESSAGE.to_string(),
            Self::Rejected { status: 403, .. } => PERMISSION_DENIED_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Set the Sentry user context from a profile.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user: &UserProfile) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
