//! Login, logout, registration and session restore.

use std::sync::Arc;

use cablestore_core::{Role, UserProfile};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, ErrorKind, Result, add_breadcrumb, set_sentry_user};
use crate::http::{ApiClient, ApiRequest};
use crate::store::{SessionState, SharedState};

/// Response of `POST /auth/login`.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Body of `POST /users/`.
#[derive(Debug, Serialize)]
struct Registration<'a> {
    email: &'a str,
    password: &'a str,
    company_name: &'a str,
    username: &'a str,
    role: &'a str,
}

/// Owns the session lifecycle.
///
/// Every `SessionManager` handed out by a [`crate::Storefront`] shares one
/// [`SharedState`], so any number of them stay in sync.
#[derive(Debug, Clone)]
pub struct SessionManager {
    api: ApiClient,
    state: Arc<SharedState>,
}

impl SessionManager {
    #[must_use]
    pub const fn new(api: ApiClient, state: Arc<SharedState>) -> Self {
        Self { api, state }
    }

    /// Restore a persisted session.
    ///
    /// With a stored token the session is marked logged in from the cached
    /// profile right away, then the profile is refreshed from the server.
    /// Only a 401 ends the session; any other refresh failure keeps the
    /// optimistic state.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` if the server rejected the stored token, or a
    /// credential store error.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<SessionState> {
        let credentials = self.state.credentials();
        if credentials.token()?.is_none() {
            debug!("No stored session");
            return Ok(self.state.session());
        }

        let cached = credentials.user()?;
        if let Some(user) = &cached {
            set_sentry_user(user);
        }
        self.state.set_session(SessionState {
            user: cached,
            logged_in: true,
        });

        match self.refresh_profile().await {
            Ok(_) => Ok(self.state.session()),
            Err(e) if e.kind() == ErrorKind::AuthExpired => {
                info!("Stored session rejected by server");
                self.logout()?;
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Profile refresh failed, keeping cached session");
                Ok(self.state.session())
            }
        }
    }

    /// Fetch the authoritative profile and update the cache.
    ///
    /// # Errors
    ///
    /// Returns any API or credential store error.
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let user: UserProfile = self.api.fetch(&ApiRequest::get("/users/me")).await?;
        // A 401 elsewhere may have ended the session while this was in flight
        if !self.state.is_logged_in() {
            return Ok(user);
        }
        self.state.credentials().set_user(&user)?;
        set_sentry_user(&user);
        self.state.set_session(SessionState {
            user: Some(user.clone()),
            logged_in: true,
        });
        Ok(user)
    }

    /// Exchange credentials for a session.
    ///
    /// The token request is form-encoded. If it carries no profile, the
    /// profile is fetched with the new token. Nothing is persisted and the
    /// session stays as it was unless both steps succeed.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` for bad credentials, or any transport or credential
    /// store error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserProfile> {
        let request = ApiRequest::post("/auth/login")
            .form(&[("username", email), ("password", password.expose_secret())])
            .anonymous();
        let grant: TokenGrant = self.api.fetch(&request).await?;
        let token = SecretString::from(grant.access_token);

        let user = match grant.user {
            Some(user) => user,
            None => {
                self.api
                    .fetch(&ApiRequest::get("/users/me").bearer(token.clone()))
                    .await?
            }
        };

        let credentials = self.state.credentials();
        credentials.set_token(&token)?;
        credentials.set_user(&user)?;
        self.state.begin_session(SessionState {
            user: Some(user.clone()),
            logged_in: true,
        });

        set_sentry_user(&user);
        let user_id = user.id.to_string();
        add_breadcrumb("auth", "Logged in", Some(&[("user_id", user_id.as_str())]));
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns the registration error (e.g. `Rejected` for a taken email) or
    /// any error from the follow-up [`Self::login`].
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        company_name: &str,
    ) -> Result<UserProfile> {
        let body = Registration {
            email,
            password: password.expose_secret(),
            company_name,
            username: email.split('@').next().unwrap_or(email),
            role: Role::Customer.as_str(),
        };
        self.api
            .send(&ApiRequest::post("/users/").json(&body)?.anonymous())
            .await?;
        info!("Account registered");

        self.login(email, password).await
    }

    /// End the session locally. Safe to call when already logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.state.end_session()?;
        add_breadcrumb("auth", "Logged out", None);
        Ok(())
    }

    /// Tell the server to revoke the token, then log out locally.
    ///
    /// The revoke call is best effort and is not retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be cleared.
    pub async fn revoke_and_logout(&self) -> Result<()> {
        if self.state.credentials().token()?.is_some() {
            let revoke = ApiRequest::post("/auth/logout").without_retry();
            match self.api.send(&revoke).await {
                Ok(()) => debug!("Token revoked"),
                // A 401 already tore the session down
                Err(ClientError::SessionExpired { .. }) => {}
                Err(e) => debug!(error = %e, "Token revoke failed"),
            }
        }
        self.logout()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.session().user
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.session().is_admin()
    }

    /// Observe session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe_session()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::credentials::CredentialStore;
    use crate::http::{Method, RequestBody};
    use crate::testing::{Fixture, profile_json};

    fn password() -> SecretString {
        SecretString::from("hunter2")
    }

    #[tokio::test]
    async fn test_login_fetches_profile_when_missing() {
        let f = Fixture::new();
        f.transport
            .reply(200, json!({"access_token": "tok-1", "token_type": "bearer"}))
            .reply(200, profile_json(7, "buyer@acme.test", false));

        let session = f.shop.session();
        let user = session.login("buyer@acme.test", &password()).await.unwrap();

        assert_eq!(user.email, "buyer@acme.test");
        assert!(session.is_logged_in());
        assert_eq!(f.store.token().unwrap().unwrap().expose_secret(), "tok-1");
        assert_eq!(f.store.user().unwrap().unwrap().id, user.id);

        let sent = f.transport.recorded();
        assert_eq!(sent[0].path(), "/api/v1/auth/login");
        assert!(matches!(&sent[0].body, RequestBody::Form(fields)
            if fields.contains(&("username".to_string(), "buyer@acme.test".to_string()))));
        assert_eq!(sent[0].token, None);
        assert_eq!(sent[1].path(), "/api/v1/users/me");
        assert_eq!(sent[1].token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_login_uses_embedded_profile() {
        let f = Fixture::new();
        f.transport.reply(
            200,
            json!({"access_token": "tok-2", "user": profile_json(3, "a@b.test", true)}),
        );

        let user = f.shop.session().login("a@b.test", &password()).await.unwrap();
        assert!(user.is_admin());
        assert_eq!(f.transport.count(), 1);
        assert!(f.shop.session().is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_login_leaves_state_untouched() {
        let f = Fixture::logged_in(false);
        let before = f.shop.state().session();
        f.transport
            .reply(200, json!({"access_token": "new-token"}))
            .reply(500, json!({"detail": "db down"}));

        let err = f
            .shop
            .session()
            .login("other@acme.test", &password())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(f.shop.state().session(), before);
        assert_eq!(f.store.token().unwrap().unwrap().expose_secret(), "tok");
    }

    fn seed_cart(f: &Fixture) {
        let line: cablestore_core::CartItem = serde_json::from_value(json!({
            "id": 5, "variant_id": 100, "quantity": 2, "price": 10.0, "subtotal": 20.0
        }))
        .unwrap();
        f.shop.state().update_cart(|cart| {
            cart.items = vec![line];
            cart.is_open = true;
        });
    }

    #[tokio::test]
    async fn test_switching_user_drops_previous_cart() {
        let f = Fixture::logged_in(false);
        seed_cart(&f);
        f.transport.reply(
            200,
            json!({"access_token": "tok-other", "user": profile_json(2, "other@acme.test", false)}),
        );

        let user = f
            .shop
            .session()
            .login("other@acme.test", &password())
            .await
            .unwrap();

        assert_eq!(user.email, "other@acme.test");
        let cart = f.shop.state().cart();
        assert!(cart.items.is_empty());
        assert!(!cart.is_open);
        assert_eq!(cart.total(), rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_cart() {
        let f = Fixture::logged_in(false);
        seed_cart(&f);
        f.transport.reply(400, json!({"detail": "Incorrect email or password"}));

        f.shop
            .session()
            .login("other@acme.test", &password())
            .await
            .unwrap_err();

        assert_eq!(f.shop.state().cart().items.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected_not_expired() {
        let f = Fixture::new();
        f.transport.reply(401, json!({"detail": "Incorrect email or password"}));

        let err = f.shop.session().login("x@y.test", &password()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientRejected);
        assert_eq!(err.detail(), Some("Incorrect email or password"));
        assert!(!f.shop.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let f = Fixture::new();
        f.transport
            .reply(200, profile_json(9, "new@acme.test", false))
            .reply(200, json!({"access_token": "tok-new"}))
            .reply(200, profile_json(9, "new@acme.test", false));

        f.shop
            .session()
            .register("new@acme.test", &password(), "Acme Wire")
            .await
            .unwrap();

        let sent = f.transport.recorded();
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].path(), "/api/v1/users/");
        let RequestBody::Json(body) = &sent[0].body else {
            panic!("registration must be JSON");
        };
        assert_eq!(body["username"], "new");
        assert_eq!(body["role"], "user");
        assert_eq!(body["company_name"], "Acme Wire");
        assert!(f.shop.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_initialize_refreshes_profile() {
        let f = Fixture::with_stored_session(false);
        f.transport.reply(200, json!({
            "id": 1, "email": "buyer@acme.test", "company_name": "Renamed Ltd"
        }));

        let state = f.shop.session().initialize().await.unwrap();
        assert!(state.logged_in);
        assert_eq!(state.user.unwrap().company_name.as_deref(), Some("Renamed Ltd"));
        assert_eq!(
            f.store.user().unwrap().unwrap().company_name.as_deref(),
            Some("Renamed Ltd")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_survives_network_failure() {
        let f = Fixture::with_stored_session(false);
        // No scripted replies: every attempt is a network failure

        let state = f.shop.session().initialize().await.unwrap();
        assert!(state.logged_in);
        assert_eq!(state.user.unwrap().email, "buyer@acme.test");
        assert!(f.store.token().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_initialize_logs_out_on_401() {
        let f = Fixture::with_stored_session(false);
        f.transport.reply(401, json!({"detail": "Token expired"}));

        let err = f.shop.session().initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthExpired);
        assert!(!f.shop.session().is_logged_in());
        assert!(f.store.token().unwrap().is_none());
        assert!(f.store.user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_initialize_without_token_is_anonymous() {
        let f = Fixture::new();
        let state = f.shop.session().initialize().await.unwrap();
        assert!(!state.logged_in);
        assert_eq!(f.transport.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_drops_corrupt_cached_profile() {
        let f = Fixture::new();
        f.store.set_token(&SecretString::from("tok")).unwrap();
        f.store.set_raw_user(json!({"not": "a profile"}));
        f.transport.reply(503, json!({})).reply(503, json!({}));

        let session = f.shop.session();
        let mut rx = session.subscribe();
        let state = session.initialize().await.unwrap();

        assert!(state.logged_in);
        assert!(state.user.is_none());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().logged_in);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = Fixture::logged_in(false);
        let session = f.shop.session();
        session.logout().unwrap();
        session.logout().unwrap();
        assert!(!session.is_logged_in());
        assert!(f.store.token().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_best_effort() {
        let f = Fixture::logged_in(false);
        f.transport.reply(404, json!({"detail": "Not Found"}));

        f.shop.session().revoke_and_logout().await.unwrap();
        assert_eq!(f.transport.count(), 1);
        assert!(!f.shop.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_managers_share_one_session() {
        let f = Fixture::new();
        f.transport.reply(
            200,
            json!({"access_token": "t", "user": profile_json(1, "a@b.test", false)}),
        );

        let first = f.shop.session();
        let second = f.shop.session();
        first.login("a@b.test", &password()).await.unwrap();
        assert!(second.is_logged_in());

        second.logout().unwrap();
        assert!(!first.is_logged_in());
    }
}
