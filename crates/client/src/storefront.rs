//! The storefront root: one owner for shared state and every manager.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::api::{InquiriesApi, NewsApi, OrdersApi, UsersApi};
use crate::cart::CartManager;
use crate::catalog::CatalogCache;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ClientError, SESSION_EXPIRED_MESSAGE, TransportError};
use crate::guard::{GuardDecision, RouteGuard};
use crate::http::{ApiClient, ReqwestTransport, Transport};
use crate::navigation::{HOME_PATH, Navigator};
use crate::notifications::NotificationCenter;
use crate::routes::{Resolution, RouteTable};
use crate::session::SessionManager;
use crate::store::SharedState;

/// Redirects followed by one [`Storefront::navigate`] call before giving up.
const MAX_REDIRECTS: usize = 5;

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Final location, query string included.
    pub location: String,
    /// Name of the route that was entered.
    pub route: Option<&'static str>,
    /// Notice shown because access was denied along the way.
    pub notice: Option<&'static str>,
}

/// Headless storefront.
///
/// Cheap to clone; clones share the session, cart, catalog cache and toasts.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: Arc<ClientConfig>,
    state: Arc<SharedState>,
    navigator: Arc<Navigator>,
    routes: RouteTable,
    session: SessionManager,
    cart: CartManager,
    catalog: CatalogCache,
    orders: OrdersApi,
    inquiries: InquiriesApi,
    news: NewsApi,
    users: UsersApi,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("location", &self.inner.navigator.current())
            .field("logged_in", &self.inner.state.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a storefront talking to the backend over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, credentials, Arc::new(transport)))
    }

    /// Create a storefront over any transport.
    #[must_use]
    pub fn with_transport(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let config = Arc::new(config);
        let state = Arc::new(SharedState::new(credentials));
        let navigator = Arc::new(Navigator::new());
        let api = ApiClient::new(
            Arc::clone(&config),
            transport,
            Arc::clone(&state),
            Arc::clone(&navigator),
        );

        let catalog = CatalogCache::new(
            api.clone(),
            state.notifications().clone(),
            config.catalog_ttl,
        );

        Self {
            inner: Arc::new(StorefrontInner {
                session: SessionManager::new(api.clone(), Arc::clone(&state)),
                cart: CartManager::new(api.clone(), Arc::clone(&state), Arc::clone(&navigator)),
                catalog,
                orders: OrdersApi::new(api.clone()),
                inquiries: InquiriesApi::new(api.clone()),
                news: NewsApi::new(api.clone()),
                users: UsersApi::new(api),
                routes: RouteTable::storefront(),
                config,
                state,
                navigator,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Shared session, cart and toast state.
    #[must_use]
    pub fn state(&self) -> &Arc<SharedState> {
        &self.inner.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter {
        self.inner.state.notifications()
    }

    #[must_use]
    pub fn orders(&self) -> &OrdersApi {
        &self.inner.orders
    }

    #[must_use]
    pub fn inquiries(&self) -> &InquiriesApi {
        &self.inner.inquiries
    }

    #[must_use]
    pub fn news(&self) -> &NewsApi {
        &self.inner.news
    }

    #[must_use]
    pub fn users(&self) -> &UsersApi {
        &self.inner.users
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to `location`, applying route aliases and the route guard.
    ///
    /// Redirects are followed until a route admits the user. A denial notice
    /// is shown as a warning toast.
    #[instrument(skip(self))]
    pub fn navigate(&self, location: &str) -> Navigation {
        let mut target = location.to_string();
        let mut notice = None;

        for _ in 0..=MAX_REDIRECTS {
            let matched = match self.inner.routes.resolve(&target) {
                Resolution::Matched(matched) => matched,
                Resolution::Redirect(to) => {
                    debug!(from = %target, to = %to, "Route redirect");
                    target = to;
                    continue;
                }
            };

            let session = self.inner.state.session();
            let outcome = RouteGuard::evaluate(&matched.location, &matched.route.meta, &session);
            notice = notice.or(outcome.notice);
            match outcome.decision {
                GuardDecision::Proceed => {
                    return self.arrive(matched.location, Some(matched.route.name), notice);
                }
                GuardDecision::Redirect(to) => {
                    info!(from = %matched.location, to = %to, "Navigation redirected by guard");
                    target = to;
                }
            }
        }

        warn!(location, "Too many redirects, going home");
        self.arrive(HOME_PATH.to_string(), None, notice)
    }

    fn arrive(
        &self,
        location: String,
        route: Option<&'static str>,
        notice: Option<&'static str>,
    ) -> Navigation {
        if let Some(notice) = notice {
            self.notifications().warning(notice);
        }
        self.inner.navigator.set_current(&location);
        Navigation {
            location,
            route,
            notice,
        }
    }

    /// Act on the navigation an error asks for.
    ///
    /// A `SessionExpired` error shows a warning toast. Errors carrying a login
    /// redirect navigate there; the resulting navigation is returned.
    pub fn handle_error(&self, error: &ClientError) -> Option<Navigation> {
        if matches!(error, ClientError::SessionExpired { .. }) {
            self.notifications().warning(SESSION_EXPIRED_MESSAGE);
        }
        let redirect = error.redirect()?;
        Some(self.navigate(&redirect.location()))
    }
}
