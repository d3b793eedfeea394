//! The single owning store of session-scoped state.
//!
//! One [`SharedState`] exists per [`crate::Storefront`]. Every manager holds
//! an `Arc` to it, so however many managers are constructed they all observe
//! the same session, cart and toasts.

use std::sync::Arc;

use cablestore_core::{CartItem, UserProfile, cart_total};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::info;

use crate::credentials::CredentialStore;
use crate::error::{CredentialError, clear_sentry_user};
use crate::notifications::NotificationCenter;

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub logged_in: bool,
}

impl SessionState {
    /// Whether the current user may enter admin-only routes.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.logged_in && self.user.as_ref().is_some_and(UserProfile::is_admin)
    }
}

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Lines in server order, unique by ID.
    pub items: Vec<CartItem>,
    /// Whether the cart panel is showing.
    pub is_open: bool,
    /// A cart mutation or checkout is in flight.
    pub loading: bool,
    pending: usize,
}

impl CartState {
    /// Derived total; never stored.
    #[must_use]
    pub fn total(&self) -> Decimal {
        cart_total(&self.items)
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// Session, cart and toast state shared by every manager.
pub struct SharedState {
    credentials: Arc<dyn CredentialStore>,
    session: watch::Sender<SessionState>,
    cart: watch::Sender<CartState>,
    notifications: NotificationCenter,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("session", &*self.session.borrow())
            .field("cart", &*self.cart.borrow())
            .finish_non_exhaustive()
    }
}

impl SharedState {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            session: watch::Sender::new(SessionState::default()),
            cart: watch::Sender::new(CartState::default()),
            notifications: NotificationCenter::new(),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    #[must_use]
    pub const fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.borrow().logged_in
    }

    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Replace the session state.
    pub fn set_session(&self, state: SessionState) {
        self.session.send_replace(state);
    }

    /// Publish a freshly established session.
    ///
    /// The cart belongs to the previous session, so it is emptied and closed
    /// before observers see the new user.
    pub fn begin_session(&self, state: SessionState) {
        self.clear_cart();
        self.session.send_replace(state);
    }

    /// Tear the session down: credentials, profile, logged-in flag and cart
    /// are all cleared before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be cleared. In-memory
    /// state is reset regardless.
    pub fn end_session(&self) -> Result<(), CredentialError> {
        let cleared = self.credentials.clear();
        let was_logged_in = self.session.send_replace(SessionState::default()).logged_in;
        self.clear_cart();
        clear_sentry_user();
        if was_logged_in {
            info!("Session ended");
        }
        cleared
    }

    // =========================================================================
    // Cart
    // =========================================================================

    fn clear_cart(&self) {
        self.cart.send_modify(|cart| {
            cart.items.clear();
            cart.is_open = false;
        });
    }

    /// Count one more cart operation in flight and raise `loading`.
    pub fn begin_cart_load(&self) {
        self.cart.send_modify(|cart| {
            cart.pending += 1;
            cart.loading = true;
        });
    }

    /// Count one cart operation as finished; `loading` drops with the last.
    pub fn end_cart_load(&self) {
        self.cart.send_modify(|cart| {
            cart.pending = cart.pending.saturating_sub(1);
            cart.loading = cart.pending > 0;
        });
    }

    /// Snapshot of the cart.
    #[must_use]
    pub fn cart(&self) -> CartState {
        self.cart.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_cart(&self) -> watch::Receiver<CartState> {
        self.cart.subscribe()
    }

    /// Mutate the cart in place and notify observers.
    pub fn update_cart(&self, apply: impl FnOnce(&mut CartState)) {
        self.cart.send_modify(apply);
    }

    /// Mutate the cart; observers are notified only if `apply` returns true.
    pub fn update_cart_if(&self, apply: impl FnOnce(&mut CartState) -> bool) -> bool {
        self.cart.send_if_modified(apply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn profile(admin: bool) -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": 1, "email": "ops@acme.test", "is_admin": admin
        }))
        .unwrap()
    }

    fn line(id: i64, quantity: u32) -> CartItem {
        serde_json::from_value(serde_json::json!({
            "id": id, "variant_id": id * 10, "quantity": quantity, "price": "2.00"
        }))
        .unwrap()
    }

    #[test]
    fn test_loading_stays_up_while_any_cart_operation_runs() {
        let state = SharedState::new(Arc::new(MemoryCredentialStore::new()));
        state.begin_cart_load();
        state.begin_cart_load();

        state.end_cart_load();
        assert!(state.cart().loading);

        state.end_cart_load();
        assert!(!state.cart().loading);

        state.end_cart_load();
        assert!(!state.cart().loading);
    }

    #[test]
    fn test_end_session_clears_everything() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set_token(&SecretString::from("tok")).unwrap();
        store.set_user(&profile(false)).unwrap();

        let state = SharedState::new(store.clone());
        state.set_session(SessionState {
            user: Some(profile(false)),
            logged_in: true,
        });
        state.update_cart(|cart| {
            cart.items = vec![line(1, 2)];
            cart.is_open = true;
        });

        state.end_session().unwrap();

        assert!(store.token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());
        assert_eq!(state.session(), SessionState::default());
        assert!(state.cart().items.is_empty());
        assert!(!state.cart().is_open);

        // Idempotent
        state.end_session().unwrap();
    }

    #[test]
    fn test_subscribers_observe_one_truth() {
        let state = SharedState::new(Arc::new(MemoryCredentialStore::new()));
        let first = state.subscribe_session();
        let second = state.subscribe_session();

        state.set_session(SessionState {
            user: Some(profile(true)),
            logged_in: true,
        });

        assert!(first.borrow().logged_in);
        assert!(second.borrow().is_admin());
    }

    #[test]
    fn test_cart_derivations() {
        let state = SharedState::new(Arc::new(MemoryCredentialStore::new()));
        state.update_cart(|cart| cart.items = vec![line(1, 2), line(2, 3)]);

        let cart = state.cart();
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Decimal::new(1000, 2));
    }

    #[test]
    fn test_admin_requires_login() {
        let state = SessionState {
            user: Some(profile(true)),
            logged_in: false,
        };
        assert!(!state.is_admin());
    }
}
