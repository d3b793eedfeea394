//! Server-resident shopping cart with optimistic quantity updates.
//!
//! The server owns the cart. Local state is a mirror that is replaced
//! wholesale on every fetch. Quantity changes are applied locally first and
//! then confirmed by the server; a failed confirmation triggers a full resync
//! instead of a field-level undo.

use std::sync::Arc;

use cablestore_core::{CartItem, CartItemId, NewCartItem, Order, VariantId};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{ClientError, ErrorKind, LOGIN_REQUIRED_MESSAGE, Result, add_breadcrumb};
use crate::http::{ApiClient, ApiRequest};
use crate::navigation::Navigator;
use crate::store::{CartState, SharedState};

/// Shown when an optimistic quantity change was refused.
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update quantity, please try again.";
/// Fallback when checkout fails without a server detail.
pub const CHECKOUT_FAILED_MESSAGE: &str = "Order submission failed, please try again.";
/// Fallback when adding fails without a server detail.
pub const ADD_FAILED_MESSAGE: &str = "Failed to add to cart: network error.";
/// Shown after a successful checkout.
pub const ORDER_SUBMITTED_MESSAGE: &str = "Order submitted.";

/// Body of `PATCH /cart/{id}`.
#[derive(Debug, Serialize)]
struct QuantityUpdate {
    quantity: u32,
}

/// Holds the cart loading flag up for its lifetime.
struct Loading<'a> {
    state: &'a SharedState,
}

impl<'a> Loading<'a> {
    fn start(state: &'a SharedState) -> Self {
        state.begin_cart_load();
        Self { state }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.state.end_cart_load();
    }
}

/// Cart operations over the shared cart state.
#[derive(Debug, Clone)]
pub struct CartManager {
    api: ApiClient,
    state: Arc<SharedState>,
    navigator: Arc<Navigator>,
}

impl CartManager {
    #[must_use]
    pub const fn new(api: ApiClient, state: Arc<SharedState>, navigator: Arc<Navigator>) -> Self {
        Self {
            api,
            state,
            navigator,
        }
    }

    /// Replace the local cart with the server's.
    ///
    /// Anonymous sessions get an empty cart without a network call.
    ///
    /// # Errors
    ///
    /// Returns any API error; the local cart is left as it was.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<()> {
        if !self.state.is_logged_in() {
            self.state.update_cart_if(|cart| {
                let had_items = !cart.items.is_empty();
                cart.items.clear();
                had_items
            });
            return Ok(());
        }

        let items: Vec<CartItem> = self.api.fetch(&ApiRequest::get("/cart/")).await?;
        // The session may have ended while the fetch was in flight
        if self.state.is_logged_in() {
            self.state.update_cart(|cart| cart.items = items);
        }
        Ok(())
    }

    /// Add a variant, then resync from the server and open the cart.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` without any network call when anonymous, or
    /// the API error. Failures are also reported as a toast.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, variant_id: VariantId, quantity: u32) -> Result<()> {
        self.require_session()?;
        let _loading = Loading::start(&self.state);

        let body = NewCartItem {
            variant_id,
            quantity,
        };
        let result = async {
            self.api
                .send(&ApiRequest::post("/cart/").json(&body)?)
                .await?;
            self.fetch_cart().await?;
            self.state.update_cart(|cart| cart.is_open = true);
            Ok::<(), ClientError>(())
        }
        .await;

        match &result {
            Ok(()) => {
                let variant = variant_id.to_string();
                add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", variant.as_str())]));
            }
            Err(e) => self.report(e, ADD_FAILED_MESSAGE),
        }
        result
    }

    /// Change a line's quantity optimistically.
    ///
    /// The local line is updated (or removed for `quantity <= 0`) before the
    /// request is sent. The server's answer then overwrites it. If the server
    /// refuses, the cart is resynced and an error toast is shown.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` when anonymous, `ItemNotInCart` if the line is
    /// not in the local cart, or the API error after the resync.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, item_id: CartItemId, quantity: i64) -> Result<()> {
        if !self.state.is_logged_in() {
            return Err(ClientError::LoginRequired { redirect: None });
        }
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);

        let found = self.state.update_cart_if(|cart| {
            if quantity == 0 {
                let before = cart.items.len();
                cart.items.retain(|item| item.id != item_id);
                return cart.items.len() != before;
            }
            let Some(item) = cart.items.iter_mut().find(|item| item.id == item_id) else {
                return false;
            };
            item.set_provisional_quantity(quantity);
            true
        });
        if !found {
            return Err(ClientError::ItemNotInCart(item_id));
        }

        let request = ApiRequest::patch(format!("/cart/{item_id}")).json(&QuantityUpdate { quantity })?;
        match self.api.execute(&request).await {
            Ok(response) => {
                let confirmed = match response.decode::<Option<CartItem>>() {
                    Ok(confirmed) => confirmed,
                    Err(e) => {
                        warn!(error = %e, "Unreadable cart update response, resyncing");
                        self.resync().await;
                        return Ok(());
                    }
                };
                self.apply_confirmed(item_id, confirmed);
                Ok(())
            }
            // Session teardown already emptied the cart
            Err(e) if e.kind() == ErrorKind::AuthExpired => Err(e),
            Err(e) => {
                warn!(error = %e, "Quantity update refused, resyncing");
                self.resync().await;
                self.state.notifications().error(UPDATE_FAILED_MESSAGE);
                Err(e)
            }
        }
    }

    /// Remove a line optimistically; same as `update_quantity(id, 0)`.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn remove_from_cart(&self, item_id: CartItemId) -> Result<()> {
        self.update_quantity(item_id, 0).await
    }

    /// Delete a line on the server, then drop it locally.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` when anonymous or the API error; the local
    /// cart is untouched on failure.
    #[instrument(skip(self))]
    pub async fn delete_from_cart(&self, item_id: CartItemId) -> Result<()> {
        if !self.state.is_logged_in() {
            return Err(ClientError::LoginRequired { redirect: None });
        }
        self.api.send(&ApiRequest::delete(format!("/cart/{item_id}"))).await?;
        self.state.update_cart_if(|cart| {
            let before = cart.items.len();
            cart.items.retain(|item| item.id != item_id);
            cart.items.len() != before
        });
        Ok(())
    }

    /// Check out the server-side cart.
    ///
    /// On success the local cart is emptied and closed. On failure it is left
    /// unchanged and the server's detail (or a fallback) is shown.
    ///
    /// Returns the created order when the response describes one.
    ///
    /// # Errors
    ///
    /// Returns `LoginRequired` when anonymous or the API error.
    #[instrument(skip(self))]
    pub async fn submit_order(&self) -> Result<Option<Order>> {
        self.require_session()?;
        let _loading = Loading::start(&self.state);

        let response = match self.api.execute(&ApiRequest::post("/orders/")).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Checkout failed");
                self.report(&e, CHECKOUT_FAILED_MESSAGE);
                return Err(e);
            }
        };

        self.state.update_cart(|cart| {
            cart.items.clear();
            cart.is_open = false;
        });
        self.state.notifications().success(ORDER_SUBMITTED_MESSAGE);

        let order = match response.decode::<Order>() {
            Ok(order) => {
                info!(order_id = %order.id, total = %order.payable(), "Order submitted");
                Some(order)
            }
            Err(e) => {
                warn!(error = %e, "Order submitted but response was unreadable");
                None
            }
        };
        add_breadcrumb("cart", "Order submitted", None);
        Ok(order)
    }

    pub fn open_cart(&self) {
        self.state.update_cart(|cart| cart.is_open = true);
    }

    pub fn close_cart(&self) {
        self.state.update_cart(|cart| cart.is_open = false);
    }

    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.state.cart().items
    }

    /// Sum of line subtotals, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.state.cart().total()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state.cart().item_count()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.cart().is_open
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.cart().loading
    }

    /// Observe cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe_cart()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_session(&self) -> Result<()> {
        if self.state.is_logged_in() {
            return Ok(());
        }
        self.state.notifications().error(LOGIN_REQUIRED_MESSAGE);
        Err(ClientError::LoginRequired {
            redirect: self.navigator.login_redirect(),
        })
    }

    /// Merge the server's answer to a quantity update.
    fn apply_confirmed(&self, item_id: CartItemId, confirmed: Option<CartItem>) {
        self.state.update_cart_if(|cart| {
            let index = cart.items.iter().position(|item| item.id == item_id);
            match (index, confirmed) {
                (Some(index), Some(item)) if item.quantity > 0 => {
                    if let Some(slot) = cart.items.get_mut(index) {
                        *slot = item;
                    }
                    true
                }
                (Some(index), _) => {
                    cart.items.remove(index);
                    true
                }
                (None, _) => false,
            }
        });
    }

    async fn resync(&self) {
        if let Err(e) = self.fetch_cart().await {
            warn!(error = %e, "Cart resync failed");
        }
    }

    /// Toast for a failed cart operation. Session expiry is reported by the
    /// navigation controller instead.
    fn report(&self, error: &ClientError, fallback: &str) {
        if error.kind() != ErrorKind::AuthExpired {
            self.state.notifications().error(error.user_message(fallback));
        }
    }
}
