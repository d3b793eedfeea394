//! Order history (`GET /orders/my`).

use cablestore_core::{Order, OrderId};
use tracing::instrument;

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};

/// Orders placed by the current user.
#[derive(Debug, Clone)]
pub struct OrdersApi {
    api: ApiClient,
}

impl OrdersApi {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The current user's orders, newest first as the backend sends them.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        self.api.fetch(&ApiRequest::get("/orders/my")).await
    }

    /// One order by ID.
    ///
    /// # Errors
    ///
    /// Returns the API error; an unknown ID is `Rejected { status: 404 }`.
    #[instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.api.fetch(&ApiRequest::get(format!("/orders/{id}"))).await
    }
}
