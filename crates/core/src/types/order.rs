//! Orders placed from the cart (`POST /orders/`, `GET /orders/my`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, OrderItemId, UserId};
use super::money::lenient_decimal;
use super::status::OrderStatus;
use super::time::utc_timestamp;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub original_total_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub final_total_price: Option<Decimal>,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Amount payable: the final (discounted) total, else the original.
    #[must_use]
    pub fn payable(&self) -> Decimal {
        self.final_total_price
            .or(self.original_total_price)
            .unwrap_or(Decimal::ZERO)
    }
}

/// A line of a placed order, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_name: String,
    #[serde(default)]
    pub product_spec: Option<String>,
    #[serde(default)]
    pub product_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub subtotal: Option<Decimal>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parses_backend_payload() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 9,
            "user_id": 2,
            "status": "confirmed",
            "original_total_price": 150.0,
            "final_total_price": 135.0,
            "created_at": "2026-03-01T08:30:00Z",
            "items": [{"id": 1, "product_name": "RVV", "unit_price": 15.0, "quantity": 10, "subtotal": 150.0}]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payable(), "135".parse::<Decimal>().unwrap());
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn test_payable_falls_back_to_original_total() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 9, "user_id": 2, "original_total_price": 80.0,
            "created_at": "2026-03-01T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(order.payable(), "80".parse::<Decimal>().unwrap());
    }
}
