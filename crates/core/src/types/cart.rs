//! Cart line items.
//!
//! The cart itself is server-resident; the client mirrors it as an ordered
//! list of [`CartItem`] unique by `id`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartItemId, VariantId};
use super::money::{lenient_decimal, line_subtotal};

/// A line in the shopping cart (`GET /cart/`).
///
/// Once server-confirmed, `subtotal == price * quantity`. While an optimistic
/// quantity change is pending the subtotal is client-computed and provisional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub variant_id: VariantId,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub subtotal: Option<Decimal>,
}

impl CartItem {
    /// Apply a new quantity locally and recompute a provisional subtotal.
    pub fn set_provisional_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = self.price.and_then(|price| line_subtotal(price, quantity));
    }

    /// Subtotal used for the cart total.
    ///
    /// Server subtotal when present, else `price * quantity`, else zero.
    /// A `price * quantity` that overflows counts as zero.
    #[must_use]
    pub fn effective_subtotal(&self) -> Decimal {
        self.subtotal
            .or_else(|| self.price.and_then(|price| line_subtotal(price, self.quantity)))
            .unwrap_or(Decimal::ZERO)
    }

    /// Short human label, e.g. `"RVV 3x2.5 (black)"`.
    #[must_use]
    pub fn label(&self) -> String {
        let name = self
            .product_name
            .clone()
            .unwrap_or_else(|| format!("variant {}", self.variant_id));
        match (self.spec.as_deref(), self.color.as_deref()) {
            (Some(spec), Some(color)) => format!("{name} {spec} ({color})"),
            (Some(spec), None) => format!("{name} {spec}"),
            (None, Some(color)) => format!("{name} ({color})"),
            (None, None) => name,
        }
    }
}

/// Body of `POST /cart/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Sum of the effective subtotals of `items`.
///
/// A line that would overflow the running total is skipped like any other
/// malformed entry.
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .map(CartItem::effective_subtotal)
        .fold(Decimal::ZERO, |total, subtotal| {
            total.checked_add(subtotal).unwrap_or(total)
        })
}
