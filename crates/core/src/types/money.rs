//! Decimal money helpers.
//!
//! The backend serializes prices and subtotals as JSON floats. They are held
//! as [`Decimal`] on the client so totals don't accumulate float error.
//! Partially loaded entries may carry `null`, strings or garbage; those are
//! read leniently as "no value" instead of failing the whole payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Deserialize an optional decimal, mapping anything non-numeric to `None`.
///
/// Accepts JSON numbers and numeric strings. Used with
/// `#[serde(default, deserialize_with = "lenient_decimal")]`.
///
/// # Errors
///
/// Never fails on well-formed JSON; only a broken input stream errors.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

/// Convert a JSON value into a decimal if it holds a finite number.
#[must_use]
pub fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        // serde_json prints the shortest round-trip form, so 19.99 stays 19.99
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            text.parse::<Decimal>()
                .ok()
                .or_else(|| Decimal::from_scientific(&text).ok())
        }
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

/// Line subtotal for a unit price and quantity.
///
/// `None` when the product does not fit in a [`Decimal`].
#[must_use]
pub fn line_subtotal(price: Decimal, quantity: u32) -> Option<Decimal> {
    price.checked_mul(Decimal::from(quantity))
}
