//! Catalog types: categories, products and their purchasable variants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId, VariantId};
use super::money::lenient_decimal;

/// Product category (`GET /categories/`).
///
/// Categories form a tree through `parent_id`; the list endpoint may also
/// inline `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub children: Vec<Category>,
}

/// A cable product (`GET /products/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub has_variants: bool,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Lowest variant price, if any variant has one.
    #[must_use]
    pub fn min_price(&self) -> Option<Decimal> {
        self.variants.iter().filter_map(|v| v.price).min()
    }

    /// Total stock across variants.
    #[must_use]
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// A purchasable spec and colour combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub spec: String,
    pub color: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub sku_code: Option<String>,
}

/// Body of `PUT /products/{id}` (admin). Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}
