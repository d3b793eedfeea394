//! Quote requests (inquiries) for bulk or custom orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{InquiryId, UserId, VariantId};
use super::money::lenient_decimal;
use super::status::InquiryStatus;
use super::time::utc_timestamp;

/// Body of `POST /inquiries/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInquiry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NewInquiryItem>>,
}

/// A requested line in a new inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInquiryItem {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// An inquiry and its quote, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    pub user_id: UserId,
    #[serde(default)]
    pub status: InquiryStatus,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quoted_total_price: Option<Decimal>,
    #[serde(default)]
    pub user_remark: Option<String>,
    #[serde(default)]
    pub admin_reply: Option<String>,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<InquiryItem>,
}

/// A line of an inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryItem {
    pub product_name: String,
    #[serde(default)]
    pub product_spec: Option<String>,
    #[serde(default)]
    pub product_color: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quoted_unit_price: Option<Decimal>,
}
