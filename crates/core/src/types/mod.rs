//! Core types for Cablestore.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod inquiry;
pub mod money;
pub mod news;
pub mod order;
pub mod status;
pub mod time;
pub mod user;

pub use cart::{CartItem, NewCartItem, cart_total};
pub use catalog::{Category, Product, ProductUpdate, ProductVariant};
pub use id::*;
pub use inquiry::{Inquiry, InquiryItem, NewInquiry, NewInquiryItem};
pub use money::lenient_decimal;
pub use news::NewsArticle;
pub use order::{Order, OrderItem};
pub use status::*;
pub use time::{parse_timestamp, utc_timestamp};
pub use user::{Role, UserProfile};
