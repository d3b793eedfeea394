//! Cablestore Core - Shared domain types.
//!
//! This crate provides the types exchanged with the Cablestore REST backend:
//! - `client` - Session, cart and catalog managers built on these types
//! - `cli` - Command-line storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients. Field names follow the backend's JSON (snake case).
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money helpers, users, cart, catalog, orders,
//!   inquiries and news

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
