//! Cablestore client - headless storefront for the Cablestore B2B backend.
//!
//! A [`Storefront`] owns one [`store::SharedState`] and hands out the
//! managers that operate on it:
//!
//! - [`SessionManager`] - login, registration, logout, session restore
//! - [`CartManager`] - cart contents with optimistic quantity updates
//! - [`CatalogCache`] - memoized product and category lists
//! - [`NotificationCenter`] - auto-expiring toasts
//! - [`Storefront::navigate`] - route table plus [`guard::RouteGuard`]
//!
//! Every backend call goes through [`http::ApiClient`], which attaches the
//! bearer token, retries transient failures with linear backoff and ends the
//! session on a 401.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cablestore_client::{ClientConfig, Storefront, credentials::MemoryCredentialStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let shop = Storefront::new(ClientConfig::from_env()?, Arc::new(MemoryCredentialStore::new()))?;
//! shop.session().initialize().await?;
//! let products = shop.catalog().products().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod http;
pub mod navigation;
pub mod notifications;
pub mod routes;
pub mod session;
pub mod store;
pub mod storefront;

#[cfg(test)]
mod testing;

pub use cart::CartManager;
pub use catalog::{CatalogCache, CatalogSnapshot};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ErrorKind, Result};
pub use notifications::{NotificationCenter, Severity, Toast};
pub use session::SessionManager;
pub use storefront::{Navigation, Storefront};
