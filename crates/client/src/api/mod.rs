//! Thin handles over the remaining backend resources.
//!
//! These carry no local state; each call goes through the shared
//! [`ApiClient`](crate::http::ApiClient) so the bearer token, retry policy and
//! 401 handling apply uniformly.

pub mod inquiries;
pub mod news;
pub mod orders;
pub mod users;

pub use inquiries::InquiriesApi;
pub use news::NewsApi;
pub use orders::OrdersApi;
pub use users::UsersApi;
