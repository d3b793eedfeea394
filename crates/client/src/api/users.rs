//! User administration (`GET /users/`).

use cablestore_core::UserProfile;
use tracing::instrument;

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};

#[derive(Debug, Clone)]
pub struct UsersApi {
    api: ApiClient,
}

impl UsersApi {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All accounts. Admin only; others get `Rejected { status: 403 }`.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn users(&self) -> Result<Vec<UserProfile>> {
        self.api.fetch(&ApiRequest::get("/users/")).await
    }
}
