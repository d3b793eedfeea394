//! Company news (`/news/`).

use cablestore_core::{NewsArticle, NewsId};
use tracing::instrument;

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};

#[derive(Debug, Clone)]
pub struct NewsApi {
    api: ApiClient,
}

impl NewsApi {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Published articles.
    ///
    /// Readable without a session. The session token is still attached when
    /// there is one, so a 401 here ends the session like any other request.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn news(&self) -> Result<Vec<NewsArticle>> {
        let articles: Vec<NewsArticle> = self
            .api
            .fetch(&ApiRequest::get("/news/"))
            .await?;
        Ok(articles.into_iter().filter(|a| a.is_published).collect())
    }

    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn news_article(&self, id: NewsId) -> Result<NewsArticle> {
        self.api
            .fetch(&ApiRequest::get(format!("/news/{id}")))
            .await
    }
}
