//! Company news articles (`GET /news/`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::NewsId;
use super::time::utc_timestamp;

/// A published news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: NewsId,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
}

const fn published_by_default() -> bool {
    true
}
