//! Quote requests (`/inquiries/`).

use cablestore_core::{Inquiry, NewInquiry, NewInquiryItem};
use tracing::{info, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::http::{ApiClient, ApiRequest};

/// Submit and list inquiries.
#[derive(Debug, Clone)]
pub struct InquiriesApi {
    api: ApiClient,
}

impl InquiriesApi {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask for a quote. Empty `items` sends a remark-only inquiry.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self, remark, items), fields(items = items.len()))]
    pub async fn create_inquiry(
        &self,
        remark: Option<String>,
        items: Vec<NewInquiryItem>,
    ) -> Result<Inquiry> {
        let body = NewInquiry {
            user_remark: remark.filter(|r| !r.trim().is_empty()),
            items: (!items.is_empty()).then_some(items),
        };
        let inquiry: Inquiry = self
            .api
            .fetch(&ApiRequest::post("/inquiries/").json(&body)?)
            .await?;

        info!(inquiry_id = %inquiry.id, "Inquiry submitted");
        add_breadcrumb("inquiry", "Inquiry submitted", None);
        Ok(inquiry)
    }

    /// Inquiries visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn inquiries(&self) -> Result<Vec<Inquiry>> {
        self.api.fetch(&ApiRequest::get("/inquiries/")).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cablestore_core::{InquiryId, VariantId};
    use serde_json::json;

    use super::*;
    use crate::http::RequestBody;
    use crate::testing::Fixture;

    fn inquiry_json() -> serde_json::Value {
        json!({"id": 3, "user_id": 1, "status": "pending", "user_remark": "500m, red",
               "created_at": "2026-04-02 10:00:00", "items": []})
    }

    #[tokio::test]
    async fn test_create_inquiry_posts_json() {
        let f = Fixture::logged_in(false);
        f.transport.reply(200, inquiry_json());

        let items = vec![NewInquiryItem {
            variant_id: VariantId::new(100),
            quantity: 500,
        }];
        let inquiry = f
            .shop
            .inquiries()
            .create_inquiry(Some("500m, red".to_string()), items)
            .await
            .unwrap();
        assert_eq!(inquiry.id, InquiryId::new(3));

        let sent = &f.transport.recorded()[0];
        assert_eq!(sent.path(), "/api/v1/inquiries/");
        let RequestBody::Json(body) = &sent.body else {
            panic!("expected JSON body");
        };
        assert_eq!(
            body,
            &json!({"user_remark": "500m, red", "items": [{"variant_id": 100, "quantity": 500}]})
        );
    }

    #[tokio::test]
    async fn test_blank_remark_and_no_items_are_omitted() {
        let f = Fixture::logged_in(false);
        f.transport.reply(200, inquiry_json());

        f.shop
            .inquiries()
            .create_inquiry(Some("  ".to_string()), Vec::new())
            .await
            .unwrap();

        let RequestBody::Json(body) = &f.transport.recorded()[0].body else {
            panic!("expected JSON body");
        };
        assert_eq!(body, &json!({}));
    }

    #[tokio::test]
    async fn test_list_inquiries() {
        let f = Fixture::logged_in(false);
        f.transport.reply(200, json!([inquiry_json()]));
        let list = f.shop.inquiries().inquiries().await.unwrap();
        assert_eq!(list.len(), 1);
    }
}
