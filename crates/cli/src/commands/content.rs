//! Inquiries, news and route inspection.

use cablestore_client::Storefront;
use cablestore_core::{NewInquiryItem, NewsId};

use crate::error::CliError;
use crate::output;

pub async fn create_inquiry(
    shop: &Storefront,
    remark: Option<String>,
    items: Vec<NewInquiryItem>,
) -> Result<(), CliError> {
    let inquiry = shop.inquiries().create_inquiry(remark, items).await?;
    output::line(format_args!("Inquiry #{} submitted ({})", inquiry.id, inquiry.status));
    Ok(())
}

pub async fn inquiries(shop: &Storefront) -> Result<(), CliError> {
    for inquiry in shop.inquiries().inquiries().await? {
        output::line(format_args!(
            "#{:<6} {}  {:<10} quote {}",
            inquiry.id,
            inquiry.created_at.format("%Y-%m-%d"),
            inquiry.status,
            output::amount(inquiry.quoted_total_price)
        ));
        if let Some(reply) = &inquiry.admin_reply {
            output::line(format_args!("        reply: {reply}"));
        }
    }
    Ok(())
}

pub async fn news(shop: &Storefront, id: Option<NewsId>) -> Result<(), CliError> {
    if let Some(id) = id {
        let article = shop.news().news_article(id).await?;
        output::line(format_args!("{}\n{}\n", article.title, article.created_at.format("%Y-%m-%d")));
        output::line(&article.content);
        return Ok(());
    }

    for article in shop.news().news().await? {
        output::line(format_args!(
            "{:>6}  {}  {}",
            article.id,
            article.created_at.format("%Y-%m-%d"),
            article.title
        ));
    }
    Ok(())
}

/// Print where navigating to `path` ends up for the current session.
pub fn route(shop: &Storefront, path: &str) {
    let navigation = shop.navigate(path);
    output::line(format_args!(
        "{path} -> {} ({})",
        navigation.location,
        navigation.route.unwrap_or("home")
    ));
}
