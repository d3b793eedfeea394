//! Catalog, cart and order commands.

use cablestore_client::Storefront;
use cablestore_core::{CartItemId, VariantId};

use crate::error::CliError;
use crate::output;

pub async fn products(shop: &Storefront, refresh: bool) -> Result<(), CliError> {
    let snapshot = shop.catalog().fetch_all(refresh).await?;
    for product in &snapshot.products {
        output::line(format_args!(
            "{:>6}  {:<32} from {:>10}  stock {}",
            product.id,
            product.name,
            output::amount(product.min_price()),
            product.total_stock()
        ));
        for variant in &product.variants {
            output::line(format_args!(
                "        variant {:>6}  {} {}  {}",
                variant.id,
                variant.spec,
                variant.color,
                output::amount(variant.price)
            ));
        }
    }
    Ok(())
}

pub async fn categories(shop: &Storefront) -> Result<(), CliError> {
    let snapshot = shop.catalog().fetch_all(false).await?;
    for category in &snapshot.categories {
        let count = snapshot.products_in(category.id).count();
        output::line(format_args!("{:>6}  {} ({count})", category.id, category.name));
    }
    Ok(())
}

pub async fn show_cart(shop: &Storefront) -> Result<(), CliError> {
    let cart = shop.cart();
    cart.fetch_cart().await?;

    let items = cart.items();
    if items.is_empty() {
        output::line("Cart is empty");
        return Ok(());
    }
    for item in &items {
        output::line(format_args!(
            "{:>6}  {:<40} x{:<6} {:>10}",
            item.id,
            item.label(),
            item.quantity,
            item.effective_subtotal()
        ));
    }
    output::line(format_args!("{} item(s), total {}", cart.item_count(), cart.total()));
    Ok(())
}

pub async fn add_to_cart(shop: &Storefront, variant: VariantId, quantity: u32) -> Result<(), CliError> {
    shop.cart().add_to_cart(variant, quantity).await?;
    show_cart(shop).await
}

pub async fn set_quantity(shop: &Storefront, item: CartItemId, quantity: i64) -> Result<(), CliError> {
    // Quantity updates act on the local copy first
    shop.cart().fetch_cart().await?;
    shop.cart().update_quantity(item, quantity).await?;
    show_cart(shop).await
}

pub async fn remove(shop: &Storefront, item: CartItemId) -> Result<(), CliError> {
    shop.cart().fetch_cart().await?;
    shop.cart().remove_from_cart(item).await?;
    show_cart(shop).await
}

pub async fn checkout(shop: &Storefront) -> Result<(), CliError> {
    let cart = shop.cart();
    cart.fetch_cart().await?;
    let total = cart.total();

    match cart.submit_order().await? {
        Some(order) => output::line(format_args!(
            "Order #{} placed: {} ({})",
            order.id,
            order.payable(),
            order.status
        )),
        None => output::line(format_args!("Order placed: {total}")),
    }
    Ok(())
}

pub async fn orders(shop: &Storefront) -> Result<(), CliError> {
    let orders = shop.orders().my_orders().await?;
    if orders.is_empty() {
        output::line("No orders yet");
    }
    for order in &orders {
        output::line(format_args!(
            "#{:<6} {}  {:<10} {:>10}  {} line(s)",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status,
            order.payable(),
            order.items.len()
        ));
    }
    Ok(())
}
