//! Cart behaviour end to end: optimistic updates, resync and checkout.

#![allow(clippy::unwrap_used)]

use cablestore_client::cart::ORDER_SUBMITTED_MESSAGE;
use cablestore_client::error::LOGIN_REQUIRED_MESSAGE;
use cablestore_client::{ClientError, ErrorKind, Severity};
use cablestore_core::{CartItemId, OrderStatus, VariantId};
use cablestore_integration_tests::{
    BUYER_EMAIL, BUYER_PASSWORD, Fault, KVV_GREY, RVV_BLACK, RVV_RED, TestShop,
};
use rust_decimal::Decimal;
use secrecy::SecretString;

async fn logged_in() -> TestShop {
    let t = TestShop::new();
    t.shop
        .session()
        .login(BUYER_EMAIL, &SecretString::from(BUYER_PASSWORD))
        .await
        .unwrap();
    t
}

fn line_id(t: &TestShop, variant: i64) -> CartItemId {
    t.shop
        .cart()
        .items()
        .iter()
        .find(|item| item.variant_id == VariantId::new(variant))
        .map(|item| item.id)
        .unwrap()
}

#[tokio::test]
async fn test_anonymous_add_aborts_without_request() {
    let t = TestShop::new();

    let err = t.shop.cart().add_to_cart(VariantId::new(42), 1).await.unwrap_err();

    assert!(matches!(err, ClientError::LoginRequired { .. }));
    assert_eq!(err.kind(), ErrorKind::LocalPrecondition);
    assert!(t.backend.requests().is_empty());
    let toasts = t.shop.notifications().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, LOGIN_REQUIRED_MESSAGE);
}

#[tokio::test]
async fn test_add_resyncs_from_server_and_opens_cart() {
    let t = logged_in().await;
    t.backend.seed_cart(BUYER_EMAIL, KVV_GREY, 2);

    t.shop.cart().add_to_cart(VariantId::new(RVV_BLACK), 10).await.unwrap();

    let items = t.shop.cart().items();
    assert_eq!(items.len(), 2, "server-side line appears after resync");
    assert!(t.shop.cart().is_open());
    assert!(!t.shop.cart().is_loading());
    assert_eq!(t.shop.cart().total(), Decimal::new(21000, 2));
}

#[tokio::test]
async fn test_quantity_update_converges_to_server_subtotal() {
    let t = logged_in().await;
    t.backend.seed_cart(BUYER_EMAIL, RVV_BLACK, 1);
    t.shop.cart().fetch_cart().await.unwrap();
    let id = line_id(&t, RVV_BLACK);

    for quantity in [5, 12, 7] {
        t.shop.cart().update_quantity(id, quantity).await.unwrap();
    }

    let item = t.shop.cart().items().into_iter().find(|i| i.id == id).unwrap();
    assert_eq!(item.quantity, 7);
    assert_eq!(item.subtotal, Some(Decimal::new(10500, 2)));
    assert_eq!(t.backend.cart_of(BUYER_EMAIL), vec![(RVV_BLACK, 7)]);
}

#[tokio::test]
async fn test_zero_quantity_and_remove_converge() {
    let t = logged_in().await;
    t.backend.seed_cart(BUYER_EMAIL, RVV_BLACK, 3);
    t.backend.seed_cart(BUYER_EMAIL, RVV_RED, 3);
    t.shop.cart().fetch_cart().await.unwrap();

    t.shop.cart().update_quantity(line_id(&t, RVV_BLACK), 0).await.unwrap();
    t.shop.cart().remove_from_cart(line_id(&t, RVV_RED)).await.unwrap();

    assert!(t.shop.cart().items().is_empty());
    assert!(t.backend.cart_of(BUYER_EMAIL).is_empty());
}

#[tokio::test]
async fn test_refused_update_resyncs_and_notifies() {
    let t = logged_in().await;
    t.backend.seed_cart(BUYER_EMAIL, RVV_BLACK, 4);
    t.backend.set_stock(RVV_BLACK, 5);
    t.shop.cart().fetch_cart().await.unwrap();
    let id = line_id(&t, RVV_BLACK);

    let err = t.shop.cart().update_quantity(id, 50).await.unwrap_err();

    assert_eq!(err.detail(), Some("insufficient stock"));
    assert_eq!(t.shop.cart().items()[0].quantity, 4, "resync restores server quantity");
    assert!(
        t.shop
            .notifications()
            .toasts()
            .iter()
            .any(|toast| toast.severity == Severity::Error)
    );
}

#[tokio::test]
async fn test_unknown_line_is_local_precondition() {
    let t = logged_in().await;
    let before = t.backend.requests().len();

    let err = t.shop.cart().update_quantity(CartItemId::new(9999), 2).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LocalPrecondition);
    assert_eq!(t.backend.requests().len(), before);
}

#[tokio::test]
async fn test_checkout_success_empties_and_closes_cart() {
    let t = logged_in().await;
    t.shop.cart().add_to_cart(VariantId::new(RVV_BLACK), 10).await.unwrap();
    assert_eq!(t.shop.cart().total(), Decimal::new(150, 0));

    let order = t.shop.cart().submit_order().await.unwrap().unwrap();

    assert_eq!(order.payable(), Decimal::new(150, 0));
    assert_eq!(order.status, OrderStatus::PendingConfirmation);
    assert!(t.shop.cart().items().is_empty());
    assert!(!t.shop.cart().is_open());
    assert_eq!(t.backend.order_count(), 1);
    assert!(
        t.shop
            .notifications()
            .toasts()
            .iter()
            .any(|toast| toast.message == ORDER_SUBMITTED_MESSAGE)
    );

    let orders = t.shop.orders().my_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items[0].quantity, 10);
}

#[tokio::test]
async fn test_checkout_failure_keeps_cart_and_shows_detail() {
    let t = logged_in().await;
    t.shop.cart().add_to_cart(VariantId::new(RVV_BLACK), 10).await.unwrap();
    let before = t.shop.cart().items();
    t.backend.set_stock(RVV_BLACK, 3);

    let err = t.shop.cart().submit_order().await.unwrap_err();

    assert_eq!(err.detail(), Some("insufficient stock"));
    assert_eq!(t.shop.cart().items(), before);
    assert!(t.shop.cart().is_open());
    let toasts = t.shop.notifications().toasts();
    assert!(toasts.iter().any(|toast| toast.message == "insufficient stock"));
    assert_eq!(t.backend.order_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_checkout_retries_through_a_server_hiccup() {
    let t = logged_in().await;
    t.shop.cart().add_to_cart(VariantId::new(KVV_GREY), 5).await.unwrap();
    t.backend.fail_on("/orders/", Fault::Status(502, None));

    let order = t.shop.cart().submit_order().await.unwrap();

    assert!(order.is_some());
    assert_eq!(t.backend.order_count(), 1);
}
