//! Retry policy and forced logout as seen from the outside.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use cablestore_client::http::Method;
use cablestore_client::{ClientError, ErrorKind};
use cablestore_core::VariantId;
use cablestore_integration_tests::{BUYER_EMAIL, BUYER_PASSWORD, Fault, RVV_BLACK, TestShop};
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

#[tokio::test(start_paused = true)]
async fn test_503_is_retried_three_times_with_linear_backoff() {
    let t = logged_in().await;
    for _ in 0..4 {
        t.backend.fail_on("/orders/my", Fault::Status(503, None));
    }

    let err = t.shop.orders().my_orders().await.unwrap_err();

    assert!(matches!(err, ClientError::Transient { attempts: 4, status: Some(503), .. }));
    let at: Vec<_> = t
        .backend
        .requests()
        .into_iter()
        .filter(|r| r.path == "/orders/my")
        .map(|r| r.at)
        .collect();
    assert_eq!(at.len(), 4);
    let gaps: Vec<Duration> = at.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(
        gaps,
        vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(3)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_recovers_on_retry() {
    let t = logged_in().await;
    t.backend.fail_on("/orders/my", Fault::Network);

    let orders = t.shop.orders().my_orders().await.unwrap();

    assert!(orders.is_empty());
    assert_eq!(t.backend.count(Method::Get, "/orders/my"), 2);
}

#[tokio::test]
async fn test_404_is_never_retried() {
    let t = logged_in().await;
    t.backend.fail_on("/orders/my", Fault::Status(404, Some("Not Found".to_string())));

    let err = t.shop.orders().my_orders().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ClientRejected);
    assert_eq!(t.backend.count(Method::Get, "/orders/my"), 1);
}

#[tokio::test]
async fn test_401_anywhere_ends_the_session() {
    let t = logged_in().await;
    t.shop.cart().add_to_cart(VariantId::new(RVV_BLACK), 2).await.unwrap();
    t.shop.navigate("/checkout");
    t.backend.expire_tokens();

    let err = t.shop.orders().my_orders().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthExpired);
    assert_eq!(t.backend.count(Method::Get, "/orders/my"), 1, "401 is never retried");
    assert!(!t.shop.session().is_logged_in());
    assert!(t.credentials.token().unwrap().is_none());
    assert!(t.credentials.user().unwrap().is_none());
    assert!(t.shop.cart().items().is_empty());

    let navigation = t.shop.handle_error(&err).unwrap();
    assert_eq!(navigation.location, "/login?redirect=%2Fcheckout");
    assert_eq!(t.shop.navigator().current(), navigation.location);
}

#[tokio::test]
async fn test_catalog_second_load_is_served_from_cache() {
    let t = TestShop::new();

    let first = t.shop.catalog().fetch_all(false).await.unwrap();
    let second = t.shop.catalog().fetch_all(false).await.unwrap();
    assert_eq!(first.products.len(), 2);
    assert_eq!(second.products.len(), 2);
    assert_eq!(t.backend.count(Method::Get, "/products/"), 1);
    assert_eq!(t.backend.count(Method::Get, "/categories/"), 1);

    t.shop.catalog().fetch_all(true).await.unwrap();
    assert_eq!(t.backend.count(Method::Get, "/products/"), 2);
}

#[tokio::test]
async fn test_catalog_failure_notifies_and_keeps_cache() {
    let t = TestShop::new();
    t.shop.catalog().fetch_all(false).await.unwrap();
    t.backend.fail_on("/products/", Fault::Status(400, Some("bad limit".to_string())));

    let err = t.shop.catalog().fetch_all(true).await.unwrap_err();

    assert_eq!(err.detail(), Some("bad limit"));
    assert!(t.shop.catalog().is_loaded().await);
    assert_eq!(t.shop.notifications().toasts()[0].message, "bad limit");
}
