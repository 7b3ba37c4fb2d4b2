//! Integration tests for the subscription-service backend.
//!
//! The service is replaced by a mock HTTP server; the platform storefront by
//! an in-memory fake.
//!
//! ```bash
//! cargo test -p purchasekit-lib --features http-backend --test service_backend
//! ```

#![cfg(feature = "http-backend")]

mod common;

use common::*;
use purchasekit_lib::backend::service::ANONYMOUS_PREFIX;
use purchasekit_lib::backend::{PurchaseBackend, ServiceBackend, TransactionUpdate};
use purchasekit_lib::models::{OwnershipType, ProfileAttributes};
use purchasekit_lib::{PurchaseKitError, ServiceConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

fn backend(server: &MockServer) -> ServiceBackend<FakeStorefront> {
    let config = ServiceConfig::new("test_key").with_api_url(server.uri());
    ServiceBackend::new(config, FakeStorefront::new()).unwrap()
}

fn subscriber(subscriptions: serde_json::Value) -> serde_json::Value {
    json!({
        "request_date": "2030-01-01T00:00:00Z",
        "subscriber": {
            "original_app_user_id": "$Anonymous:abc",
            "subscriptions": subscriptions,
            "non_subscriptions": {}
        }
    })
}

fn active_monthly() -> serde_json::Value {
    subscriber(json!({
        MONTHLY: {
            "expires_date": "2030-02-01T00:00:00Z",
            "purchase_date": "2030-01-01T00:00:00Z",
            "original_purchase_date": "2029-06-01T00:00:00Z",
            "ownership_type": "PURCHASED",
            "is_sandbox": false
        }
    }))
}

// ============================================================================
// Subscriber document
// ============================================================================

#[tokio::test]
async fn test_fetch_entitlements_sends_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/subscribers/%24Anonymous%3A[0-9a-f]{32}$"))
        .and(header("Authorization", "Bearer test_key"))
        .and(header("X-Platform", "ios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_monthly()))
        .expect(1)
        .mount(&server)
        .await;

    let entitlements = backend(&server).fetch_entitlements().await.unwrap();

    assert_eq!(entitlements.len(), 1);
    assert_eq!(entitlements[0].product_id, MONTHLY);
    assert!(entitlements[0].is_active);
    assert!(entitlements[0].is_verified);
    assert_eq!(entitlements[0].ownership_type, OwnershipType::Purchased);
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let cases = [
        (401, "auth"),
        (404, "not_found"),
        (429, "rate_limited"),
        (503, "internal"),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = backend(&server).fetch_entitlements().await.unwrap_err();
        let matched = match kind {
            "auth" => matches!(err, PurchaseKitError::Auth(_)),
            "not_found" => matches!(err, PurchaseKitError::NotFound { .. }),
            "rate_limited" => matches!(err, PurchaseKitError::RateLimited { .. }) && err.is_retryable(),
            _ => matches!(err, PurchaseKitError::Internal(_)),
        };
        assert!(matched, "status {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn test_malformed_body_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = backend(&server).fetch_entitlements().await.unwrap_err();
    assert!(matches!(err, PurchaseKitError::Serialization(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_retryable() {
    let config = ServiceConfig::new("test_key")
        .with_api_url("http://127.0.0.1:1")
        .with_timeout(2);
    let backend = ServiceBackend::new(config, FakeStorefront::new()).unwrap();

    let err = backend.fetch_entitlements().await.unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {:?}", err);
}

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_posts_receipt_then_finishes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/receipts"))
        .and(body_partial_json(json!({
            "product_id": MONTHLY,
            "fetch_token": "signed.200000001",
            "is_restore": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_monthly()))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let entitlements = backend.purchase(MONTHLY).await.unwrap();

    assert_eq!(entitlements.len(), 1);
    assert_eq!(backend.store().finished(), vec!["200000001".to_string()]);
}

#[tokio::test]
async fn test_rejected_receipt_leaves_transaction_unfinished() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/receipts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let err = backend.purchase(MONTHLY).await.unwrap_err();

    assert!(matches!(err, PurchaseKitError::Internal(_)));
    assert!(backend.store().finished().is_empty());
}

#[tokio::test]
async fn test_restore_posts_each_transaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/receipts"))
        .and(body_partial_json(json!({ "is_restore": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_monthly()))
        .expect(2)
        .mount(&server)
        .await;

    let now = chrono::Utc::now();
    let store = FakeStorefront::new()
        .with_transaction(store_transaction("1", MONTHLY, None, now))
        .with_transaction(store_transaction("2", ANNUAL, None, now));
    let backend = ServiceBackend::new(
        ServiceConfig::new("test_key").with_api_url(server.uri()),
        store,
    )
    .unwrap();

    let entitlements = backend.restore().await.unwrap();
    assert_eq!(entitlements.len(), 1);
    assert_eq!(backend.store().syncs(), 1);
}

#[tokio::test]
async fn test_transaction_update_delivers_fresh_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/receipts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_monthly()))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let mut updates = backend.subscribe_to_transaction_updates().await.unwrap();
    assert!(backend
        .store()
        .deliver(store_transaction("renewal", MONTHLY, None, chrono::Utc::now())));

    let update = tokio::time::timeout(Duration::from_secs(5), updates.next())
        .await
        .unwrap();
    match update {
        Some(TransactionUpdate::Entitlements(list)) => assert_eq!(list[0].product_id, MONTHLY),
        other => panic!("unexpected update: {:?}", other),
    }
    assert_eq!(backend.store().finished(), vec!["renewal".to_string()]);
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_log_in_identifies_then_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/subscribers/identify"))
        .and(body_partial_json(json!({ "new_app_user_id": "alice" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(active_monthly()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/subscribers/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(subscriber(json!({}))))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    assert!(backend.is_anonymous());

    let first = backend.log_in("alice").await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(backend.current_user_id(), "alice");

    // Same id again only refreshes.
    let second = backend.log_in("alice").await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_attributes_posted_for_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/subscribers/.+/attributes$"))
        .and(body_partial_json(json!({
            "attributes": { "$email": { "value": "alice@example.com" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    backend
        .update_profile_attributes(&ProfileAttributes::default())
        .await
        .unwrap();
    backend
        .update_profile_attributes(&ProfileAttributes {
            email: Some("alice@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_log_out_rotates_anonymous_id() {
    let server = MockServer::start().await;
    let backend = backend(&server);
    let before = backend.current_user_id();

    backend.log_out().await.unwrap();

    let after = backend.current_user_id();
    assert!(after.starts_with(ANONYMOUS_PREFIX));
    assert_ne!(before, after);
}
