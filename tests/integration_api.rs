//! API Integration Tests
//!
//! Drive the full router (identity middleware, handlers, error mapping) over
//! the in-memory store.

use axum::http::StatusCode;
use serde_json::json;

use commerce_ledger::store::Fault;

mod common;

use common::{memory_app, send, BUYER, MERCHANT};

#[tokio::test]
async fn test_health_needs_no_identity() {
    let (app, _) = memory_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_missing_identity_rejected() {
    let (app, _) = memory_app().await;

    let (status, body) = send(&app, "GET", "/api/transaction/balance", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "missing_header");
}

#[tokio::test]
async fn test_open_account_then_balance() {
    let (app, _) = memory_app().await;

    let (status, body) = send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"], BUYER);

    let (status, _) = send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", "/api/transaction/balance", Some(BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], BUYER);
    assert_eq!(body["balance"], "0.00");
}

#[tokio::test]
async fn test_balance_of_unknown_account() {
    let (app, _) = memory_app().await;

    let (status, body) = send(&app, "GET", "/api/transaction/balance", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "account_not_found");
}

#[tokio::test]
async fn test_topup_e2e() {
    let (app, _) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "amount": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "success topup");
    assert_eq!(body["data"]["invoice"], "INV18102026-0001");
    assert_eq!(body["data"]["amount"], "1000.00");
    assert_eq!(body["data"]["type"], "TOPUP");

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "amount": "0.50" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["invoice"], "INV18102026-0002");

    let (_, body) = send(&app, "GET", "/api/transaction/balance", Some(BUYER), None).await;
    assert_eq!(body["balance"], "1000.50");
}

#[tokio::test]
async fn test_topup_invalid_amount() {
    let (app, store) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;

    for amount in [json!(0), json!("-10"), json!("1.999")] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/transaction/topup",
            Some(BUYER),
            Some(json!({ "amount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert_eq!(body["error_code"], "invalid_input");
    }
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_payment_e2e() {
    let (app, _) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    send(&app, "POST", "/api/accounts", Some(MERCHANT), None).await;
    send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "amount": "1000" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/payment",
        Some(BUYER),
        Some(json!({ "code": "pln", "qty": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["type"], "PAYMENT");
    assert_eq!(data["amount"], "600.00");
    assert_eq!(data["merchant"], MERCHANT);
    assert_eq!(data["buyer"], BUYER);
    assert_eq!(data["invoice"], "INV18102026-0002");

    let (_, body) = send(&app, "GET", "/api/transaction/balance", Some(BUYER), None).await;
    assert_eq!(body["balance"], "400.00");
    let (_, body) = send(&app, "GET", "/api/transaction/balance", Some(MERCHANT), None).await;
    assert_eq!(body["balance"], "600.00");

    let (status, body) = send(&app, "GET", "/api/transaction/history", Some(MERCHANT), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "REVENUE");
    assert_eq!(entries[0]["amount"], "600.00");
    assert_eq!(
        entries[0]["description"],
        "Payment for product Token Listrik(PLN)"
    );
}

#[tokio::test]
async fn test_payment_insufficient_balance() {
    let (app, store) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    send(&app, "POST", "/api/accounts", Some(MERCHANT), None).await;
    send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "amount": 100 })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/payment",
        Some(BUYER),
        Some(json!({ "code": "PLN", "qty": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_balance");

    let (_, body) = send(&app, "GET", "/api/transaction/balance", Some(BUYER), None).await;
    assert_eq!(body["balance"], "100.00");
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn test_malformed_body_gets_error_envelope() {
    let (app, store) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/payment",
        Some(BUYER),
        Some(json!({ "code": "PLN", "qty": "two" })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["error_code"], "invalid_request");
    assert!(body["details"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "value": 10 })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["error_code"], "invalid_request");
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_payment_unknown_product() {
    let (app, _) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/payment",
        Some(BUYER),
        Some(json!({ "code": "NOPE", "qty": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "product_not_found");
}

#[tokio::test]
async fn test_store_failure_is_opaque_500() {
    let (app, store) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    store.inject_fault(Fault::CommitFailure).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transaction/topup",
        Some(BUYER),
        Some(json!({ "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], "store_failure");
    assert!(body.get("details").is_none());

    let (_, body) = send(&app, "GET", "/api/transaction/balance", Some(BUYER), None).await;
    assert_eq!(body["balance"], "0.00");
}

#[tokio::test]
async fn test_history_newest_first() {
    let (app, _) = memory_app().await;
    send(&app, "POST", "/api/accounts", Some(BUYER), None).await;
    for amount in ["10", "20", "30"] {
        send(
            &app,
            "POST",
            "/api/transaction/topup",
            Some(BUYER),
            Some(json!({ "amount": amount })),
        )
        .await;
    }

    let (status, first) = send(&app, "GET", "/api/transaction/history", Some(BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<&str> = first["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["amount"].as_str().unwrap())
        .collect();
    assert_eq!(amounts, ["30.00", "20.00", "10.00"]);

    let (_, second) = send(&app, "GET", "/api/transaction/history", Some(BUYER), None).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_products_are_public() {
    let (app, _) = memory_app().await;

    let (status, body) = send(&app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["code"], "PLN");
    assert_eq!(body["data"][0]["price"], "300.00");

    let (status, body) = send(&app, "GET", "/api/products/pln", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["merchant"], MERCHANT);

    let (status, _) = send(&app, "GET", "/api/products/NOPE", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
