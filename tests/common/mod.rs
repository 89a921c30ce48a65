//! Common test utilities
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;

use commerce_ledger::api::{self, AppState};
use commerce_ledger::domain::{Amount, Product};
use commerce_ledger::store::InMemoryLedgerStore;
use commerce_ledger::Ledger;

pub const BUYER: &str = "buyer01";
pub const MERCHANT: &str = "merchant01";

/// 18 Oct 2026, 03:00 UTC
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap()
}

pub fn product(code: &str, name: &str, price: Decimal, merchant: &str) -> Product {
    Product {
        code: code.to_string(),
        name: name.to_string(),
        price: Amount::new(price).unwrap(),
        weight: None,
        merchant: merchant.to_string(),
    }
}

/// Router over an in-memory store with product PLN (300) sold by MERCHANT
pub async fn memory_app() -> (Router, InMemoryLedgerStore) {
    let store = InMemoryLedgerStore::new();
    store
        .add_product(product("PLN", "Token Listrik", Decimal::from(300), MERCHANT))
        .await;

    let ledger = Ledger::in_memory(store.clone()).with_clock(fixed_clock);
    (api::build_router(AppState::new(ledger)), store)
}

/// Send a request as `user` (if any) and decode the JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-Request-User", user);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}

/// Setup test database - truncate tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // orders are immutable by trigger, TRUNCATE does not fire it
    sqlx::query("TRUNCATE TABLE orders, products, accounts RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

/// Seed a product row directly; the catalog is read-only for the ledger
pub async fn seed_product(pool: &PgPool, product: &Product) {
    sqlx::query(
        r#"
        INSERT INTO products (code, name, price, weight, merchant)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&product.code)
    .bind(&product.name)
    .bind(product.price.value())
    .bind(product.weight)
    .bind(&product.merchant)
    .execute(pool)
    .await
    .expect("Failed to seed product");
}
