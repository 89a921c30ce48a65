//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Amount, CallerIdentity, OperationContext, Order, OrderKind, Product};
use crate::error::AppError;
use crate::ledger::Ledger;

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub owner: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            owner: account.owner,
            balance: account.balance.value(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub balance: Decimal,
}

/// Amount may be sent as a JSON string or number
#[derive(Debug, Deserialize)]
pub struct TopupRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub code: String,
    pub qty: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub invoice: String,
    pub merchant: Option<String>,
    pub buyer: Option<String>,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            invoice: order.invoice,
            merchant: order.merchant,
            buyer: order.buyer,
            amount: order.amount,
            kind: order.kind,
            description: order.description,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopupResponse {
    pub message: String,
    pub data: OrderResponse,
}

/// `{"data": ...}` envelope
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Routes acting on the caller's own account; need the identity middleware
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(open_account))
        .route("/transaction/balance", get(get_balance))
        .route("/transaction/topup", post(topup))
        .route("/transaction/payment", post(payment))
        .route("/transaction/history", get(get_history))
}

/// Read-only catalog routes
pub fn catalog_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:code", get(get_product))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open the caller's account
async fn open_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(context): Extension<OperationContext>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = state.ledger.open_account(&caller.username, &context).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

// =========================================================================
// GET /transaction/balance
// =========================================================================

async fn get_balance(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = state.ledger.get_balance(&caller.username).await?;

    Ok(Json(BalanceResponse {
        owner: account.owner,
        balance: account.balance.value(),
    }))
}

// =========================================================================
// POST /transaction/topup
// =========================================================================

async fn topup(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(context): Extension<OperationContext>,
    payload: Result<Json<TopupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TopupResponse>), AppError> {
    let Json(request) = payload?;
    let order = state
        .ledger
        .topup(&caller.username, &request.amount.to_string(), &context)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TopupResponse {
            message: "success topup".to_string(),
            data: order.into(),
        }),
    ))
}

// =========================================================================
// POST /transaction/payment
// =========================================================================

/// Buy `qty` units of product `code` from its merchant
async fn payment(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(context): Extension<OperationContext>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<OrderResponse>>), AppError> {
    let Json(request) = payload?;
    let order = state
        .ledger
        .purchase(&caller.username, &request.code, request.qty, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(order.into()))))
}

// =========================================================================
// GET /transaction/history
// =========================================================================

async fn get_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<DataResponse<Vec<OrderResponse>>>, AppError> {
    let orders = state.ledger.list_history(&caller.username).await?;

    Ok(Json(DataResponse::new(
        orders.into_iter().map(OrderResponse::from).collect(),
    )))
}

// =========================================================================
// GET /products
// =========================================================================

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Product>>>, AppError> {
    Ok(Json(DataResponse::new(state.ledger.list_products().await?)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<DataResponse<Product>>, AppError> {
    Ok(Json(DataResponse::new(state.ledger.get_product(&code).await?)))
}
