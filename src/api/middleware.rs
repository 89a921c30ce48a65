//! API Middleware
//!
//! Caller identity resolution and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::{CallerIdentity, OperationContext, Role};
use crate::error::AppError;

/// Authenticated username, set by the upstream token-verifying gateway
pub const USER_HEADER: &str = "x-request-user";

/// Caller role (`CLIENT` or `MERCHANT`); defaults to `CLIENT` when absent
pub const ROLE_HEADER: &str = "x-request-role";

pub const CORRELATION_HEADER: &str = "x-correlation-id";

// =========================================================================
// Identity Middleware
// =========================================================================

/// Resolve the caller from trusted headers.
///
/// Inserts the [`CallerIdentity`] and an [`OperationContext`] into the
/// request extensions. Tokens are never parsed here.
pub async fn identity_middleware(
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let caller = resolve_caller(&headers).map_err(IntoResponse::into_response)?;

    // Extract correlation ID or generate new one
    let correlation_id = headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let context = OperationContext::new()
        .with_correlation_id(correlation_id)
        .with_caller(caller.clone());

    request.extensions_mut().insert(caller);
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Build the caller identity from the identity headers
pub fn resolve_caller(headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let username = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::MissingHeader(USER_HEADER.to_string()))?;

    let role = match headers.get(ROLE_HEADER) {
        None => Role::Client,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Role>().ok())
            .ok_or_else(|| AppError::InvalidHeader(ROLE_HEADER.to_string()))?,
    };

    Ok(CallerIdentity::new(username, role))
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    let (correlation_id, caller) = request
        .extensions()
        .get::<OperationContext>()
        .map(|ctx| {
            (
                ctx.correlation_id,
                ctx.caller.as_ref().map(|c| c.username.clone()),
            )
        })
        .unwrap_or((None, None));

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = ?correlation_id,
        caller = ?caller,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
