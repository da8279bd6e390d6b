//! HTTP handlers for the auth endpoints
//!
//! Endpoints:
//! - POST /auth/login    — email+password, returns principal + token pair
//! - POST /auth/refresh  — bearer refresh token, returns a fresh pair
//! - POST /auth/logout   — bearer access token, clears the fingerprint
//! - POST /user/register — create a principal
//! - GET  /user/me       — bearer access token, returns the principal
//! - GET  /health        — liveness
//! - GET  /metrics       — Prometheus exposition
//!
//! Every authorization failure maps to a bare 401 with no partial data.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::error;

use session_tokens::{LoginRequest, LoginResponse, RegisterRequest};

use crate::issuer::{Error, Issuer};
use crate::metrics;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<Issuer>,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/user/register", post(register_handler))
        .route("/user/me", get(me_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Map issuance errors onto HTTP statuses. Authorization failures carry
/// no detail beyond "unauthorized".
fn error_response(err: Error) -> Response {
    let (status, message) = match &err {
        Error::InvalidCredentials | Error::AccessDenied => {
            (StatusCode::UNAUTHORIZED, "unauthorized")
        }
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "not found"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        Error::Internal(detail) => {
            error!(error = %detail, "internal error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}

/// Extract a bearer credential from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Response {
    match state.issuer.login(&body.email, &body.password).await {
        Ok((principal, tokens)) => {
            metrics::record_login("success");
            Json(LoginResponse { principal, tokens }).into_response()
        }
        Err(err) => {
            metrics::record_login("rejected");
            error_response(err)
        }
    }
}

/// The presented refresh token must pass signature and expiry checks
/// before the store is consulted; the fingerprint compare-and-set inside
/// `rotate` then enforces single-use.
async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(Error::AccessDenied);
    };

    let claims = match state.issuer.verify_refresh(token) {
        Ok(claims) => claims,
        Err(err) => {
            metrics::record_rotation("rejected");
            return error_response(err);
        }
    };

    match state.issuer.rotate(&claims.sub, token).await {
        Ok(pair) => {
            metrics::record_rotation("success");
            Json(pair).into_response()
        }
        Err(err) => {
            metrics::record_rotation("rejected");
            error_response(err)
        }
    }
}

async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(Error::AccessDenied);
    };

    let claims = match state.issuer.verify_access(token) {
        Ok(claims) => claims,
        Err(err) => return error_response(err),
    };

    match state.issuer.invalidate(&claims.sub).await {
        Ok(()) => {
            metrics::record_logout();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    match state.issuer.register(&body.email, &body.password).await {
        Ok(principal) => {
            metrics::record_registration("success");
            (StatusCode::CREATED, Json(principal)).into_response()
        }
        Err(err) => {
            metrics::record_registration(registration_outcome(&err));
            error_response(err)
        }
    }
}

/// Metric label for a failed registration. Only a duplicate email is a
/// "conflict"; anything else must not inflate that counter.
fn registration_outcome(err: &Error) -> &'static str {
    match err {
        Error::Conflict(_) => "conflict",
        _ => "error",
    }
}

async fn me_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(Error::AccessDenied);
    };

    let claims = match state.issuer.verify_access(token) {
        Ok(claims) => claims,
        Err(err) => return error_response(err),
    };

    match state.issuer.principal(&claims.sub).await {
        Ok(principal) => Json(principal).into_response(),
        Err(err) => error_response(err),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
