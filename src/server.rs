//!
//! portcullis HTTP guard layer
//! ---------------------------
//! Axum wiring for the authorization guard: shared state, the per-request
//! middleware that runs the decision flow, the HTTP error mapping, and a small
//! demo surface showing how guarded handlers consume the request context.
//!
//! Responsibilities:
//! - Bearer credential extraction (Authorization header, cookie fallback).
//! - Route metadata lookup by matched path template.
//! - Attaching the `RequestContext` (re-encrypted principal) for handlers.
//! - Startup: config, demo admin seeding, route table construction, serve.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{MatchedPath, Path, RawPathParams, Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Extension, Json, Router};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::cipher::ClaimCipher;
use crate::config::GuardConfig;
use crate::error::AppError;
use crate::identity::{
    AuthorizationEngine, Decision, DenyReason, Guard, Principal, RequestContext, TokenResolver,
    WILDCARD,
};
use crate::routes::RouteTable;

const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Shared server state injected into the guard middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub guard: Arc<Guard>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "status": false,
            "error": self.message(),
            "code": self.code_str(),
        }));
        (status, body).into_response()
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

/// Bearer credential from the `Authorization` header, falling back to the
/// `access_token` cookie. A malformed header yields no credential (the guard
/// then denies as unauthenticated) rather than an error of its own.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(raw) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let parts: Vec<&str> = raw.split(' ').collect();
        if parts.len() == 2 && parts[0] == "Bearer" && !parts[1].is_empty() {
            return Some(parts[1].to_string());
        }
        return None;
    }
    parse_cookie(headers, ACCESS_TOKEN_COOKIE)
}

/// Per-request guard: metadata lookup, decision, context attachment.
///
/// Routes absent from the table should be impossible when the router is built
/// from the same declarations; if it ever happens we fail closed.
pub async fn guard_middleware(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    params: RawPathParams,
    mut req: Request,
    next: Next,
) -> Response {
    // No matched route: let the router's fallback produce its 404
    let Some(matched) = matched else {
        return next.run(req).await;
    };

    let method = req.method().clone();
    let Some(requirement) = state.table.requirement(&method, matched.as_str()).cloned() else {
        error!(%method, route = matched.as_str(), "no requirement declared for matched route; denying");
        return AppError::config("undeclared_route", "endpoint is not registered").into_response();
    };

    let credential = extract_credential(req.headers());
    let route_id = params
        .iter()
        .find(|(name, _)| *name == "id")
        .map(|(_, value)| value.to_string());

    match state
        .guard
        .check(&requirement, credential.as_deref(), route_id.as_deref())
        .await
    {
        Ok((Decision::Allow(reason), principal)) => {
            let request_id = uuid::Uuid::new_v4().to_string();
            debug!(
                %method,
                route = matched.as_str(),
                request_id = %request_id,
                principal = principal.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
                ?reason,
                "request allowed"
            );
            req.extensions_mut().insert(RequestContext {
                principal,
                request_id: Some(request_id),
            });
            next.run(req).await
        }
        Ok((Decision::Deny(DenyReason::Unauthenticated), _)) => {
            debug!(%method, route = matched.as_str(), "request denied: unauthenticated");
            AppError::unauthenticated("missing_or_invalid_credential", "authentication required")
                .into_response()
        }
        Ok((Decision::Deny(DenyReason::AccessDenied), _)) => {
            warn!(%method, route = matched.as_str(), "request denied: insufficient permissions");
            AppError::forbidden("access_denied", "insufficient permissions").into_response()
        }
        Err(err) => {
            error!(%method, route = matched.as_str(), "guard failure: {}", err);
            err.into_response()
        }
    }
}

/// Route metadata for the demo surface. The `/users` group default shows
/// group-level declarations; handler-level `require` entries override it.
pub fn demo_table() -> crate::error::AppResult<RouteTable> {
    RouteTable::builder()
        .group("/users", ["users:manage"])
        .public(Method::GET, "/health")
        .authenticated(Method::GET, "/profile")
        .authenticated(Method::GET, "/whoami")
        .require(Method::GET, "/reports", ["reports:read"])
        .require(Method::PATCH, "/users/{id}", ["users:update"])
        .route(Method::GET, "/users/{id}")
        .require(Method::DELETE, "/orders/{id}", ["orders:delete"])
        .build()
}

/// Build the demo router with the guard layered over every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/profile", get(profile))
        .route("/whoami", get(whoami))
        .route("/reports", get(reports_index))
        .route("/users/{id}", get(user_show).patch(user_update))
        .route("/orders/{id}", delete(order_delete))
        .layer(middleware::from_fn_with_state(state.clone(), guard_middleware))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": true, "service": "portcullis" }))
}

/// Downstream exposure: the caller's id and (encrypted) permission claims.
async fn whoami(Extension(ctx): Extension<RequestContext>) -> Response {
    match ctx.principal {
        Some(p) => Json(json!({
            "status": true,
            "id": p.id,
            "permissions": p.role.permissions,
        }))
        .into_response(),
        None => AppError::unauthenticated("missing_or_invalid_credential", "authentication required")
            .into_response(),
    }
}

async fn profile(Extension(ctx): Extension<RequestContext>) -> Response {
    match ctx.principal {
        Some(p) => Json(json!({ "status": true, "id": p.id })).into_response(),
        None => AppError::unauthenticated("missing_or_invalid_credential", "authentication required")
            .into_response(),
    }
}

async fn reports_index() -> impl IntoResponse {
    Json(json!({ "status": true, "reports": [] }))
}

async fn user_show(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({ "status": true, "user": id }))
}

async fn user_update(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({ "status": true, "updated": id }))
}

async fn order_delete(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({ "status": true, "deleted": id }))
}

fn generate_token() -> crate::error::AppResult<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AppError::internal("rng_failure".to_string(), e.to_string()))?;
    let mut token = String::with_capacity(32);
    use std::fmt::Write as _;
    for b in &bytes {
        let _ = write!(&mut token, "{:02x}", b);
    }
    Ok(token)
}

/// Register the demo administrator (wildcard claim) with the resolver and log
/// the bearer token operators can use against the demo surface.
fn seed_demo_admin(
    cipher: &ClaimCipher,
    resolver: &TokenResolver,
    config: &GuardConfig,
) -> crate::error::AppResult<()> {
    let claim = cipher.encrypt(WILDCARD)?;
    let token = match config.demo_token.clone() {
        Some(token) => token,
        None => generate_token()?,
    };
    resolver.register(token.clone(), Principal::new("admin", vec![claim]));
    info!("seeded demo administrator; bearer token: {}", token);
    Ok(())
}

/// Start the guard demo server on the configured port.
pub async fn run_with_port(config: GuardConfig) -> anyhow::Result<()> {
    let cipher = ClaimCipher::new(&config.claim_secret);
    let resolver = Arc::new(TokenResolver::new());
    seed_demo_admin(&cipher, &resolver, &config)?;

    let table = demo_table()?;
    info!("route table validated: {} endpoints", table.len());

    let state = AppState {
        table: Arc::new(table),
        guard: Arc::new(Guard::new(resolver, AuthorizationEngine::new(cipher))),
    };
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
