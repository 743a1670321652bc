//! HTTP services: token-protected recommend, the `/ask` gateway, and login.

mod error;
pub mod handlers;
pub mod middleware;

pub use error::ApiError;
pub use middleware::CurrentUser;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenIssuer;
use crate::config::{GatewayConfig, LoginConfig};
use crate::db::Database;

/// Shared context for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub tokens: TokenIssuer,
    pub config: GatewayConfig,
    pub client: reqwest::Client,
}

impl GatewayState {
    pub fn new(tokens: TokenIssuer, config: GatewayConfig) -> Self {
        Self {
            tokens,
            config,
            client: reqwest::Client::new(),
        }
    }
}

/// Shared context for the login handlers.
#[derive(Clone)]
pub struct LoginState {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub config: LoginConfig,
}

pub fn recommend_router(tokens: TokenIssuer) -> Router {
    let protected = Router::new()
        .route("/recommend", post(handlers::recommend))
        .route_layer(from_fn_with_state(tokens, middleware::require_bearer));

    Router::new()
        .merge(protected)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ask", get(handlers::ask))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn login_router(state: LoginState) -> Router {
    Router::new()
        .route("/api/login_api", post(handlers::login_api))
        .route("/api/login", post(handlers::login))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
