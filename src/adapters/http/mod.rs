//! HTTP adapters - REST API implementations.
//!
//! `build_router` assembles the billing routes, the health probe and the
//! shared tower layers.

pub mod billing;
pub mod middleware;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub use billing::{billing_routes, BillingAppState};

/// Build the application router.
///
/// # Routes
/// - `GET /health`
/// - `POST /subscription/checkout`
/// - `POST /subscription/stripe-webhook`
pub fn build_router(state: BillingAppState, server: &ServerConfig) -> Router {
    let webhook_body_limit = state.webhook_body_limit;

    Router::new()
        .route("/health", get(billing::handlers::health))
        .nest("/subscription", billing_routes(webhook_body_limit))
        .with_state(state)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}
