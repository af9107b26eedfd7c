//! jobboard-billing server binary.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use jobboard_billing::adapters::http::{build_router, BillingAppState};
use jobboard_billing::adapters::postgres::{
    self, PostgresSubscriptionLedger, PostgresUserRepository,
};
use jobboard_billing::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use jobboard_billing::application::CheckoutRedirects;
use jobboard_billing::config::{AppConfig, LogFormat};
use jobboard_billing::domain::billing::StripeWebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = postgres::connect(&config.database).await?;
    postgres::prepare_schema(&pool, config.database.migrations).await?;

    let payment = &config.payment;
    if payment.is_live_mode() && !config.is_production() {
        tracing::warn!("Stripe live key configured outside production");
    }

    let stripe = StripePaymentAdapter::new(
        StripeConfig::new(payment.api_key()).with_base_url(payment.stripe_api_base_url.clone()),
    );
    let verifier = StripeWebhookVerifier::new(payment.webhook_secret())
        .with_tolerance_secs(payment.webhook_tolerance_secs)
        .with_require_livemode(payment.require_livemode);

    let state = BillingAppState {
        user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
        subscription_ledger: Arc::new(PostgresSubscriptionLedger::new(pool)),
        payment_provider: Arc::new(stripe),
        webhook_verifier: Arc::new(verifier),
        checkout_redirects: CheckoutRedirects::from_frontend_url(&payment.frontend_url),
        webhook_body_limit: payment.webhook_body_limit_bytes,
    };

    let app = build_router(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    match config.server.log_format() {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
