//! # vaq-pay
//!
//! ePayco payment bridge for the VAQ app.
//!
//! ## Usage
//!
//! ```bash
//! export EPAYCO_PUBLIC_KEY=...
//! export EPAYCO_PRIVATE_KEY=...
//! export EPAYCO_CUSTOMER_ID=...
//! export EPAYCO_P_KEY=...
//! export BASE_URL=https://pay.vaq.app
//!
//! vaq-pay
//! ```

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vaq_api::{routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FORMAT=json for log collectors, human-readable otherwise
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;

    info!("Environment: {}", state.config.environment);
    info!(
        "Gateway: {}, appointment store: {}",
        state.gateway.provider_name(),
        state.store.store_name()
    );
    info!("Webhooks: {} | {}", state.urls.response, state.urls.confirmation);

    let is_prod = state.config.is_production();
    let app = routes::create_router(state);

    info!("vaq-pay {} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Checkout: POST http://{}/start-checkout", addr);
        info!("Charge: POST http://{}/charge-appointment", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
