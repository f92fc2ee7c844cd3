//! x402 facilitator HTTP entrypoint.
//!
//! Launches an Axum server exposing the facilitator interface for payment
//! verification and settlement on Vara networks:
//! - `GET /verify` — verification endpoint description
//! - `POST /verify` — verify a payment payload
//! - `GET /settle` — settlement endpoint description
//! - `POST /settle` — settle an accepted payment on-chain
//! - `GET /supported` — supported payment kinds (version/scheme/network)
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control the bind address
//! - `RPC_URL_VARA`, `RPC_URL_VARA_TESTNET` override chain endpoints
//! - `WAIT_FOR_FINALIZATION`, `SETTLE_TIMEOUT_SECONDS` control settlement
//! - `OTEL_*` variables enable OpenTelemetry export

use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use x402_vara::config::Config;
use x402_vara::facilitator_local::FacilitatorLocal;
use x402_vara::handlers;
use x402_vara::provider_cache::ChainClientCache;
use x402_vara::sig_down::SigDown;
use x402_vara::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _telemetry = Telemetry::init();

    let config = Config::from_env()?;
    let clients = Arc::new(ChainClientCache::from_env());
    let facilitator = Arc::new(FacilitatorLocal::new(clients, config.settle));

    let app = Router::new()
        .merge(handlers::routes())
        .with_state(facilitator)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!("Starting facilitator at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();
    let graceful_shutdown = async move { cancellation_token.cancelled().await };
    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    Ok(())
}
