//! The Intercept Proxy: the HTTP surface between an agent and the
//! upstream chain RPC, gated by the firewall. Same layer stack throughout:
//! `ConcurrencyLimitLayer`/`LoadShedLayer`/`TimeoutLayer` behind a
//! `HandleErrorLayer`, `CatchPanicLayer`/`TraceLayer`/
//! `RequestBodyLimitLayer` outside it.

mod error;
mod handlers;
mod parameter_source;
mod rate_limit;
mod router;
mod state;

pub use error::AppError;
pub use parameter_source::HttpParameterSource;
pub use router::build_router;
pub use state::FirewallApp;

use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::BoxError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub struct GatewayConfig {
    pub listen_addr: String,
    pub rps: u32,
    pub burst: u32,
    pub body_limit_kb: usize,
    pub concurrency_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            rps: 20,
            burst: 40,
            body_limit_kb: 256,
            concurrency_limit: 256,
            request_timeout_secs: 30,
        }
    }
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({"error": {"code": "TIMEOUT", "message": "request timed out"}})),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": {"code": "OVERLOADED", "message": err.to_string()}})),
        )
    }
}

pub async fn run_server<S: firewall_config_cache::ParameterSource + 'static>(
    config: GatewayConfig,
    app: Arc<FirewallApp<S>>,
) -> Result<()> {
    let router = build_router(app, config.rps, config.burst).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(map_middleware_error))
            .layer(LoadShedLayer::new())
            .layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            ))),
    );

    let router = router
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024));

    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!(target: "firewall-gateway", %addr, "intercept proxy listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
