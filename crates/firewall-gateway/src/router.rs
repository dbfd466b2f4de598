//! Builds the axum `Router`: a rate-limited POST surface plus a
//! CORS-relaxed observability surface, merged under one `FirewallApp`
//! state.

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, IpLimiter};
use crate::state::FirewallApp;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use firewall_config_cache::ParameterSource;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn build_router<S: ParameterSource + 'static>(
    app: Arc<FirewallApp<S>>,
    rps: u32,
    burst: u32,
) -> Router {
    let limiter = IpLimiter::new(rps, burst);

    let observability = Router::new()
        .route("/health", get(handlers::health::<S>))
        .route("/api/threat-feed", get(handlers::threat_feed::<S>))
        .route("/api/engines", get(handlers::engines::<S>))
        .route("/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive());

    let proxy = Router::new()
        .route("/", post(handlers::global_proxy::<S>))
        .route("/v1/:principal", post(handlers::principal_proxy::<S>))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    observability.merge(proxy).with_state(app)
}
