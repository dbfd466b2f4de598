//! Request handlers for the Intercept Proxy.

use crate::error::AppError;
use crate::state::FirewallApp;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use firewall_config_cache::ParameterSource;
use firewall_core::{Classification, Normalizer};
use firewall_telemetry as telemetry;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

const PRINCIPAL_HEX_LEN: usize = 42;

fn is_valid_principal(principal: &str) -> bool {
    principal.len() == PRINCIPAL_HEX_LEN
        && principal.starts_with("0x")
        && principal[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// `POST /` — the global firewall route.
pub async fn global_proxy<S: ParameterSource + 'static>(
    State(app): State<Arc<FirewallApp<S>>>,
    body: axum::body::Bytes,
) -> Response {
    handle_proxy(app, None, &body).await.into_response()
}

/// `POST /v1/{principal}` — the per-principal route, gated additionally by
/// the config cache's whitelist.
pub async fn principal_proxy<S: ParameterSource + 'static>(
    State(app): State<Arc<FirewallApp<S>>>,
    Path(principal): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    let principal = principal.to_lowercase();
    if !is_valid_principal(&principal) {
        return AppError::BadRequest(format!(
            "principal must be a {PRINCIPAL_HEX_LEN}-character hex address"
        ))
        .into_response();
    }
    handle_proxy(app, Some(principal), &body).await.into_response()
}

async fn handle_proxy<S: ParameterSource + 'static>(
    app: Arc<FirewallApp<S>>,
    principal: Option<String>,
    body: &[u8],
) -> Result<Response, AppError> {
    let started = Instant::now();
    let route = if principal.is_some() { "/v1/{principal}" } else { "/" };

    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON-RPC request: {e}")))?;

    match Normalizer::classify(&envelope) {
        Classification::ReadOnly => {
            let response = forward_upstream(&app, &envelope).await?;
            telemetry::record_request(route, "read_only");
            telemetry::observe_request_duration(route, started.elapsed().as_secs_f64());
            Ok(Json(response).into_response())
        }
        Classification::StateChanging(tx) => {
            if let Some(principal) = &principal {
                let entry = app.config_cache.resolve(principal).await;
                if !entry.whitelist.is_empty() && !entry.whitelist.contains(&tx.target) {
                    telemetry::record_request(route, "blocked");
                    telemetry::record_block("WhitelistGate", "BLOCK_WHITELIST");
                    return Ok(block_response(
                        "BLOCK_WHITELIST",
                        "destination address is not on this principal's whitelist",
                        "This destination is not on the configured whitelist for this account. \
                         Retrying with the same target will fail; use an allowed address.",
                    ));
                }

                let firewall = app.firewall_for(principal, entry.config.clone());
                let verdict = firewall.evaluate(&tx).await;
                telemetry::set_sever_active(firewall.is_severed());
                return respond_to_verdict(&app, &envelope, verdict, route, started).await;
            }

            let verdict = app.global_firewall.evaluate(&tx).await;
            telemetry::set_sever_active(app.global_firewall.is_severed());
            respond_to_verdict(&app, &envelope, verdict, route, started).await
        }
    }
}

async fn respond_to_verdict<S: ParameterSource + 'static>(
    app: &FirewallApp<S>,
    envelope: &Value,
    verdict: firewall_types::Verdict,
    route: &str,
    started: Instant,
) -> Result<Response, AppError> {
    telemetry::observe_request_duration(route, started.elapsed().as_secs_f64());
    if verdict.blocked {
        telemetry::record_request(route, "blocked");
        telemetry::record_block(&verdict.engine.to_string(), &verdict.code.to_string());
        return Ok(block_response(
            &verdict.code.to_string(),
            &verdict.reason,
            &verdict.feedback,
        ));
    }

    telemetry::record_request(route, "allowed");
    let response = forward_upstream(app, envelope).await?;
    Ok(Json(response).into_response())
}

fn block_response(code: &str, reason: &str, feedback: &str) -> Response {
    (
        axum::http::StatusCode::FORBIDDEN,
        Json(json!({
            "blocked": true,
            "code": code,
            "reason": reason,
            "feedback": feedback,
        })),
    )
        .into_response()
}

async fn forward_upstream<S: ParameterSource + 'static>(
    app: &FirewallApp<S>,
    envelope: &Value,
) -> Result<Value, AppError> {
    let response = app
        .upstream_client
        .post(&app.default_upstream)
        .json(envelope)
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    response
        .json::<Value>()
        .await
        .map_err(|e| AppError::Upstream(format!("upstream returned malformed JSON: {e}")))
}

pub async fn health<S: ParameterSource + 'static>(State(app): State<Arc<FirewallApp<S>>>) -> Json<Value> {
    let stats = app.global_firewall.stats();
    Json(json!({
        "status": "ok",
        "upstream": app.default_upstream,
        "engines": app.global_firewall.engine_summaries().len(),
        "uptime_secs": app.started_at.elapsed().as_secs(),
        "stats": {
            "total": stats.total,
            "allowed": stats.allowed,
            "blocked": stats.blocked,
        },
    }))
}

pub async fn threat_feed<S: ParameterSource + 'static>(
    State(app): State<Arc<FirewallApp<S>>>,
) -> Json<Value> {
    let stats = app.global_firewall.threat_feed_stats();
    let recent = app.global_firewall.recent_blocks_snapshot();
    Json(json!({
        "addresses": stats.addresses,
        "selectors": stats.selectors,
        "calldata_hash_prefixes": stats.calldata_hash_prefixes,
        "version": stats.version,
        "consensus_count": stats.consensus_count,
        "recent_blocks": recent.iter().map(|b| json!({
            "timestamp_secs": b.timestamp.as_secs(),
            "code": b.code.to_string(),
            "engine": b.engine.to_string(),
            "target": b.target,
            "amount": b.amount,
        })).collect::<Vec<_>>(),
    }))
}

pub async fn engines<S: ParameterSource + 'static>(
    State(app): State<Arc<FirewallApp<S>>>,
) -> Json<Value> {
    let summaries = app.global_firewall.engine_summaries();
    Json(json!({
        "engines": summaries.iter().map(|e| json!({
            "name": e.name,
            "enabled": e.enabled,
            "blocked_total": e.blocked_total,
        })).collect::<Vec<_>>(),
    }))
}

pub async fn metrics() -> Response {
    match telemetry::encode_metrics() {
        Ok(bytes) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            bytes,
        )
            .into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}
