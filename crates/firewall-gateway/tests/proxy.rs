//! End-to-end tests against the in-process `axum` router: hermetic except
//! for a local fake upstream bound to an ephemeral port, since
//! `forward_upstream` always makes a real HTTP call.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use firewall_config_cache::{ParameterSource, PrincipalParams, WhitelistEntry};
use firewall_gateway::{build_router, FirewallApp};
use firewall_types::FirewallConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Always reports a fixed owner/whitelist module and lets the caller decide
/// what addresses are active, so each test controls whitelist outcomes
/// without touching the network.
struct FakeParameterSource {
    whitelist: Vec<WhitelistEntry>,
}

#[async_trait]
impl ParameterSource for FakeParameterSource {
    async fn fetch_principal_params(&self, _principal: &str) -> Result<PrincipalParams, String> {
        Ok(PrincipalParams {
            velocity_module: "0xvelocity".into(),
            whitelist_module: "0xwhitelist".into(),
            emergency_locked: false,
            owner: "0xowner".into(),
            max_per_hour: 0.0,
            max_single_tx: 0.0,
            drawdown_bps: 0,
        })
    }

    async fn fetch_whitelist(&self, _module: &str) -> Result<Vec<WhitelistEntry>, String> {
        Ok(self.whitelist.clone())
    }
}

async fn spawn_fake_upstream() -> String {
    async fn echo_ok() -> Json<Value> {
        Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0xdeadbeef"}))
    }
    let app = Router::new().route("/", post(echo_ok));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_app(upstream: &str, whitelist: Vec<WhitelistEntry>) -> Arc<FirewallApp<FakeParameterSource>> {
    test_app_with_config(upstream, whitelist, FirewallConfig::default())
}

fn test_app_with_config(
    upstream: &str,
    whitelist: Vec<WhitelistEntry>,
    config: FirewallConfig,
) -> Arc<FirewallApp<FakeParameterSource>> {
    Arc::new(FirewallApp::with_parameter_source(
        config,
        upstream.to_string(),
        FakeParameterSource { whitelist },
    ))
}

fn send_tx(method: &str, to: &str, value_hex: &str) -> Body {
    Body::from(
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [{"to": to, "value": value_hex, "from": "0xsender"}],
        })
        .to_string(),
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn send_tx_with_memo(to: &str, value_hex: &str, memo: &str) -> Body {
    Body::from(
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_sendTransaction",
            "params": [{"to": to, "value": value_hex, "from": "0xsender", "memo": memo}],
        })
        .to_string(),
    )
}

#[tokio::test]
async fn s1_read_only_call_forwards_without_touching_engines() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "id": 1, "method": "eth_getBalance", "params": ["0xabc"]})
                .to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "0xdeadbeef");
}

#[tokio::test]
async fn global_route_allows_small_transfer_and_forwards() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(send_tx(
            "eth_sendTransaction",
            "0xaaaabbbbccccddddeeeeffff0000111122223333",
            "0x2386F26FC10000", // 0.01 native units
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "0xdeadbeef");
}

#[tokio::test]
async fn s2_single_transaction_cap_blocks() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    // Default velocity.max_single_amount is 2000.0 native units; 0xA968163F0A57B400000
    // is 50000 ether-equivalent wei, comfortably over the cap.
    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(send_tx(
            "eth_sendTransaction",
            "0xaaaabbbbccccddddeeeeffff0000111122223333",
            "0xA968163F0A57B400000",
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["blocked"], true);
    assert_eq!(body["code"], "BLOCK_SINGLE_CAP");
}

#[tokio::test]
async fn s3_identical_call_repeated_blocks_on_third_attempt() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    for expected_status in [StatusCode::OK, StatusCode::OK, StatusCode::FORBIDDEN] {
        let request = Request::post("/")
            .header("content-type", "application/json")
            .body(send_tx(
                "eth_sendTransaction",
                "0xaaaabbbbccccddddeeeeffff0000111122223333",
                "0x2386F26FC10000",
            ))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected_status);
        if expected_status == StatusCode::FORBIDDEN {
            let body = body_json(response).await;
            assert_eq!(body["code"], "BLOCK_LOOP");
        }
    }
}

#[tokio::test]
async fn s4_high_entropy_memo_blocks() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    // A perfectly uniform 64-char hex string sits exactly at the default
    // 4.0 bits/byte entropy threshold.
    let memo = "0123456789abcdef".repeat(4);
    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(send_tx_with_memo(
            "0xaaaabbbbccccddddeeeeffff0000111122223333",
            "0x1",
            &memo,
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BLOCK_ENTROPY");
}

#[tokio::test]
async fn s5_principal_route_blocks_destination_not_on_whitelist_before_engines_run() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(
        &upstream,
        vec![WhitelistEntry {
            address: "0xaaaabbbbccccddddeeeeffff0000111122223333".into(),
            active: true,
        }],
    );
    let router = build_router(app, 1000, 1000);

    // Destination is not the whitelisted address, so this should be BLOCKed
    // purely on whitelist grounds even though the amount is within all
    // engine-level caps.
    let request = Request::post("/v1/0x1111111111111111111111111111111111111111")
        .header("content-type", "application/json")
        .body(send_tx(
            "eth_sendTransaction",
            "0x9999999999999999999999999999999999999999",
            "0x2386F26FC10000",
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BLOCK_WHITELIST");
}

#[tokio::test]
async fn s5_principal_route_allows_whitelisted_destination() {
    let upstream = spawn_fake_upstream().await;
    let whitelisted = "0xaaaabbbbccccddddeeeeffff0000111122223333";
    let app = test_app(
        &upstream,
        vec![WhitelistEntry {
            address: whitelisted.into(),
            active: true,
        }],
    );
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/v1/0x1111111111111111111111111111111111111111")
        .header("content-type", "application/json")
        .body(send_tx("eth_sendTransaction", whitelisted, "0x2386F26FC10000"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn s6_sever_trips_after_strike_max_distinct_blocks() {
    let upstream = spawn_fake_upstream().await;
    let mut config = FirewallConfig::default();
    config.strike_max = 2;
    config.strike_window_secs = 60;
    config.sever_duration_secs = 30;
    // Force every call to BLOCK on TrajectoryHash regardless of payload, so
    // each of the two calls below counts as a sever strike.
    config.trajectory.max_duplicates = 0;
    let app = test_app_with_config(&upstream, vec![], config);
    let router = build_router(app, 1000, 1000);

    let destinations = [
        "0x1111111111111111111111111111111111111a",
        "0x2222222222222222222222222222222222222b",
    ];
    for to in destinations {
        let request = Request::post("/")
            .header("content-type", "application/json")
            .body(send_tx("eth_sendTransaction", to, "0x1"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // A third, brand-new destination would otherwise be clean, but the
    // firewall is now SEVERED.
    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(send_tx(
            "eth_sendTransaction",
            "0x3333333333333333333333333333333333333c",
            "0x1",
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BLOCK_SEVER");
}

#[tokio::test]
async fn malformed_json_body_yields_400() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_principal_yields_400() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/v1/not-an-address")
        .header("content-type", "application/json")
        .body(send_tx(
            "eth_sendTransaction",
            "0xaaaabbbbccccddddeeeeffff0000111122223333",
            "0x1",
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upstream_down_yields_502() {
    // Port 9 is the "discard" service; nothing answers HTTP there, so the
    // forward attempt fails at the transport level.
    let app = test_app("http://127.0.0.1:9", vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::post("/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "id": 1, "method": "eth_getBalance", "params": ["0xabc"]})
                .to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_endpoint_reports_stats() {
    let upstream = spawn_fake_upstream().await;
    let app = test_app(&upstream, vec![]);
    let router = build_router(app, 1000, 1000);

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}
