//! Prometheus metric registration: `OnceCell`-guarded `register_*` calls
//! plus a `get_metric!` macro so callers never touch the registry directly.

use once_cell::sync::OnceCell;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, Encoder, Gauge,
    HistogramVec, IntCounterVec, TextEncoder,
};

static FIREWALL_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static FIREWALL_BLOCK_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static FIREWALL_REQUEST_DURATION: OnceCell<HistogramVec> = OnceCell::new();
static FIREWALL_SEVER_ACTIVE: OnceCell<Gauge> = OnceCell::new();

/// Registers every firewall metric with the default Prometheus registry.
/// Must be called exactly once before any of the `record_*`/`observe_*`
/// helpers, typically from `main()` right after `init_tracing`.
pub fn install_firewall_metrics() {
    let _ = FIREWALL_REQUESTS_TOTAL.set(
        register_int_counter_vec!(
            "firewall_requests_total",
            "Total requests handled by the intercept proxy",
            &["route", "result"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = FIREWALL_BLOCK_TOTAL.set(
        register_int_counter_vec!(
            "firewall_block_total",
            "Total BLOCK verdicts by engine and code",
            &["engine", "code"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = FIREWALL_REQUEST_DURATION.set(
        register_histogram_vec!(
            "firewall_request_duration_seconds",
            "End-to-end request latency through the intercept proxy",
            &["route"]
        )
        .expect("register_histogram_vec"),
    );
    let _ = FIREWALL_SEVER_ACTIVE.set(
        register_gauge!(
            "firewall_sever_active",
            "1 if the global firewall is currently in a Cognitive Sever lockout, else 0"
        )
        .expect("register_gauge"),
    );
}

macro_rules! get_metric {
    ($m:ident) => {
        $m.get()
            .expect("install_firewall_metrics() must be called before serving")
    };
}

pub fn record_request(route: &str, result: &str) {
    get_metric!(FIREWALL_REQUESTS_TOTAL)
        .with_label_values(&[route, result])
        .inc();
}

pub fn record_block(engine: &str, code: &str) {
    get_metric!(FIREWALL_BLOCK_TOTAL)
        .with_label_values(&[engine, code])
        .inc();
}

pub fn observe_request_duration(route: &str, seconds: f64) {
    get_metric!(FIREWALL_REQUEST_DURATION)
        .with_label_values(&[route])
        .observe(seconds);
}

pub fn set_sever_active(active: bool) {
    get_metric!(FIREWALL_SEVER_ACTIVE).set(if active { 1.0 } else { 0.0 });
}

/// Renders the current registry in Prometheus text exposition format, for
/// the gateway's `GET /metrics` handler.
pub fn encode_metrics() -> Result<Vec<u8>, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    encoder
        .encode(&metric_families, &mut buf)
        .map_err(|e| e.to_string())?;
    Ok(buf)
}
