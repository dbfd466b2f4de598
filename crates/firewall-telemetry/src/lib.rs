//! Shared `tracing` + `prometheus` initialization for the gateway and
//! vault processes.

mod metrics;

pub use metrics::{
    encode_metrics, install_firewall_metrics, observe_request_duration, record_block,
    record_request, set_sever_active,
};

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber once per process. JSON output
/// by default; pass `pretty = true` for a human-readable console format in
/// local development.
///
/// Safe to call more than once — subsequent calls are no-ops, since
/// `tracing`'s global dispatcher can only be set a single time.
pub fn init_tracing(pretty: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt().with_env_filter(filter).with_target(true);

    let result = if pretty {
        subscriber.pretty().try_init()
    } else {
        subscriber.json().try_init()
    };

    if let Err(err) = result {
        tracing::debug!(target: "firewall-telemetry", %err, "tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing(true);
        init_tracing(true);
    }
}
