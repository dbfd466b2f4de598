//! EVM Simulator: a dry-run against an upstream simulation endpoint. This
//! is the one engine the orchestrator expects to actually
//! suspend — every other engine is CPU-only and returns synchronously, but
//! a network round trip lives here, so `evaluate` genuinely awaits.
//!
//! The reason string on a blocking verdict is prefixed with `revert:`,
//! `gas_anomaly:`, or `unreachable:` so the orchestrator can attribute
//! Paymaster Slashing strikes to the right failure mode without widening
//! the `Verdict` shape. Only `revert:` counts as a revert strike —
//! `unreachable:` is a transport/timeout failure, not evidence the
//! transaction itself reverts, and must not slash a principal.

use crate::engine::Engine;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, SimulatorConfig, TxView, Verdict, VerdictCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of a single dry-run against the simulation endpoint.
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    pub reverted: bool,
    pub revert_reason: Option<String>,
    pub gas_used: Option<u64>,
}

/// Abstraction over the upstream simulator so tests can substitute a fake
/// transport instead of making a real network call.
#[async_trait]
pub trait SimulatorClient: Send + Sync {
    async fn simulate(&self, tx: &TxView) -> Result<SimulationOutcome, String>;
}

/// Talks to a JSON-RPC-ish dry-run endpoint over HTTP.
pub struct HttpSimulatorClient {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpSimulatorClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SimulatorClient for HttpSimulatorClient {
    async fn simulate(&self, tx: &TxView) -> Result<SimulationOutcome, String> {
        let body = serde_json::json!({
            "to": tx.target,
            "data": tx.data,
            "from": tx.from,
            "gas": tx.gas,
            "gasPrice": tx.gas_price,
            "value": tx.value_raw,
        });
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let parsed: SimulatorResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(SimulationOutcome {
            reverted: parsed.reverted,
            revert_reason: parsed.revert_reason,
            gas_used: parsed.gas_used,
        })
    }
}

#[derive(serde::Deserialize)]
struct SimulatorResponse {
    reverted: bool,
    #[serde(default)]
    revert_reason: Option<String>,
    #[serde(default)]
    gas_used: Option<u64>,
}

pub struct EvmSimulator<C: SimulatorClient> {
    config: SimulatorConfig,
    gas_anomaly_ratio: f64,
    client: C,
    blocked_total: AtomicU64,
}

impl<C: SimulatorClient> EvmSimulator<C> {
    pub fn new(config: SimulatorConfig, gas_anomaly_ratio: f64, client: C) -> Self {
        Self {
            config,
            gas_anomaly_ratio,
            client,
            blocked_total: AtomicU64::new(0),
        }
    }

    fn block(&self, code: VerdictCode, reason: impl Into<String>, feedback: &str) -> Verdict {
        self.blocked_total.fetch_add(1, Ordering::Relaxed);
        Verdict::block(code, EngineId::EvmSimulator, reason, feedback)
    }

    fn declared_gas(tx: &TxView) -> Option<u64> {
        tx.gas.as_ref().and_then(|g| {
            g.strip_prefix("0x")
                .and_then(|h| u64::from_str_radix(h, 16).ok())
                .or_else(|| g.parse::<u64>().ok())
        })
    }
}

#[async_trait]
impl<C: SimulatorClient> Engine for EvmSimulator<C> {
    fn name(&self) -> &'static str {
        "EvmSimulator"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, _clock: &dyn Clock) -> Verdict {
        let outcome = tokio::time::timeout(
            Duration::from_millis(self.config.timeout_ms),
            self.client.simulate(tx),
        )
        .await;

        let outcome = match outcome {
            Ok(Ok(o)) => o,
            Ok(Err(ref e)) => {
                tracing::warn!(target: "firewall-engines", error = %e, "simulator transport error");
                return if self.config.fail_closed {
                    self.block(
                        VerdictCode::BlockSimulation,
                        "unreachable: simulation endpoint was unreachable or timed out",
                        "The dry-run simulator could not be reached in time. Retrying \
                         immediately may hit the same failure; this is a fail-closed policy.",
                    )
                } else {
                    Verdict::allow()
                };
            }
            Err(_) => {
                tracing::warn!(target: "firewall-engines", timeout_ms = self.config.timeout_ms, "simulator timed out");
                return if self.config.fail_closed {
                    self.block(
                        VerdictCode::BlockSimulation,
                        "unreachable: simulation endpoint was unreachable or timed out",
                        "The dry-run simulator could not be reached in time. Retrying \
                         immediately may hit the same failure; this is a fail-closed policy.",
                    )
                } else {
                    Verdict::allow()
                };
            }
        };

        if outcome.reverted {
            let reason = outcome
                .revert_reason
                .unwrap_or_else(|| "no revert reason returned".to_string());
            return self.block(
                VerdictCode::BlockSimulation,
                format!("revert: dry-run reverted: {reason}"),
                "This transaction reverts in simulation. Retrying with the same payload will \
                 fail; it will also fail on-chain.",
            );
        }

        if let (Some(declared), Some(used)) = (Self::declared_gas(tx), outcome.gas_used) {
            if declared > 0 {
                let ratio = used as f64 / declared as f64;
                if ratio >= self.gas_anomaly_ratio {
                    return self.block(
                        VerdictCode::BlockSimulation,
                        format!(
                            "gas_anomaly: simulated usage {used} exceeds declared gas {declared} by more than {:.1}x",
                            self.gas_anomaly_ratio
                        ),
                        "Simulated gas usage is wildly inconsistent with the declared gas limit. \
                         Retrying with the same gas limit will fail.",
                    );
                }
            }
        }

        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firewall_types::SystemClock;
    use std::sync::Mutex;

    struct FakeClient {
        outcome: Mutex<Option<Result<SimulationOutcome, String>>>,
        delay: Duration,
    }

    impl FakeClient {
        fn ok(outcome: SimulationOutcome) -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(outcome))),
                delay: Duration::ZERO,
            }
        }

        fn err(msg: &str) -> Self {
            Self {
                outcome: Mutex::new(Some(Err(msg.to_string()))),
                delay: Duration::ZERO,
            }
        }

        fn slow(outcome: SimulationOutcome, delay: Duration) -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(outcome))),
                delay,
            }
        }
    }

    #[async_trait]
    impl SimulatorClient for FakeClient {
        async fn simulate(&self, _tx: &TxView) -> Result<SimulationOutcome, String> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.lock().unwrap().take().unwrap()
        }
    }

    const GAS_ANOMALY_RATIO: f64 = 3.0;

    fn cfg() -> SimulatorConfig {
        SimulatorConfig {
            enabled: true,
            fail_closed: true,
            endpoint: "http://localhost:9999".into(),
            timeout_ms: 50,
        }
    }

    #[tokio::test]
    async fn clean_dry_run_allows() {
        let sim = EvmSimulator::new(
            cfg(),
            GAS_ANOMALY_RATIO,
            FakeClient::ok(SimulationOutcome {
                reverted: false,
                revert_reason: None,
                gas_used: Some(21_000),
            }),
        );
        let tx = TxView {
            gas: Some("21000".into()),
            ..Default::default()
        };
        let clock = SystemClock::new();
        assert!(!sim.evaluate(&tx, 1.0, &clock).await.blocked);
    }

    #[tokio::test]
    async fn revert_blocks_with_revert_prefixed_reason() {
        let sim = EvmSimulator::new(
            cfg(),
            GAS_ANOMALY_RATIO,
            FakeClient::ok(SimulationOutcome {
                reverted: true,
                revert_reason: Some("insufficient balance".into()),
                gas_used: None,
            }),
        );
        let clock = SystemClock::new();
        let v = sim.evaluate(&tx_default(), 1.0, &clock).await;
        assert!(v.blocked);
        assert_eq!(v.code, VerdictCode::BlockSimulation);
        assert!(v.reason.starts_with("revert:"));
    }

    #[tokio::test]
    async fn gas_anomaly_blocks_with_gas_anomaly_prefixed_reason() {
        let sim = EvmSimulator::new(
            cfg(),
            GAS_ANOMALY_RATIO,
            FakeClient::ok(SimulationOutcome {
                reverted: false,
                revert_reason: None,
                gas_used: Some(100_000),
            }),
        );
        let tx = TxView {
            gas: Some("10000".into()),
            ..Default::default()
        };
        let clock = SystemClock::new();
        let v = sim.evaluate(&tx, 1.0, &clock).await;
        assert!(v.blocked);
        assert!(v.reason.starts_with("gas_anomaly:"));
    }

    #[tokio::test]
    async fn generous_declared_gas_does_not_block() {
        let sim = EvmSimulator::new(
            cfg(),
            GAS_ANOMALY_RATIO,
            FakeClient::ok(SimulationOutcome {
                reverted: false,
                revert_reason: None,
                gas_used: Some(21_000),
            }),
        );
        let tx = TxView {
            gas: Some("100000".into()),
            ..Default::default()
        };
        let clock = SystemClock::new();
        assert!(!sim.evaluate(&tx, 1.0, &clock).await.blocked);
    }

    #[tokio::test]
    async fn transport_error_fail_closed_blocks() {
        let sim = EvmSimulator::new(cfg(), GAS_ANOMALY_RATIO, FakeClient::err("connection refused"));
        let clock = SystemClock::new();
        let v = sim.evaluate(&tx_default(), 1.0, &clock).await;
        assert!(v.blocked);
        assert_eq!(v.code, VerdictCode::BlockSimulation);
        assert!(v.reason.starts_with("unreachable:"));
        assert!(!v.reason.starts_with("revert:"));
    }

    #[tokio::test]
    async fn transport_error_fail_open_allows() {
        let mut config = cfg();
        config.fail_closed = false;
        let sim = EvmSimulator::new(config, GAS_ANOMALY_RATIO, FakeClient::err("connection refused"));
        let clock = SystemClock::new();
        assert!(!sim.evaluate(&tx_default(), 1.0, &clock).await.blocked);
    }

    #[tokio::test]
    async fn timeout_fail_closed_blocks() {
        let sim = EvmSimulator::new(
            cfg(),
            GAS_ANOMALY_RATIO,
            FakeClient::slow(SimulationOutcome::default(), Duration::from_millis(500)),
        );
        let clock = SystemClock::new();
        let v = sim.evaluate(&tx_default(), 1.0, &clock).await;
        assert!(v.blocked);
        assert!(v.reason.starts_with("unreachable:"));
    }

    fn tx_default() -> TxView {
        TxView::default()
    }
}
