//! Capital Velocity: single-transaction cap, a PID-damped leaky-bucket
//! velocity governor, and an optional gross-transaction-value ratio cap.
//! The three sub-checks run in order; the first to block stops
//! the others, mirroring the orchestrator's own first-block-wins semantics.

use crate::engine::Engine;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, TxView, Verdict, VerdictCode, VelocityConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const GTV_EPSILON: f64 = 1e-9;

struct VelocityState {
    /// Leaky-bucket accumulator of amounts within the trailing window.
    bucket: f64,
    last_tick: Option<Duration>,
    /// PID accumulators.
    integral: f64,
    prev_error: f64,
    /// (timestamp, amount) pairs within the GTV window.
    gtv_entries: VecDeque<(Duration, f64)>,
    last_single_amount: f64,
}

impl VelocityState {
    fn new() -> Self {
        Self {
            bucket: 0.0,
            last_tick: None,
            integral: 0.0,
            prev_error: 0.0,
            gtv_entries: VecDeque::new(),
            last_single_amount: 0.0,
        }
    }
}

pub struct CapitalVelocity {
    config: VelocityConfig,
    state: Mutex<VelocityState>,
    blocked_total: AtomicU64,
}

impl CapitalVelocity {
    pub fn new(config: VelocityConfig) -> Self {
        Self {
            config,
            state: Mutex::new(VelocityState::new()),
            blocked_total: AtomicU64::new(0),
        }
    }

    fn block(&self, code: VerdictCode, reason: &str, feedback: &str) -> Verdict {
        self.blocked_total.fetch_add(1, Ordering::Relaxed);
        Verdict::block(code, EngineId::CapitalVelocity, reason, feedback)
    }
}

#[async_trait]
impl Engine for CapitalVelocity {
    fn name(&self) -> &'static str {
        "CapitalVelocity"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, _tx: &TxView, spend: f64, clock: &dyn Clock) -> Verdict {
        // Sub-check 1: single-transaction cap.
        if spend > self.config.max_single_amount {
            return self.block(
                VerdictCode::BlockSingleCap,
                "transaction amount exceeds the single-transaction cap",
                "This transaction exceeds the single-transaction cap. Retrying with the same \
                 amount will fail; split it into smaller transfers.",
            );
        }

        let now = clock.now();
        let mut state = self.state.lock().expect("velocity lock poisoned");

        // Sub-check 2: PID-damped velocity governor over a leaky bucket.
        let dt = match state.last_tick {
            Some(last) => now.saturating_sub(last).as_secs_f64(),
            None => 0.0,
        };
        state.last_tick = Some(now);

        let leaked = self.config.v_max * dt;
        state.bucket = (state.bucket - leaked).max(0.0) + spend;

        let setpoint = self.config.v_max * self.config.window_seconds as f64;
        let error = state.bucket - setpoint;
        let derivative = if dt > 0.0 {
            (error - state.prev_error) / dt
        } else {
            0.0
        };
        state.integral += error * dt;
        state.prev_error = error;

        let u = self.config.k_p * error + self.config.k_i * state.integral + self.config.k_d * derivative;

        if u > self.config.pid_threshold {
            return self.block(
                VerdictCode::BlockVelocity,
                "outbound velocity exceeds the configured rate limit",
                "Outbound transaction velocity exceeds the configured rate limit. Retrying \
                 immediately will fail; wait before sending again.",
            );
        }

        // Sub-check 3: gross-transaction-value ratio cap (optional).
        if self.config.gtv_enabled {
            let gtv_window = Duration::from_secs(self.config.gtv_window_seconds);
            state.gtv_entries.retain(|(t, _)| now.saturating_sub(*t) <= gtv_window);

            let cumulative: f64 = state.gtv_entries.iter().map(|(_, a)| a).sum::<f64>() + spend;
            let prev_amount = state.last_single_amount;

            let triggers = spend >= self.config.gtv_min_value
                && (cumulative / prev_amount.max(GTV_EPSILON) > self.config.gtv_max_ratio
                    || cumulative > self.config.gtv_cumulative_max);

            state.gtv_entries.push_back((now, spend));
            state.last_single_amount = spend;

            if triggers {
                return self.block(
                    VerdictCode::BlockVelocity,
                    "cumulative outflow is disproportionate to recent transfer history",
                    "Cumulative outflow relative to your recent transfer history exceeds the \
                     configured ratio cap. Retrying the same amount will fail.",
                );
            }
        }

        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}
