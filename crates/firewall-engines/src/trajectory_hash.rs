//! Trajectory Hash: duplicate/loop detection over a sliding window, keyed
//! by a stable fingerprint of (target, selector, amount-bucketed,
//! calldata-prefix).

use crate::engine::Engine;
use crate::hashutil::sha256_hex;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, TrajectoryConfig, TxView, Verdict, VerdictCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct TrajectoryHash {
    config: TrajectoryConfig,
    /// fingerprint -> timestamps of recent occurrences, private to this
    /// engine (spec: "engine-local state is never shared").
    seen: Mutex<HashMap<String, Vec<Duration>>>,
    blocked_total: AtomicU64,
}

impl TrajectoryHash {
    pub fn new(config: TrajectoryConfig) -> Self {
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
            blocked_total: AtomicU64::new(0),
        }
    }

    fn fingerprint(&self, tx: &TxView) -> String {
        let scale = 10f64.powi(self.config.amount_bucket_decimals as i32);
        let bucketed_amount = (tx.amount * scale).round() / scale;
        let data_prefix: String = tx
            .data
            .chars()
            .take(self.config.fingerprint_data_prefix)
            .collect();
        let raw = format!(
            "{}|{}|{:.*}|{}",
            tx.target, tx.function, self.config.amount_bucket_decimals as usize, bucketed_amount, data_prefix
        );
        sha256_hex(raw.as_bytes())
    }
}

#[async_trait]
impl Engine for TrajectoryHash {
    fn name(&self) -> &'static str {
        "TrajectoryHash"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, clock: &dyn Clock) -> Verdict {
        let fp = self.fingerprint(tx);
        let now = clock.now();
        let window = Duration::from_secs(self.config.window_seconds);

        let mut seen = self.seen.lock().expect("trajectory hash lock poisoned");
        let entries = seen.entry(fp).or_insert_with(Vec::new);
        entries.retain(|t| now.saturating_sub(*t) <= window);

        let occurrences_before = entries.len() as u32;
        entries.push(now);

        if occurrences_before >= self.config.max_duplicates {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockLoop,
                EngineId::TrajectoryHash,
                "identical transaction repeated too many times in the trailing window",
                "This exact transaction (same destination, selector, and amount) has been \
                 submitted too many times recently. Retrying unchanged will fail; wait or \
                 adjust the parameters.",
            );
        }

        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}
