//! Entropy Guard: Shannon-entropy scan of string fields for embedded
//! secrets. Stateless.

use crate::engine::Engine;
use crate::hashutil::shannon_entropy;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, EntropyConfig, TxView, Verdict, VerdictCode};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct EntropyGuard {
    config: EntropyConfig,
    blocked_total: AtomicU64,
}

impl EntropyGuard {
    pub fn new(config: EntropyConfig) -> Self {
        Self {
            config,
            blocked_total: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Engine for EntropyGuard {
    fn name(&self) -> &'static str {
        "EntropyGuard"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, _clock: &dyn Clock) -> Verdict {
        for (field, value) in tx.string_fields() {
            if value.len() < self.config.min_length {
                continue;
            }
            let entropy = shannon_entropy(value.as_bytes());
            if entropy >= self.config.entropy_threshold {
                self.blocked_total.fetch_add(1, Ordering::Relaxed);
                return Verdict::block(
                    VerdictCode::BlockEntropy,
                    EngineId::EntropyGuard,
                    format!("field '{field}' has high entropy, likely an embedded secret"),
                    "A field in this transaction looks like an embedded secret (high-entropy \
                     string). Retrying with the same payload will fail; remove the suspicious \
                     field.",
                );
            }
        }
        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}
