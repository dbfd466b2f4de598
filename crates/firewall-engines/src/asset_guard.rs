//! Asset Guard: token/asset eligibility check.
//!
//! The configuration surface is treated as an allow-list of asset
//! (destination contract) addresses plus a deny-list of function
//! selectors, pending clearer requirements upstream. Stateless.

use crate::engine::Engine;
use async_trait::async_trait;
use firewall_types::{AssetConfig, Clock, EngineId, TxView, Verdict, VerdictCode};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct AssetGuard {
    config: AssetConfig,
    blocked_total: AtomicU64,
}

impl AssetGuard {
    pub fn new(config: AssetConfig) -> Self {
        Self {
            config,
            blocked_total: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Engine for AssetGuard {
    fn name(&self) -> &'static str {
        "AssetGuard"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, _clock: &dyn Clock) -> Verdict {
        if !tx.function.is_empty() && self.config.deny_list.contains(&tx.function) {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockAsset,
                EngineId::AssetGuard,
                "function selector touches a disallowed asset operation",
                "This call touches an asset operation that is not permitted. Retrying with the \
                 same selector will fail.",
            );
        }

        if !self.config.allow_list.is_empty() && !self.config.allow_list.contains(&tx.target) {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockAsset,
                EngineId::AssetGuard,
                "destination asset is not on the allow list",
                "This destination is not an approved asset for this principal. Retrying with \
                 the same target will fail.",
            );
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

    #[tokio::test]
    async fn deny_listed_selector_blocks() {
        let cfg = AssetConfig {
            enabled: true,
            allow_list: vec![],
            deny_list: vec!["0xdeadbeef".into()],
        };
        let guard = AssetGuard::new(cfg);
        let tx = TxView {
            function: "0xdeadbeef".into(),
            ..Default::default()
        };
        let clock = SystemClock::new();
        assert!(guard.evaluate(&tx, 1.0, &clock).await.blocked);
    }

    #[tokio::test]
    async fn non_allow_listed_target_blocks_when_allow_list_set() {
        let cfg = AssetConfig {
            enabled: true,
            allow_list: vec!["0xusdc".into()],
            deny_list: vec![],
        };
        let guard = AssetGuard::new(cfg);
        let tx = TxView {
            target: "0xother".into(),
            ..Default::default()
        };
        let clock = SystemClock::new();
        assert!(guard.evaluate(&tx, 1.0, &clock).await.blocked);
    }

    #[tokio::test]
    async fn allow_listed_target_passes() {
        let cfg = AssetConfig {
            enabled: true,
            allow_list: vec!["0xusdc".into()],
            deny_list: vec![],
        };
        let guard = AssetGuard::new(cfg);
        let tx = TxView {
            target: "0xusdc".into(),
            ..Default::default()
        };
        let clock = SystemClock::new();
        assert!(!guard.evaluate(&tx, 1.0, &clock).await.blocked);
    }
}
