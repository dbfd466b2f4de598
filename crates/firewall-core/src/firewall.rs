//! The Firewall orchestrator: owns the seven detection engines in their
//! fixed evaluation order, aggregates stats, maintains the recent-blocks
//! ring buffer, and applies the two post-verdict policies (Cognitive Sever,
//! Paymaster Slashing).

use crate::sever::CognitiveSever;
use crate::slashing::SlashRegistry;
use firewall_engines::{
    curated_seed, AssetGuard, CapitalVelocity, Engine, EntropyGuard, EvmSimulator,
    PayloadQuantizer, SimulatorClient, ThreatFeed, ThreatFeedStats, TrajectoryHash,
};
use firewall_types::{Clock, EngineId, FirewallConfig, TxView, Verdict, VerdictCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed capacity of the recent-blocks ring buffer.
const RECENT_BLOCKS_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct RecentBlock {
    pub timestamp: Duration,
    pub code: VerdictCode,
    pub engine: EngineId,
    pub target: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallStats {
    pub total: u64,
    pub allowed: u64,
    pub blocked: u64,
}

pub struct EngineSummary {
    pub name: &'static str,
    pub enabled: bool,
    pub blocked_total: u64,
}

pub struct Firewall {
    engines: Vec<Box<dyn Engine>>,
    threat_feed: Arc<ThreatFeed>,
    clock: Arc<dyn Clock>,
    sever: Mutex<CognitiveSever>,
    slash_registry: Arc<SlashRegistry>,
    principal: Option<String>,
    recent_blocks: Mutex<VecDeque<RecentBlock>>,
    total: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
}

impl Firewall {
    /// Builds a firewall with the full fixed pipeline:
    /// ThreatFeed → TrajectoryHash → CapitalVelocity → EntropyGuard →
    /// AssetGuard → PayloadQuantizer → EvmSimulator.
    pub fn new<C: SimulatorClient + 'static>(
        config: FirewallConfig,
        clock: Arc<dyn Clock>,
        simulator_client: C,
        slash_registry: Arc<SlashRegistry>,
        principal: Option<String>,
    ) -> Self {
        let threat_feed = Arc::new(ThreatFeed::new(config.threat_feed.clone(), curated_seed()));
        let engines: Vec<Box<dyn Engine>> = vec![
            Box::new(threat_feed.clone()),
            Box::new(TrajectoryHash::new(config.trajectory.clone())),
            Box::new(CapitalVelocity::new(config.velocity.clone())),
            Box::new(EntropyGuard::new(config.entropy.clone())),
            Box::new(AssetGuard::new(config.asset.clone())),
            Box::new(PayloadQuantizer::new(config.quantizer.clone())),
            Box::new(EvmSimulator::new(
                config.simulator.clone(),
                config.gas_anomaly_ratio,
                simulator_client,
            )),
        ];

        Self {
            engines,
            threat_feed,
            clock,
            sever: Mutex::new(CognitiveSever::new(
                config.cognitive_sever_enabled,
                config.strike_max,
                config.strike_window_secs,
                config.sever_duration_secs,
            )),
            slash_registry,
            principal,
            recent_blocks: Mutex::new(VecDeque::with_capacity(RECENT_BLOCKS_CAPACITY)),
            total: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
        }
    }

    /// Evaluates one normalized transaction. `spend` defaults to
    /// `tx.amount` via [`Self::evaluate`]; this variant exists so callers
    /// that compute an overridden spend amount (e.g., the vault summing a
    /// batched payload) can supply it directly.
    pub async fn evaluate_with_spend(&self, tx: &TxView, spend: f64) -> Verdict {
        let now = self.clock.now();

        if let Some(principal) = &self.principal {
            if self.slash_registry.is_slashed(principal) {
                let verdict = Verdict::block(
                    VerdictCode::BlockSever,
                    EngineId::CognitiveSever,
                    "principal is permanently blocked after repeated simulation reverts",
                    "This account is blocked after repeated failed dry-runs. This is permanent \
                     for the lifetime of this process; contact the operator.",
                );
                self.record_outcome(now, &verdict, tx, false);
                return verdict;
            }
        }

        {
            let mut sever = self.sever.lock().expect("sever lock poisoned");
            if sever.is_severed(now) {
                let verdict = Verdict::block(
                    VerdictCode::BlockSever,
                    EngineId::CognitiveSever,
                    "firewall is in a temporary lockout after too many recent blocks",
                    "The firewall is in a temporary lockout after too many recent blocks. \
                     Retrying now will fail; wait for the lockout to clear.",
                );
                self.record_outcome(now, &verdict, tx, false);
                return verdict;
            }
        }

        let verdict = self.run_pipeline(tx, spend, now).await;
        self.record_outcome(now, &verdict, tx, true);
        verdict
    }

    pub async fn evaluate(&self, tx: &TxView) -> Verdict {
        let spend = tx.amount;
        self.evaluate_with_spend(tx, spend).await
    }

    async fn run_pipeline(&self, tx: &TxView, spend: f64, now: Duration) -> Verdict {
        for engine in &self.engines {
            if !engine.enabled() {
                continue;
            }
            let verdict = engine.evaluate(tx, spend, self.clock.as_ref()).await;
            if verdict.blocked {
                if verdict.engine == EngineId::EvmSimulator && verdict.reason.starts_with("revert:") {
                    if let Some(principal) = &self.principal {
                        self.slash_registry.record_revert(principal, now);
                    }
                }
                return verdict;
            }
        }
        Verdict::allow()
    }

    /// Single critical section for I3 ("counters and ring buffers update
    /// exactly once per evaluation"). `feed_sever` is false for the
    /// already-SEVERED/slashed early exits, so a lockout cannot extend
    /// itself indefinitely off its own BLOCK_SEVER verdicts.
    fn record_outcome(&self, now: Duration, verdict: &Verdict, tx: &TxView, feed_sever: bool) {
        self.total.fetch_add(1, Ordering::SeqCst);
        if verdict.blocked {
            self.blocked.fetch_add(1, Ordering::SeqCst);
            let mut recent = self.recent_blocks.lock().expect("recent_blocks lock poisoned");
            if recent.len() == RECENT_BLOCKS_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(RecentBlock {
                timestamp: now,
                code: verdict.code,
                engine: verdict.engine,
                target: tx.target.clone(),
                amount: tx.amount,
            });
        } else {
            self.allowed.fetch_add(1, Ordering::SeqCst);
        }

        if feed_sever {
            let mut sever = self.sever.lock().expect("sever lock poisoned");
            sever.record(now, verdict.blocked);
        }
    }

    pub fn stats(&self) -> FirewallStats {
        FirewallStats {
            total: self.total.load(Ordering::SeqCst),
            allowed: self.allowed.load(Ordering::SeqCst),
            blocked: self.blocked.load(Ordering::SeqCst),
        }
    }

    pub fn recent_blocks_snapshot(&self) -> Vec<RecentBlock> {
        self.recent_blocks
            .lock()
            .expect("recent_blocks lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn threat_feed_stats(&self) -> ThreatFeedStats {
        self.threat_feed.stats()
    }

    /// Whether this firewall is currently in a Cognitive Sever lockout,
    /// for `/health` and the `firewall_sever_active` gauge.
    pub fn is_severed(&self) -> bool {
        let now = self.clock.now();
        self.sever.lock().expect("sever lock poisoned").is_severed(now)
    }

    pub fn engine_summaries(&self) -> Vec<EngineSummary> {
        self.engines
            .iter()
            .map(|e| EngineSummary {
                name: e.name(),
                enabled: e.enabled(),
                blocked_total: e.blocked_total(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firewall_engines::SimulationOutcome;
    use firewall_types::{TestClock, VelocityConfig};

    struct AlwaysAllowSimulator;

    #[async_trait::async_trait]
    impl SimulatorClient for AlwaysAllowSimulator {
        async fn simulate(&self, _tx: &TxView) -> Result<SimulationOutcome, String> {
            Ok(SimulationOutcome::default())
        }
    }

    fn tx(target: &str, function: &str, amount: f64) -> TxView {
        TxView {
            target: target.into(),
            function: function.into(),
            amount,
            method: "eth_sendTransaction".into(),
            ..Default::default()
        }
    }

    fn firewall(config: FirewallConfig, clock: Arc<dyn Clock>) -> Firewall {
        Firewall::new(
            config,
            clock,
            AlwaysAllowSimulator,
            Arc::new(SlashRegistry::new(3, 300)),
            None,
        )
    }

    #[tokio::test]
    async fn s1_happy_path_allows_and_counts() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let fw = firewall(FirewallConfig::default(), clock);
        let v = fw.evaluate(&tx("0xaaa", "0xa9059cbb", 0.01)).await;
        assert!(!v.blocked);
        let stats = fw.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.blocked, 0);
    }

    #[tokio::test]
    async fn s2_single_cap_blocks_with_capital_velocity_engine() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.velocity = VelocityConfig {
            v_max: 50.0,
            window_seconds: 3600,
            max_single_amount: 2000.0,
            pid_threshold: 1.5,
            ..VelocityConfig::default()
        };
        let fw = firewall(config, clock);
        let v = fw.evaluate(&tx("0xaaa", "0xa9059cbb", 5000.0)).await;
        assert!(v.blocked);
        assert_eq!(v.code, VerdictCode::BlockSingleCap);
        assert_eq!(v.engine, EngineId::CapitalVelocity);
    }

    #[tokio::test]
    async fn s3_loop_blocks_on_third_identical_call() {
        let clock = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.trajectory.max_duplicates = 2;
        config.trajectory.window_seconds = 60;
        let fw = firewall(config, clock.clone());

        let t = tx("0xbbb", "0xa9059cbb", 500.0);
        assert!(!fw.evaluate(&t).await.blocked);
        clock.advance(Duration::from_secs(1));
        assert!(!fw.evaluate(&t).await.blocked);
        clock.advance(Duration::from_secs(1));
        let third = fw.evaluate(&t).await;
        assert!(third.blocked);
        assert_eq!(third.engine, EngineId::TrajectoryHash);
    }

    #[tokio::test]
    async fn s6_sever_trips_and_then_releases() {
        let clock = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.strike_max = 3;
        config.strike_window_secs = 60;
        config.sever_duration_secs = 30;
        // Force every call to BLOCK via the denylist-adjacent loop guard.
        config.trajectory.max_duplicates = 0;
        config.trajectory.window_seconds = 60;
        let fw = firewall(config, clock.clone());

        let distinct = [
            tx("0x111", "0xaaaaaaaa", 1.0),
            tx("0x222", "0xbbbbbbbb", 1.0),
            tx("0x333", "0xcccccccc", 1.0),
        ];
        for t in &distinct {
            let v = fw.evaluate(t).await;
            assert!(v.blocked);
            clock.advance(Duration::from_secs(1));
        }

        // 4th call, on a brand new fingerprint, would otherwise be clean —
        // but the firewall is now SEVERED.
        let fourth = fw.evaluate(&tx("0x444", "0xdddddddd", 1.0)).await;
        assert!(fourth.blocked);
        assert_eq!(fourth.code, VerdictCode::BlockSever);

        clock.advance(Duration::from_secs(31));
        let after_cooldown = fw.evaluate(&tx("0x555", "0xeeeeeeee", 1.0)).await;
        assert!(!after_cooldown.blocked);
    }

    struct UnreachableSimulator;

    #[async_trait::async_trait]
    impl SimulatorClient for UnreachableSimulator {
        async fn simulate(&self, _tx: &TxView) -> Result<SimulationOutcome, String> {
            Err("connection refused".to_string())
        }
    }

    #[tokio::test]
    async fn simulator_unreachable_blocks_without_slashing_the_principal() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.simulator.enabled = true;
        config.simulator.fail_closed = true;
        config.simulator.timeout_ms = 50;
        config.revert_strike_max = 2;
        config.revert_strike_window_secs = 300;
        let revert_strike_max = config.revert_strike_max;
        let slash_registry = Arc::new(SlashRegistry::new(
            revert_strike_max,
            config.revert_strike_window_secs,
        ));
        let fw = Firewall::new(
            config,
            clock,
            UnreachableSimulator,
            slash_registry.clone(),
            Some("0xprincipal".to_string()),
        );

        for _ in 0..revert_strike_max {
            let v = fw.evaluate(&tx("0xaaa", "0xa9059cbb", 1.0)).await;
            assert!(v.blocked);
            assert_eq!(v.code, VerdictCode::BlockSimulation);
        }
        assert!(!slash_registry.is_slashed("0xprincipal"));
    }

    #[tokio::test]
    async fn p1_identical_input_produces_identical_verdict() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.velocity = VelocityConfig {
            v_max: 50.0,
            window_seconds: 3600,
            max_single_amount: 2000.0,
            pid_threshold: 1.5,
            ..VelocityConfig::default()
        };
        // Two independently-constructed firewalls with no shared state,
        // evaluating the same transaction once each: same verdict.
        let fw_a = firewall(config.clone(), clock.clone());
        let fw_b = firewall(config, clock);
        let t = tx("0xaaa", "0xa9059cbb", 5000.0);
        let va = fw_a.evaluate(&t).await;
        let vb = fw_b.evaluate(&t).await;
        assert_eq!(va.blocked, vb.blocked);
        assert_eq!(va.code, vb.code);
        assert_eq!(va.engine, vb.engine);
    }

    #[tokio::test]
    async fn p3_blocked_counter_matches_number_of_block_verdicts() {
        let clock = Arc::new(TestClock::new());
        let mut config = FirewallConfig::default();
        config.trajectory.max_duplicates = 1;
        config.trajectory.window_seconds = 60;
        let fw = firewall(config, clock.clone());

        let t = tx("0xccc", "0xa9059cbb", 1.0);
        let mut blocks_observed: u64 = 0;
        for _ in 0..5 {
            if fw.evaluate(&t).await.blocked {
                blocks_observed += 1;
            }
            clock.advance(Duration::from_secs(1));
        }
        assert_eq!(fw.stats().blocked, blocks_observed);
        assert_eq!(fw.stats().total, 5);
    }

    #[tokio::test]
    async fn p2_read_only_never_reaches_evaluate() {
        // The normalizer, not the firewall, is responsible for read-only
        // exemption — this test documents that `evaluate` is only ever
        // called for state-changing TxViews built by the normalizer,
        // asserting counters move only on calls that do reach it.
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        let fw = firewall(FirewallConfig::default(), clock);
        assert_eq!(fw.stats().total, 0);
    }
}
