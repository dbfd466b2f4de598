//! The shared contract every detection engine implements.
//!
//! Modeled as a small capability interface (trait object) rather than a sum
//! type, since engines carry heterogeneous private state (sets, leaky
//! buckets, gas-ratio histories) and the pipeline only ever needs to call
//! `evaluate` in a fixed, already-known order.

use async_trait::async_trait;
use firewall_types::{Clock, TxView, Verdict};

/// One deterministic detector in the pipeline.
///
/// Implementations must be deterministic given equal internal state and
/// inputs (P1). `evaluate` is `async` only so the EVM Simulator can await a
/// network call under a deadline; every other engine's body never suspends,
/// so no lock is ever held across an await point.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Human-readable name used in the `/api/engines` summary.
    fn name(&self) -> &'static str;

    /// Whether this engine is enabled. A disabled engine must be skipped by
    /// the orchestrator without calling `evaluate`, so it costs O(1) and
    /// never touches its internal state.
    fn enabled(&self) -> bool;

    /// Evaluate a normalized transaction. `spend` is the firewall-computed
    /// spend amount, usually equal to `tx.amount` but overridable by the
    /// orchestrator.
    async fn evaluate(&self, tx: &TxView, spend: f64, clock: &dyn Clock) -> Verdict;

    /// Total BLOCK verdicts this engine has produced, for `/api/engines`.
    fn blocked_total(&self) -> u64;
}
