//! Threat Feed: exact-match deny list over addresses, selectors, and
//! calldata hashes.

use crate::engine::Engine;
use crate::hashutil::sha256_hex;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, ThreatFeedConfig, TxView, Verdict, VerdictCode};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Calldata is matched by the first N hex characters of its SHA-256 digest,
/// not the full digest, so near-duplicate payloads sharing a steganographic
/// prefix are still caught.
const CALLDATA_HASH_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct ThreatFeedSeed {
    pub addresses: Vec<String>,
    pub selectors: Vec<String>,
    pub calldata_hash_prefixes: Vec<String>,
}

/// A handful of illustrative, clearly-fake seed entries in the same shape
/// real deny-list data would take. A production deployment replaces these
/// via `ThreatFeed::merge_additive` from an external feed.
pub fn curated_seed() -> ThreatFeedSeed {
    ThreatFeedSeed {
        addresses: vec![
            "0x000000000000000000000000000000000baadf".to_string(),
            "0x000000000000000000000000000000000dead1".to_string(),
        ],
        selectors: vec![
            // `approve(address,uint256)` with max uint256 is a common
            // drainer pattern when paired with a denylisted spender; the
            // selector alone is not inherently malicious, it's listed here
            // only as an illustrative seed entry.
            "0x095ea7b3".to_string(),
        ],
        calldata_hash_prefixes: vec![],
    }
}

struct ThreatFeedState {
    addresses: HashSet<String>,
    selectors: HashSet<String>,
    calldata_hash_prefixes: HashSet<String>,
    version: u64,
    consensus_count: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ThreatFeedStats {
    pub addresses: usize,
    pub selectors: usize,
    pub calldata_hash_prefixes: usize,
    pub version: u64,
    pub consensus_count: u64,
}

/// An additive update merged in from an external distribution channel.
/// Cloud sync merges are additive and versioned; entries are never
/// removed by a merge.
#[derive(Debug, Clone, Default)]
pub struct ThreatFeedUpdate {
    pub addresses: Vec<String>,
    pub selectors: Vec<String>,
    pub calldata_hash_prefixes: Vec<String>,
    pub consensus_count: u64,
}

pub struct ThreatFeed {
    config: ThreatFeedConfig,
    state: RwLock<ThreatFeedState>,
    blocked_total: AtomicU64,
}

impl ThreatFeed {
    pub fn new(config: ThreatFeedConfig, seed: ThreatFeedSeed) -> Self {
        Self {
            config,
            state: RwLock::new(ThreatFeedState {
                addresses: seed.addresses.into_iter().collect(),
                selectors: seed.selectors.into_iter().collect(),
                calldata_hash_prefixes: seed.calldata_hash_prefixes.into_iter().collect(),
                version: 1,
                consensus_count: 0,
            }),
            blocked_total: AtomicU64::new(0),
        }
    }

    /// Additive merge from an external feed. Never removes entries.
    pub fn merge_additive(&self, update: ThreatFeedUpdate) {
        let mut state = self.state.write().expect("threat feed lock poisoned");
        state.addresses.extend(update.addresses);
        state.selectors.extend(update.selectors);
        state
            .calldata_hash_prefixes
            .extend(update.calldata_hash_prefixes);
        state.version += 1;
        state.consensus_count = state.consensus_count.max(update.consensus_count);
    }

    pub fn stats(&self) -> ThreatFeedStats {
        let state = self.state.read().expect("threat feed lock poisoned");
        ThreatFeedStats {
            addresses: state.addresses.len(),
            selectors: state.selectors.len(),
            calldata_hash_prefixes: state.calldata_hash_prefixes.len(),
            version: state.version,
            consensus_count: state.consensus_count,
        }
    }
}

#[async_trait]
impl Engine for ThreatFeed {
    fn name(&self) -> &'static str {
        "ThreatFeed"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, _clock: &dyn Clock) -> Verdict {
        let state = self.state.read().expect("threat feed lock poisoned");

        if !tx.target.is_empty() && state.addresses.contains(&tx.target) {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockDenylist,
                EngineId::ThreatFeed,
                "destination address is on the threat feed deny list",
                "This destination address is on the threat feed deny list. Retrying with the \
                 same target will fail; choose a different destination.",
            );
        }

        if !tx.function.is_empty() && state.selectors.contains(&tx.function) {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockDenylist,
                EngineId::ThreatFeed,
                "function selector is on the threat feed deny list",
                "This function selector is on the threat feed deny list. Retrying with the \
                 same call data will fail.",
            );
        }

        if !tx.data.is_empty() {
            let digest = sha256_hex(tx.data.as_bytes());
            let prefix = &digest[..CALLDATA_HASH_PREFIX_LEN.min(digest.len())];
            if state.calldata_hash_prefixes.contains(prefix) {
                self.blocked_total.fetch_add(1, Ordering::Relaxed);
                return Verdict::block(
                    VerdictCode::BlockDenylist,
                    EngineId::ThreatFeed,
                    "calldata matches a known-malicious hash prefix",
                    "This call data matches a known-malicious payload fingerprint. Retrying \
                     with the same data will fail.",
                );
            }
        }

        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}

/// Forwarding impl so an `Arc<ThreatFeed>` can sit in the pipeline's
/// `Vec<Box<dyn Engine>>` while the orchestrator keeps its own typed clone
/// for `/api/threat-feed` stats, without running two independently-stateful
/// copies of the feed.
#[async_trait]
impl Engine for std::sync::Arc<ThreatFeed> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn enabled(&self) -> bool {
        self.as_ref().enabled()
    }

    async fn evaluate(&self, tx: &TxView, spend: f64, clock: &dyn Clock) -> Verdict {
        self.as_ref().evaluate(tx, spend, clock).await
    }

    fn blocked_total(&self) -> u64 {
        self.as_ref().blocked_total()
    }
}
