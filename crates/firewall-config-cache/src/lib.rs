//! Per-principal configuration and whitelist resolver.
//!
//! Reads a fixed sequence of parameter calls from an upstream chain RPC
//! (module addresses, emergency-lock flag, owner, module parameters, then
//! the whitelist array) and caches the result per principal with a TTL. A
//! fetch failure never blocks forwarding: the cache falls back to the
//! previous cached value if one exists, or to safe defaults on first-time
//! failure.

use async_trait::async_trait;
use dashmap::DashMap;
use firewall_types::{Clock, FirewallConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Hard cap on whitelist entries read per principal.
pub const MAX_WHITELIST_ENTRIES: usize = 100;

/// Module addresses and top-level flags read from the parameter source's
/// first round of calls.
#[derive(Debug, Clone)]
pub struct PrincipalParams {
    pub velocity_module: String,
    pub whitelist_module: String,
    pub emergency_locked: bool,
    pub owner: String,
    pub max_per_hour: f64,
    pub max_single_tx: f64,
    /// Basis points of allowed drawdown per window; currently advisory —
    /// surfaced for operators, not yet consumed by a detection engine.
    pub drawdown_bps: u32,
}

/// One raw whitelist slot. A removal may zero the mapping without
/// shrinking the backing array, hence the explicit `active` flag.
#[derive(Debug, Clone)]
pub struct WhitelistEntry {
    pub address: String,
    pub active: bool,
}

/// Abstraction over the upstream chain RPC used to read per-principal
/// configuration. Production code talks to the same JSON-RPC endpoint the
/// gateway forwards to; tests substitute an in-memory fake.
#[async_trait]
pub trait ParameterSource: Send + Sync {
    async fn fetch_principal_params(&self, principal: &str) -> Result<PrincipalParams, String>;
    async fn fetch_whitelist(&self, whitelist_module: &str) -> Result<Vec<WhitelistEntry>, String>;
}

#[derive(Clone)]
pub struct CacheEntry {
    pub config: FirewallConfig,
    pub whitelist: Arc<HashSet<String>>,
    pub owner: String,
    pub emergency_locked: bool,
    pub fetched_at: Duration,
}

impl CacheEntry {
    fn defaults(base: &FirewallConfig, now: Duration) -> Self {
        Self {
            config: base.clone(),
            whitelist: Arc::new(HashSet::new()),
            owner: String::new(),
            emergency_locked: false,
            fetched_at: now,
        }
    }
}

pub struct ConfigCache<S: ParameterSource> {
    source: S,
    base_config: FirewallConfig,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CacheEntry>,
}

impl<S: ParameterSource> ConfigCache<S> {
    pub fn new(source: S, base_config: FirewallConfig, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            base_config,
            ttl: Duration::from_secs(ttl_secs),
            clock,
            entries: DashMap::new(),
        }
    }

    /// Resolves the effective configuration and whitelist for `principal`,
    /// refreshing from the parameter source if the cached entry is missing
    /// or has expired. Never fails: a fetch error degrades to the previous
    /// entry, or to safe defaults if there is none yet.
    pub async fn resolve(&self, principal: &str) -> CacheEntry {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(principal) {
            if now.saturating_sub(entry.fetched_at) < self.ttl {
                return entry.clone();
            }
        }

        match self.fetch_fresh(principal, now).await {
            Ok(entry) => {
                self.entries.insert(principal.to_string(), entry.clone());
                entry
            }
            Err(reason) => {
                tracing::warn!(
                    target: "firewall-config-cache",
                    principal,
                    reason,
                    "parameter source fetch failed, falling back"
                );
                if let Some(stale) = self.entries.get(principal) {
                    stale.clone()
                } else {
                    let fallback = CacheEntry::defaults(&self.base_config, now);
                    self.entries.insert(principal.to_string(), fallback.clone());
                    fallback
                }
            }
        }
    }

    async fn fetch_fresh(&self, principal: &str, now: Duration) -> Result<CacheEntry, String> {
        let params = self.source.fetch_principal_params(principal).await?;
        let raw_whitelist = self.source.fetch_whitelist(&params.whitelist_module).await?;

        let whitelist: HashSet<String> = raw_whitelist
            .into_iter()
            .take(MAX_WHITELIST_ENTRIES)
            .filter(|entry| entry.active)
            .map(|entry| entry.address.to_lowercase())
            .collect();

        let mut config = self.base_config.clone();
        if params.max_per_hour > 0.0 {
            config.velocity.v_max = params.max_per_hour;
        }
        if params.max_single_tx > 0.0 {
            config.velocity.max_single_amount = params.max_single_tx;
        }

        Ok(CacheEntry {
            config,
            whitelist: Arc::new(whitelist),
            owner: params.owner,
            emergency_locked: params.emergency_locked,
            fetched_at: now,
        })
    }
}
