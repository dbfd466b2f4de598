//! Paymaster Slashing: a per-principal sliding window of EVM Simulator
//! reverts. Crossing `revert_strike_max` within `revert_strike_window_secs`
//! marks the principal as permanently blocked (until process restart),
//! independent of and outlasting any single per-principal firewall
//! instance — mirrors [`crate::sever::CognitiveSever`] but keyed by
//! principal and never self-clearing.

use dashmap::{DashMap, DashSet};
use std::collections::VecDeque;
use std::time::Duration;

pub struct SlashRegistry {
    revert_max: usize,
    revert_window: Duration,
    strikes: DashMap<String, VecDeque<Duration>>,
    slashed: DashSet<String>,
}

impl SlashRegistry {
    pub fn new(revert_strike_max: u32, revert_strike_window_secs: u64) -> Self {
        Self {
            revert_max: revert_strike_max as usize,
            revert_window: Duration::from_secs(revert_strike_window_secs),
            strikes: DashMap::new(),
            slashed: DashSet::new(),
        }
    }

    pub fn is_slashed(&self, principal: &str) -> bool {
        self.slashed.contains(principal)
    }

    /// Records a simulator revert attributed to `principal` at time `now`.
    /// Returns `true` if this call crossed the threshold and slashed the
    /// principal.
    pub fn record_revert(&self, principal: &str, now: Duration) -> bool {
        let mut entry = self.strikes.entry(principal.to_string()).or_default();
        entry.push_back(now);
        while let Some(&front) = entry.front() {
            if now.saturating_sub(front) > self.revert_window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() >= self.revert_max {
            self.slashed.insert(principal.to_string());
            tracing::error!(
                target: "firewall-core",
                principal,
                reverts = entry.len(),
                "principal slashed after repeated simulation reverts"
            );
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slashes_after_revert_max_within_window() {
        let registry = SlashRegistry::new(3, 300);
        let base = Duration::from_secs(1_000);
        assert!(!registry.is_slashed("0xprincipal"));
        assert!(!registry.record_revert("0xprincipal", base));
        assert!(!registry.record_revert("0xprincipal", base + Duration::from_secs(1)));
        assert!(registry.record_revert("0xprincipal", base + Duration::from_secs(2)));
        assert!(registry.is_slashed("0xprincipal"));
    }

    #[test]
    fn slashing_is_scoped_per_principal() {
        let registry = SlashRegistry::new(2, 60);
        let now = Duration::from_secs(10);
        registry.record_revert("0xone", now);
        registry.record_revert("0xone", now);
        assert!(registry.is_slashed("0xone"));
        assert!(!registry.is_slashed("0xtwo"));
    }

    #[test]
    fn reverts_outside_window_do_not_accumulate() {
        let registry = SlashRegistry::new(2, 10);
        let base = Duration::from_secs(0);
        registry.record_revert("0xp", base);
        registry.record_revert("0xp", base + Duration::from_secs(20));
        assert!(!registry.is_slashed("0xp"));
    }
}
