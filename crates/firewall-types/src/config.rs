//! Configuration schema. This is the contract the firewall accepts as a
//! single immutable aggregate; the on-disk TOML form lives in
//! `firewall-node` and deserializes straight into `FirewallConfig`.

use crate::error::FirewallError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatFeedConfig {
    pub enabled: bool,
}

impl Default for ThreatFeedConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub enabled: bool,
    pub max_duplicates: u32,
    pub window_seconds: u64,
    /// Decimal places amounts are rounded to before hashing, to absorb
    /// floating point noise.
    pub amount_bucket_decimals: u32,
    /// How many leading bytes of calldata participate in the fingerprint.
    pub fingerprint_data_prefix: usize,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_duplicates: 2,
            window_seconds: 60,
            amount_bucket_decimals: 6,
            fingerprint_data_prefix: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    pub enabled: bool,
    pub v_max: f64,
    pub window_seconds: u64,
    pub max_single_amount: f64,
    pub pid_threshold: f64,
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    pub gtv_enabled: bool,
    pub gtv_max_ratio: f64,
    pub gtv_min_value: f64,
    pub gtv_window_seconds: u64,
    pub gtv_cumulative_max: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            v_max: 50.0,
            window_seconds: 3600,
            max_single_amount: 2000.0,
            pid_threshold: 1.5,
            k_p: 1.0,
            k_i: 0.1,
            k_d: 0.05,
            gtv_enabled: false,
            gtv_max_ratio: 5.0,
            gtv_min_value: 100.0,
            gtv_window_seconds: 3600,
            gtv_cumulative_max: 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    pub enabled: bool,
    pub entropy_threshold: f64,
    pub min_length: usize,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entropy_threshold: 4.0,
            min_length: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub enabled: bool,
    /// Asset (token contract) addresses explicitly permitted. Empty means
    /// "no allow-list restriction" (deny-list still applies).
    pub allow_list: Vec<String>,
    /// Function selectors explicitly forbidden regardless of target.
    pub deny_list: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    pub enabled: bool,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub fail_closed: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fail_closed: true,
            endpoint: String::new(),
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    pub chain_id: u64,
    pub cognitive_sever_enabled: bool,
    pub strike_max: u32,
    pub strike_window_secs: u64,
    pub sever_duration_secs: u64,
    pub revert_strike_max: u32,
    pub revert_strike_window_secs: u64,
    pub max_pre_verification_gas: u64,
    /// Ratio of simulated gas usage to declared gas beyond which the EVM
    /// Simulator blocks as a gas anomaly.
    pub gas_anomaly_ratio: f64,
    /// TTL for a resolved per-principal `CacheEntry`.
    pub config_cache_ttl_secs: u64,

    pub threat_feed: ThreatFeedConfig,
    pub trajectory: TrajectoryConfig,
    pub velocity: VelocityConfig,
    pub entropy: EntropyConfig,
    pub asset: AssetConfig,
    pub quantizer: QuantizerConfig,
    pub simulator: SimulatorConfig,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            cognitive_sever_enabled: true,
            strike_max: 5,
            strike_window_secs: 60,
            sever_duration_secs: 30,
            revert_strike_max: 3,
            revert_strike_window_secs: 300,
            max_pre_verification_gas: 1_000_000,
            gas_anomaly_ratio: 3.0,
            config_cache_ttl_secs: 60,
            threat_feed: ThreatFeedConfig::default(),
            trajectory: TrajectoryConfig::default(),
            velocity: VelocityConfig::default(),
            entropy: EntropyConfig::default(),
            asset: AssetConfig::default(),
            quantizer: QuantizerConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl FirewallConfig {
    /// Validates numeric ranges at load time so a misconfigured threshold
    /// fails fast with a field-level message rather than silently
    /// misbehaving at evaluation time.
    pub fn validate(&self) -> Result<(), FirewallError> {
        if self.trajectory.window_seconds == 0 {
            return Err(FirewallError::Config(
                "trajectory.window_seconds must be > 0".into(),
            ));
        }
        if self.velocity.window_seconds == 0 {
            return Err(FirewallError::Config(
                "velocity.window_seconds must be > 0".into(),
            ));
        }
        if self.velocity.v_max < 0.0 || self.velocity.max_single_amount < 0.0 {
            return Err(FirewallError::Config(
                "velocity.v_max and velocity.max_single_amount must be non-negative".into(),
            ));
        }
        if self.velocity.gtv_enabled && self.velocity.gtv_window_seconds == 0 {
            return Err(FirewallError::Config(
                "velocity.gtv_window_seconds must be > 0 when gtv_enabled".into(),
            ));
        }
        if self.entropy.entropy_threshold < 0.0 || self.entropy.entropy_threshold > 8.0 {
            return Err(FirewallError::Config(
                "entropy.entropy_threshold must be within [0, 8] (bits per byte)".into(),
            ));
        }
        if self.strike_window_secs == 0 {
            return Err(FirewallError::Config(
                "strike_window_secs must be > 0".into(),
            ));
        }
        if self.simulator.enabled && self.simulator.endpoint.is_empty() {
            return Err(FirewallError::Config(
                "simulator.endpoint must be set when simulator.enabled".into(),
            ));
        }
        if self.config_cache_ttl_secs == 0 {
            return Err(FirewallError::Config(
                "config_cache_ttl_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
