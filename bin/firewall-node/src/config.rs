//! On-disk node configuration: the `firewall.toml` loaded by `run` and
//! scaffolded by `config new`, layering gateway- and vault-specific
//! sections on top of the library's `FirewallConfig`.

use firewall_types::FirewallConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub listen_addr: String,
    pub upstream_rpc: String,
    pub rps: u32,
    pub burst: u32,
    pub body_limit_kb: usize,
    pub concurrency_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        let defaults = firewall_gateway::GatewayConfig::default();
        Self {
            listen_addr: defaults.listen_addr,
            upstream_rpc: "http://127.0.0.1:8545".to_string(),
            rps: defaults.rps,
            burst: defaults.burst,
            body_limit_kb: defaults.body_limit_kb,
            concurrency_limit: defaults.concurrency_limit,
            request_timeout_secs: defaults.request_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSection {
    /// Unix domain socket the Key Vault's duplex channel listens on — a
    /// filesystem-permissioned socket rather than a network port keeps
    /// that channel off the network entirely.
    pub socket_path: String,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/firewall-vault.sock".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub firewall: FirewallConfig,
    pub gateway: GatewaySection,
    pub vault: VaultSection,
}
