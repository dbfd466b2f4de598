//! `ParameterSource` implementation that reads per-principal configuration
//! over the same JSON-RPC endpoint the proxy forwards to.

use async_trait::async_trait;
use firewall_config_cache::{ParameterSource, PrincipalParams, WhitelistEntry};
use serde_json::{json, Value};
use std::time::Duration;

const PARAMETER_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed `eth_call` selectors the cache reads against a principal's vault
/// contract.
mod selectors {
    pub const VELOCITY_MODULE: &str = "0x6f4b8f55";
    pub const WHITELIST_MODULE: &str = "0x8f6a52a1";
    pub const EMERGENCY_LOCKED: &str = "0x2f8a7e1c";
    pub const OWNER: &str = "0x8da5cb5b";
    pub const MAX_PER_HOUR: &str = "0x3a5f1f2e";
    pub const MAX_SINGLE_TX: &str = "0x1b2c3d4e";
    pub const DRAWDOWN_BPS: &str = "0x4d5e6f70";
    pub const WHITELIST_COUNT: &str = "0x5e6f7081";
    pub const WHITELIST_AT: &str = "0x6f708192";
    pub const WHITELIST_ACTIVE: &str = "0x708192a3";
}

pub struct HttpParameterSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpParameterSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn eth_call(&self, to: &str, selector: &str) -> Result<Value, String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": to, "data": selector }, "latest"],
        });
        let response = tokio::time::timeout(
            PARAMETER_SOURCE_TIMEOUT,
            self.client.post(&self.endpoint).json(&body).send(),
        )
        .await
        .map_err(|_| "parameter source request timed out".to_string())?
        .map_err(|e| e.to_string())?;

        let payload: Value = response.json().await.map_err(|e| e.to_string())?;
        if let Some(err) = payload.get("error") {
            return Err(format!("parameter source returned an error: {err}"));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| "parameter source response missing result".to_string())
    }
}

#[async_trait]
impl ParameterSource for HttpParameterSource {
    async fn fetch_principal_params(&self, principal: &str) -> Result<PrincipalParams, String> {
        let velocity_module = self.eth_call(principal, selectors::VELOCITY_MODULE).await?;
        let whitelist_module = self.eth_call(principal, selectors::WHITELIST_MODULE).await?;
        let emergency_locked = self.eth_call(principal, selectors::EMERGENCY_LOCKED).await?;
        let owner = self.eth_call(principal, selectors::OWNER).await?;
        let max_per_hour = self.eth_call(principal, selectors::MAX_PER_HOUR).await?;
        let max_single_tx = self.eth_call(principal, selectors::MAX_SINGLE_TX).await?;
        let drawdown_bps = self.eth_call(principal, selectors::DRAWDOWN_BPS).await?;

        Ok(PrincipalParams {
            velocity_module: as_address(&velocity_module),
            whitelist_module: as_address(&whitelist_module),
            emergency_locked: as_bool(&emergency_locked),
            owner: as_address(&owner),
            max_per_hour: as_amount(&max_per_hour),
            max_single_tx: as_amount(&max_single_tx),
            drawdown_bps: as_amount(&drawdown_bps) as u32,
        })
    }

    async fn fetch_whitelist(&self, whitelist_module: &str) -> Result<Vec<WhitelistEntry>, String> {
        let count_raw = self
            .eth_call(whitelist_module, selectors::WHITELIST_COUNT)
            .await?;
        let count = (as_amount(&count_raw) as usize).min(firewall_config_cache::MAX_WHITELIST_ENTRIES);

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let selector = format!("{}{:064x}", selectors::WHITELIST_AT, index);
            let address = self.eth_call(whitelist_module, &selector).await?;
            let active_selector = format!("{}{:064x}", selectors::WHITELIST_ACTIVE, index);
            let active = self.eth_call(whitelist_module, &active_selector).await?;
            entries.push(WhitelistEntry {
                address: as_address(&address),
                active: as_bool(&active),
            });
        }
        Ok(entries)
    }
}

fn as_address(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_lowercase()
}

fn as_bool(value: &Value) -> bool {
    match value.as_str() {
        Some(hex) => !hex.trim_start_matches("0x").chars().all(|c| c == '0'),
        None => value.as_bool().unwrap_or(false),
    }
}

fn as_amount(value: &Value) -> f64 {
    if let Some(s) = value.as_str() {
        let trimmed = s.trim_start_matches("0x");
        return u64::from_str_radix(trimmed, 16).map(|n| n as f64).unwrap_or(0.0);
    }
    value.as_f64().unwrap_or(0.0)
}
