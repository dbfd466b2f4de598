//! The Key Vault: stores signing material keyed by an opaque `key_id` and
//! re-invokes the firewall on every signing path. A BLOCK verdict means no
//! signature is ever produced.

use crate::key_store;
use dashmap::DashMap;
use firewall_core::Firewall;
use firewall_types::{FirewallError, TxView};
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VaultHealth {
    pub status: &'static str,
    pub key_count: usize,
}

pub struct KeyVault {
    keys: DashMap<String, Vec<u8>>,
    /// Process-lifetime master secret used to derive the per-key encryption
    /// key; never persisted, regenerated on every restart.
    vault_secret: Vec<u8>,
    firewall: Arc<Firewall>,
}

impl KeyVault {
    pub fn new(firewall: Arc<Firewall>) -> Self {
        let mut vault_secret = vec![0u8; 32];
        OsRng.fill_bytes(&mut vault_secret);
        Self {
            keys: DashMap::new(),
            vault_secret,
            firewall,
        }
    }

    /// `store_key`: encrypts `secret` at rest under the vault's master
    /// secret and remembers it under `key_id`.
    pub fn store(&self, key_id: &str, secret: &[u8]) -> Result<(), FirewallError> {
        let envelope = key_store::encrypt_key(secret, &self.vault_secret)?;
        self.keys.insert(key_id.to_string(), envelope);
        Ok(())
    }

    pub fn list_key_ids(&self) -> Vec<String> {
        self.keys.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn health(&self) -> VaultHealth {
        VaultHealth {
            status: "ok",
            key_count: self.keys.len(),
        }
    }

    /// `sign_eth`: composes a `TxView` from `tx`, runs the firewall, and
    /// only on ALLOW decrypts the key and produces a signature.
    pub async fn sign_native_transaction(
        &self,
        key_id: &str,
        tx: TxView,
        spend_amount: Option<f64>,
    ) -> Result<Vec<u8>, FirewallError> {
        let spend = spend_amount.unwrap_or(tx.amount);
        let verdict = self.firewall.evaluate_with_spend(&tx, spend).await;
        if verdict.blocked {
            return Err(FirewallError::VaultBlocked {
                code: verdict.code.to_string(),
                reason: verdict.reason,
            });
        }

        let envelope = self
            .keys
            .get(key_id)
            .ok_or_else(|| FirewallError::Config(format!("unknown key_id: {key_id}")))?;
        let secret = key_store::decrypt_key(&envelope, &self.vault_secret)?;
        Ok(Self::placeholder_sign(&secret.0, tx.data.as_bytes()))
    }

    /// `sign_typed`: the payload is opaque structured data rather than a
    /// transaction, so it is folded into a `TxView`'s `memo` field (the
    /// same field Entropy Guard already scans) before evaluation — this
    /// keeps the single `Firewall::evaluate` entry point authoritative for
    /// every signing path without a second code path that could drift out
    /// of sync.
    pub async fn sign_typed(&self, key_id: &str, typed_data: &Value) -> Result<Vec<u8>, FirewallError> {
        let tx = TxView {
            method: "eth_signTypedData_v4".to_string(),
            memo: Some(typed_data.to_string()),
            ..TxView::default()
        };
        let verdict = self.firewall.evaluate(&tx).await;
        if verdict.blocked {
            return Err(FirewallError::VaultBlocked {
                code: verdict.code.to_string(),
                reason: verdict.reason,
            });
        }

        let envelope = self
            .keys
            .get(key_id)
            .ok_or_else(|| FirewallError::Config(format!("unknown key_id: {key_id}")))?;
        let secret = key_store::decrypt_key(&envelope, &self.vault_secret)?;
        Ok(Self::placeholder_sign(&secret.0, typed_data.to_string().as_bytes()))
    }

    /// Deterministic stand-in for an actual ECDSA/EdDSA signature: this
    /// crate's job is the firewall gate in front of signing, not a
    /// production signing scheme, so a keyed hash is sufficient to exercise
    /// and test the BLOCK/ALLOW boundary.
    fn placeholder_sign(key_material: &[u8], message: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(key_material);
        hasher.update(message);
        hasher.finalize().to_vec()
    }
}
