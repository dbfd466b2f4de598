//! Crate-wide error taxonomy.
//!
//! One `thiserror` enum covering every failure class, plus an `ErrorCode`
//! trait giving each variant a stable, machine-readable string. Handlers at
//! the I/O boundary (the gateway, the vault wire protocol) map these onto
//! the wire/HTTP shapes; internal code always deals in `FirewallError`.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

#[derive(Error, Debug, Clone)]
pub enum FirewallError {
    /// A configuration value failed validation at load time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The JSON-RPC envelope could not be normalized into a TxView.
    #[error("failed to normalize request: {0}")]
    Normalize(String),

    /// A detection engine raised internally. This is coerced to ALLOW by
    /// the orchestrator, but the fault is still surfaced here for logging
    /// before that coercion happens.
    #[error("engine '{engine}' faulted: {message}")]
    EngineFault { engine: String, message: String },

    /// The upstream RPC endpoint could not be reached or returned an error.
    #[error("upstream RPC failure: {0}")]
    UpstreamRpc(String),

    /// The signing vault refused to sign because the firewall verdict was
    /// BLOCK. Carries enough information for the caller to understand why,
    /// without leaking internal thresholds.
    #[error("signing refused: {reason}")]
    VaultBlocked { code: String, reason: String },

    /// Local I/O failure (reading a config file, a key file, etc).
    #[error("I/O error: {0}")]
    Io(String),
}

impl ErrorCode for FirewallError {
    fn code(&self) -> &'static str {
        match self {
            FirewallError::Config(_) => "CONFIG_INVALID",
            FirewallError::Normalize(_) => "NORMALIZE_FAILED",
            FirewallError::EngineFault { .. } => "ENGINE_FAULT",
            FirewallError::UpstreamRpc(_) => "UPSTREAM_RPC_FAILED",
            FirewallError::VaultBlocked { .. } => "VAULT_BLOCKED",
            FirewallError::Io(_) => "IO_ERROR",
        }
    }
}
