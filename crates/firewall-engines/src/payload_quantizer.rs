//! Payload Quantizer: re-encodes calldata under a canonical form and
//! blocks when the original bytes don't round-trip, signaling extraneous
//! or steganographic bytes smuggled past the ABI boundary.
//!
//! Canonical form, absent a full ABI decoder: lowercase hex, `0x`-prefixed,
//! byte-aligned (even digit count), with the calldata beyond the 4-byte
//! selector padded to 32-byte words as the EVM ABI requires. Anything that
//! fails to decode as hex, has an odd digit count, or carries a non-aligned
//! tail is treated as carrying extraneous bytes.

use crate::engine::Engine;
use async_trait::async_trait;
use firewall_types::{Clock, EngineId, QuantizerConfig, TxView, Verdict, VerdictCode};
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_SIZE: usize = 32;
const SELECTOR_BYTES: usize = 4;

pub struct PayloadQuantizer {
    config: QuantizerConfig,
    blocked_total: AtomicU64,
}

impl PayloadQuantizer {
    pub fn new(config: QuantizerConfig) -> Self {
        Self {
            config,
            blocked_total: AtomicU64::new(0),
        }
    }

    /// Returns `Ok(())` if `data` is already in canonical form, `Err(reason)`
    /// describing the mismatch otherwise.
    fn check_canonical(data: &str) -> Result<(), &'static str> {
        if data.is_empty() {
            return Ok(());
        }
        let hex_body = data.strip_prefix("0x").unwrap_or(data);
        if hex_body.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("calldata hex digits are not lowercase");
        }
        if hex_body.len() % 2 != 0 {
            return Err("calldata hex has an odd digit count");
        }
        let bytes = match hex::decode(hex_body) {
            Ok(b) => b,
            Err(_) => return Err("calldata is not valid hex"),
        };
        if bytes.len() <= SELECTOR_BYTES {
            return Ok(());
        }
        let arg_bytes = bytes.len() - SELECTOR_BYTES;
        if arg_bytes % WORD_SIZE != 0 {
            return Err("calldata argument section is not word-aligned");
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for PayloadQuantizer {
    fn name(&self) -> &'static str {
        "PayloadQuantizer"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn evaluate(&self, tx: &TxView, _spend: f64, _clock: &dyn Clock) -> Verdict {
        if let Err(reason) = Self::check_canonical(&tx.data) {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            return Verdict::block(
                VerdictCode::BlockQuantize,
                EngineId::PayloadQuantizer,
                format!("calldata failed canonical re-encoding: {reason}"),
                "This call data carries bytes beyond what its ABI shape accounts for. Retrying \
                 with the same payload will fail; re-encode the call cleanly.",
            );
        }
        Verdict::allow()
    }

    fn blocked_total(&self) -> u64 {
        self.blocked_total.load(Ordering::Relaxed)
    }
}
