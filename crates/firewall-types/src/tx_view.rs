//! The normalized, engine-visible transaction record.
//!
//! A `TxView` is the boundary between untyped JSON-RPC payloads and the
//! typed pipeline: the Normalizer builds one, every engine downstream only
//! ever sees this type, immutable once built.

use serde::{Deserialize, Serialize};

/// Immutable, normalized view of a state-changing RPC call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TxView {
    /// Lowercased 20-byte destination address, or empty if absent.
    pub target: String,
    /// Native-unit amount, non-negative.
    pub amount: f64,
    /// 4-byte function selector (hex, lowercase, `0x`-prefixed), or empty.
    pub function: String,
    /// Full calldata hex string (may be empty).
    pub data: String,
    /// Sender address, preserved but opaque to most engines.
    pub from: String,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub max_fee: Option<String>,
    /// Raw, un-decoded `value` field, preserved for engines that want it.
    pub value_raw: Option<String>,
    /// Optional free-text memo supplied by higher layers.
    pub memo: Option<String>,
    /// The original JSON-RPC method name (`eth_sendTransaction`, ...).
    pub method: String,
}

impl TxView {
    /// A TxView with safe defaults: empty target, zero amount. Used by the
    /// Normalizer whenever it cannot make sense of the input — the
    /// normalizer never raises.
    pub fn safe_default(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// All string-typed fields worth scanning for embedded secrets
    /// (Entropy Guard, §4.2.4). `memo` is the primary target but calldata
    /// and the free-form fields are included too.
    pub fn string_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("data", self.data.as_str())];
        if let Some(memo) = &self.memo {
            fields.push(("memo", memo.as_str()));
        }
        fields
    }
}
