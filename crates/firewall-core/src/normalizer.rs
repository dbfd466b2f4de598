//! Normalizer: converts a raw JSON-RPC envelope into the firewall's typed
//! [`TxView`], or classifies it as read-only and therefore exempt from the
//! pipeline entirely.
//!
//! This is the boundary where untyped JSON becomes typed data — everything
//! downstream of here only ever sees a `TxView`.

use firewall_types::TxView;
use serde_json::Value;

/// RPC methods that mutate chain state or produce a signature and must
/// therefore pass through the pipeline. Every other method is read-only.
const STATE_CHANGING_METHODS: &[&str] = &[
    "eth_sendTransaction",
    "eth_sendRawTransaction",
    "eth_sign",
    "personal_sign",
    "eth_signTypedData",
    "eth_signTypedData_v3",
    "eth_signTypedData_v4",
];

/// The normalizer's verdict on an incoming JSON-RPC request.
pub enum Classification {
    /// Forward without touching the firewall or any engine state.
    ReadOnly,
    /// Must be evaluated by the pipeline before forwarding.
    StateChanging(Box<TxView>),
}

/// `10**18`, used to convert wei-denominated hex values to the chain's
/// native unit.
const WEI_PER_ETHER: f64 = 1_000_000_000_000_000_000.0;

pub struct Normalizer;

impl Normalizer {
    /// Classifies a parsed JSON-RPC envelope. Never fails: malformed
    /// state-changing payloads degrade to a safe-default `TxView` rather
    /// than raising, so a detection engine downstream gets the chance to
    /// reject them instead of the normalizer silently swallowing the call.
    pub fn classify(envelope: &Value) -> Classification {
        let method = envelope
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if !STATE_CHANGING_METHODS.contains(&method) {
            return Classification::ReadOnly;
        }

        let tx_obj = envelope
            .get("params")
            .and_then(Value::as_array)
            .and_then(|params| params.first());

        let Some(tx_obj) = tx_obj else {
            return Classification::StateChanging(Box::new(TxView::safe_default(method)));
        };

        Classification::StateChanging(Box::new(Self::extract(tx_obj, method)))
    }

    fn extract(tx_obj: &Value, method: &str) -> TxView {
        let target = tx_obj
            .get("to")
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let data = tx_obj
            .get("data")
            .or_else(|| tx_obj.get("input"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let function = if data.len() >= 10 {
            data[..10].to_lowercase()
        } else {
            String::new()
        };

        let value_raw = tx_obj.get("value").and_then(Value::as_str).map(String::from);
        let amount = value_raw
            .as_deref()
            .map(Self::decode_amount)
            .unwrap_or(0.0);

        let from = tx_obj
            .get("from")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let gas = tx_obj.get("gas").and_then(Value::as_str).map(String::from);
        let gas_price = tx_obj
            .get("gasPrice")
            .and_then(Value::as_str)
            .map(String::from);
        let max_fee = tx_obj
            .get("maxFeePerGas")
            .and_then(Value::as_str)
            .map(String::from);
        let memo = tx_obj
            .get("memo")
            .and_then(Value::as_str)
            .map(String::from);

        TxView {
            target,
            amount,
            function,
            data,
            from,
            gas,
            gas_price,
            max_fee,
            value_raw,
            memo,
            method: method.to_string(),
        }
    }

    /// Decodes `value`: hex-prefixed is wei, divided down to native units;
    /// otherwise a best-effort numeric parse; anything unparsable is
    /// treated as zero rather than raising.
    fn decode_amount(value: &str) -> f64 {
        if let Some(hex) = value.strip_prefix("0x") {
            u128::from_str_radix(hex, 16)
                .map(|wei| wei as f64 / WEI_PER_ETHER)
                .unwrap_or(0.0)
        } else {
            value.parse::<f64>().unwrap_or(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_only_method_is_classified_as_read_only() {
        let envelope = json!({"jsonrpc": "2.0", "method": "eth_getBalance", "params": ["0xabc"]});
        assert!(matches!(
            Normalizer::classify(&envelope),
            Classification::ReadOnly
        ));
    }

    #[test]
    fn send_transaction_is_normalized() {
        let envelope = json!({
            "jsonrpc": "2.0",
            "method": "eth_sendTransaction",
            "params": [{
                "to": "0xAAAABBBBCCCCDDDDEEEEFFFF0000111122223333",
                "value": "0x2386F26FC10000",
                "data": "0xa9059cbb000000000000000000000000"
            }]
        });
        let Classification::StateChanging(tx) = Normalizer::classify(&envelope) else {
            panic!("expected state-changing classification");
        };
        assert_eq!(tx.target, "0xaaaabbbbccccddddeeeeffff0000111122223333");
        assert_eq!(tx.function, "0xa9059cbb");
        assert!((tx.amount - 0.01).abs() < 1e-9);
        assert_eq!(tx.method, "eth_sendTransaction");
    }

    #[test]
    fn malformed_params_degrades_to_safe_default() {
        let envelope = json!({"jsonrpc": "2.0", "method": "eth_sendTransaction", "params": []});
        let Classification::StateChanging(tx) = Normalizer::classify(&envelope) else {
            panic!("expected state-changing classification");
        };
        assert_eq!(tx.target, "");
        assert_eq!(tx.amount, 0.0);
    }

    #[test]
    fn plain_numeric_value_is_parsed_directly() {
        let envelope = json!({
            "jsonrpc": "2.0",
            "method": "eth_sendTransaction",
            "params": [{"to": "0xabc", "value": "42.5"}]
        });
        let Classification::StateChanging(tx) = Normalizer::classify(&envelope) else {
            panic!("expected state-changing classification");
        };
        assert!((tx.amount - 42.5).abs() < 1e-9);
    }
}
