//! Dispatches one `VaultRequest` against a [`KeyVault`] and produces the
//! matching [`VaultResponse`].

use crate::vault::KeyVault;
use crate::wire::{read_request, write_response, VaultRequest, VaultResponse};
use firewall_types::{FirewallError, TxView};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};

/// Runs the vault's side of a duplex channel until the peer disconnects or
/// a frame fails to parse. Each request is dispatched independently; a
/// single malformed frame ends the connection rather than desynchronizing
/// the stream.
pub async fn serve_connection<S: AsyncRead + AsyncWrite + Unpin>(
    vault: &KeyVault,
    mut stream: S,
) -> Result<(), FirewallError> {
    loop {
        let request = match read_request(&mut stream).await {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(target: "firewall-vault", error = %e, "connection ended");
                return Ok(());
            }
        };
        let response = dispatch(vault, request).await;
        write_response(&mut stream, &response).await?;
    }
}

async fn dispatch(vault: &KeyVault, request: VaultRequest) -> VaultResponse {
    let correlation_id = request.correlation_id.clone();
    let action = request.action.clone();
    let response = match action.as_str() {
        "store_key" => handle_store_key(vault, &request.params, correlation_id),
        "sign_eth" => handle_sign_eth(vault, &request.params, correlation_id).await,
        "sign_typed" => handle_sign_typed(vault, &request.params, correlation_id).await,
        "health" => handle_health(vault, correlation_id),
        other => VaultResponse::failure(
            correlation_id,
            json!({ "error": format!("unrecognized action: {other}") }),
        ),
    };
    if !response.ok {
        tracing::warn!(target: "firewall-vault", action = %action, body = %response.body, "action failed");
    }
    response
}

fn handle_store_key(vault: &KeyVault, params: &Value, correlation_id: String) -> VaultResponse {
    let key_id = match params.get("key_id").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => return VaultResponse::failure(correlation_id, json!({"error": "missing key_id"})),
    };
    let secret = match params.get("secret").and_then(Value::as_str) {
        Some(s) => s.as_bytes().to_vec(),
        None => return VaultResponse::failure(correlation_id, json!({"error": "missing secret"})),
    };
    match vault.store(&key_id, &secret) {
        Ok(()) => VaultResponse::success(correlation_id, json!({"key_id": key_id})),
        Err(e) => VaultResponse::failure(correlation_id, json!({"error": e.to_string()})),
    }
}

async fn handle_sign_eth(vault: &KeyVault, params: &Value, correlation_id: String) -> VaultResponse {
    let Some(key_id) = params.get("key_id").and_then(Value::as_str) else {
        return VaultResponse::failure(correlation_id, json!({"error": "missing key_id"}));
    };
    let Some(tx_dict) = params.get("tx_dict") else {
        return VaultResponse::failure(correlation_id, json!({"error": "missing tx_dict"}));
    };
    let spend_amount = params.get("spend_amount").and_then(Value::as_f64);
    let tx = tx_view_from_dict(tx_dict, "eth_sendTransaction");

    match vault.sign_native_transaction(key_id, tx, spend_amount).await {
        Ok(signature) => {
            VaultResponse::success(correlation_id, json!({"signature": hex::encode(signature)}))
        }
        Err(FirewallError::VaultBlocked { code, reason }) => VaultResponse::failure(
            correlation_id,
            json!({"blocked": true, "code": code, "error": reason}),
        ),
        Err(e) => VaultResponse::failure(correlation_id, json!({"error": e.to_string()})),
    }
}

async fn handle_sign_typed(vault: &KeyVault, params: &Value, correlation_id: String) -> VaultResponse {
    let Some(key_id) = params.get("key_id").and_then(Value::as_str) else {
        return VaultResponse::failure(correlation_id, json!({"error": "missing key_id"}));
    };
    let Some(typed_data) = params.get("typed_data") else {
        return VaultResponse::failure(correlation_id, json!({"error": "missing typed_data"}));
    };

    match vault.sign_typed(key_id, typed_data).await {
        Ok(signature) => {
            VaultResponse::success(correlation_id, json!({"signature": hex::encode(signature)}))
        }
        Err(FirewallError::VaultBlocked { code, reason }) => VaultResponse::failure(
            correlation_id,
            json!({"blocked": true, "code": code, "error": reason}),
        ),
        Err(e) => VaultResponse::failure(correlation_id, json!({"error": e.to_string()})),
    }
}

fn handle_health(vault: &KeyVault, correlation_id: String) -> VaultResponse {
    let health = vault.health();
    VaultResponse::success(
        correlation_id,
        json!({"status": health.status, "keys": health.key_count}),
    )
}

fn tx_view_from_dict(tx_dict: &Value, method: &str) -> TxView {
    let target = tx_dict
        .get("to")
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let data = tx_dict
        .get("data")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let function = if data.len() >= 10 {
        data[..10].to_lowercase()
    } else {
        String::new()
    };
    let amount = tx_dict.get("value").and_then(Value::as_f64).unwrap_or(0.0);

    TxView {
        target,
        amount,
        function,
        data,
        method: method.to_string(),
        ..Default::default()
    }
}
