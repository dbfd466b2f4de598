//! Length-delimited JSON duplex wire protocol: a `u32` big-endian length
//! prefix followed by that many bytes of JSON.

use firewall_types::FirewallError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Caps a single frame to bound memory use against a misbehaving peer.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// One incoming request on the vault's duplex channel. Untagged on
/// `action` deliberately (rather than `serde`'s internally-tagged enum) so
/// an unrecognized action can be reported with the offending string
/// instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
pub struct VaultRequest {
    pub action: String,
    pub correlation_id: String,
    #[serde(flatten)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct VaultResponse {
    pub ok: bool,
    pub correlation_id: String,
    #[serde(flatten)]
    pub body: Value,
}

impl VaultResponse {
    pub fn success(correlation_id: impl Into<String>, body: Value) -> Self {
        Self {
            ok: true,
            correlation_id: correlation_id.into(),
            body,
        }
    }

    pub fn failure(correlation_id: impl Into<String>, body: Value) -> Self {
        Self {
            ok: false,
            correlation_id: correlation_id.into(),
            body,
        }
    }
}

/// Reads one length-delimited JSON request from `reader`.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<VaultRequest, FirewallError> {
    let len = reader
        .read_u32()
        .await
        .map_err(|e| FirewallError::Io(format!("failed to read frame length: {e}")))?;
    if len > MAX_FRAME_BYTES {
        return Err(FirewallError::Io(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_BYTES}-byte limit"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| FirewallError::Io(format!("failed to read frame body: {e}")))?;
    serde_json::from_slice(&buf)
        .map_err(|e| FirewallError::Io(format!("malformed vault request: {e}")))
}

/// Writes one length-delimited JSON response to `writer`.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &VaultResponse,
) -> Result<(), FirewallError> {
    let bytes = serde_json::to_vec(response)
        .map_err(|e| FirewallError::Io(format!("failed to encode vault response: {e}")))?;
    writer
        .write_u32(bytes.len() as u32)
        .await
        .map_err(|e| FirewallError::Io(format!("failed to write frame length: {e}")))?;
    writer
        .write_all(&bytes)
        .await
        .map_err(|e| FirewallError::Io(format!("failed to write frame body: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| FirewallError::Io(format!("failed to flush vault channel: {e}")))
}
