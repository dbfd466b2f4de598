//! `firewall-node keys import` — a thin client for the vault's duplex
//! wire protocol, dialing the Unix socket a running node already has open
//! rather than touching key material any other way.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[clap(subcommand)]
    pub command: KeysSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum KeysSubcommand {
    /// Send a key's secret material to a running vault's `store_key` action.
    Import {
        /// Path to the vault's Unix domain socket.
        #[clap(long, default_value = "/tmp/firewall-vault.sock")]
        socket: PathBuf,
        /// Opaque identifier the vault will store the key under.
        #[clap(long)]
        key_id: String,
        /// File containing the raw key secret. Read as bytes, not hex-decoded.
        #[clap(long)]
        secret_file: PathBuf,
    },
    /// Query a running vault's health (status, key count).
    Health {
        #[clap(long, default_value = "/tmp/firewall-vault.sock")]
        socket: PathBuf,
    },
}

pub async fn run(args: KeysArgs) -> Result<()> {
    match args.command {
        KeysSubcommand::Import {
            socket,
            key_id,
            secret_file,
        } => {
            let secret = std::fs::read_to_string(&secret_file)
                .with_context(|| format!("failed to read {}", secret_file.display()))?;
            let response = call(
                &socket,
                "store_key",
                json!({"key_id": key_id, "secret": secret.trim()}),
            )
            .await?;
            if response["ok"] != json!(true) {
                bail!("vault refused store_key: {response}");
            }
            println!("stored key '{key_id}'");
            Ok(())
        }
        KeysSubcommand::Health { socket } => {
            let response = call(&socket, "health", json!({})).await?;
            println!("{response}");
            Ok(())
        }
    }
}

/// One request/response round-trip over the vault's length-delimited JSON
/// protocol: a `u32` big-endian byte count followed by that many bytes of
/// JSON, matching `firewall_vault::wire`'s framing exactly.
async fn call(socket: &PathBuf, action: &str, mut params: Value) -> Result<Value> {
    let mut stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("failed to connect to vault socket at {}", socket.display()))?;

    params["action"] = json!(action);
    params["correlation_id"] = json!("firewall-node-cli");
    let bytes = serde_json::to_vec(&params)?;
    stream.write_u32(bytes.len() as u32).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;

    let len = stream.read_u32().await.context("vault closed the connection before responding")?;
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    Ok(serde_json::from_slice(&buf)?)
}
