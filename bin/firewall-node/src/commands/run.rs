//! `firewall-node run` — loads the configuration, wires the Intercept
//! Proxy and the Key Vault onto one `Firewall` instance, and serves both
//! until interrupted.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use clap::Parser;
use firewall_gateway::{FirewallApp, GatewayConfig};
use firewall_vault::KeyVault;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the TOML configuration file.
    #[clap(long, default_value = "firewall.toml")]
    pub config: PathBuf,

    /// Use human-readable (rather than JSON) log output.
    #[clap(long)]
    pub pretty_logs: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let config: NodeConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", args.config.display()))?;
    config
        .firewall
        .validate()
        .context("configuration failed validation")?;

    firewall_telemetry::init_tracing(args.pretty_logs);
    firewall_telemetry::install_firewall_metrics();

    let app = Arc::new(FirewallApp::new(
        config.firewall.clone(),
        config.gateway.upstream_rpc.clone(),
    ));

    // The vault re-invokes the same firewall instance the gateway's global
    // route uses, so a BLOCK verdict is identically enforced on both the
    // HTTP and signing paths.
    let vault = Arc::new(KeyVault::new(app.global_firewall.clone()));

    let gateway_config = GatewayConfig {
        listen_addr: config.gateway.listen_addr.clone(),
        rps: config.gateway.rps,
        burst: config.gateway.burst,
        body_limit_kb: config.gateway.body_limit_kb,
        concurrency_limit: config.gateway.concurrency_limit,
        request_timeout_secs: config.gateway.request_timeout_secs,
    };

    let socket_path = config.vault.socket_path.clone();
    let vault_task = tokio::spawn(serve_vault(vault, socket_path));
    let gateway_task = tokio::spawn(firewall_gateway::run_server(gateway_config, app));

    tokio::select! {
        result = gateway_task => {
            result.context("gateway task panicked")?.context("gateway server failed")?;
        }
        result = vault_task => {
            result.context("vault task panicked")?.context("vault server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "firewall-node", "received shutdown signal");
        }
    }

    Ok(())
}

async fn serve_vault(vault: Arc<KeyVault>, socket_path: String) -> Result<()> {
    // A stale socket file from an unclean shutdown would otherwise make
    // bind() fail with AddrInUse.
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind vault socket at {socket_path}"))?;
    tracing::info!(target: "firewall-vault", socket_path, "key vault listening");

    loop {
        let (stream, _addr) = listener.accept().await.context("vault socket accept failed")?;
        let vault = vault.clone();
        tokio::spawn(async move {
            if let Err(e) = firewall_vault::serve_connection(&vault, stream).await {
                tracing::warn!(target: "firewall-vault", error = %e, "vault connection ended with an error");
            }
        });
    }
}
