//! Transaction firewall node: wires the Intercept Proxy and Key Vault
//! together behind a `clap` CLI, dispatching into `commands::*::run`.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "firewall-node",
    version,
    about = "Deterministic transaction firewall sitting between an agent and a chain RPC endpoint"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Intercept Proxy and Key Vault.
    Run(commands::run::RunArgs),
    /// Generate or inspect node configuration.
    Config(commands::config::ConfigArgs),
    /// Manage keys held by a running vault.
    Keys(commands::keys::KeysArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Config(args) => commands::config::run(args),
        Commands::Keys(args) => commands::keys::run(args).await,
    }
}
