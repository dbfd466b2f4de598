//! `firewall-node config new` — scaffolds a default `firewall.toml`:
//! serialize the default struct, write it out, refuse to clobber an
//! existing file.

use crate::config::NodeConfig;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Write a default firewall.toml to the given path.
    New {
        #[clap(long, default_value = "firewall.toml")]
        out: PathBuf,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigSubcommand::New { out } => {
            if out.exists() {
                bail!("{} already exists; refusing to overwrite", out.display());
            }
            let config = NodeConfig::default();
            let toml = toml::to_string_pretty(&config)?;
            std::fs::write(&out, toml)?;
            println!("wrote default configuration to {}", out.display());
            Ok(())
        }
    }
}
