//! The Key Vault: encrypted key storage that re-invokes the firewall on
//! every signing path, plus the length-delimited JSON duplex wire protocol
//! used to reach it from an agent process.

mod key_store;
mod server;
mod vault;
mod wire;

pub use server::serve_connection;
pub use vault::{KeyVault, VaultHealth};
pub use wire::{read_request, write_response, VaultRequest, VaultResponse};
