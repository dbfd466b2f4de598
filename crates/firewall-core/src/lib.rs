//! The Normalizer and the Firewall orchestrator: the two components that
//! turn raw JSON-RPC into verdicts, enforcing Cognitive Sever and Paymaster
//! Slashing on top of the detection engines in `firewall-engines`.

pub mod firewall;
pub mod normalizer;
pub mod sever;
pub mod slashing;

pub use firewall::{EngineSummary, Firewall, FirewallStats, RecentBlock};
pub use normalizer::{Classification, Normalizer};
pub use slashing::SlashRegistry;
