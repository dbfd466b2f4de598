//! Core value types shared across the transaction firewall workspace:
//! `TxView`, `Verdict`, the configuration schema, the injectable `Clock`,
//! and the crate-wide error taxonomy. No I/O, no async — this crate is pure
//! data and validation so every other crate can depend on it cheaply.

pub mod clock;
pub mod config;
pub mod error;
pub mod tx_view;
pub mod verdict;

pub use clock::{Clock, SystemClock, TestClock};
pub use config::{
    AssetConfig, EntropyConfig, FirewallConfig, QuantizerConfig, SimulatorConfig,
    ThreatFeedConfig, TrajectoryConfig, VelocityConfig,
};
pub use error::{ErrorCode, FirewallError};
pub use tx_view::TxView;
pub use verdict::{EngineId, Verdict, VerdictCode};
