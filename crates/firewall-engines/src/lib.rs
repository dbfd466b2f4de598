//! The seven deterministic detection engines that make up the firewall
//! pipeline, plus the shared `Engine` trait they implement. Every engine is
//! CPU-only and returns synchronously except [`evm_simulator::EvmSimulator`],
//! which performs a real network round trip and is the only one that
//! genuinely suspends.

pub mod asset_guard;
pub mod capital_velocity;
pub mod engine;
pub mod entropy_guard;
pub mod evm_simulator;
pub mod hashutil;
pub mod payload_quantizer;
pub mod threat_feed;
pub mod trajectory_hash;

pub use asset_guard::AssetGuard;
pub use capital_velocity::CapitalVelocity;
pub use engine::Engine;
pub use entropy_guard::EntropyGuard;
pub use evm_simulator::{EvmSimulator, HttpSimulatorClient, SimulationOutcome, SimulatorClient};
pub use payload_quantizer::PayloadQuantizer;
pub use threat_feed::{curated_seed, ThreatFeed, ThreatFeedSeed, ThreatFeedStats, ThreatFeedUpdate};
pub use trajectory_hash::TrajectoryHash;
