//! Verdict value type: the output of every engine and of the firewall
//! orchestrator itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic outcome code. Serializes as `SCREAMING_SNAKE_CASE`, matching the
/// teacher's convention for wire-facing verdict enums
/// (`services::agentic::rules::Verdict`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictCode {
    Allow,
    BlockDenylist,
    BlockLoop,
    BlockVelocity,
    BlockSingleCap,
    BlockEntropy,
    BlockAsset,
    BlockQuantize,
    BlockSimulation,
    BlockSever,
    BlockWhitelist,
}

impl VerdictCode {
    pub fn is_block(self) -> bool {
        !matches!(self, VerdictCode::Allow)
    }
}

impl fmt::Display for VerdictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictCode::Allow => "ALLOW",
            VerdictCode::BlockDenylist => "BLOCK_DENYLIST",
            VerdictCode::BlockLoop => "BLOCK_LOOP",
            VerdictCode::BlockVelocity => "BLOCK_VELOCITY",
            VerdictCode::BlockSingleCap => "BLOCK_SINGLE_CAP",
            VerdictCode::BlockEntropy => "BLOCK_ENTROPY",
            VerdictCode::BlockAsset => "BLOCK_ASSET",
            VerdictCode::BlockQuantize => "BLOCK_QUANTIZE",
            VerdictCode::BlockSimulation => "BLOCK_SIMULATION",
            VerdictCode::BlockSever => "BLOCK_SEVER",
            VerdictCode::BlockWhitelist => "BLOCK_WHITELIST",
        };
        f.write_str(s)
    }
}

/// Identifies which engine (or orchestrator-level policy) produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EngineId {
    ThreatFeed,
    TrajectoryHash,
    CapitalVelocity,
    EntropyGuard,
    AssetGuard,
    PayloadQuantizer,
    EvmSimulator,
    /// Not an engine: the orchestrator's own Cognitive Sever policy.
    CognitiveSever,
    /// Not an engine: the gateway's pre-pipeline whitelist gate.
    WhitelistGate,
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineId::ThreatFeed => "ThreatFeed",
            EngineId::TrajectoryHash => "TrajectoryHash",
            EngineId::CapitalVelocity => "CapitalVelocity",
            EngineId::EntropyGuard => "EntropyGuard",
            EngineId::AssetGuard => "AssetGuard",
            EngineId::PayloadQuantizer => "PayloadQuantizer",
            EngineId::EvmSimulator => "EvmSimulator",
            EngineId::CognitiveSever => "CognitiveSever",
            EngineId::WhitelistGate => "WhitelistGate",
        };
        f.write_str(s)
    }
}

/// The outcome of evaluating a TxView: ALLOW or BLOCK, with enough context
/// for both logging and for the agent-facing feedback string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub blocked: bool,
    pub code: VerdictCode,
    pub engine: EngineId,
    /// Concise, bounded-length explanation for logs/dashboards.
    pub reason: String,
    /// Self-contained string suitable for reinsertion into an agent's
    /// context: names the class of problem and states that retrying with
    /// the same parameters will fail. Must never leak exact thresholds.
    pub feedback: String,
}

const MAX_REASON_LEN: usize = 240;

impl Verdict {
    pub fn allow() -> Self {
        Self {
            blocked: false,
            code: VerdictCode::Allow,
            engine: EngineId::ThreatFeed, // irrelevant for ALLOW; first in pipeline order
            reason: String::new(),
            feedback: String::new(),
        }
    }

    pub fn block(
        code: VerdictCode,
        engine: EngineId,
        reason: impl Into<String>,
        feedback: impl Into<String>,
    ) -> Self {
        let mut reason = reason.into();
        reason.truncate(MAX_REASON_LEN);
        Self {
            blocked: true,
            code,
            engine,
            reason,
            feedback: feedback.into(),
        }
    }
}
