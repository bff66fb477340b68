//! Agreement strategy selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which agreement variant the engine runs.
///
/// Both variants share the engine; they differ in whether a PREPARE round
/// precedes the commit vote and in the quorum threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementMode {
    /// PROPOSE, PREPARE, COMMIT with quorum `2f+1` of `3f+1`.
    #[serde(rename = "pbft")]
    ThreePhase,
    /// PROPOSE then one signature round with a simple-majority quorum.
    ///
    /// Nothing binds a validator to one proposal before it signs, so an
    /// equivocating proposer can split the vote. Use `ThreePhase` when the
    /// set must tolerate Byzantine members.
    #[serde(rename = "ebft")]
    SingleRound,
}

impl AgreementMode {
    /// Maximum number of faulty validators tolerated among `n`.
    pub fn max_faulty(&self, n: usize) -> usize {
        match self {
            AgreementMode::ThreePhase => n.saturating_sub(1) / 3,
            AgreementMode::SingleRound => n.saturating_sub(1) / 2,
        }
    }

    /// Matching messages required to decide a phase among `n` validators.
    pub fn quorum_size(&self, n: usize) -> usize {
        match self {
            // n - f rather than 2f+1: the two agree at n = 3f+1, but for
            // n = 5 a quorum of 3 lets two quorums meet only in the single
            // member that may be faulty.
            AgreementMode::ThreePhase => n - self.max_faulty(n),
            AgreementMode::SingleRound => n / 2 + 1,
        }
    }

    /// Whether a PREPARE quorum must precede COMMIT votes.
    pub fn uses_prepare(&self) -> bool {
        matches!(self, AgreementMode::ThreePhase)
    }
}

impl fmt::Display for AgreementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgreementMode::ThreePhase => f.write_str("pbft"),
            AgreementMode::SingleRound => f.write_str("ebft"),
        }
    }
}

/// Unknown agreement algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown consensus algorithm: {0} (expected \"pbft\" or \"ebft\")")]
pub struct UnknownModeError(pub String);

impl FromStr for AgreementMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pbft" => Ok(AgreementMode::ThreePhase),
            "ebft" => Ok(AgreementMode::SingleRound),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}
