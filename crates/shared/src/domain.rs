use std::fmt;

use serde::{Deserialize, Serialize};

/// Account identity reported by the session provider and recorded by ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two fixed ballot options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    A,
    B,
}

impl Candidate {
    /// Both options in display order.
    pub const ALL: [Candidate; 2] = [Candidate::A, Candidate::B];
}

/// Aggregate vote counts as reported by the ledger. Counts only grow from the
/// perspective of a single client session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub candidate_a: u64,
    pub candidate_b: u64,
}

impl VoteTally {
    pub fn count_for(&self, candidate: Candidate) -> u64 {
        match candidate {
            Candidate::A => self.candidate_a,
            Candidate::B => self.candidate_b,
        }
    }
}

impl From<(u64, u64)> for VoteTally {
    fn from((candidate_a, candidate_b): (u64, u64)) -> Self {
        Self {
            candidate_a,
            candidate_b,
        }
    }
}

impl From<VoteTally> for (u64, u64) {
    fn from(tally: VoteTally) -> Self {
        (tally.candidate_a, tally.candidate_b)
    }
}

/// Per-candidate voting flags for one account. Gating reads go through
/// [`VoterStatus::has_voted`]; the ledger never clears a set flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    pub candidate_a: bool,
    pub candidate_b: bool,
}

impl VoterStatus {
    pub fn has_voted(&self, candidate: Candidate) -> bool {
        match candidate {
            Candidate::A => self.candidate_a,
            Candidate::B => self.candidate_b,
        }
    }

    pub fn mark_voted(&mut self, candidate: Candidate) {
        match candidate {
            Candidate::A => self.candidate_a = true,
            Candidate::B => self.candidate_b = true,
        }
    }
}

impl From<(bool, bool)> for VoterStatus {
    fn from((candidate_a, candidate_b): (bool, bool)) -> Self {
        Self {
            candidate_a,
            candidate_b,
        }
    }
}

/// Snapshot of the wallet session as last observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub signed_in: bool,
    pub account_id: Option<AccountId>,
}
