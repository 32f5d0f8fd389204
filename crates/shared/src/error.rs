use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections a vote ledger surfaces. Implementations carry these inside
/// `anyhow::Error`; callers that care about the distinction recover them by
/// downcast.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerError {
    #[error("vote already recorded for this account")]
    AlreadyVoted,
    #[error("caller is not signed in")]
    NotSignedIn,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
