//! Error types for the betting engine
//!
//! Every failure here is recoverable and reported back to the caller;
//! none of them take down a table.

use crate::round::{Phase, TableId};

/// Errors surfaced by wager placement, round control, and settlement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BetError {
    #[error("invalid stake amount: {0}")]
    InvalidAmount(u64),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error("round {round} is closed (phase {phase:?})")]
    RoundClosed { round: u64, phase: Phase },

    #[error("round {0} already settled")]
    AlreadySettled(u64),

    #[error("no active round")]
    NoActiveRound,

    #[error("table {0} is disabled")]
    TableDisabled(TableId),
}

/// Convenience alias used across the crate
pub type HiloResult<T> = Result<T, BetError>;
