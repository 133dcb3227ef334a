//! Settlement: pays out a locked round exactly once
//!
//! The scheduler hands a `Locked` round to `settle` together with the drawn
//! roll. Settlement resolves the round, credits every winning wager, records
//! every losing one, appends the history entry, and marks the round
//! `Settled`. A round that is already `Settled` (or was already resolved by
//! a previous call) is rejected without touching the ledger, so a duplicate
//! invocation can never double-credit.

use crate::dice::Roll;
use crate::errors::{BetError, HiloResult};
use crate::history::{History, HistoryEntry};
use crate::ledger::Ledger;
use crate::round::{ActorId, Phase, Round, Side};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payout {
    pub actor: ActorId,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Loss {
    pub actor: ActorId,
    pub stake: u64,
}

/// What a settled round paid out, in wager-acceptance order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub round_seq: u64,
    pub roll: Roll,
    pub winning_side: Side,
    pub winners: Vec<Payout>,
    pub losers: Vec<Loss>,
    pub pot: u64,
    pub fee_collected: u64,
}

/// Gross payout for a winning stake is double the stake; the house fee is
/// taken from the gross in basis points, integer division rounding in the
/// house's favor.
pub fn winning_payout(stake: u64, fee_bps: u32) -> (u64, u64) {
    let gross = stake * 2;
    let fee = gross * u64::from(fee_bps) / 10_000;
    (gross - fee, fee)
}

/// Settle a locked round. Only actors holding an actual wager in the round
/// are paid or recorded as losers; bystanders are never touched.
pub fn settle(
    round: &mut Round,
    roll: Roll,
    ledger: &Ledger,
    history: &History,
    fee_bps: u32,
) -> HiloResult<SettlementReport> {
    match round.phase() {
        Phase::Locked => {}
        Phase::Settled | Phase::Resolved => {
            return Err(BetError::AlreadySettled(round.seq));
        }
        Phase::Open => {
            return Err(BetError::RoundClosed {
                round: round.seq,
                phase: Phase::Open,
            });
        }
    }

    round.resolve(roll);
    let winning_side = roll.side();
    let pot = round.pot();

    let mut winners = Vec::with_capacity(round.side_count(winning_side));
    let mut fee_collected = 0u64;
    for wager in round.wagers(winning_side) {
        let (payout, fee) = winning_payout(wager.stake, fee_bps);
        ledger.credit(wager.actor, payout);
        fee_collected += fee;
        winners.push(Payout {
            actor: wager.actor,
            payout,
        });
    }

    let losing_side = winning_side.opposite();
    let mut losers = Vec::with_capacity(round.side_count(losing_side));
    for wager in round.wagers(losing_side) {
        ledger.record_loss(wager.actor, wager.stake);
        losers.push(Loss {
            actor: wager.actor,
            stake: wager.stake,
        });
    }

    history.push(HistoryEntry {
        round_seq: round.seq,
        side: winning_side,
    });
    round.mark_settled();

    tracing::info!(
        round = round.seq,
        total = roll.total(),
        side = %winning_side,
        pot,
        winners = winners.len(),
        losers = losers.len(),
        fee_collected,
        "round settled"
    );

    Ok(SettlementReport {
        round_seq: round.seq,
        roll,
        winning_side,
        winners,
        losers,
        pot,
        fee_collected,
    })
}
