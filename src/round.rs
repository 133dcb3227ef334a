//! Round state: phases, sides, wagers, and the lock-time stake snapshot

use crate::dice::Roll;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

pub type ActorId = i64;
pub type TableId = i64;

/// The two mutually exclusive outcomes of a round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    High,
    Low,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::High => Side::Low,
            Side::Low => Side::High,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::High => write!(f, "high"),
            Side::Low => write!(f, "low"),
        }
    }
}

/// Position of a round in its lifecycle; transitions are strictly forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Open,
    Locked,
    Resolved,
    Settled,
}

/// A single actor's stake on one side, immutable once accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wager {
    pub actor: ActorId,
    pub side: Side,
    pub stake: u64,
}

/// One timed betting window, its wagers, and the outcome once drawn
#[derive(Debug)]
pub struct Round {
    pub seq: u64,
    phase: Phase,
    pub deadline: Instant,
    high: Vec<Wager>,
    low: Vec<Wager>,
    pub outcome: Option<Roll>,
}

impl Round {
    pub fn open(seq: u64, deadline: Instant) -> Self {
        Self {
            seq,
            phase: Phase::Open,
            deadline,
            high: Vec::new(),
            low: Vec::new(),
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Append an accepted wager. Caller must hold the table lock and must
    /// have already taken the debit; the round only records it.
    pub fn push_wager(&mut self, wager: Wager) {
        debug_assert_eq!(self.phase, Phase::Open);
        match wager.side {
            Side::High => self.high.push(wager),
            Side::Low => self.low.push(wager),
        }
    }

    /// Flip `Open -> Locked`. Returns false if the round was already locked,
    /// so a deadline expiry racing an operator close resolves to one winner.
    pub fn lock(&mut self) -> bool {
        if self.phase == Phase::Open {
            self.phase = Phase::Locked;
            true
        } else {
            false
        }
    }

    /// Attach the drawn outcome, `Locked -> Resolved`
    pub fn resolve(&mut self, roll: Roll) {
        debug_assert_eq!(self.phase, Phase::Locked);
        self.outcome = Some(roll);
        self.phase = Phase::Resolved;
    }

    /// Terminal transition; after this the round can never pay out again
    pub fn mark_settled(&mut self) {
        self.phase = Phase::Settled;
    }

    pub fn wagers(&self, side: Side) -> &[Wager] {
        match side {
            Side::High => &self.high,
            Side::Low => &self.low,
        }
    }

    pub fn side_total(&self, side: Side) -> u64 {
        self.wagers(side).iter().map(|w| w.stake).sum()
    }

    pub fn side_count(&self, side: Side) -> usize {
        self.wagers(side).len()
    }

    /// Total staked across both sides; by construction equal to the sum of
    /// debits taken for this round (a wager is only pushed after its debit)
    pub fn pot(&self) -> u64 {
        self.side_total(Side::High) + self.side_total(Side::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn open_round() -> Round {
        Round::open(1, Instant::now() + Duration::from_secs(30))
    }

    #[test]
    fn test_wagers_append_per_side_in_order() {
        let mut round = open_round();
        round.push_wager(Wager { actor: 1, side: Side::High, stake: 100 });
        round.push_wager(Wager { actor: 2, side: Side::Low, stake: 200 });
        round.push_wager(Wager { actor: 3, side: Side::High, stake: 300 });

        assert_eq!(round.side_count(Side::High), 2);
        assert_eq!(round.side_count(Side::Low), 1);
        assert_eq!(round.wagers(Side::High)[0].actor, 1);
        assert_eq!(round.wagers(Side::High)[1].actor, 3);
        assert_eq!(round.side_total(Side::High), 400);
        assert_eq!(round.pot(), 600);
    }

    #[test]
    fn test_lock_is_exactly_once() {
        let mut round = open_round();
        assert!(round.lock());
        assert!(!round.lock());
        assert_eq!(round.phase(), Phase::Locked);
    }

    #[test]
    fn test_phase_progression() {
        let mut round = open_round();
        assert_eq!(round.phase(), Phase::Open);
        round.lock();
        round.resolve(Roll::new([6, 4, 4]));
        assert_eq!(round.phase(), Phase::Resolved);
        assert_eq!(round.outcome.unwrap().total(), 14);
        round.mark_settled();
        assert_eq!(round.phase(), Phase::Settled);
    }

    #[test]
    fn test_side_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Side::High).unwrap(), "\"high\"");
        assert_eq!(Side::High.opposite(), Side::Low);
    }
}
