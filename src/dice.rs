//! Outcome generation: three dice, high/low mapping
//!
//! The draw sits behind a trait so tables can be tested with a fixed
//! outcome. The default source uses the thread-local OS-seeded RNG, which
//! no client input can influence.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::round::Side;

/// Totals of 11..=18 are high, 3..=10 are low. 11 splits the 3..=18 range
/// closer to even than the naive midpoint.
pub const HIGH_THRESHOLD: u8 = 11;

/// One drawn outcome: three dice in 1..=6
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roll {
    pub dice: [u8; 3],
}

impl Roll {
    pub fn new(dice: [u8; 3]) -> Self {
        debug_assert!(dice.iter().all(|d| (1..=6).contains(d)));
        Self { dice }
    }

    pub fn total(&self) -> u8 {
        self.dice.iter().sum()
    }

    pub fn side(&self) -> Side {
        if self.total() >= HIGH_THRESHOLD {
            Side::High
        } else {
            Side::Low
        }
    }
}

/// Source of round outcomes
pub trait OutcomeSource: Send + Sync {
    fn draw(&self) -> Roll;
}

/// Default source backed by `rand::thread_rng`
#[derive(Debug, Default)]
pub struct ThreadRngDice;

impl OutcomeSource for ThreadRngDice {
    fn draw(&self) -> Roll {
        let mut rng = rand::thread_rng();
        Roll::new([
            rng.gen_range(1..=6),
            rng.gen_range(1..=6),
            rng.gen_range(1..=6),
        ])
    }
}

/// Fixed outcome source for deterministic tests and demos
#[derive(Debug, Clone, Copy)]
pub struct FixedDice(pub Roll);

impl OutcomeSource for FixedDice {
    fn draw(&self) -> Roll {
        self.0
    }
}
