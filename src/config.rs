//! Engine configuration with validation and defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every table the engine runs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Balance granted to an actor on first interaction (smallest unit)
    pub starting_balance: u64,
    /// Length of the wagering window, in seconds
    pub round_secs: u64,
    /// House fee on gross winnings, in basis points (250 = 2.5%)
    pub fee_bps: u32,
    /// Largest single stake a table accepts
    pub max_stake: u64,
    /// How many recent outcomes each table remembers
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_balance: 200_000,
            round_secs: 30,
            fee_bps: 0,
            max_stake: 10_000_000,
            history_capacity: 20,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that would make a table misbehave
    pub fn validate(&self) -> Result<(), String> {
        if self.round_secs == 0 {
            return Err("round_secs must be positive".to_string());
        }
        if self.fee_bps >= 10_000 {
            return Err(format!(
                "fee_bps must be below 10000, got {}",
                self.fee_bps
            ));
        }
        if self.max_stake == 0 {
            return Err("max_stake must be positive".to_string());
        }
        // A winning payout is 2x the stake, which must fit in u64
        if self.max_stake > u64::MAX / 2 {
            return Err(format!(
                "max_stake must not exceed {}, got {}",
                u64::MAX / 2,
                self.max_stake
            ));
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be positive".to_string());
        }
        Ok(())
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(self.round_secs)
    }
}
