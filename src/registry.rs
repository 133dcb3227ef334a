//! Table registry and inbound command surface
//!
//! Maps table identifiers to owned `Table` instances, replacing the
//! process-wide dictionaries of the source bots. Tables share one ledger;
//! everything else is per table. The `Command`/`CommandReply` pair mirrors
//! the message stream the excluded chat collaborator feeds us.

use crate::config::EngineConfig;
use crate::dice::{OutcomeSource, ThreadRngDice};
use crate::errors::{BetError, HiloResult};
use crate::ledger::{AccountView, Ledger};
use crate::notify::{Notifier, NullNotifier, RoundSnapshot};
use crate::round::{ActorId, Side, TableId};
use crate::table::Table;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inbound command from the messaging collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Enable { table: TableId },
    Disable { table: TableId },
    PlaceWager { table: TableId, actor: ActorId, side: Side, amount: u64 },
    ForceClose { table: TableId },
    QueryBalance { actor: ActorId },
    QueryLeaderboard { n: usize },
    /// Privileged; rate limiting is the collaborator's concern
    GrantTopUp { actor: ActorId, amount: u64 },
}

/// Successful command outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Ack,
    Balance { account: AccountView },
    Leaderboard { rows: Vec<AccountView> },
}

/// All tables the engine runs, plus the shared ledger
pub struct TableRegistry {
    config: EngineConfig,
    ledger: Arc<Ledger>,
    notifier: Arc<dyn Notifier>,
    dice: Arc<dyn OutcomeSource>,
    tables: DashMap<TableId, Arc<Table>>,
}

impl TableRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, Arc::new(NullNotifier), Arc::new(ThreadRngDice))
    }

    pub fn with_parts(
        config: EngineConfig,
        notifier: Arc<dyn Notifier>,
        dice: Arc<dyn OutcomeSource>,
    ) -> Self {
        let ledger = Arc::new(Ledger::new(config.starting_balance));
        Self {
            config,
            ledger,
            notifier,
            dice,
            tables: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Create the table on first enable, then start (or restart) its rounds
    pub async fn enable(&self, table: TableId) {
        let table = self
            .tables
            .entry(table)
            .or_insert_with(|| {
                Arc::new(Table::new(
                    table,
                    self.config.clone(),
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.notifier),
                    Arc::clone(&self.dice),
                ))
            })
            .clone();
        table.enable().await;
    }

    /// Stop auto-repeat for the table; unknown tables are a no-op
    pub fn disable(&self, table: TableId) {
        if let Some(table) = self.tables.get(&table) {
            table.disable();
        }
    }

    pub fn place_wager(
        &self,
        table: TableId,
        actor: ActorId,
        side: Side,
        amount: u64,
    ) -> HiloResult<()> {
        self.table(table)?.place_wager(actor, side, amount)
    }

    pub fn force_close(&self, table: TableId) -> HiloResult<()> {
        self.table(table)?.force_close()
    }

    pub fn status(&self, table: TableId) -> HiloResult<RoundSnapshot> {
        self.table(table)?.status()
    }

    pub fn query_balance(&self, actor: ActorId) -> AccountView {
        self.ledger.get_or_create(actor)
    }

    pub fn query_leaderboard(&self, n: usize) -> Vec<AccountView> {
        self.ledger.ranked_by_balance(n)
    }

    pub fn grant_top_up(&self, actor: ActorId, amount: u64) -> AccountView {
        tracing::info!(actor, amount, "administrative top-up");
        self.ledger.top_up(actor, amount)
    }

    /// Route one inbound command to the owning table or the ledger
    pub async fn dispatch(&self, command: Command) -> HiloResult<CommandReply> {
        match command {
            Command::Enable { table } => {
                self.enable(table).await;
                Ok(CommandReply::Ack)
            }
            Command::Disable { table } => {
                self.disable(table);
                Ok(CommandReply::Ack)
            }
            Command::PlaceWager {
                table,
                actor,
                side,
                amount,
            } => {
                self.place_wager(table, actor, side, amount)?;
                Ok(CommandReply::Ack)
            }
            Command::ForceClose { table } => {
                self.force_close(table)?;
                Ok(CommandReply::Ack)
            }
            Command::QueryBalance { actor } => Ok(CommandReply::Balance { account: self.query_balance(actor) }),
            Command::QueryLeaderboard { n } => {
                Ok(CommandReply::Leaderboard { rows: self.query_leaderboard(n) })
            }
            Command::GrantTopUp { actor, amount } => {
                Ok(CommandReply::Balance { account: self.grant_top_up(actor, amount) })
            }
        }
    }

    /// Disable every table and wait for their current rounds to finish
    pub async fn shutdown(&self) {
        let tables: Vec<Arc<Table>> = self.tables.iter().map(|e| Arc::clone(e.value())).collect();
        for table in &tables {
            table.disable();
        }
        for table in tables {
            table.shutdown().await;
        }
    }

    fn table(&self, table: TableId) -> HiloResult<Arc<Table>> {
        self.tables
            .get(&table)
            .map(|e| Arc::clone(e.value()))
            .ok_or(BetError::TableDisabled(table))
    }
}
