//! hilo - timed parimutuel high/low dice betting engine
//!
//! A repeating round state machine: open a wagering window, accept
//! concurrent stakes from many actors, close on a deadline or operator
//! command, draw three dice, and settle every wager exactly once. The chat
//! front end is an external collaborator: it feeds [`registry::Command`]s in
//! and receives [`notify::RoundSnapshot`]s out.

pub mod config;
pub mod dice;
pub mod errors;
pub mod history;
pub mod ledger;
pub mod notify;
pub mod registry;
pub mod round;
pub mod settlement;
pub mod table;

pub use config::EngineConfig;
pub use dice::{OutcomeSource, Roll, ThreadRngDice};
pub use errors::{BetError, HiloResult};
pub use ledger::{AccountView, Ledger};
pub use notify::{Notifier, RoundSnapshot};
pub use registry::{Command, CommandReply, TableRegistry};
pub use round::{ActorId, Phase, Side, TableId, Wager};
pub use settlement::SettlementReport;
pub use table::Table;
