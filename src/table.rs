//! Table: one independent betting context and its round scheduler
//!
//! A table owns the active round slot behind a single mutex. Wager
//! placement, operator close, and the deadline transition all go through
//! that mutex, so a wager racing the lock is either fully accepted before
//! the stake lists are snapshotted or rejected, never half-applied.
//!
//! The driver task runs one round at a time: open, count down, lock, draw,
//! settle, then repeat while the table stays enabled. The countdown is a
//! `select!` between the deadline sleep and a per-round oneshot fired by
//! `force_close`; whichever side takes the `Open -> Locked` transition under
//! the mutex wins, exactly once, and a close signal can never leak into the
//! next round.

use crate::config::EngineConfig;
use crate::dice::OutcomeSource;
use crate::errors::{BetError, HiloResult};
use crate::history::History;
use crate::ledger::Ledger;
use crate::notify::{notify_best_effort, Notifier, RoundSnapshot};
use crate::round::{ActorId, Phase, Round, Side, TableId, Wager};
use crate::settlement::{settle, SettlementReport};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct TableState {
    round: Option<Round>,
    /// Fires the countdown early on operator close; taken at most once per round
    close_tx: Option<oneshot::Sender<()>>,
}

/// One betting context: active round, scheduler task, auto-repeat flag
pub struct Table {
    id: TableId,
    config: EngineConfig,
    ledger: Arc<Ledger>,
    history: Arc<History>,
    notifier: Arc<dyn Notifier>,
    dice: Arc<dyn OutcomeSource>,
    state: Mutex<TableState>,
    enabled: AtomicBool,
    round_seq: AtomicU64,
    driver: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Table {
    pub fn new(
        id: TableId,
        config: EngineConfig,
        ledger: Arc<Ledger>,
        notifier: Arc<dyn Notifier>,
        dice: Arc<dyn OutcomeSource>,
    ) -> Self {
        let history = Arc::new(History::new(config.history_capacity));
        Self {
            id,
            config,
            ledger,
            history,
            notifier,
            dice,
            state: Mutex::new(TableState {
                round: None,
                close_tx: None,
            }),
            enabled: AtomicBool::new(false),
            round_seq: AtomicU64::new(0),
            driver: tokio::sync::Mutex::new(None),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turn auto-repeat on and start the driver task if none is running.
    /// Idempotent.
    pub async fn enable(self: Arc<Self>) {
        self.enabled.store(true, Ordering::SeqCst);
        let mut driver = self.driver.lock().await;
        let running = driver.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        if running {
            return;
        }
        tracing::info!(table = self.id, "table enabled");
        let table = Arc::clone(&self);
        *driver = Some(tokio::spawn(async move { table.run().await }));
    }

    /// Turn auto-repeat off. Never interrupts a round in progress; the
    /// driver exits after the current round settles. Idempotent.
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::SeqCst) {
            tracing::info!(table = self.id, "table disabled");
        }
    }

    /// Disable and wait for the driver task to finish its current round
    pub async fn shutdown(&self) {
        self.disable();
        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Place a stake on one side of the active round. The debit and the
    /// wager append happen under the table mutex; a rejected wager leaves
    /// the balance untouched.
    pub fn place_wager(&self, actor: ActorId, side: Side, amount: u64) -> HiloResult<()> {
        if amount == 0 || amount > self.config.max_stake {
            return Err(BetError::InvalidAmount(amount));
        }

        let snapshot = {
            let mut state = self.state.lock().expect("table lock poisoned");
            let round = state.round.as_mut().ok_or(BetError::NoActiveRound)?;
            if round.phase() != Phase::Open {
                return Err(BetError::RoundClosed {
                    round: round.seq,
                    phase: round.phase(),
                });
            }
            self.ledger.debit(actor, amount)?;
            round.push_wager(Wager {
                actor,
                side,
                stake: amount,
            });
            tracing::debug!(
                table = self.id,
                round = round.seq,
                actor,
                side = %side,
                amount,
                "wager accepted"
            );
            self.snapshot_locked(round)
        };

        notify_best_effort(Arc::clone(&self.notifier), snapshot);
        Ok(())
    }

    /// Operator-forced early close. Flips `Open -> Locked` and wakes the
    /// countdown; a no-op when the round is already past `Open`.
    pub fn force_close(&self) -> HiloResult<()> {
        let mut state = self.state.lock().expect("table lock poisoned");
        let round = state.round.as_ref().ok_or(BetError::NoActiveRound)?;
        let seq = round.seq;
        let flipped = state
            .round
            .as_mut()
            .map(|r| r.lock())
            .unwrap_or(false);
        if flipped {
            tracing::info!(table = self.id, round = seq, "round closed by operator");
            if let Some(tx) = state.close_tx.take() {
                let _ = tx.send(());
            }
        }
        Ok(())
    }

    /// Current state of the table for on-demand rendering
    pub fn status(&self) -> HiloResult<RoundSnapshot> {
        let state = self.state.lock().expect("table lock poisoned");
        let round = state.round.as_ref().ok_or(BetError::NoActiveRound)?;
        Ok(self.snapshot_locked(round))
    }

    /// Driver loop: one round per iteration while the table is enabled.
    /// The exit decision is re-confirmed under the driver lock so an
    /// `enable()` racing the final check can never be lost: either the
    /// driver sees the flag and keeps running, or it has cleared its
    /// handle and `enable()` spawns a fresh one.
    async fn run(self: Arc<Self>) {
        loop {
            if !self.is_enabled() {
                let mut driver = self.driver.lock().await;
                if self.is_enabled() {
                    // Re-enabled between the flag check and the lock
                    continue;
                }
                *driver = None;
                break;
            }
            self.run_round().await;
        }
        tracing::info!(table = self.id, "driver stopped");
    }

    async fn run_round(&self) {
        let seq = self.round_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + self.config.round_duration();
        let (close_tx, close_rx) = oneshot::channel();

        let snapshot = {
            let mut state = self.state.lock().expect("table lock poisoned");
            state.round = Some(Round::open(seq, deadline));
            state.close_tx = Some(close_tx);
            self.snapshot_locked(state.round.as_ref().expect("round just opened"))
        };
        tracing::info!(table = self.id, round = seq, "round open");
        notify_best_effort(Arc::clone(&self.notifier), snapshot);

        // Countdown: natural expiry or operator close, whichever first
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = close_rx => {}
        }

        let snapshot = {
            let mut state = self.state.lock().expect("table lock poisoned");
            // Drop the close sender so a late force_close is a pure no-op
            state.close_tx = None;
            let round = state.round.as_mut().expect("round present until settled");
            if round.lock() {
                tracing::info!(table = self.id, round = seq, "round locked on deadline");
            }
            self.snapshot_locked(round)
        };
        notify_best_effort(Arc::clone(&self.notifier), snapshot);

        let roll = self.dice.draw();
        let (report, snapshot) = {
            let mut state = self.state.lock().expect("table lock poisoned");
            let round = state.round.as_mut().expect("round present until settled");
            let report = settle(round, roll, &self.ledger, &self.history, self.config.fee_bps);
            if report.is_err() {
                // Settlement faults abandon the round rather than retry;
                // retrying could double-credit.
                round.mark_settled();
            }
            (report, self.snapshot_locked(round))
        };
        match report {
            Ok(report) => self.log_report(&report),
            Err(e) => {
                tracing::error!(table = self.id, round = seq, error = %e, "round abandoned");
            }
        }
        notify_best_effort(Arc::clone(&self.notifier), snapshot);
    }

    fn log_report(&self, report: &SettlementReport) {
        tracing::debug!(
            table = self.id,
            round = report.round_seq,
            dice = ?report.roll.dice,
            side = %report.winning_side,
            "settlement report"
        );
    }

    /// Build a snapshot. Caller holds the table mutex.
    fn snapshot_locked(&self, round: &Round) -> RoundSnapshot {
        let seconds_remaining = if round.phase() == Phase::Open {
            round
                .deadline
                .saturating_duration_since(Instant::now())
                .as_secs()
        } else {
            0
        };
        RoundSnapshot {
            table: self.id,
            round_seq: round.seq,
            phase: round.phase(),
            seconds_remaining,
            high_total: round.side_total(Side::High),
            high_count: round.side_count(Side::High),
            low_total: round.side_total(Side::Low),
            low_count: round.side_count(Side::Low),
            recent_history: self.history.recent(self.config.history_capacity),
            outcome: round.outcome,
        }
    }
}
