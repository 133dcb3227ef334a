//! Outbound render contract
//!
//! Tables push a `RoundSnapshot` to a `Notifier` on every state change. The
//! notifier stands in for the messaging collaborator and is strictly
//! best-effort: a failed render is logged and dropped, never propagated
//! back into round state.

use crate::dice::Roll;
use crate::history::HistoryEntry;
use crate::round::{Phase, TableId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A render slower than this is treated as failed and dropped
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the collaborator needs to render the table's current state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub table: TableId,
    pub round_seq: u64,
    pub phase: Phase,
    pub seconds_remaining: u64,
    pub high_total: u64,
    pub high_count: usize,
    pub low_total: u64,
    pub low_count: usize,
    pub recent_history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Roll>,
}

/// Sink for state-change snapshots
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn render(&self, snapshot: RoundSnapshot) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("render sink unavailable: {0}")]
    Unavailable(String),

    #[error("render rejected: {0}")]
    Rejected(String),
}

/// Deliver a snapshot without ever blocking the caller. The render runs on
/// its own task under a timeout; failures and expiries are logged and
/// dropped so a hung collaborator can never stall a round.
pub fn notify_best_effort(notifier: Arc<dyn Notifier>, snapshot: RoundSnapshot) {
    let table = snapshot.table;
    let round = snapshot.round_seq;
    tokio::spawn(async move {
        match tokio::time::timeout(RENDER_TIMEOUT, notifier.render(snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(table, round, error = %e, "dropping failed render");
            }
            Err(_) => {
                tracing::warn!(table, round, "dropping render that timed out");
            }
        }
    });
}

/// Discards every snapshot; the default when no collaborator is wired up
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn render(&self, _snapshot: RoundSnapshot) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Logs each snapshot; used by the demo binary
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn render(&self, snapshot: RoundSnapshot) -> Result<(), NotifyError> {
        tracing::info!(
            table = snapshot.table,
            round = snapshot.round_seq,
            phase = ?snapshot.phase,
            seconds_remaining = snapshot.seconds_remaining,
            high = snapshot.high_total,
            low = snapshot.low_total,
            outcome = ?snapshot.outcome.map(|r| r.total()),
            "render"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingNotifier {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn render(&self, _snapshot: RoundSnapshot) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Unavailable("collaborator offline".to_string()))
        }
    }

    fn snapshot() -> RoundSnapshot {
        RoundSnapshot {
            table: 1,
            round_seq: 1,
            phase: Phase::Open,
            seconds_remaining: 30,
            high_total: 0,
            high_count: 0,
            low_total: 0,
            low_count: 0,
            recent_history: vec![],
            outcome: None,
        }
    }

    struct HangingNotifier;

    #[async_trait]
    impl Notifier for HangingNotifier {
        async fn render(&self, _snapshot: RoundSnapshot) -> Result<(), NotifyError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_failed_render_is_swallowed() {
        let notifier = Arc::new(FailingNotifier {
            attempts: AtomicUsize::new(0),
        });
        // Must not panic or propagate
        notify_best_effort(Arc::clone(&notifier) as Arc<dyn Notifier>, snapshot());
        tokio::task::yield_now().await;
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_render_does_not_block_caller() {
        // Returns immediately even though the render never completes
        notify_best_effort(Arc::new(HangingNotifier), snapshot());
        // The spawned render is abandoned once the timeout elapses
        tokio::time::sleep(RENDER_TIMEOUT + Duration::from_secs(1)).await;
    }

    #[test]
    fn test_snapshot_serializes_without_outcome_field_when_open() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"open\""));
        assert!(!json.contains("outcome"));
    }
}
