//! Actor balance ledger
//!
//! Authoritative store of balances and lifetime win/loss counters. All
//! mutation goes through `debit`/`credit`/`record_loss`/`top_up`; each
//! operation holds the actor's dashmap entry exclusively, so concurrent
//! wagers from the same actor can never interleave a check with an update.

use crate::errors::{BetError, HiloResult};
use crate::round::ActorId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Account {
    balance: u64,
    lifetime_won: u64,
    lifetime_lost: u64,
    /// Position in registration order, the leaderboard tie-break key
    registered: u64,
}

/// Read-only snapshot of one actor's ledger state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountView {
    pub actor: ActorId,
    pub balance: u64,
    pub lifetime_won: u64,
    pub lifetime_lost: u64,
}

/// Thread-safe ledger shared by every table
pub struct Ledger {
    accounts: DashMap<ActorId, Account>,
    starting_balance: u64,
    registration_seq: AtomicU64,
}

impl Ledger {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            accounts: DashMap::new(),
            starting_balance,
            registration_seq: AtomicU64::new(0),
        }
    }

    /// Return the actor's state, creating the account on first interaction
    pub fn get_or_create(&self, actor: ActorId) -> AccountView {
        let entry = self.accounts.entry(actor).or_insert_with(|| Account {
            balance: self.starting_balance,
            lifetime_won: 0,
            lifetime_lost: 0,
            registered: self.registration_seq.fetch_add(1, Ordering::SeqCst),
        });
        AccountView {
            actor,
            balance: entry.balance,
            lifetime_won: entry.lifetime_won,
            lifetime_lost: entry.lifetime_lost,
        }
    }

    /// Atomically decrease the actor's balance. The only fallible ledger
    /// operation; on failure the balance is untouched.
    pub fn debit(&self, actor: ActorId, amount: u64) -> HiloResult<()> {
        let mut entry = self.accounts.entry(actor).or_insert_with(|| Account {
            balance: self.starting_balance,
            lifetime_won: 0,
            lifetime_lost: 0,
            registered: self.registration_seq.fetch_add(1, Ordering::SeqCst),
        });
        if amount > entry.balance {
            return Err(BetError::InsufficientFunds {
                balance: entry.balance,
                requested: amount,
            });
        }
        entry.balance -= amount;
        Ok(())
    }

    /// Atomically increase balance and lifetime winnings. Never fails.
    pub fn credit(&self, actor: ActorId, amount: u64) {
        let mut entry = self.entry(actor);
        entry.balance += amount;
        entry.lifetime_won += amount;
    }

    /// Record a settled loss. The stake was already taken at placement, so
    /// only the lifetime counter moves.
    pub fn record_loss(&self, actor: ActorId, stake: u64) {
        self.entry(actor).lifetime_lost += stake;
    }

    /// Administrative balance grant. Rate limiting is the caller's concern.
    pub fn top_up(&self, actor: ActorId, amount: u64) -> AccountView {
        {
            let mut entry = self.entry(actor);
            entry.balance += amount;
        }
        self.get_or_create(actor)
    }

    pub fn balance(&self, actor: ActorId) -> u64 {
        self.get_or_create(actor).balance
    }

    /// Top `n` actors by current balance, ties broken by registration order
    pub fn ranked_by_balance(&self, n: usize) -> Vec<AccountView> {
        self.ranked(n, |a| a.balance)
    }

    /// Top `n` actors by lifetime winnings, ties broken by registration order
    pub fn ranked_by_lifetime_won(&self, n: usize) -> Vec<AccountView> {
        self.ranked(n, |a| a.lifetime_won)
    }

    fn ranked(&self, n: usize, key: impl Fn(&Account) -> u64) -> Vec<AccountView> {
        let mut rows: Vec<(u64, u64, AccountView)> = self
            .accounts
            .iter()
            .map(|e| {
                (
                    key(e.value()),
                    e.value().registered,
                    AccountView {
                        actor: *e.key(),
                        balance: e.value().balance,
                        lifetime_won: e.value().lifetime_won,
                        lifetime_lost: e.value().lifetime_lost,
                    },
                )
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        rows.truncate(n);
        rows.into_iter().map(|(_, _, view)| view).collect()
    }

    fn entry(&self, actor: ActorId) -> dashmap::mapref::one::RefMut<'_, ActorId, Account> {
        self.accounts.entry(actor).or_insert_with(|| Account {
            balance: self.starting_balance,
            lifetime_won: 0,
            lifetime_lost: 0,
            registered: self.registration_seq.fetch_add(1, Ordering::SeqCst),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_interaction_creates_account() {
        let ledger = Ledger::new(200_000);
        let view = ledger.get_or_create(42);
        assert_eq!(view.balance, 200_000);
        assert_eq!(view.lifetime_won, 0);
        assert_eq!(view.lifetime_lost, 0);
    }

    #[test]
    fn test_debit_rejects_overdraft_untouched() {
        let ledger = Ledger::new(10_000);
        let err = ledger.debit(1, 20_000).unwrap_err();
        assert_eq!(
            err,
            BetError::InsufficientFunds {
                balance: 10_000,
                requested: 20_000
            }
        );
        assert_eq!(ledger.balance(1), 10_000);
    }

    #[test]
    fn test_debit_credit_roundtrip() {
        let ledger = Ledger::new(100);
        ledger.debit(1, 40).unwrap();
        assert_eq!(ledger.balance(1), 60);
        ledger.credit(1, 80);
        let view = ledger.get_or_create(1);
        assert_eq!(view.balance, 140);
        assert_eq!(view.lifetime_won, 80);
    }

    #[test]
    fn test_concurrent_debits_never_go_negative() {
        let ledger = Arc::new(Ledger::new(1_000));
        ledger.get_or_create(7);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    let mut ok = 0u64;
                    for _ in 0..100 {
                        if ledger.debit(7, 10).is_ok() {
                            ok += 10;
                        }
                    }
                    ok
                })
            })
            .collect();

        let debited: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // Exactly the starting balance can be drained, never more.
        assert_eq!(debited, 1_000);
        assert_eq!(ledger.balance(7), 0);
    }

    #[test]
    fn test_ranking_breaks_ties_by_registration() {
        let ledger = Ledger::new(500);
        ledger.get_or_create(30);
        ledger.get_or_create(10);
        ledger.get_or_create(20);
        ledger.top_up(20, 100);

        let top = ledger.ranked_by_balance(3);
        assert_eq!(top[0].actor, 20);
        // 30 registered before 10, both at 500
        assert_eq!(top[1].actor, 30);
        assert_eq!(top[2].actor, 10);
    }

    #[test]
    fn test_ranking_by_lifetime_won() {
        let ledger = Ledger::new(0);
        ledger.credit(1, 50);
        ledger.credit(2, 150);
        ledger.credit(3, 100);

        let top = ledger.ranked_by_lifetime_won(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].actor, 2);
        assert_eq!(top[1].actor, 3);
    }
}
