//! Per-user spendable balance ("exp" in early builds, "protein" later).

use tracing::debug;

use crate::error::AppError;
use crate::services::events::{EventBus, StoreEvent};
use crate::store::{self, KeyValueStore, KvRead, StoreKey, Txn};

/// Current balance, 0 for unknown users.
pub fn balance_of<R: KvRead + ?Sized>(store: &R, user_id: &str) -> Result<u64, AppError> {
    store::get_u64(store, &StoreKey::balance(user_id), 0)
}

/// Adds `amount` inside an open transaction and returns the new balance.
pub fn credit_in(tx: &mut dyn Txn, user_id: &str, amount: u64) -> Result<u64, AppError> {
    let balance = balance_of(&*tx, user_id)?.saturating_add(amount);
    tx.put(&StoreKey::balance(user_id), balance.to_string())?;
    Ok(balance)
}

/// Takes `amount` inside an open transaction, refusing to go below zero.
pub fn debit_in(tx: &mut dyn Txn, user_id: &str, amount: u64) -> Result<u64, AppError> {
    let available = balance_of(&*tx, user_id)?;
    let balance = available
        .checked_sub(amount)
        .ok_or(AppError::InsufficientBalance {
            required: amount,
            available,
        })?;
    tx.put(&StoreKey::balance(user_id), balance.to_string())?;
    Ok(balance)
}

#[derive(Clone, Copy)]
pub struct Ledger<'a> {
    store: &'a dyn KeyValueStore,
    events: &'a EventBus,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn KeyValueStore, events: &'a EventBus) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &'a dyn KeyValueStore {
        self.store
    }

    pub fn events(&self) -> &'a EventBus {
        self.events
    }

    pub fn balance(&self, user_id: &str) -> Result<u64, AppError> {
        balance_of(self.store, user_id)
    }

    pub fn credit(&self, user_id: &str, amount: u64) -> Result<u64, AppError> {
        let balance = store::atomically(self.store, |tx| credit_in(tx, user_id, amount))?;
        self.committed(user_id, balance);
        Ok(balance)
    }

    pub fn debit(&self, user_id: &str, amount: u64) -> Result<u64, AppError> {
        let balance = store::atomically(self.store, |tx| debit_in(tx, user_id, amount))?;
        self.committed(user_id, balance);
        Ok(balance)
    }

    /// Announces a committed balance.
    pub fn committed(&self, user_id: &str, balance: u64) {
        debug!(user_id, balance, "balance updated");
        self.events.publish(StoreEvent::BalanceChanged {
            user_id: user_id.to_string(),
            balance,
        });
    }
}
