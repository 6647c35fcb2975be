//! Change notification for balances and levels.
//!
//! Writers publish on the [`EventBus`] after their transaction commits.
//! [`wait_for_balance`] turns that into a long poll for HTTP clients.
//! [`BalancePoll`] is the fallback for in-process readers that cannot
//! subscribe: it re-reads a balance on an interval and emits only when the
//! value moved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::services::ledger;
use crate::store::KeyValueStore;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    BalanceChanged {
        user_id: String,
        balance: u64,
    },
    LevelChanged {
        user_id: String,
        character_id: String,
        level: u64,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        // No subscribers is the common case.
        if self.tx.send(event).is_err() {
            debug!("store event dropped, no subscribers");
        }
    }
}

/// Waits until `user_id`'s balance differs from `since`, or `timeout`
/// passes, and returns the balance at that point.
///
/// Without `since` the current balance comes back at once.
pub async fn wait_for_balance(
    store: &dyn KeyValueStore,
    events: &EventBus,
    user_id: &str,
    since: Option<u64>,
    timeout: Duration,
) -> Result<u64, AppError> {
    // Subscribe before reading so a commit in between is not missed.
    let mut rx = events.subscribe();
    let current = ledger::balance_of(store, user_id)?;
    let since = match since {
        Some(since) if since == current => since,
        _ => return Ok(current),
    };

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Ok(StoreEvent::BalanceChanged { user_id: id, balance }))
                if id == user_id && balance != since =>
            {
                return Ok(balance);
            }
            Ok(Ok(_)) => {}
            Ok(Err(RecvError::Lagged(skipped))) => {
                debug!(user_id, skipped, "balance waiter lagged, re-reading");
                let balance = ledger::balance_of(store, user_id)?;
                if balance != since {
                    return Ok(balance);
                }
            }
            Ok(Err(RecvError::Closed)) | Err(_) => return ledger::balance_of(store, user_id),
        }
    }
}

/// Interval re-read of one user's balance.
///
/// Stopping and starting again is always safe: every tick is a plain read.
pub struct BalancePoll {
    handle: Option<JoinHandle<()>>,
}

impl BalancePoll {
    pub fn start<F>(
        store: Arc<dyn KeyValueStore>,
        user_id: String,
        every: Duration,
        mut on_change: F,
    ) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            let mut last: Option<u64> = None;
            loop {
                ticker.tick().await;
                match ledger::balance_of(store.as_ref(), &user_id) {
                    Ok(balance) if last != Some(balance) => {
                        last = Some(balance);
                        on_change(balance);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(user_id = %user_id, error = %e, "balance poll failed"),
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for BalancePoll {
    fn drop(&mut self) {
        self.stop();
    }
}
