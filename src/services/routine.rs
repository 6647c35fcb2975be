//! Daily routine log. Each accepted entry pays a fixed reward.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::routine::{RoutineDay, RoutineEntry, RoutineSubmissionResult};
use crate::remote::{RemoteMirror, Table};
use crate::services::ledger::{self, Ledger};
use crate::store::{self, StoreKey};
use crate::validation;

pub const DAILY_LIMIT: usize = 3;
pub const DEFAULT_REWARD: u64 = 10;

pub struct RoutineLog<'a> {
    ledger: Ledger<'a>,
    reward: u64,
    mirror: &'a RemoteMirror,
}

impl<'a> RoutineLog<'a> {
    pub fn new(ledger: Ledger<'a>, reward: u64, mirror: &'a RemoteMirror) -> Self {
        Self {
            ledger,
            reward,
            mirror,
        }
    }

    pub fn entries(&self, user_id: &str, date: NaiveDate) -> Result<Vec<RoutineEntry>, AppError> {
        store::get_json(self.ledger.store(), &StoreKey::routines(user_id, date))
    }

    pub fn day(&self, user_id: &str, date: NaiveDate) -> Result<RoutineDay, AppError> {
        let entries = self.entries(user_id, date)?;
        Ok(RoutineDay {
            date,
            remaining: DAILY_LIMIT.saturating_sub(entries.len()),
            entries,
        })
    }

    /// Appends an entry for `date` and credits the reward in one commit.
    ///
    /// `now` is the caller's local time; it decides what "future" means and
    /// stamps the entry.
    pub fn submit(
        &self,
        user_id: &str,
        date: NaiveDate,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<RoutineSubmissionResult, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyText);
        }
        validation::validate_routine_text(text)?;
        if date > now.date_naive() {
            return Err(AppError::FutureDate(date));
        }

        let entry = RoutineEntry {
            text: text.to_string(),
            time: now.format("%H:%M:%S").to_string(),
        };
        let key = StoreKey::routines(user_id, date);
        let (entries, balance) = store::atomically(self.ledger.store(), |tx| {
            let mut entries: Vec<RoutineEntry> = store::get_json(&*tx, &key)?;
            if entries.len() >= DAILY_LIMIT {
                return Err(AppError::DailyLimitReached(DAILY_LIMIT));
            }
            entries.push(entry.clone());
            tx.put(&key, store::to_json(&entries)?)?;
            let balance = ledger::credit_in(tx, user_id, self.reward)?;
            Ok((entries, balance))
        })?;
        self.ledger.committed(user_id, balance);
        info!(user_id, %date, count = entries.len(), balance, "routine recorded");

        if let serde_json::Value::Object(record) = json!({
            "userid": user_id,
            "date": date.format("%Y-%m-%d").to_string(),
            "text": entry.text,
            "time": entry.time,
        }) {
            self.mirror.insert(Table::Routines, record);
        }

        Ok(RoutineSubmissionResult {
            entries,
            balance,
            reward: self.reward,
        })
    }
}
