//! Composite-key storage seam shared by the ledger, progression and routine
//! log.
//!
//! Keys follow `<namespace>-<userId>[-<characterId>|-<date>]`. Values are
//! plain strings: integers for balances and levels, JSON for lists and
//! records.

use std::fmt;

use chrono::NaiveDate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Spendable balance per user.
    UserExp,
    /// Character level per (user, character).
    Level,
    /// Relative exp toward the next level per (user, character).
    ExpRel,
    /// Routine entries per (user, date).
    Routines,
    /// Registered user record.
    User,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::UserExp => "userExp",
            Namespace::Level => "level",
            Namespace::ExpRel => "expRel",
            Namespace::Routines => "routines",
            Namespace::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn balance(user_id: &str) -> Self {
        Self(format!("{}-{}", Namespace::UserExp.as_str(), user_id))
    }

    pub fn level(user_id: &str, character_id: &str) -> Self {
        Self(format!("{}-{}-{}", Namespace::Level.as_str(), user_id, character_id))
    }

    pub fn exp_rel(user_id: &str, character_id: &str) -> Self {
        Self(format!("{}-{}-{}", Namespace::ExpRel.as_str(), user_id, character_id))
    }

    pub fn routines(user_id: &str, date: NaiveDate) -> Self {
        Self(format!(
            "{}-{}-{}",
            Namespace::Routines.as_str(),
            user_id,
            date.format("%Y-%m-%d")
        ))
    }

    pub fn user(user_id: &str) -> Self {
        Self(format!("{}-{}", Namespace::User.as_str(), user_id))
    }

    /// Registry of every known user id, in registration order.
    pub fn user_index() -> Self {
        Self("users".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point reads, available both on a store and inside a transaction.
pub trait KvRead {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, AppError>;
}

/// Writes staged inside [`KeyValueStore::transact`].
pub trait Txn: KvRead {
    fn put(&mut self, key: &StoreKey, value: String) -> Result<(), AppError>;
}

/// Key-value persistence used by the domain core.
///
/// `transact` runs its closure with exclusive write access: reads made
/// through the transaction see no interleaved writers, and every `put`
/// lands or none does. Read-modify-write of a key must go through it.
pub trait KeyValueStore: KvRead + Send + Sync {
    fn transact(
        &self,
        f: &mut dyn FnMut(&mut dyn Txn) -> Result<(), AppError>,
    ) -> Result<(), AppError>;

    fn set_many(&self, writes: &[(StoreKey, String)]) -> Result<(), AppError> {
        self.transact(&mut |tx| {
            for (key, value) in writes {
                tx.put(key, value.clone())?;
            }
            Ok(())
        })
    }

    fn set(&self, key: &StoreKey, value: String) -> Result<(), AppError> {
        self.set_many(&[(key.clone(), value)])
    }
}

/// Runs `f` in one transaction and hands back its result.
pub fn atomically<T, F>(store: &dyn KeyValueStore, mut f: F) -> Result<T, AppError>
where
    F: FnMut(&mut dyn Txn) -> Result<T, AppError>,
{
    let mut out = None;
    store.transact(&mut |tx| {
        out = Some(f(tx)?);
        Ok(())
    })?;
    out.ok_or_else(|| AppError::Internal("transaction finished without a result".into()))
}

/// Reads an integer value, treating an absent key as `default`.
pub fn get_u64<R: KvRead + ?Sized>(store: &R, key: &StoreKey, default: u64) -> Result<u64, AppError> {
    match store.get(key)? {
        Some(raw) => raw.trim().parse().map_err(|e| AppError::Corrupt {
            key: key.to_string(),
            reason: format!("{e}"),
        }),
        None => Ok(default),
    }
}

/// Reads a JSON value, treating an absent key as `T::default()`.
pub fn get_json<T, R>(store: &R, key: &StoreKey) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Default,
    R: KvRead + ?Sized,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| AppError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(T::default()),
    }
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.to_string()))
}
