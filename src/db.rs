use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;
use crate::store::{KeyValueStore, KvRead, StoreKey, Txn};

const SCHEMA: &str = include_str!("schema.sql");

const SELECT_VALUE: &str = "SELECT value FROM kv WHERE key = ?1";
const UPSERT_VALUE: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
     updated_at = excluded.updated_at";

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    {
        let mut conn = self.lock()?;
        Ok(f(&mut *conn)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))
    }
}

impl KvRead for Db {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(SELECT_VALUE, params![key.as_str()], |row| row.get(0))
                .optional()
        })
    }
}

impl KeyValueStore for Db {
    /// Holds the connection lock and an IMMEDIATE transaction for the whole
    /// closure, so other processes on the same file queue behind it too.
    fn transact(
        &self,
        f: &mut dyn FnMut(&mut dyn Txn) -> Result<(), AppError>,
    ) -> Result<(), AppError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut scope = SqlTxn { tx: &tx };
        f(&mut scope)?;
        tx.commit()?;
        Ok(())
    }
}

struct SqlTxn<'a, 'c> {
    tx: &'a Transaction<'c>,
}

impl KvRead for SqlTxn<'_, '_> {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, AppError> {
        Ok(self
            .tx
            .query_row(SELECT_VALUE, params![key.as_str()], |row| row.get(0))
            .optional()?)
    }
}

impl Txn for SqlTxn<'_, '_> {
    fn put(&mut self, key: &StoreKey, value: String) -> Result<(), AppError> {
        self.tx
            .prepare_cached(UPSERT_VALUE)?
            .execute(params![key.as_str(), value])?;
        Ok(())
    }
}
