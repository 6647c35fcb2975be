//! Remote record store: an action-based tabular service (`read`, `insert`,
//! `update`) that the server mirrors into. It is never the source of truth
//! for balances or levels.

pub mod envelope;
pub mod mirror;
pub mod script;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use envelope::{decode, DecodeError};
pub use mirror::RemoteMirror;
pub use script::ScriptRecordStore;

pub type Record = serde_json::Map<String, serde_json::Value>;
pub type RecordSet = Vec<Record>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    UserCharacters,
    Routines,
    Visitors,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::UserCharacters => "user_characters",
            Table::Routines => "routines",
            Table::Visitors => "visitors",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    async fn read(&self, table: Table) -> Result<RecordSet, RemoteError>;

    async fn insert(&self, table: Table, record: Record) -> Result<(), RemoteError>;

    async fn update(&self, table: Table, id: &str, partial: Record) -> Result<(), RemoteError>;
}
