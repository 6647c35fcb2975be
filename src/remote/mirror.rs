use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Record, RecordSet, RemoteRecordStore, Table};

/// Best-effort copy of local writes into the remote record store.
///
/// Writes are spawned and forgotten; failures are logged and dropped. Local
/// state has already been committed by the time anything reaches here.
#[derive(Clone, Default)]
pub struct RemoteMirror {
    store: Option<Arc<dyn RemoteRecordStore>>,
}

impl RemoteMirror {
    pub fn new(store: Arc<dyn RemoteRecordStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn insert(&self, table: Table, record: Record) -> Option<JoinHandle<()>> {
        let store = self.store.clone()?;
        spawn_detached(async move {
            match store.insert(table, record).await {
                Ok(()) => debug!(%table, "mirrored insert"),
                Err(e) => warn!(%table, error = %e, "remote insert failed, continuing"),
            }
        })
    }

    pub fn update(&self, table: Table, id: String, partial: Record) -> Option<JoinHandle<()>> {
        let store = self.store.clone()?;
        spawn_detached(async move {
            match store.update(table, &id, partial).await {
                Ok(()) => debug!(%table, id = %id, "mirrored update"),
                Err(e) => warn!(%table, id = %id, error = %e, "remote update failed, continuing"),
            }
        })
    }

    /// Reads a remote table; `None` on any failure.
    pub async fn read(&self, table: Table) -> Option<RecordSet> {
        let store = self.store.as_ref()?;
        match store.read(table).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(%table, error = %e, "remote read failed");
                None
            }
        }
    }
}

fn spawn_detached<F>(fut: F) -> Option<JoinHandle<()>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(fut)),
        Err(_) => {
            warn!("no async runtime, remote mirror write skipped");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::remote::{Record, RecordSet, RemoteError, RemoteRecordStore, Table};

    /// In-process record store that keeps every call and can be told to fail.
    #[derive(Default)]
    pub struct FakeRecordStore {
        pub fail: bool,
        pub tables: Mutex<Vec<(Table, Record)>>,
        pub updates: Mutex<Vec<(Table, String, Record)>>,
    }

    impl FakeRecordStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn seed(&self, table: Table, record: serde_json::Value) {
            if let serde_json::Value::Object(record) = record {
                self.tables.lock().unwrap().push((table, record));
            }
        }

        pub fn rows(&self, table: Table) -> RecordSet {
            self.tables
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| *t == table)
                .map(|(_, r)| r.clone())
                .collect()
        }
    }

    #[async_trait]
    impl RemoteRecordStore for FakeRecordStore {
        async fn read(&self, table: Table) -> Result<RecordSet, RemoteError> {
            if self.fail {
                return Err(RemoteError::Unavailable("fake outage".into()));
            }
            Ok(self.rows(table))
        }

        async fn insert(&self, table: Table, record: Record) -> Result<(), RemoteError> {
            if self.fail {
                return Err(RemoteError::Unavailable("fake outage".into()));
            }
            self.tables.lock().unwrap().push((table, record));
            Ok(())
        }

        async fn update(&self, table: Table, id: &str, partial: Record) -> Result<(), RemoteError> {
            if self.fail {
                return Err(RemoteError::Unavailable("fake outage".into()));
            }
            self.updates
                .lock()
                .unwrap()
                .push((table, id.to_string(), partial));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeRecordStore;
    use super::*;

    fn record(v: serde_json::Value) -> Record {
        match v {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_insert_reaches_store() {
        let fake = Arc::new(FakeRecordStore::default());
        let mirror = RemoteMirror::new(fake.clone());
        mirror
            .insert(Table::Routines, record(serde_json::json!({"text": "squats"})))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(fake.rows(Table::Routines).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let mirror = RemoteMirror::new(Arc::new(FakeRecordStore::failing()));
        let handle = mirror
            .update(Table::Users, "kim".into(), Record::new())
            .unwrap();
        assert!(handle.await.is_ok());
        assert!(mirror.read(Table::Users).await.is_none());
    }

    #[test]
    fn test_disabled_and_no_runtime() {
        assert!(RemoteMirror::disabled().insert(Table::Users, Record::new()).is_none());
        let mirror = RemoteMirror::new(Arc::new(FakeRecordStore::default()));
        assert!(mirror.insert(Table::Users, Record::new()).is_none());
    }
}
