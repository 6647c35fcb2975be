use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::db::Db;
use crate::remote::{RemoteMirror, ScriptRecordStore};
use crate::services::events::EventBus;
use crate::services::ledger::Ledger;
use crate::services::progression::Progression;
use crate::services::routine::RoutineLog;

pub struct AppState {
    pub db: Arc<Db>,
    pub events: EventBus,
    pub mirror: RemoteMirror,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, db: Db) -> Arc<Self> {
        let mirror = match config.remote_url.as_deref() {
            Some(url) => match ScriptRecordStore::new(url) {
                Ok(store) => RemoteMirror::new(Arc::new(store)),
                Err(e) => {
                    warn!(error = %e, "remote store client failed to build, mirroring disabled");
                    RemoteMirror::disabled()
                }
            },
            None => RemoteMirror::disabled(),
        };
        Self::with_mirror(config, db, mirror)
    }

    pub fn with_mirror(config: Config, db: Db, mirror: RemoteMirror) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(db),
            events: EventBus::new(),
            mirror,
            config,
        })
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.db.as_ref(), &self.events)
    }

    pub fn progression(&self) -> Progression<'_> {
        Progression::new(self.ledger(), self.config.policy, &self.mirror)
    }

    pub fn routines(&self) -> RoutineLog<'_> {
        RoutineLog::new(self.ledger(), self.config.routine_reward, &self.mirror)
    }
}
