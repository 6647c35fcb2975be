//! Per-user character levels, paid for out of the ledger.

use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::character::{
    Character, CharacterProgress, CharacterSheet, CharacterView, LevelUpResult,
};
use crate::remote::{Record, RemoteMirror, Table};
use crate::services::events::StoreEvent;
use crate::services::ledger::{self, Ledger};
use crate::services::leveling::{Advance, LevelingPolicy, Progress};
use crate::store::{self, KeyValueStore, KvRead, StoreKey};

pub const CATALOG: [Character; 6] = [
    Character {
        id: "daehonggeun",
        name: "대홍근",
        img: "/img/character_stage1.png",
    },
    Character {
        id: "daeheehaadu",
        name: "대희하두",
        img: "/img/character_stage2.png",
    },
    Character {
        id: "ildungsin",
        name: "일등신",
        img: "/img/character_stage3.png",
    },
    Character {
        id: "pulgogi",
        name: "불고기",
        img: "/img/character_stage4.png",
    },
    Character {
        id: "galmegi",
        name: "갈메기",
        img: "/img/character_stage5.png",
    },
    Character {
        id: "wangtteok",
        name: "왕떡",
        img: "/img/character_stage6.png",
    },
];

pub fn find_character(id: &str) -> Option<&'static Character> {
    CATALOG.iter().find(|c| c.id == id)
}

/// The selected character, or the first catalog entry when the selection is
/// missing or no longer exists.
pub fn resolve_selection(selected: Option<&str>) -> &'static Character {
    selected.and_then(find_character).unwrap_or(&CATALOG[0])
}

fn require_character(id: &str) -> Result<&'static Character, AppError> {
    find_character(id).ok_or_else(|| AppError::UnknownCharacter(id.to_string()))
}

/// Stored progress, `None` if the pair was never advanced.
fn load<R: KvRead + ?Sized>(
    store: &R,
    user_id: &str,
    character_id: &str,
) -> Result<Option<Progress>, AppError> {
    let level_key = StoreKey::level(user_id, character_id);
    if store.get(&level_key)?.is_none() {
        return Ok(None);
    }
    let level = store::get_u64(store, &level_key, 1)?.max(1);
    let exp_rel = store::get_u64(store, &StoreKey::exp_rel(user_id, character_id), 0)?;
    Ok(Some(Progress { level, exp_rel }))
}

/// Every progress row a user has, in catalog order.
pub fn snapshot(store: &dyn KeyValueStore, user_id: &str) -> Result<Vec<CharacterProgress>, AppError> {
    let mut rows = Vec::new();
    for character in CATALOG.iter() {
        if let Some(p) = load(store, user_id, character.id)? {
            rows.push(CharacterProgress {
                user_id: user_id.to_string(),
                character_id: character.id.to_string(),
                level: p.level,
                exp_rel: p.exp_rel,
            });
        }
    }
    Ok(rows)
}

pub struct Progression<'a> {
    ledger: Ledger<'a>,
    policy: LevelingPolicy,
    mirror: &'a RemoteMirror,
}

impl<'a> Progression<'a> {
    pub fn new(ledger: Ledger<'a>, policy: LevelingPolicy, mirror: &'a RemoteMirror) -> Self {
        Self {
            ledger,
            policy,
            mirror,
        }
    }

    pub fn progress(&self, user_id: &str, character_id: &str) -> Result<Progress, AppError> {
        require_character(character_id)?;
        Ok(load(self.ledger.store(), user_id, character_id)?.unwrap_or(Progress::START))
    }

    pub fn sheet(&self, user_id: &str, selected: Option<&str>) -> Result<CharacterSheet, AppError> {
        let mut characters = Vec::with_capacity(CATALOG.len());
        for character in CATALOG.iter() {
            let p = self.progress(user_id, character.id)?;
            characters.push(CharacterView {
                character: *character,
                level: p.level,
                exp_rel: p.exp_rel,
                exp_to_next: self.policy.remaining(p),
                percent: self.policy.percent(p),
            });
        }
        Ok(CharacterSheet {
            selected: resolve_selection(selected).id,
            balance: self.ledger.balance(user_id)?,
            characters,
        })
    }

    /// Pays whatever the next level still costs and advances one level.
    pub fn level_up(&self, user_id: &str, character_id: &str) -> Result<LevelUpResult, AppError> {
        let policy = self.policy;
        self.advance(user_id, character_id, |current| {
            Ok(Advance {
                progress: Progress {
                    level: current.level + 1,
                    exp_rel: 0,
                },
                spent: policy.remaining(current),
            })
        })
    }

    /// Spends up to `amount` on a character. Under the cumulative policy any
    /// surplus past the next level is lost; under flat it stays in the
    /// balance.
    pub fn add_exp(
        &self,
        user_id: &str,
        character_id: &str,
        amount: u64,
    ) -> Result<LevelUpResult, AppError> {
        if amount == 0 {
            return Err(AppError::BadRequest("amount must be positive".into()));
        }
        let policy = self.policy;
        self.advance(user_id, character_id, |current| policy.apply(current, amount))
    }

    /// Reads the pair, applies `step`, pays for it and writes the result in
    /// one transaction.
    fn advance<F>(&self, user_id: &str, character_id: &str, step: F) -> Result<LevelUpResult, AppError>
    where
        F: Fn(Progress) -> Result<Advance, AppError>,
    {
        require_character(character_id)?;
        let (next, balance, existed) = store::atomically(self.ledger.store(), |tx| {
            let stored = load(&*tx, user_id, character_id)?;
            let advance = step(stored.unwrap_or(Progress::START))?;
            let balance = ledger::debit_in(tx, user_id, advance.spent)?;
            tx.put(
                &StoreKey::level(user_id, character_id),
                advance.progress.level.to_string(),
            )?;
            tx.put(
                &StoreKey::exp_rel(user_id, character_id),
                advance.progress.exp_rel.to_string(),
            )?;
            Ok((advance.progress, balance, stored.is_some()))
        })?;

        self.ledger.committed(user_id, balance);
        self.ledger.events().publish(StoreEvent::LevelChanged {
            user_id: user_id.to_string(),
            character_id: character_id.to_string(),
            level: next.level,
        });
        info!(user_id, character_id, level = next.level, balance, "character advanced");

        self.mirror_level(user_id, character_id, next.level, existed);

        Ok(LevelUpResult {
            character_id: character_id.to_string(),
            level: next.level,
            exp_rel: next.exp_rel,
            balance,
        })
    }

    fn mirror_level(&self, user_id: &str, character_id: &str, level: u64, existed: bool) {
        let row_id = format!("{user_id}-{character_id}");
        let record: Record = match json!({
            "id": row_id,
            "userid": user_id,
            "characterid": character_id,
            "level": level,
        }) {
            serde_json::Value::Object(m) => m,
            _ => return,
        };
        if existed {
            self.mirror.update(Table::UserCharacters, row_id, record);
        } else {
            self.mirror.insert(Table::UserCharacters, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::remote::mirror::fake::FakeRecordStore;
    use crate::services::events::EventBus;
    use crate::services::leveling::DEFAULT_STEP;
    use std::sync::Arc;

    const CUMULATIVE: LevelingPolicy = LevelingPolicy::Cumulative { step: DEFAULT_STEP };

    fn setup() -> (Db, EventBus, RemoteMirror) {
        (Db::open_in_memory().unwrap(), EventBus::new(), RemoteMirror::disabled())
    }

    #[test]
    fn test_selection_fallback() {
        assert_eq!(resolve_selection(Some("galmegi")).id, "galmegi");
        assert_eq!(resolve_selection(Some("retired")).id, "daehonggeun");
        assert_eq!(resolve_selection(None).id, "daehonggeun");
    }

    #[test]
    fn test_default_level_is_one() {
        let (db, bus, mirror) = setup();
        let prog = Progression::new(Ledger::new(&db, &bus), LevelingPolicy::Flat, &mirror);
        assert_eq!(prog.progress("kim", "galmegi").unwrap(), Progress::START);
        assert!(snapshot(&db, "kim").unwrap().is_empty());
    }

    #[test]
    fn test_flat_level_up_spends_exact_cost() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);

        ledger.credit("kim", 1).unwrap();
        prog.level_up("kim", "galmegi").unwrap();
        assert_eq!(ledger.balance("kim").unwrap(), 0);

        ledger.credit("kim", 2).unwrap();
        let result = prog.level_up("kim", "galmegi").unwrap();
        assert_eq!(result.level, 3);
        assert_eq!(result.balance, 0);

        let err = prog.level_up("kim", "galmegi").unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientBalance {
                required: 3,
                available: 0
            }
        ));
        assert_eq!(prog.progress("kim", "galmegi").unwrap().level, 3);
    }

    #[test]
    fn test_unknown_character_rejected() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        ledger.credit("kim", 100).unwrap();
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        assert!(matches!(
            prog.level_up("kim", "dragon"),
            Err(AppError::UnknownCharacter(_))
        ));
        assert_eq!(ledger.balance("kim").unwrap(), 100);
    }

    #[test]
    fn test_cumulative_add_exp_discards_overflow() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, CUMULATIVE, &mirror);
        ledger.credit("kim", 500).unwrap();

        let partial = prog.add_exp("kim", "pulgogi", 60).unwrap();
        assert_eq!((partial.level, partial.exp_rel), (1, 60));

        let result = prog.add_exp("kim", "pulgogi", 400).unwrap();
        assert_eq!((result.level, result.exp_rel), (2, 0));
        assert_eq!(result.balance, 40);
    }

    #[test]
    fn test_cumulative_level_up_pays_remainder() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, CUMULATIVE, &mirror);
        ledger.credit("kim", 100).unwrap();
        prog.add_exp("kim", "wangtteok", 30).unwrap();

        let result = prog.level_up("kim", "wangtteok").unwrap();
        assert_eq!(result.level, 2);
        assert_eq!(result.balance, 0);
    }

    #[test]
    fn test_flat_add_exp_needs_full_cost() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        ledger.credit("kim", 10).unwrap();
        prog.level_up("kim", "ildungsin").unwrap();
        prog.level_up("kim", "ildungsin").unwrap();

        assert!(matches!(
            prog.add_exp("kim", "ildungsin", 2),
            Err(AppError::PartialCredit { required: 3, offered: 2 })
        ));
        assert_eq!(ledger.balance("kim").unwrap(), 7);
    }

    #[test]
    fn test_flat_add_exp_keeps_surplus() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        ledger.credit("kim", 50).unwrap();

        let result = prog.add_exp("kim", "galmegi", 50).unwrap();
        assert_eq!((result.level, result.exp_rel), (2, 0));
        assert_eq!(result.balance, 49);
        assert_eq!(ledger.balance("kim").unwrap(), 49);
    }

    #[test]
    fn test_concurrent_level_ups_pay_each_level() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        ledger.credit("kim", 10).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
                    let _ = prog.level_up("kim", "galmegi");
                });
            }
        });
        // 1 + 2 + 3 + 4 = 10: every thread paid its own level's cost.
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        assert_eq!(prog.progress("kim", "galmegi").unwrap().level, 5);
        assert_eq!(ledger.balance("kim").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_first_advance_inserts_then_updates_remote_row() {
        let db = Db::open_in_memory().unwrap();
        let bus = EventBus::new();
        let fake = Arc::new(FakeRecordStore::default());
        let mirror = RemoteMirror::new(fake.clone());
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        ledger.credit("kim", 3).unwrap();

        prog.level_up("kim", "galmegi").unwrap();
        prog.level_up("kim", "galmegi").unwrap();
        for _ in 0..20 {
            if !fake.updates.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let inserts = fake.rows(Table::UserCharacters);
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0]["id"], "kim-galmegi");
        assert_eq!(inserts[0]["level"], 2);

        let updates = fake.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (table, id, partial) = &updates[0];
        assert_eq!(*table, Table::UserCharacters);
        assert_eq!(id, "kim-galmegi");
        assert_eq!(partial["level"], 3);
    }

    #[test]
    fn test_levels_never_decrease() {
        let (db, bus, mirror) = setup();
        let ledger = Ledger::new(&db, &bus);
        let prog = Progression::new(ledger, LevelingPolicy::Flat, &mirror);
        ledger.credit("kim", 20).unwrap();

        let mut last = prog.progress("kim", "galmegi").unwrap().level;
        for _ in 0..8 {
            let _ = prog.level_up("kim", "galmegi");
            let level = prog.progress("kim", "galmegi").unwrap().level;
            assert!(level >= last);
            last = level;
        }
        assert_eq!(last, 6);
    }

    #[test]
    fn test_sheet_lists_catalog() {
        let (db, bus, mirror) = setup();
        let prog = Progression::new(Ledger::new(&db, &bus), CUMULATIVE, &mirror);
        let sheet = prog.sheet("kim", Some("gone")).unwrap();
        assert_eq!(sheet.characters.len(), CATALOG.len());
        assert_eq!(sheet.selected, "daehonggeun");
        assert_eq!(sheet.characters[0].exp_to_next, 100);
    }
}
