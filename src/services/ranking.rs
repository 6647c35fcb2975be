//! Total-level leaderboard across all users.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::AppError;
use crate::models::character::CharacterProgress;
use crate::models::ranking::{MyRank, RankingBoard, RankingRow};
use crate::models::user::User;
use crate::remote::{Record, RecordSet, RemoteMirror, Table};
use crate::services::{identity, progression};
use crate::store::KeyValueStore;

const UNKNOWN_USERNAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSource {
    Local,
    Remote,
}

impl FromStr for RankingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RankingSource::Local),
            "remote" => Ok(RankingSource::Remote),
            other => Err(format!("unknown ranking source `{other}`")),
        }
    }
}

/// Ranks users by the sum of their character levels.
///
/// Users without progress rows are left out. Equal totals share the rank
/// of the first row holding that total; the next lower total is ranked by
/// its 1-based position, so `30, 30, 10` ranks as `1, 1, 3`. Ties keep the
/// order in which users first appear in `progress`.
pub fn compute_ranking(users: &[User], progress: &[CharacterProgress]) -> Vec<RankingRow> {
    let names: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.id.trim(), u.display_name.as_str()))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for row in progress {
        let uid = row.user_id.trim();
        let total = totals.entry(uid).or_insert_with(|| {
            order.push(uid);
            0
        });
        *total = total.saturating_add(row.level);
    }

    let mut scored: Vec<(&str, u64)> = order.into_iter().map(|uid| (uid, totals[uid])).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut rows: Vec<RankingRow> = Vec::with_capacity(scored.len());
    for (index, (uid, total)) in scored.into_iter().enumerate() {
        let rank = match rows.last() {
            Some(prev) if prev.total_level == total => prev.rank,
            _ => index + 1,
        };
        rows.push(RankingRow {
            user_id: uid.to_string(),
            username: names.get(uid).copied().unwrap_or(UNKNOWN_USERNAME).to_string(),
            total_level: total,
            rank,
        });
    }
    rows
}

pub fn my_rank(rows: &[RankingRow], user_id: &str) -> MyRank {
    let user_id = user_id.trim();
    rows.iter()
        .find(|row| row.user_id == user_id)
        .cloned()
        .map_or(MyRank::NotRanked, MyRank::Ranked)
}

/// Users and progress as recorded locally.
pub fn local_snapshot(
    store: &dyn KeyValueStore,
) -> Result<(Vec<User>, Vec<CharacterProgress>), AppError> {
    let users = identity::all_users(store)?;
    let mut progress = Vec::new();
    for user in &users {
        progress.extend(progression::snapshot(store, &user.id)?);
    }
    Ok((users, progress))
}

fn text_field(record: &Record, name: &str) -> Option<String> {
    match record.get(name)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Leading-digit integer parse; anything unreadable counts as 0.
fn lenient_level(record: &Record) -> u64 {
    match record.get("level") {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Users and progress rebuilt from the remote `users` and
/// `user_characters` tables.
pub fn remote_snapshot(
    users: &RecordSet,
    characters: &RecordSet,
) -> (Vec<User>, Vec<CharacterProgress>) {
    let users = users
        .iter()
        .filter_map(|r| {
            Some(User {
                id: text_field(r, "id")?,
                display_name: text_field(r, "username").unwrap_or_else(|| UNKNOWN_USERNAME.into()),
            })
        })
        .collect();
    let progress = characters
        .iter()
        .filter_map(|r| {
            Some(CharacterProgress {
                user_id: text_field(r, "userid")?,
                character_id: text_field(r, "characterid").unwrap_or_default(),
                level: lenient_level(r),
                exp_rel: 0,
            })
        })
        .collect();
    (users, progress)
}

async fn fetch_remote(mirror: &RemoteMirror) -> Option<(Vec<User>, Vec<CharacterProgress>)> {
    let characters = mirror.read(Table::UserCharacters).await?;
    let users = mirror.read(Table::Users).await?;
    Some(remote_snapshot(&users, &characters))
}

/// Full leaderboard plus the caller's own row.
///
/// A remote source that cannot be read falls back to local data.
pub async fn board(
    store: &dyn KeyValueStore,
    mirror: &RemoteMirror,
    source: RankingSource,
    user_id: Option<&str>,
) -> Result<RankingBoard, AppError> {
    let remote = match source {
        RankingSource::Remote if mirror.is_enabled() => {
            let fetched = fetch_remote(mirror).await;
            if fetched.is_none() {
                warn!("remote ranking unavailable, using local data");
            }
            fetched
        }
        _ => None,
    };
    let (users, progress) = match remote {
        Some(snapshot) => snapshot,
        None => local_snapshot(store)?,
    };

    let rows = compute_ranking(&users, &progress);
    let my_rank = user_id.map_or(MyRank::NotRanked, |uid| my_rank(&rows, uid));
    info!(ranked = rows.len(), "ranking computed");
    Ok(RankingBoard { rows, my_rank })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mirror::fake::FakeRecordStore;
    use serde_json::json;
    use std::sync::Arc;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            display_name: id.to_uppercase(),
        }
    }

    fn row(uid: &str, cid: &str, level: u64) -> CharacterProgress {
        CharacterProgress {
            user_id: uid.into(),
            character_id: cid.into(),
            level,
            exp_rel: 0,
        }
    }

    fn ranks(rows: &[RankingRow]) -> Vec<(&str, usize)> {
        rows.iter().map(|r| (r.user_id.as_str(), r.rank)).collect()
    }

    #[test]
    fn test_ties_share_rank_and_skip() {
        let users = [user("a"), user("b"), user("c")];
        let progress = [
            row("c", "galmegi", 10),
            row("a", "galmegi", 20),
            row("b", "galmegi", 30),
            row("a", "pulgogi", 10),
        ];
        let rows = compute_ranking(&users, &progress);
        assert_eq!(ranks(&rows), vec![("a", 1), ("b", 1), ("c", 3)]);
        assert_eq!(rows[0].total_level, 30);
        assert_eq!(rows[0].username, "A");
    }

    #[test]
    fn test_rank_uses_position_after_long_tie() {
        let progress = [
            row("a", "x", 9),
            row("b", "x", 7),
            row("c", "x", 7),
            row("d", "x", 7),
            row("e", "x", 5),
            row("f", "x", 5),
        ];
        let rows = compute_ranking(&[], &progress);
        let got: Vec<usize> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(got, vec![1, 2, 2, 2, 5, 5]);
        assert_eq!(rows[0].username, UNKNOWN_USERNAME);
    }

    #[test]
    fn test_single_user() {
        let rows = compute_ranking(&[user("d")], &[row("d", "galmegi", 5)]);
        assert_eq!(ranks(&rows), vec![("d", 1)]);
    }

    #[test]
    fn test_users_without_rows_omitted() {
        let rows = compute_ranking(&[user("a"), user("b")], &[row("a", "galmegi", 1)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(my_rank(&rows, "b"), MyRank::NotRanked);
        assert!(matches!(my_rank(&rows, " a "), MyRank::Ranked(ref r) if r.rank == 1));
    }

    #[test]
    fn test_remote_snapshot_parses_loosely() {
        let users: RecordSet = vec![
            json!({"id": " 7 ", "username": "Kim"}),
            json!({"id": 8}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        let chars: RecordSet = vec![
            json!({"userid": "7", "level": "4"}),
            json!({"userid": 7, "level": 2}),
            json!({"userid": "8", "level": "3lv"}),
            json!({"userid": "9", "level": "n/a"}),
            json!({"level": 99}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let (users, progress) = remote_snapshot(&users, &chars);
        let rows = compute_ranking(&users, &progress);
        let got: Vec<(&str, &str, u64, usize)> = rows
            .iter()
            .map(|r| (r.user_id.as_str(), r.username.as_str(), r.total_level, r.rank))
            .collect();
        assert_eq!(
            got,
            vec![
                ("7", "Kim", 6, 1),
                ("8", UNKNOWN_USERNAME, 3, 2),
                ("9", UNKNOWN_USERNAME, 0, 3),
            ]
        );
    }

    #[test]
    fn test_huge_remote_levels_saturate() {
        let chars: RecordSet = vec![
            json!({"userid": "7", "level": "18000000000000000000"}),
            json!({"userid": "7", "level": 18_000_000_000_000_000_000u64}),
            json!({"userid": "8", "level": 1}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let (users, progress) = remote_snapshot(&RecordSet::new(), &chars);
        let rows = compute_ranking(&users, &progress);
        assert_eq!(rows[0].user_id, "7");
        assert_eq!(rows[0].total_level, u64::MAX);
        assert_eq!((rows[1].total_level, rows[1].rank), (1, 2));
    }

    #[tokio::test]
    async fn test_board_falls_back_to_local() {
        let db = crate::db::Db::open_in_memory().unwrap();
        let mirror = RemoteMirror::new(Arc::new(FakeRecordStore::failing()));
        let board = board(&db, &mirror, RankingSource::Remote, Some("kim"))
            .await
            .unwrap();
        assert!(board.rows.is_empty());
        assert_eq!(board.my_rank, MyRank::NotRanked);
    }

    #[tokio::test]
    async fn test_board_reads_remote() {
        let db = crate::db::Db::open_in_memory().unwrap();
        let fake = Arc::new(FakeRecordStore::default());
        fake.seed(Table::Users, json!({"id": "kim", "username": "Kim"}));
        fake.seed(Table::UserCharacters, json!({"userid": "kim", "level": "3"}));
        let mirror = RemoteMirror::new(fake);

        let board = board(&db, &mirror, RankingSource::Remote, Some("kim"))
            .await
            .unwrap();
        assert_eq!(board.rows.len(), 1);
        assert!(matches!(board.my_rank, MyRank::Ranked(ref r) if r.total_level == 3));
    }
}
