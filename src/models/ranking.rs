use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub user_id: String,
    pub username: String,
    pub total_level: u64,
    pub rank: usize,
}

/// Caller's own position. `NotRanked` is the normal answer for a user with
/// no character progress yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MyRank {
    Ranked(RankingRow),
    NotRanked,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RankingBoard {
    pub rows: Vec<RankingRow>,
    pub my_rank: MyRank,
}
