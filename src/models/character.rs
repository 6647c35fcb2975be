use serde::{Deserialize, Serialize};

/// Static catalog entry shared by every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: &'static str,
    pub name: &'static str,
    pub img: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProgress {
    pub user_id: String,
    pub character_id: String,
    pub level: u64,
    /// Exp gathered toward the next level. Only the cumulative policy fills it.
    pub exp_rel: u64,
}

#[derive(Debug, Serialize)]
pub struct CharacterView {
    pub character: Character,
    pub level: u64,
    pub exp_rel: u64,
    pub exp_to_next: u64,
    pub percent: u64,
}

#[derive(Debug, Serialize)]
pub struct CharacterSheet {
    pub selected: &'static str,
    pub balance: u64,
    pub characters: Vec<CharacterView>,
}

#[derive(Debug, Deserialize)]
pub struct CharacterQuery {
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpRequest {
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUpResult {
    pub character_id: String,
    pub level: u64,
    pub exp_rel: u64,
    pub balance: u64,
}
