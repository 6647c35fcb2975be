use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
    /// Visitor code carried by the client, if it already has one.
    pub uv: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub user: User,
    pub is_new: bool,
    pub balance: u64,
    pub uv: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub user_id: String,
    pub balance: u64,
}

#[derive(Debug, Deserialize)]
pub struct BalanceWaitQuery {
    /// Balance the client last saw; the request parks until it moves.
    pub since: Option<u64>,
}
