use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineEntry {
    pub text: String,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct RoutineSubmission {
    pub date: NaiveDate,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RoutineSubmissionResult {
    pub entries: Vec<RoutineEntry>,
    pub balance: u64,
    pub reward: u64,
}

#[derive(Debug, Serialize)]
pub struct RoutineDay {
    pub date: NaiveDate,
    pub entries: Vec<RoutineEntry>,
    pub remaining: usize,
}
