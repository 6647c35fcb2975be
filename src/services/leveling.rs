//! Pure leveling math.
//!
//! Two policies exist and a deployment picks exactly one:
//!
//! - `Cumulative { step }`: reaching level `n` costs `step * n*(n-1)/2` in
//!   total, so advancing from `n` costs `step * n`. Exp can be fed in
//!   pieces; whatever exceeds the next level is dropped.
//! - `Flat`: advancing from `n` costs exactly `n`, paid in one go.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub const DEFAULT_STEP: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelingPolicy {
    Flat,
    Cumulative { step: u64 },
}

/// Level state of one (user, character) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub level: u64,
    pub exp_rel: u64,
}

impl Progress {
    pub const START: Progress = Progress {
        level: 1,
        exp_rel: 0,
    };
}

impl LevelingPolicy {
    fn step(self) -> u64 {
        match self {
            LevelingPolicy::Flat => 1,
            LevelingPolicy::Cumulative { step } => step.max(1),
        }
    }

    /// Total exp spent to stand at `level`, starting from level 1.
    pub fn total_exp_to_reach(self, level: u64) -> u64 {
        let level = u128::from(level.max(1));
        let total = u128::from(self.step()) * (level * (level - 1) / 2);
        u64::try_from(total).unwrap_or(u64::MAX)
    }

    pub fn total_exp_for_next_level(self, level: u64) -> u64 {
        self.total_exp_to_reach(level.max(1).saturating_add(1))
    }

    /// Inverse of [`total_exp_to_reach`](Self::total_exp_to_reach), never below 1.
    pub fn level_for_cumulative_exp(self, total_exp: u64) -> u64 {
        let x = total_exp as f64 / self.step() as f64;
        let mut level = ((1.0 + (1.0 + 8.0 * x).sqrt()) / 2.0).floor() as u64;
        level = level.max(1);
        // The float estimate can be off by one near perfect squares.
        while level > 1 && self.total_exp_to_reach(level) > total_exp {
            level -= 1;
        }
        while self.total_exp_to_reach(level + 1) <= total_exp {
            level += 1;
        }
        level
    }

    /// Cost of advancing from `level` to `level + 1` from a standing start.
    pub fn cost_for(self, level: u64) -> u64 {
        self.step().saturating_mul(level.max(1))
    }

    /// What is still owed before `progress` reaches the next level.
    pub fn remaining(self, progress: Progress) -> u64 {
        self.cost_for(progress.level).saturating_sub(progress.exp_rel)
    }

    pub fn percent(self, progress: Progress) -> u64 {
        let cost = self.cost_for(progress.level);
        (progress.exp_rel.saturating_mul(100) / cost).min(100)
    }

    /// Feeds up to `amount` exp into `progress`.
    ///
    /// Reaching the next level resets the relative counter to zero. Under
    /// `Cumulative` the whole amount is spent and any surplus is lost. Under
    /// `Flat` only the level's cost is spent and anything short of it is
    /// refused.
    pub fn apply(self, progress: Progress, amount: u64) -> Result<Advance, AppError> {
        let needed = self.remaining(progress);
        if amount >= needed {
            let spent = match self {
                LevelingPolicy::Flat => needed,
                LevelingPolicy::Cumulative { .. } => amount,
            };
            return Ok(Advance {
                progress: Progress {
                    level: progress.level + 1,
                    exp_rel: 0,
                },
                spent,
            });
        }
        match self {
            LevelingPolicy::Flat => Err(AppError::PartialCredit {
                required: needed,
                offered: amount,
            }),
            LevelingPolicy::Cumulative { .. } => Ok(Advance {
                progress: Progress {
                    level: progress.level,
                    exp_rel: progress.exp_rel + amount,
                },
                spent: amount,
            }),
        }
    }
}

/// Outcome of [`LevelingPolicy::apply`]: where the pair ends up and what it
/// cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub progress: Progress,
    pub spent: u64,
}

impl FromStr for LevelingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "linear" => Ok(LevelingPolicy::Flat),
            "cumulative" | "quadratic" => Ok(LevelingPolicy::Cumulative { step: DEFAULT_STEP }),
            other => Err(format!("unknown leveling policy `{other}`")),
        }
    }
}

impl fmt::Display for LevelingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelingPolicy::Flat => f.write_str("flat"),
            LevelingPolicy::Cumulative { step } => write!(f, "cumulative(step={step})"),
        }
    }
}
