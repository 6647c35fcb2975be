use std::{env, fmt::Display, str::FromStr};

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::services::leveling::{LevelingPolicy, DEFAULT_STEP};
use crate::services::ranking::RankingSource;
use crate::services::routine::DEFAULT_REWARD;

#[derive(Debug, Error)]
#[error("invalid {key}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    pub policy: LevelingPolicy,
    pub routine_reward: u64,
    pub utc_offset: FixedOffset,
    pub remote_url: Option<String>,
    pub ranking_source: RankingSource,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let policy = match try_load::<LevelingPolicy>("LEVELING_POLICY", "flat")? {
            LevelingPolicy::Cumulative { .. } => {
                let step: u64 = try_load("LEVELING_STEP", &DEFAULT_STEP.to_string())?;
                if step == 0 {
                    return Err(ConfigError {
                        key: "LEVELING_STEP",
                        reason: "must be positive".into(),
                    });
                }
                LevelingPolicy::Cumulative { step }
            }
            flat => flat,
        };

        let offset_hours: i32 = try_load("UTC_OFFSET_HOURS", "9")?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or(ConfigError {
            key: "UTC_OFFSET_HOURS",
            reason: format!("{offset_hours} is out of range"),
        })?;

        let config = Self {
            db_path: try_load("DATABASE_PATH", "fitbuddy.db")?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "3001")?,
            policy,
            routine_reward: try_load("ROUTINE_REWARD", &DEFAULT_REWARD.to_string())?,
            utc_offset,
            remote_url: var("REMOTE_STORE_URL").filter(|u| !u.trim().is_empty()),
            ranking_source: try_load("RANKING_SOURCE", "local")?,
        };
        info!(policy = %config.policy, remote = config.remote_url.is_some(), "configuration loaded");
        Ok(config)
    }

    /// Current time in the configured offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError {
            key,
            reason: e.to_string(),
        }
    })
}
