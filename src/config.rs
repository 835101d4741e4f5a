//! Runtime configuration, read from `FLASHCARDS_*` environment variables with defaults.

use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::DEFAULT_EASE_FACTOR;
use crate::models::sm2::MIN_EASE_FACTOR;
use crate::scheduler::SchedulerOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub user_id: String,
    /// Ease given to cards created without one
    pub default_ease: f64,
    /// Days before a newly created card first becomes due
    pub new_card_delay_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db.sqlite3"),
            user_id: "local".to_string(),
            default_ease: DEFAULT_EASE_FACTOR,
            new_card_delay_days: 0,
        }
    }
}

impl Config {
    /// Reads the environment. Values are parsed but not validated, so callers can apply
    /// their own overrides first and then call `validate`.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        Ok(Self {
            db_path: try_load(&lookup, "FLASHCARDS_DB", defaults.db_path.display())?,
            user_id: try_load(&lookup, "FLASHCARDS_USER", &defaults.user_id)?,
            default_ease: try_load(&lookup, "FLASHCARDS_DEFAULT_EASE", defaults.default_ease)?,
            new_card_delay_days: try_load(
                &lookup,
                "FLASHCARDS_NEW_CARD_DELAY_DAYS",
                defaults.new_card_delay_days,
            )?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.default_ease >= MIN_EASE_FACTOR) {
            return Err(Error::Config(format!(
                "default ease must be at least {MIN_EASE_FACTOR}, got {}",
                self.default_ease
            )));
        }
        if self.new_card_delay_days < 0 {
            return Err(Error::Config(format!(
                "new card delay cannot be negative, got {}",
                self.new_card_delay_days
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Config("user id cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            default_ease: self.default_ease,
            new_card_delay_days: self.new_card_delay_days,
        }
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: impl Display,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value '{raw}': {e}");
        Error::Config(format!("invalid {key} value '{raw}': {e}"))
    })
}
