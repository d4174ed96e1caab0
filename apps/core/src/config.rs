use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::brain::catalog::Language;
use crate::brain::mood::EstimatorKind;
use crate::brain::selector::{
    SelectorSettings, DEFAULT_FOLLOW_UP_PROBABILITY, DEFAULT_RECENT_CAPACITY,
    DEFAULT_REPEAT_WINDOW,
};
use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use crate::session::{
    SessionLimits, DEFAULT_MAX_MESSAGES, DEFAULT_MAX_MOOD_ENTRIES, DEFAULT_TRIM_INTERVAL,
};

/// Runtime configuration for the support engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_repeat_window"))]
pub struct BuddyConfig {
    /// Maximum number of messages kept per session.
    #[validate(range(min = 1, max = 500))]
    pub max_messages: usize,
    /// Maximum number of mood entries kept per session.
    #[validate(range(min = 1, max = 1000))]
    pub max_mood_entries: usize,
    /// How many served replies a session remembers.
    #[validate(range(min = 8, max = 10))]
    pub recent_responses_capacity: usize,
    /// How many of the remembered replies are excluded from selection.
    #[validate(range(min = 1))]
    pub repeat_window: usize,
    /// Chance of appending a follow-up question. Value between 0.25 and 0.30.
    #[validate(range(min = 0.25, max = 0.30))]
    pub follow_up_probability: f64,
    /// Mood entries between periodic trim sweeps.
    #[validate(range(min = 1, max = 1000))]
    pub trim_interval: u64,
    /// Fixed seed for reproducible replies; entropy when absent.
    pub rng_seed: Option<u64>,
    /// Template set to load.
    pub language: Language,
    /// Mood estimation strategy.
    pub estimator: EstimatorKind,
    /// Catalog file overriding the embedded template set.
    pub catalog_path: Option<PathBuf>,
    /// Upper bound on a single supervisor request.
    #[validate(range(min = 1, max = 60))]
    pub turn_timeout_secs: u64,
    /// Entries kept in the shared classification cache.
    #[validate(range(min = 1, max = 10000))]
    pub classification_cache_size: usize,
}

fn validate_repeat_window(config: &BuddyConfig) -> Result<(), ValidationError> {
    if config.repeat_window > config.recent_responses_capacity {
        return Err(ValidationError::new("repeat_window_exceeds_capacity"));
    }
    Ok(())
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_mood_entries: DEFAULT_MAX_MOOD_ENTRIES,
            recent_responses_capacity: DEFAULT_RECENT_CAPACITY,
            repeat_window: DEFAULT_REPEAT_WINDOW,
            follow_up_probability: DEFAULT_FOLLOW_UP_PROBABILITY,
            trim_interval: DEFAULT_TRIM_INTERVAL,
            rng_seed: None,
            language: Language::English,
            estimator: EstimatorKind::Lexicon,
            catalog_path: None,
            turn_timeout_secs: 5,
            classification_cache_size: 256,
        }
    }
}

/// Reads and parses `key`, `None` when unset or blank.
fn env_value<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}: {}", key, e))),
        _ => Ok(None),
    }
}

impl BuddyConfig {
    /// Builds a configuration from `BUDDY_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self, AppError> {
        if let Ok(path) = dotenv::dotenv() {
            info!("Loaded environment from {:?}", path);
        }

        let defaults = Self::default();
        let config = Self {
            max_messages: env_value("BUDDY_MAX_MESSAGES")?.unwrap_or(defaults.max_messages),
            max_mood_entries: env_value("BUDDY_MAX_MOOD_ENTRIES")?
                .unwrap_or(defaults.max_mood_entries),
            recent_responses_capacity: env_value("BUDDY_RECENT_RESPONSES")?
                .unwrap_or(defaults.recent_responses_capacity),
            repeat_window: env_value("BUDDY_REPEAT_WINDOW")?.unwrap_or(defaults.repeat_window),
            follow_up_probability: env_value("BUDDY_FOLLOW_UP_PROBABILITY")?
                .unwrap_or(defaults.follow_up_probability),
            trim_interval: env_value("BUDDY_TRIM_INTERVAL")?.unwrap_or(defaults.trim_interval),
            rng_seed: env_value("BUDDY_RNG_SEED")?,
            language: env_value("BUDDY_LANGUAGE")?.unwrap_or(defaults.language),
            estimator: env_value("BUDDY_ESTIMATOR")?.unwrap_or(defaults.estimator),
            catalog_path: env_value::<PathBuf>("BUDDY_CATALOG_PATH")?
                .or_else(PortablePathManager::catalog_override),
            turn_timeout_secs: env_value("BUDDY_TURN_TIMEOUT_SECS")?
                .unwrap_or(defaults.turn_timeout_secs),
            classification_cache_size: env_value("BUDDY_CLASSIFICATION_CACHE")?
                .unwrap_or(defaults.classification_cache_size),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_messages: self.max_messages,
            max_mood_entries: self.max_mood_entries,
            recent_responses: self.recent_responses_capacity,
            trim_interval: self.trim_interval,
        }
    }

    pub fn selector_settings(&self) -> SelectorSettings {
        SelectorSettings {
            follow_up_probability: self.follow_up_probability,
            repeat_window: self.repeat_window,
        }
    }
}
