use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

pub const CONFIG_PATH_ENV: &str = "NIGHTSONG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "nightsong.toml";
// Keeps giveaways only in memory, until the bot is restarted
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Bot token, usually provided only through the DISCORD_TOKEN variable
    pub discord_token: Option<String>,
    // Location of the SQLite file with giveaway records
    pub database_path: String,
    // Pause between two sweeps over the active giveaways
    pub sweep_interval_secs: u64,
    // How long a termination lease stays valid before it can be taken over
    pub lease_ttl_secs: u64,
    // Reaction used for entering when the creator didn't pick one
    pub default_entry_emoji: String,
    // Fixed seed for the winner draws, so a run of the bot can be replayed
    pub selection_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            discord_token: None,
            database_path: "giveaways.db".to_string(),
            sweep_interval_secs: 30,
            lease_ttl_secs: 120,
            default_entry_emoji: "🎉".to_string(),
            selection_seed: None,
        }
    }
}

impl Settings {
    // Reads the config file (if any) and applies environment overrides on top.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut settings = Self::load_from(&path)?;
        settings.apply_env();
        Ok(settings)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|err| Error::Settings(format!("Can't read {}: {}", path.display(), err)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = env::var("DISCORD_TOKEN") {
            self.discord_token = Some(token);
        }
        if let Ok(path) = env::var("NIGHTSONG_DATABASE") {
            self.database_path = path;
        }
        if let Some(secs) = env::var("NIGHTSONG_SWEEP_INTERVAL")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            self.sweep_interval_secs = secs;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(Error::Settings("sweep_interval_secs must be positive".to_string()));
        }
        if self.lease_ttl_secs == 0 {
            return Err(Error::Settings("lease_ttl_secs must be positive".to_string()));
        }
        if self.default_entry_emoji.trim().is_empty() {
            return Err(Error::Settings("default_entry_emoji can't be empty".to_string()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::error::Error;
    use crate::settings::Settings;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.sweep_interval(), Duration::from_secs(30));
        assert_eq!(settings.lease_ttl(), Duration::from_secs(120));
        assert_eq!(settings.default_entry_emoji, "🎉");
        assert_eq!(settings.discord_token, None);
        assert_eq!(settings.selection_seed, None);
    }

    #[test]
    fn test_selection_seed_from_toml() {
        let settings = Settings::from_toml("selection_seed = 42").unwrap();

        assert_eq!(settings.selection_seed, Some(42));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("database_path = \"/tmp/test.db\"").unwrap();

        assert_eq!(settings.database_path, "/tmp/test.db");
        assert_eq!(settings.sweep_interval_secs, 30);
    }

    #[test]
    fn test_get_error_for_zero_interval() {
        let result = Settings::from_toml("sweep_interval_secs = 0");

        assert_eq!(
            result.unwrap_err(),
            Error::Settings("sweep_interval_secs must be positive".to_string())
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("/definitely/not/here.toml").unwrap();

        assert_eq!(settings.database_path, "giveaways.db");
    }
}
