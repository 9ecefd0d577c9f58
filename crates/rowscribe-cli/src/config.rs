use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rowscribe_migrate::{ChatServiceConfig, MIGRATION_SCHEMA, MigrationOptions};

pub const DEFAULT_CONFIG_PATH: &str = "rowscribe.toml";
const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub run_dir: PathBuf,
    pub tasks_dir: PathBuf,
    pub migration: MigrationSettings,
    pub translator: TranslatorSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            run_dir: PathBuf::from("runs"),
            tasks_dir: PathBuf::from("data/tasks"),
            migration: MigrationSettings::default(),
            translator: TranslatorSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub schema: String,
    pub conversion_timeout_secs: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            schema: MIGRATION_SCHEMA.to_string(),
            conversion_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorSettings {
    pub api_url: Option<String>,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub user: String,
    pub timeout_secs: u64,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key_env: "ROWSCRIBE_TRANSLATOR_API_KEY".to_string(),
            user: "rowscribe".to_string(),
            timeout_secs: 180,
        }
    }
}

/// Read the settings file; a missing file yields defaults.
pub fn load_config(path: &Path) -> ConfigResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

impl AppConfig {
    /// Configured URL, falling back to `DATABASE_URL`.
    pub fn database_url(&self) -> ConfigResult<String> {
        self.database_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "no database_url configured and {DATABASE_URL_ENV} is not set"
                ))
            })
    }

    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions {
            schema: self.migration.schema.clone(),
            conversion_timeout: Duration::from_secs(self.migration.conversion_timeout_secs),
        }
    }

    /// Translator connection, or `None` when no endpoint is configured.
    pub fn translator(&self) -> ConfigResult<Option<ChatServiceConfig>> {
        let Some(api_url) = self.translator.api_url.clone() else {
            return Ok(None);
        };
        let api_key = std::env::var(&self.translator.api_key_env).map_err(|_| {
            ConfigError::Invalid(format!(
                "translator api key variable {} is not set",
                self.translator.api_key_env
            ))
        })?;
        Ok(Some(ChatServiceConfig {
            api_url,
            api_key,
            user: self.translator.user.clone(),
            timeout: Duration::from_secs(self.translator.timeout_secs),
        }))
    }
}
