use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::LifedashError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LifedashConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// `[chat]` section. The API key is normally taken from `OPENAI_API_KEY`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 600,
            max_retries: 2,
            retry_delay_ms: 500,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    /// Rows shown under "Recent Entries" on the log page.
    pub recent_entries_limit: usize,
    /// Window used to summarise activity for the future-you prompt.
    pub recent_window_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_entries_limit: 20,
            recent_window_days: 30,
        }
    }
}

impl LifedashConfig {
    /// Load from a TOML file (optional) layered under `LIFEDASH__*` env vars,
    /// e.g. `LIFEDASH__HTTP__PORT=9000`.
    pub fn load(path: &str) -> Result<Self, LifedashError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LIFEDASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LifedashError> {
        if self.dashboard.recent_window_days < 0 {
            return Err(LifedashError::validation(format!(
                "[dashboard] recent_window_days must not be negative (got {})",
                self.dashboard.recent_window_days
            )));
        }
        Ok(())
    }
}
