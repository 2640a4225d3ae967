//! Settings of the `tally` binary.
//!
//! Read from `config/tally.toml` (or the file named by `TALLY_CONFIG`),
//! then from `TALLY__<SECTION>__<KEY>` environment variables. `DATABASE_URL`
//! replaces the configured database.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/tally";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    /// Path of a SQLite file, created when missing.
    Sqlite(String),
    /// Full connection string.
    Url(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("tally.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
    pub allowed_origins: Vec<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            database: Database::default(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Fx {
    pub primary_url: String,
    pub secondary_url: String,
    pub history_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub allow_stale: bool,
    pub max_stale_secs: u64,
}

impl Default for Fx {
    fn default() -> Self {
        Self {
            primary_url: fx::DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: fx::DEFAULT_SECONDARY_URL.to_string(),
            history_url: fx::DEFAULT_HISTORY_URL.to_string(),
            api_key: None,
            cache_ttl_secs: 3600,
            allow_stale: true,
            max_stale_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Llm {
    /// `openai` or `offline`.
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_history: usize,
    pub max_tool_rounds: usize,
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            provider: "offline".to_string(),
            api_key: None,
            model: agent::DEFAULT_OPENAI_MODEL.to_string(),
            base_url: agent::DEFAULT_OPENAI_URL.to_string(),
            max_history: 20,
            max_tool_rounds: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Calendar {
    pub access_token: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_calendar_url")]
    pub base_url: String,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_calendar_url() -> String {
    agent::GOOGLE_CALENDAR_URL.to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub fx: Fx,
    pub llm: Llm,
    pub calendar: Option<Calendar>,
}

fn environment() -> Environment {
    Environment::with_prefix("TALLY")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.allowed_origins")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("TALLY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.server.database = Database::Url(url);
        }
        Ok(settings)
    }
}
