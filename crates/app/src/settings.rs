//! Runtime settings of the `coinquest` daemon.
//!
//! Values come from an optional `settings.toml` next to the binary, then from
//! `COINQUEST__*` environment variables (`COINQUEST__SCHEDULER__RUN_AT=06:30`).
use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

const SETTINGS_FILE: &str = "settings";
const ENV_PREFIX: &str = "COINQUEST";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("coinquest.db".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    /// Log level for the workspace crates (`trace`..`error`).
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub enabled: bool,
    /// Local wall-clock time of the daily run, `HH:MM`.
    pub run_at: String,
    /// IANA name of the family's time zone.
    pub timezone: String,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            enabled: true,
            run_at: "00:05".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl Scheduler {
    pub fn run_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.run_at, "%H:%M").map_err(|_| {
            ConfigError::Message(format!(
                "scheduler.run_at must be HH:MM, got `{}`",
                self.run_at
            ))
        })
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Message(format!("unknown time zone `{}`", self.timezone))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Wallet {
    /// How long any wallet operation waits for a busy wallet.
    pub lock_timeout_ms: u64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub scheduler: Scheduler,
    pub wallet: Wallet,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(SETTINGS_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        // Fail at startup rather than at the first scheduled run.
        settings.scheduler.run_at()?;
        settings.scheduler.timezone()?;
        Ok(settings)
    }
}
