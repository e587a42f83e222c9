//! Configuration management module.

use chrono::{FixedOffset, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classify::{AttendanceRules, default_offset};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub holiday: HolidayConfig,
    pub attendance: AttendanceConfig,
    pub logging: LoggingConfig,
}

/// PostgreSQL database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// External holiday calendar API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    pub url: String,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_holiday_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of days requested per year (default: 366).
    #[serde(default = "default_max_days")]
    pub max_days: u32,
}

fn default_holiday_timeout_secs() -> u64 {
    10
}

fn default_max_days() -> u32 {
    366
}

/// Attendance thresholds and local time zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    /// Fixed local offset from UTC in hours (default: 8).
    pub utc_offset_hours: i32,
    /// On-work punches after this local time are late.
    pub on_work_deadline: NaiveTime,
    /// Off-work punches before this local time are early leaves.
    pub off_work_earliest: NaiveTime,
    /// Days with both punches and fewer hours than this are short.
    pub min_work_hours: f64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Write daily rolling log files here when set.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl AppConfig {
    /// Get config file path.
    ///
    /// Prefers `config.toml` next to the executable, then the platform config directory.
    pub fn default_path() -> PathBuf {
        let exe_dir_config = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml");

        if exe_dir_config.exists() {
            return exe_dir_config;
        }

        directories::ProjectDirs::from("", "", "attendance-report")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or(exe_dir_config)
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => ConfigLoadResult::Loaded(config),
                Err(e) => ConfigLoadResult::Invalid(e),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Parse and validate config from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str::<AppConfig>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::Validation("Database host cannot be empty".to_string()));
        }
        if self.database.port == 0 {
            return Err(ConfigError::Validation(
                "Database port must be greater than 0".to_string(),
            ));
        }
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::Validation("Database name cannot be empty".to_string()));
        }
        if self.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Listen address '{}' is not a valid socket address",
                self.server.listen_addr
            )));
        }
        if !self.holiday.url.starts_with("http") {
            return Err(ConfigError::Validation(
                "Holiday URL must start with http:// or https://".to_string(),
            ));
        }
        if self.holiday.timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "Holiday timeout must be at least 1 second".to_string(),
            ));
        }
        if !(365..=366).contains(&self.holiday.max_days) {
            return Err(ConfigError::Validation(
                "Holiday max days must be 365 or 366".to_string(),
            ));
        }
        if !(-12..=14).contains(&self.attendance.utc_offset_hours) {
            return Err(ConfigError::Validation(
                "UTC offset must be between -12 and 14 hours".to_string(),
            ));
        }
        if !(self.attendance.min_work_hours > 0.0 && self.attendance.min_work_hours <= 24.0) {
            return Err(ConfigError::Validation(
                "Minimum work hours must be within (0, 24]".to_string(),
            ));
        }
        if self.attendance.off_work_earliest <= self.attendance.on_work_deadline {
            return Err(ConfigError::Validation(
                "Off-work time must be later than the on-work deadline".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// Build connection string for SeaORM.
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.name
        )
    }
}

impl AttendanceConfig {
    /// Local time zone used for thresholds and date formatting.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(default_offset)
    }

    /// Build classifier rules from the configured thresholds.
    pub fn rules(&self) -> AttendanceRules {
        AttendanceRules {
            offset: self.offset(),
            on_work_deadline: self.on_work_deadline,
            off_work_earliest: self.off_work_earliest,
            min_work_duration: TimeDelta::milliseconds((self.min_work_hours * 3_600_000.0).round() as i64),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "attendance".to_string(),
            username: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            url: "https://api.apihubs.cn/holiday/get".to_string(),
            timeout_secs: default_holiday_timeout_secs(),
            max_days: default_max_days(),
        }
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        let rules = AttendanceRules::default();
        Self {
            utc_offset_hours: 8,
            on_work_deadline: rules.on_work_deadline,
            off_work_earliest: rules.off_work_earliest,
            min_work_hours: 9.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "attendance-report.log".to_string(),
        }
    }
}
