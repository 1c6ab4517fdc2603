use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{error::ConfigError, notify::SmtpSettings, notify::validate_recipient};

pub const DEFAULT_CITIES_FILE: &str = "data/turkey_cities.json";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_WEATHER_LANG: &str = "en";

/// Optional on-disk layer, below `.env` and the process environment.
///
/// Example TOML:
/// ```toml
/// openweather_api_key = "..."
/// smtp_host = "smtp.example.com"
/// smtp_port = 587
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub openweather_api_key: Option<String>,
    pub mongo_uri: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_email: Option<String>,
    pub cities_file_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub weather_lang: Option<String>,
    pub report_utc_offset_hours: Option<i32>,
}

impl FileConfig {
    /// Load the config file, or an empty layer if it doesn't exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ConfigFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ConfigFile {
            path,
            reason: e.to_string(),
        })
    }

    /// Path to the config file, if the platform has a config directory.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "weather-report", "weather-report")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Fully resolved process configuration.
#[derive(Clone)]
pub struct Settings {
    pub openweather_api_key: String,
    pub mongo_uri: String,
    pub smtp: SmtpSettings,
    pub from_email: String,
    pub cities_file_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub weather_lang: String,
    pub report_utc_offset_hours: i32,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openweather_api_key", &"<redacted>")
            .field("mongo_uri", &"<redacted>")
            .field("smtp", &self.smtp)
            .field("from_email", &self.from_email)
            .field("cities_file_path", &self.cities_file_path)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .field("weather_lang", &self.weather_lang)
            .field("report_utc_offset_hours", &self.report_utc_offset_hours)
            .finish()
    }
}

impl Settings {
    /// Load `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let file = FileConfig::load()?;
        Self::from_lookup(&file, |name| std::env::var(name).ok())
    }

    /// Resolve settings from a file layer and an environment lookup.
    /// Environment values win over file values.
    pub fn from_lookup<F>(file: &FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str, from_file: Option<String>| -> Option<String> {
            lookup(name)
                .map(|v| sanitize_env(&v))
                .filter(|v| !v.is_empty())
                .or_else(|| from_file.map(|v| sanitize_env(&v)).filter(|v| !v.is_empty()))
        };
        let require = |name: &'static str, from_file: Option<String>| {
            get(name, from_file).ok_or(ConfigError::MissingVar(name))
        };

        let openweather_api_key =
            require("OPENWEATHER_API_KEY", file.openweather_api_key.clone())?;
        let mongo_uri = require("MONGO_URI", file.mongo_uri.clone())?;
        let smtp_host = require("SMTP_HOST", file.smtp_host.clone())?;
        let smtp_user = require("SMTP_USER", file.smtp_user.clone())?;
        let smtp_password = require("SMTP_PASSWORD", file.smtp_password.clone())?;
        let from_email = require("FROM_EMAIL", file.from_email.clone())?;

        validate_recipient(&from_email).map_err(|e| ConfigError::InvalidVar {
            name: "FROM_EMAIL",
            reason: e.to_string(),
        })?;

        let smtp_port = match get("SMTP_PORT", file.smtp_port.map(|p| p.to_string())) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_SMTP_PORT,
        };

        let report_utc_offset_hours = match get(
            "REPORT_UTC_OFFSET_HOURS",
            file.report_utc_offset_hours.map(|h| h.to_string()),
        ) {
            Some(raw) => parse_offset(&raw)?,
            None => crate::report::DEFAULT_UTC_OFFSET_HOURS,
        };

        let path_or = |name: &'static str, from_file: &Option<PathBuf>, default: &str| {
            get(name, from_file.as_ref().map(|p| p.display().to_string()))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Ok(Self {
            openweather_api_key,
            mongo_uri,
            smtp: SmtpSettings {
                host: smtp_host,
                port: smtp_port,
                user: smtp_user,
                password: smtp_password,
            },
            from_email,
            cities_file_path: path_or("CITIES_FILE_PATH", &file.cities_file_path, DEFAULT_CITIES_FILE),
            log_dir: path_or("LOG_DIR", &file.log_dir, DEFAULT_LOG_DIR),
            log_level: get("LOG_LEVEL", file.log_level.clone())
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            weather_lang: get("WEATHER_LANG", file.weather_lang.clone())
                .unwrap_or_else(|| DEFAULT_WEATHER_LANG.to_string()),
            report_utc_offset_hours,
        })
    }
}

/// Strip line breaks and surrounding whitespace.
fn sanitize_env(value: &str) -> String {
    value.replace(['\n', '\r'], "").trim().to_string()
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidVar {
            name: "SMTP_PORT",
            reason: format!("'{raw}' is not a positive integer below 65536"),
        }),
    }
}

fn parse_offset(raw: &str) -> Result<i32, ConfigError> {
    match raw.parse::<i32>() {
        Ok(hours) if (-12..=14).contains(&hours) => Ok(hours),
        _ => Err(ConfigError::InvalidVar {
            name: "REPORT_UTC_OFFSET_HOURS",
            reason: format!("'{raw}' is not an integer between -12 and 14"),
        }),
    }
}
