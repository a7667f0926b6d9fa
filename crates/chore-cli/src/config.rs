use chore_core::push::PushConfig;
use chore_core::scheduler::SchedulerConfig;
use chore_core::timezone::validate_timezone;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "chore.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Zone for households created without one (IANA format)
    pub default_timezone: String,
    pub scheduler: SchedulerConfig,
    pub push: PushConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "chore.db".to_string(),
            log_level: "info".to_string(),
            default_timezone: detect_system_timezone(),
            scheduler: SchedulerConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Config {
    /// Layers defaults, the TOML file and `CHORE_*` environment variables.
    /// Nested keys use `__`, e.g. `CHORE_PUSH__API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("CHORE_").split("__"))
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    // Method 1: Check TZ environment variable
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    // Method 2: Try to read from /etc/timezone (Linux)
    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if validate_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    // Method 3: Ask the platform
    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}
