use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind the API server to (e.g., "127.0.0.1").
    pub host: String,
    /// TCP port for the API server (e.g., 8080).
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// When the day-order pruner cancels resting GoodForDay orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Local wall-clock hour of the daily cutoff (0-23).
    pub hour: u8,
    /// Minute within the hour (0-59).
    pub minute: u8,
    /// Slack in milliseconds added after the cutoff before the sweep runs,
    /// so a wakeup landing marginally early still observes the cutoff as
    /// passed.
    pub guard: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            hour: 16,
            minute: 0,
            guard: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    COMPACT,
    JSON,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<LogLevel> for LevelFilter {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::TRACE => LevelFilter::TRACE,
            LogLevel::DEBUG => LevelFilter::DEBUG,
            LogLevel::INFO => LevelFilter::INFO,
            LogLevel::WARN => LevelFilter::WARN,
            LogLevel::ERROR => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::INFO,
            format: LogFormat::COMPACT,
        }
    }
}

/// Top-level application configuration wrapper.
///
/// This struct groups all configuration sections used by the application.
/// Loaded with the following precedence (lowest to highest):
/// 1) Built-in defaults
/// 2) Optional config file (if present)
/// 3) Environment variables
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub logger: LogConfig,
    pub expiry: ExpiryConfig,
}

impl AppConfig {
    pub fn load(config_path: &Path) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if config_path.exists() {
            figment = figment.merge(Toml::file(config_path));
        }
        figment = figment.merge(Env::prefixed("MATCHBOOK_").split("_"));

        let cfg = figment.extract()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file_or_env() {
        figment::Jail::expect_with(|_| {
            let cfg = AppConfig::load(Path::new("missing.toml")).expect("defaults should load");
            assert_eq!(cfg.api.port, 8080);
            assert_eq!(
                (cfg.expiry.hour, cfg.expiry.minute),
                (16, 0),
                "default cutoff should be 16:00 local"
            );
            assert_eq!(cfg.expiry.guard, 100);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_and_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    [api]
                    host = "0.0.0.0"
                    port = 9000

                    [expiry]
                    hour = 17
                    minute = 30
                    guard = 250
                "#,
            )?;
            jail.set_env("MATCHBOOK_API_PORT", "9100");
            jail.set_env("MATCHBOOK_EXPIRY_HOUR", "18");

            let cfg = AppConfig::load(Path::new("config.toml")).expect("config should load");
            assert_eq!(cfg.api.host, "0.0.0.0", "file value should win over default");
            assert_eq!(cfg.api.port, 9100, "env value should win over file");
            assert_eq!(cfg.expiry.hour, 18);
            assert_eq!(cfg.expiry.minute, 30);
            assert_eq!(cfg.expiry.guard, 250);
            Ok(())
        });
    }
}
