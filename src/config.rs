//! Configuration module
//!
//! Reads a TOML file (~/.config/lodgelock/config.toml by default, or the
//! path in LODGELOCK_CONFIG). Every field has a default so a missing or
//! partial file still yields a runnable configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub scheduler: SchedulerSection,
    pub allocator: AllocatorSection,
    pub metrics: MetricsSection,
    pub logging: LoggingSection,
    pub service: ServiceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file path; `:memory:` is accepted for throwaway runs
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "./lodgelock.db".to_string(),
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Seconds between reconciliation sweeps
    pub sweep_interval_secs: u64,
    /// Max bookings taken per sweep pass, per category
    pub batch_size: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocatorSection {
    /// How long a reservation waits for the per-room lock before giving up
    pub lock_timeout_ms: u64,
}

impl Default for AllocatorSection {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter, overridable via RUST_LOG
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Upper bound on graceful-shutdown cleanup, in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Default config location: ~/.config/lodgelock/config.toml
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lodgelock")
        .join("config.toml")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.database.path, "./lodgelock.db");
        assert_eq!(cfg.scheduler.sweep_interval_secs, 60);
        assert_eq!(cfg.scheduler.batch_size, 100);
        assert_eq!(cfg.allocator.lock_timeout_ms, 2000);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.metrics.enabled);
        assert_eq!(cfg.service.shutdown_timeout_secs, 10);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [scheduler]
            sweep_interval_secs = 5

            [logging]
            level = "debug"

            [service]
            shutdown_timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scheduler.sweep_interval_secs, 5);
        assert_eq!(cfg.scheduler.batch_size, 100);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.service.shutdown_timeout_secs, 3);
    }

    #[test]
    fn connection_url_wraps_sqlite_path() {
        let db = DatabaseSection {
            path: "/tmp/test.db".to_string(),
        };
        assert_eq!(db.connection_url(), "sqlite:///tmp/test.db?mode=rwc");
    }
}
