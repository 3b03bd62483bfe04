//! Gatehouse configuration
//!
//! Loaded from TOML. Every section and field is optional:
//!
//! ```toml
//! [storage]
//! database_path = "/var/lib/gatehouse/gatehouse.db"
//!
//! [usernames]
//! prefix = "user"
//!
//! [sessions]
//! duration_hours = 168
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::storage::Database;
use crate::usernames::{SequentialUsernames, UsernameGenerator, DEFAULT_USERNAME_PREFIX};

const DATABASE_FILE: &str = "gatehouse.db";

/// Longest accepted session, one year
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub storage: StorageConfig,
    pub usernames: UsernameConfig,
    pub sessions: SessionConfig,
}

/// Where the user database lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
}

/// Default username strategy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsernameConfig {
    pub prefix: String,
}

impl Default for UsernameConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_USERNAME_PREFIX.to_string(),
        }
    }
}

/// Login session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub duration_hours: i64,
}

impl SessionConfig {
    /// Reject durations that are not positive or exceed [`MAX_SESSION_HOURS`]
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SESSION_HOURS).contains(&self.duration_hours) {
            return Err(Error::InvalidConfig(format!(
                "sessions.duration_hours must be between 1 and {}, got {}",
                MAX_SESSION_HOURS, self.duration_hours
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        // One week
        Self {
            duration_hours: 24 * 7,
        }
    }
}

impl GatehouseConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.sessions.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Resolve the database file path
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("dev", "gatehouse", "gatehouse").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    /// Open the configured database, creating its directory if needed
    pub fn open_database(&self) -> Result<Database> {
        let db_path = self.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Database::open(&db_path)
    }

    /// Username generator running the default sequential strategy
    pub fn username_generator<P: ?Sized + 'static>(&self) -> UsernameGenerator<P> {
        UsernameGenerator::new(SequentialUsernames::new(self.usernames.prefix.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GatehouseConfig::from_toml_str("").unwrap();
        assert_eq!(config, GatehouseConfig::default());
        assert_eq!(config.usernames.prefix, "user");
        assert_eq!(config.sessions.duration_hours, 168);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = GatehouseConfig::from_toml_str(
            r#"
            [usernames]
            prefix = "staff"
            "#,
        )
        .unwrap();
        assert_eq!(config.usernames.prefix, "staff");
        assert_eq!(config.sessions.duration_hours, 168);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err =
            GatehouseConfig::from_toml_str("[sessions]\nduration_hours = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_session_duration_out_of_range() {
        for hours in ["0", "-5", "9223372036854775807", "8761"] {
            let content = format!("[sessions]\nduration_hours = {}", hours);
            let err = GatehouseConfig::from_toml_str(&content).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "accepted {}", hours);
            assert_eq!(err.kind(), "config.invalid");
        }

        let config = GatehouseConfig::from_toml_str("[sessions]\nduration_hours = 8760").unwrap();
        assert_eq!(config.sessions.duration_hours, MAX_SESSION_HOURS);
    }

    #[test]
    fn test_load_and_open_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("users.db");
        let config_path = dir.path().join("gatehouse.toml");
        std::fs::write(
            &config_path,
            format!(
                "[storage]\ndatabase_path = {:?}\n\n[usernames]\nprefix = \"guest\"\n",
                db_path.display().to_string()
            ),
        )
        .unwrap();

        let config = GatehouseConfig::load(&config_path).unwrap();
        assert_eq!(config.database_path().unwrap(), db_path);

        let db = config.open_database().unwrap();
        assert!(db_path.exists());

        let generator: UsernameGenerator = config.username_generator();
        assert_eq!(generator.generate(&db, &()).unwrap(), "guest0");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatehouseConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
