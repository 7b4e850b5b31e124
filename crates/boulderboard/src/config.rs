//! Configuration management for boulderboard.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "boulderboard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "scoring.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "BOULDERBOARD_";

/// Environment variable holding the admin password, read verbatim.
const PASSWORD_ENV: &str = "BOULDERBOARD_ADMIN__PASSWORD";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BOULDERBOARD_`, `__` between levels)
/// 2. TOML config file at `~/.config/boulderboard/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scoring rules and the climb table.
    pub scoring: ScoringConfig,
    /// Admin panel configuration.
    pub admin: AdminConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/boulderboard/scoring.db`
    pub database_path: Option<PathBuf>,
}

/// Scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// How many of a competitor's best climbs count toward their total.
    /// Set to 0 to count every climb.
    pub count_best: usize,
    /// Attempts beyond this number no longer add a penalty.
    pub penalty_attempt_cap: u32,
    /// Submitted attempts are clamped to this maximum.
    pub max_attempts: u32,
    /// The climbs that can be scored in this competition.
    pub climbs: Vec<ClimbConfig>,
}

/// Points configuration for a single climb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimbConfig {
    /// Climb number as marked on the wall.
    pub number: u32,
    /// Points for topping the climb on the first attempt.
    pub base: u32,
    /// Points deducted per additional attempt, up to the attempt cap.
    #[serde(default)]
    pub penalty: u32,
}

/// Admin panel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared admin password. When unset every admin action is rejected.
    #[serde(skip_serializing, deserialize_with = "scalar_as_string")]
    pub password: Option<String>,
}

/// Env values are typed by figment, so `123456` would arrive as a number.
/// Re-merge the raw text so digits and leading zeros survive.
fn with_raw_password(figment: Figment, raw: Option<String>) -> Figment {
    match raw {
        Some(password) => figment.merge(Serialized::default("admin.password", password)),
        None => figment,
    }
}

/// Accept a string, number or bool and keep it as text.
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            count_best: 8,
            penalty_attempt_cap: 5,
            max_attempts: 50,
            climbs: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the TOML file at `config_path` (or the
    /// default path) and `BOULDERBOARD_*` environment variables, later sources
    /// winning.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = with_raw_password(figment, Env::var(PASSWORD_ENV)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.scoring.penalty_attempt_cap == 0 {
            return Err(Error::ConfigValidation {
                message: "penalty_attempt_cap must be greater than 0".to_string(),
            });
        }

        if self.scoring.max_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for climb in &self.scoring.climbs {
            if climb.number == 0 {
                return Err(Error::ConfigValidation {
                    message: "climb numbers must be greater than 0".to_string(),
                });
            }
            if !seen.insert(climb.number) {
                return Err(Error::ConfigValidation {
                    message: format!("duplicate climb number {}", climb.number),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid IP address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid server address {}: {e}", self.server.host),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climb(number: u32) -> ClimbConfig {
        ClimbConfig {
            number,
            base: 100,
            penalty: 10,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 5001);
        assert_eq!(config.scoring.count_best, 8);
        assert_eq!(config.scoring.penalty_attempt_cap, 5);
        assert_eq!(config.scoring.max_attempts, 50);
        assert!(config.scoring.climbs.is_empty());
        assert!(config.admin.password.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let mut config = Config::default();
        config.scoring.climbs = vec![climb(1), climb(2)];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_climb() {
        let mut config = Config::default();
        config.scoring.climbs = vec![climb(3), climb(3)];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate climb number 3"));
    }

    #[test]
    fn test_validate_zero_climb_number() {
        let mut config = Config::default();
        config.scoring.climbs = vec![climb(0)];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("greater than 0"));
    }

    #[test]
    fn test_validate_zero_attempt_cap() {
        let mut config = Config::default();
        config.scoring.penalty_attempt_cap = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("penalty_attempt_cap"));
    }

    #[test]
    fn test_validate_zero_max_attempts() {
        let mut config = Config::default();
        config.scoring.max_attempts = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_attempts"));
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("scoring.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        let addr = config.bind_address().unwrap();
        assert_eq!(addr.port(), 5001);

        let mut config = Config::default();
        config.server.host = "not an ip".to_string();
        assert!(config.bind_address().is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("boulderboard"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[server]
port = 8080

[scoring]
count_best = 5

[[scoring.climbs]]
number = 1
base = 100
penalty = 10

[[scoring.climbs]]
number = 2
base = 250

[admin]
password = "s3cret"
"#,
            )?;

            let config = Config::load_from(Some(jail.directory().join("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.scoring.count_best, 5);
            assert_eq!(config.scoring.climbs.len(), 2);
            assert_eq!(config.scoring.climbs[1].penalty, 0);
            assert_eq!(config.admin.password.as_deref(), Some("s3cret"));
            Ok(())
        });
    }

    #[test]
    fn test_example_config_is_valid() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config.example.toml");
        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.scoring.climbs.len(), 3);
        assert_eq!(config.scoring.climbs[2].base, 1500);
    }

    #[test]
    fn test_numeric_password_in_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[admin]\npassword = 123456\n")?;

            let config = Config::load_from(Some(jail.directory().join("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.admin.password.as_deref(), Some("123456"));
            Ok(())
        });
    }

    #[test]
    fn test_raw_env_password_kept_verbatim() {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("[admin]\npassword = 123\n"));

        let config: Config = with_raw_password(figment, Some("0123456".to_string()))
            .extract()
            .unwrap();
        assert_eq!(config.admin.password.as_deref(), Some("0123456"));
    }

    #[test]
    fn test_digit_password_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "123456");
            let config = Config::load_from(Some(jail.directory().join("none.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.admin.password.as_deref(), Some("123456"));
            Ok(())
        });
    }

    #[test]
    fn test_admin_password_not_serialized() {
        let mut config = Config::default();
        config.admin.password = Some("hunter2".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_scoring_config_deserialize() {
        let json = r#"{"count_best": 3, "climbs": [{"number": 4, "base": 50}]}"#;
        let scoring: ScoringConfig = serde_json::from_str(json).unwrap();
        assert_eq!(scoring.count_best, 3);
        assert_eq!(scoring.max_attempts, 50);
        assert_eq!(scoring.climbs[0].number, 4);
    }
}
