mod file_config;

pub use file_config::{AuthConfig, FileConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_ACCESS_TOKEN_LIFETIME_MINUTES: i64 = 60;
pub const DEFAULT_REFRESH_TOKEN_LIFETIME_HOURS: i64 = 24;
pub const DEFAULT_BLACKLIST_PRUNE_INTERVAL_MINUTES: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// None when neither the CLI nor the file provide one.
    pub jwt_secret: Option<String>,
    pub access_token_lifetime_minutes: i64,
    pub refresh_token_lifetime_hours: i64,
    pub blacklist_prune_interval_minutes: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_lifetime_minutes: DEFAULT_ACCESS_TOKEN_LIFETIME_MINUTES,
            refresh_token_lifetime_hours: DEFAULT_REFRESH_TOKEN_LIFETIME_HOURS,
            blacklist_prune_interval_minutes: DEFAULT_BLACKLIST_PRUNE_INTERVAL_MINUTES,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let auth_file = file.auth.unwrap_or_default();
        let defaults = AuthSettings::default();
        let auth = AuthSettings {
            jwt_secret: auth_file
                .jwt_secret
                .or_else(|| cli.jwt_secret.clone())
                .filter(|s| !s.is_empty()),
            access_token_lifetime_minutes: auth_file
                .access_token_lifetime_minutes
                .unwrap_or(defaults.access_token_lifetime_minutes),
            refresh_token_lifetime_hours: auth_file
                .refresh_token_lifetime_hours
                .unwrap_or(defaults.refresh_token_lifetime_hours),
            blacklist_prune_interval_minutes: auth_file
                .blacklist_prune_interval_minutes
                .unwrap_or(defaults.blacklist_prune_interval_minutes),
        };
        if auth.access_token_lifetime_minutes <= 0 || auth.refresh_token_lifetime_hours <= 0 {
            bail!("Token lifetimes must be positive");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            cors_allowed_origins: file.cors_allowed_origins.unwrap_or_default(),
            auth,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn content_db_path(&self) -> PathBuf {
        self.db_dir.join("content.db")
    }

    pub fn search_db_path(&self) -> PathBuf {
        self.db_dir.join("search.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_dir(dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("BODY"),
            Some(RequestsLoggingLevel::Body)
        ));
        assert!(parse_logging_level("verbose").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: Some("/frontend".to_string()),
            jwt_secret: Some("s3cret".to_string()),
            ..cli_with_dir(&temp_dir)
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.access_token_lifetime_minutes, 60);
        assert_eq!(config.auth.refresh_token_lifetime_hours, 24);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            jwt_secret: Some("from-cli".to_string()),
            ..cli_with_dir(&temp_dir)
        };
        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            auth: Some(AuthConfig {
                jwt_secret: Some("from-toml".to_string()),
                refresh_token_lifetime_hours: Some(48),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-toml"));
        assert_eq!(config.auth.refresh_token_lifetime_hours, 48);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_clashing_ports_and_bad_lifetimes() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            metrics_port: 3001,
            ..cli_with_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());

        let file_config = FileConfig {
            auth: Some(AuthConfig {
                access_token_lifetime_minutes: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_with_dir(&temp_dir), Some(file_config)).is_err());
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            jwt_secret: Some(String::new()),
            ..cli_with_dir(&temp_dir)
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_dir(&temp_dir), None).unwrap();

        assert_eq!(config.user_db_path(), temp_dir.path().join("user.db"));
        assert_eq!(config.content_db_path(), temp_dir.path().join("content.db"));
        assert_eq!(config.search_db_path(), temp_dir.path().join("search.db"));
    }
}
