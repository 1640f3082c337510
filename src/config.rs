//! Configuration parsing and structures

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::env::substitute_env_vars;
use crate::remote::DEFAULT_LISTING_TTL;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Mount point
    pub mount: MountConfig,

    /// Google Drive connection
    pub gdrive: GDriveConfig,

    /// Directory listing cache
    #[serde(default)]
    pub listing: ListingConfig,

    /// How long the kernel may cache attributes and entries (e.g., "1s")
    #[serde(default = "default_attr_ttl", with = "humantime_serde")]
    pub attr_ttl: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Mount point configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MountConfig {
    /// Path where the filesystem will be mounted
    pub path: PathBuf,

    /// Allow users other than the mounting user to access the mount
    #[serde(default)]
    pub allow_other: bool,

    /// User ID to report for all entries (defaults to process uid)
    pub uid: Option<u32>,

    /// Group ID to report for all entries (defaults to process gid)
    pub gid: Option<u32>,
}

/// Google Drive configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GDriveConfig {
    /// Authentication method
    pub auth: AuthConfig,

    /// Folder ID exposed as the mount root ("root" is My Drive)
    #[serde(default = "default_root_folder_id")]
    pub root_folder_id: String,

    /// Entries requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_root_folder_id() -> String {
    "root".to_string()
}

fn default_page_size() -> u32 {
    100
}

/// Authentication configuration (tagged enum)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Installed-app OAuth flow with token persisted to `token_path`
    Installed {
        /// Path to the OAuth client secret JSON
        credentials_path: PathBuf,
        /// Path where the authorized token is stored
        token_path: PathBuf,
    },
    /// Pre-obtained access token
    Static { token: String },
}

/// Directory listing cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Freshness window for cached listings (e.g., "60m")
    #[serde(default = "default_listing_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

fn default_listing_ttl() -> Duration {
    DEFAULT_LISTING_TTL
}

fn default_attr_ttl() -> Duration {
    Duration::from_secs(1)
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            ttl: default_listing_ttl(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.clone(), e.to_string()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string, expanding `${VAR}` references
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let content = substitute_env_vars(content)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mount.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Mount path cannot be empty".to_string(),
            ));
        }

        if self.gdrive.root_folder_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "GDrive root_folder_id cannot be empty".to_string(),
            ));
        }

        // Drive caps files.list pages at 1000 entries
        if self.gdrive.page_size == 0 || self.gdrive.page_size > 1000 {
            return Err(ConfigError::ValidationError(format!(
                "GDrive page_size must be between 1 and 1000, got {}",
                self.gdrive.page_size
            )));
        }

        if let AuthConfig::Static { token } = &self.gdrive.auth {
            if token.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Static auth token cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
mount:
  path: /mnt/drive
gdrive:
  auth:
    type: installed
    credentials_path: /etc/drivefs/credentials.json
    token_path: /var/lib/drivefs/token.json
"#;

        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.mount.path, PathBuf::from("/mnt/drive"));
        assert!(!config.mount.allow_other);
        assert_eq!(config.gdrive.root_folder_id, "root");
        assert_eq!(config.gdrive.page_size, 100);
        assert_eq!(config.listing.ttl, Duration::from_secs(3600));
        assert_eq!(config.attr_ttl, Duration::from_secs(1));

        match &config.gdrive.auth {
            AuthConfig::Installed {
                credentials_path,
                token_path,
            } => {
                assert_eq!(
                    credentials_path,
                    &PathBuf::from("/etc/drivefs/credentials.json")
                );
                assert_eq!(token_path, &PathBuf::from("/var/lib/drivefs/token.json"));
            }
            _ => panic!("Expected installed auth"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
logging:
  level: debug
mount:
  path: /mnt/shared
  allow_other: true
  uid: 1000
gdrive:
  root_folder_id: 1AbCdEf
  page_size: 500
  auth:
    type: static
    token: ya29.token
listing:
  ttl: 5m
attr_ttl: 10s
"#;

        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.mount.allow_other);
        assert_eq!(config.mount.uid, Some(1000));
        assert_eq!(config.mount.gid, None);
        assert_eq!(config.gdrive.root_folder_id, "1AbCdEf");
        assert_eq!(config.gdrive.page_size, 500);
        assert_eq!(config.listing.ttl, Duration::from_secs(300));
        assert_eq!(config.attr_ttl, Duration::from_secs(10));
        assert!(matches!(config.gdrive.auth, AuthConfig::Static { .. }));
    }

    #[test]
    fn test_env_substitution_in_config() {
        std::env::set_var("DRIVEFS_TEST_TOKEN", "from-env");
        let yaml = r#"
mount:
  path: /mnt/drive
gdrive:
  auth:
    type: static
    token: ${DRIVEFS_TEST_TOKEN}
"#;

        let config = Config::from_str(yaml).unwrap();
        match &config.gdrive.auth {
            AuthConfig::Static { token } => assert_eq!(token, "from-env"),
            _ => panic!("Expected static auth"),
        }
        std::env::remove_var("DRIVEFS_TEST_TOKEN");
    }

    #[test]
    fn test_missing_env_var_is_error() {
        let yaml = r#"
mount:
  path: /mnt/drive
gdrive:
  auth:
    type: static
    token: ${DRIVEFS_MISSING_VAR_98765}
"#;

        let err = Config::from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("DRIVEFS_MISSING_VAR_98765"));
    }

    #[test]
    fn test_missing_auth_is_parse_error() {
        let yaml = r#"
mount:
  path: /mnt/drive
gdrive:
  root_folder_id: root
"#;

        let err = Config::from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validate_page_size() {
        let yaml = r#"
mount:
  path: /mnt/drive
gdrive:
  page_size: 0
  auth:
    type: static
    token: t
"#;

        let config = Config::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "mount:\n  path: /mnt/drive\ngdrive:\n  auth:\n    type: static\n    token: t\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.mount.path, PathBuf::from("/mnt/drive"));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::ReadError(..))
        ));
    }
}
