//! Configuration management
//!
//! Command arguments carry what changes per run (buckets, queue names,
//! database coordinates). Everything else comes from the environment, with a
//! `.env` file loaded at startup.

use crate::error::{LoaderError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use sqlx::postgres::PgSslMode;
use std::env;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default AWS region; G-NAF is published for Australia.
pub const DEFAULT_AWS_REGION: &str = "ap-southeast-2";

/// Default long-poll time per queue fetch, in seconds.
pub const DEFAULT_SQS_WAIT_TIME_SECS: i32 = 0;

/// Longest long-poll SQS accepts, in seconds.
pub const MAX_SQS_WAIT_TIME_SECS: i32 = 20;

/// Default database connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Credential provider name reported to the AWS SDK for static keys.
const STATIC_CREDENTIALS_PROVIDER: &str = "gnaf-loader";

/// AWS client configuration shared by the S3 and SQS clients
#[derive(Clone)]
pub struct AwsConfig {
    pub region: String,
    pub s3_endpoint: Option<String>,
    pub sqs_endpoint: Option<String>,
    pub s3_path_style: bool,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("sqs_endpoint", &self.sqs_endpoint)
            .field("s3_path_style", &self.s3_path_style)
            .field("static_credentials", &self.access_key.is_some())
            .finish()
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            s3_endpoint: None,
            sqs_endpoint: None,
            s3_path_style: false,
            access_key: None,
            secret_key: None,
        }
    }
}

impl AwsConfig {
    /// Load from `AWS_REGION`, `S3_ENDPOINT`, `SQS_ENDPOINT`, `S3_PATH_STYLE`,
    /// `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
    pub fn from_env() -> Self {
        Self {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            sqs_endpoint: env::var("SQS_ENDPOINT").ok(),
            s3_path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }

    /// Resolve the SDK configuration.
    ///
    /// Static keys are used only when both halves are set; otherwise the
    /// SDK's default credential chain (profiles, instance roles) applies.
    pub async fn load(&self) -> SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                STATIC_CREDENTIALS_PROVIDER,
            ));
        }

        loader.load().await
    }
}

/// How the import loop polls the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Long-poll seconds per fetch; 0 returns immediately when empty
    pub wait_time_seconds: i32,
    /// Override of the queue's visibility timeout for fetched messages
    pub visibility_timeout: Option<i32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            wait_time_seconds: DEFAULT_SQS_WAIT_TIME_SECS,
            visibility_timeout: None,
        }
    }
}

impl QueueConfig {
    /// Load from `SQS_WAIT_TIME_SECONDS` and `SQS_VISIBILITY_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        let config = Self {
            wait_time_seconds: env::var("SQS_WAIT_TIME_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SQS_WAIT_TIME_SECS),
            visibility_timeout: env::var("SQS_VISIBILITY_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_SQS_WAIT_TIME_SECS).contains(&self.wait_time_seconds) {
            return Err(LoaderError::config(format!(
                "SQS_WAIT_TIME_SECONDS must be between 0 and {}, got {}",
                MAX_SQS_WAIT_TIME_SECS, self.wait_time_seconds
            )));
        }

        if let Some(timeout) = self.visibility_timeout {
            if timeout < 0 {
                return Err(LoaderError::config(format!(
                    "SQS_VISIBILITY_TIMEOUT must not be negative, got {}",
                    timeout
                )));
            }
        }

        Ok(())
    }
}

/// Coordinates of the target PostgreSQL database
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub connect_timeout_secs: u64,
    pub ssl_mode: PgSslMode,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl DbConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            ssl_mode: PgSslMode::Prefer,
        }
    }

    /// Apply `DB_CONNECT_TIMEOUT` and `DB_SSL_MODE` from the environment
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(secs) = env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.connect_timeout_secs = secs;
        }

        if let Ok(mode) = env::var("DB_SSL_MODE") {
            self.ssl_mode = mode
                .parse()
                .map_err(|_| LoaderError::config(format!("Invalid DB_SSL_MODE: {}", mode)))?;
        }

        Ok(self)
    }
}

/// How downloaded files are bulk-loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Whether the first line of each file is a header row
    pub header: bool,
    /// Keep downloaded files in the temp directory after a successful load
    pub keep_downloads: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            header: true,
            keep_downloads: false,
        }
    }
}

impl LoadOptions {
    /// Load from `GNAF_PSV_HEADER` and `GNAF_KEEP_DOWNLOADS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            header: env::var("GNAF_PSV_HEADER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.header),
            keep_downloads: env::var("GNAF_KEEP_DOWNLOADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.keep_downloads),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_config_validation() {
        assert!(QueueConfig::default().validate().is_ok());

        let too_long = QueueConfig {
            wait_time_seconds: 21,
            visibility_timeout: None,
        };
        assert!(matches!(too_long.validate(), Err(LoaderError::Config(_))));

        let negative = QueueConfig {
            wait_time_seconds: 0,
            visibility_timeout: Some(-1),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_db_config_debug_redacts_password() {
        let config = DbConfig::new("localhost", 5432, "gnaf", "loader", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("localhost"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::new("localhost", 5433, "gnaf", "loader", "secret");
        assert_eq!(config.port, 5433);
        assert_eq!(config.connect_timeout_secs, DEFAULT_DB_CONNECT_TIMEOUT_SECS);
        assert!(matches!(config.ssl_mode, PgSslMode::Prefer));
    }

    #[test]
    fn test_aws_config_debug_hides_keys() {
        let config = AwsConfig {
            access_key: Some("AKIAEXAMPLE".to_string()),
            secret_key: Some("shh".to_string()),
            ..AwsConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("shh"));
        assert!(debug.contains(DEFAULT_AWS_REGION));
    }

    #[test]
    fn test_load_options_defaults() {
        let options = LoadOptions::default();
        assert!(options.header);
        assert!(!options.keep_downloads);
    }
}
