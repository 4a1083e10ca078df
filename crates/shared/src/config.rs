//! Application configuration management.

use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    pub storage: StorageSettings,
    /// Upload limits and budgets.
    #[serde(default)]
    pub uploads: UploadSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Object storage backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum StorageSettings {
    /// S3-compatible storage: MinIO, Cloudflare R2, AWS S3.
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// Bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Azure Blob Storage.
    AzureBlob {
        /// Storage account name.
        account: String,
        /// Storage access key.
        access_key: String,
        /// Container name.
        container: String,
    },
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

/// Upload limits and budgets.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Maximum number of attachments per feedback entry.
    #[serde(default = "default_max_attachments")]
    pub max_attachments_per_feedback: usize,
    /// Seconds to wait for the blob store write after the last chunk.
    #[serde(default = "default_commit_wait")]
    pub commit_wait_secs: u64,
}

fn default_max_attachments() -> usize {
    5
}

fn default_commit_wait() -> u64 {
    30
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_attachments_per_feedback: default_max_attachments(),
            commit_wait_secs: default_commit_wait(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CRITIQUE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_settings_defaults() {
        let settings = UploadSettings::default();
        assert_eq!(settings.max_attachments_per_feedback, 5);
        assert_eq!(settings.commit_wait_secs, 30);
    }

    #[test]
    fn test_storage_settings_tagged() {
        let json = serde_json::json!({
            "provider": "local_fs",
            "root": "./storage"
        });
        let settings: StorageSettings = serde_json::from_value(json).unwrap();
        assert!(matches!(settings, StorageSettings::LocalFs { .. }));
    }
}
