//! Configuration loading for the mail store and sending service
//!
//! Store settings are loaded from (in order of priority):
//! 1. An explicit JSON file
//! 2. `kvmail.json` in the kvmail config directory
//! 3. Runtime environment variables (`KVMAIL_DATA_DIR`)
//! 4. Defaults under the platform data directory
//!
//! Sending credentials are loaded from (in order of priority):
//! 1. Compile-time embedded key (for production builds)
//! 2. `sending.json` in the kvmail config directory
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store settings filename in the kvmail config directory
const STORE_FILE: &str = "kvmail.json";

/// Sending credentials filename in the kvmail config directory
const SENDING_FILE: &str = "sending.json";

/// Environment variable overriding the data directory
const DATA_DIR_ENV: &str = "KVMAIL_DATA_DIR";

/// Environment variable holding the sending API key
const API_KEY_ENV: &str = "RESEND_API_KEY";

/// Default listing page size
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Default zstd level for attachment blobs
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Where and how the store keeps its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory for all store data
    pub data_dir: PathBuf,
    /// SQLite file for metadata records and the label index.
    /// Relative paths resolve against `data_dir`.
    pub metadata_db: PathBuf,
    /// Directory for attachment blobs. Relative paths resolve against `data_dir`.
    pub blob_dir: PathBuf,
    /// Listing page size when a call does not give one
    pub page_limit: usize,
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_data_dir(
            config::data_dir().unwrap_or_else(|| PathBuf::from(".kvmail")),
        )
    }
}

impl StoreConfig {
    /// Default settings rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            metadata_db: PathBuf::from("mail.db"),
            blob_dir: PathBuf::from("blobs"),
            page_limit: DEFAULT_PAGE_LIMIT,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Load settings using the priority order documented on this module
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if config::config_exists(STORE_FILE) {
            let store: StoreConfig = config::load_json(STORE_FILE)?;
            return Ok(store);
        }

        Ok(Self::from_env())
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse settings from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse store config JSON")
    }

    /// Defaults, with the data directory taken from the environment if set
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::with_data_dir(dir),
            _ => Self::default(),
        }
    }

    /// Absolute path of the metadata database
    pub fn metadata_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_db)
    }

    /// Absolute path of the blob directory
    pub fn blob_dir_path(&self) -> PathBuf {
        self.data_dir.join(&self.blob_dir)
    }
}

/// API credentials for the HTTP sending service
#[derive(Debug, Clone)]
pub struct SendingCredentials {
    pub api_key: String,
}

/// `sending.json` format
#[derive(Deserialize)]
struct SendingFile {
    api_key: String,
}

impl SendingCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded key (for production builds)
    /// 2. JSON file (~/.config/kvmail/sending.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(SENDING_FILE) {
            let file: SendingFile = config::load_json(SENDING_FILE)?;
            return Self::from_sending_file(file);
        }

        Self::from_env()
    }

    /// Load the key embedded at compile time.
    /// Build with: RESEND_API_KEY=re_xxx cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let api_key = option_env!("RESEND_API_KEY")?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
        })
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SendingFile =
            serde_json::from_str(json).context("Failed to parse sending credentials JSON")?;
        Self::from_sending_file(file)
    }

    fn from_sending_file(file: SendingFile) -> Result<Self> {
        anyhow::ensure!(!file.api_key.is_empty(), "Sending credentials have an empty api_key");
        Ok(Self {
            api_key: file.api_key,
        })
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", API_KEY_ENV))?;
        Ok(Self { api_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_store_json_takes_defaults() {
        let store = StoreConfig::from_json(r#"{ "data_dir": "/var/lib/kvmail", "page_limit": 20 }"#)
            .unwrap();
        assert_eq!(store.page_limit, 20);
        assert_eq!(store.compression_level, DEFAULT_COMPRESSION_LEVEL);
        assert_eq!(store.metadata_db_path(), PathBuf::from("/var/lib/kvmail/mail.db"));
        assert_eq!(store.blob_dir_path(), PathBuf::from("/var/lib/kvmail/blobs"));
    }

    #[test]
    fn test_absolute_paths_override_data_dir() {
        let store = StoreConfig::from_json(
            r#"{ "data_dir": "/data", "metadata_db": "/fast/meta.db" }"#,
        )
        .unwrap();
        assert_eq!(store.metadata_db_path(), PathBuf::from("/fast/meta.db"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{ "data_dir": "/srv/mail", "compression_level": 9 }"#).unwrap();

        let store = StoreConfig::load(Some(&path)).unwrap();
        assert_eq!(store.data_dir, PathBuf::from("/srv/mail"));
        assert_eq!(store.compression_level, 9);
        assert_eq!(store.page_limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_parse_sending_credentials() {
        let creds = SendingCredentials::from_json(r#"{ "api_key": "re_test" }"#).unwrap();
        assert_eq!(creds.api_key, "re_test");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(SendingCredentials::from_json(r#"{ "api_key": "" }"#).is_err());
        assert!(SendingCredentials::from_json(r#"{ "other": 1 }"#).is_err());
    }
}
