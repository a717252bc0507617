// src/config.rs

//! Configuration for the feed layer.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values. Settings are
//! split into a table-reader section, a dataset-iteration section, and an
//! optional object-store section.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{FeedError, Result};

// Top-level feed configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub reader: ReaderConfig,
    pub dataset: DatasetConfig,
    /// Object-store access; only required when the bucket facade is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

// Table-reader configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Table identifier understood by the table client.
    pub table: String,
    /// Column selection forwarded verbatim to the table client.
    pub selected_cols: String,
    // Client-side prefetch depth (records buffered per open reader).
    pub prefetch: usize,
}

// Dataset-iteration configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Total logical dataset length across all shards.
    pub total_len: u64,
    /// Worker processes per replica.
    pub num_workers: u32,
    /// This replica's rank within the process group.
    pub rank: u32,
    /// Total replica count.
    pub world: u32,
    /// Pad per-worker iteration counts so every replica performs the same
    /// number of steps. Only takes effect when `world > 1`.
    pub pad_to_world: bool,
}

/// Object-store access configuration.
///
/// The four credential fields are required when this section is present;
/// `region`, `force_path_style`, and `allow_http` have usable defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub access_id: String,
    pub access_key: String,
    /// Service endpoint URL (region-specific for most providers).
    pub endpoint: String,
    pub bucket_name: String,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Use path-style addressing (required for MinIO-style endpoints).
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow HTTP (non-TLS) connections.
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            selected_cols: String::new(),
            prefetch: 1024,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            total_len: 0,
            num_workers: 1,
            rank: 0,
            world: 1,
            pad_to_world: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_id: String::new(),
            access_key: String::new(),
            endpoint: String::new(),
            bucket_name: String::new(),
            region: default_region(),
            force_path_style: false,
            allow_http: false,
        }
    }
}

impl ReaderConfig {
    /// Validate table-reader configuration.
    pub fn validate(&self) -> Result<()> {
        if self.prefetch == 0 {
            return Err(FeedError::config("reader.prefetch must be greater than 0"));
        }
        Ok(())
    }
}

impl DatasetConfig {
    /// Validate dataset-iteration configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(FeedError::config(
                "dataset.num_workers must be greater than 0",
            ));
        }
        if self.world == 0 {
            return Err(FeedError::config("dataset.world must be greater than 0"));
        }
        if self.rank >= self.world {
            return Err(FeedError::config(format!(
                "dataset.rank ({}) must be less than dataset.world ({})",
                self.rank, self.world
            )));
        }
        Ok(())
    }
}

impl StoreConfig {
    /// Apply environment variable overrides to store configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("TFEED_STORE_ACCESS_ID") {
            self.access_id = val;
        }
        if let Ok(val) = std::env::var("TFEED_STORE_ACCESS_KEY") {
            self.access_key = val;
        }
        if let Ok(val) = std::env::var("TFEED_STORE_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("TFEED_STORE_BUCKET_NAME") {
            self.bucket_name = val;
        }
        if let Ok(val) = std::env::var("TFEED_STORE_REGION") {
            self.region = val;
        }
        if let Ok(val) = std::env::var("TFEED_STORE_FORCE_PATH_STYLE") {
            if let Ok(v) = val.parse() {
                self.force_path_style = v;
            }
        }
        if let Ok(val) = std::env::var("TFEED_STORE_ALLOW_HTTP") {
            if let Ok(v) = val.parse() {
                self.allow_http = v;
            }
        }
        self
    }

    /// Validate store configuration.
    pub fn validate(&self) -> Result<()> {
        if self.access_id.is_empty() {
            return Err(FeedError::config("store.access_id must not be empty"));
        }
        if self.access_key.is_empty() {
            return Err(FeedError::config("store.access_key must not be empty"));
        }
        if self.endpoint.is_empty() {
            return Err(FeedError::config("store.endpoint must not be empty"));
        }
        if self.bucket_name.is_empty() {
            return Err(FeedError::config("store.bucket_name must not be empty"));
        }
        Ok(())
    }
}

impl FromStr for FeedConfig {
    type Err = FeedError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| FeedError::config_with_source("failed to parse TOML config", e))
    }
}

impl FeedConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeedError::storage_with_source(
                path.display().to_string(),
                "failed to read config file",
                e,
            )
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `TFEED_` and use underscores
    // to separate nested fields. For example:
    // - `TFEED_READER_TABLE` overrides `reader.table`
    // - `TFEED_DATASET_WORLD` overrides `dataset.world`
    // - `TFEED_STORE_BUCKET_NAME` overrides `store.bucket_name`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Reader overrides
        if let Ok(val) = std::env::var("TFEED_READER_TABLE") {
            self.reader.table = val;
        }
        if let Ok(val) = std::env::var("TFEED_READER_SELECTED_COLS") {
            self.reader.selected_cols = val;
        }
        if let Ok(val) = std::env::var("TFEED_READER_PREFETCH") {
            if let Ok(v) = val.parse() {
                self.reader.prefetch = v;
            }
        }

        // Dataset overrides
        if let Ok(val) = std::env::var("TFEED_DATASET_TOTAL_LEN") {
            if let Ok(v) = val.parse() {
                self.dataset.total_len = v;
            }
        }
        if let Ok(val) = std::env::var("TFEED_DATASET_NUM_WORKERS") {
            if let Ok(v) = val.parse() {
                self.dataset.num_workers = v;
            }
        }
        if let Ok(val) = std::env::var("TFEED_DATASET_RANK") {
            if let Ok(v) = val.parse() {
                self.dataset.rank = v;
            }
        }
        if let Ok(val) = std::env::var("TFEED_DATASET_WORLD") {
            if let Ok(v) = val.parse() {
                self.dataset.world = v;
            }
        }
        if let Ok(val) = std::env::var("TFEED_DATASET_PAD_TO_WORLD") {
            if let Ok(v) = val.parse() {
                self.dataset.pad_to_world = v;
            }
        }

        // Store overrides - create the section if the bucket name is set
        if std::env::var("TFEED_STORE_BUCKET_NAME").is_ok() {
            let store = self.store.take().unwrap_or_default().with_env_overrides();
            self.store = Some(store);
        } else if let Some(store) = self.store.take() {
            self.store = Some(store.with_env_overrides());
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        self.reader.validate()?;
        self.dataset.validate()?;
        if let Some(store) = &self.store {
            store.validate()?;
        }
        Ok(())
    }
}
