//! TOML configuration parsing.
//!
//! Every section is optional. A missing config file is not an error for the
//! CLI: [`Config::minimal`] supplies the defaults, which point at a backend on
//! `http://localhost:3001`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the indexing backend lives and how to reach it.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_create_index_path")]
    pub create_index_path: String,
    #[serde(default = "default_update_index_path")]
    pub update_index_path: String,
    #[serde(default = "default_query_index_path")]
    pub query_index_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            create_index_path: default_create_index_path(),
            update_index_path: default_update_index_path(),
            query_index_path: default_query_index_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_create_index_path() -> String {
    "/api/createIndex".to_string()
}
fn default_update_index_path() -> String {
    "/api/updateIndex".to_string()
}
fn default_query_index_path() -> String {
    "/api/queryIndex".to_string()
}

impl BackendConfig {
    /// Joins `base_url` and an endpoint path without doubling the slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// First bot message of every session.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// File names longer than this are shortened in the status line.
    #[serde(default = "default_file_name_display_len")]
    pub file_name_display_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            file_name_display_len: default_file_name_display_len(),
        }
    }
}

fn default_greeting() -> String {
    "Hello! How can I assist you today?".to_string()
}
fn default_file_name_display_len() -> usize {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Lowercase extensions without the dot. Empty accepts anything.
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accepted_extensions: default_accepted_extensions(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_accepted_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Defaults for running without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let backend = &config.backend;
    if !(backend.base_url.starts_with("http://") || backend.base_url.starts_with("https://")) {
        anyhow::bail!(
            "backend.base_url must start with http:// or https:// (got '{}')",
            backend.base_url
        );
    }
    if backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }
    for (key, path) in [
        ("create_index_path", &backend.create_index_path),
        ("update_index_path", &backend.update_index_path),
        ("query_index_path", &backend.query_index_path),
    ] {
        if !path.starts_with('/') {
            anyhow::bail!("backend.{} must start with '/' (got '{}')", key, path);
        }
    }

    if config.chat.file_name_display_len == 0 {
        anyhow::bail!("chat.file_name_display_len must be > 0");
    }
    if config.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be > 0");
    }

    Ok(())
}
