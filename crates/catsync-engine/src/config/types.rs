//! Project configuration schema.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level project configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Config schema version; currently `"1.0"`.
    pub version: String,
    /// Project name, used for logging only.
    pub project: String,
    pub source: EndpointConfig,
    pub target: EndpointConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub state: StateSettings,
}

/// Connection settings for one platform instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub api_url: String,
    pub auth_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Resource types to synchronize, in order.
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_version_retries")]
    pub version_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            resource_types: default_resource_types(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            version_retries: default_version_retries(),
        }
    }
}

/// Where sync checkpoints are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateBackendKind {
    /// In the target instance's custom-object store (shared by all
    /// operators of that target).
    Platform,
    /// In a local `SQLite` database.
    Sqlite,
}

/// Checkpoint persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSettings {
    #[serde(default = "default_state_backend")]
    pub backend: StateBackendKind,
    /// Database path for the `sqlite` backend.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            backend: default_state_backend(),
            path: default_state_path(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_resource_types() -> Vec<String> {
    vec!["product".to_owned()]
}

fn default_page_size() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_version_retries() -> u32 {
    3
}

fn default_state_backend() -> StateBackendKind {
    StateBackendKind::Platform
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".catsync/checkpoints.db")
}
