//! CLI subcommand implementations and shared wiring.

pub mod reset;
pub mod run;
pub mod status;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use catsync_engine::client::PlatformClient;
use catsync_engine::config::{self, EndpointConfig, ProjectConfig, StateBackendKind};
use catsync_engine::{HttpPlatformClient, PlatformCheckpointStore};
use catsync_state::{CheckpointStore, SqliteCheckpointStore};

/// Load and validate the project configuration.
pub(crate) fn load_config(path: &Path) -> Result<ProjectConfig> {
    let config = config::parse_project(path)?;
    config::validate_project(&config)?;
    Ok(config)
}

/// Build an HTTP client for one configured endpoint.
pub(crate) fn build_client(endpoint: &EndpointConfig) -> Result<Arc<dyn PlatformClient>> {
    let client = HttpPlatformClient::new(
        endpoint.api_url.clone(),
        endpoint.auth_token.clone(),
        Duration::from_secs(endpoint.request_timeout_secs),
    )
    .with_context(|| format!("Failed to build client for {}", endpoint.api_url))?;
    Ok(Arc::new(client))
}

/// Build the configured checkpoint store, writing through the target
/// client for the platform backend.
pub(crate) fn build_store(
    config: &ProjectConfig,
    target: Arc<dyn PlatformClient>,
) -> Result<Arc<dyn CheckpointStore>> {
    Ok(match config.state.backend {
        StateBackendKind::Platform => Arc::new(PlatformCheckpointStore::new(target)),
        StateBackendKind::Sqlite => {
            let store = SqliteCheckpointStore::open(&config.state.path).with_context(|| {
                format!(
                    "Failed to open checkpoint database at {}",
                    config.state.path.display()
                )
            })?;
            Arc::new(store)
        }
    })
}
