//! `catsync status` — show stored checkpoints.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use catsync_types::resource::ResourceType;

use super::{build_client, build_store, load_config};

pub async fn execute(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let target = build_client(&config.target)?;
    let store = build_store(&config, Arc::clone(&target))?;

    for name in &config.sync.resource_types {
        let resource_type = ResourceType::new(name.clone());
        match store.get(&resource_type).await? {
            Some(versioned) => println!(
                "{name}: last synced {} (store version {})",
                versioned.checkpoint.last_synced_at,
                versioned.version.value()
            ),
            None => println!("{name}: no checkpoint (next run will be a full sync)"),
        }
    }
    Ok(())
}
