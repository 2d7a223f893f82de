//! `catsync reset` — rewind a resource type's checkpoint.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::DateTime;

use catsync_types::checkpoint::ProgressCheckpoint;
use catsync_types::resource::ResourceType;

use super::{build_client, build_store, load_config};

pub async fn execute(config_path: &Path, resource_type: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let target = build_client(&config.target)?;
    let store = build_store(&config, Arc::clone(&target))?;

    let resource_type = ResourceType::new(resource_type);
    match store.get(&resource_type).await? {
        None => println!("{resource_type}: no checkpoint to reset"),
        Some(versioned) => {
            let rewound = ProgressCheckpoint::new(resource_type.clone(), DateTime::UNIX_EPOCH);
            store.set(&rewound, Some(versioned.version)).await?;
            println!("{resource_type}: checkpoint rewound; the next run will be a full sync");
        }
    }
    Ok(())
}
