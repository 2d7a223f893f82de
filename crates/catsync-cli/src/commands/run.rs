//! `catsync run` — execute a synchronization.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use catsync_engine::{CancelToken, ResourceStrategy, SyncOptions, SyncRunner};

use super::{build_client, build_store, load_config};

pub async fn execute(config_path: &Path, dry_run: bool, only: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    let resource_types: Vec<String> = match only {
        Some(name) => vec![name.to_owned()],
        None => config.sync.resource_types.clone(),
    };

    let source = build_client(&config.source)?;
    let target = build_client(&config.target)?;
    let store = build_store(&config, Arc::clone(&target))?;

    let options = SyncOptions::default()
        .with_page_size(config.sync.page_size)
        .with_concurrency(config.sync.concurrency)
        .with_max_retries(config.sync.max_retries)
        .with_version_retries(config.sync.version_retries)
        .with_dry_run(dry_run);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Cancellation requested, draining the current page");
                cancel.cancel();
            }
        });
    }

    tracing::info!(
        project = config.project,
        dry_run,
        resource_types = ?resource_types,
        "Starting synchronization"
    );

    let runner = SyncRunner::new(source, target, store, options);
    let mut failed = 0u64;
    for name in &resource_types {
        let strategy = ResourceStrategy::for_name(name);
        let summary = runner
            .run(&strategy, &cancel)
            .await
            .with_context(|| format!("Sync run failed for resource type '{name}'"))?;
        println!("{}", summary.report());
        failed += summary.stats.failed;
        if summary.cancelled {
            break;
        }
    }

    if failed > 0 {
        bail!("{failed} resource(s) failed to sync");
    }
    Ok(())
}
