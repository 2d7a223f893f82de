//! Run orchestration: pages, per-key worker fan-out, and checkpointing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use catsync_state::{CheckpointStore, StoreVersion};
use catsync_types::checkpoint::ProgressCheckpoint;
use catsync_types::outcome::{SyncOutcome, SyncStatistics};
use catsync_types::resource::{ResourceDraft, ResourceKey};

use crate::client::{PlatformClient, QueryFilter};
use crate::diff::{ActionDiffer, FieldDiffer};
use crate::errors::SyncRunError;
use crate::options::SyncOptions;
use crate::paginator::Paginator;
use crate::policy::ResourceStrategy;
use crate::resolver::ReferenceResolver;
use crate::result::RunSummary;
use crate::sync::sync_resource;

/// Cooperative cancellation flag, checked between pages.
///
/// In-flight per-resource work for the current page drains before the run
/// returns, so the last checkpoint write stays consistent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop after the current page.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Generic synchronization engine for one source/target pair.
///
/// All collaborators are injected explicitly; resource-type specifics come
/// from the [`ResourceStrategy`] passed to [`SyncRunner::run`].
pub struct SyncRunner {
    source: Arc<dyn PlatformClient>,
    target: Arc<dyn PlatformClient>,
    store: Arc<dyn CheckpointStore>,
    differ: Arc<dyn ActionDiffer>,
    options: SyncOptions,
}

impl SyncRunner {
    /// Assemble a runner with the default [`FieldDiffer`].
    #[must_use]
    pub fn new(
        source: Arc<dyn PlatformClient>,
        target: Arc<dyn PlatformClient>,
        store: Arc<dyn CheckpointStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            target,
            store,
            differ: Arc::new(FieldDiffer),
            options,
        }
    }

    /// Substitute the diff collaborator.
    #[must_use]
    pub fn with_differ(mut self, differ: Arc<dyn ActionDiffer>) -> Self {
        self.differ = differ;
        self
    }

    /// Converge the target's resource collection toward the source's.
    ///
    /// Per-resource failures are contained in the returned statistics; only
    /// exhausted page fetches, checkpoint conflicts (a concurrent run), and
    /// host-side defects abort with an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRunError`] when the run cannot continue safely.
    pub async fn run(
        &self,
        strategy: &ResourceStrategy,
        cancel: &CancelToken,
    ) -> Result<RunSummary, SyncRunError> {
        let run_start = Utc::now();
        let started = Instant::now();
        let resource_type = &strategy.resource_type;

        tracing::info!(
            resource_type = resource_type.as_str(),
            dry_run = self.options.dry_run,
            concurrency = self.options.concurrency,
            "Starting sync run"
        );

        let stored = self.store.get(resource_type).await?;
        let (mut checkpoint, mut store_version) = match stored {
            Some(versioned) => (versioned.checkpoint, Some(versioned.version)),
            None => (
                ProgressCheckpoint::new(resource_type.clone(), DateTime::UNIX_EPOCH),
                None,
            ),
        };
        let modified_since = stored_since(&checkpoint, store_version.is_some());

        let resolver = ReferenceResolver::build(
            self.source.as_ref(),
            &strategy.referenced_types,
            self.options.page_size,
            self.options.max_retries,
        )
        .await?;

        let filter = QueryFilter::since(self.options.page_size, modified_since);
        let mut paginator = Paginator::new(
            self.source.as_ref(),
            resource_type.clone(),
            filter,
            self.options.max_retries,
        );

        let stats = Arc::new(Mutex::new(SyncStatistics::default()));
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut pages = 0u64;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(items) = paginator.next_page().await? else {
                break;
            };
            pages += 1;
            let page_high_water = items.iter().map(|r| r.last_modified).max();

            let mut drafts = Vec::with_capacity(items.len());
            for raw in &items {
                match resolver.resolve(raw) {
                    Ok(draft) => drafts.push(draft),
                    Err(err) => {
                        (self.options.warning_callback)(&err.to_string());
                        let outcome = SyncOutcome::Skipped {
                            reason: err.to_string(),
                        };
                        stats
                            .lock()
                            .map_err(|_| anyhow!("statistics mutex poisoned"))?
                            .record(&outcome);
                    }
                }
            }

            // Updates to the same key must be serialized: one worker task
            // per key group, sequential within the group.
            let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
            for (key, group) in group_by_key(drafts) {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncRunError::Infrastructure(anyhow!("semaphore closed: {e}")))?;
                let target = Arc::clone(&self.target);
                let differ = Arc::clone(&self.differ);
                let options = self.options.clone();
                let policy = strategy.update_policy.clone();
                let stats = Arc::clone(&stats);

                join_set.spawn(async move {
                    let _permit = permit;
                    for draft in group {
                        let outcome = sync_resource(
                            target.as_ref(),
                            differ.as_ref(),
                            policy.as_ref(),
                            &options,
                            &draft,
                        )
                        .await;
                        tracing::debug!(key = key.as_str(), outcome = %outcome, "Resource synced");
                        stats
                            .lock()
                            .map_err(|_| anyhow!("statistics mutex poisoned"))?
                            .record(&outcome);
                    }
                    Ok(())
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => return Err(SyncRunError::Infrastructure(err)),
                    Err(join_err) => {
                        return Err(SyncRunError::Infrastructure(anyhow!(
                            "resource task panicked: {join_err}"
                        )))
                    }
                }
            }

            // Every resource in the page is terminal; persist progress.
            if let Some(high_water) = page_high_water {
                checkpoint = checkpoint.advanced_to(high_water);
                store_version = Some(self.write_checkpoint(&checkpoint, store_version).await?);
            }
        }

        if !cancelled {
            checkpoint = checkpoint.advanced_to(run_start);
            store_version = Some(self.write_checkpoint(&checkpoint, store_version).await?);
        }

        let stats = *stats
            .lock()
            .map_err(|_| anyhow!("statistics mutex poisoned"))?;
        let summary = RunSummary {
            resource_type: resource_type.clone(),
            stats,
            pages,
            duration_secs: started.elapsed().as_secs_f64(),
            cancelled,
        };
        tracing::info!(
            resource_type = resource_type.as_str(),
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            failed = stats.failed,
            pages,
            cancelled,
            "Sync run finished"
        );
        Ok(summary)
    }

    async fn write_checkpoint(
        &self,
        checkpoint: &ProgressCheckpoint,
        expected: Option<StoreVersion>,
    ) -> Result<StoreVersion, SyncRunError> {
        if self.options.dry_run {
            // Don't disturb real progress from a preview run. Reuse the
            // expected version so subsequent writes stay consistent.
            return Ok(expected.unwrap_or_else(|| StoreVersion::new(0)));
        }
        let version = self.store.set(checkpoint, expected).await?;
        tracing::debug!(
            resource_type = checkpoint.resource_type.as_str(),
            last_synced_at = %checkpoint.last_synced_at,
            "Checkpoint advanced"
        );
        Ok(version)
    }
}

/// Delta filter start: the stored checkpoint timestamp, or `None` on a
/// first run.
fn stored_since(
    checkpoint: &ProgressCheckpoint,
    has_stored: bool,
) -> Option<DateTime<Utc>> {
    has_stored.then_some(checkpoint.last_synced_at)
}

/// Group drafts by key, preserving first-occurrence order.
fn group_by_key(drafts: Vec<ResourceDraft>) -> Vec<(ResourceKey, Vec<ResourceDraft>)> {
    let mut groups: Vec<(ResourceKey, Vec<ResourceDraft>)> = Vec::new();
    for draft in drafts {
        match groups.iter_mut().find(|(key, _)| *key == draft.key) {
            Some((_, group)) => group.push(draft),
            None => groups.push((draft.key.clone(), vec![draft])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsync_types::resource::ResourceType;
    use std::collections::BTreeMap;

    fn draft(key: &str) -> ResourceDraft {
        ResourceDraft {
            key: ResourceKey::new(key),
            resource_type: ResourceType::new("product"),
            name: key.to_uppercase(),
            slug: None,
            description: None,
            product_type: None,
            categories: Vec::new(),
            attributes: BTreeMap::new(),
            variants: Vec::new(),
        }
    }

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn group_by_key_preserves_order_and_groups_duplicates() {
        let groups = group_by_key(vec![draft("a"), draft("b"), draft("a"), draft("c")]);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn stored_since_is_none_on_first_run() {
        let checkpoint = ProgressCheckpoint::new(ResourceType::new("product"), DateTime::UNIX_EPOCH);
        assert!(stored_since(&checkpoint, false).is_none());
        assert_eq!(
            stored_since(&checkpoint, true),
            Some(DateTime::UNIX_EPOCH)
        );
    }
}
