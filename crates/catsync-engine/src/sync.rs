//! Per-resource synchronization core: fetch, diff, policy, submit.

use catsync_types::outcome::SyncOutcome;
use catsync_types::resource::ResourceDraft;

use crate::client::PlatformClient;
use crate::diff::ActionDiffer;
use crate::errors::retry_remote;
use crate::options::SyncOptions;
use crate::policy::UpdatePolicy;

/// Converge one resolved draft onto the target instance.
///
/// All failures are contained: the returned [`SyncOutcome`] is always
/// terminal and the error callback has been invoked for `Failed` outcomes.
/// The diff+submit+retry cycle in here is the unit of serialization for a
/// resource key; callers must not run it concurrently for the same key.
pub(crate) async fn sync_resource(
    target: &dyn PlatformClient,
    differ: &dyn ActionDiffer,
    policy: Option<&UpdatePolicy>,
    options: &SyncOptions,
    draft: &ResourceDraft,
) -> SyncOutcome {
    let resource_type = &draft.resource_type;
    let key = &draft.key;

    let fetched = retry_remote(options.max_retries, "fetch snapshot", || {
        target.fetch_by_key(resource_type, key)
    })
    .await;
    let mut snapshot = match fetched {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            // Created path: the draft is created verbatim, no diff or hook.
            if options.dry_run {
                tracing::debug!(key = key.as_str(), "Dry run: would create resource");
                return SyncOutcome::Created;
            }
            return match retry_remote(options.max_retries, "create resource", || {
                target.create(resource_type, draft)
            })
            .await
            {
                Ok(_) => SyncOutcome::Created,
                Err(err) => fail(
                    options,
                    format!("failed to create resource '{key}'"),
                    Some(err),
                ),
            };
        }
        Err(err) => {
            return fail(
                options,
                format!("failed to fetch target resource '{key}'"),
                Some(err),
            )
        }
    };

    let mut conflicts = 0u32;
    loop {
        let actions = differ.diff(draft, &snapshot);
        if actions.is_empty() {
            return SyncOutcome::Unchanged;
        }
        let actions = match policy {
            Some(policy) => policy(actions, draft, &snapshot),
            None => actions,
        };
        if actions.is_empty() {
            return SyncOutcome::Unchanged;
        }

        if options.dry_run {
            tracing::debug!(
                key = key.as_str(),
                actions = actions.len(),
                "Dry run: would update resource"
            );
            return SyncOutcome::Updated;
        }

        let version = snapshot.version;
        let submitted = retry_remote(options.max_retries, "apply update", || {
            target.apply_update(resource_type, key, version, &actions)
        })
        .await;

        match submitted {
            Ok(_) => return SyncOutcome::Updated,
            Err(err) if err.is_version_conflict() && conflicts < options.version_retries => {
                conflicts += 1;
                tracing::debug!(
                    key = key.as_str(),
                    conflicts,
                    "Update version conflict, refetching snapshot"
                );
                let refetched = retry_remote(options.max_retries, "refetch snapshot", || {
                    target.fetch_by_key(resource_type, key)
                })
                .await;
                snapshot = match refetched {
                    Ok(Some(fresh)) => fresh,
                    Ok(None) => {
                        return fail(
                            options,
                            format!("resource '{key}' disappeared during update"),
                            None,
                        )
                    }
                    Err(err) => {
                        return fail(
                            options,
                            format!("failed to refetch resource '{key}' after version conflict"),
                            Some(err),
                        )
                    }
                };
            }
            Err(err) if err.is_version_conflict() => {
                return fail(
                    options,
                    format!(
                        "version conflict updating '{key}' persisted after {} retries",
                        options.version_retries
                    ),
                    Some(err),
                )
            }
            Err(err) => {
                return fail(
                    options,
                    format!("failed to update resource '{key}'"),
                    Some(err),
                )
            }
        }
    }
}

fn fail(
    options: &SyncOptions,
    reason: String,
    cause: Option<catsync_types::error::ClientError>,
) -> SyncOutcome {
    (options.error_callback)(&reason, cause.as_ref());
    let reason = match cause {
        Some(cause) => format!("{reason}: {cause}"),
        None => reason,
    };
    SyncOutcome::Failed { reason }
}
