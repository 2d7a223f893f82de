//! Run configuration for the sync engine.

use std::sync::Arc;

use catsync_types::error::ClientError;

/// Invoked synchronously when a resource fails; must not panic.
pub type ErrorCallback = Arc<dyn Fn(&str, Option<&ClientError>) + Send + Sync>;

/// Invoked synchronously when a resource is skipped; must not panic.
pub type WarningCallback = Arc<dyn Fn(&str) + Send + Sync>;

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_VERSION_RETRIES: u32 = 3;

/// Engine-wide options for one synchronization run.
///
/// Callbacks are first-class values held here rather than global state; the
/// defaults report through `tracing`.
#[derive(Clone)]
pub struct SyncOptions {
    /// Items per source page.
    pub page_size: u32,
    /// Concurrent per-key workers within a page.
    pub concurrency: usize,
    /// Additional attempts for retryable remote errors.
    pub max_retries: u32,
    /// Refetch-and-rediff attempts after an update version conflict.
    pub version_retries: u32,
    /// Compute diffs but submit nothing.
    pub dry_run: bool,
    pub error_callback: ErrorCallback,
    pub warning_callback: WarningCallback,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            version_retries: DEFAULT_VERSION_RETRIES,
            dry_run: false,
            error_callback: Arc::new(|message, cause| match cause {
                Some(cause) => tracing::error!(%cause, "{message}"),
                None => tracing::error!("{message}"),
            }),
            warning_callback: Arc::new(|message| tracing::warn!("{message}")),
        }
    }
}

impl std::fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("page_size", &self.page_size)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("version_retries", &self.version_retries)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl SyncOptions {
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_version_retries(mut self, version_retries: u32) -> Self {
        self.version_retries = version_retries;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_error_callback(mut self, callback: ErrorCallback) -> Self {
        self.error_callback = callback;
        self
    }

    #[must_use]
    pub fn with_warning_callback(mut self, callback: WarningCallback) -> Self {
        self.warning_callback = callback;
        self
    }
}
