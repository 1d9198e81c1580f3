use crate::collector::{CollectError, MetadataCollector};
use crate::deadletter::DeadLetterLog;
use crate::identity::IdentityExtractor;
use crate::store::CatalogStore;
use crate::Result;
use medex_model::{FileEvent, FileType, NewCatalogRecord};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Store-write retry policy. Transient SQLite faults (a busy writer, a
/// dropped share) get a small bounded number of attempts with exponential
/// backoff before the event is dead-lettered.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub max_write_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// What applying one event did to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New record inserted with this surrogate key.
    Inserted(i64),
    /// Create for a path that is already cataloged.
    AlreadyIndexed,
    /// No pattern tier validated; the event is discarded.
    NoIdentity,
    /// The path vanished before metadata collection; discarded.
    SourceUnreadable,
    /// Move applied to an existing record.
    PathUpdated,
    /// Known path removed from the catalog.
    Deleted,
    /// Delete for a path that was never indexed.
    NotIndexed,
    /// Modified events do not mutate the catalog.
    Ignored,
    /// Store writes kept failing; the event went to the dead-letter log.
    DeadLettered,
}

/// Applies normalized lifecycle events to the catalog, one at a time.
///
/// The synchronizer is the catalog's only writer. Callers must serialize
/// events for the same path (the pipeline routes by path hash); events for
/// different paths can run on any number of synchronizer clones
/// concurrently.
#[derive(Debug, Clone)]
pub struct CatalogSynchronizer {
    store: CatalogStore,
    extractor: IdentityExtractor,
    collector: MetadataCollector,
    dead_letter: DeadLetterLog,
    config: SyncConfig,
}

impl CatalogSynchronizer {
    pub fn new(store: CatalogStore, dead_letter: DeadLetterLog, config: SyncConfig) -> Self {
        Self {
            store,
            extractor: IdentityExtractor::new(),
            collector: MetadataCollector::new(),
            dead_letter,
            config,
        }
    }

    /// Apply one event. Every failure mode is contained here: the return
    /// value reports what happened, and nothing an event can carry brings
    /// the pipeline down.
    pub async fn apply(&self, event: &FileEvent) -> SyncOutcome {
        let outcome = match event {
            FileEvent::Created { path } => self.on_created(path).await,
            FileEvent::Deleted { path } => self.on_deleted(path).await,
            FileEvent::Moved { from, to } => self.on_moved(from, to).await,
            FileEvent::Modified { path } => {
                // Content edits do not change identity. Reserved for a
                // future metadata refresh.
                debug!(path = %path.display(), "modified event ignored");
                Ok(SyncOutcome::Ignored)
            }
        };

        match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.dead_letter
                    .record(event, &err.to_string(), self.config.max_write_attempts)
                    .await;
                SyncOutcome::DeadLettered
            }
        }
    }

    async fn on_created(&self, path: &Path) -> Result<SyncOutcome> {
        let path_str = path.to_string_lossy();

        if let Some(existing) = self
            .with_retry(|| self.store.find_by_path(&path_str))
            .await?
        {
            debug!(path = %path.display(), id = existing.id, "already cataloged, create is a no-op");
            return Ok(SyncOutcome::AlreadyIndexed);
        }

        let metadata = match self.collector.collect(path).await {
            Ok(metadata) => metadata,
            Err(err @ CollectError::Vanished(_)) => {
                debug!(error = %err, "skipping create, path raced away");
                return Ok(SyncOutcome::SourceUnreadable);
            }
            Err(err) => {
                warn!(error = %err, "skipping create, metadata unreadable");
                return Ok(SyncOutcome::SourceUnreadable);
            }
        };

        let Some(identity) = self.extractor.extract(&parse_token(path, metadata.file_type)) else {
            debug!(path = %path.display(), "no identity pattern matched, not cataloged");
            return Ok(SyncOutcome::NoIdentity);
        };

        let record = NewCatalogRecord {
            patient_name: identity.patient_name,
            patient_id: identity.patient_id,
            file_path: path_str.into_owned(),
            file_type: metadata.file_type,
            file_size: metadata.file_size,
            file_created_at: metadata.file_created_at,
            file_modified_at: metadata.file_modified_at,
            parsing_confidence: identity.confidence,
        };

        match self.with_retry(|| self.store.insert(&record)).await? {
            Some(inserted) => {
                info!(
                    id = inserted.id,
                    patient_name = %inserted.patient_name,
                    patient_id = %inserted.patient_id,
                    path = %path.display(),
                    confidence = inserted.parsing_confidence,
                    "cataloged"
                );
                Ok(SyncOutcome::Inserted(inserted.id))
            }
            None => Ok(SyncOutcome::AlreadyIndexed),
        }
    }

    async fn on_deleted(&self, path: &Path) -> Result<SyncOutcome> {
        let path_str = path.to_string_lossy();
        if self
            .with_retry(|| self.store.delete_by_path(&path_str))
            .await?
        {
            info!(path = %path.display(), "removed from catalog");
            Ok(SyncOutcome::Deleted)
        } else {
            debug!(path = %path.display(), "delete for a path that was never indexed");
            Ok(SyncOutcome::NotIndexed)
        }
    }

    async fn on_moved(&self, from: &Path, to: &Path) -> Result<SyncOutcome> {
        let from_str = from.to_string_lossy();
        let to_str = to.to_string_lossy();

        match self
            .with_retry(|| self.store.update_path(&from_str, &to_str))
            .await?
        {
            Some(record) => {
                info!(id = record.id, from = %from.display(), to = %to.display(), "path updated");
                Ok(SyncOutcome::PathUpdated)
            }
            None => {
                // The source was never indexed; the move still gives the
                // file a chance under its new name.
                debug!(from = %from.display(), "move source unknown, treating as create");
                self.on_created(to).await
            }
        }
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.config.max_write_attempts => {
                    let backoff = self.config.retry_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        error = %err,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "store operation failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// The token handed to the extractor: the stem for files (extension
/// stripped), the plain directory name for folders.
fn parse_token(path: &Path, file_type: FileType) -> String {
    let token = if file_type == FileType::ImageFolder {
        path.file_name()
    } else {
        path.file_stem()
    };
    token.map(|t| t.to_string_lossy().into_owned()).unwrap_or_default()
}
