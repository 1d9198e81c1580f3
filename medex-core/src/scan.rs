use crate::{CatalogError, Result};
use medex_model::FileEvent;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Totals for one root's startup walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub directories: usize,
}

/// Walks a root once at startup, emitting a synthetic Created event for
/// every pre-existing file and directory so the catalog picks up whatever
/// was written while the service was down.
///
/// The walk for a root finishes before live watching starts for that same
/// root; the synchronizer's create-dedup makes the overlap with early live
/// events harmless either way.
#[derive(Debug)]
pub struct InitialScanner {
    event_tx: mpsc::Sender<FileEvent>,
}

impl InitialScanner {
    pub fn new(event_tx: mpsc::Sender<FileEvent>) -> Self {
        Self { event_tx }
    }

    pub async fn scan_root(&self, root: &Path) -> Result<ScanSummary> {
        info!(root = %root.display(), "initial scan started");
        let mut summary = ScanSummary::default();
        self.walk(root, &mut summary).await?;
        info!(
            root = %root.display(),
            files = summary.files,
            directories = summary.directories,
            "initial scan finished"
        );
        Ok(summary)
    }

    fn walk<'a>(
        &'a self,
        dir: &'a Path,
        summary: &'a mut ScanSummary,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|file_type| file_type.is_dir())
                    .unwrap_or(false);

                self.emit(FileEvent::Created { path: path.clone() }).await?;
                if is_dir {
                    summary.directories += 1;
                    // A subtree that cannot be read is skipped, the rest
                    // of the walk continues.
                    if let Err(err) = self.walk(&path, summary).await {
                        warn!(path = %path.display(), error = %err, "skipping unreadable subtree");
                    }
                } else {
                    summary.files += 1;
                }
            }
            Ok(())
        })
    }

    async fn emit(&self, event: FileEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| CatalogError::Internal("event queue closed during initial scan".into()))
    }
}
