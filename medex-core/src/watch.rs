use crate::Result;
use medex_model::FileEvent;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A root stopped being watchable while running (network share dropped,
/// mount went away). Only that root's subscription is torn down.
#[derive(Debug)]
pub struct WatchAlert {
    pub root: PathBuf,
    pub error: notify::Error,
}

/// Watches configured roots for filesystem changes and feeds normalized
/// lifecycle events into the shared ingest queue.
///
/// Each root gets its own recursive OS subscription. Notification
/// callbacks run on the watcher's own thread and push into the bounded
/// queue with a blocking send: when the synchronizer falls behind, the
/// producer waits instead of dropping events, so the catalog never
/// silently desynchronizes.
#[derive(Debug)]
pub struct PathWatcher {
    event_tx: mpsc::Sender<FileEvent>,
    alert_tx: mpsc::UnboundedSender<WatchAlert>,
    alert_rx: mpsc::UnboundedReceiver<WatchAlert>,
    watchers: HashMap<PathBuf, RecommendedWatcher>,
}

impl PathWatcher {
    pub fn new(event_tx: mpsc::Sender<FileEvent>) -> Self {
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        Self {
            event_tx,
            alert_tx,
            alert_rx,
            watchers: HashMap::new(),
        }
    }

    /// Subscribe to one root, recursively. Fails when the root cannot be
    /// watched right now; the caller decides whether that is fatal (it is
    /// only when no root at all can be watched).
    pub fn watch_root(&mut self, root: &Path) -> Result<()> {
        let event_tx = self.event_tx.clone();
        let alert_tx = self.alert_tx.clone();
        let alert_root = root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for file_event in normalize_event(event) {
                        // Blocks the notify thread while the queue is
                        // full; send only errs once the pipeline is gone.
                        if event_tx.blocking_send(file_event).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = alert_tx.send(WatchAlert {
                        root: alert_root.clone(),
                        error: err,
                    });
                }
            },
            NotifyConfig::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "watching");
        self.watchers.insert(root.to_path_buf(), watcher);
        Ok(())
    }

    pub fn watched_roots(&self) -> usize {
        self.watchers.len()
    }

    /// Supervise the subscriptions until shutdown: a per-root failure
    /// tears down only that root, cancellation tears down everything.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                alert = self.alert_rx.recv() => match alert {
                    Some(alert) => self.handle_alert(alert),
                    None => break,
                },
            }
        }
        info!("stopping filesystem watchers");
        // Dropping the watcher map cancels every OS subscription.
    }

    fn handle_alert(&mut self, alert: WatchAlert) {
        error!(
            root = %alert.root.display(),
            error = %alert.error,
            "root became unwatchable; it is no longer monitored and needs operator attention"
        );
        self.watchers.remove(&alert.root);
    }
}

/// Collapse a native notification into zero or more lifecycle events.
///
/// Rename reporting differs per platform: a pair arrives as one two-path
/// event or as separate from/to halves, which map onto Deleted and
/// Created. Access events and kind-less events carry no catalog signal.
pub(crate) fn normalize_event(event: Event) -> Vec<FileEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Created { path })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Deleted { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            match <[PathBuf; 2]>::try_from(event.paths) {
                Ok([from, to]) => vec![FileEvent::Moved { from, to }],
                Err(paths) => {
                    debug!(count = paths.len(), "rename event without a path pair");
                    paths
                        .into_iter()
                        .map(|path| FileEvent::Modified { path })
                        .collect()
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Deleted { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Created { path })
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Modified { path })
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_create_maps_to_created() {
        let events = normalize_event(event(
            EventKind::Create(CreateKind::File),
            &["/nas/홍길동_1234567_검사.pdf"],
        ));
        assert_eq!(
            events,
            vec![FileEvent::Created {
                path: PathBuf::from("/nas/홍길동_1234567_검사.pdf")
            }]
        );
    }

    #[test]
    fn test_remove_maps_to_deleted() {
        let events = normalize_event(event(EventKind::Remove(RemoveKind::Any), &["/nas/a.pdf"]));
        assert_eq!(
            events,
            vec![FileEvent::Deleted {
                path: PathBuf::from("/nas/a.pdf")
            }]
        );
    }

    #[test]
    fn test_rename_pair_maps_to_moved() {
        let events = normalize_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/nas/a.pdf", "/nas/b.pdf"],
        ));
        assert_eq!(
            events,
            vec![FileEvent::Moved {
                from: PathBuf::from("/nas/a.pdf"),
                to: PathBuf::from("/nas/b.pdf"),
            }]
        );
    }

    #[test]
    fn test_rename_halves_map_to_delete_and_create() {
        let from = normalize_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/nas/a.pdf"],
        ));
        assert_eq!(
            from,
            vec![FileEvent::Deleted {
                path: PathBuf::from("/nas/a.pdf")
            }]
        );

        let to = normalize_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/nas/b.pdf"],
        ));
        assert_eq!(
            to,
            vec![FileEvent::Created {
                path: PathBuf::from("/nas/b.pdf")
            }]
        );
    }

    #[test]
    fn test_content_modify_maps_to_modified() {
        let events = normalize_event(event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/nas/a.pdf"],
        ));
        assert_eq!(
            events,
            vec![FileEvent::Modified {
                path: PathBuf::from("/nas/a.pdf")
            }]
        );
    }

    #[test]
    fn test_noise_is_dropped() {
        assert!(normalize_event(event(
            EventKind::Access(AccessKind::Any),
            &["/nas/a.pdf"]
        ))
        .is_empty());
        assert!(normalize_event(event(EventKind::Any, &["/nas/a.pdf"])).is_empty());
    }
}
