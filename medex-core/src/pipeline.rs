use crate::sync::CatalogSynchronizer;
use medex_model::FileEvent;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of the shared queue between event producers (watcher,
    /// initial scan) and the router. Producers block when it fills.
    pub queue_capacity: usize,
    /// Synchronizer workers. Events partition across them by path hash,
    /// which is what serializes same-path events while unrelated paths
    /// proceed in parallel.
    pub workers: usize,
    /// How long shutdown waits for queued events to drain before the
    /// remaining work is abandoned.
    pub shutdown_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 4,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// The running ingest pipeline: one router task fanning a shared bounded
/// queue out to a fixed pool of synchronizer workers.
///
/// Same-path ordering: the router assigns every event to the worker at
/// `hash(routing_path) % workers` over its own bounded channel, so two
/// events for one path can never interleave their read-modify-write
/// against the store.
#[derive(Debug)]
pub struct IngestPipeline {
    event_tx: mpsc::Sender<FileEvent>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    shutdown_grace: Duration,
}

impl IngestPipeline {
    pub fn spawn(synchronizer: Arc<CatalogSynchronizer>, config: &PipelineConfig) -> Self {
        let workers = config.workers.max(1);
        let (event_tx, mut event_rx) = mpsc::channel::<FileEvent>(config.queue_capacity.max(1));

        let mut tasks = JoinSet::new();
        let mut worker_txs = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (tx, mut rx) = mpsc::channel::<FileEvent>(config.queue_capacity.max(1));
            worker_txs.push(tx);
            let synchronizer = Arc::clone(&synchronizer);
            tasks.spawn(async move {
                while let Some(event) = rx.recv().await {
                    let outcome = synchronizer.apply(&event).await;
                    debug!(worker, event = %event, ?outcome, "event applied");
                }
                debug!(worker, "synchronizer worker drained");
            });
        }

        tasks.spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let index = partition(event.routing_path(), workers);
                if worker_txs[index].send(event).await.is_err() {
                    break;
                }
            }
            // Dropping the per-worker senders lets the pool drain out.
        });

        info!(workers, queue = config.queue_capacity, "ingest pipeline started");
        Self {
            event_tx,
            cancel: CancellationToken::new(),
            tasks,
            shutdown_grace: config.shutdown_grace,
        }
    }

    /// A producer handle into the shared queue. Clones are handed to the
    /// watcher and the initial scanner; the pipeline keeps its own only
    /// until shutdown.
    pub fn sender(&self) -> mpsc::Sender<FileEvent> {
        self.event_tx.clone()
    }

    /// Token observed by producer tasks; fires once shutdown begins.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cooperative shutdown: signal producers to stop, let queued events
    /// drain within the grace period, then abandon whatever is left.
    ///
    /// The drain completes only after every producer handle is dropped,
    /// which the cancellation token arranges (the watcher supervisor and
    /// scanner exit and release their senders).
    pub async fn shutdown(mut self) {
        info!("ingest pipeline shutting down");
        self.cancel.cancel();
        drop(self.event_tx);

        let drain = async {
            while self.tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            warn!(
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "grace period elapsed, abandoning queued events"
            );
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }
        info!("ingest pipeline stopped");
    }
}

fn partition(path: &std::path::Path, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() as usize) % workers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_partition_is_stable() {
        let path = Path::new("/nas/내과/홍길동_1234567_검사.pdf");
        let first = partition(path, 4);
        for _ in 0..10 {
            assert_eq!(partition(path, 4), first);
        }
        assert!(first < 4);
    }

    #[test]
    fn test_moved_event_follows_old_path_partition() {
        let moved = FileEvent::Moved {
            from: "/nas/a.pdf".into(),
            to: "/nas/b.pdf".into(),
        };
        let deleted = FileEvent::Deleted {
            path: "/nas/a.pdf".into(),
        };
        assert_eq!(
            partition(moved.routing_path(), 8),
            partition(deleted.routing_path(), 8)
        );
    }
}
