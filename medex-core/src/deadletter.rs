use chrono::{DateTime, Utc};
use medex_model::FileEvent;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Durable record of an event dropped after store-write retries were
/// exhausted, kept for manual reconciliation. One JSON object per line.
#[derive(Debug, Serialize)]
struct DeadLetterEntry<'a> {
    at: DateTime<Utc>,
    event: &'a FileEvent,
    error: String,
    attempts: u32,
}

/// Append-only JSONL sink. Recording never fails the pipeline: a sink that
/// cannot be written is itself logged and the event is dropped, which is
/// the same catalog state the dead letter documents.
#[derive(Debug, Clone)]
pub struct DeadLetterLog {
    path: PathBuf,
}

impl DeadLetterLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, event: &FileEvent, error: &str, attempts: u32) {
        warn!(
            event = %event,
            error,
            attempts,
            dead_letter = %self.path.display(),
            "event dropped after retries; catalog stays out of sync until the next full scan"
        );

        let entry = DeadLetterEntry {
            at: Utc::now(),
            event,
            error: error.to_string(),
            attempts,
        };
        if let Err(write_err) = self.append(&entry).await {
            error!(
                dead_letter = %self.path.display(),
                error = %write_err,
                "failed to write dead-letter entry"
            );
        }
    }

    async fn append(&self, entry: &DeadLetterEntry<'_>) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_record_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let log = DeadLetterLog::new(dir.path().join("dead_letter.jsonl"));

        let event = FileEvent::Created {
            path: PathBuf::from("/nas/홍길동_1234567_검사.pdf"),
        };
        log.record(&event, "database is locked", 3).await;
        log.record(&event, "database is locked", 3).await;

        let contents = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["attempts"], 3);
        assert_eq!(parsed["event"]["kind"], "created");
    }
}
