use chrono::{DateTime, Utc};
use medex_model::FileType;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Filesystem attributes gathered for a path at event time.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub file_type: FileType,
    /// Absent for directories.
    pub file_size: Option<i64>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub file_modified_at: Option<DateTime<Utc>>,
}

/// The path stopped being readable between event delivery and the metadata
/// read. Expected under event/filesystem races; the event is skipped, not
/// failed.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("path vanished before metadata read: {0}")]
    Vanished(PathBuf),

    #[error("metadata unreadable for {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataCollector;

impl MetadataCollector {
    pub fn new() -> Self {
        Self
    }

    pub async fn collect(&self, path: &Path) -> Result<FileMetadata, CollectError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CollectError::Vanished(path.to_path_buf())
            } else {
                CollectError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let is_dir = metadata.is_dir();
        Ok(FileMetadata {
            file_type: FileType::classify(path, is_dir),
            file_size: (!is_dir).then(|| metadata.len() as i64),
            // Creation time is unreadable on some network filesystems;
            // the timestamps are optional for exactly that reason.
            file_created_at: metadata.created().ok().and_then(system_time_to_utc),
            file_modified_at: metadata.modified().ok().and_then(system_time_to_utc),
        })
    }
}

fn system_time_to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    let duration = time.duration_since(std::time::UNIX_EPOCH).ok()?;
    DateTime::<Utc>::from_timestamp(duration.as_secs() as i64, duration.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("홍길동_1234567_검사결과.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();

        let metadata = MetadataCollector::new().collect(&path).await.unwrap();
        assert_eq!(metadata.file_type, FileType::Pdf);
        assert_eq!(metadata.file_size, Some(8));
        assert!(metadata.file_modified_at.is_some());
    }

    #[tokio::test]
    async fn test_collect_directory_omits_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("김민준_7654321_CT");
        tokio::fs::create_dir(&path).await.unwrap();

        let metadata = MetadataCollector::new().collect(&path).await.unwrap();
        assert_eq!(metadata.file_type, FileType::ImageFolder);
        assert_eq!(metadata.file_size, None);
    }

    #[tokio::test]
    async fn test_vanished_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.pdf");

        let err = MetadataCollector::new().collect(&path).await.unwrap_err();
        assert!(matches!(err, CollectError::Vanished(_)));
    }
}
