use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Document kind backing a catalog record.
///
/// Derived from the file extension, except that every directory classifies
/// as [`FileType::ImageFolder`] regardless of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Pdf,
    Docx,
    Image,
    ImageFolder,
    Unknown,
}

impl FileType {
    /// Classify a path. Directory-ness must be supplied by the caller since
    /// the path may no longer exist when classification happens.
    pub fn classify(path: &Path, is_dir: bool) -> Self {
        if is_dir {
            return FileType::ImageFolder;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::from_extension(ext),
            None => FileType::Unknown,
        }
    }

    /// Map a bare extension (without the dot, any case) to a file type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "docx" | "doc" => FileType::Docx,
            "jpg" | "jpeg" | "png" | "bmp" | "tiff" | "gif" => FileType::Image,
            _ => FileType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Docx => "DOCX",
            FileType::Image => "IMAGE",
            FileType::ImageFolder => "IMAGE_FOLDER",
            FileType::Unknown => "UNKNOWN",
        }
    }

    /// HTTP content type used when streaming the original file.
    pub fn content_type(&self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Image => "image/*",
            FileType::ImageFolder | FileType::Unknown => "application/octet-stream",
        }
    }
}

impl From<&str> for FileType {
    fn from(value: &str) -> Self {
        match value {
            "PDF" => FileType::Pdf,
            "DOCX" => FileType::Docx,
            "IMAGE" => FileType::Image,
            "IMAGE_FOLDER" => FileType::ImageFolder,
            _ => FileType::Unknown,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted catalog entry: one record per physical path.
///
/// `id`, `created_at` and `modified_at` are owned by the store; callers
/// never set them. `thumbnail_path` is written by the external thumbnail
/// collaborator after the record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub patient_name: String,
    pub patient_id: String,
    pub file_path: String,
    pub file_type: FileType,
    pub file_size: Option<i64>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub thumbnail_path: Option<String>,
    pub parsing_confidence: f64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Insert payload for a new catalog record, combining extraction output
/// with collected filesystem metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRecord {
    pub patient_name: String,
    pub patient_id: String,
    pub file_path: String,
    pub file_type: FileType,
    pub file_size: Option<i64>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub parsing_confidence: f64,
}
