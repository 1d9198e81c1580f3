use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Whether a bounded retry is worth attempting. Only transient store
    /// faults qualify; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
