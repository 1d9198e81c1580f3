use crate::Result;
use chrono::{DateTime, Utc};
use medex_model::{CatalogRecord, FileType, NewCatalogRecord, Page, SortField, SortOrder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const RECORD_COLUMNS: &str = "id, patient_name, patient_id, file_path, file_type, file_size, \
     file_created_at, file_modified_at, thumbnail_path, parsing_confidence, \
     created_at, modified_at";

/// Database row shape for `medical_records`. `file_type` travels as text
/// and is mapped back onto the enum at the boundary.
#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: i64,
    patient_name: String,
    patient_id: String,
    file_path: String,
    file_type: String,
    file_size: Option<i64>,
    file_created_at: Option<DateTime<Utc>>,
    file_modified_at: Option<DateTime<Utc>>,
    thumbnail_path: Option<String>,
    parsing_confidence: f64,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl From<RecordRow> for CatalogRecord {
    fn from(row: RecordRow) -> Self {
        CatalogRecord {
            id: row.id,
            patient_name: row.patient_name,
            patient_id: row.patient_id,
            file_path: row.file_path,
            file_type: FileType::from(row.file_type.as_str()),
            file_size: row.file_size,
            file_created_at: row.file_created_at,
            file_modified_at: row.file_modified_at,
            thumbnail_path: row.thumbnail_path,
            parsing_confidence: row.parsing_confidence,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

/// Persisted catalog keyed by file path. The path column carries a unique
/// index, so the store itself is the last line of defense for the
/// one-record-per-path invariant; the synchronizer is its sole writer.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Open (creating if missing) the SQLite database at `path` and run
    /// pending migrations. WAL mode keeps the synchronizer workers and the
    /// read API from serializing against each other.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        info!(database = %path.display(), "catalog store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn find_by_path(&self, path: &str) -> Result<Option<CatalogRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE file_path = ?1");
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CatalogRecord::from))
    }

    pub async fn get(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1");
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CatalogRecord::from))
    }

    /// Insert a new record, assigning the surrogate key and both catalog
    /// timestamps. Returns `None` when a record for the path already
    /// exists: a racing duplicate create degrades to a no-op instead of a
    /// constraint error.
    pub async fn insert(&self, record: &NewCatalogRecord) -> Result<Option<CatalogRecord>> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO medical_records \
             (patient_name, patient_id, file_path, file_type, file_size, \
              file_created_at, file_modified_at, parsing_confidence, created_at, modified_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&record.patient_name)
        .bind(&record.patient_id)
        .bind(&record.file_path)
        .bind(record.file_type.as_str())
        .bind(record.file_size)
        .bind(record.file_created_at)
        .bind(record.file_modified_at)
        .bind(record.parsing_confidence)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(path = %record.file_path, "insert ignored, path already cataloged");
            return Ok(None);
        }
        self.get(result.last_insert_rowid()).await
    }

    /// Repoint a record at a new path, touching `modified_at` and leaving
    /// the identity fields alone. A stale record already sitting at the
    /// destination (the move overwrote its file) is removed in the same
    /// transaction so the unique index cannot reject the update. Returns
    /// `None` when the old path was never indexed.
    pub async fn update_path(&self, old_path: &str, new_path: &str) -> Result<Option<CatalogRecord>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM medical_records WHERE file_path = ?1")
            .bind(new_path)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE medical_records SET file_path = ?1, modified_at = ?2 WHERE file_path = ?3",
        )
        .bind(new_path)
        .bind(Utc::now())
        .bind(old_path)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_path(new_path).await
    }

    pub async fn update_thumbnail_path(&self, id: i64, thumbnail_path: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE medical_records SET thumbnail_path = ?1, modified_at = ?2 WHERE id = ?3",
        )
        .bind(thumbnail_path)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_path(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM medical_records WHERE file_path = ?1")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM medical_records WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM medical_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Substring search over patient identity. All-digit terms match the
    /// registration number, anything else matches the name, mirroring how
    /// the viewer distinguishes the two query kinds.
    pub async fn search(
        &self,
        term: &str,
        sort: SortField,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Page<CatalogRecord>> {
        let column = if !term.is_empty() && term.bytes().all(|b| b.is_ascii_digit()) {
            "patient_id"
        } else {
            "patient_name"
        };

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM medical_records WHERE {column} LIKE '%' || ?1 || '%'"
        ))
        .bind(term)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records \
             WHERE {column} LIKE '%' || ?1 || '%' \
             ORDER BY {} LIMIT ?2 OFFSET ?3",
            order_clause(sort, order)
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(term)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            total,
            results: rows.into_iter().map(CatalogRecord::from).collect(),
            limit,
            offset,
        })
    }

    /// Newest-first listing of the whole catalog.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Page<CatalogRecord>> {
        let total = self.count().await?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records \
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            total,
            results: rows.into_iter().map(CatalogRecord::from).collect(),
            limit,
            offset,
        })
    }
}

fn order_clause(sort: SortField, order: SortOrder) -> &'static str {
    match (sort, order) {
        (SortField::FileCreatedAt, SortOrder::Asc) => "file_created_at ASC",
        (SortField::FileCreatedAt, SortOrder::Desc) => "file_created_at DESC",
        (SortField::PatientName, SortOrder::Asc) => "patient_name ASC",
        (SortField::PatientName, SortOrder::Desc) => "patient_name DESC",
        (SortField::CreatedAt, SortOrder::Asc) => "created_at ASC",
        (SortField::CreatedAt, SortOrder::Desc) => "created_at DESC",
    }
}
