use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tinylink_core::error::StorageError;
use tinylink_core::repository::{ReadRepository, Repository, Result, UrlRecord};
use tinylink_core::shortcode::ShortCode;
use tracing::debug;

const URL_HASH_INDEX: &str = "uk_short_urls_original_url_hash";

/// MySQL implementation of the repository contracts.
///
/// One row per original URL. The `original_url_hash` column is generated by
/// MySQL from the URL itself and carries the unique index that enforces it.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn row_to_record(row: MySqlRow) -> Result<UrlRecord> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let counter: u64 = row.try_get("counter").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expire_at: Option<i64> = row.try_get("expire_at").map_err(map_sqlx_error)?;

    let code = ShortCode::parse(&short_code)
        .map_err(|e| StorageError::InvalidData(format!("stored short code: {e}")))?;

    Ok(UrlRecord {
        code,
        original_url,
        counter,
        created_at: parse_timestamp("created_at", created_at)?,
        expire_at: expire_at
            .map(|seconds| parse_timestamp("expire_at", seconds))
            .transpose()?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, original_url, counter, created_at, expire_at
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(row_to_record).transpose()
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, original_url, counter, created_at, expire_at
            FROM short_urls
            WHERE original_url_hash = UNHEX(SHA2(?, 256))
              AND original_url = ?
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(row_to_record).transpose()
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, record: &UrlRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (short_code, original_url, counter, created_at, expire_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.original_url)
        .bind(record.counter)
        .bind(record.created_at.as_second())
        .bind(record.expire_at.map(|ts| ts.as_second()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(code = %record.code, "inserted record");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => {
                if err.to_string().contains(URL_HASH_INDEX) {
                    Err(StorageError::UrlConflict(record.original_url.clone()))
                } else {
                    Err(StorageError::CodeConflict(record.code.to_string()))
                }
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }
}
