//! Durable preview records behind the `PreviewStore` capability.
//!
//! The SQLite implementation follows the same shape as the rest of the
//! crate's storage: WAL journal for concurrent reads, schema applied on
//! open, batch lookups that issue exactly one query per call.
//!
//! At most one `StoredPreview` exists per URL. That invariant lives in a
//! UNIQUE constraint at the storage layer: concurrent first-time inserts
//! race through `ON CONFLICT DO NOTHING` and the re-select returns the
//! single winning row to every caller.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{EmbedError, EmbedResult};
use crate::image_ingest::ImageAsset;
use crate::utils::constants::TITLE_MAX_LENGTH;
use crate::utils::string_utils::safe_truncate_chars;

/// SQL schema for the preview store database
const SCHEMA_SQL: &str = r#"
-- Ingested image assets referenced by preview records
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    byte_size INTEGER NOT NULL
);

-- Preview records: one row per distinct URL, immutable after creation
CREATE TABLE IF NOT EXISTS previews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    description TEXT,
    provider_name TEXT,
    image INTEGER REFERENCES assets(id),
    created_at INTEGER NOT NULL
);
"#;

/// A persisted link preview. Created once per distinct URL; never mutated
/// afterwards by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPreview {
    pub id: i64,
    pub uuid: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub provider_name: Option<String>,
    /// Referenced image asset id, if an image was ingested.
    pub image: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A persisted image asset referenced by preview records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub id: i64,
    pub uri: String,
    pub mime_type: String,
    pub byte_size: i64,
}

/// Fields for a new preview record.
#[derive(Debug, Clone, Default)]
pub struct NewPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub provider_name: Option<String>,
    pub image: Option<i64>,
}

/// Durable preview storage capability.
#[async_trait]
pub trait PreviewStore: Send + Sync {
    /// Look up the preview for one URL by exact match.
    async fn find_by_url(&self, url: &str) -> EmbedResult<Option<StoredPreview>>;

    /// Look up previews for a set of URLs in a single query.
    async fn find_by_urls(&self, urls: &[String]) -> EmbedResult<HashMap<String, StoredPreview>>;

    /// Look up image assets for a set of ids in a single query.
    async fn find_assets_by_ids(&self, ids: &[i64]) -> EmbedResult<HashMap<i64, StoredAsset>>;

    /// Persist an ingested image, returning the stored asset.
    async fn insert_asset(&self, asset: &ImageAsset) -> EmbedResult<StoredAsset>;

    /// Persist a preview record, returning the winning row for its URL.
    ///
    /// Under a concurrent first resolution of the same URL, one insert
    /// wins and all callers receive that row.
    async fn insert_preview(&self, preview: NewPreview) -> EmbedResult<StoredPreview>;
}

/// SQLite-backed preview store.
#[derive(Clone)]
pub struct SqlitePreviewStore {
    pool: SqlitePool,
}

impl SqlitePreviewStore {
    /// Open the database at `db_path`, creating file and schema if needed.
    pub async fn open(db_path: &Path) -> EmbedResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    fn preview_from_row(row: &sqlx::sqlite::SqliteRow) -> EmbedResult<StoredPreview> {
        let created_at: i64 = row.try_get("created_at")?;
        Ok(StoredPreview {
            id: row.try_get("id")?,
            uuid: row.try_get("uuid")?,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            provider_name: row.try_get("provider_name")?,
            image: row.try_get("image")?,
            created_at: DateTime::from_timestamp(created_at, 0)
                .ok_or_else(|| EmbedError::Storage(format!("invalid timestamp {created_at}")))?,
        })
    }
}

#[async_trait]
impl PreviewStore for SqlitePreviewStore {
    async fn find_by_url(&self, url: &str) -> EmbedResult<Option<StoredPreview>> {
        let row = sqlx::query(
            "SELECT id, uuid, url, title, description, provider_name, image, created_at \
             FROM previews WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::preview_from_row).transpose()
    }

    async fn find_by_urls(&self, urls: &[String]) -> EmbedResult<HashMap<String, StoredPreview>> {
        if urls.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; urls.len()].join(",");
        let sql = format!(
            "SELECT id, uuid, url, title, description, provider_name, image, created_at \
             FROM previews WHERE url IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for url in urls {
            query = query.bind(url);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            let preview = Self::preview_from_row(row)?;
            found.insert(preview.url.clone(), preview);
        }
        Ok(found)
    }

    async fn find_assets_by_ids(&self, ids: &[i64]) -> EmbedResult<HashMap<i64, StoredAsset>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(",");
        let sql =
            format!("SELECT id, uri, mime_type, byte_size FROM assets WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            let asset = StoredAsset {
                id: row.try_get("id")?,
                uri: row.try_get("uri")?,
                mime_type: row.try_get("mime_type")?,
                byte_size: row.try_get("byte_size")?,
            };
            found.insert(asset.id, asset);
        }
        Ok(found)
    }

    async fn insert_asset(&self, asset: &ImageAsset) -> EmbedResult<StoredAsset> {
        let result = sqlx::query("INSERT INTO assets (uri, mime_type, byte_size) VALUES (?, ?, ?)")
            .bind(&asset.uri)
            .bind(&asset.mime_type)
            .bind(asset.byte_size as i64)
            .execute(&self.pool)
            .await?;

        Ok(StoredAsset {
            id: result.last_insert_rowid(),
            uri: asset.uri.clone(),
            mime_type: asset.mime_type.clone(),
            byte_size: asset.byte_size as i64,
        })
    }

    async fn insert_preview(&self, preview: NewPreview) -> EmbedResult<StoredPreview> {
        let title = preview
            .title
            .as_deref()
            .map(|t| safe_truncate_chars(t, TITLE_MAX_LENGTH).to_string());

        sqlx::query(
            "INSERT INTO previews (uuid, url, title, description, provider_name, image, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(url) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&preview.url)
        .bind(title)
        .bind(&preview.description)
        .bind(&preview.provider_name)
        .bind(preview.image)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        // Re-select: under a concurrent insert race the winning row may
        // not be ours, and that is the row every caller must observe.
        self.find_by_url(&preview.url).await?.ok_or_else(|| {
            EmbedError::Storage(format!("preview row missing after insert for {}", preview.url))
        })
    }
}
