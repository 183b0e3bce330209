//! Poster lookups and image bytes cached on local disk.
//!
//! Two independent keyspaces: SQLite rows keyed by the hash of a normalized
//! title, and a blob store keyed by the hash of a source URL. Every write is
//! best-effort; failures are logged and dropped so the lookup that produced
//! the value still succeeds.

use providers::Metadata;
use sqlx::SqlitePool;
use storage::models::{MetadataRow, PosterRow};
use storage::BlobStore;
use tracing::{debug, warn};

/// Content hash used as the row key for a normalized title.
pub fn title_key(normalized: &str) -> String {
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct ContentCache {
    pool: SqlitePool,
    blobs: BlobStore,
}

impl ContentCache {
    pub fn new(pool: SqlitePool, blobs: BlobStore) -> Self {
        Self { pool, blobs }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub async fn poster(&self, key: &str) -> Option<PosterRow> {
        let row = sqlx::query_as::<_, PosterRow>(
            "SELECT title_hash, poster_url, cached_at FROM poster_cache WHERE title_hash = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;
        match row {
            Ok(row) => row,
            Err(e) => {
                warn!(key, error = %e, "poster cache read failed");
                None
            }
        }
    }

    /// Upserts the poster for `key`. `None` records a confirmed miss.
    pub async fn store_poster(&self, key: &str, poster_url: Option<&str>) {
        let res = sqlx::query(
            r#"
            INSERT INTO poster_cache (title_hash, poster_url, cached_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(title_hash) DO UPDATE SET
                poster_url = excluded.poster_url,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(key)
        .bind(poster_url)
        .bind(now_millis())
        .execute(&self.pool)
        .await;
        if let Err(e) = res {
            warn!(key, error = %e, "poster cache write dropped");
        }
    }

    pub async fn metadata(&self, key: &str) -> Option<Metadata> {
        let row = sqlx::query_as::<_, MetadataRow>(
            r#"
            SELECT title_hash, title, author, summary, poster_url, cached_at
            FROM metadata_cache WHERE title_hash = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;
        match row {
            Ok(row) => row.map(|r| Metadata {
                poster_url: r.poster_url,
                title: r.title,
                author: r.author,
                summary: r.summary,
            }),
            Err(e) => {
                warn!(key, error = %e, "metadata cache read failed");
                None
            }
        }
    }

    pub async fn store_metadata(&self, key: &str, meta: &Metadata) {
        let res = sqlx::query(
            r#"
            INSERT INTO metadata_cache (title_hash, title, author, summary, poster_url, cached_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(title_hash) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                summary = excluded.summary,
                poster_url = excluded.poster_url,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(key)
        .bind(&meta.title)
        .bind(&meta.author)
        .bind(&meta.summary)
        .bind(&meta.poster_url)
        .bind(now_millis())
        .execute(&self.pool)
        .await;
        if let Err(e) = res {
            warn!(key, error = %e, "metadata cache write dropped");
        }
    }

    pub async fn blob(&self, url: &str) -> Option<Vec<u8>> {
        match self.blobs.get(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url, error = %e, "blob read failed");
                None
            }
        }
    }

    /// Returns true when a new blob was written.
    pub async fn store_blob(&self, url: &str, bytes: &[u8]) -> bool {
        match self.blobs.put(url, bytes).await {
            Ok(written) => {
                debug!(url, written, "blob stored");
                written
            }
            Err(e) => {
                warn!(url, error = %e, "blob write dropped");
                false
            }
        }
    }
}
