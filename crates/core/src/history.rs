//! Recently used searches and comics.

use crate::cache::now_millis;
use providers::{Entry, Metadata};
use sqlx::SqlitePool;
use storage::models::RecentComicRow;

const RECENT_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct History {
    pool: SqlitePool,
}

impl History {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add_search(&self, query: &str) -> anyhow::Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO recent_searches (query, searched_at) VALUES (?1, ?2)
            ON CONFLICT(query) DO UPDATE SET searched_at = excluded.searched_at
            "#,
        )
        .bind(query)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest first.
    pub async fn searches(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT query FROM recent_searches ORDER BY searched_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn clear_searches(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recent_searches")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn add_comic(&self, entry: &Entry) -> anyhow::Result<()> {
        let poster_url = entry.metadata.as_ref().and_then(|m| m.poster_url.clone());
        sqlx::query(
            r#"
            INSERT INTO recent_comics (path, name, poster_url, is_directory, last_read_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                poster_url = COALESCE(excluded.poster_url, recent_comics.poster_url),
                is_directory = excluded.is_directory,
                last_read_at = excluded.last_read_at
            "#,
        )
        .bind(&entry.path)
        .bind(&entry.name)
        .bind(poster_url)
        .bind(entry.is_directory)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recently read first.
    pub async fn comics(&self) -> anyhow::Result<Vec<Entry>> {
        let rows = sqlx::query_as::<_, RecentComicRow>(
            r#"
            SELECT path, name, poster_url, is_directory, last_read_at
            FROM recent_comics ORDER BY last_read_at DESC, rowid DESC LIMIT ?1
            "#,
        )
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Entry {
                name: r.name,
                is_directory: r.is_directory,
                path: r.path,
                metadata: r.poster_url.map(|url| Metadata {
                    poster_url: Some(url),
                    ..Metadata::default()
                }),
            })
            .collect())
    }

    pub async fn remove_comic(&self, path: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recent_comics WHERE path = ?1")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
