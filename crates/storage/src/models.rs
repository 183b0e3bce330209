use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PosterRow {
    pub title_hash: String,
    pub poster_url: Option<String>,
    pub cached_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MetadataRow {
    pub title_hash: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub poster_url: Option<String>,
    pub cached_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RecentComicRow {
    pub path: String,
    pub name: String,
    pub poster_url: Option<String>,
    pub is_directory: bool,
    pub last_read_at: i64,
}
