use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One node of a file tree, or a discovered comic folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    pub is_directory: bool,
    /// Canonical, backend-resolvable identifier.
    pub path: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Entry {
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            path: path.into(),
            metadata: None,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            path: path.into(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, alias = "poster_url", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Metadata {
    /// Turns blank fields into `None`.
    pub fn without_blanks(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            poster_url: keep(self.poster_url),
            title: keep(self.title),
            author: keep(self.author),
            summary: keep(self.summary),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poster_url.is_none()
            && self.title.is_none()
            && self.author.is_none()
            && self.summary.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPage {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<Entry>,
}

/// Directories first, then lexicographically by name. Later duplicates of a
/// path are dropped.
pub fn sort_entries(entries: &mut Vec<Entry>) {
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.path.clone()));
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Appends `name` to a slash-separated `parent` path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Last non-empty segment of a slash-separated path, or the path itself.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
}
