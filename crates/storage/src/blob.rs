//! Content-addressable byte store on local disk.
//!
//! Blobs are keyed by the blake3 hash of their *source identifier* (usually a
//! URL), not of their content. A blob is written once and then reused; writes
//! go through a temporary file that is hard-linked into place, so readers never
//! observe a partially written blob and a racing writer never replaces one.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create blob dir {:?}", root))?;
        Ok(Self { root })
    }

    pub fn key_for(source: &str) -> String {
        blake3::hash(source.as_bytes()).to_hex().to_string()
    }

    /// `<root>/<first two hex chars>/<full hash>`
    pub fn path_for(&self, source: &str) -> PathBuf {
        let key = Self::key_for(source);
        self.root.join(&key[..2]).join(key)
    }

    pub async fn contains(&self, source: &str) -> bool {
        tokio::fs::try_exists(self.path_for(source))
            .await
            .unwrap_or(false)
    }

    pub async fn get(&self, source: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(source);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read blob {:?}", path)),
        }
    }

    /// Stores `bytes` under `source` unless a blob already exists.
    /// Returns `false` when an existing blob was kept.
    pub async fn put(&self, source: &str, bytes: &[u8]) -> anyhow::Result<bool> {
        let path = self.path_for(source);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(?path, "blob already present");
            return Ok(false);
        }
        let dir = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create blob shard {:?}", dir))?;

        let tmp = dir.join(format!(
            ".{}.{}.{}.tmp",
            Self::key_for(source),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("write blob {:?}", tmp));
        }
        // Linking fails if another writer committed first; the first blob wins.
        let committed = match tokio::fs::hard_link(&tmp, &path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(?path, "blob committed concurrently");
                Ok(false)
            }
            Err(e) => Err(e),
        };
        let _ = tokio::fs::remove_file(&tmp).await;
        committed.with_context(|| format!("commit blob {:?}", path))
    }
}
