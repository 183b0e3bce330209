use crate::models::join_path;
use crate::{Entry, FileGateway, GatewayError};
use std::path::{Component, Path, PathBuf};

/// Gateway over a directory on the local filesystem (or a share mounted
/// into it). Paths are relative to `root`. Absolute paths and `file://` URIs
/// are accepted only when they point inside `root`; `..` is never accepted.
#[derive(Debug, Clone)]
pub struct LocalGateway {
    root: PathBuf,
}

impl LocalGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            root: std::path::absolute(&root).unwrap_or(root),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, GatewayError> {
        let trimmed = path.strip_prefix("file://").unwrap_or(path);
        let candidate = Path::new(trimmed);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(GatewayError::InvalidPath(path.to_string()));
        }
        if !candidate.is_absolute() {
            return Ok(self.root.join(candidate));
        }
        if candidate.starts_with(&self.root) {
            Ok(candidate.to_path_buf())
        } else {
            Err(GatewayError::InvalidPath(path.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl FileGateway for LocalGateway {
    fn name(&self) -> &str {
        "local"
    }

    async fn try_list(&self, path: &str) -> Result<Vec<Entry>, GatewayError> {
        let dir = self.resolve(path)?;
        if !tokio::fs::metadata(&dir).await?.is_dir() {
            return Err(GatewayError::NotADirectory(path.to_string()));
        }
        let mut reader = tokio::fs::read_dir(&dir).await?;
        let mut entries = Vec::new();
        while let Some(item) = reader.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            // Follows symlinks; dangling links count as files.
            let is_directory = tokio::fs::metadata(item.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            entries.push(Entry {
                path: join_path(path, &name),
                name,
                is_directory,
                metadata: None,
            });
        }
        Ok(entries)
    }

    async fn try_get_content(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        Ok(tokio::fs::read(self.resolve(path)?).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn lists_sorted_children_with_joined_paths() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("lib/Beta")).unwrap();
        fs::create_dir_all(temp.path().join("lib/alpha")).unwrap();
        fs::write(temp.path().join("lib/a.zip"), b"z").unwrap();

        let gw = LocalGateway::new(temp.path());
        let listed = gw.list("lib").await;
        let summary: Vec<_> = listed
            .iter()
            .map(|e| (e.path.as_str(), e.is_directory))
            .collect();
        assert_eq!(
            summary,
            [("lib/Beta", true), ("lib/alpha", true), ("lib/a.zip", false)]
        );
    }

    #[tokio::test]
    async fn failures_are_absorbed() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("file.txt"), b"hi").unwrap();
        let gw = LocalGateway::new(temp.path());

        assert!(gw.list("missing").await.is_empty());
        assert!(gw.list("file.txt").await.is_empty());
        assert!(gw.list("../escape").await.is_empty());
        assert!(gw.list("/").await.is_empty());
        assert!(gw.get_content("missing.zip").await.is_empty());
        assert_eq!(gw.get_content("file.txt").await, b"hi");
    }

    #[tokio::test]
    async fn paths_must_stay_inside_the_root() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("lib/Saga")).unwrap();
        fs::write(temp.path().join("lib/Saga/01.zip"), b"z").unwrap();
        let gw = LocalGateway::new(temp.path().join("lib"));

        assert!(matches!(
            gw.try_list("Saga/../..").await,
            Err(GatewayError::InvalidPath(_))
        ));
        let outside = temp.path().to_string_lossy().into_owned();
        assert!(matches!(
            gw.try_list(&outside).await,
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            gw.try_get_content(&format!("file://{outside}/lib/../x")).await,
            Err(GatewayError::InvalidPath(_))
        ));

        let inside = temp.path().join("lib/Saga").to_string_lossy().into_owned();
        assert_eq!(gw.try_list(&inside).await.unwrap().len(), 1);
        assert_eq!(
            gw.try_get_content(&format!("file://{inside}/01.zip")).await.unwrap(),
            b"z"
        );
    }
}
