// src/store/local.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{RemoteFile, RemoteStore};

/// A plain directory standing in for remote storage.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Use `root` as the store, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating store directory {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn find(&self, name: &str) -> Result<Option<RemoteFile>> {
        let path = self.root.join(name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(RemoteFile {
                id: path.display().to_string(),
                name: name.to_string(),
                size: Some(meta.len()),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("checking {}", path.display())),
        }
    }

    async fn download(&self, file: &RemoteFile, dest_dir: &Path) -> Result<PathBuf> {
        let src = PathBuf::from(&file.id);
        let dest = dest_dir.join(&file.name);
        if src == dest {
            return Ok(dest);
        }
        fs::create_dir_all(dest_dir).await?;
        let bytes = fs::copy(&src, &dest)
            .await
            .with_context(|| format!("copying {} to {}", src.display(), dest.display()))?;
        debug!(file = %file.name, bytes, "copied from local store");
        Ok(dest)
    }

    async fn upload(&self, local: &Path, name: &str) -> Result<()> {
        let dest = self.root.join(name);
        if dest.is_file() {
            fs::remove_file(&dest)
                .await
                .with_context(|| format!("removing previous {}", dest.display()))?;
        }
        let bytes = fs::copy(local, &dest)
            .await
            .with_context(|| format!("copying {} to {}", local.display(), dest.display()))?;
        info!(file = %name, bytes, "stored in local store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_find_download_upload() {
        let store_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let store = LocalStore::new(store_dir.path()).unwrap();

        assert_eq!(store.find("RADAR_2024_12.xlsx").await.unwrap(), None);

        let local = work_dir.path().join("RADAR_2024_12.xlsx");
        std::fs::write(&local, b"first").unwrap();
        store.upload(&local, "RADAR_2024_12.xlsx").await.unwrap();

        std::fs::write(&local, b"second").unwrap();
        store.upload(&local, "RADAR_2024_12.xlsx").await.unwrap();

        let found = store.find("RADAR_2024_12.xlsx").await.unwrap().unwrap();
        assert_eq!(found.size, Some(6));

        let out_dir = tempdir().unwrap();
        let path = store.download(&found, out_dir.path()).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }
}
