use crate::domain::ports::ReceiptStorage;
use crate::error::{RaceError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Stores receipt images as files under a root directory.
///
/// Returned paths are relative to the root, so they stay valid if the upload
/// directory is moved.
#[derive(Clone, Debug)]
pub struct LocalReceiptStorage {
    root: PathBuf,
}

impl LocalReceiptStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(RaceError::StorageFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("receipt path {} is not inside the upload directory", relative.display()),
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ReceiptStorage for LocalReceiptStorage {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let target = self.resolve(name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(RaceError::StorageFailure)?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(RaceError::StorageFailure)?;
        Ok(name.to_string())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        fs::remove_file(target)
            .await
            .map_err(RaceError::StorageFailure)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut found = Vec::new();
        if !fs::try_exists(&self.root)
            .await
            .map_err(RaceError::StorageFailure)?
        {
            return Ok(found);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(RaceError::StorageFailure)?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(RaceError::StorageFailure)?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(RaceError::StorageFailure)?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    found.push(parts.join("/"));
                }
            }
        }
        found.sort();
        Ok(found)
    }
}
