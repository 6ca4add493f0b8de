use crate::application::engine::{DEFAULT_MAX_RECEIPT_BYTES, RaceDesk};
use crate::domain::ports::Stores;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryStore;
use crate::infrastructure::local_fs::LocalReceiptStorage;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Runtime settings gathered from the command line and environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Persistent database location. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub upload_dir: PathBuf,
    pub max_receipt_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_receipt_bytes: DEFAULT_MAX_RECEIPT_BYTES,
        }
    }
}

impl Settings {
    /// Opens the record stores once for the whole process.
    pub fn open_stores(&self) -> Result<Stores> {
        match &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => {
                let store = crate::infrastructure::rocksdb::RocksDBStore::open(path)?;
                info!(path = %path.display(), "using RocksDB storage");
                Ok(Stores::from_backend(store))
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "--db-path ignored: built without the storage-rocksdb feature, using in-memory storage"
                );
                Ok(Stores::from_backend(InMemoryStore::new()))
            }
            None => Ok(Stores::from_backend(InMemoryStore::new())),
        }
    }

    pub fn build_desk(&self) -> Result<RaceDesk> {
        let stores = self.open_stores()?;
        let receipts = LocalReceiptStorage::new(&self.upload_dir);
        info!(upload_dir = %self.upload_dir.display(), "receipt storage ready");
        Ok(RaceDesk::new(stores, Box::new(receipts)).with_max_receipt_bytes(self.max_receipt_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::tests::pickup_form;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.db_path.is_none());
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
        assert_eq!(settings.max_receipt_bytes, 5 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_build_desk_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            upload_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let desk = settings.build_desk().unwrap();
        let registration = desk.register(pickup_form("a@example.com")).await.unwrap();
        assert_eq!(registration.id, 1);
    }
}
