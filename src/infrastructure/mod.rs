pub mod in_memory;
pub mod local_fs;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
