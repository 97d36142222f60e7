//! Persistent key-value storage
//!
//! The client keeps its session (tokens, user, blacklist, recovery snapshot)
//! in a string key-value store. [`StorageAdapter`] layers the browser fallback
//! behaviour on top of any [`KeyValueStore`] backend.

pub mod adapter;
pub mod file;
pub mod keys;
pub mod memory;

pub use adapter::StorageAdapter;
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::ClientError;

/// A string key-value backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    fn remove(&self, key: &str) -> Result<(), ClientError>;
}
