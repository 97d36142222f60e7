//! Storage adapter with browser fallback
//!
//! Writes always go to the native store. On the browser target they are also
//! mirrored to a fallback store, and reads that miss (or fail) on the native
//! store consult the fallback.

use super::KeyValueStore;
use crate::config::Platform;
use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct StorageAdapter {
    native: Arc<dyn KeyValueStore>,
    fallback: Option<Arc<dyn KeyValueStore>>,
}

impl StorageAdapter {
    /// Adapter over a single native store
    pub fn new(native: Arc<dyn KeyValueStore>) -> Self {
        Self {
            native,
            fallback: None,
        }
    }

    /// Adapter for the given platform; the fallback is only kept on the
    /// browser target
    pub fn for_platform(
        platform: Platform,
        native: Arc<dyn KeyValueStore>,
        fallback: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            native,
            fallback: platform.is_browser().then_some(fallback),
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        if let Err(e) = self.native.set(key, value) {
            error!(key, error = %e, "failed to write storage item");
            return Err(e);
        }

        if let Some(fallback) = &self.fallback {
            if let Err(e) = fallback.set(key, value) {
                warn!(key, error = %e, "failed to mirror storage item to fallback");
            }
        }

        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        let native = self.native.get(key);

        let Some(fallback) = &self.fallback else {
            return native;
        };

        match native {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "native storage read failed, trying fallback"),
        }

        match fallback.get(key) {
            Ok(value) => {
                if value.is_some() {
                    debug!(key, "storage item served from fallback");
                }
                Ok(value)
            }
            Err(e) => {
                warn!(key, error = %e, "fallback storage read failed");
                Ok(None)
            }
        }
    }

    pub fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        if let Err(e) = self.native.remove(key) {
            error!(key, error = %e, "failed to remove storage item");
            return Err(e);
        }

        if let Some(fallback) = &self.fallback {
            if let Err(e) = fallback.remove(key) {
                warn!(key, error = %e, "failed to remove storage item from fallback");
            }
        }

        Ok(())
    }

    pub fn set_object<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let json = serde_json::to_string(value)?;
        self.set_item(key, &json)
    }

    /// Read a JSON object. Malformed JSON is logged and treated as absent.
    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "ignoring malformed stored object");
                Ok(None)
            }
        }
    }

    /// Copy keys that exist only in the fallback store into the native store.
    /// Returns the number of keys copied.
    pub fn backfill_from_fallback(&self, keys: &[&str]) -> Result<usize, ClientError> {
        let Some(fallback) = &self.fallback else {
            return Ok(0);
        };

        let mut copied = 0;
        for key in keys {
            if matches!(self.native.get(key), Ok(Some(_))) {
                continue;
            }
            let value = match fallback.get(key) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "fallback read failed during backfill");
                    continue;
                }
            };
            self.native.set(key, &value)?;
            copied += 1;
        }

        if copied > 0 {
            debug!(copied, "backfilled native storage from fallback");
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    /// Store whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, ClientError> {
            Err(ClientError::Storage("unavailable".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), ClientError> {
            Err(ClientError::Storage("unavailable".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), ClientError> {
            Err(ClientError::Storage("unavailable".to_string()))
        }
    }

    fn web_adapter() -> (StorageAdapter, Arc<MemoryStore>, Arc<MemoryStore>) {
        let native = Arc::new(MemoryStore::new());
        let fallback = Arc::new(MemoryStore::new());
        let adapter = StorageAdapter::for_platform(
            Platform::Web,
            Arc::clone(&native) as Arc<dyn KeyValueStore>,
            Arc::clone(&fallback) as Arc<dyn KeyValueStore>,
        );
        (adapter, native, fallback)
    }

    #[test]
    fn test_web_writes_are_mirrored() {
        let (adapter, native, fallback) = web_adapter();
        adapter.set_item("k", "v").unwrap();

        assert_eq!(native.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(fallback.get("k").unwrap().as_deref(), Some("v"));

        adapter.remove_item("k").unwrap();
        assert!(native.is_empty());
        assert!(fallback.is_empty());
    }

    #[test]
    fn test_native_platform_ignores_fallback() {
        let native = Arc::new(MemoryStore::new());
        let fallback = Arc::new(MemoryStore::new());
        fallback.set("k", "stale").unwrap();

        let adapter = StorageAdapter::for_platform(
            Platform::Ios,
            Arc::clone(&native) as Arc<dyn KeyValueStore>,
            Arc::clone(&fallback) as Arc<dyn KeyValueStore>,
        );

        assert!(!adapter.has_fallback());
        assert_eq!(adapter.get_item("k").unwrap(), None);
        adapter.set_item("k", "v").unwrap();
        assert_eq!(fallback.get("k").unwrap().as_deref(), Some("stale"));
    }

    #[test]
    fn test_web_read_falls_back() {
        let (adapter, _native, fallback) = web_adapter();
        fallback.set("k", "from-local-storage").unwrap();
        assert_eq!(
            adapter.get_item("k").unwrap().as_deref(),
            Some("from-local-storage")
        );
    }

    #[test]
    fn test_web_read_survives_native_failure() {
        let fallback = Arc::new(MemoryStore::new());
        fallback.set("k", "v").unwrap();
        let adapter = StorageAdapter::for_platform(
            Platform::Web,
            Arc::new(BrokenStore),
            Arc::clone(&fallback) as Arc<dyn KeyValueStore>,
        );

        assert_eq!(adapter.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_write_failure_is_returned() {
        let adapter = StorageAdapter::new(Arc::new(BrokenStore));
        assert!(adapter.set_item("k", "v").is_err());
        assert!(adapter.get_item("k").is_err());
    }

    #[test]
    fn test_objects_and_malformed_json() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Thing {
            name: String,
        }

        let adapter = StorageAdapter::new(Arc::new(MemoryStore::new()));
        adapter
            .set_object(
                "thing",
                &Thing {
                    name: "pill".to_string(),
                },
            )
            .unwrap();
        assert_eq!(
            adapter.get_object::<Thing>("thing").unwrap(),
            Some(Thing {
                name: "pill".to_string()
            })
        );

        adapter.set_item("thing", "{broken").unwrap();
        assert_eq!(adapter.get_object::<Thing>("thing").unwrap(), None);
    }

    #[test]
    fn test_backfill_copies_missing_keys_only() {
        let (adapter, native, fallback) = web_adapter();
        fallback.set("a", "from-fallback").unwrap();
        fallback.set("b", "from-fallback").unwrap();
        native.set("b", "native").unwrap();

        let copied = adapter.backfill_from_fallback(&["a", "b", "c"]).unwrap();
        assert_eq!(copied, 1);
        assert_eq!(native.get("a").unwrap().as_deref(), Some("from-fallback"));
        assert_eq!(native.get("b").unwrap().as_deref(), Some("native"));
    }
}
