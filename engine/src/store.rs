//! Key-value backing store for the index and the published snapshot.
//!
//! The engine only relies on atomic get/set, prefix scans, and batched
//! deletes, so the store stays swappable. The default implementation sits
//! on sled; `MemoryStore` backs the tests.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{EngineError, Result};

/// Key layout. Term postings, category/brand sets, and doc lengths each live
/// under their own prefix so a rebuild can clear them with a prefix scan.
pub mod keys {
    pub const META_COUNT: &str = "meta:count";
    pub const META_AVG_LEN: &str = "meta:avg_len";
    pub const META_LAST_SYNC: &str = "meta:last_sync";
    pub const SNAPSHOT_IDS: &str = "snap:ids";

    pub const TERM_PREFIX: &str = "term:";
    pub const CATEGORY_PREFIX: &str = "cat:";
    pub const BRAND_PREFIX: &str = "brand:";
    pub const DOCLEN_PREFIX: &str = "len:";
    pub const PRODUCT_PREFIX: &str = "prod:";

    pub fn term(t: &str) -> String {
        format!("{TERM_PREFIX}{t}")
    }
    pub fn category(c: &str) -> String {
        format!("{CATEGORY_PREFIX}{c}")
    }
    pub fn brand(b: &str) -> String {
        format!("{BRAND_PREFIX}{b}")
    }
    pub fn doc_len(id: &str) -> String {
        format!("{DOCLEN_PREFIX}{id}")
    }
    pub fn product(id: &str) -> String {
        format!("{PRODUCT_PREFIX}{id}")
    }
}

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// All keys under a prefix, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
    /// Remove a batch of keys as one write.
    fn remove_batch(&self, keys: &[String]) -> Result<()>;
    /// Make prior writes durable.
    fn flush(&self) -> Result<()>;
}

/// Typed helpers shared by all store implementations.
pub fn get_value<T: serde::de::DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key)? {
        None => Ok(None),
        Some(bytes) => bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| EngineError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
    }
}

pub fn set_value<T: serde::Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    store.set(key, bincode::serialize(value)?)
}

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| EngineError::Configuration(format!("cannot open store at {path}: {e}")))?;
        Ok(Self { db })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (k, _) = item?;
            out.push(String::from_utf8_lossy(&k).into_owned());
        }
        Ok(out)
    }

    fn remove_batch(&self, keys: &[String]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for key in keys {
            batch.remove(key.as_str());
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-process store used by unit and integration tests.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.map.write().insert(key.to_string(), value);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .map
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn remove_batch(&self, keys: &[String]) -> Result<()> {
        let mut map = self.map.write();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip_and_prefix_scan() {
        let store = MemoryStore::new();
        set_value(&store, &keys::term("sampon"), &7u32).unwrap();
        set_value(&store, &keys::term("krem"), &3u32).unwrap();
        set_value(&store, keys::META_COUNT, &2u64).unwrap();

        let n: Option<u32> = get_value(&store, &keys::term("sampon")).unwrap();
        assert_eq!(n, Some(7));

        let mut terms = store.scan_prefix(keys::TERM_PREFIX).unwrap();
        terms.sort();
        assert_eq!(terms, vec![keys::term("krem"), keys::term("sampon")]);

        store.remove_batch(&terms).unwrap();
        assert!(store.scan_prefix(keys::TERM_PREFIX).unwrap().is_empty());
        let count: Option<u64> = get_value(&store, keys::META_COUNT).unwrap();
        assert_eq!(count, Some(2));
    }
}
