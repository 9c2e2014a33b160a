//! Config store contract and in-memory implementation.
//!
//! Three store instances back the handler: the authoritative internal
//! store and the derived public/private stores. The trait abstracts over
//! the backend (file, in-memory, cluster-backed); the in-memory store here
//! is used by tests and defaults, production backends live elsewhere.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use thiserror::Error;

/// Composite key addressing one entry: a namespace plus a name.
///
/// The internal store namespaces by resource kind; the external stores
/// namespace by cluster id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    pub ns: String,
    pub name: String,
}

impl EntryKey {
    pub fn new(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ns: ns.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ns, self.name)
    }
}

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entry does not exist.
    #[error("entry not found: {ns}/{name}")]
    NotFound { ns: String, name: String },
    /// Any backend-level failure (I/O, lock poisoning, remote errors).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(key: &EntryKey) -> Self {
        StoreError::NotFound {
            ns: key.ns.clone(),
            name: key.name.clone(),
        }
    }

    /// True when the error is a missing-entry condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A transactional key/value mapping of JSON-serializable entries.
///
/// Transaction hooks default to no-ops so backends without transaction
/// support satisfy the contract unchanged; `Transaction` wraps the hooks
/// in a guard that rolls back on drop.
pub trait ConfigStore: Send + Sync {
    /// Fetch an entry. Missing entries are a `StoreError::NotFound`.
    fn get(&self, key: &EntryKey) -> Result<serde_json::Value, StoreError>;

    /// Write an entry, overwriting any existing value.
    fn set(&self, key: &EntryKey, value: serde_json::Value) -> Result<(), StoreError>;

    /// True if the entry exists.
    fn exists(&self, key: &EntryKey) -> Result<bool, StoreError>;

    /// Delete an entry. Deleting a missing entry is not an error.
    fn delete(&self, key: &EntryKey) -> Result<(), StoreError>;

    /// All namespaces currently holding at least one entry.
    fn namespaces(&self) -> Result<Vec<String>, StoreError>;

    /// Entry names within one namespace, sorted.
    fn contents(&self, ns: &str) -> Result<Vec<String>, StoreError>;

    /// Location identifier for cross-process consumption of an entry.
    fn uri(&self, key: &EntryKey) -> String;

    /// True when the backend provides real transaction semantics.
    fn supports_transactions(&self) -> bool {
        false
    }

    fn tx_begin(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn tx_commit(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn tx_rollback(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Scoped transaction over one store.
///
/// Rolls back on drop unless `commit` was called. For stores without
/// transaction support every operation is a no-op.
pub struct Transaction<'a> {
    store: &'a dyn ConfigStore,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn ConfigStore) -> Result<Self, StoreError> {
        if store.supports_transactions() {
            tracing::debug!("using store transaction");
        } else {
            tracing::debug!("no transaction support for store");
        }
        store.tx_begin()?;
        Ok(Self {
            store,
            committed: false,
        })
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        self.committed = true;
        self.store.tx_commit()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = self.store.tx_rollback() {
                tracing::error!("store transaction rollback failed: {}", err);
            }
        }
    }
}

/// In-memory store backed by a BTreeMap. Thread-safe via RwLock.
///
/// Supports transactions by snapshotting the map on begin and restoring
/// it on rollback. Does not persist across restarts.
pub struct MemConfigStore {
    prefix: String,
    data: RwLock<BTreeMap<EntryKey, serde_json::Value>>,
    snapshot: Mutex<Option<BTreeMap<EntryKey, serde_json::Value>>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::with_prefix("mem")
    }

    /// A store whose entry URIs are prefixed with `prefix:`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            data: RwLock::new(BTreeMap::new()),
            snapshot: Mutex::new(None),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<EntryKey, serde_json::Value>>, StoreError> {
        self.data
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<EntryKey, serde_json::Value>>, StoreError> {
        self.data
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl Default for MemConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemConfigStore {
    fn get(&self, key: &EntryKey) -> Result<serde_json::Value, StoreError> {
        let data = self.read()?;
        data.get(key).cloned().ok_or_else(|| StoreError::not_found(key))
    }

    fn set(&self, key: &EntryKey, value: serde_json::Value) -> Result<(), StoreError> {
        let mut data = self.write()?;
        data.insert(key.clone(), value);
        Ok(())
    }

    fn exists(&self, key: &EntryKey) -> Result<bool, StoreError> {
        let data = self.read()?;
        Ok(data.contains_key(key))
    }

    fn delete(&self, key: &EntryKey) -> Result<(), StoreError> {
        let mut data = self.write()?;
        data.remove(key);
        Ok(())
    }

    fn namespaces(&self) -> Result<Vec<String>, StoreError> {
        let data = self.read()?;
        let mut out: Vec<String> = data.keys().map(|k| k.ns.clone()).collect();
        out.dedup();
        Ok(out)
    }

    fn contents(&self, ns: &str) -> Result<Vec<String>, StoreError> {
        let data = self.read()?;
        Ok(data
            .keys()
            .filter(|k| k.ns == ns)
            .map(|k| k.name.clone())
            .collect())
    }

    fn uri(&self, key: &EntryKey) -> String {
        format!("{}:{}/{}", self.prefix, key.ns, key.name)
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn tx_begin(&self) -> Result<(), StoreError> {
        let mut snap = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if snap.is_some() {
            return Err(StoreError::Backend(
                "transaction already in progress".to_string(),
            ));
        }
        *snap = Some(self.read()?.clone());
        Ok(())
    }

    fn tx_commit(&self) -> Result<(), StoreError> {
        let mut snap = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        *snap = None;
        Ok(())
    }

    fn tx_rollback(&self) -> Result<(), StoreError> {
        let mut snap = self
            .snapshot
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(prev) = snap.take() {
            *self.write()? = prev;
        }
        Ok(())
    }
}

/// An entry written (or observed) during one sync pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub key: EntryKey,
    pub uri: String,
    pub value: serde_json::Value,
}

/// Write-cache of the entries touched during one sync pass.
///
/// Used afterwards to garbage-collect untouched entries and to assemble
/// the service spec without re-reading the stores.
#[derive(Debug, Clone, Default)]
pub struct EntryCache {
    entries: BTreeMap<EntryKey, CachedEntry>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CachedEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &EntryKey) -> Option<&CachedEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &EntryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntryKey> {
        self.entries.keys()
    }

    /// Entry names cached under one namespace, sorted.
    pub fn names_in_ns(&self, ns: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|k| k.ns == ns)
            .map(|k| k.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A reference to a store entry used when assembling the service spec:
/// its URI and whether the entry exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    pub uri: String,
    pub exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(ns: &str, name: &str) -> EntryKey {
        EntryKey::new(ns, name)
    }

    #[test]
    fn test_set_get() {
        let store = MemConfigStore::new();
        store.set(&key("c1", "config"), json!({"a": 1})).unwrap();
        assert_eq!(store.get(&key("c1", "config")).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = MemConfigStore::new();
        let err = store.get(&key("c1", "config")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_exists_and_delete() {
        let store = MemConfigStore::new();
        store.set(&key("c1", "config"), json!(1)).unwrap();
        assert!(store.exists(&key("c1", "config")).unwrap());
        store.delete(&key("c1", "config")).unwrap();
        assert!(!store.exists(&key("c1", "config")).unwrap());
        // deleting again is fine
        store.delete(&key("c1", "config")).unwrap();
    }

    #[test]
    fn test_namespaces_and_contents_sorted() {
        let store = MemConfigStore::new();
        store.set(&key("c2", "b"), json!(1)).unwrap();
        store.set(&key("c1", "z"), json!(1)).unwrap();
        store.set(&key("c1", "a"), json!(1)).unwrap();
        assert_eq!(store.namespaces().unwrap(), vec!["c1", "c2"]);
        assert_eq!(store.contents("c1").unwrap(), vec!["a", "z"]);
        assert!(store.contents("c3").unwrap().is_empty());
    }

    #[test]
    fn test_uri_prefix() {
        let store = MemConfigStore::with_prefix("rados");
        assert_eq!(store.uri(&key("c1", "config.smb")), "rados:c1/config.smb");
    }

    #[test]
    fn test_transaction_commit_keeps_writes() {
        let store = MemConfigStore::new();
        let tx = Transaction::begin(&store).unwrap();
        store.set(&key("c1", "a"), json!(1)).unwrap();
        tx.commit().unwrap();
        assert!(store.exists(&key("c1", "a")).unwrap());
    }

    #[test]
    fn test_transaction_rollback_on_drop() {
        let store = MemConfigStore::new();
        store.set(&key("c1", "kept"), json!(0)).unwrap();
        {
            let _tx = Transaction::begin(&store).unwrap();
            store.set(&key("c1", "a"), json!(1)).unwrap();
            store.delete(&key("c1", "kept")).unwrap();
            // dropped without commit
        }
        assert!(!store.exists(&key("c1", "a")).unwrap());
        assert!(store.exists(&key("c1", "kept")).unwrap());
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let store = MemConfigStore::new();
        let _tx = Transaction::begin(&store).unwrap();
        assert!(store.tx_begin().is_err());
    }

    #[test]
    fn test_entry_cache_tracks_namespaced_names() {
        let mut cache = EntryCache::new();
        cache.insert(CachedEntry {
            key: key("c1", "join.0.json"),
            uri: "mem:c1/join.0.json".to_string(),
            value: json!({}),
        });
        cache.insert(CachedEntry {
            key: key("c1", "config.smb"),
            uri: "mem:c1/config.smb".to_string(),
            value: json!({}),
        });
        cache.insert(CachedEntry {
            key: key("c2", "config.smb"),
            uri: "mem:c2/config.smb".to_string(),
            value: json!({}),
        });
        assert_eq!(cache.names_in_ns("c1"), vec!["config.smb", "join.0.json"]);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains_key(&key("c2", "config.smb")));
    }
}
