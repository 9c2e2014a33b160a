//! Layout of the derived public/private stores.
//!
//! Both stores namespace their entries by cluster id, so every entry for a
//! cluster can be enumerated and removed by namespace alone.

use crate::store::{ConfigStore, EntryCache, EntryKey, StoreError};

pub const CONFIG_NAME: &str = "config.smb";
pub const CONFIG_OVERRIDE_NAME: &str = "config.smb.override";
pub const SPEC_BACKUP_NAME: &str = "spec.smb";
pub const CLUSTER_INFO_NAME: &str = "cluster-info";

const JOIN_SOURCE_PREFIX: &str = "join.";
const USERS_GROUPS_PREFIX: &str = "users-and-groups.";
const SOURCE_SUFFIX: &str = ".json";

/// Key of the generated configuration document.
pub fn config_key(cluster_id: &str) -> EntryKey {
    EntryKey::new(cluster_id, CONFIG_NAME)
}

/// Key of the hand-placed override configuration, which wins over the
/// generated one when present.
pub fn config_override_key(cluster_id: &str) -> EntryKey {
    EntryKey::new(cluster_id, CONFIG_OVERRIDE_NAME)
}

/// Key of the backup copy of the submitted service spec.
pub fn spec_backup_key(cluster_id: &str) -> EntryKey {
    EntryKey::new(cluster_id, SPEC_BACKUP_NAME)
}

/// Key of the per-cluster sync bookkeeping entry.
pub fn cluster_info_key(cluster_id: &str) -> EntryKey {
    EntryKey::new(cluster_id, CLUSTER_INFO_NAME)
}

/// Key of the nth join-credential entry in the private store.
pub fn join_source_key(cluster_id: &str, index: usize) -> EntryKey {
    EntryKey::new(
        cluster_id,
        format!("{}{}{}", JOIN_SOURCE_PREFIX, index, SOURCE_SUFFIX),
    )
}

/// Key of the nth user/group entry in the private store.
pub fn users_groups_source_key(cluster_id: &str, index: usize) -> EntryKey {
    EntryKey::new(
        cluster_id,
        format!("{}{}{}", USERS_GROUPS_PREFIX, index, SOURCE_SUFFIX),
    )
}

fn indexed_names(names: Vec<String>, prefix: &str) -> Vec<String> {
    let mut indexed: Vec<(usize, String)> = names
        .into_iter()
        .filter_map(|name| {
            let index = name
                .strip_prefix(prefix)?
                .strip_suffix(SOURCE_SUFFIX)?
                .parse::<usize>()
                .ok()?;
            Some((index, name))
        })
        .collect();
    indexed.sort();
    indexed.into_iter().map(|(_, name)| name).collect()
}

/// Join-credential entry names among `names`, in index order.
pub fn join_source_names(names: Vec<String>) -> Vec<String> {
    indexed_names(names, JOIN_SOURCE_PREFIX)
}

/// User/group entry names among `names`, in index order.
pub fn users_groups_source_names(names: Vec<String>) -> Vec<String> {
    indexed_names(names, USERS_GROUPS_PREFIX)
}

/// Cluster ids present in either external store.
pub fn stored_cluster_ids(
    public: &dyn ConfigStore,
    private: &dyn ConfigStore,
) -> Result<Vec<String>, StoreError> {
    let mut ids = public.namespaces()?;
    ids.extend(private.namespaces()?);
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Delete every entry a store holds for one cluster.
pub fn rm_cluster(store: &dyn ConfigStore, cluster_id: &str) -> Result<(), StoreError> {
    for name in store.contents(cluster_id)? {
        store.delete(&EntryKey::new(cluster_id, name))?;
    }
    Ok(())
}

/// Delete entries under the cluster's namespace that this sync pass did
/// not touch — leftovers of a previous, larger configuration.
pub fn rm_other_in_ns(
    store: &dyn ConfigStore,
    cluster_id: &str,
    touched: &EntryCache,
) -> Result<(), StoreError> {
    for name in store.contents(cluster_id)? {
        let key = EntryKey::new(cluster_id, name);
        if !touched.contains_key(&key) {
            tracing::debug!(key = %key, "removing stale external entry");
            store.delete(&key)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CachedEntry, MemConfigStore};
    use serde_json::json;

    #[test]
    fn test_key_names() {
        assert_eq!(config_key("c1").name, "config.smb");
        assert_eq!(config_override_key("c1").name, "config.smb.override");
        assert_eq!(spec_backup_key("c1").name, "spec.smb");
        assert_eq!(cluster_info_key("c1").name, "cluster-info");
        assert_eq!(join_source_key("c1", 0).name, "join.0.json");
        assert_eq!(users_groups_source_key("c1", 2).name, "users-and-groups.2.json");
        assert_eq!(config_key("c1").ns, "c1");
    }

    #[test]
    fn test_join_source_names_sorted_by_index() {
        let names = vec![
            "join.10.json".to_string(),
            "join.2.json".to_string(),
            "config.smb".to_string(),
            "users-and-groups.0.json".to_string(),
            "join.0.json".to_string(),
        ];
        assert_eq!(
            join_source_names(names),
            vec!["join.0.json", "join.2.json", "join.10.json"]
        );
    }

    #[test]
    fn test_users_groups_source_names() {
        let names = vec![
            "users-and-groups.1.json".to_string(),
            "join.0.json".to_string(),
            "users-and-groups.0.json".to_string(),
            "users-and-groups.x.json".to_string(),
        ];
        assert_eq!(
            users_groups_source_names(names),
            vec!["users-and-groups.0.json", "users-and-groups.1.json"]
        );
    }

    #[test]
    fn test_stored_cluster_ids_union() {
        let public = MemConfigStore::new();
        let private = MemConfigStore::new();
        public.set(&config_key("c1"), json!({})).unwrap();
        public.set(&config_key("c2"), json!({})).unwrap();
        private.set(&join_source_key("c2", 0), json!({})).unwrap();
        private.set(&join_source_key("c3", 0), json!({})).unwrap();
        assert_eq!(
            stored_cluster_ids(&public, &private).unwrap(),
            vec!["c1", "c2", "c3"]
        );
    }

    #[test]
    fn test_rm_cluster_clears_namespace() {
        let store = MemConfigStore::new();
        store.set(&config_key("c1"), json!({})).unwrap();
        store.set(&spec_backup_key("c1"), json!({})).unwrap();
        store.set(&config_key("c2"), json!({})).unwrap();
        rm_cluster(&store, "c1").unwrap();
        assert!(store.contents("c1").unwrap().is_empty());
        assert_eq!(store.contents("c2").unwrap().len(), 1);
    }

    #[test]
    fn test_rm_other_in_ns_keeps_touched() {
        let store = MemConfigStore::new();
        store.set(&join_source_key("c1", 0), json!({})).unwrap();
        store.set(&join_source_key("c1", 1), json!({})).unwrap();
        let mut touched = EntryCache::new();
        touched.insert(CachedEntry {
            key: join_source_key("c1", 0),
            uri: "mem:c1/join.0.json".to_string(),
            value: json!({}),
        });
        rm_other_in_ns(&store, "c1", &touched).unwrap();
        assert!(store.exists(&join_source_key("c1", 0)).unwrap());
        assert!(!store.exists(&join_source_key("c1", 1)).unwrap());
    }
}
