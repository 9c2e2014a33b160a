//! Layout of the authoritative internal store.
//!
//! Resources are namespaced by kind; shares use a composite
//! `<cluster_id>.<share_id>` entry name (ids never contain dots).

use crate::error::ConfigError;
use crate::resources::{Cluster, JoinAuth, Resource, Share, UsersAndGroups};
use crate::store::{ConfigStore, EntryKey, StoreError};

pub const CLUSTERS_NS: &str = "clusters";
pub const SHARES_NS: &str = "shares";
pub const JOIN_AUTHS_NS: &str = "join-auths";
pub const USERS_GROUPS_NS: &str = "users-groups";

pub fn cluster_key(cluster_id: &str) -> EntryKey {
    EntryKey::new(CLUSTERS_NS, cluster_id)
}

pub fn share_key(cluster_id: &str, share_id: &str) -> EntryKey {
    EntryKey::new(SHARES_NS, format!("{}.{}", cluster_id, share_id))
}

pub fn join_auth_key(auth_id: &str) -> EntryKey {
    EntryKey::new(JOIN_AUTHS_NS, auth_id)
}

pub fn users_groups_key(users_groups_id: &str) -> EntryKey {
    EntryKey::new(USERS_GROUPS_NS, users_groups_id)
}

/// Internal-store key for any resource; tombstones key the entry they remove.
pub fn resource_key(resource: &Resource) -> EntryKey {
    match resource {
        Resource::Cluster(c) => cluster_key(&c.cluster_id),
        Resource::RemovedCluster(c) => cluster_key(&c.cluster_id),
        Resource::Share(s) => share_key(&s.cluster_id, &s.share_id),
        Resource::RemovedShare(s) => share_key(&s.cluster_id, &s.share_id),
        Resource::JoinAuth(a) => join_auth_key(&a.auth_id),
        Resource::UsersAndGroups(u) => users_groups_key(&u.users_groups_id),
    }
}

pub fn cluster_ids(store: &dyn ConfigStore) -> Result<Vec<String>, StoreError> {
    store.contents(CLUSTERS_NS)
}

pub fn join_auth_ids(store: &dyn ConfigStore) -> Result<Vec<String>, StoreError> {
    store.contents(JOIN_AUTHS_NS)
}

pub fn users_groups_ids(store: &dyn ConfigStore) -> Result<Vec<String>, StoreError> {
    store.contents(USERS_GROUPS_NS)
}

/// `(cluster_id, share_id)` pairs for every stored share.
pub fn share_ids(store: &dyn ConfigStore) -> Result<Vec<(String, String)>, ConfigError> {
    let mut out = Vec::new();
    for name in store.contents(SHARES_NS)? {
        let mut parts = name.splitn(2, '.');
        match (parts.next(), parts.next()) {
            (Some(cluster_id), Some(share_id)) if !share_id.is_empty() => {
                out.push((cluster_id.to_string(), share_id.to_string()));
            }
            _ => {
                return Err(ConfigError::MalformedEntry {
                    ns: SHARES_NS.to_string(),
                    name: name.clone(),
                    reason: "expected <cluster_id>.<share_id>".to_string(),
                })
            }
        }
    }
    Ok(out)
}

fn load_resource(
    store: &dyn ConfigStore,
    key: &EntryKey,
) -> Result<Option<Resource>, ConfigError> {
    let value = match store.get(key) {
        Ok(value) => value,
        Err(err) if err.is_not_found() => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ConfigError::MalformedEntry {
            ns: key.ns.clone(),
            name: key.name.clone(),
            reason: e.to_string(),
        })
}

fn malformed(key: &EntryKey, reason: &str) -> ConfigError {
    ConfigError::MalformedEntry {
        ns: key.ns.clone(),
        name: key.name.clone(),
        reason: reason.to_string(),
    }
}

pub fn load_cluster(
    store: &dyn ConfigStore,
    cluster_id: &str,
) -> Result<Option<Cluster>, ConfigError> {
    let key = cluster_key(cluster_id);
    match load_resource(store, &key)? {
        None => Ok(None),
        Some(Resource::Cluster(c)) => Ok(Some(c)),
        Some(_) => Err(malformed(&key, "expected a cluster resource")),
    }
}

pub fn load_share(
    store: &dyn ConfigStore,
    cluster_id: &str,
    share_id: &str,
) -> Result<Option<Share>, ConfigError> {
    let key = share_key(cluster_id, share_id);
    match load_resource(store, &key)? {
        None => Ok(None),
        Some(Resource::Share(s)) => Ok(Some(s)),
        Some(_) => Err(malformed(&key, "expected a share resource")),
    }
}

pub fn load_join_auth(
    store: &dyn ConfigStore,
    auth_id: &str,
) -> Result<Option<JoinAuth>, ConfigError> {
    let key = join_auth_key(auth_id);
    match load_resource(store, &key)? {
        None => Ok(None),
        Some(Resource::JoinAuth(a)) => Ok(Some(a)),
        Some(_) => Err(malformed(&key, "expected a join auth resource")),
    }
}

pub fn load_users_and_groups(
    store: &dyn ConfigStore,
    users_groups_id: &str,
) -> Result<Option<UsersAndGroups>, ConfigError> {
    let key = users_groups_key(users_groups_id);
    match load_resource(store, &key)? {
        None => Ok(None),
        Some(Resource::UsersAndGroups(u)) => Ok(Some(u)),
        Some(_) => Err(malformed(&key, "expected a users-and-groups resource")),
    }
}
