//! Staging overlay and cross-resource validation for one `apply` batch.
//!
//! Staged resources live in an overlay over the internal store; nothing is
//! written until the whole batch validates. Staged lookups consult the
//! overlay first, so a resource may reference another resource created (or
//! hidden by a tombstone) in the same batch.

use crate::collaborators::{EarmarkResolver, PathResolver};
use crate::enums::State;
use crate::error::ConfigError;
use crate::internal;
use crate::resources::{Cluster, JoinAuth, Resource, Share, UsersAndGroups, ValidationError};
use crate::results::{ResourceResult, ResultGroup};
use crate::store::{ConfigStore, StoreError};

/// Top-level earmark scope claimed for share paths.
pub const EARMARK_SCOPE: &str = "smb";

/// Sort a batch so references map out cleanly: removals of finer-grained
/// resources first, creations of coarser resources before finer ones.
pub fn order_resources(resources: Vec<Resource>) -> Vec<Resource> {
    let mut ordered = resources;
    ordered.sort_by_key(|r| match r {
        Resource::RemovedShare(_) => -2,
        Resource::RemovedCluster(_) => -1,
        Resource::JoinAuth(_) | Resource::UsersAndGroups(_) => 0,
        Resource::Cluster(_) => 1,
        Resource::Share(_) => 2,
    });
    ordered
}

/// Overlay of staged resources over the internal store.
pub struct Staging<'a> {
    store: &'a dyn ConfigStore,
    incoming: Vec<Resource>,
}

impl<'a> Staging<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self {
            store,
            incoming: Vec::new(),
        }
    }

    /// Stage one resource. A later stage of the same identity replaces the
    /// earlier one.
    pub fn stage(&mut self, resource: Resource) {
        let key = internal::resource_key(&resource);
        self.incoming.retain(|r| internal::resource_key(r) != key);
        tracing::debug!(resource = %resource.describe(), "staging resource");
        self.incoming.push(resource);
    }

    /// The staged batch in staging order.
    pub fn staged(&self) -> &[Resource] {
        &self.incoming
    }

    /// True when no resource with the same identity exists in the store.
    pub fn is_new(&self, resource: &Resource) -> Result<bool, StoreError> {
        Ok(!self.store.exists(&internal::resource_key(resource))?)
    }

    /// Cluster as visible to this batch: staged version first (a staged
    /// tombstone hides the stored resource), then the store.
    pub fn get_cluster(&self, cluster_id: &str) -> Result<Option<Cluster>, ConfigError> {
        for r in &self.incoming {
            match r {
                Resource::Cluster(c) if c.cluster_id == cluster_id => {
                    return Ok(Some(c.clone()))
                }
                Resource::RemovedCluster(c) if c.cluster_id == cluster_id => {
                    return Ok(None)
                }
                _ => {}
            }
        }
        internal::load_cluster(self.store, cluster_id)
    }

    pub fn get_join_auth(&self, auth_id: &str) -> Result<Option<JoinAuth>, ConfigError> {
        for r in &self.incoming {
            if let Resource::JoinAuth(a) = r {
                if a.auth_id == auth_id {
                    return Ok(Some(a.clone()));
                }
            }
        }
        internal::load_join_auth(self.store, auth_id)
    }

    pub fn get_users_and_groups(
        &self,
        users_groups_id: &str,
    ) -> Result<Option<UsersAndGroups>, ConfigError> {
        for r in &self.incoming {
            if let Resource::UsersAndGroups(u) = r {
                if u.users_groups_id == users_groups_id {
                    return Ok(Some(u.clone()));
                }
            }
        }
        internal::load_users_and_groups(self.store, users_groups_id)
    }

    /// Commit the overlay to the store, reporting the transition state of
    /// every staged resource.
    pub fn save(&self) -> Result<ResultGroup, ConfigError> {
        let mut results = ResultGroup::new();
        for resource in &self.incoming {
            let key = internal::resource_key(resource);
            let state = if resource.is_tombstone() {
                if self.store.exists(&key)? {
                    self.store.delete(&key)?;
                    State::Removed
                } else {
                    State::NotPresent
                }
            } else {
                let new_value = serde_json::to_value(resource)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                match self.store.get(&key) {
                    Ok(old_value) if old_value == new_value => State::Present,
                    Ok(_) => {
                        self.store.set(&key, new_value)?;
                        State::Updated
                    }
                    Err(err) if err.is_not_found() => {
                        self.store.set(&key, new_value)?;
                        State::Created
                    }
                    Err(err) => return Err(err.into()),
                }
            };
            tracing::debug!(resource = %resource.describe(), state = ?state, "saved resource");
            results.push(ResourceResult::committed(resource.clone(), state));
        }
        Ok(results)
    }

    /// Remove entries left dangling by removed clusters: their shares and
    /// any credential resources linked to them.
    pub fn prune_linked_entries(&self) -> Result<(), ConfigError> {
        for resource in &self.incoming {
            let cluster_id = match resource {
                Resource::RemovedCluster(c) => &c.cluster_id,
                _ => continue,
            };
            for (cid, sid) in internal::share_ids(self.store)? {
                if cid == *cluster_id {
                    tracing::debug!(cluster_id = %cid, share_id = %sid, "pruning orphaned share");
                    self.store.delete(&internal::share_key(&cid, &sid))?;
                }
            }
            for auth_id in internal::join_auth_ids(self.store)? {
                if let Some(auth) = internal::load_join_auth(self.store, &auth_id)? {
                    if auth.linked_to_cluster.as_deref() == Some(cluster_id) {
                        tracing::debug!(auth_id = %auth_id, "pruning linked join auth");
                        self.store.delete(&internal::join_auth_key(&auth_id))?;
                    }
                }
            }
            for ug_id in internal::users_groups_ids(self.store)? {
                if let Some(ug) = internal::load_users_and_groups(self.store, &ug_id)? {
                    if ug.linked_to_cluster.as_deref() == Some(cluster_id) {
                        tracing::debug!(users_groups_id = %ug_id, "pruning linked users-and-groups");
                        self.store.delete(&internal::users_groups_key(&ug_id))?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Validate one staged resource against the staged view of the world.
///
/// Validation failures come back as `ConfigError::Validation`; any other
/// error variant is an unexpected failure of the store or a collaborator.
pub fn cross_check_resource(
    resource: &Resource,
    staging: &Staging<'_>,
    path_resolver: &dyn PathResolver,
    earmark_resolver: &dyn EarmarkResolver,
) -> Result<(), ConfigError> {
    resource.validate()?;
    match resource {
        Resource::Cluster(c) => check_cluster(c, staging),
        Resource::Share(s) => check_share(s, staging, path_resolver, earmark_resolver),
        Resource::JoinAuth(a) => {
            check_linked_cluster(staging, a.linked_to_cluster.as_deref(), resource)
        }
        Resource::UsersAndGroups(u) => {
            check_linked_cluster(staging, u.linked_to_cluster.as_deref(), resource)
        }
        Resource::RemovedCluster(_) | Resource::RemovedShare(_) => Ok(()),
    }
}

fn check_cluster(cluster: &Cluster, staging: &Staging<'_>) -> Result<(), ConfigError> {
    for auth_id in cluster.join_auth_refs() {
        let auth = staging
            .get_join_auth(&auth_id)?
            .ok_or(ValidationError::MissingJoinAuth {
                auth_id: auth_id.clone(),
            })?;
        if let Some(linked) = &auth.linked_to_cluster {
            if *linked != cluster.cluster_id {
                return Err(ValidationError::LinkedClusterMismatch {
                    resource: format!("join-auth.{}", auth_id),
                    linked_to: linked.clone(),
                    cluster_id: cluster.cluster_id.clone(),
                }
                .into());
            }
        }
    }
    for ug_id in cluster.users_groups_refs() {
        let ug = staging.get_users_and_groups(&ug_id)?.ok_or(
            ValidationError::MissingUsersAndGroups {
                users_groups_id: ug_id.clone(),
            },
        )?;
        if let Some(linked) = &ug.linked_to_cluster {
            if *linked != cluster.cluster_id {
                return Err(ValidationError::LinkedClusterMismatch {
                    resource: format!("users-groups.{}", ug_id),
                    linked_to: linked.clone(),
                    cluster_id: cluster.cluster_id.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn check_share(
    share: &Share,
    staging: &Staging<'_>,
    path_resolver: &dyn PathResolver,
    earmark_resolver: &dyn EarmarkResolver,
) -> Result<(), ConfigError> {
    if staging.get_cluster(&share.cluster_id)?.is_none() {
        return Err(ValidationError::MissingCluster {
            cluster_id: share.cluster_id.clone(),
        }
        .into());
    }
    let storage = share.checked_storage()?;
    let resolved = path_resolver
        .resolve(
            &storage.volume,
            &storage.subvolumegroup,
            &storage.subvolume,
            &storage.path,
        )
        .map_err(|e| ValidationError::PathResolution {
            volume: storage.volume.clone(),
            reason: e.to_string(),
        })?;
    if !storage.subvolume.is_empty() {
        match earmark_resolver.get_earmark(&storage.volume, &resolved)? {
            Some(earmark) if !earmark_resolver.check_earmark(&earmark, EARMARK_SCOPE) => {
                return Err(ValidationError::EarmarkConflict {
                    volume: storage.volume.clone(),
                    path: resolved,
                    earmark,
                }
                .into());
            }
            Some(_) => {}
            None => {
                let earmark = format!("{}.cluster.{}", EARMARK_SCOPE, share.cluster_id);
                earmark_resolver.set_earmark(&storage.volume, &resolved, &earmark)?;
            }
        }
    }
    Ok(())
}

fn check_linked_cluster(
    staging: &Staging<'_>,
    linked_to_cluster: Option<&str>,
    resource: &Resource,
) -> Result<(), ConfigError> {
    if let Some(cluster_id) = linked_to_cluster {
        if staging.get_cluster(cluster_id)?.is_none() {
            tracing::debug!(
                resource = %resource.describe(),
                cluster_id = %cluster_id,
                "linked cluster not found"
            );
            return Err(ValidationError::MissingCluster {
                cluster_id: cluster_id.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
