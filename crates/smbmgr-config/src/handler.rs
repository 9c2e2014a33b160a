//! The central handler for ingesting and reconciling configuration changes.
//!
//! `ClusterConfigHandler` works in three phases:
//! 1. Validation — staged resources are checked internally and against
//!    cross-resource consistency rules.
//! 2. Update — the internal store is updated to persist the new resources.
//! 3. Sync — internal resources are converted to externally usable data
//!    and external components are updated as needed.
//!
//! Three stores back the handler: the authoritative internal store, a
//! public store sharing non-sensitive configuration with other processes,
//! and a private store sharing sensitive material. The stores are allowed
//! to overlap; do not assume their keys are mutually exclusive.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::changes;
use crate::collaborators::{
    AccessAuthorizer, AuthorizerStub, EarmarkResolver, EarmarkResolverStub, OrchSubmitter,
    PathResolver, PathResolverStub,
};
use crate::enums::{AuthMode, JoinSourceType, ResourceType, UserGroupSourceType};
use crate::error::{ConfigError, Result};
use crate::external;
use crate::generate;
use crate::internal;
use crate::matcher::Matcher;
use crate::resources::{Cluster, JoinAuth, Resource, Share, UsersAndGroups, ValidationError};
use crate::results::{ResourceResult, ResultGroup};
use crate::spec::{generate_service_spec, SmbServiceSpec};
use crate::staging::{cross_check_resource, order_resources, Staging};
use crate::store::{CachedEntry, ConfigStore, EntryCache, EntryKey, EntryRef, Transaction};

/// Everything being modified for one cluster during a sync pass, plus a
/// write-cache of the entries touched so far. Owned by the call stack of
/// one `save_cluster_settings` invocation.
struct ClusterChangeGroup {
    cluster: Cluster,
    shares: Vec<Share>,
    join_auths: Vec<JoinAuth>,
    users_and_groups: Vec<UsersAndGroups>,
    cache: EntryCache,
}

/// Orchestrating façade over the three stores and the external
/// collaborators.
pub struct ClusterConfigHandler {
    internal_store: Arc<dyn ConfigStore>,
    public_store: Arc<dyn ConfigStore>,
    priv_store: Arc<dyn ConfigStore>,
    path_resolver: Arc<dyn PathResolver>,
    earmark_resolver: Arc<dyn EarmarkResolver>,
    authorizer: Arc<dyn AccessAuthorizer>,
    orch: Option<Arc<dyn OrchSubmitter>>,
}

impl ClusterConfigHandler {
    /// Build a handler over the given stores, with stub collaborators and
    /// no orchestrator until the `with_*` methods replace them.
    pub fn new(
        internal_store: Arc<dyn ConfigStore>,
        public_store: Arc<dyn ConfigStore>,
        priv_store: Arc<dyn ConfigStore>,
    ) -> Self {
        tracing::info!("initialized new cluster config handler");
        Self {
            internal_store,
            public_store,
            priv_store,
            path_resolver: Arc::new(PathResolverStub),
            earmark_resolver: Arc::new(EarmarkResolverStub::new()),
            authorizer: Arc::new(AuthorizerStub::new()),
            orch: None,
        }
    }

    pub fn with_path_resolver(mut self, path_resolver: Arc<dyn PathResolver>) -> Self {
        self.path_resolver = path_resolver;
        self
    }

    pub fn with_earmark_resolver(mut self, earmark_resolver: Arc<dyn EarmarkResolver>) -> Self {
        self.earmark_resolver = earmark_resolver;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn AccessAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Enable orchestrator submission. Without this the handler still
    /// writes all artifacts but never deploys.
    pub fn with_orch(mut self, orch: Arc<dyn OrchSubmitter>) -> Self {
        self.orch = Some(orch);
        self
    }

    /// Apply a batch of resource edits.
    ///
    /// Returns a `ResultGroup` whose success is true iff every input
    /// resource committed. On a validation failure nothing is written and
    /// the group carries the per-resource failures. With `create_only`
    /// set, resources whose ids already exist are rejected.
    pub fn apply(&self, inputs: Vec<Resource>, create_only: bool) -> Result<ResultGroup> {
        tracing::debug!("applying changes to the internal data store");
        let mut staging = Staging::new(self.internal_store.as_ref());
        for resource in order_resources(inputs) {
            staging.stage(resource);
        }
        let mut results = self.check_staged(&staging, create_only)?;
        if results.success() {
            tracing::debug!(
                count = results.len(),
                "checked resources; committing and syncing changes"
            );
            {
                let tx = Transaction::begin(self.internal_store.as_ref())?;
                results = staging.save()?;
                staging.prune_linked_entries()?;
                tx.commit()?;
            }
            let tx = Transaction::begin(self.internal_store.as_ref())?;
            self.sync_modified(&results)?;
            tx.commit()?;
        }
        Ok(results)
    }

    /// Re-synchronize every cluster's external artifacts from the internal
    /// store, removing externally-present clusters that no longer exist.
    pub fn sync_all(&self) -> Result<()> {
        let tx = Transaction::begin(self.internal_store.as_ref())?;
        self.sync_clusters(None)?;
        tx.commit()?;
        Ok(())
    }

    pub fn cluster_ids(&self) -> Result<Vec<String>> {
        Ok(internal::cluster_ids(self.internal_store.as_ref())?)
    }

    pub fn share_ids(&self) -> Result<Vec<(String, String)>> {
        internal::share_ids(self.internal_store.as_ref())
    }

    pub fn share_ids_by_cluster(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (cluster_id, share_id) in internal::share_ids(self.internal_store.as_ref())? {
            out.entry(cluster_id).or_default().push(share_id);
        }
        Ok(out)
    }

    pub fn join_auth_ids(&self) -> Result<Vec<String>> {
        Ok(internal::join_auth_ids(self.internal_store.as_ref())?)
    }

    pub fn user_and_group_ids(&self) -> Result<Vec<String>> {
        Ok(internal::users_groups_ids(self.internal_store.as_ref())?)
    }

    /// Every resource in the internal store.
    pub fn all_resources(&self) -> Result<Vec<Resource>> {
        let tx = Transaction::begin(self.internal_store.as_ref())?;
        let out = self.search_resources(&Matcher::new())?;
        tx.commit()?;
        Ok(out)
    }

    /// Resources matching the given selector strings.
    pub fn matching_resources(&self, names: &[&str]) -> Result<Vec<Resource>> {
        let mut matcher = Matcher::new();
        for name in names {
            matcher.parse(name)?;
        }
        let tx = Transaction::begin(self.internal_store.as_ref())?;
        let out = self.search_resources(&matcher)?;
        tx.commit()?;
        Ok(out)
    }

    fn search_resources(&self, matcher: &Matcher) -> Result<Vec<Resource>> {
        tracing::debug!(matcher = %matcher, "performing search");
        let store = self.internal_store.as_ref();
        let mut out: Vec<Resource> = Vec::new();
        if matcher.matches_type(ResourceType::Cluster) || matcher.matches_type(ResourceType::Share)
        {
            let shares_by_cluster = self.share_ids_by_cluster()?;
            for cluster_id in internal::cluster_ids(store)? {
                if matcher.matches_id(ResourceType::Cluster, &cluster_id) {
                    if let Some(cluster) = internal::load_cluster(store, &cluster_id)? {
                        out.push(Resource::Cluster(cluster));
                    }
                }
                let share_ids = shares_by_cluster
                    .get(&cluster_id)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                for share_id in share_ids {
                    if matcher.matches_sub_id(ResourceType::Share, &cluster_id, share_id) {
                        if let Some(share) = internal::load_share(store, &cluster_id, share_id)? {
                            out.push(Resource::Share(share));
                        }
                    }
                }
            }
        }
        if matcher.matches_type(ResourceType::JoinAuth) {
            for auth_id in internal::join_auth_ids(store)? {
                if matcher.matches_id(ResourceType::JoinAuth, &auth_id) {
                    if let Some(auth) = internal::load_join_auth(store, &auth_id)? {
                        out.push(Resource::JoinAuth(auth));
                    }
                }
            }
        }
        if matcher.matches_type(ResourceType::UsersGroups) {
            for ug_id in internal::users_groups_ids(store)? {
                if matcher.matches_id(ResourceType::UsersGroups, &ug_id) {
                    if let Some(ug) = internal::load_users_and_groups(store, &ug_id)? {
                        out.push(Resource::UsersAndGroups(ug));
                    }
                }
            }
        }
        tracing::debug!(count = out.len(), "search found resources");
        Ok(out)
    }

    fn check_staged(&self, staging: &Staging<'_>, create_only: bool) -> Result<ResultGroup> {
        let mut results = ResultGroup::new();
        let tx = Transaction::begin(self.internal_store.as_ref())?;
        for resource in staging.staged() {
            match self.check(resource, staging, create_only) {
                Ok(result) => results.push(result),
                Err(err) => {
                    // unexpected failure: surface one generic error result
                    // and stop processing the batch
                    tracing::error!(
                        resource = %resource.describe(),
                        "error checking resource: {}",
                        err
                    );
                    let mut msg = err.to_string();
                    if msg.is_empty() {
                        msg = format!(
                            "error updating resource {} (see logs for details)",
                            resource.describe()
                        );
                    }
                    results.push(ResourceResult::error(resource.clone(), msg));
                    break;
                }
            }
        }
        tx.commit()?;
        Ok(results)
    }

    fn check(
        &self,
        resource: &Resource,
        staging: &Staging<'_>,
        create_only: bool,
    ) -> Result<ResourceResult> {
        tracing::debug!(resource = %resource.describe(), "checking staged resource");
        if create_only && !staging.is_new(resource)? {
            return Ok(ResourceResult::error(
                resource.clone(),
                ValidationError::DuplicateId.to_string(),
            ));
        }
        match cross_check_resource(
            resource,
            staging,
            self.path_resolver.as_ref(),
            self.earmark_resolver.as_ref(),
        ) {
            Ok(()) => Ok(ResourceResult::checked(resource.clone())),
            Err(ConfigError::Validation(err)) => {
                tracing::debug!(resource = %resource.describe(), "rejected resource: {}", err);
                Ok(ResourceResult::error(resource.clone(), err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn sync_modified(&self, results: &ResultGroup) -> Result<()> {
        let cluster_ids = changes::modified_cluster_ids(self.internal_store.as_ref(), results)?;
        self.sync_clusters(Some(&cluster_ids))
    }

    /// Synchronize the clusters named in `modified`, or all clusters when
    /// no subset is given.
    fn sync_clusters(&self, modified: Option<&BTreeSet<String>>) -> Result<()> {
        let store = self.internal_store.as_ref();
        let all_share_ids = internal::share_ids(store)?;
        let cluster_ids: Vec<String> = match modified {
            Some(ids) => ids.iter().cloned().collect(),
            None => internal::cluster_ids(store)?,
        };
        let selection = if modified.is_some() { "selected" } else { "all" };
        tracing::debug!(selection, clusters = ?cluster_ids, "syncing clusters");
        let mut removed_cluster_ids: BTreeSet<String> = BTreeSet::new();
        let mut change_groups: Vec<ClusterChangeGroup> = Vec::new();
        for cluster_id in &cluster_ids {
            let cluster = match internal::load_cluster(store, cluster_id)? {
                Some(cluster) => cluster,
                None => {
                    removed_cluster_ids.insert(cluster_id.clone());
                    continue;
                }
            };
            let mut shares = Vec::new();
            for (cid, sid) in &all_share_ids {
                if cid != cluster_id {
                    continue;
                }
                if let Some(share) = internal::load_share(store, cid, sid)? {
                    shares.push(share);
                }
            }
            let mut join_auths = Vec::new();
            for auth_id in cluster.join_auth_refs() {
                let auth = internal::load_join_auth(store, &auth_id)?.ok_or(
                    ValidationError::MissingJoinAuth {
                        auth_id: auth_id.clone(),
                    },
                )?;
                join_auths.push(auth);
            }
            let mut users_and_groups = Vec::new();
            for ug_id in cluster.users_groups_refs() {
                let ug = internal::load_users_and_groups(store, &ug_id)?.ok_or(
                    ValidationError::MissingUsersAndGroups {
                        users_groups_id: ug_id.clone(),
                    },
                )?;
                users_and_groups.push(ug);
            }
            change_groups.push(ClusterChangeGroup {
                cluster,
                shares,
                join_auths,
                users_and_groups,
                cache: EntryCache::new(),
            });
        }
        for mut group in change_groups {
            self.save_cluster_settings(&mut group)?;
        }
        // clusters present externally but unknown internally are cleaned up
        // on a full sync
        if modified.is_none() {
            let known: BTreeSet<&String> = cluster_ids.iter().collect();
            removed_cluster_ids = external::stored_cluster_ids(
                self.public_store.as_ref(),
                self.priv_store.as_ref(),
            )?
            .into_iter()
            .filter(|id| !known.contains(id))
            .collect();
        }
        for cluster_id in &removed_cluster_ids {
            self.remove_cluster(cluster_id)?;
        }
        Ok(())
    }

    /// Save the external-facing objects for one cluster and tickle the
    /// external components.
    fn save_cluster_settings(&self, group: &mut ClusterChangeGroup) -> Result<()> {
        let cluster_id = group.cluster.cluster_id.clone();
        tracing::debug!(cluster_id = %cluster_id, "saving external stores for cluster");
        // volumes our shares touch; several operations are skipped when
        // no volume is in use
        let mut vols: BTreeSet<String> = BTreeSet::new();
        for share in &group.shares {
            vols.insert(share.checked_storage()?.volume.clone());
        }
        let mut entity = generate::data_entity(&cluster_id);
        let orch_needed = !vols.is_empty() && self.orch.is_some();

        let previous_info = self.swap_cluster_info(group, orch_needed)?;
        self.save_join_auths(group)?;
        self.save_users_and_groups(group)?;
        self.save_config(group, &entity)?;
        external::rm_other_in_ns(self.priv_store.as_ref(), &cluster_id, &group.cache)?;

        for volume in &vols {
            self.authorizer.authorize_entity(volume, &entity, "")?;
        }
        if vols.is_empty() {
            // nothing was authorized; keep the entity out of the spec
            entity.clear();
        }

        let cfg_key = external::config_key(&cluster_id);
        let override_key = external::config_override_key(&cluster_id);
        let config_entries = vec![
            EntryRef {
                uri: self.public_store.uri(&cfg_key),
                exists: group.cache.contains_key(&cfg_key),
            },
            EntryRef {
                uri: self.public_store.uri(&override_key),
                exists: self.public_store.exists(&override_key)?,
            },
        ];
        let join_sources = self.cached_uris(group, external::join_source_names);
        let user_sources = self.cached_uris(group, external::users_groups_source_names);
        let spec = generate_service_spec(
            &group.cluster,
            &config_entries,
            join_sources,
            user_sources,
            &entity,
            generate::has_proxied_vfs(&group.shares),
        )?;
        self.save_spec_backup(group, &spec)?;

        // if orch was ever needed in the past we must re-submit, but with
        // no volumes and no previous submission wait until there is
        // something to serve before deploying the cluster
        let previous_orch = previous_info
            .get("orch_needed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if let Some(orch) = &self.orch {
            if !vols.is_empty() || previous_orch {
                tracing::debug!(service = %spec.service_name(), "submitting service spec");
                orch.submit_spec(&spec)?;
            }
        }
        Ok(())
    }

    fn cached_uris(
        &self,
        group: &ClusterChangeGroup,
        select: fn(Vec<String>) -> Vec<String>,
    ) -> Vec<String> {
        let cluster_id = &group.cluster.cluster_id;
        select(group.cache.names_in_ns(cluster_id))
            .into_iter()
            .filter_map(|name| {
                group
                    .cache
                    .get(&EntryKey::new(cluster_id.clone(), name))
                    .map(|entry| entry.uri.clone())
            })
            .collect()
    }

    fn set_and_cache(
        &self,
        store: &dyn ConfigStore,
        group: &mut ClusterChangeGroup,
        key: EntryKey,
        value: Value,
    ) -> Result<()> {
        store.set(&key, value.clone())?;
        group.cache.insert(CachedEntry {
            uri: store.uri(&key),
            key,
            value,
        });
        Ok(())
    }

    /// Record this pass's bookkeeping entry and return the previous one.
    fn swap_cluster_info(
        &self,
        group: &mut ClusterChangeGroup,
        orch_needed: bool,
    ) -> Result<Value> {
        let cluster_id = group.cluster.cluster_id.clone();
        let key = external::cluster_info_key(&cluster_id);
        let previous = match self.public_store.get(&key) {
            Ok(value) => value,
            Err(err) if err.is_not_found() => json!({}),
            Err(err) => return Err(err.into()),
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let info = json!({
            "cluster_id": cluster_id,
            "timestamp": timestamp,
            "orch_needed": orch_needed,
        });
        self.set_and_cache(self.public_store.as_ref(), group, key, info)?;
        Ok(previous)
    }

    /// Persist each join-credential source to the private store; only
    /// domain-joined clusters carry them.
    fn save_join_auths(&self, group: &mut ClusterChangeGroup) -> Result<()> {
        if group.cluster.auth_mode != AuthMode::ActiveDirectory {
            return Ok(());
        }
        let cluster_id = group.cluster.cluster_id.clone();
        let sources = group
            .cluster
            .domain_settings
            .as_ref()
            .map(|ds| ds.join_sources.clone())
            .unwrap_or_default();
        for (index, source) in sources.iter().enumerate() {
            match source.source_type {
                JoinSourceType::Resource => {
                    let auth = group
                        .join_auths
                        .iter()
                        .find(|a| a.auth_id == source.ref_)
                        .ok_or(ValidationError::MissingJoinAuth {
                            auth_id: source.ref_.clone(),
                        })?;
                    let values = auth.auth.clone().ok_or_else(|| {
                        ValidationError::InvalidJoinAuth {
                            auth_id: auth.auth_id.clone(),
                            reason: "join auth requires credential values".to_string(),
                        }
                    })?;
                    let value = serde_json::to_value(values)
                        .map_err(|e| crate::store::StoreError::Backend(e.to_string()))?;
                    let key = external::join_source_key(&cluster_id, index);
                    self.set_and_cache(self.priv_store.as_ref(), group, key, value)?;
                }
            }
        }
        Ok(())
    }

    /// Persist each user/group source to the private store; only
    /// user-auth clusters carry them.
    fn save_users_and_groups(&self, group: &mut ClusterChangeGroup) -> Result<()> {
        if group.cluster.auth_mode != AuthMode::User {
            return Ok(());
        }
        let cluster_id = group.cluster.cluster_id.clone();
        let sources = group.cluster.user_group_settings.clone();
        for (index, source) in sources.iter().enumerate() {
            let ug_ref = match (source.source_type, &source.ref_) {
                (UserGroupSourceType::Empty, _) => continue,
                (UserGroupSourceType::Resource, Some(ug_ref)) => ug_ref.clone(),
                (UserGroupSourceType::Resource, None) => {
                    return Err(ValidationError::InvalidCluster {
                        cluster_id: cluster_id.clone(),
                        reason: "resource-typed user group source requires a ref".to_string(),
                    }
                    .into())
                }
            };
            let ug = group
                .users_and_groups
                .iter()
                .find(|u| u.users_groups_id == ug_ref)
                .ok_or(ValidationError::MissingUsersAndGroups {
                    users_groups_id: ug_ref.clone(),
                })?;
            let values = ug.values.clone().unwrap_or_default();
            let doc = json!({
                "samba-container-config": generate::CONTAINER_CONFIG_VERSION,
                "users": { "all_entries": values.users },
                "groups": { "all_entries": values.groups },
            });
            let key = external::users_groups_source_key(&cluster_id, index);
            self.set_and_cache(self.priv_store.as_ref(), group, key, doc)?;
        }
        Ok(())
    }

    /// Generate the cluster configuration and save it in the public store.
    fn save_config(&self, group: &mut ClusterChangeGroup, entity: &str) -> Result<()> {
        let config = generate::generate_config(
            &group.cluster,
            &group.shares,
            self.path_resolver.as_ref(),
            entity,
        )?;
        let key = external::config_key(&group.cluster.cluster_id);
        self.set_and_cache(self.public_store.as_ref(), group, key, config)
    }

    fn save_spec_backup(
        &self,
        group: &mut ClusterChangeGroup,
        spec: &SmbServiceSpec,
    ) -> Result<()> {
        let value = serde_json::to_value(spec)
            .map_err(|e| crate::store::StoreError::Backend(e.to_string()))?;
        let key = external::spec_backup_key(&group.cluster.cluster_id);
        self.set_and_cache(self.public_store.as_ref(), group, key, value)
    }

    /// Remove a cluster's orchestrated service and all of its external
    /// entries.
    fn remove_cluster(&self, cluster_id: &str) -> Result<()> {
        tracing::info!(cluster_id = %cluster_id, "removing cluster");
        let spec_key = external::spec_backup_key(cluster_id);
        if self.public_store.exists(&spec_key)? {
            if let Some(orch) = &self.orch {
                let service_name = format!("smb.{}", cluster_id);
                tracing::debug!(service = %service_name, "removing orchestrated service");
                orch.remove_service(&service_name)?;
            }
        }
        external::rm_cluster(self.priv_store.as_ref(), cluster_id)?;
        external::rm_cluster(self.public_store.as_ref(), cluster_id)?;
        Ok(())
    }

    /// Generate a configuration document on demand from the stored state.
    pub fn generate_config(&self, cluster_id: &str) -> Result<Value> {
        let store = self.internal_store.as_ref();
        let cluster = internal::load_cluster(store, cluster_id)?.ok_or_else(|| {
            ConfigError::Store(crate::store::StoreError::not_found(&internal::cluster_key(
                cluster_id,
            )))
        })?;
        let mut shares = Vec::new();
        for (cid, sid) in internal::share_ids(store)? {
            if cid != cluster_id {
                continue;
            }
            if let Some(share) = internal::load_share(store, &cid, &sid)? {
                shares.push(share);
            }
        }
        generate::generate_config(
            &cluster,
            &shares,
            self.path_resolver.as_ref(),
            &generate::data_entity(cluster_id),
        )
    }

    /// Generate a service spec on demand from the stored state. An
    /// override configuration placed in the public store wins over the
    /// generated one.
    pub fn generate_service_spec(&self, cluster_id: &str) -> Result<SmbServiceSpec> {
        let store = self.internal_store.as_ref();
        let cluster = internal::load_cluster(store, cluster_id)?.ok_or_else(|| {
            ConfigError::Store(crate::store::StoreError::not_found(&internal::cluster_key(
                cluster_id,
            )))
        })?;
        let cfg_key = external::config_key(cluster_id);
        let override_key = external::config_override_key(cluster_id);
        let config_entries = vec![
            EntryRef {
                uri: self.public_store.uri(&cfg_key),
                exists: self.public_store.exists(&cfg_key)?,
            },
            EntryRef {
                uri: self.public_store.uri(&override_key),
                exists: self.public_store.exists(&override_key)?,
            },
        ];
        let priv_names = self.priv_store.contents(cluster_id)?;
        let join_sources = external::join_source_names(priv_names.clone())
            .into_iter()
            .map(|name| self.priv_store.uri(&EntryKey::new(cluster_id, name)))
            .collect();
        let user_sources = external::users_groups_source_names(priv_names)
            .into_iter()
            .map(|name| self.priv_store.uri(&EntryKey::new(cluster_id, name)))
            .collect();
        let mut shares = Vec::new();
        for (cid, sid) in internal::share_ids(store)? {
            if cid != cluster_id {
                continue;
            }
            if let Some(share) = internal::load_share(store, &cid, &sid)? {
                shares.push(share);
            }
        }
        let has_volumes = shares
            .iter()
            .any(|s| s.cephfs.as_ref().map(|c| !c.volume.is_empty()).unwrap_or(false));
        let entity = if has_volumes {
            generate::data_entity(cluster_id)
        } else {
            String::new()
        };
        generate_service_spec(
            &cluster,
            &config_entries,
            join_sources,
            user_sources,
            &entity,
            generate::has_proxied_vfs(&shares),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::StorageProvider;
    use crate::resources::{
        CephFsStorage, RemovedCluster, UserGroupSource, UserGroupValues,
    };
    use crate::store::MemConfigStore;

    fn make_handler() -> ClusterConfigHandler {
        ClusterConfigHandler::new(
            Arc::new(MemConfigStore::with_prefix("internal")),
            Arc::new(MemConfigStore::with_prefix("public")),
            Arc::new(MemConfigStore::with_prefix("priv")),
        )
    }

    fn make_ug(users_groups_id: &str) -> Resource {
        Resource::UsersAndGroups(UsersAndGroups {
            users_groups_id: users_groups_id.to_string(),
            values: Some(UserGroupValues::default()),
            linked_to_cluster: None,
        })
    }

    fn make_cluster(cluster_id: &str) -> Resource {
        Resource::Cluster(Cluster {
            cluster_id: cluster_id.to_string(),
            auth_mode: AuthMode::User,
            domain_settings: None,
            user_group_settings: vec![UserGroupSource {
                source_type: UserGroupSourceType::Resource,
                ref_: Some("ug1".to_string()),
            }],
            custom_dns: None,
            custom_ports: None,
            placement: None,
            clustering: crate::enums::Clustering::Default,
            public_addrs: vec![],
            custom_smb_global_options: None,
        })
    }

    fn make_share(cluster_id: &str, share_id: &str) -> Resource {
        Resource::Share(Share {
            cluster_id: cluster_id.to_string(),
            share_id: share_id.to_string(),
            name: None,
            readonly: false,
            browseable: true,
            restrict_access: false,
            cephfs: Some(CephFsStorage {
                volume: "vol1".to_string(),
                subvolumegroup: String::new(),
                subvolume: String::new(),
                path: "/".to_string(),
                provider: StorageProvider::SambaVfsClassic,
            }),
            comment: None,
            max_connections: None,
            login_control: None,
            custom_smb_share_options: None,
        })
    }

    #[test]
    fn test_apply_commits_valid_batch() {
        let handler = make_handler();
        let results = handler
            .apply(
                vec![make_ug("ug1"), make_cluster("c1"), make_share("c1", "s1")],
                false,
            )
            .unwrap();
        assert!(results.success());
        assert_eq!(handler.cluster_ids().unwrap(), vec!["c1"]);
        assert_eq!(
            handler.share_ids().unwrap(),
            vec![("c1".to_string(), "s1".to_string())]
        );
    }

    #[test]
    fn test_apply_order_does_not_matter() {
        let handler = make_handler();
        // share first, cluster second, users last: ordering fixes it up
        let results = handler
            .apply(
                vec![make_share("c1", "s1"), make_cluster("c1"), make_ug("ug1")],
                false,
            )
            .unwrap();
        assert!(results.success());
    }

    #[test]
    fn test_apply_invalid_batch_leaves_store_unchanged() {
        let handler = make_handler();
        handler
            .apply(vec![make_ug("ug1"), make_cluster("c1")], false)
            .unwrap();
        let before = handler.all_resources().unwrap();
        // share referencing a cluster that does not exist
        let results = handler
            .apply(vec![make_share("nope", "s1"), make_ug("ug2")], false)
            .unwrap();
        assert!(!results.success());
        assert_eq!(handler.all_resources().unwrap(), before);
    }

    #[test]
    fn test_create_only_rejects_existing_id() {
        let handler = make_handler();
        handler
            .apply(vec![make_ug("ug1"), make_cluster("c1")], false)
            .unwrap();
        // same id, materially different payload
        let mut cluster = match make_cluster("c1") {
            Resource::Cluster(c) => c,
            _ => unreachable!(),
        };
        cluster.custom_dns = Some(vec!["10.9.8.7".to_string()]);
        let results = handler
            .apply(vec![Resource::Cluster(cluster)], true)
            .unwrap();
        assert!(!results.success());
        let failure = results.iter().find(|r| !r.success).unwrap();
        assert_eq!(
            failure.msg.as_deref(),
            Some("a resource with the same ID already exists")
        );
    }

    #[test]
    fn test_apply_writes_external_artifacts() {
        let handler = make_handler();
        handler
            .apply(
                vec![make_ug("ug1"), make_cluster("c1"), make_share("c1", "s1")],
                false,
            )
            .unwrap();
        let public = &handler.public_store;
        assert!(public.exists(&external::config_key("c1")).unwrap());
        assert!(public.exists(&external::spec_backup_key("c1")).unwrap());
        assert!(public.exists(&external::cluster_info_key("c1")).unwrap());
        let private = &handler.priv_store;
        assert!(private
            .exists(&external::users_groups_source_key("c1", 0))
            .unwrap());
    }

    #[test]
    fn test_removed_cluster_cleans_external_stores() {
        let handler = make_handler();
        handler
            .apply(
                vec![make_ug("ug1"), make_cluster("c1"), make_share("c1", "s1")],
                false,
            )
            .unwrap();
        let results = handler
            .apply(
                vec![Resource::RemovedCluster(RemovedCluster {
                    cluster_id: "c1".to_string(),
                })],
                false,
            )
            .unwrap();
        assert!(results.success());
        assert!(handler.cluster_ids().unwrap().is_empty());
        assert!(handler.share_ids().unwrap().is_empty());
        assert!(handler.public_store.contents("c1").unwrap().is_empty());
        assert!(handler.priv_store.contents("c1").unwrap().is_empty());
    }

    #[test]
    fn test_matching_resources_by_selector() {
        let handler = make_handler();
        handler
            .apply(
                vec![
                    make_ug("ug1"),
                    make_cluster("c1"),
                    make_share("c1", "s1"),
                    make_share("c1", "s2"),
                ],
                false,
            )
            .unwrap();
        let shares = handler.matching_resources(&["share.c1"]).unwrap();
        assert_eq!(shares.len(), 2);
        let one = handler.matching_resources(&["share.c1.s2"]).unwrap();
        assert_eq!(one.len(), 1);
        let all = handler.all_resources().unwrap();
        assert_eq!(all.len(), 4);
        assert!(handler.matching_resources(&["bogus.x"]).is_err());
    }

    #[test]
    fn test_generate_config_on_demand() {
        let handler = make_handler();
        handler
            .apply(
                vec![make_ug("ug1"), make_cluster("c1"), make_share("c1", "s1")],
                false,
            )
            .unwrap();
        let doc = handler.generate_config("c1").unwrap();
        assert_eq!(doc["configs"]["c1"]["shares"], serde_json::json!(["s1"]));
    }

    #[test]
    fn test_generate_service_spec_on_demand() {
        let handler = make_handler();
        handler
            .apply(
                vec![make_ug("ug1"), make_cluster("c1"), make_share("c1", "s1")],
                false,
            )
            .unwrap();
        let spec = handler.generate_service_spec("c1").unwrap();
        assert_eq!(spec.service_id, "c1");
        assert_eq!(spec.config_uri, "public:c1/config.smb");
        assert_eq!(spec.user_sources.len(), 1);
    }

    #[test]
    fn test_generate_service_spec_prefers_override() {
        let handler = make_handler();
        handler
            .apply(vec![make_ug("ug1"), make_cluster("c1")], false)
            .unwrap();
        handler
            .public_store
            .set(
                &external::config_override_key("c1"),
                serde_json::json!({"custom": true}),
            )
            .unwrap();
        let spec = handler.generate_service_spec("c1").unwrap();
        assert_eq!(spec.config_uri, "public:c1/config.smb.override");
    }
}
