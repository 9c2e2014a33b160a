//! Change-set detection: which clusters need re-synchronization after a
//! committed batch.

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::internal;
use crate::resources::Resource;
use crate::results::ResultGroup;
use crate::store::ConfigStore;

/// Cluster ids whose external artifacts must be regenerated for the given
/// committed results.
///
/// Credential resources (join auths, users-and-groups) may be referenced
/// by any number of clusters, so an edit to one forces a re-sync of every
/// stored cluster.
// TODO: index reverse references so a credential edit only re-syncs the
// clusters that actually consume it.
pub fn modified_cluster_ids(
    store: &dyn ConfigStore,
    results: &ResultGroup,
) -> Result<BTreeSet<String>, ConfigError> {
    let mut cluster_ids = BTreeSet::new();
    let mut credentials_changed = false;
    for result in results.iter() {
        if result.state.map(|s| s.is_unchanged()).unwrap_or(false) {
            continue;
        }
        match &result.resource {
            Resource::Cluster(c) => {
                cluster_ids.insert(c.cluster_id.clone());
            }
            Resource::RemovedCluster(c) => {
                cluster_ids.insert(c.cluster_id.clone());
            }
            Resource::Share(s) => {
                cluster_ids.insert(s.cluster_id.clone());
            }
            Resource::RemovedShare(s) => {
                cluster_ids.insert(s.cluster_id.clone());
            }
            Resource::JoinAuth(_) | Resource::UsersAndGroups(_) => {
                credentials_changed = true;
            }
        }
    }
    if credentials_changed {
        cluster_ids.extend(internal::cluster_ids(store)?);
    }
    tracing::debug!(count = cluster_ids.len(), "computed change set");
    Ok(cluster_ids)
}
