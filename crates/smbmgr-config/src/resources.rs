//! Declarative resource types: clusters, shares, credential resources and
//! their removal tombstones.
//!
//! Every resource carries enough identity to address it in the internal
//! store. Intra-resource validation lives here; cross-resource checks
//! (references between staged resources) live in `staging`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::{
    AuthMode, Clustering, JoinSourceType, LoginAccess, LoginCategory, ResourceType,
    StorageProvider, UserGroupSourceType,
};

/// A resource failed a validation rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid resource id: {id:?}")]
    InvalidId { id: String },
    #[error("cluster {cluster_id}: {reason}")]
    InvalidCluster { cluster_id: String, reason: String },
    #[error("share {cluster_id}/{share_id}: {reason}")]
    InvalidShare {
        cluster_id: String,
        share_id: String,
        reason: String,
    },
    #[error("join auth {auth_id}: {reason}")]
    InvalidJoinAuth { auth_id: String, reason: String },
    #[error("users-and-groups {users_groups_id}: {reason}")]
    InvalidUsersAndGroups {
        users_groups_id: String,
        reason: String,
    },
    #[error("no matching cluster id: {cluster_id}")]
    MissingCluster { cluster_id: String },
    #[error("no matching join auth: {auth_id}")]
    MissingJoinAuth { auth_id: String },
    #[error("no matching users-and-groups: {users_groups_id}")]
    MissingUsersAndGroups { users_groups_id: String },
    #[error("{resource} is linked to cluster {linked_to}, not {cluster_id}")]
    LinkedClusterMismatch {
        resource: String,
        linked_to: String,
        cluster_id: String,
    },
    #[error("a resource with the same ID already exists")]
    DuplicateId,
    #[error("path resolution failed for volume {volume}: {reason}")]
    PathResolution { volume: String, reason: String },
    #[error("volume {volume} path {path} is earmarked for another application: {earmark}")]
    EarmarkConflict {
        volume: String,
        path: String,
        earmark: String,
    },
}

/// True if `id` is usable as a resource identifier.
///
/// Dots are reserved for selector syntax and the composite share key.
pub fn valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_id(id: &str) -> Result<(), ValidationError> {
    if valid_id(id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidId { id: id.to_string() })
    }
}

/// Domain-join credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAuthValues {
    pub username: String,
    pub password: String,
}

/// A reference to a domain-join credential source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSource {
    pub source_type: JoinSourceType,
    #[serde(rename = "ref")]
    pub ref_: String,
}

/// A reference to a user/group definition source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupSource {
    pub source_type: UserGroupSourceType,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
}

/// Active Directory settings for a domain-joined cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    pub realm: String,
    #[serde(default)]
    pub join_sources: Vec<JoinSource>,
}

/// Service placement: how many instances and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Placement {
    pub fn instance_count(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// A public address a clustered service should answer on, with the
/// optional networks it is reachable from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPublicIp {
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination: Vec<String>,
}

/// A named deployable group of shares with one authentication mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_settings: Option<DomainSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_group_settings: Vec<UserGroupSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_ports: Option<BTreeMap<String, u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub clustering: Clustering,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_addrs: Vec<ClusterPublicIp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_smb_global_options: Option<BTreeMap<String, String>>,
}

impl Cluster {
    /// Whether this cluster runs a multi-node clustering layer (ctdb).
    pub fn is_clustered(&self) -> bool {
        match self.clustering {
            Clustering::Always => true,
            Clustering::Never => false,
            Clustering::Default => {
                self.placement
                    .as_ref()
                    .map(Placement::instance_count)
                    .unwrap_or(1)
                    > 1
            }
        }
    }

    /// Ids of `JoinAuth` resources this cluster references.
    pub fn join_auth_refs(&self) -> Vec<String> {
        self.domain_settings
            .as_ref()
            .map(|ds| {
                ds.join_sources
                    .iter()
                    .filter(|src| src.source_type == JoinSourceType::Resource)
                    .map(|src| src.ref_.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of `UsersAndGroups` resources this cluster references.
    pub fn users_groups_refs(&self) -> Vec<String> {
        self.user_group_settings
            .iter()
            .filter(|src| src.source_type == UserGroupSourceType::Resource)
            .filter_map(|src| src.ref_.clone())
            .collect()
    }

    /// Public addresses in the shape the service spec consumes.
    pub fn service_spec_public_addrs(&self) -> Option<Vec<ClusterPublicIp>> {
        if self.public_addrs.is_empty() {
            None
        } else {
            Some(self.public_addrs.clone())
        }
    }

    /// Bare bind addresses derived from the public address list.
    pub fn service_spec_bind_addrs(&self) -> Option<Vec<String>> {
        if self.public_addrs.is_empty() {
            None
        } else {
            Some(self.public_addrs.iter().map(|a| a.address.clone()).collect())
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidCluster {
            cluster_id: self.cluster_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id(&self.cluster_id)?;
        match self.auth_mode {
            AuthMode::ActiveDirectory => {
                let ds = self
                    .domain_settings
                    .as_ref()
                    .ok_or_else(|| self.invalid("active-directory auth mode requires domain settings"))?;
                if ds.realm.is_empty() {
                    return Err(self.invalid("domain settings require a realm"));
                }
                if ds.join_sources.is_empty() {
                    return Err(self.invalid("domain settings require at least one join source"));
                }
                if !self.user_group_settings.is_empty() {
                    return Err(
                        self.invalid("user and group settings not supported for active-directory auth mode")
                    );
                }
            }
            AuthMode::User => {
                if self.domain_settings.is_some() {
                    return Err(self.invalid("domain settings not supported for user auth mode"));
                }
                if self.user_group_settings.is_empty() {
                    return Err(self.invalid("user auth mode requires user and group settings"));
                }
                for src in &self.user_group_settings {
                    if src.source_type == UserGroupSourceType::Resource && src.ref_.is_none() {
                        return Err(self.invalid("resource-typed user group source requires a ref"));
                    }
                }
            }
            AuthMode::None => {
                if self.domain_settings.is_some() || !self.user_group_settings.is_empty() {
                    return Err(self.invalid("auth mode 'none' does not take domain or user settings"));
                }
            }
        }
        Ok(())
    }
}

/// Storage backing for one share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CephFsStorage {
    pub volume: String,
    #[serde(default)]
    pub subvolumegroup: String,
    #[serde(default)]
    pub subvolume: String,
    #[serde(default = "CephFsStorage::default_path")]
    pub path: String,
    #[serde(default)]
    pub provider: StorageProvider,
}

impl CephFsStorage {
    fn default_path() -> String {
        "/".to_string()
    }
}

/// An entry granting or denying one principal access to a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginControlEntry {
    pub name: String,
    #[serde(default)]
    pub category: LoginCategory,
    pub access: LoginAccess,
}

/// One exported storage path owned by exactly one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub cluster_id: String,
    pub share_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default = "Share::default_browseable")]
    pub browseable: bool,
    #[serde(default)]
    pub restrict_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cephfs: Option<CephFsStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_control: Option<Vec<LoginControlEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_smb_share_options: Option<BTreeMap<String, String>>,
}

impl Share {
    fn default_browseable() -> bool {
        true
    }

    /// Display name of the share; defaults to the share id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.share_id)
    }

    fn invalid(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidShare {
            cluster_id: self.cluster_id.clone(),
            share_id: self.share_id.clone(),
            reason: reason.into(),
        }
    }

    /// The storage descriptor, or a validation error when it is missing.
    pub fn checked_storage(&self) -> Result<&CephFsStorage, ValidationError> {
        self.cephfs
            .as_ref()
            .ok_or_else(|| self.invalid("share requires a cephfs storage descriptor"))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id(&self.cluster_id)?;
        check_id(&self.share_id)?;
        let storage = self.checked_storage()?;
        if storage.volume.is_empty() {
            return Err(self.invalid("storage descriptor requires a volume"));
        }
        if !storage.subvolumegroup.is_empty() && storage.subvolume.is_empty() {
            return Err(self.invalid("subvolumegroup set without a subvolume"));
        }
        Ok(())
    }
}

/// One local user definition carried to the private store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub password: String,
}

/// One local group definition carried to the private store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
}

/// User/group payload of a `UsersAndGroups` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserGroupValues {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

/// A shared domain-join credential resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAuth {
    pub auth_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<JoinAuthValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to_cluster: Option<String>,
}

impl JoinAuth {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id(&self.auth_id)?;
        if self.auth.is_none() {
            return Err(ValidationError::InvalidJoinAuth {
                auth_id: self.auth_id.clone(),
                reason: "join auth requires credential values".to_string(),
            });
        }
        Ok(())
    }
}

/// A shared local user/group definition resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersAndGroups {
    pub users_groups_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<UserGroupValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to_cluster: Option<String>,
}

impl UsersAndGroups {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id(&self.users_groups_id)?;
        if self.values.is_none() {
            return Err(ValidationError::InvalidUsersAndGroups {
                users_groups_id: self.users_groups_id.clone(),
                reason: "users-and-groups requires values".to_string(),
            });
        }
        Ok(())
    }
}

/// Tombstone requesting removal of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedCluster {
    pub cluster_id: String,
}

/// Tombstone requesting removal of a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedShare {
    pub cluster_id: String,
    pub share_id: String,
}

/// Closed set of resource kinds accepted by `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum Resource {
    #[serde(rename = "cluster")]
    Cluster(Cluster),
    #[serde(rename = "removed-cluster")]
    RemovedCluster(RemovedCluster),
    #[serde(rename = "share")]
    Share(Share),
    #[serde(rename = "removed-share")]
    RemovedShare(RemovedShare),
    #[serde(rename = "join-auth")]
    JoinAuth(JoinAuth),
    #[serde(rename = "users-groups")]
    UsersAndGroups(UsersAndGroups),
}

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Cluster(_) | Resource::RemovedCluster(_) => ResourceType::Cluster,
            Resource::Share(_) | Resource::RemovedShare(_) => ResourceType::Share,
            Resource::JoinAuth(_) => ResourceType::JoinAuth,
            Resource::UsersAndGroups(_) => ResourceType::UsersGroups,
        }
    }

    /// True for removal tombstones.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Resource::RemovedCluster(_) | Resource::RemovedShare(_))
    }

    /// The owning cluster id, for the kinds that have one.
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Resource::Cluster(c) => Some(&c.cluster_id),
            Resource::RemovedCluster(c) => Some(&c.cluster_id),
            Resource::Share(s) => Some(&s.cluster_id),
            Resource::RemovedShare(s) => Some(&s.cluster_id),
            Resource::JoinAuth(_) | Resource::UsersAndGroups(_) => None,
        }
    }

    /// Dotted identity used in logs and result listings.
    pub fn describe(&self) -> String {
        match self {
            Resource::Cluster(c) => format!("cluster.{}", c.cluster_id),
            Resource::RemovedCluster(c) => format!("removed-cluster.{}", c.cluster_id),
            Resource::Share(s) => format!("share.{}.{}", s.cluster_id, s.share_id),
            Resource::RemovedShare(s) => {
                format!("removed-share.{}.{}", s.cluster_id, s.share_id)
            }
            Resource::JoinAuth(a) => format!("join-auth.{}", a.auth_id),
            Resource::UsersAndGroups(u) => format!("users-groups.{}", u.users_groups_id),
        }
    }

    /// Intra-resource validation; tombstones only check their ids.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Resource::Cluster(c) => c.validate(),
            Resource::RemovedCluster(c) => check_id(&c.cluster_id),
            Resource::Share(s) => s.validate(),
            Resource::RemovedShare(s) => {
                check_id(&s.cluster_id)?;
                check_id(&s.share_id)
            }
            Resource::JoinAuth(a) => a.validate(),
            Resource::UsersAndGroups(u) => u.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user_cluster(cluster_id: &str, ug_ref: &str) -> Cluster {
        Cluster {
            cluster_id: cluster_id.to_string(),
            auth_mode: AuthMode::User,
            domain_settings: None,
            user_group_settings: vec![UserGroupSource {
                source_type: UserGroupSourceType::Resource,
                ref_: Some(ug_ref.to_string()),
            }],
            custom_dns: None,
            custom_ports: None,
            placement: None,
            clustering: Clustering::Default,
            public_addrs: vec![],
            custom_smb_global_options: None,
        }
    }

    fn make_ad_cluster(cluster_id: &str, realm: &str, auth_ref: &str) -> Cluster {
        Cluster {
            cluster_id: cluster_id.to_string(),
            auth_mode: AuthMode::ActiveDirectory,
            domain_settings: Some(DomainSettings {
                realm: realm.to_string(),
                join_sources: vec![JoinSource {
                    source_type: JoinSourceType::Resource,
                    ref_: auth_ref.to_string(),
                }],
            }),
            user_group_settings: vec![],
            custom_dns: None,
            custom_ports: None,
            placement: None,
            clustering: Clustering::Default,
            public_addrs: vec![],
            custom_smb_global_options: None,
        }
    }

    fn make_share(cluster_id: &str, share_id: &str, volume: &str) -> Share {
        Share {
            cluster_id: cluster_id.to_string(),
            share_id: share_id.to_string(),
            name: None,
            readonly: false,
            browseable: true,
            restrict_access: false,
            cephfs: Some(CephFsStorage {
                volume: volume.to_string(),
                subvolumegroup: String::new(),
                subvolume: String::new(),
                path: "/".to_string(),
                provider: StorageProvider::SambaVfsClassic,
            }),
            comment: None,
            max_connections: None,
            login_control: None,
            custom_smb_share_options: None,
        }
    }

    #[test]
    fn test_valid_id() {
        assert!(valid_id("c1"));
        assert!(valid_id("my-cluster_2"));
        assert!(valid_id("0abc"));
        assert!(!valid_id(""));
        assert!(!valid_id("-leading"));
        assert!(!valid_id("has.dot"));
        assert!(!valid_id("has space"));
    }

    #[test]
    fn test_user_cluster_validates() {
        assert!(make_user_cluster("c1", "ug1").validate().is_ok());
    }

    #[test]
    fn test_user_cluster_rejects_domain_settings() {
        let mut c = make_user_cluster("c1", "ug1");
        c.domain_settings = Some(DomainSettings {
            realm: "X.Y".to_string(),
            join_sources: vec![],
        });
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_user_cluster_requires_sources() {
        let mut c = make_user_cluster("c1", "ug1");
        c.user_group_settings.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_ad_cluster_validates() {
        assert!(make_ad_cluster("c1", "DOM.EXAMPLE.COM", "ja1").validate().is_ok());
    }

    #[test]
    fn test_ad_cluster_requires_realm() {
        let c = make_ad_cluster("c1", "", "ja1");
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_ad_cluster_requires_join_sources() {
        let mut c = make_ad_cluster("c1", "DOM.EXAMPLE.COM", "ja1");
        c.domain_settings.as_mut().unwrap().join_sources.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_ad_cluster_rejects_user_group_settings() {
        let mut c = make_ad_cluster("c1", "DOM.EXAMPLE.COM", "ja1");
        c.user_group_settings.push(UserGroupSource {
            source_type: UserGroupSourceType::Empty,
            ref_: None,
        });
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_none_cluster_rejects_settings() {
        let mut c = make_user_cluster("c1", "ug1");
        c.auth_mode = AuthMode::None;
        assert!(c.validate().is_err());
        c.user_group_settings.clear();
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_clustering_modes() {
        let mut c = make_user_cluster("c1", "ug1");
        assert!(!c.is_clustered());
        c.placement = Some(Placement {
            count: Some(3),
            hosts: vec![],
            label: None,
        });
        assert!(c.is_clustered());
        c.clustering = Clustering::Never;
        assert!(!c.is_clustered());
        c.clustering = Clustering::Always;
        c.placement = None;
        assert!(c.is_clustered());
    }

    #[test]
    fn test_join_auth_refs() {
        let c = make_ad_cluster("c1", "DOM.EXAMPLE.COM", "ja1");
        assert_eq!(c.join_auth_refs(), vec!["ja1".to_string()]);
        assert!(c.users_groups_refs().is_empty());
    }

    #[test]
    fn test_users_groups_refs_skip_empty() {
        let mut c = make_user_cluster("c1", "ug1");
        c.user_group_settings.push(UserGroupSource {
            source_type: UserGroupSourceType::Empty,
            ref_: None,
        });
        assert_eq!(c.users_groups_refs(), vec!["ug1".to_string()]);
    }

    #[test]
    fn test_share_validates() {
        assert!(make_share("c1", "s1", "vol1").validate().is_ok());
    }

    #[test]
    fn test_share_requires_storage() {
        let mut s = make_share("c1", "s1", "vol1");
        s.cephfs = None;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_share_requires_volume() {
        let s = make_share("c1", "s1", "");
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_share_subvolumegroup_needs_subvolume() {
        let mut s = make_share("c1", "s1", "vol1");
        s.cephfs.as_mut().unwrap().subvolumegroup = "g1".to_string();
        assert!(s.validate().is_err());
        s.cephfs.as_mut().unwrap().subvolume = "sv1".to_string();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_share_display_name_defaults() {
        let mut s = make_share("c1", "s1", "vol1");
        assert_eq!(s.display_name(), "s1");
        s.name = Some("Public Files".to_string());
        assert_eq!(s.display_name(), "Public Files");
    }

    #[test]
    fn test_join_auth_requires_values() {
        let mut a = JoinAuth {
            auth_id: "ja1".to_string(),
            auth: None,
            linked_to_cluster: None,
        };
        assert!(a.validate().is_err());
        a.auth = Some(JoinAuthValues {
            username: "joiner".to_string(),
            password: "sekrit".to_string(),
        });
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_resource_tag_roundtrip() {
        let r = Resource::Share(make_share("c1", "s1", "vol1"));
        let doc = serde_json::to_value(&r).unwrap();
        assert_eq!(doc["resource_type"], "share");
        let back: Resource = serde_json::from_value(doc).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_removed_cluster_tag() {
        let doc = serde_json::json!({
            "resource_type": "removed-cluster",
            "cluster_id": "c9",
        });
        let r: Resource = serde_json::from_value(doc).unwrap();
        assert!(r.is_tombstone());
        assert_eq!(r.cluster_id(), Some("c9"));
        assert_eq!(r.resource_type(), ResourceType::Cluster);
    }

    #[test]
    fn test_describe() {
        let r = Resource::RemovedShare(RemovedShare {
            cluster_id: "c1".to_string(),
            share_id: "s1".to_string(),
        });
        assert_eq!(r.describe(), "removed-share.c1.s1");
    }

    mod props {
        use super::super::valid_id;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_generated_ids_are_valid(id in "[A-Za-z0-9][A-Za-z0-9_-]{0,15}") {
                prop_assert!(valid_id(&id));
            }

            #[test]
            fn prop_separator_characters_are_rejected(id in "[a-z]{1,8}") {
                let dot = format!("{}.x", id);
                let space = format!("{} x", id);
                let slash = format!("{}/x", id);
                prop_assert!(!valid_id(&dot));
                prop_assert!(!valid_id(&space));
                prop_assert!(!valid_id(&slash));
            }
        }
    }
}
