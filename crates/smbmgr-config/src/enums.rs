//! Closed discriminants shared across the resource model and sync pipeline.

use serde::{Deserialize, Serialize};

/// How clients authenticate against a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// No authentication; guest-style access.
    None,
    /// Locally defined users and groups.
    User,
    /// Domain-joined (Active Directory) authentication.
    ActiveDirectory,
}

impl Default for AuthMode {
    fn default() -> Self {
        AuthMode::User
    }
}

/// Which VFS backend a share uses to reach its storage volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageProvider {
    /// The classic in-tree ceph VFS module.
    SambaVfsClassic,
    /// The new ceph VFS module, linked directly against libcephfs.
    SambaVfsNew,
    /// The new ceph VFS module talking to a proxied libcephfs.
    SambaVfsProxied,
}

impl StorageProvider {
    /// VFS module name as it appears in `vfs objects`.
    pub fn vfs_module(&self) -> &'static str {
        match self {
            StorageProvider::SambaVfsClassic => "ceph",
            StorageProvider::SambaVfsNew | StorageProvider::SambaVfsProxied => "ceph_new",
        }
    }

    /// Whether this provider routes through the proxied libcephfs daemon.
    pub fn is_proxied(&self) -> bool {
        matches!(self, StorageProvider::SambaVfsProxied)
    }
}

impl Default for StorageProvider {
    fn default() -> Self {
        StorageProvider::SambaVfsClassic
    }
}

/// Where a cluster's domain-join credential comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinSourceType {
    /// A named `JoinAuth` resource.
    Resource,
}

/// Where a cluster's user/group definitions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserGroupSourceType {
    /// A named `UsersAndGroups` resource.
    Resource,
    /// Explicitly no users or groups.
    Empty,
}

/// Access level granted to one login-control principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginAccess {
    None,
    #[serde(rename = "read")]
    ReadOnly,
    #[serde(rename = "read-write")]
    ReadWrite,
    Admin,
}

/// Kind of principal named by a login-control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginCategory {
    User,
    Group,
}

impl Default for LoginCategory {
    fn default() -> Self {
        LoginCategory::User
    }
}

/// Whether a multi-node clustering layer is enabled for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Clustering {
    /// Clustered when the placement spans more than one node.
    Default,
    Always,
    Never,
}

impl Default for Clustering {
    fn default() -> Self {
        Clustering::Default
    }
}

/// Outcome of committing one resource to the internal store.
///
/// `Present` and `NotPresent` are the no-op states: the store already
/// matched the request and nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    Created,
    Updated,
    Removed,
    Present,
    NotPresent,
}

impl State {
    /// True for states that changed nothing observable in the store.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, State::Present | State::NotPresent)
    }
}

/// The four addressable resource kinds understood by selectors.
///
/// Tombstone variants share the type of the resource they remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Cluster,
    Share,
    JoinAuth,
    UsersGroups,
}

impl ResourceType {
    /// Selector-string name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Cluster => "cluster",
            ResourceType::Share => "share",
            ResourceType::JoinAuth => "join-auth",
            ResourceType::UsersGroups => "users-groups",
        }
    }

    /// Parse a selector-string type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cluster" => Some(ResourceType::Cluster),
            "share" => Some(ResourceType::Share),
            "join-auth" => Some(ResourceType::JoinAuth),
            "users-groups" => Some(ResourceType::UsersGroups),
            _ => None,
        }
    }

    /// True for types keyed by a two-part composite id.
    pub fn is_composite(&self) -> bool {
        matches!(self, ResourceType::Share)
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
