//! Shared fixtures for the integration tests.

use std::sync::Arc;

use smbmgr_config::collaborators::{AuthorizerStub, OrchSubmitterStub};
use smbmgr_config::enums::{
    AuthMode, Clustering, JoinSourceType, StorageProvider, UserGroupSourceType,
};
use smbmgr_config::resources::{
    CephFsStorage, Cluster, DomainSettings, GroupEntry, JoinAuth, JoinAuthValues, JoinSource,
    RemovedCluster, RemovedShare, Share, UserEntry, UserGroupSource, UserGroupValues,
    UsersAndGroups,
};
use smbmgr_config::store::MemConfigStore;
use smbmgr_config::{ClusterConfigHandler, Resource};

/// Initialize tracing output for tests; safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// A handler wired to in-memory stores and recording stubs.
pub struct TestHarness {
    pub handler: ClusterConfigHandler,
    pub internal: Arc<MemConfigStore>,
    pub public: Arc<MemConfigStore>,
    pub private: Arc<MemConfigStore>,
    pub orch: Arc<OrchSubmitterStub>,
    pub authorizer: Arc<AuthorizerStub>,
}

impl TestHarness {
    /// Harness with orchestrator submission enabled.
    pub fn with_orch() -> Self {
        Self::build(true)
    }

    /// Harness without an orchestrator; artifacts only.
    pub fn without_orch() -> Self {
        Self::build(false)
    }

    fn build(orch_enabled: bool) -> Self {
        init_logging();
        let internal = Arc::new(MemConfigStore::with_prefix("internal"));
        let public = Arc::new(MemConfigStore::with_prefix("public"));
        let private = Arc::new(MemConfigStore::with_prefix("priv"));
        let orch = Arc::new(OrchSubmitterStub::new());
        let authorizer = Arc::new(AuthorizerStub::new());
        let mut handler = ClusterConfigHandler::new(
            internal.clone(),
            public.clone(),
            private.clone(),
        )
        .with_authorizer(authorizer.clone());
        if orch_enabled {
            handler = handler.with_orch(orch.clone());
        }
        tracing::debug!(orch_enabled, "test harness ready");
        Self {
            handler,
            internal,
            public,
            private,
            orch,
            authorizer,
        }
    }
}

pub fn users_and_groups(id: &str) -> Resource {
    Resource::UsersAndGroups(UsersAndGroups {
        users_groups_id: id.to_string(),
        values: Some(UserGroupValues {
            users: vec![UserEntry {
                name: "alice".to_string(),
                password: "c0ffee".to_string(),
            }],
            groups: vec![GroupEntry {
                name: "staff".to_string(),
            }],
        }),
        linked_to_cluster: None,
    })
}

pub fn join_auth(id: &str) -> Resource {
    Resource::JoinAuth(JoinAuth {
        auth_id: id.to_string(),
        auth: Some(JoinAuthValues {
            username: "joiner".to_string(),
            password: "j0in-me".to_string(),
        }),
        linked_to_cluster: None,
    })
}

pub fn user_cluster(cluster_id: &str, ug_ref: &str) -> Resource {
    Resource::Cluster(Cluster {
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
    })
}

pub fn ad_cluster(cluster_id: &str, realm: &str, auth_refs: &[&str]) -> Resource {
    Resource::Cluster(Cluster {
        cluster_id: cluster_id.to_string(),
        auth_mode: AuthMode::ActiveDirectory,
        domain_settings: Some(DomainSettings {
            realm: realm.to_string(),
            join_sources: auth_refs
                .iter()
                .map(|r| JoinSource {
                    source_type: JoinSourceType::Resource,
                    ref_: r.to_string(),
                })
                .collect(),
        }),
        user_group_settings: vec![],
        custom_dns: None,
        custom_ports: None,
        placement: None,
        clustering: Clustering::Default,
        public_addrs: vec![],
        custom_smb_global_options: None,
    })
}

pub fn share(cluster_id: &str, share_id: &str, volume: &str) -> Resource {
    share_with_provider(cluster_id, share_id, volume, StorageProvider::SambaVfsClassic)
}

pub fn share_with_provider(
    cluster_id: &str,
    share_id: &str,
    volume: &str,
    provider: StorageProvider,
) -> Resource {
    Resource::Share(Share {
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
            provider,
        }),
        comment: None,
        max_connections: None,
        login_control: None,
        custom_smb_share_options: None,
    })
}

pub fn removed_cluster(cluster_id: &str) -> Resource {
    Resource::RemovedCluster(RemovedCluster {
        cluster_id: cluster_id.to_string(),
    })
}

pub fn removed_share(cluster_id: &str, share_id: &str) -> Resource {
    Resource::RemovedShare(RemovedShare {
        cluster_id: cluster_id.to_string(),
        share_id: share_id.to_string(),
    })
}
