//! Service specification handed to the orchestration subsystem.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resources::{Cluster, ClusterPublicIp, Placement};
use crate::store::EntryRef;

/// Deployment features a cluster's service may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Domain-joined (Active Directory) service.
    Domain,
    /// Multi-node clustered service (ctdb).
    Clustered,
    /// Storage access through the proxied libcephfs daemon.
    CephfsProxy,
}

/// Everything the orchestrator needs to deploy one cluster's service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmbServiceSpec {
    pub service_id: String,
    pub placement: Placement,
    pub cluster_id: String,
    pub features: Vec<Feature>,
    /// Location of the configuration document the service consumes.
    pub config_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub join_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_ports: Option<BTreeMap<String, u16>>,
    /// Entities that must hold access to the storage volumes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_entities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_public_addrs: Option<Vec<ClusterPublicIp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addrs: Option<Vec<String>>,
}

impl SmbServiceSpec {
    /// Orchestrator-facing service name.
    pub fn service_name(&self) -> String {
        format!("smb.{}", self.service_id)
    }
}

/// Assemble the service spec for one cluster.
///
/// `config_entries` is ordered from lowest to highest priority; the
/// highest-priority entry that exists provides the config URI. Join and
/// user source URIs are passed through as collected by the sync pass.
pub fn generate_service_spec(
    cluster: &Cluster,
    config_entries: &[EntryRef],
    join_sources: Vec<String>,
    user_sources: Vec<String>,
    data_entity: &str,
    needs_proxy: bool,
) -> Result<SmbServiceSpec, ConfigError> {
    let mut features = Vec::new();
    if cluster.auth_mode == crate::enums::AuthMode::ActiveDirectory {
        features.push(Feature::Domain);
    }
    if cluster.is_clustered() {
        features.push(Feature::Clustered);
    }
    if needs_proxy {
        features.push(Feature::CephfsProxy);
    }

    let mut config_uri = String::new();
    for entry in config_entries {
        if entry.exists {
            config_uri = entry.uri.clone();
        }
    }
    if config_uri.is_empty() {
        return Err(ConfigError::NoConfigAvailable {
            cluster_id: cluster.cluster_id.clone(),
        });
    }

    let access_entities = if data_entity.is_empty() {
        None
    } else {
        Some(vec![data_entity.to_string()])
    };

    Ok(SmbServiceSpec {
        service_id: cluster.cluster_id.clone(),
        placement: cluster.placement.clone().unwrap_or_default(),
        cluster_id: cluster.cluster_id.clone(),
        features,
        config_uri,
        join_sources,
        user_sources,
        custom_dns: cluster.custom_dns.clone(),
        custom_ports: cluster.custom_ports.clone(),
        access_entities,
        cluster_public_addrs: cluster.service_spec_public_addrs(),
        bind_addrs: cluster.service_spec_bind_addrs(),
    })
}
