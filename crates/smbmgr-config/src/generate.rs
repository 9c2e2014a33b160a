//! Generation of the per-cluster configuration document consumed by the
//! deployed service containers.

use serde_json::{json, Map, Value};

use crate::collaborators::PathResolver;
use crate::enums::{AuthMode, LoginAccess, LoginCategory, StorageProvider};
use crate::error::ConfigError;
use crate::resources::{Cluster, Share};

/// Document-format marker carried by every generated artifact.
pub const CONTAINER_CONFIG_VERSION: &str = "v0";

/// Default SMB port used when a cluster does not override it.
pub const DEFAULT_SMB_PORT: u16 = 445;

pub fn ynbool(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Name of the access entity a cluster's services use for data access.
pub fn data_entity(cluster_id: &str) -> String {
    format!("client.smb.fs.cluster.{}", cluster_id)
}

pub fn smb_port(cluster: &Cluster) -> u16 {
    cluster
        .custom_ports
        .as_ref()
        .and_then(|ports| ports.get("smb").copied())
        .unwrap_or(DEFAULT_SMB_PORT)
}

/// True if any share reaches its storage through the proxied provider.
pub fn has_proxied_vfs(shares: &[Share]) -> bool {
    shares.iter().any(|s| {
        s.cephfs
            .as_ref()
            .map(|c| c.provider.is_proxied())
            .unwrap_or(false)
    })
}

fn insert(options: &mut Map<String, Value>, key: impl Into<String>, value: impl Into<String>) {
    options.insert(key.into(), Value::String(value.into()));
}

/// Generate the options section for one share.
pub fn generate_share(
    share: &Share,
    resolver: &dyn PathResolver,
    entity: &str,
) -> Result<Value, ConfigError> {
    let storage = share.checked_storage()?;
    // the ceph VFS modules must NOT see the "client." bit in front of the
    // entity name
    let entity = entity.strip_prefix("client.").unwrap_or(entity);
    let path = resolver.resolve(
        &storage.volume,
        &storage.subvolumegroup,
        &storage.subvolume,
        &storage.path,
    )?;
    let vfs = storage.provider.vfs_module();
    let proxy = match storage.provider {
        StorageProvider::SambaVfsClassic => None,
        StorageProvider::SambaVfsNew => Some("no"),
        StorageProvider::SambaVfsProxied => Some("yes"),
    };

    let mut options = Map::new();
    insert(&mut options, "path", path);
    insert(
        &mut options,
        "vfs objects",
        format!("acl_xattr ceph_snapshots {}", vfs),
    );
    insert(&mut options, "acl_xattr:security_acl_name", "user.NTACL");
    insert(&mut options, format!("{}:config_file", vfs), "/etc/ceph/ceph.conf");
    insert(&mut options, format!("{}:filesystem", vfs), storage.volume.clone());
    insert(&mut options, format!("{}:user_id", vfs), entity);
    insert(&mut options, "read only", ynbool(share.readonly));
    insert(&mut options, "browseable", ynbool(share.browseable));
    insert(&mut options, "kernel share modes", "no");
    insert(
        &mut options,
        "x:ceph:id",
        format!("{}.{}", share.cluster_id, share.share_id),
    );
    insert(&mut options, "smbd profiling share", "yes");
    if let Some(comment) = &share.comment {
        insert(&mut options, "comment", comment.clone());
    }
    if let Some(max) = share.max_connections {
        insert(&mut options, "max connections", max.to_string());
    }
    if let Some(proxy) = proxy {
        insert(&mut options, format!("{}:proxy", vfs), proxy);
    }
    generate_share_login_control(share, &mut options);
    if let Some(custom) = &share.custom_smb_share_options {
        if !custom.is_empty() {
            for (k, v) in custom {
                insert(&mut options, k.clone(), v.clone());
            }
            insert(&mut options, "x:ceph:has_custom_options", "yes");
        }
    }
    Ok(json!({ "options": options }))
}

fn generate_share_login_control(share: &Share, options: &mut Map<String, Value>) {
    let mut valid_users: Vec<String> = Vec::new();
    let mut invalid_users: Vec<String> = Vec::new();
    let mut read_list: Vec<String> = Vec::new();
    let mut write_list: Vec<String> = Vec::new();
    let mut admin_users: Vec<String> = Vec::new();
    for entry in share.login_control.as_deref().unwrap_or_default() {
        let name = match entry.category {
            LoginCategory::Group => format!("@{}", entry.name),
            LoginCategory::User => entry.name.clone(),
        };
        match entry.access {
            LoginAccess::None => {
                invalid_users.push(name);
                continue;
            }
            LoginAccess::Admin => admin_users.push(name.clone()),
            LoginAccess::ReadOnly => read_list.push(name.clone()),
            LoginAccess::ReadWrite => write_list.push(name.clone()),
        }
        if share.restrict_access {
            valid_users.push(name);
        }
    }
    if !valid_users.is_empty() {
        insert(options, "valid users", valid_users.join(" "));
    }
    if !invalid_users.is_empty() {
        insert(options, "invalid users", invalid_users.join(" "));
    }
    if !read_list.is_empty() {
        insert(options, "read list", read_list.join(" "));
    }
    if !write_list.is_empty() {
        insert(options, "write list", write_list.join(" "));
    }
    if !admin_users.is_empty() {
        insert(options, "admin users", admin_users.join(" "));
    }
}

/// Generate the full configuration document for one cluster.
pub fn generate_config(
    cluster: &Cluster,
    shares: &[Share],
    resolver: &dyn PathResolver,
    entity: &str,
) -> Result<Value, ConfigError> {
    let mut cluster_global_opts = Map::new();
    if cluster.auth_mode == AuthMode::ActiveDirectory {
        let realm = cluster
            .domain_settings
            .as_ref()
            .map(|ds| ds.realm.clone())
            .unwrap_or_default();
        let workgroup = realm
            .to_uppercase()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        insert(&mut cluster_global_opts, "security", "ads");
        insert(&mut cluster_global_opts, "realm", realm);
        insert(&mut cluster_global_opts, "workgroup", workgroup);
        insert(&mut cluster_global_opts, "idmap config * : backend", "autorid");
        insert(&mut cluster_global_opts, "idmap config * : range", "2000-9999999");
    }
    if cluster.is_clustered() && cluster.custom_ports.is_some() {
        // host-networked ctdb clusters with custom ports change the port at
        // the smbd level
        insert(&mut cluster_global_opts, "smb ports", smb_port(cluster).to_string());
    }

    let mut share_configs = Map::new();
    for share in shares {
        share_configs.insert(
            share.display_name().to_string(),
            generate_share(share, resolver, entity)?,
        );
    }
    let share_names: Vec<Value> = share_configs
        .keys()
        .map(|name| Value::String(name.clone()))
        .collect();

    let mut instance_features: Vec<Value> = Vec::new();
    if cluster.is_clustered() {
        instance_features.push(Value::String("ctdb".to_string()));
    }
    let mut globals_list = vec![
        Value::String("default".to_string()),
        Value::String(cluster.cluster_id.clone()),
    ];

    let mut globals = Map::new();
    globals.insert(
        "default".to_string(),
        json!({
            "options": {
                "load printers": "No",
                "printing": "bsd",
                "printcap name": "/dev/null",
                "disable spoolss": "Yes",
                "smbd profiling level": "on",
            }
        }),
    );
    globals.insert(
        cluster.cluster_id.clone(),
        json!({ "options": cluster_global_opts }),
    );
    if let Some(custom) = &cluster.custom_smb_global_options {
        if !custom.is_empty() {
            // isolate custom options into their own section
            let section = format!("{}_custom", cluster.cluster_id);
            globals_list.push(Value::String(section.clone()));
            globals.insert(section, json!({ "options": custom }));
        }
    }

    let mut instance = Map::new();
    instance.insert(
        "instance_name".to_string(),
        Value::String(cluster.cluster_id.clone()),
    );
    instance.insert(
        "instance_features".to_string(),
        Value::Array(instance_features),
    );
    instance.insert("globals".to_string(), Value::Array(globals_list));
    instance.insert("shares".to_string(), Value::Array(share_names));
    let mut configs = Map::new();
    configs.insert(cluster.cluster_id.clone(), Value::Object(instance));

    Ok(json!({
        "samba-container-config": CONTAINER_CONFIG_VERSION,
        "configs": configs,
        "globals": globals,
        "shares": share_configs,
    }))
}
