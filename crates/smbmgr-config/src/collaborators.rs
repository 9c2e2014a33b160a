//! External collaborator contracts: path resolution, earmark ownership,
//! access authorization, and orchestrator submission.
//!
//! The handler only ever talks to these traits. The stub implementations
//! mirror a real deployment closely enough for unit testing and act as
//! defaults when a collaborator is not wired up.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::spec::SmbServiceSpec;

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("path resolution failed: {0}")]
    PathResolution(String),
    #[error("earmark operation failed: {0}")]
    Earmark(String),
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("orchestrator error: {0}")]
    Orchestration(String),
}

/// Maps a logical volume location to a concrete filesystem path.
pub trait PathResolver: Send + Sync {
    fn resolve(
        &self,
        volume: &str,
        subvolumegroup: &str,
        subvolume: &str,
        path: &str,
    ) -> Result<String, ExternalError>;
}

/// Tracks which application has claimed a subvolume path.
pub trait EarmarkResolver: Send + Sync {
    fn get_earmark(&self, volume: &str, path: &str) -> Result<Option<String>, ExternalError>;
    fn set_earmark(&self, volume: &str, path: &str, earmark: &str) -> Result<(), ExternalError>;
    /// True if `earmark` belongs to the given top-level scope.
    fn check_earmark(&self, earmark: &str, top_level_scope: &str) -> bool;
}

/// Grants a named entity cryptographic access to a volume.
pub trait AccessAuthorizer: Send + Sync {
    fn authorize_entity(
        &self,
        volume: &str,
        entity: &str,
        caps: &str,
    ) -> Result<(), ExternalError>;
}

/// Submits service specs to the orchestration subsystem.
///
/// Submission is synchronous and idempotent; resubmitting an unchanged
/// spec is safe.
pub trait OrchSubmitter: Send + Sync {
    fn submit_spec(&self, spec: &SmbServiceSpec) -> Result<(), ExternalError>;
    fn remove_service(&self, service_name: &str) -> Result<(), ExternalError>;
}

/// Stub path resolver producing stable, realistic-looking paths.
pub struct PathResolverStub;

impl PathResolver for PathResolverStub {
    fn resolve(
        &self,
        volume: &str,
        subvolumegroup: &str,
        subvolume: &str,
        path: &str,
    ) -> Result<String, ExternalError> {
        let path = path.trim_start_matches('/');
        if !subvolumegroup.is_empty() || !subvolume.is_empty() {
            // mimic the uuid component of a real subvolume path by deriving
            // one from the values we have
            let seed = format!("cephfs+{}:{}:{}", volume, subvolumegroup, subvolume);
            let vid = Uuid::new_v3(&Uuid::NAMESPACE_URL, seed.as_bytes());
            let group = if subvolumegroup.is_empty() {
                "_nogroup"
            } else {
                subvolumegroup
            };
            return Ok(format!("/volumes/{}/{}/{}/{}", group, subvolume, vid, path));
        }
        Ok(format!("/{}", path))
    }
}

/// Stub earmark resolver keeping claims in memory.
#[derive(Default)]
pub struct EarmarkResolverStub {
    earmarks: Mutex<HashMap<(String, String), String>>,
}

impl EarmarkResolverStub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EarmarkResolver for EarmarkResolverStub {
    fn get_earmark(&self, volume: &str, path: &str) -> Result<Option<String>, ExternalError> {
        let earmarks = self
            .earmarks
            .lock()
            .map_err(|e| ExternalError::Earmark(e.to_string()))?;
        Ok(earmarks.get(&(volume.to_string(), path.to_string())).cloned())
    }

    fn set_earmark(&self, volume: &str, path: &str, earmark: &str) -> Result<(), ExternalError> {
        let mut earmarks = self
            .earmarks
            .lock()
            .map_err(|e| ExternalError::Earmark(e.to_string()))?;
        earmarks.insert(
            (volume.to_string(), path.to_string()),
            earmark.to_string(),
        );
        Ok(())
    }

    fn check_earmark(&self, earmark: &str, top_level_scope: &str) -> bool {
        earmark.split('.').next() == Some(top_level_scope)
    }
}

/// Stub authorizer recording every grant it is asked for.
#[derive(Default)]
pub struct AuthorizerStub {
    granted: Mutex<Vec<(String, String)>>,
}

impl AuthorizerStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(volume, entity)` pairs authorized so far.
    pub fn granted(&self) -> Vec<(String, String)> {
        self.granted.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl AccessAuthorizer for AuthorizerStub {
    fn authorize_entity(
        &self,
        volume: &str,
        entity: &str,
        _caps: &str,
    ) -> Result<(), ExternalError> {
        let mut granted = self
            .granted
            .lock()
            .map_err(|e| ExternalError::Authorization(e.to_string()))?;
        granted.push((volume.to_string(), entity.to_string()));
        Ok(())
    }
}

/// Stub orchestrator recording submissions and removals.
#[derive(Default)]
pub struct OrchSubmitterStub {
    submitted: Mutex<Vec<SmbServiceSpec>>,
    removed: Mutex<Vec<String>>,
}

impl OrchSubmitterStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<SmbServiceSpec> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl OrchSubmitter for OrchSubmitterStub {
    fn submit_spec(&self, spec: &SmbServiceSpec) -> Result<(), ExternalError> {
        let mut submitted = self
            .submitted
            .lock()
            .map_err(|e| ExternalError::Orchestration(e.to_string()))?;
        submitted.push(spec.clone());
        Ok(())
    }

    fn remove_service(&self, service_name: &str) -> Result<(), ExternalError> {
        let mut removed = self
            .removed
            .lock()
            .map_err(|e| ExternalError::Orchestration(e.to_string()))?;
        removed.push(service_name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_plain_path() {
        let r = PathResolverStub;
        assert_eq!(r.resolve("vol1", "", "", "/data").unwrap(), "/data");
        assert_eq!(r.resolve("vol1", "", "", "data").unwrap(), "/data");
        assert_eq!(r.resolve("vol1", "", "", "/").unwrap(), "/");
    }

    #[test]
    fn test_resolver_subvolume_path_is_stable() {
        let r = PathResolverStub;
        let a = r.resolve("vol1", "g1", "sv1", "/").unwrap();
        let b = r.resolve("vol1", "g1", "sv1", "/").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("/volumes/g1/sv1/"));
    }

    #[test]
    fn test_resolver_nogroup_placeholder() {
        let r = PathResolverStub;
        let p = r.resolve("vol1", "", "sv1", "x").unwrap();
        assert!(p.starts_with("/volumes/_nogroup/sv1/"));
        assert!(p.ends_with("/x"));
    }

    #[test]
    fn test_earmark_stub_roundtrip() {
        let e = EarmarkResolverStub::new();
        assert_eq!(e.get_earmark("vol1", "/p").unwrap(), None);
        e.set_earmark("vol1", "/p", "smb.cluster.c1").unwrap();
        assert_eq!(
            e.get_earmark("vol1", "/p").unwrap().as_deref(),
            Some("smb.cluster.c1")
        );
    }

    #[test]
    fn test_check_earmark_scope() {
        let e = EarmarkResolverStub::new();
        assert!(e.check_earmark("smb.cluster.c1", "smb"));
        assert!(e.check_earmark("smb", "smb"));
        assert!(!e.check_earmark("nfs.export.e1", "smb"));
    }

    #[test]
    fn test_authorizer_records_grants() {
        let a = AuthorizerStub::new();
        a.authorize_entity("vol1", "client.smb.fs.cluster.c1", "")
            .unwrap();
        assert_eq!(
            a.granted(),
            vec![("vol1".to_string(), "client.smb.fs.cluster.c1".to_string())]
        );
    }
}
