//! Resource-selector parsing and containment.
//!
//! Selectors come in three shapes: `<type>` (every resource of the type),
//! `<type>.<id>` (one resource, or every share under a cluster), and
//! `<type>.<id_a>.<id_b>` (one composite-keyed resource; shares only).
//! A matcher with no parsed selectors matches everything.

use std::collections::{BTreeSet, HashSet};

use crate::enums::ResourceType;
use crate::error::ConfigError;

#[derive(Debug, Default)]
pub struct Matcher {
    types: HashSet<ResourceType>,
    type_wild: HashSet<ResourceType>,
    ids: HashSet<(ResourceType, String)>,
    partial_wild: HashSet<(ResourceType, String)>,
    sub_ids: HashSet<(ResourceType, String, String)>,
    inputs: BTreeSet<String>,
}

impl Matcher {
    /// A matcher with match-all semantics until selectors are parsed in.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_match_all(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Parse one selector string into this matcher.
    pub fn parse(&mut self, txt: &str) -> Result<(), ConfigError> {
        if let Some(rt) = ResourceType::from_name(txt) {
            self.types.insert(rt);
            self.type_wild.insert(rt);
            self.inputs.insert(txt.to_string());
            return Ok(());
        }
        if let Some((prefix, id_a)) = txt.rsplit_once('.') {
            if let Some(rt) = ResourceType::from_name(prefix) {
                self.types.insert(rt);
                self.ids.insert((rt, id_a.to_string()));
                self.partial_wild.insert((rt, id_a.to_string()));
                self.inputs.insert(txt.to_string());
                return Ok(());
            }
            if let Some((prefix2, id_a2)) = prefix.rsplit_once('.') {
                if let Some(rt) = ResourceType::from_name(prefix2) {
                    if !rt.is_composite() {
                        return Err(ConfigError::InvalidResourceMatch {
                            input: txt.to_string(),
                        });
                    }
                    self.types.insert(rt);
                    self.sub_ids
                        .insert((rt, id_a2.to_string(), id_a.to_string()));
                    self.inputs.insert(txt.to_string());
                    return Ok(());
                }
            }
        }
        Err(ConfigError::InvalidResourceMatch {
            input: txt.to_string(),
        })
    }

    /// Whether any parsed selector is interested in this resource type.
    pub fn matches_type(&self, rt: ResourceType) -> bool {
        self.is_match_all() || self.types.contains(&rt)
    }

    /// Containment test for a singly-keyed resource.
    pub fn matches_id(&self, rt: ResourceType, id: &str) -> bool {
        self.is_match_all()
            || self.type_wild.contains(&rt)
            || self.ids.contains(&(rt, id.to_string()))
    }

    /// Containment test for a composite-keyed resource.
    pub fn matches_sub_id(&self, rt: ResourceType, id_a: &str, id_b: &str) -> bool {
        self.is_match_all()
            || self.type_wild.contains(&rt)
            || self.partial_wild.contains(&(rt, id_a.to_string()))
            || self
                .sub_ids
                .contains(&(rt, id_a.to_string(), id_b.to_string()))
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_match_all() {
            return f.write_str("match-all");
        }
        let inputs: Vec<&str> = self.inputs.iter().map(String::as_str).collect();
        write!(f, "match-resources:{}", inputs.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(selectors: &[&str]) -> Matcher {
        let mut m = Matcher::new();
        for s in selectors {
            m.parse(s).unwrap();
        }
        m
    }

    #[test]
    fn test_empty_matches_everything() {
        let m = Matcher::new();
        assert!(m.is_match_all());
        assert!(m.matches_type(ResourceType::Cluster));
        assert!(m.matches_id(ResourceType::Cluster, "anything"));
        assert!(m.matches_sub_id(ResourceType::Share, "a", "b"));
    }

    #[test]
    fn test_bare_type_matches_all_of_type() {
        let m = parsed(&["share"]);
        assert!(m.matches_type(ResourceType::Share));
        assert!(!m.matches_type(ResourceType::Cluster));
        assert!(m.matches_sub_id(ResourceType::Share, "c1", "s1"));
        assert!(m.matches_sub_id(ResourceType::Share, "c2", "zz"));
        assert!(!m.matches_id(ResourceType::Cluster, "c1"));
    }

    #[test]
    fn test_exact_share_selector() {
        let m = parsed(&["share.c1.s1"]);
        assert!(m.matches_sub_id(ResourceType::Share, "c1", "s1"));
        assert!(!m.matches_sub_id(ResourceType::Share, "c1", "s2"));
        assert!(!m.matches_sub_id(ResourceType::Share, "c2", "s1"));
    }

    #[test]
    fn test_partial_share_wildcard() {
        let m = parsed(&["share.c1"]);
        assert!(m.matches_sub_id(ResourceType::Share, "c1", "s1"));
        assert!(m.matches_sub_id(ResourceType::Share, "c1", "anything"));
        assert!(!m.matches_sub_id(ResourceType::Share, "c2", "s1"));
    }

    #[test]
    fn test_cluster_id_selector() {
        let m = parsed(&["cluster.c1"]);
        assert!(m.matches_type(ResourceType::Cluster));
        assert!(m.matches_id(ResourceType::Cluster, "c1"));
        assert!(!m.matches_id(ResourceType::Cluster, "c2"));
        assert!(!m.matches_sub_id(ResourceType::Share, "c1", "s1"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut m = Matcher::new();
        let err = m.parse("volume.v1").unwrap_err();
        assert!(err.to_string().contains("volume.v1"));
        // a failed parse leaves the matcher in match-all state
        assert!(m.is_match_all());
    }

    #[test]
    fn test_three_part_selector_only_for_shares() {
        let mut m = Matcher::new();
        assert!(m.parse("cluster.a.b").is_err());
        assert!(m.parse("join-auth.a.b").is_err());
        assert!(m.parse("share.a.b").is_ok());
    }

    #[test]
    fn test_empty_string_rejected() {
        let mut m = Matcher::new();
        assert!(m.parse("").is_err());
    }

    #[test]
    fn test_multiple_selectors_union() {
        let m = parsed(&["cluster.c1", "share.c2.s1"]);
        assert!(m.matches_id(ResourceType::Cluster, "c1"));
        assert!(m.matches_sub_id(ResourceType::Share, "c2", "s1"));
        assert!(!m.matches_sub_id(ResourceType::Share, "c1", "s1"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Matcher::new().to_string(), "match-all");
        let m = parsed(&["share.c1", "cluster"]);
        assert_eq!(m.to_string(), "match-resources:cluster,share.c1");
    }
}
