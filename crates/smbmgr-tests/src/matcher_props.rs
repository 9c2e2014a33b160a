//! Property tests for selector matching and batch ordering.

use proptest::prelude::*;

use crate::common::{
    join_auth, removed_cluster, removed_share, share, user_cluster, users_and_groups,
};
use smbmgr_config::enums::ResourceType;
use smbmgr_config::matcher::Matcher;
use smbmgr_config::staging::order_resources;
use smbmgr_config::Resource;

fn arb_id() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_-]{0,7}").unwrap()
}

fn arb_resource() -> impl Strategy<Value = Resource> {
    (0..6u8, arb_id(), arb_id()).prop_map(|(kind, a, b)| match kind {
        0 => user_cluster(&a, "ug1"),
        1 => share(&a, &b, "vol1"),
        2 => removed_cluster(&a),
        3 => removed_share(&a, &b),
        4 => join_auth(&a),
        _ => users_and_groups(&a),
    })
}

fn weight(resource: &Resource) -> i32 {
    match resource {
        Resource::RemovedShare(_) => -2,
        Resource::RemovedCluster(_) => -1,
        Resource::JoinAuth(_) | Resource::UsersAndGroups(_) => 0,
        Resource::Cluster(_) => 1,
        Resource::Share(_) => 2,
    }
}

proptest! {
    #[test]
    fn prop_exact_share_selector_roundtrip(
        a in arb_id(),
        b in arb_id(),
        other in arb_id(),
    ) {
        let mut m = Matcher::new();
        m.parse(&format!("share.{}.{}", a, b)).unwrap();
        prop_assert!(m.matches_sub_id(ResourceType::Share, &a, &b));
        prop_assume!(other != b);
        prop_assert!(!m.matches_sub_id(ResourceType::Share, &a, &other));
    }

    #[test]
    fn prop_partial_selector_matches_any_share_under_cluster(
        a in arb_id(),
        b in arb_id(),
    ) {
        let mut m = Matcher::new();
        m.parse(&format!("share.{}", a)).unwrap();
        prop_assert!(m.matches_sub_id(ResourceType::Share, &a, &b));
        // a share selector never matches other resource types
        prop_assert!(!m.matches_id(ResourceType::Cluster, &a));
    }

    #[test]
    fn prop_bare_type_selector_matches_every_id(id in arb_id()) {
        for (name, rt) in [
            ("cluster", ResourceType::Cluster),
            ("join-auth", ResourceType::JoinAuth),
            ("users-groups", ResourceType::UsersGroups),
        ] {
            let mut m = Matcher::new();
            m.parse(name).unwrap();
            prop_assert!(m.matches_id(rt, &id));
        }
    }

    #[test]
    fn prop_selector_with_id_never_crosses_types(a in arb_id()) {
        let mut m = Matcher::new();
        m.parse(&format!("cluster.{}", a)).unwrap();
        prop_assert!(m.matches_id(ResourceType::Cluster, &a));
        prop_assert!(!m.matches_id(ResourceType::JoinAuth, &a));
        prop_assert!(!m.matches_id(ResourceType::UsersGroups, &a));
    }

    #[test]
    fn prop_ordering_is_a_weight_sorted_permutation(
        batch in prop::collection::vec(arb_resource(), 0..12),
    ) {
        let ordered = order_resources(batch.clone());
        let mut before: Vec<String> = batch.iter().map(Resource::describe).collect();
        let mut after: Vec<String> = ordered.iter().map(Resource::describe).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
        let weights: Vec<i32> = ordered.iter().map(weight).collect();
        prop_assert!(weights.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_ordering_places_clusters_before_their_shares(
        cluster_id in arb_id(),
        share_ids in prop::collection::vec(arb_id(), 1..4),
    ) {
        let mut batch: Vec<Resource> = share_ids
            .iter()
            .map(|sid| share(&cluster_id, sid, "vol1"))
            .collect();
        batch.push(user_cluster(&cluster_id, "ug1"));
        let ordered = order_resources(batch);
        let cluster_pos = ordered
            .iter()
            .position(|r| matches!(r, Resource::Cluster(_)))
            .unwrap();
        for (pos, resource) in ordered.iter().enumerate() {
            if matches!(resource, Resource::Share(_)) {
                prop_assert!(cluster_pos < pos);
            }
        }
    }
}
