//! End-to-end scenarios: apply batches, inspect derived artifacts, check
//! orchestrator gating and external-store garbage collection.

use crate::common::{
    ad_cluster, join_auth, removed_cluster, removed_share, share, share_with_provider,
    user_cluster, users_and_groups, TestHarness,
};
use smbmgr_config::enums::{State, StorageProvider};
use smbmgr_config::external;
use smbmgr_config::resources::{UserEntry, UserGroupValues, UsersAndGroups};
use smbmgr_config::spec::Feature;
use smbmgr_config::store::{ConfigStore, EntryKey};
use smbmgr_config::Resource;

#[test]
fn test_end_to_end_user_cluster_with_share() -> anyhow::Result<()> {
    let h = TestHarness::with_orch();
    let results = h.handler.apply(
        vec![
            users_and_groups("ug1"),
            user_cluster("c1", "ug1"),
            share("c1", "s1", "vol1"),
        ],
        false,
    )?;
    assert!(results.success());

    // the public store holds the generated configuration document
    let config = h.public.get(&external::config_key("c1"))?;
    let options = &config["shares"]["s1"]["options"];
    assert_eq!(options["read only"], "no");
    let vfs = options["vfs objects"].as_str().unwrap();
    assert!(vfs.contains("ceph"), "vfs objects missing ceph: {}", vfs);

    // the private store holds exactly one persisted user/group entry
    let priv_names = h.private.contents("c1")?;
    assert_eq!(priv_names, vec!["users-and-groups.0.json"]);
    let ug_doc = h.private.get(&external::users_groups_source_key("c1", 0))?;
    assert_eq!(ug_doc["samba-container-config"], "v0");
    assert_eq!(ug_doc["users"]["all_entries"][0]["name"], "alice");
    Ok(())
}

#[test]
fn test_batch_order_is_irrelevant() {
    // a share referencing a cluster created in the same call validates in
    // either input order
    for batch in [
        vec![
            share("c1", "s1", "vol1"),
            user_cluster("c1", "ug1"),
            users_and_groups("ug1"),
        ],
        vec![
            users_and_groups("ug1"),
            user_cluster("c1", "ug1"),
            share("c1", "s1", "vol1"),
        ],
    ] {
        let h = TestHarness::without_orch();
        let results = h.handler.apply(batch, false).unwrap();
        assert!(results.success());
    }
}

#[test]
fn test_invalid_batch_commits_nothing() {
    let h = TestHarness::without_orch();
    h.handler
        .apply(vec![users_and_groups("ug1"), user_cluster("c1", "ug1")], false)
        .unwrap();
    let resources_before = h.handler.all_resources().unwrap();
    let public_before = h.public.contents("c1").unwrap();

    // the second share references a cluster that does not exist; the whole
    // batch must be discarded, including the valid first share
    let results = h
        .handler
        .apply(
            vec![share("c1", "s1", "vol1"), share("ghost", "s1", "vol1")],
            false,
        )
        .unwrap();
    assert!(!results.success());
    assert_eq!(h.handler.all_resources().unwrap(), resources_before);
    assert_eq!(h.public.contents("c1").unwrap(), public_before);
}

#[test]
fn test_create_only_rejects_changed_duplicate() {
    let h = TestHarness::without_orch();
    h.handler
        .apply(vec![users_and_groups("ug1"), user_cluster("c1", "ug1")], false)
        .unwrap();
    let results = h
        .handler
        .apply(vec![user_cluster("c1", "ug1")], true)
        .unwrap();
    assert!(!results.success());
}

#[test]
fn test_orch_submission_gating() {
    let h = TestHarness::with_orch();

    // a cluster with no storage volumes never triggers a submission
    h.handler
        .apply(vec![users_and_groups("ug1"), user_cluster("c1", "ug1")], false)
        .unwrap();
    assert!(h.orch.submitted().is_empty());
    let info = h.public.get(&external::cluster_info_key("c1")).unwrap();
    assert_eq!(info["orch_needed"], false);

    // the first volume triggers exactly one submission
    h.handler
        .apply(vec![share("c1", "s1", "vol1")], false)
        .unwrap();
    assert_eq!(h.orch.submitted().len(), 1);
    let info = h.public.get(&external::cluster_info_key("c1")).unwrap();
    assert_eq!(info["orch_needed"], true);

    // removing the last volume still submits an update, because the
    // previous round had already deployed
    h.handler
        .apply(vec![removed_share("c1", "s1")], false)
        .unwrap();
    assert_eq!(h.orch.submitted().len(), 2);
    let spec = &h.orch.submitted()[1];
    assert_eq!(spec.access_entities, None);
}

#[test]
fn test_artifacts_written_even_without_volumes() {
    // config and spec backup are always written; only submission is gated
    let h = TestHarness::with_orch();
    h.handler
        .apply(vec![users_and_groups("ug1"), user_cluster("c1", "ug1")], false)
        .unwrap();
    assert!(h.public.exists(&external::config_key("c1")).unwrap());
    assert!(h.public.exists(&external::spec_backup_key("c1")).unwrap());
    assert!(h.orch.submitted().is_empty());
}

#[test]
fn test_volume_access_is_authorized() {
    let h = TestHarness::with_orch();
    h.handler
        .apply(
            vec![
                users_and_groups("ug1"),
                user_cluster("c1", "ug1"),
                share("c1", "s1", "vol1"),
            ],
            false,
        )
        .unwrap();
    let granted = h.authorizer.granted();
    assert!(granted.contains(&("vol1".to_string(), "client.smb.fs.cluster.c1".to_string())));
    let spec = &h.orch.submitted()[0];
    assert_eq!(
        spec.access_entities,
        Some(vec!["client.smb.fs.cluster.c1".to_string()])
    );
}

#[test]
fn test_reapply_is_idempotent() {
    let h = TestHarness::with_orch();
    let batch = vec![
        users_and_groups("ug1"),
        user_cluster("c1", "ug1"),
        share("c1", "s1", "vol1"),
    ];
    h.handler.apply(batch.clone(), false).unwrap();
    let config_first = h.public.get(&external::config_key("c1")).unwrap();
    let spec_first = h.public.get(&external::spec_backup_key("c1")).unwrap();
    let submissions_first = h.orch.submitted().len();

    let results = h.handler.apply(batch, false).unwrap();
    assert!(results.success());
    for result in results.iter() {
        assert_eq!(result.state, Some(State::Present));
    }
    // nothing observable changed: artifacts identical, no new submission
    assert_eq!(h.public.get(&external::config_key("c1")).unwrap(), config_first);
    assert_eq!(
        h.public.get(&external::spec_backup_key("c1")).unwrap(),
        spec_first
    );
    assert_eq!(h.orch.submitted().len(), submissions_first);
}

#[test]
fn test_credential_edit_resyncs_every_cluster() {
    let h = TestHarness::with_orch();
    h.handler
        .apply(
            vec![
                users_and_groups("ug1"),
                user_cluster("c1", "ug1"),
                user_cluster("c2", "ug1"),
                share("c1", "s1", "vol1"),
                share("c2", "s1", "vol1"),
            ],
            false,
        )
        .unwrap();
    assert_eq!(h.orch.submitted().len(), 2);

    // change the shared users/groups payload; both clusters re-sync
    let changed = Resource::UsersAndGroups(UsersAndGroups {
        users_groups_id: "ug1".to_string(),
        values: Some(UserGroupValues {
            users: vec![UserEntry {
                name: "bob".to_string(),
                password: "n3w".to_string(),
            }],
            groups: vec![],
        }),
        linked_to_cluster: None,
    });
    h.handler.apply(vec![changed], false).unwrap();
    assert_eq!(h.orch.submitted().len(), 4);
    let ug_doc = h
        .private
        .get(&external::users_groups_source_key("c2", 0))
        .unwrap();
    assert_eq!(ug_doc["users"]["all_entries"][0]["name"], "bob");
}

#[test]
fn test_ad_cluster_persists_join_credentials() -> anyhow::Result<()> {
    let h = TestHarness::with_orch();
    let results = h.handler.apply(
        vec![
            join_auth("ja1"),
            join_auth("ja2"),
            ad_cluster("c1", "dom.example.com", &["ja1", "ja2"]),
            share("c1", "s1", "vol1"),
        ],
        false,
    )?;
    assert!(results.success());

    let names = h.private.contents("c1")?;
    assert_eq!(names, vec!["join.0.json", "join.1.json"]);
    let join_doc = h.private.get(&external::join_source_key("c1", 0))?;
    assert_eq!(join_doc["username"], "joiner");

    let config = h.public.get(&external::config_key("c1"))?;
    assert_eq!(config["globals"]["c1"]["options"]["security"], "ads");

    let spec = &h.orch.submitted()[0];
    assert!(spec.features.contains(&Feature::Domain));
    assert_eq!(spec.join_sources.len(), 2);
    assert!(spec.join_sources[0].ends_with("join.0.json"));
    Ok(())
}

#[test]
fn test_stale_private_entries_garbage_collected() {
    let h = TestHarness::without_orch();
    h.handler
        .apply(
            vec![
                join_auth("ja1"),
                join_auth("ja2"),
                ad_cluster("c1", "dom.example.com", &["ja1", "ja2"]),
            ],
            false,
        )
        .unwrap();
    assert_eq!(h.private.contents("c1").unwrap().len(), 2);

    // shrink the join-source list; the stale entry disappears on re-sync
    h.handler
        .apply(vec![ad_cluster("c1", "dom.example.com", &["ja1"])], false)
        .unwrap();
    assert_eq!(h.private.contents("c1").unwrap(), vec!["join.0.json"]);
}

#[test]
fn test_cluster_removal_tears_down_service() {
    let h = TestHarness::with_orch();
    h.handler
        .apply(
            vec![
                users_and_groups("ug1"),
                user_cluster("c1", "ug1"),
                share("c1", "s1", "vol1"),
            ],
            false,
        )
        .unwrap();
    assert_eq!(h.orch.submitted().len(), 1);

    let results = h
        .handler
        .apply(
            vec![removed_share("c1", "s1"), removed_cluster("c1")],
            false,
        )
        .unwrap();
    assert!(results.success());
    assert_eq!(h.orch.removed(), vec!["smb.c1".to_string()]);
    assert!(h.public.contents("c1").unwrap().is_empty());
    assert!(h.private.contents("c1").unwrap().is_empty());
    assert!(h.handler.cluster_ids().unwrap().is_empty());
}

#[test]
fn test_removing_cluster_prunes_its_shares() {
    let h = TestHarness::without_orch();
    h.handler
        .apply(
            vec![
                users_and_groups("ug1"),
                user_cluster("c1", "ug1"),
                share("c1", "s1", "vol1"),
                share("c1", "s2", "vol1"),
            ],
            false,
        )
        .unwrap();
    h.handler
        .apply(vec![removed_cluster("c1")], false)
        .unwrap();
    assert!(h.handler.share_ids().unwrap().is_empty());
}

#[test]
fn test_sync_all_removes_stray_external_clusters() {
    let h = TestHarness::without_orch();
    h.handler
        .apply(vec![users_and_groups("ug1"), user_cluster("c1", "ug1")], false)
        .unwrap();
    // an external namespace with no internal counterpart, e.g. left behind
    // by a crashed removal
    h.public
        .set(
            &EntryKey::new("ghost", "config.smb"),
            serde_json::json!({"stale": true}),
        )
        .unwrap();
    h.private
        .set(
            &EntryKey::new("ghost", "join.0.json"),
            serde_json::json!({"stale": true}),
        )
        .unwrap();

    h.handler.sync_all().unwrap();
    assert!(h.public.contents("ghost").unwrap().is_empty());
    assert!(h.private.contents("ghost").unwrap().is_empty());
    // the live cluster's artifacts survive a full sync
    assert!(h.public.exists(&external::config_key("c1")).unwrap());
}

#[test]
fn test_proxied_provider_sets_feature_flag() {
    let h = TestHarness::with_orch();
    h.handler
        .apply(
            vec![
                users_and_groups("ug1"),
                user_cluster("c1", "ug1"),
                share_with_provider("c1", "s1", "vol1", StorageProvider::SambaVfsProxied),
            ],
            false,
        )
        .unwrap();
    let spec = &h.orch.submitted()[0];
    assert!(spec.features.contains(&Feature::CephfsProxy));
    let config = h.public.get(&external::config_key("c1")).unwrap();
    assert_eq!(
        config["shares"]["s1"]["options"]["ceph_new:proxy"],
        "yes"
    );
}
