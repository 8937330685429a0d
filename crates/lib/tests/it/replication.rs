use substrata::{ContainerStore, LocalList, LocalMap, Placement};

use crate::helpers::*;

#[test]
fn test_nested_map_replicates() {
    let (engine_a, root_a) = setup();
    root_a.put("profile", sample_profile()).unwrap();

    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    let profile = root_b.get_map("profile").unwrap().unwrap();
    assert_text(profile.get("city").unwrap(), "Lyon");
    let tags = profile.get_list("tags").unwrap().unwrap();
    assert_eq!(tags.len().unwrap(), 2);
    assert_eq!(root_b.to_json().unwrap(), root_a.to_json().unwrap());
}

#[test]
fn test_replicas_opened_independently_merge() {
    let (engine_a, root_a) = setup();
    let (engine_b, root_b) = setup();

    root_a.put("from-a", "a").unwrap();
    root_b.put("from-b", "b").unwrap();
    engine_a.sync_with(&engine_b).unwrap();

    assert_eq!(root_a.keys().unwrap(), vec!["from-a", "from-b"]);
    assert_eq!(root_b.keys().unwrap(), vec!["from-a", "from-b"]);
}

#[test]
fn test_concurrent_writes_converge() {
    let (engine_a, root_a) = setup();
    root_a.put("count", 0_i64).unwrap();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();
    let root_b = open_root(&engine_b);

    // Both replicas read 0 and write their increment without seeing the other.
    let read_a = root_a.get("count").unwrap().unwrap().as_int().unwrap();
    let read_b = root_b.get("count").unwrap().unwrap().as_int().unwrap();
    root_a.put("count", read_a + 1).unwrap();
    root_b.put("count", read_b + 2).unwrap();
    engine_a.sync_with(&engine_b).unwrap();

    let final_a = root_a.get("count").unwrap().unwrap().as_int().unwrap();
    let final_b = root_b.get("count").unwrap().unwrap().as_int().unwrap();
    assert_eq!(final_a, final_b);
    assert!((1..=2).contains(&final_a));
}

#[test]
fn test_remote_overwrite_invalidates_cached_child() {
    let (engine_a, root_a) = setup();
    root_a.put("profile", sample_profile()).unwrap();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    let cached = root_b.get_map("profile").unwrap().unwrap();
    assert_text(cached.get("city").unwrap(), "Lyon");

    root_a
        .put("profile", LocalMap::new().with("city", "Paris"))
        .unwrap();
    engine_a.sync_with(&engine_b).unwrap();

    let fresh = root_b.get_map("profile").unwrap().unwrap();
    assert_ne!(fresh.address(), cached.address());
    assert_text(fresh.get("city").unwrap(), "Paris");
}

#[test]
fn test_remote_edit_inside_child_is_visible() {
    let (engine_a, root_a) = setup();
    let profile_a = root_a
        .put("profile", sample_profile())
        .unwrap()
        .into_map()
        .unwrap();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    let profile_b = root_b.get_map("profile").unwrap().unwrap();
    assert_eq!(profile_b.get("age").unwrap().unwrap(), 36_i64);

    profile_a.put("age", 37_i64).unwrap();
    engine_a.sync_with(&engine_b).unwrap();
    assert_eq!(profile_b.get("age").unwrap().unwrap(), 37_i64);
}

#[test]
fn test_second_session_sees_overwrites() {
    let engine = test_engine();
    let writer = open_root(&engine);
    let reader = open_root(&engine);

    writer
        .put("profile", LocalMap::new().with("city", "Lyon"))
        .unwrap();
    let first = reader.get_map("profile").unwrap().unwrap();
    assert_text(first.get("city").unwrap(), "Lyon");

    writer
        .put("profile", LocalMap::new().with("city", "Paris"))
        .unwrap();
    let second = reader.get_map("profile").unwrap().unwrap();
    assert_text(second.get("city").unwrap(), "Paris");

    assert!(writer.remove("profile").unwrap());
    assert!(reader.get("profile").unwrap().is_none());
}

#[test]
fn test_remote_list_set_invalidates_cached_item() {
    let (engine_a, root_a) = setup();
    let items_a = root_a
        .put("items", LocalList::new().with(LocalMap::new().with("n", 1_i64)))
        .unwrap()
        .into_list()
        .unwrap();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    let items_b = root_b.get_list("items").unwrap().unwrap();
    let item = items_b.get(0).unwrap().unwrap().into_map().unwrap();
    assert_eq!(item.get("n").unwrap().unwrap(), 1_i64);

    items_a.set(0, LocalMap::new().with("n", 2_i64)).unwrap();
    engine_a.sync_with(&engine_b).unwrap();

    let replaced = items_b.get(0).unwrap().unwrap().into_map().unwrap();
    assert_eq!(replaced.get("n").unwrap().unwrap(), 2_i64);
    assert_eq!(items_b.len().unwrap(), 1);
}

#[test]
fn test_removed_subtree_survives_sync() {
    let (engine_a, root_a) = setup();
    let profile = root_a
        .put("profile", sample_profile())
        .unwrap()
        .into_map()
        .unwrap();
    let address = profile.address().clone();
    assert!(root_a.remove("profile").unwrap());

    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    assert!(!root_b.has("profile").unwrap());
    let orphan = root_b.open_map(&address).unwrap();
    assert_text(orphan.get("city").unwrap(), "Lyon");
}

#[test]
fn test_sharded_subtree_replicates() {
    let (engine_a, root_a) = setup();
    root_a
        .put_with("shard", sample_profile(), Placement::NewContainer)
        .unwrap();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    assert_eq!(
        engine_a.container_ids().unwrap(),
        engine_b.container_ids().unwrap()
    );
    let root_b = open_root(&engine_b);
    let shard = root_b.get_map("shard").unwrap().unwrap();
    assert_ne!(shard.container_id(), root_b.id());
    assert_text(shard.get("city").unwrap(), "Lyon");
}

#[test]
fn test_ownership_replicates() {
    let (engine_a, root_a) = setup();
    let address = root_a
        .put("profile", sample_profile())
        .unwrap()
        .address()
        .unwrap()
        .clone();
    let engine_b = test_engine();
    engine_a.sync_with(&engine_b).unwrap();

    let root_b = open_root(&engine_b);
    let profile = root_b.open_map(&address).unwrap();
    assert!(root_b.put("copy", profile.clone()).unwrap_err().is_caller_error());

    // Once the owner is removed on one replica, the other may re-place the node.
    root_a.remove("profile").unwrap();
    engine_a.sync_with(&engine_b).unwrap();
    root_b.put("copy", profile).unwrap();
    engine_a.sync_with(&engine_b).unwrap();
    assert_text(
        root_a.get_map("copy").unwrap().unwrap().get("city").unwrap(),
        "Lyon",
    );
}
