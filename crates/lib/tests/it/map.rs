use substrata::{ContainerStore, LocalList, LocalMap, NodeKind, NodeValue, Placement};

use crate::helpers::*;

#[test]
fn test_put_and_get_primitive() {
    let (_engine, root) = setup();
    root.put("name", "Alice").unwrap();
    assert_text(root.get("name").unwrap(), "Alice");
    assert_eq!(root.keys().unwrap(), vec!["name"]);
    assert!(root.has("name").unwrap());
    assert!(!root.has("missing").unwrap());
    assert_eq!(root.get("missing").unwrap(), None);
}

#[test]
fn test_nested_map_has_its_own_address() {
    let (_engine, root) = setup();
    root.put("profile", LocalMap::new().with("city", "Lyon")).unwrap();

    let profile = root.get_map("profile").unwrap().expect("profile exists");
    assert_text(profile.get("city").unwrap(), "Lyon");
    assert_ne!(profile.address(), root.address());
    assert_eq!(profile.container_id(), root.id());
}

#[test]
fn test_put_returns_the_attached_value() {
    let (_engine, root) = setup();
    let stored = root.put("profile", sample_profile()).unwrap();
    assert!(!stored.is_local());
    assert_eq!(stored.kind(), NodeKind::Map);
    assert_eq!(stored, root.get("profile").unwrap().unwrap());
}

#[test]
fn test_overwrite_with_different_type() {
    let (_engine, root) = setup();
    root.put("slot", sample_profile()).unwrap();
    root.put("slot", 7_i64).unwrap();
    assert_eq!(root.get("slot").unwrap().unwrap(), 7_i64);

    root.put("slot", LocalList::new().with("a")).unwrap();
    let list = root.get_list("slot").unwrap().unwrap();
    assert_eq!(list.len().unwrap(), 1);
}

#[test]
fn test_typed_accessors_report_mismatch() {
    let (_engine, root) = setup();
    root.put("name", "Alice").unwrap();
    root.put("items", LocalList::new()).unwrap();

    let err = root.get_map("name").unwrap_err();
    assert!(err.is_type_error());
    assert!(err.is_caller_error());
    assert!(root.get_list("name").unwrap_err().is_type_error());
    assert!(root.get_map("items").unwrap_err().is_type_error());
    assert!(root.get_map("missing").unwrap().is_none());
}

#[test]
fn test_attached_node_cannot_be_aliased() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();

    let err = root.put("copy", profile.clone()).unwrap_err();
    assert!(err.is_caller_error());
    assert!(!root.has("copy").unwrap());

    let other = root.put("other", LocalMap::new()).unwrap();
    let other = other.as_map().unwrap();
    assert!(other.put("nested", profile.clone()).is_err());
    assert!(other.is_empty().unwrap());
}

#[test]
fn test_reput_under_same_key_is_allowed() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    let again = root.put("profile", profile.clone()).unwrap();
    assert_eq!(again.address(), profile.address());
    assert_text(again.as_map().unwrap().get("city").unwrap(), "Lyon");
}

#[test]
fn test_node_read_back_from_storage_is_owned() {
    let (_engine, root) = setup();
    root.put("profile", sample_profile()).unwrap();
    root.clear_cache();

    let profile = root.get("profile").unwrap().unwrap();
    assert!(root.put("copy", profile).is_err());
}

#[test]
fn test_removed_node_can_be_placed_again() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    assert!(root.remove("profile").unwrap());
    assert!(!root.has("profile").unwrap());

    root.put("moved", profile.clone()).unwrap();
    let moved = root.get_map("moved").unwrap().unwrap();
    assert_eq!(Some(moved.address()), profile.address());
}

#[test]
fn test_overwritten_node_can_be_placed_again() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    root.put("profile", "gone").unwrap();
    root.put("archive", profile).unwrap();
    assert_text(
        root.get_map("archive").unwrap().unwrap().get("city").unwrap(),
        "Lyon",
    );
}

#[test]
fn test_remove_leaves_orphan_openable() {
    let (engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    let address = profile.address().unwrap().clone();
    drop(profile);

    assert!(root.remove("profile").unwrap());
    assert!(!root.has("profile").unwrap());
    assert!(!root.remove("profile").unwrap());

    assert!(container(&engine, address.container_id()).has_document(address.document_id()));
    let orphan = root.open_map(&address).unwrap();
    assert_text(orphan.get("city").unwrap(), "Lyon");
}

#[test]
fn test_put_reference_aliases_without_ownership() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    let address = profile.address().unwrap().clone();

    root.put_reference("alias", &address).unwrap();
    let alias = root.get_map("alias").unwrap().unwrap();
    assert_eq!(alias.address(), &address);

    alias.put("city", "Paris").unwrap();
    assert_text(
        root.get_map("profile").unwrap().unwrap().get("city").unwrap(),
        "Paris",
    );

    let json = root.to_json().unwrap();
    assert_eq!(json["alias"], json["profile"]);
}

#[test]
fn test_put_reference_to_missing_node_is_dangling() {
    let (_engine, root) = setup();
    let address = substrata::SubstrateAddress::for_map("data+master", "nope").unwrap();
    let err = root.put_reference("ghost", &address).unwrap_err();
    assert!(err.is_integrity_error());
    assert!(!root.has("ghost").unwrap());
}

#[test]
fn test_reference_cycle_is_reported() {
    let (_engine, root) = setup();
    let child = root.put("child", LocalMap::new()).unwrap();
    child
        .as_map()
        .unwrap()
        .put_reference("parent", root.address())
        .unwrap();

    let err = root.to_json().unwrap_err();
    assert!(err.is_integrity_error());

    // Reads one level at a time still work.
    let parent = root
        .get_map("child")
        .unwrap()
        .unwrap()
        .get_map("parent")
        .unwrap()
        .unwrap();
    assert_eq!(parent.address(), root.address());
}

#[test]
fn test_dangling_reference_detection() {
    let (engine, root) = setup();
    let raw = raw_root_map(&engine, &root);
    raw.put("ghost", "m+data+nonexistent+doc");
    raw.put("lost", "m+data+master+never-created");

    let err = root.get("ghost").unwrap_err();
    assert!(err.is_integrity_error());
    assert!(err.is_not_found());
    assert!(root.get("lost").unwrap_err().is_integrity_error());
}

#[test]
fn test_reference_with_wrong_kind_is_dangling() {
    let (engine, root) = setup();
    let raw = raw_root_map(&engine, &root);
    // The root document holds a map, not a list.
    raw.put("confused", &format!("l+{}+{}", root.id(), root.address().document_id()));
    assert!(root.get("confused").unwrap_err().is_not_found());
}

#[test]
fn test_malformed_token() {
    let (engine, root) = setup();
    raw_root_map(&engine, &root).put("junk", "Alice");
    let err = root.get("junk").unwrap_err();
    assert!(err.is_integrity_error());
    assert!(!err.is_not_found());
}

#[test]
fn test_cache_agrees_with_storage() {
    let (_engine, root) = setup();
    root.put("a", 1_i64).unwrap();
    root.put("b", sample_profile()).unwrap();
    root.put("c", LocalList::new().with(LocalMap::new().with("x", true))).unwrap();
    root.put("a", "replaced").unwrap();
    root.remove("b").unwrap();
    root.put("b", LocalMap::new().with("y", 2_i64)).unwrap();
    root.put("d", serde_json::json!({"deep": {"er": [1, 2, 3]}})).unwrap();

    let before: Vec<_> = root
        .keys()
        .unwrap()
        .into_iter()
        .map(|key| (key.clone(), root.get(&key).unwrap().unwrap().to_json().unwrap()))
        .collect();

    root.clear_cache();

    let after: Vec<_> = root
        .keys()
        .unwrap()
        .into_iter()
        .map(|key| (key.clone(), root.get(&key).unwrap().unwrap().to_json().unwrap()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(before.len(), 4);
}

#[test]
fn test_cached_child_is_reused() {
    let (_engine, root) = setup();
    root.put("profile", sample_profile()).unwrap();
    let first = root.get_map("profile").unwrap().unwrap();
    first.put("note", "hello").unwrap();
    let second = root.get_map("profile").unwrap().unwrap();
    assert_eq!(first, second);
    assert_text(second.get("note").unwrap(), "hello");
}

#[test]
fn test_clear_empties_map_and_releases_children() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    root.put("name", "Alice").unwrap();
    assert_eq!(root.len().unwrap(), 2);

    root.clear().unwrap();
    assert!(root.is_empty().unwrap());
    assert!(root.keys().unwrap().is_empty());

    root.put("again", profile).unwrap();
    assert_eq!(root.len().unwrap(), 1);
}

#[test]
fn test_keys_and_entries_sorted() {
    let (_engine, root) = setup();
    for key in ["zeta", "alpha", "mid"] {
        root.put(key, key).unwrap();
    }
    assert_eq!(root.keys().unwrap(), vec!["alpha", "mid", "zeta"]);

    let entries = root.root().entries().unwrap();
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    assert_eq!(entries[0].1, "alpha");
}

#[test]
fn test_new_container_placement() {
    let (engine, root) = setup();
    let stored = root
        .put_with("shard", sample_profile(), Placement::NewContainer)
        .unwrap();
    let shard = stored.as_map().unwrap();
    assert_ne!(shard.container_id(), root.id());
    assert!(shard.container_id().starts_with("data+"));
    assert!(
        engine
            .container_ids()
            .unwrap()
            .contains(&shard.container_id().to_string())
    );

    // Nested values follow their parent into the new container.
    let tags = shard.get_list("tags").unwrap().unwrap();
    assert_eq!(tags.container_id(), shard.container_id());
}

#[test]
fn test_lazy_open() {
    let (_engine, root) = setup();
    let stored = root.put("profile", sample_profile()).unwrap();
    let address = stored.address().unwrap().clone();
    drop(stored);
    root.clear_cache();

    let reopened = root.open_map(&address).unwrap();
    assert!(!reopened.is_open());
    assert_eq!(reopened.len().unwrap(), 3);
    assert!(reopened.is_open());
}

#[test]
fn test_null_is_stored_as_a_value() {
    let (_engine, root) = setup();
    root.put("nothing", NodeValue::from(substrata::Primitive::Null)).unwrap();
    assert!(root.get("nothing").unwrap().unwrap().is_null());
    assert_eq!(root.get("absent").unwrap(), None);
}

#[test]
fn test_node_opened_by_address_cannot_be_aliased() {
    let (_engine, root) = setup();
    let stored = root.put("profile", sample_profile()).unwrap();
    let address = stored.address().unwrap().clone();
    drop(stored);
    root.clear_cache();

    let reopened = root.open_map(&address).unwrap();
    let err = root.put("copy", reopened.clone()).unwrap_err();
    assert!(err.is_caller_error());
    assert_eq!(root.keys().unwrap(), vec!["profile"]);

    // Still writable in place.
    root.put("profile", reopened).unwrap();
    assert_eq!(root.keys().unwrap(), vec!["profile"]);
}

#[test]
fn test_second_root_on_same_engine_cannot_alias() {
    let (engine, root) = setup();
    root.put("profile", sample_profile()).unwrap();

    let other = open_root(&engine);
    let profile = other.get_map("profile").unwrap().unwrap();
    assert!(other.put("copy", profile).unwrap_err().is_caller_error());
    assert!(!root.has("copy").unwrap());
}

#[test]
fn test_reference_read_first_does_not_take_ownership() {
    let (engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    root.put_reference("alias", profile.address().unwrap()).unwrap();

    let token = raw_root_map(&engine, &root).get("alias").unwrap();
    assert!(token.starts_with("r+"), "unexpected token {token}");
    assert!(substrata::object::codec::is_reference(&token));

    // A fresh session reads through the reference before the owning key.
    let fresh = open_root(&engine);
    let via_alias = fresh.get_map("alias").unwrap().unwrap();
    let via_owner = fresh.get_map("profile").unwrap().unwrap();
    assert_eq!(via_alias, via_owner);

    fresh.put("profile", via_owner).unwrap();
    assert!(fresh.put("other", via_alias).unwrap_err().is_caller_error());
    assert!(!fresh.has("other").unwrap());
}

#[test]
fn test_node_reached_by_reference_moves_after_owner_removed() {
    let (_engine, root) = setup();
    let profile = root.put("profile", sample_profile()).unwrap();
    root.put_reference("alias", profile.address().unwrap()).unwrap();
    drop(profile);

    let via_alias = root.get_map("alias").unwrap().unwrap();
    assert!(root.put("moved", via_alias.clone()).is_err());

    assert!(root.remove("profile").unwrap());
    root.put("moved", via_alias).unwrap();
    assert_text(root.get_map("moved").unwrap().unwrap().get("city").unwrap(), "Lyon");

    // Removing the reference leaves the new owner alone.
    assert!(root.remove("alias").unwrap());
    let moved = root.get_map("moved").unwrap().unwrap();
    assert!(root.put("again", moved).unwrap_err().is_caller_error());
}

#[test]
fn test_reopened_orphan_can_be_placed() {
    let (_engine, root) = setup();
    let stored = root.put("profile", sample_profile()).unwrap();
    let address = stored.address().unwrap().clone();
    drop(stored);
    root.remove("profile").unwrap();
    root.clear_cache();

    let orphan = root.open_map(&address).unwrap();
    root.put("restored", orphan).unwrap();
    let restored = root.get_map("restored").unwrap().unwrap();
    assert_eq!(restored.address(), &address);
    assert!(root.put("twice", restored).is_err());
}
