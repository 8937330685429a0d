use std::sync::Arc;

use substrata::{
    ContainerStore, LocalMap, ObjectConfig, ObjectRoot, Placement, config::EntryLayout,
    object::UuidIdGenerator,
};

use crate::helpers::*;

#[test]
fn test_open_creates_master_container_and_root() {
    let engine = test_engine();
    assert!(engine.container_ids().unwrap().is_empty());

    let root = open_root(&engine);
    assert_eq!(engine.container_ids().unwrap(), vec!["data+master"]);
    let master = container(&engine, "data+master");
    assert_eq!(
        master.document_ids(),
        vec![("root".to_string(), "map".to_string())]
    );
    assert!(root.is_empty().unwrap());
    assert_eq!(root.len().unwrap(), 0);
}

#[test]
fn test_reopen_sees_existing_data() {
    let engine = test_engine();
    {
        let root = open_root(&engine);
        root.put("name", "Alice").unwrap();
        root.put("profile", sample_profile()).unwrap();
    }

    let reopened = open_root(&engine);
    assert_text(reopened.get("name").unwrap(), "Alice");
    let profile = reopened.get_map("profile").unwrap().unwrap();
    assert_eq!(profile.get("age").unwrap().unwrap(), 36_i64);
}

#[test]
fn test_independent_roots_with_custom_config() {
    let engine = test_engine();
    let default_root = open_root(&engine);
    let config = ObjectConfig::default()
        .with_master_container("data+custom")
        .with_root_document("top");
    let custom = ObjectRoot::open_with(engine.clone(), config, Arc::new(UuidIdGenerator)).unwrap();

    custom.put("only-here", 1_i64).unwrap();
    assert_eq!(custom.id(), "data+custom");
    assert_eq!(custom.address().serialize(), "m+data+custom+top");
    assert!(!default_root.has("only-here").unwrap());

    let child = custom.put("child", LocalMap::new()).unwrap();
    assert_eq!(child.as_map().unwrap().container_id(), "data+custom");
}

#[test]
fn test_custom_layout_names_are_persisted() {
    let engine = test_engine();
    let layout = EntryLayout {
        root: "object".to_string(),
        entry: "field".to_string(),
        key_attr: "name".to_string(),
        value_attr: "data".to_string(),
    };
    let config = ObjectConfig::default().with_map_layout(layout);
    let root = ObjectRoot::open_with(engine.clone(), config, Arc::new(UuidIdGenerator)).unwrap();
    root.put("greeting", "hi").unwrap();

    assert_eq!(
        root.root().snapshot().unwrap(),
        serde_json::json!({ "object": [{ "field": { "name": "greeting", "data": "s:hi" } }] })
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let engine = test_engine();
    let config = ObjectConfig::default().with_root_document("bad+id");
    let err = ObjectRoot::open_with(engine.clone(), config, Arc::new(UuidIdGenerator)).unwrap_err();
    assert!(err.is_caller_error());
    assert!(engine.container_ids().unwrap().is_empty());
}

#[test]
fn test_unavailable_engine_propagates() {
    let engine = test_engine();
    engine.set_available(false);
    let err = ObjectRoot::open(engine.clone()).unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.module(), "engine");

    engine.set_available(true);
    let root = open_root(&engine);

    // The root binds lazily, so the outage surfaces on first use.
    engine.set_available(false);
    assert!(root.keys().unwrap_err().is_transient());

    engine.set_available(true);
    root.put("name", "Alice").unwrap();
    engine.set_available(false);
    assert!(
        root.put_with("shard", LocalMap::new(), Placement::NewContainer)
            .unwrap_err()
            .is_transient()
    );
    engine.set_available(true);
    assert!(!root.has("shard").unwrap());
}

#[test]
fn test_participants() {
    let (_engine, root) = setup();
    assert!(root.participants().unwrap().is_empty());

    root.add_participant("bob@example.com").unwrap();
    root.add_participant("alice@example.com").unwrap();
    assert_eq!(
        root.participants().unwrap(),
        vec!["alice@example.com", "bob@example.com"]
    );

    let err = root.add_participant("not-an-address").unwrap_err();
    assert!(err.is_caller_error());

    assert!(root.remove_participant("bob@example.com").unwrap());
    assert!(!root.remove_participant("bob@example.com").unwrap());
    assert_eq!(root.participants().unwrap(), vec!["alice@example.com"]);
}

#[test]
fn test_object_to_json() {
    let (_engine, root) = setup();
    for (key, value) in sample_json().as_object().unwrap() {
        root.put(key, value.clone()).unwrap();
    }
    assert_eq!(root.to_json().unwrap(), sample_json());
}

#[test]
fn test_clear_object() {
    let (_engine, root) = setup();
    root.put("a", 1_i64).unwrap();
    root.put("b", sample_profile()).unwrap();
    root.clear().unwrap();
    assert!(root.is_empty().unwrap());
    assert_eq!(root.to_json().unwrap(), serde_json::json!({}));
}
