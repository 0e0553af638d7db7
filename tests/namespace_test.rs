// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode

// Builds the bulk namespace on the in memory node manager and browses it
use opcua_test_server::constants::TEST_NAMESPACE_URI;
use opcua_test_server::until::data_value_now;
use opcua_test_server::prelude::*;
use std::sync::{Arc, RwLock};

fn start_bulk(
    cfg: TestConfiguration,
) -> Result<(ManagedNamespace<BulkNamespace>, Arc<RwLock<SimpleNodeManager>>), NamespaceError> {
    let nm = SimpleNodeManager::new_arc_lock();
    let mut ns = ManagedNamespace::new(nm.clone(), BulkNamespace::new(cfg));
    ns.startup()?;
    Ok((ns, nm))
}

fn array_len(value: &DataValue) -> usize {
    match &value.value {
        Some(Variant::Array(a)) => a.values.len(),
        other => panic!("expected an array got {:?}", other),
    }
}

#[test]
fn empty_bulk_has_folders_only() -> Result<(), NamespaceError> {
    let (ns, nm) = start_bulk(TestConfiguration::new(0, 0, 0))?;
    let nm = nm.read().unwrap();
    assert_eq!(ns.namespace_index(), nm.namespace_index(TEST_NAMESPACE_URI));
    assert_eq!(nm.variable_count(), 0);
    // ObjectsFolder + OMP + two type folders
    assert_eq!(nm.folder_count(), 4);
    let base = nm.resolve_path(&["OMP"]).expect("OMP folder");
    assert_eq!(nm.children(&base, ReferenceTypeId::Organizes).len(), 2);
    assert!(nm.resolve_path(&["OMP", "SingleType"]).is_some());
    assert!(nm.resolve_path(&["OMP", "ArrayType"]).is_some());
    Ok(())
}

#[test]
fn scalar_instances_hold_one_variable_per_type() -> Result<(), NamespaceError> {
    let (ns, nm) = start_bulk(TestConfiguration::new(2, 0, 0))?;
    let idx = ns.namespace_index().unwrap();
    let nm = nm.read().unwrap();
    assert_eq!(nm.variable_count(), 6);

    let instance = nm
        .resolve_path(&["OMP", "SingleType", "Single000001"])
        .expect("second instance");
    assert_eq!(instance, NodeId::new(idx, "OMP/Single/Single000001"));
    let folder = nm.find_folder(&instance).unwrap();
    assert_eq!(folder.display_name.text.as_ref(), "SingleType(Single000001)");

    let int = NodeId::new(idx, "OMP/Single/Single000001/Int64");
    let var = nm.find_variable(&int).unwrap();
    assert_eq!(var.data_type, DataTypeId::Int64);
    assert_eq!(var.value_rank(), -1);
    assert!(matches!(nm.read_value(&int)?.value, Some(Variant::Int64(_))));

    let float = NodeId::new(idx, "OMP/Single/Single000000/Float");
    match nm.read_value(&float)?.value {
        Some(Variant::Double(v)) => assert!((0.0..1.0).contains(&v)),
        other => panic!("unexpected float value {:?}", other),
    }
    let boolean = NodeId::new(idx, "OMP/Single/Single000000/Boolean");
    assert!(matches!(nm.read_value(&boolean)?.value, Some(Variant::Boolean(_))));
    Ok(())
}

#[test]
fn array_variables_have_the_configured_size() -> Result<(), NamespaceError> {
    let (ns, nm) = start_bulk(TestConfiguration::new(0, 1, 4))?;
    let idx = ns.namespace_index().unwrap();
    let nm = nm.read().unwrap();
    assert_eq!(nm.variable_count(), 3);
    for name in ["Int64", "Float", "Boolean"].iter() {
        let id = NodeId::new(idx, format!("OMP/Array/Array000000/{}", name));
        let var = nm.find_variable(&id).unwrap();
        assert_eq!(var.array_dimensions, Some(vec![4]));
        assert_eq!(var.value_rank(), 1);
        assert_eq!(array_len(&nm.read_value(&id)?), 4);
    }
    Ok(())
}

#[test]
fn node_graph_is_deterministic() -> Result<(), NamespaceError> {
    let cfg = TestConfiguration::new(3, 2, 5);
    let (_a, nm_a) = start_bulk(cfg.clone())?;
    let (_b, nm_b) = start_bulk(cfg)?;
    let nm_a = nm_a.read().unwrap();
    let nm_b = nm_b.read().unwrap();
    let mut ids_a: Vec<_> = nm_a.node_ids().cloned().collect();
    let mut ids_b: Vec<_> = nm_b.node_ids().cloned().collect();
    ids_a.sort_by_key(|id| id.to_string());
    ids_b.sort_by_key(|id| id.to_string());
    assert_eq!(ids_a, ids_b);
    assert_eq!(nm_a.references(), nm_b.references());
    Ok(())
}

#[test]
fn bulk_writes_are_accepted_and_dropped() -> Result<(), NamespaceError> {
    let (ns, nm) = start_bulk(TestConfiguration::new(1, 0, 0))?;
    let id = NodeId::new(ns.namespace_index().unwrap(), "OMP/Single/Single000000/Boolean");
    let mut nm = nm.write().unwrap();
    let var = nm.find_variable(&id).unwrap();
    assert!(var.is_writable());
    assert_eq!(var.access_level, AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE);
    assert_eq!(var.user_access_level, var.access_level);
    nm.write_value(&id, data_value_now(Variant::Boolean(true)))?;
    Ok(())
}

#[test]
fn invalid_configuration_stops_the_namespace() {
    let nm = SimpleNodeManager::new_arc_lock();
    let mut ns = ManagedNamespace::new(nm.clone(), BulkNamespace::new(TestConfiguration::new(0, 1, 0)));
    assert!(matches!(ns.startup(), Err(NamespaceError::InvalidConfiguration(_))));
    assert_eq!(ns.state(), LifecycleState::Stopped);
    assert!(nm.read().unwrap().resolve_path(&["OMP"]).is_none());
}

#[test]
fn subscription_reports_sampled_values() -> Result<(), NamespaceError> {
    let (ns, _nm) = start_bulk(TestConfiguration::new(1, 0, 0))?;
    let id = NodeId::new(ns.namespace_index().unwrap(), "OMP/Single/Single000000/Int64");
    ns.on_data_items_created(&[DataItem::new(7, id, 100.0)]);
    let first = ns.subscription_model().sample(std::time::Duration::from_millis(0));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].item_id, 7);
    ns.on_data_items_deleted(&[DataItem::new(7, NodeId::null(), 0.0)]);
    assert_eq!(ns.subscription_model().item_count(), 0);
    Ok(())
}
