extern crate gyre;

use gyre::props::{PropertyError, PropertyKind, PropertyManager, PropertyValue, Shared};
use rstest::*;

#[derive(Debug, Default)]
struct Actuator {
    position: f64,
    saturated: bool,
    cycles: i64,
}

#[fixture]
fn tree() -> (PropertyManager, Shared<Actuator>) {
    crate::init_logger();
    let pm = PropertyManager::new();
    let act = Shared::new(Actuator::default());
    pm.tie_shared(
        "fcs/elevator-pos-rad",
        &act,
        |a| a.position,
        Some(|a: &mut Actuator, v: f64| a.position = v),
    )
    .unwrap();
    pm.tie_shared("fcs/elevator-saturated", &act, |a| a.saturated, None)
        .unwrap();
    pm.tie_shared("fcs/elevator-cycles", &act, |a| a.cycles, None)
        .unwrap();
    (pm, act)
}

#[rstest]
fn relative_and_absolute_paths_meet(tree: (PropertyManager, Shared<Actuator>)) {
    let (pm, act) = tree;
    act.write().position = 0.1;

    let fcs = pm.get_node("fcs", false).unwrap();
    let by_relative = fcs.get_node("./elevator-pos-rad", false).unwrap();
    let by_parent = fcs
        .get_node("../fcs//elevator-pos-rad/", false)
        .unwrap();
    let by_root = by_relative.get_node("/fcs/elevator-pos-rad", false).unwrap();
    assert_eq!(by_relative, by_parent);
    assert_eq!(by_relative, by_root);
    assert_eq!(by_root.path(), "/fcs/elevator-pos-rad");
    assert_eq!(by_root.get_f64().unwrap(), 0.1);

    match pm.get_node("fcs/..", false).unwrap().get_node("../..", false) {
        Err(PropertyError::InvalidPath { .. }) => {}
        other => panic!("expected an invalid path, got {other:?}"),
    }
    assert!(!pm.has_node("fcs/rudder-pos-rad"));
}

#[rstest]
fn tied_values_follow_the_owner(tree: (PropertyManager, Shared<Actuator>)) {
    let (pm, act) = tree;
    pm.set_f64("fcs/elevator-pos-rad", -0.2).unwrap();
    assert_eq!(act.read().position, -0.2);

    {
        let mut a = act.write();
        a.saturated = true;
        a.cycles = 7;
    }
    assert!(pm.get_bool("fcs/elevator-saturated").unwrap());
    assert_eq!(pm.get_i64("fcs/elevator-cycles").unwrap(), 7);
    // Integers widen to doubles on read
    assert_eq!(pm.get_f64("fcs/elevator-cycles").unwrap(), 7.0);

    assert_eq!(
        pm.set_bool("fcs/elevator-saturated", false),
        Err(PropertyError::ReadOnly {
            path: "/fcs/elevator-saturated".to_string()
        })
    );
    assert!(act.read().saturated);
}

#[rstest]
fn second_tie_keeps_the_first(tree: (PropertyManager, Shared<Actuator>)) {
    let (pm, act) = tree;
    act.write().position = 0.3;
    let result = pm.tie_ro("fcs/elevator-pos-rad", || 99.0);
    assert!(matches!(result, Err(PropertyError::AlreadyTied { .. })));
    assert_eq!(pm.get_f64("fcs/elevator-pos-rad").unwrap(), 0.3);

    // A node with children cannot be tied
    let result = pm.tie_ro("fcs", || 1.0);
    assert!(matches!(result, Err(PropertyError::NotALeaf { .. })));
}

#[rstest]
fn untie_keeps_the_last_value(tree: (PropertyManager, Shared<Actuator>)) {
    let (pm, act) = tree;
    act.write().position = 0.25;
    assert!(pm.untie("fcs/elevator-pos-rad").unwrap());
    assert!(!pm.untie("fcs/elevator-pos-rad").unwrap());

    act.write().position = -1.0;
    assert_eq!(pm.get_f64("fcs/elevator-pos-rad").unwrap(), 0.25);
    // Owned again: writes stay in the tree
    pm.set_f64("fcs/elevator-pos-rad", 0.5).unwrap();
    assert_eq!(act.read().position, -1.0);
    assert_eq!(pm.get_f64("fcs/elevator-pos-rad").unwrap(), 0.5);
}

#[test]
fn owned_values_keep_their_kind() {
    let pm = PropertyManager::new();
    pm.set("gear/unit/steering-enabled", true).unwrap();
    pm.set("gear/num-units", 3_i32).unwrap();
    pm.set_string("aircraft/name", "trainer").unwrap();

    let node = pm.get_node("gear/num-units", false).unwrap();
    assert_eq!(node.kind(), Some(PropertyKind::Int32));
    // Widening into an int32 node is fine, narrowing or changing category is not
    node.set_value(PropertyValue::Int16(4)).unwrap();
    assert_eq!(pm.get_i64("gear/num-units").unwrap(), 4);
    assert!(matches!(
        pm.set_i64("gear/num-units", 5),
        Err(PropertyError::TypeMismatch {
            actual: PropertyKind::Int32,
            requested: PropertyKind::Int64,
            ..
        })
    ));
    pm.set_i64("simulation/frame", 12).unwrap();
    assert_eq!(pm.get_f64("simulation/frame").unwrap(), 12.0);
    assert!(matches!(
        node.set_value(PropertyValue::Double(4.5)),
        Err(PropertyError::TypeMismatch {
            actual: PropertyKind::Int32,
            requested: PropertyKind::Double,
            ..
        })
    ));
    assert!(matches!(
        pm.get_f64("aircraft/name"),
        Err(PropertyError::TypeMismatch { .. })
    ));
    assert!(matches!(
        pm.get_f64("gear"),
        Err(PropertyError::NoValue { .. })
    ));
    assert!(matches!(
        pm.get_f64("gear/steering"),
        Err(PropertyError::NotFound { .. })
    ));
}

#[test]
fn indexed_nodes_and_catalog() {
    crate::init_logger();
    let pm = PropertyManager::new();
    let throttles = Shared::new(vec![0.0_f64; 3]);
    let nodes = pm
        .tie_indexed_shared(
            "fcs/throttle-cmd-norm",
            3,
            &throttles,
            |t, idx| t[idx],
            Some(|t: &mut Vec<f64>, idx: usize, v: f64| t[idx] = v),
        )
        .unwrap();
    assert_eq!(nodes.len(), 3);
    pm.tie_ro("propulsion/num-engines", || 3_i32).unwrap();

    pm.set_f64("fcs/throttle-cmd-norm[2]", 0.8).unwrap();
    pm.set_f64("/fcs/throttle-cmd-norm", 0.4).unwrap();
    assert_eq!(*throttles.read(), vec![0.4, 0.0, 0.8]);
    assert_eq!(nodes[2].path(), "/fcs/throttle-cmd-norm[2]");
    assert_eq!(nodes[0].path(), "/fcs/throttle-cmd-norm");

    let catalog = pm.catalog();
    assert_eq!(catalog.len(), 4);
    assert!(catalog.contains(&"/fcs/throttle-cmd-norm[1] (RW)".to_string()));
    assert!(catalog.contains(&"/propulsion/num-engines (R)".to_string()));
    assert_eq!(pm.query("throttle").len(), 3);
    assert!(pm.query("rudder").is_empty());
}

#[rstest]
fn restore_releases_what_came_later(tree: (PropertyManager, Shared<Actuator>)) {
    let (pm, act) = tree;
    pm.set_f64("fcs/rudder-cmd-norm", 0.3).unwrap();
    let snapshot = pm.snapshot();
    let catalog = pm.catalog();

    let rudder = Shared::new(Actuator::default());
    rudder.write().position = 0.2;
    pm.tie_shared("fcs/rudder-pos-rad", &rudder, |a| a.position, None)
        .unwrap();
    pm.tie_shared("gear/unit/steering-enabled", &rudder, |a| a.saturated, None)
        .unwrap();
    // An existing owned node taken over by a binding
    pm.tie_shared("fcs/rudder-cmd-norm", &rudder, |a| a.position, None)
        .unwrap();
    assert!(!snapshot.contains("/gear"));
    let stale = pm.get_node("fcs/rudder-pos-rad", false).unwrap();

    assert_eq!(pm.restore(&snapshot), 4);
    assert_eq!(pm.catalog(), catalog);
    assert!(!pm.has_node("gear"));
    assert!(!stale.has_value());
    // The binding is released, the node keeps its last value
    assert!(!pm.get_node("fcs/rudder-cmd-norm", false).unwrap().is_tied());
    assert_eq!(pm.get_f64("fcs/rudder-cmd-norm").unwrap(), 0.2);
    // Bindings from before the snapshot are untouched
    act.write().position = -0.1;
    assert_eq!(pm.get_f64("fcs/elevator-pos-rad").unwrap(), -0.1);

    pm.tie_shared("fcs/rudder-pos-rad", &rudder, |a| a.position, None)
        .unwrap();
    assert_eq!(pm.get_f64("fcs/rudder-pos-rad").unwrap(), 0.2);
}
