use crate::load_aircraft;

#[test]
fn store_is_released_below_the_carrier() {
    let mut fdm = load_aircraft("carrier");
    assert_eq!(fdm.slaves().len(), 1);
    let store = &fdm.slaves()[0];
    assert_eq!(store.name, "mk82_nodrag");
    assert!(store.exec.is_slave());
    assert!(!fdm.is_slave());
    // Each vehicle owns its property tree
    assert_eq!(
        store
            .exec
            .get_property_value("inertia/weight-lbs")
            .unwrap(),
        500.0
    );
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 2_000.0);

    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    let carrier_h = fdm.get_property_value("position/h-sl-ft").unwrap();
    let store_h = fdm.slaves()[0]
        .exec
        .get_property_value("position/h-sl-ft")
        .unwrap();
    assert!((carrier_h - 8_000.0).abs() < 1e-6);
    assert!((carrier_h - store_h - 2.0).abs() < 1e-3, "store at {store_h} ft");

    // Both fall together, on the clock of the carrier
    for _ in 0..120 {
        fdm.run().unwrap();
    }
    let store = &fdm.slaves()[0].exec;
    assert_eq!(store.sim_time(), fdm.sim_time());
    let carrier_h = fdm.get_property_value("position/h-sl-ft").unwrap();
    let store_h = store.get_property_value("position/h-sl-ft").unwrap();
    assert!(carrier_h < 8_000.0 - 10.0);
    assert!((carrier_h - store_h - 2.0).abs() < 1e-2);
}
