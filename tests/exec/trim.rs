use gyre::exec::{TrimAxis, TrimControl, TrimMode, TrimState};

use crate::load_aircraft;

#[test]
fn trainer_cruise() {
    let mut fdm = load_aircraft("trainer");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    let frame = fdm.frame();
    let rows = fdm.output().rows(0);

    let report = fdm.do_trim(TrimMode::Longitudinal).unwrap();
    println!("{report}");
    assert!(report.converged, "{report}");
    assert!(report.failure.is_none());
    assert_eq!(report.axes.len(), 3);
    assert_eq!(fdm.sim_time(), 0.0);
    assert_eq!(fdm.frame(), frame);
    // Output is held while trimming
    assert_eq!(fdm.output().rows(0), rows);

    for axis in &report.axes {
        assert!(axis.residual.abs() <= axis.tolerance, "{axis:?}");
    }
    let alpha = fdm.ic().alpha();
    assert!(alpha > 0.0 && alpha < 0.15, "alpha = {alpha}");
    let throttle = fdm.get_property_value("fcs/throttle-cmd-norm[0]").unwrap();
    assert!(throttle > 0.2 && throttle < 0.8, "throttle = {throttle}");
    // Level flight: the pitch attitude is the angle of attack
    assert!((fdm.ic().euler().y - alpha).abs() < 1e-9);

    let h0 = fdm.get_property_value("position/h-sl-ft").unwrap();
    while fdm.sim_time() < 2.0 {
        fdm.run().unwrap();
    }
    let h1 = fdm.get_property_value("position/h-sl-ft").unwrap();
    assert!((h1 - h0).abs() < 10.0, "drifted from {h0} to {h1}");
}

#[test]
fn trainer_on_the_ground() {
    let mut fdm = load_aircraft("trainer");
    fdm.load_ic("reset01").unwrap();
    fdm.run_ic().unwrap();

    let report = fdm.do_trim(TrimMode::Ground).unwrap();
    assert!(report.converged, "{report}");
    let agl = fdm.ic().altitude_agl();
    assert!(agl > 1.0 && agl < 2.0, "agl = {agl}");
    assert!(fdm.ic().euler().y.abs() < 2_f64.to_radians());
    assert!(fdm.ic().euler().x.abs() < 1e-6);
    assert!(fdm.properties().get_bool("gear/wow").unwrap());
    assert_eq!(fdm.ic().terrain_elevation(), 500.0);
}

#[test]
fn unreachable_trim_restores_the_state() {
    let mut fdm = load_aircraft("mk82");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    let ic = fdm.ic().state();

    // No lift and no engine: nothing can balance gravity
    let report = fdm.do_trim(TrimMode::Longitudinal).unwrap();
    println!("{report}");
    assert!(!report.converged);
    assert!(report.failure.is_some());
    assert!(report.cycles < 10);
    assert_eq!(fdm.sim_time(), 0.0);
    assert_eq!(fdm.ic().alpha(), ic.alpha);
    assert_eq!(fdm.ic().euler(), ic.euler);
    // Throttle was dropped, the bomb has no engine
    assert!(report
        .axes
        .iter()
        .all(|axis| axis.control != TrimControl::Throttle));
}

#[test]
fn custom_axes_are_validated() {
    let mut fdm = load_aircraft("ball");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();

    let empty = TrimMode::Custom(vec![TrimAxis::new(
        TrimState::Wdot,
        TrimControl::Alpha,
        0.2,
        -0.2,
    )]);
    let report = fdm.do_trim(empty).unwrap();
    assert!(!report.converged);
    assert!(report.failure.unwrap().contains("empty bounds"));

    let unavailable = TrimMode::Custom(vec![TrimAxis::new(
        TrimState::Udot,
        TrimControl::Throttle,
        0.0,
        1.0,
    )]);
    let report = fdm.do_trim(unavailable).unwrap();
    assert!(!report.converged);
    assert_eq!(fdm.sim_time(), 0.0);
}
