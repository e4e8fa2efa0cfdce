use gyre::FdmExec;

use crate::load_aircraft;

/// Runs until the vehicle reaches the ground, returns the impact time and descent rate.
fn fall(fdm: &mut FdmExec) -> (f64, f64) {
    let mut altitude = fdm.get_property_value("position/h-agl-ft").unwrap();
    for _ in 0..10_000 {
        fdm.run().unwrap();
        let now = fdm.get_property_value("position/h-agl-ft").unwrap();
        // Flying straight over a curved Earth gains a few microfeet on the first frames
        assert!(now <= altitude + 1e-3, "climbed from {altitude} to {now} ft");
        altitude = now;
        if altitude <= 0.0 {
            let v_down = fdm.get_property_value("velocities/v-down-fps").unwrap();
            return (fdm.sim_time(), v_down);
        }
    }
    panic!("no impact after 10000 frames");
}

#[test]
fn vacuum_drop() {
    let mut fdm = load_aircraft("mk82_nodrag");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();

    let h0 = fdm.get_property_value("position/h-agl-ft").unwrap();
    assert!((h0 - 5_000.0).abs() < 1e-6);
    // Effective gravity, including the centrifugal term at the equator
    let g = fdm.get_property_value("accelerations/wdot-ft_sec2").unwrap();
    assert!(g > 31.9 && g < 32.3, "g = {g}");

    let (t_impact, v_impact) = fall(&mut fdm);
    let expected = (2.0 * h0 / g).sqrt();
    assert!(
        (t_impact - expected).abs() < 0.02,
        "impact at {t_impact} s instead of {expected} s"
    );
    assert!((v_impact - g * expected).abs() < 1.0, "impact at {v_impact} ft/s");
}

#[test]
fn drag_slows_the_descent() {
    let mut fdm = load_aircraft("mk82");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();

    let h0 = fdm.get_property_value("position/h-agl-ft").unwrap();
    let g = fdm.get_property_value("accelerations/wdot-ft_sec2").unwrap();
    // Released level: all the drag is along the X axis
    assert!(fdm.get_property_value("accelerations/udot-ft_sec2").unwrap() < 0.0);
    assert!(fdm.get_property_value("velocities/mach").unwrap() > 0.5);

    let (t_impact, v_impact) = fall(&mut fdm);
    let t_vacuum = (2.0 * h0 / g).sqrt();
    assert!(t_impact > t_vacuum, "{t_impact} s, vacuum {t_vacuum} s");
    assert!(v_impact < g * t_vacuum, "{v_impact} ft/s");
    assert!(v_impact > 0.0);
    // Going east the whole time
    assert!(fdm.get_property_value("velocities/v-east-fps").unwrap() > 0.0);
}
