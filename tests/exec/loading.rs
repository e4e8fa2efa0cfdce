use gyre::dynamics::ModelKind;
use gyre::earth::Ellipsoid;
use gyre::io::aircraft::SystemRef;
use gyre::io::{AircraftConfig, ConfigRepr, DispersionOptions, LoaderOptions};
use gyre::linalg::Vector3;
use gyre::{DefaultGroundCallback, FdmError, FdmExec};

use crate::{data_dir, init_logger, load_aircraft};

#[test]
fn trainer_documents_are_resolved() {
    let fdm = load_aircraft("trainer");
    assert!(fdm.model_loaded());
    assert_eq!(fdm.aircraft().name(), "trainer");
    assert_eq!(fdm.init_errors(), 0);

    // The engine file comes from the shared engine directory, its location is overridden by the aircraft
    let thrusters = fdm.propulsion().thrusters();
    assert_eq!(thrusters.len(), 1);
    assert_eq!(thrusters[0].force().location(), Vector3::new(40.0, 0.0, 36.0));
    assert_eq!(fdm.systems().system_names(), ["pitch".to_string()]);
    assert_eq!(fdm.ground_reactions().contacts().len(), 4);

    // Nominal point masses without a dispersion seed
    assert_eq!(
        fdm.get_property_value("inertia/pointmass-weight-lbs[1]").unwrap(),
        220.0
    );
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 2000.0);
}

#[test]
fn catalog_lists_every_model() {
    let fdm = load_aircraft("trainer");
    let catalog = fdm.property_catalog();
    for entry in [
        "/simulation/sim-time-sec (R)",
        "/simulation/dt (RW)",
        "/fcs/throttle-cmd-norm (RW)",
        "/ic/h-sl-ft (RW)",
        "/position/h-agl-ft (R)",
        "/accelerations/wdot-ft_sec2 (R)",
        "/gear/wow (R)",
    ] {
        assert!(catalog.iter().any(|e| e == entry), "{entry} missing from the catalog");
    }
    let ic = fdm.query_property_catalog("/ic/");
    assert!(ic.len() > 30);
    assert!(ic.iter().all(|e| e.ends_with("(RW)")));
}

#[test]
fn schedule_runs_dependencies_first() {
    init_logger();
    let fdm = FdmExec::new().unwrap();
    let position = |kind| {
        fdm.schedule()
            .iter()
            .position(|k| *k == kind)
            .unwrap()
    };
    let systems = position(ModelKind::Systems);
    let mass_balance = position(ModelKind::MassBalance);
    assert!(systems < mass_balance);
    for force_model in [
        ModelKind::Propulsion,
        ModelKind::Aerodynamics,
        ModelKind::GroundReactions,
    ] {
        assert!(mass_balance < position(force_model));
        assert!(position(force_model) < position(ModelKind::Aircraft));
    }
    assert_eq!(position(ModelKind::Output), fdm.schedule().len() - 1);
}

#[test]
fn warnings_do_not_abort_the_load() {
    // Unknown section
    let ball = load_aircraft("ball");
    assert!(ball.model_loaded());
    assert!(ball.ground_reactions().contacts().len() == 1);
    // Beta release
    let store = load_aircraft("mk82_nodrag");
    assert!(store.model_loaded());
    assert_eq!(store.propulsion().thrusters().len(), 0);
}

#[test]
fn missing_documents() {
    init_logger();
    let mut fdm = FdmExec::new().unwrap();
    fdm.set_root_dir(data_dir());
    assert!(matches!(
        fdm.load_model("concorde"),
        Err(FdmError::AircraftNotFound { .. })
    ));
    assert!(!fdm.model_loaded());

    fdm.load_model("ball").unwrap();
    assert!(matches!(
        fdm.load_ic("reset99"),
        Err(FdmError::FdmConfig { .. })
    ));
    fdm.load_ic("reset00").unwrap();
    assert!((fdm.ic().altitude_asl() - 3_000.0).abs() < 1e-9);
}

#[test]
fn aborted_load_leaves_the_executive_unconfigured() {
    init_logger();
    let mut fdm = FdmExec::new().unwrap();
    fdm.set_root_dir(data_dir());
    let trainer = AircraftConfig::load(data_dir().join("aircraft/trainer/trainer.yaml")).unwrap();
    let catalog = fdm.property_catalog();

    // Point masses, engine and contacts are loaded before the flight control file is looked up
    let mut broken = trainer.clone();
    broken.flight_control = Some(SystemRef::File {
        file: "does_not_exist".to_string(),
    });
    assert!(matches!(
        fdm.load_model_config(broken),
        Err(FdmError::FdmConfig { .. })
    ));
    assert!(!fdm.model_loaded());
    assert_eq!(fdm.property_catalog(), catalog);
    assert!(!fdm.properties().has_node("inertia/pointmass-weight-lbs"));
    assert!(!fdm.properties().has_node("fcs/throttle-cmd-norm"));
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 0.0);
    assert!(fdm.propulsion().thrusters().is_empty());
    assert!(fdm.ground_reactions().contacts().is_empty());
    assert!(fdm.aircraft().name().is_empty());

    fdm.load_model_config(trainer).unwrap();
    assert!(fdm.model_loaded());
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 2000.0);
    assert_eq!(
        fdm.get_property_value("inertia/pointmass-weight-lbs").unwrap(),
        180.0
    );
    assert_eq!(fdm.propulsion().thrusters().len(), 1);
    assert_eq!(fdm.ground_reactions().contacts().len(), 4);
    assert_eq!(fdm.systems().system_names(), ["pitch".to_string()]);
    fdm.set_property_value("fcs/throttle-cmd-norm", 0.5).unwrap();
    assert_eq!(fdm.propulsion().state().read().thrusters[0].throttle_cmd, 0.5);

    // A second load is refused and keeps the loaded aircraft
    let again = AircraftConfig::load(data_dir().join("aircraft/ball/ball.yaml")).unwrap();
    assert!(matches!(
        fdm.load_model_config(again),
        Err(FdmError::FdmConfig { .. })
    ));
    assert_eq!(fdm.aircraft().name(), "trainer");
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 2000.0);
}

#[test]
fn aborted_slave_load_is_released() {
    init_logger();
    let mut fdm = FdmExec::new().unwrap();
    fdm.set_root_dir(data_dir());
    let carrier = AircraftConfig::load(data_dir().join("aircraft/carrier/carrier.yaml")).unwrap();
    let mut broken = carrier.clone();
    broken.system.push(SystemRef::File {
        file: "does_not_exist".to_string(),
    });
    assert!(fdm.load_model_config(broken).is_err());
    assert!(fdm.slaves().is_empty());

    fdm.load_model_config(carrier).unwrap();
    assert_eq!(fdm.slaves().len(), 1);
    assert_eq!(fdm.get_property_value("inertia/weight-lbs").unwrap(), 2000.0);
}

#[test]
fn ground_callback_swap_moves_to_its_ellipsoid() {
    let mut fdm = load_aircraft("ball");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    assert!((fdm.get_property_value("position/h-sl-ft").unwrap() - 3_000.0).abs() < 1e-3);

    let radius = Ellipsoid::wgs84().semi_major_ft;
    fdm.set_ground_callback(Box::new(DefaultGroundCallback::new(radius, radius)))
        .unwrap();
    let location = fdm.propagate().location();
    assert_eq!(location.ellipsoid(), Some(Ellipsoid::new(radius, radius)));
    // At 47 degrees of latitude the WGS84 surface is well inside the equatorial sphere
    let h = fdm.get_property_value("position/h-sl-ft").unwrap();
    assert!((h - (location.radius() - radius)).abs() < 1e-6, "h = {h}");
    assert!(h < 0.0);
    assert_eq!(fdm.get_property_value("position/h-agl-ft").unwrap(), h);
}

#[test]
fn dispersions_are_seeded() {
    init_logger();
    let fuel = |seed: Option<u64>| {
        let options = match seed {
            Some(seed) => LoaderOptions::builder()
                .dispersion(DispersionOptions { seed })
                .build(),
            None => LoaderOptions::default(),
        };
        let mut fdm = FdmExec::with_options(options).unwrap();
        fdm.set_root_dir(data_dir());
        fdm.load_model("trainer").unwrap();
        fdm.get_property_value("inertia/pointmass-weight-lbs[1]")
            .unwrap()
    };

    let nominal = fuel(None);
    let first = fuel(Some(7));
    let again = fuel(Some(7));
    let other = fuel(Some(8));
    assert_eq!(nominal, 220.0);
    assert_eq!(first, again);
    assert_ne!(first, other);
    for sample in [first, other] {
        assert!((200.0..=240.0).contains(&sample), "{sample} outside of the spread");
    }
    // Values without a dispersion are never sampled
    let mut fdm = FdmExec::with_options(
        LoaderOptions::builder()
            .dispersion(DispersionOptions { seed: 7 })
            .build(),
    )
    .unwrap();
    fdm.set_root_dir(data_dir());
    fdm.load_model("trainer").unwrap();
    assert_eq!(
        fdm.get_property_value("inertia/pointmass-weight-lbs").unwrap(),
        180.0
    );
}
