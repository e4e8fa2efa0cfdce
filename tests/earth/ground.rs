use gyre::earth::{Ellipsoid, GroundCallback};
use gyre::linalg::Vector3;
use gyre::{DefaultGroundCallback, Location};

use approx::assert_abs_diff_eq;
use rstest::*;

#[test]
fn spherical_terrain_grid() {
    let radius = 20_925_646.0;
    let mut cb = DefaultGroundCallback::new(radius, radius);
    cb.set_terrain_elevation(120.0);

    for lon_deg in (-180..180).step_by(45) {
        for lat_deg in (-80..=80).step_by(20) {
            let (lon, lat) = (f64::from(lon_deg).to_radians(), f64::from(lat_deg).to_radians());
            let loc = Location::from_spherical(lon, lat, radius + 1_000.0);
            let contact = cb.agl_level_now(&loc).unwrap();
            assert_abs_diff_eq!(contact.agl, 880.0, epsilon = 1e-6);
            assert_abs_diff_eq!(contact.contact.radius(), radius + 120.0, epsilon = 1e-6);
            // On a sphere the normal is radial
            assert_abs_diff_eq!(contact.normal, loc.ecef() / loc.radius(), epsilon = 1e-12);
        }
    }
}

#[test]
fn sphere_surface_grid_with_poles() {
    let radius = 20_925_646.0;
    let cb = DefaultGroundCallback::new(radius, radius);

    for lat_deg in (-90..=90).step_by(30) {
        for lon_deg in (0..=360).step_by(45) {
            let (lon, lat) = (f64::from(lon_deg).to_radians(), f64::from(lat_deg).to_radians());
            let loc = Location::from_spherical(lon, lat, radius);
            let contact = cb.agl_level_now(&loc).unwrap();
            assert_abs_diff_eq!(contact.agl, 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(contact.contact.ecef(), loc.ecef(), epsilon = 1e-6);
            assert_abs_diff_eq!(contact.normal, loc.ecef() / radius, epsilon = 1e-9);
        }
    }
}

#[rstest]
#[case(0.0)]
#[case(0.5)]
#[case(-1.1)]
#[case(1.4)]
fn ellipsoid_normal_is_geodetic(#[case] latitude: f64) {
    let cb = DefaultGroundCallback::wgs84();
    let mut loc = Location::new();
    loc.set_ellipsoid(Ellipsoid::wgs84());
    loc.set_position_geodetic(0.8, latitude, 3_000.0).unwrap();

    let contact = cb.agl_level_now(&loc).unwrap();
    assert_abs_diff_eq!(contact.agl, 3_000.0, epsilon = 1e-4);
    assert_abs_diff_eq!(contact.normal.norm(), 1.0, epsilon = 1e-12);
    let expected = Vector3::new(
        latitude.cos() * 0.8_f64.cos(),
        latitude.cos() * 0.8_f64.sin(),
        latitude.sin(),
    );
    assert_abs_diff_eq!(contact.normal, expected, epsilon = 1e-10);

    // The contact point lies on the terrain, straight below along the normal
    assert_abs_diff_eq!(contact.contact.geod_altitude().unwrap(), 0.0, epsilon = 1e-4);
    let drop = loc.ecef() - contact.contact.ecef();
    assert_abs_diff_eq!(drop, contact.normal * 3_000.0, epsilon = 1e-2);
}

#[test]
fn callback_is_swappable() {
    let callbacks: Vec<Box<dyn GroundCallback>> = vec![
        Box::new(DefaultGroundCallback::wgs84()),
        Box::new(DefaultGroundCallback::new(20_000_000.0, 20_000_000.0)),
    ];
    let loc = Location::from_spherical(0.0, 0.0, 20_925_646.0 + 50.0);
    let agl = callbacks
        .iter()
        .map(|cb| cb.agl_level(0.0, &loc).unwrap().agl)
        .collect::<Vec<_>>();
    assert_abs_diff_eq!(agl[0], 50.0 + 20_925_646.0 - callbacks[0].ellipsoid().semi_major_ft, epsilon = 1e-4);
    assert_abs_diff_eq!(agl[1], 925_696.0, epsilon = 1e-4);
}
