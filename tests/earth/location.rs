use gyre::earth::Ellipsoid;
use gyre::linalg::Vector3;
use gyre::Location;

use approx::assert_abs_diff_eq;
use rstest::*;

#[rstest]
#[case(0.0, 0.0, 0.0)]
#[case(-2.1, 0.7, 35_000.0)]
#[case(3.0, -1.2, -1_200.0)]
#[case(1.0, 1.5, 150_000.0)]
fn geodetic_round_trip(#[case] longitude: f64, #[case] latitude: f64, #[case] height: f64) {
    let mut loc = Location::new();
    loc.set_ellipsoid(Ellipsoid::wgs84());
    loc.set_position_geodetic(longitude, latitude, height).unwrap();

    assert_abs_diff_eq!(loc.longitude(), longitude, epsilon = 1e-12);
    assert_abs_diff_eq!(loc.geod_latitude_rad().unwrap(), latitude, epsilon = 1e-10);
    assert_abs_diff_eq!(loc.geod_altitude().unwrap(), height, epsilon = 1e-4);
    // Geocentric latitude is closer to the equator than the geodetic latitude
    assert!(loc.latitude().abs() <= latitude.abs() + 1e-12);
}

#[test]
fn cache_is_idempotent() {
    let mut loc = Location::from_spherical(0.4, 0.2, 20_925_646.0);
    loc.set_ellipsoid(Ellipsoid::wgs84());
    assert!(!loc.is_cache_valid());

    let first = (loc.longitude(), loc.latitude(), loc.radius(), *loc.tec2l());
    assert!(loc.is_cache_valid());
    let second = (loc.longitude(), loc.latitude(), loc.radius(), *loc.tec2l());
    assert_eq!(first, second);

    // Any mutation drops the cache, the next accessor recomputes from the ECEF vector
    loc.set_z(loc.z() + 1_000.0);
    assert!(!loc.is_cache_valid());
    assert!(loc.latitude() > first.1);
    assert_abs_diff_eq!(loc.longitude(), first.0, epsilon = 1e-14);
}

#[test]
fn local_offsets_compose() {
    let mut origin = Location::new();
    origin.set_ellipsoid(Ellipsoid::wgs84());
    origin.set_position_geodetic(-1.4, 0.6, 2_000.0).unwrap();

    let offsets = [
        Vector3::new(100.0, 0.0, 0.0),
        Vector3::new(0.0, -250.0, 10.0),
        Vector3::new(-3.0, 4.0, -5.0),
    ];
    for offset in offsets {
        let there = origin.local_to_location(&offset);
        assert_eq!(there.ellipsoid(), origin.ellipsoid());
        assert_abs_diff_eq!(
            origin.location_to_local(&there.ecef()),
            offset,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            (there.ecef() - origin.ecef()).norm(),
            offset.norm(),
            epsilon = 1e-6
        );
    }

    // The local frame is orthonormal
    let tec2l = *origin.tec2l();
    assert_abs_diff_eq!(
        tec2l * origin.tl2ec(),
        gyre::linalg::Matrix3::identity(),
        epsilon = 1e-14
    );
}

#[test]
fn climbing_in_the_local_frame() {
    let mut origin = Location::new();
    origin.set_ellipsoid(Ellipsoid::sphere(20_000_000.0));
    origin.set_position_geodetic(0.3, -0.4, 500.0).unwrap();
    // Down is negative altitude
    let above = origin.local_to_location(&Vector3::new(0.0, 0.0, -1_500.0));
    assert_abs_diff_eq!(above.geod_altitude().unwrap(), 2_000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(above.longitude(), 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(above.geod_latitude_rad().unwrap(), -0.4, epsilon = 1e-12);
}
