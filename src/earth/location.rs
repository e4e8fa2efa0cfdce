/*
    Gyre, flight dynamics executive
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{Ellipsoid, LocationError};
use crate::linalg::{Matrix3, Vector3};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::sync::OnceLock;

/// Geodetic coordinates, only available once an ellipsoid is set.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Geodetic {
    latitude: f64,
    altitude: f64,
}

/// Every quantity derived from the ECEF vector, computed in one go.
#[derive(Clone, Debug, PartialEq)]
struct Derived {
    longitude: f64,
    latitude: f64,
    radius: f64,
    sin_lon: f64,
    cos_lon: f64,
    sin_lat: f64,
    cos_lat: f64,
    tec2l: Matrix3<f64>,
    tl2ec: Matrix3<f64>,
    geodetic: Option<Geodetic>,
}

impl Derived {
    fn compute(ecloc: &Vector3<f64>, ellipse: Option<&Ellipsoid>) -> Self {
        let radius = ecloc.norm();
        let rxy = ecloc.x.hypot(ecloc.y);

        let (longitude, sin_lon, cos_lon) = if rxy == 0.0 {
            (0.0, 0.0, 1.0)
        } else {
            (ecloc.y.atan2(ecloc.x), ecloc.y / rxy, ecloc.x / rxy)
        };

        let (latitude, sin_lat, cos_lat, geodetic) = if radius == 0.0 {
            let geodetic = ellipse.map(|e| Geodetic {
                latitude: 0.0,
                altitude: -e.semi_major_ft,
            });
            (0.0, 0.0, 1.0, geodetic)
        } else {
            (
                ecloc.z.atan2(rxy),
                ecloc.z / radius,
                rxy / radius,
                ellipse.map(|e| fukushima(e, rxy, ecloc.z)),
            )
        };

        // ECEF to local NED
        let tec2l = Matrix3::new(
            -cos_lon * sin_lat,
            -sin_lon * sin_lat,
            cos_lat,
            -sin_lon,
            cos_lon,
            0.0,
            -cos_lon * cos_lat,
            -sin_lon * cos_lat,
            -sin_lat,
        );

        Self {
            longitude,
            latitude,
            radius,
            sin_lon,
            cos_lon,
            sin_lat,
            cos_lat,
            tl2ec: tec2l.transpose(),
            tec2l,
            geodetic,
        }
    }
}

/// Geodetic latitude and altitude from the distance to the polar axis and the Z coordinate.
///
/// Reference: T. Fukushima, "Transformation from Cartesian to geodetic coordinates accelerated by
/// Halley's method", Journal of Geodesy (2006) 79: 689-693. A single iteration is sufficient for
/// any terrestrial altitude, and the result is exact for a sphere.
fn fukushima(ellipse: &Ellipsoid, rxy: f64, z: f64) -> Geodetic {
    let a = ellipse.semi_major_ft;
    let ec = ellipse.ec();
    let ec2 = ellipse.ec2();
    let c = ellipse.c();

    let s0 = z.abs();
    let zc = ec * s0;
    let c0 = ec * rxy;
    let c02 = c0 * c0;
    let s02 = s0 * s0;
    let a02 = c02 + s02;
    let a0 = a02.sqrt();
    let a03 = a02 * a0;
    let s1 = zc * a03 + c * s02 * s0;
    let c1 = rxy * a03 - c * c02 * c0;
    let cs0c0 = c * c0 * s0;
    let b0 = 1.5 * cs0c0 * ((rxy * s0 - zc * c0) * a0 - cs0c0);
    let s1 = s1 * a03 - b0 * s0;
    let cc = ec * (c1 * a03 - b0 * c0);

    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    // On the polar axis cc is zero and atan(inf) yields the pole.
    let latitude = sign * (s1 / cc).atan();
    let s12 = s1 * s1;
    let cc2 = cc * cc;
    let norm = (s12 + cc2).sqrt();
    let altitude = (rxy * cc + s0 * s1 - a * (ec2 * s12 + cc2).sqrt()) / norm;

    Geodetic { latitude, altitude }
}

/// A location in the Earth centered, Earth fixed frame, in feet.
///
/// The ECEF vector is the master representation. Longitude, latitudes, radius, altitude and the
/// local frame rotations are derived lazily: the first accessor after a mutation computes all of
/// them at once and stores them, subsequent accessors return the stored values.
#[derive(Clone, Default)]
pub struct Location {
    ecloc: Vector3<f64>,
    ellipse: Option<Ellipsoid>,
    cache: OnceLock<Derived>,
}

impl Location {
    /// A location at the center of the Earth.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ecef(ecloc: Vector3<f64>) -> Self {
        Self {
            ecloc,
            ..Default::default()
        }
    }

    /// Builds a location from its longitude and geocentric latitude (radians), and its radius (feet).
    pub fn from_spherical(longitude: f64, latitude: f64, radius: f64) -> Self {
        let mut me = Self::new();
        me.set_position(longitude, latitude, radius);
        me
    }

    fn derived(&self) -> &Derived {
        self.cache
            .get_or_init(|| Derived::compute(&self.ecloc, self.ellipse.as_ref()))
    }

    fn invalidate(&mut self) {
        self.cache.take();
    }

    /// Returns whether the derived quantities are up to date with the ECEF vector.
    pub fn is_cache_valid(&self) -> bool {
        self.cache.get().is_some()
    }

    pub fn ecef(&self) -> Vector3<f64> {
        self.ecloc
    }

    pub fn x(&self) -> f64 {
        self.ecloc.x
    }

    pub fn y(&self) -> f64 {
        self.ecloc.y
    }

    pub fn z(&self) -> f64 {
        self.ecloc.z
    }

    pub fn set_ecef(&mut self, ecloc: Vector3<f64>) {
        self.invalidate();
        self.ecloc = ecloc;
    }

    pub fn set_x(&mut self, x: f64) {
        self.invalidate();
        self.ecloc.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.invalidate();
        self.ecloc.y = y;
    }

    pub fn set_z(&mut self, z: f64) {
        self.invalidate();
        self.ecloc.z = z;
    }

    /// Sets the longitude in radians, keeping latitude and radius.
    /// On the polar axis the longitude is undefined and this is a no-op.
    pub fn set_longitude(&mut self, longitude: f64) {
        let mut rtmp = self.ecloc.x.hypot(self.ecloc.y);
        // A location at the origin has no direction, place it on the X axis.
        if self.ecloc.norm() == 0.0 {
            rtmp = 1.0;
        }
        if rtmp == 0.0 {
            return;
        }
        self.invalidate();
        self.ecloc.x = rtmp * longitude.cos();
        self.ecloc.y = rtmp * longitude.sin();
    }

    /// Sets the geocentric latitude in radians, keeping longitude and radius.
    pub fn set_latitude(&mut self, latitude: f64) {
        self.invalidate();
        let mut r = self.ecloc.norm();
        if r == 0.0 {
            self.ecloc.x = 1.0;
            r = 1.0;
        }
        let rtmp = self.ecloc.x.hypot(self.ecloc.y);
        if rtmp != 0.0 {
            let fac = r / rtmp * latitude.cos();
            self.ecloc.x *= fac;
            self.ecloc.y *= fac;
        } else {
            self.ecloc.x = r * latitude.cos();
            self.ecloc.y = 0.0;
        }
        self.ecloc.z = r * latitude.sin();
    }

    /// Sets the distance from the center of the Earth, keeping the direction.
    pub fn set_radius(&mut self, radius: f64) {
        self.invalidate();
        let rold = self.ecloc.norm();
        if rold == 0.0 {
            self.ecloc.x = radius;
        } else {
            self.ecloc *= radius / rold;
        }
    }

    /// Sets the position from longitude, geocentric latitude (radians) and radius (feet).
    pub fn set_position(&mut self, longitude: f64, latitude: f64, radius: f64) {
        self.invalidate();
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let (sin_lon, cos_lon) = longitude.sin_cos();
        self.ecloc = Vector3::new(
            radius * cos_lat * cos_lon,
            radius * cos_lat * sin_lon,
            radius * sin_lat,
        );
    }

    /// Sets the position from longitude, geodetic latitude (radians) and height above the ellipsoid (feet).
    pub fn set_position_geodetic(
        &mut self,
        longitude: f64,
        geod_latitude: f64,
        height: f64,
    ) -> Result<(), LocationError> {
        let ellipse = self.ellipse.ok_or(LocationError::EllipsoidUnset)?;
        self.invalidate();
        let (sin_lat, cos_lat) = geod_latitude.sin_cos();
        let (sin_lon, cos_lon) = longitude.sin_cos();
        let e2 = ellipse.e2();
        let rn = ellipse.semi_major_ft / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        self.ecloc = Vector3::new(
            (rn + height) * cos_lat * cos_lon,
            (rn + height) * cos_lat * sin_lon,
            ((1.0 - e2) * rn + height) * sin_lat,
        );
        Ok(())
    }

    /// Sets the reference ellipsoid used for the geodetic quantities.
    pub fn set_ellipse(&mut self, semi_major_ft: f64, semi_minor_ft: f64) {
        self.set_ellipsoid(Ellipsoid::new(semi_major_ft, semi_minor_ft));
    }

    pub fn set_ellipsoid(&mut self, ellipse: Ellipsoid) {
        self.invalidate();
        self.ellipse = Some(ellipse);
    }

    pub fn ellipsoid(&self) -> Option<Ellipsoid> {
        self.ellipse
    }

    /// Longitude in radians, between -pi and pi.
    pub fn longitude(&self) -> f64 {
        self.derived().longitude
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude().to_degrees()
    }

    /// Geocentric latitude in radians.
    pub fn latitude(&self) -> f64 {
        self.derived().latitude
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude().to_degrees()
    }

    /// Distance to the center of the Earth in feet.
    pub fn radius(&self) -> f64 {
        self.derived().radius
    }

    pub fn sin_longitude(&self) -> f64 {
        self.derived().sin_lon
    }

    pub fn cos_longitude(&self) -> f64 {
        self.derived().cos_lon
    }

    pub fn sin_latitude(&self) -> f64 {
        self.derived().sin_lat
    }

    pub fn cos_latitude(&self) -> f64 {
        self.derived().cos_lat
    }

    pub fn tan_latitude(&self) -> f64 {
        let derived = self.derived();
        derived.sin_lat / derived.cos_lat
    }

    fn geodetic(&self) -> Result<Geodetic, LocationError> {
        self.derived().geodetic.ok_or(LocationError::EllipsoidUnset)
    }

    /// Geodetic latitude in radians.
    pub fn geod_latitude_rad(&self) -> Result<f64, LocationError> {
        Ok(self.geodetic()?.latitude)
    }

    pub fn geod_latitude_deg(&self) -> Result<f64, LocationError> {
        Ok(self.geod_latitude_rad()?.to_degrees())
    }

    /// Height above the reference ellipsoid in feet.
    pub fn geod_altitude(&self) -> Result<f64, LocationError> {
        Ok(self.geodetic()?.altitude)
    }

    /// Radius of the ellipsoid below this location, in feet.
    pub fn sea_level_radius(&self) -> Result<f64, LocationError> {
        let ellipse = self.ellipse.ok_or(LocationError::EllipsoidUnset)?;
        let cos_lat = self.cos_latitude();
        Ok(ellipse.semi_major_ft * ellipse.ec() / (1.0 - ellipse.e2() * cos_lat * cos_lat).sqrt())
    }

    /// Rotation from ECEF to the local North-East-Down frame at this location.
    pub fn tec2l(&self) -> &Matrix3<f64> {
        &self.derived().tec2l
    }

    /// Rotation from the local North-East-Down frame at this location to ECEF.
    pub fn tl2ec(&self) -> &Matrix3<f64> {
        &self.derived().tl2ec
    }

    /// Converts a vector of the local frame anchored here into an ECEF location.
    pub fn local_to_location(&self, local: &Vector3<f64>) -> Location {
        let mut loc = Location::from_ecef(self.tl2ec() * local + self.ecloc);
        loc.ellipse = self.ellipse;
        loc
    }

    /// Converts an ECEF position into a vector of the local frame anchored here.
    pub fn location_to_local(&self, ecef: &Vector3<f64>) -> Vector3<f64> {
        self.tec2l() * (ecef - self.ecloc)
    }

    /// Great circle distance in feet to the provided geocentric longitude and latitude (radians).
    pub fn distance_to(&self, target_longitude: f64, target_latitude: f64) -> f64 {
        let delta_lat = target_latitude - self.latitude();
        let delta_lon = target_longitude - self.longitude();
        let hav = (0.5 * delta_lat).sin().powi(2)
            + self.cos_latitude() * target_latitude.cos() * (0.5 * delta_lon).sin().powi(2);
        2.0 * self.radius() * hav.sqrt().atan2((1.0 - hav).sqrt())
    }

    /// Initial great circle heading in radians (between 0 and 2 pi) to the provided geocentric longitude and latitude.
    pub fn heading_to(&self, target_longitude: f64, target_latitude: f64) -> f64 {
        let delta_lon = target_longitude - self.longitude();
        let y = delta_lon.sin() * target_latitude.cos();
        let x = self.cos_latitude() * target_latitude.sin()
            - self.sin_latitude() * target_latitude.cos() * delta_lon.cos();
        let heading = y.atan2(x);
        if heading < 0.0 {
            heading + TAU
        } else {
            heading
        }
    }
}

impl From<Vector3<f64>> for Location {
    fn from(ecloc: Vector3<f64>) -> Self {
        Self::from_ecef(ecloc)
    }
}

impl PartialEq for Location {
    /// Only the ECEF vectors are compared.
    fn eq(&self, other: &Self) -> bool {
        self.ecloc == other.ecloc
    }
}

impl Add<Vector3<f64>> for Location {
    type Output = Location;

    fn add(mut self, rhs: Vector3<f64>) -> Location {
        self.set_ecef(self.ecloc + rhs);
        self
    }
}

impl Sub<Vector3<f64>> for Location {
    type Output = Location;

    fn sub(mut self, rhs: Vector3<f64>) -> Location {
        self.set_ecef(self.ecloc - rhs);
        self
    }
}

impl Sub<&Location> for &Location {
    type Output = Vector3<f64>;

    fn sub(self, rhs: &Location) -> Vector3<f64> {
        self.ecloc - rhs.ecloc
    }
}

impl Mul<f64> for Location {
    type Output = Location;

    fn mul(mut self, rhs: f64) -> Location {
        self.set_ecef(self.ecloc * rhs);
        self
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Location [{}, {}, {}] ft",
            self.ecloc.x, self.ecloc.y, self.ecloc.z
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.geodetic() {
            Ok(geod) => write!(
                f,
                "lon {:.6} deg, geod. lat {:.6} deg, alt {:.3} ft",
                self.longitude_deg(),
                geod.latitude * 180.0 / PI,
                geod.altitude
            ),
            Err(_) => write!(
                f,
                "lon {:.6} deg, lat {:.6} deg, radius {:.3} ft",
                self.longitude_deg(),
                self.latitude_deg(),
                self.radius()
            ),
        }
    }
}
