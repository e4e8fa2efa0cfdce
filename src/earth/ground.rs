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

use super::{Ellipsoid, Location, LocationError};
use crate::linalg::Vector3;
use std::fmt;

/// The point of the terrain below a location.
#[derive(Clone, Debug)]
pub struct GroundContact {
    /// Height of the location above the terrain, in feet
    pub agl: f64,
    /// Terrain point below the location
    pub contact: Location,
    /// Unit normal of the terrain at the contact point, in ECEF
    pub normal: Vector3<f64>,
    /// Velocity of the terrain at the contact point, in ECEF (ft/s)
    pub velocity: Vector3<f64>,
    /// Angular velocity of the terrain at the contact point, in ECEF (rad/s)
    pub angular_velocity: Vector3<f64>,
}

/// Provides the terrain below any location. Implementors may be swapped at run time, for example to
/// load an elevation model or moving ship decks.
pub trait GroundCallback: Send + Sync + fmt::Debug {
    /// Returns the terrain contact below `location` at `time` (seconds).
    fn agl_level(&self, time: f64, location: &Location) -> Result<GroundContact, LocationError>;

    /// Same as [`GroundCallback::agl_level`] at the time last set with [`GroundCallback::set_time`].
    fn agl_level_now(&self, location: &Location) -> Result<GroundContact, LocationError> {
        self.agl_level(self.time(), location)
    }

    fn time(&self) -> f64;

    fn set_time(&mut self, time: f64);

    /// Elevation of the terrain above the reference ellipsoid, in feet.
    fn terrain_elevation(&self) -> f64;

    fn set_terrain_elevation(&mut self, elevation: f64);

    /// The reference ellipsoid of the terrain.
    fn ellipsoid(&self) -> Ellipsoid;
}

/// A flat terrain at a constant elevation above a reference ellipsoid.
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultGroundCallback {
    ellipse: Ellipsoid,
    terrain_elevation: f64,
    time: f64,
}

impl DefaultGroundCallback {
    pub fn new(semi_major_ft: f64, semi_minor_ft: f64) -> Self {
        Self {
            ellipse: Ellipsoid::new(semi_major_ft, semi_minor_ft),
            terrain_elevation: 0.0,
            time: 0.0,
        }
    }

    pub fn wgs84() -> Self {
        let ellipse = Ellipsoid::wgs84();
        Self::new(ellipse.semi_major_ft, ellipse.semi_minor_ft)
    }
}

impl Default for DefaultGroundCallback {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl GroundCallback for DefaultGroundCallback {
    fn agl_level(&self, _time: f64, location: &Location) -> Result<GroundContact, LocationError> {
        let mut here = location.clone();
        here.set_ellipsoid(self.ellipse);

        let longitude = here.longitude();
        let latitude = here.geod_latitude_rad()?;
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let (sin_lon, cos_lon) = longitude.sin_cos();

        let mut contact = here.clone();
        contact.set_position_geodetic(longitude, latitude, self.terrain_elevation)?;

        Ok(GroundContact {
            agl: here.geod_altitude()? - self.terrain_elevation,
            contact,
            normal: Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        })
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn terrain_elevation(&self) -> f64 {
        self.terrain_elevation
    }

    fn set_terrain_elevation(&mut self, elevation: f64) {
        self.terrain_elevation = elevation;
    }

    fn ellipsoid(&self) -> Ellipsoid {
        self.ellipse
    }
}

#[cfg(test)]
mod ut_ground {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sphere_agl() {
        let radius = 20_000_000.0;
        let cb = DefaultGroundCallback::new(radius, radius);
        let loc = Location::from_spherical(0.3, -0.7, radius + 1234.5);
        let contact = cb.agl_level_now(&loc).unwrap();
        assert_abs_diff_eq!(contact.agl, 1234.5, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.contact.radius(), radius, epsilon = 1e-6);
        assert_abs_diff_eq!(contact.normal, loc.ecef() / loc.radius(), epsilon = 1e-12);
        assert_eq!(contact.velocity, Vector3::zeros());
    }

    #[test]
    fn terrain_elevation_offsets_agl() {
        let mut cb = DefaultGroundCallback::wgs84();
        let mut loc = Location::new();
        loc.set_ellipsoid(Ellipsoid::wgs84());
        loc.set_position_geodetic(1.0, 0.6, 5000.0).unwrap();
        cb.set_terrain_elevation(1500.0);
        cb.set_time(12.0);
        assert_eq!(cb.time(), 12.0);
        let contact = cb.agl_level_now(&loc).unwrap();
        assert_abs_diff_eq!(contact.agl, 3500.0, epsilon = 1e-5);
        assert_abs_diff_eq!(
            contact.contact.geod_altitude().unwrap(),
            1500.0,
            epsilon = 1e-5
        );
    }
}
