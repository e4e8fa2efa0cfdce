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

use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;

mod ground;
mod location;

pub use ground::{DefaultGroundCallback, GroundCallback, GroundContact};
pub use location::Location;

/// WGS84 semi-major axis in feet
pub const WGS84_SEMI_MAJOR_FT: f64 = 20_925_646.325_46;
/// WGS84 semi-minor axis in feet
pub const WGS84_SEMI_MINOR_FT: f64 = 20_855_486.595_1;
/// Earth rotation rate in rad/s
pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
/// Earth gravitational parameter in ft^3/s^2
pub const EARTH_GM_FT3_S2: f64 = 14.076_441_757_2e15;
/// Second zonal harmonic of the WGS84 gravity field
pub const EARTH_J2: f64 = 1.082_629_82e-3;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LocationError {
    #[snafu(display("geodetic quantities require a reference ellipsoid to be set"))]
    EllipsoidUnset,
}

/// A reference ellipsoid of revolution, in feet.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub semi_major_ft: f64,
    pub semi_minor_ft: f64,
}

impl Ellipsoid {
    pub const fn new(semi_major_ft: f64, semi_minor_ft: f64) -> Self {
        Self {
            semi_major_ft,
            semi_minor_ft,
        }
    }

    pub const fn wgs84() -> Self {
        Self::new(WGS84_SEMI_MAJOR_FT, WGS84_SEMI_MINOR_FT)
    }

    /// A sphere of the provided radius
    pub const fn sphere(radius_ft: f64) -> Self {
        Self::new(radius_ft, radius_ft)
    }

    /// Ratio of the semi-minor to the semi-major axis
    pub fn ec(&self) -> f64 {
        self.semi_minor_ft / self.semi_major_ft
    }

    pub fn ec2(&self) -> f64 {
        self.ec().powi(2)
    }

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        1.0 - self.ec2()
    }

    /// Linear eccentricity scaled by the eccentricity, `a * e^2`
    pub fn c(&self) -> f64 {
        self.semi_major_ft * self.e2()
    }

    pub fn flattening(&self) -> f64 {
        1.0 - self.ec()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
