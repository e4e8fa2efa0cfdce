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

use super::{Model, ModelBase, ModelError, ModelKind, ModelLocationSnafu};
use crate::earth::{GroundCallback, Location, EARTH_GM_FT3_S2, EARTH_J2, EARTH_ROTATION_RAD_S};
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, Shared};
use snafu::ResultExt;

/// The gravity models, the discriminants are the values of `simulation/gravity-model`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GravityModel {
    /// Inverse square law
    Standard = 0,
    /// Inverse square law with the J2 term of the WGS84 ellipsoid
    #[default]
    Wgs84 = 1,
}

impl GravityModel {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Wgs84),
            _ => None,
        }
    }
}

/// Gravitational acceleration at `location`, in ECEF (ft/s^2).
pub fn gravity_ecef(model: GravityModel, location: &Location, semi_major_ft: f64) -> Vector3<f64> {
    let r = location.radius();
    if r == 0.0 {
        return Vector3::zeros();
    }
    let unit = location.ecef() / r;
    let magnitude = EARTH_GM_FT3_S2 / (r * r);
    match model {
        GravityModel::Standard => -unit * magnitude,
        GravityModel::Wgs84 => {
            let sin_lat = location.sin_latitude();
            let pre = 1.5 * EARTH_J2 * (semi_major_ft / r).powi(2);
            let xy = 1.0 - 5.0 * sin_lat * sin_lat;
            let z = 3.0 - 5.0 * sin_lat * sin_lat;
            -Vector3::new(
                unit.x * (1.0 + pre * xy),
                unit.y * (1.0 + pre * xy),
                unit.z * (1.0 + pre * z),
            ) * magnitude
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InertialState {
    pub gravity_model: GravityModel,
    /// Gravitational acceleration in ECEF, ft/s^2
    pub gravity_ecef: Vector3<f64>,
    /// Earth rotation vector in ECEF, rad/s
    pub omega: Vector3<f64>,
}

impl Default for InertialState {
    fn default() -> Self {
        Self {
            gravity_model: GravityModel::default(),
            gravity_ecef: Vector3::zeros(),
            omega: Vector3::new(0.0, 0.0, EARTH_ROTATION_RAD_S),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InertialInputs {
    pub location: Location,
    pub sim_time: f64,
}

/// Gravity and Earth rotation, and owner of the ground callback.
#[derive(Debug)]
pub struct Inertial {
    base: ModelBase,
    pub inputs: InertialInputs,
    state: Shared<InertialState>,
    ground: Shared<Box<dyn GroundCallback>>,
}

impl Inertial {
    pub fn new(ground: Shared<Box<dyn GroundCallback>>) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: InertialInputs::default(),
            state: Shared::new(InertialState::default()),
            ground,
        }
    }

    pub fn state(&self) -> &Shared<InertialState> {
        &self.state
    }

    pub fn gravity_ecef(&self) -> Vector3<f64> {
        self.state.read().gravity_ecef
    }

    pub fn omega(&self) -> Vector3<f64> {
        self.state.read().omega
    }

    pub fn gravity_model(&self) -> GravityModel {
        self.state.read().gravity_model
    }

    pub fn set_gravity_model(&mut self, model: GravityModel) {
        self.state.write().gravity_model = model;
    }

    /// The handle on the ground callback shared with the other models.
    pub fn ground(&self) -> &Shared<Box<dyn GroundCallback>> {
        &self.ground
    }

    /// Replaces the ground callback for every model holding the handle.
    pub fn set_ground_callback(&mut self, callback: Box<dyn GroundCallback>) {
        *self.ground.write() = callback;
    }

    /// Height of `location` above the terrain, ft.
    pub fn altitude_agl(&self, location: &Location) -> Result<f64, ModelError> {
        Ok(self
            .ground
            .read()
            .agl_level(self.inputs.sim_time, location)
            .context(ModelLocationSnafu)?
            .agl)
    }
}

impl Model for Inertial {
    fn kind(&self) -> ModelKind {
        ModelKind::Inertial
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let model = self.state.read().gravity_model;
        *self.state.write() = InertialState {
            gravity_model: model,
            ..Default::default()
        };
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let semi_major = {
            let mut ground = self.ground.write();
            ground.set_time(self.inputs.sim_time);
            ground.ellipsoid().semi_major_ft
        };
        let mut state = self.state.write();
        state.gravity_ecef = gravity_ecef(state.gravity_model, &self.inputs.location, semi_major);
        Ok(())
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared(
            "accelerations/gravity-ft_sec2",
            s,
            |s| s.gravity_ecef.norm(),
            None,
        )?;
        pm.tie_shared(
            "simulation/gravity-model",
            s,
            |s| s.gravity_model as i32,
            Some(|s: &mut InertialState, v: i32| match GravityModel::from_i32(v) {
                Some(model) => s.gravity_model = model,
                None => warn!("unknown gravity model {v}"),
            }),
        )?;
        let reader = self.ground.clone();
        let writer = self.ground.clone();
        pm.tie(
            "position/terrain-elevation-asl-ft",
            move || reader.read().terrain_elevation(),
            move |v: f64| writer.write().set_terrain_elevation(v),
        )?;
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.base.rate()
    }

    fn set_rate(&mut self, rate: u32) {
        self.base.set_rate(rate);
    }
}

#[cfg(test)]
mod ut_inertial {
    use super::*;
    use crate::dynamics::STANDARD_GRAVITY;
    use crate::earth::{DefaultGroundCallback, Ellipsoid, WGS84_SEMI_MAJOR_FT};
    use approx::assert_relative_eq;

    fn inertial() -> Inertial {
        Inertial::new(Shared::new(
            Box::new(DefaultGroundCallback::wgs84()) as Box<dyn GroundCallback>
        ))
    }

    #[test]
    fn sea_level_gravity() {
        let mut loc = Location::new();
        loc.set_ellipsoid(Ellipsoid::wgs84());
        loc.set_position_geodetic(0.0, 0.0, 0.0).unwrap();
        let standard = gravity_ecef(GravityModel::Standard, &loc, WGS84_SEMI_MAJOR_FT);
        let j2 = gravity_ecef(GravityModel::Wgs84, &loc, WGS84_SEMI_MAJOR_FT);
        // Points to the center of the Earth
        assert_relative_eq!(standard.normalize(), -loc.ecef().normalize(), epsilon = 1e-12);
        assert_relative_eq!(standard.norm(), 32.147, max_relative = 1e-3);
        // J2 increases the pull at the equator
        assert!(j2.norm() > standard.norm());
        assert_relative_eq!(j2.norm(), STANDARD_GRAVITY, max_relative = 1e-2);
    }

    #[test]
    fn model_switch_and_terrain() {
        let pm = PropertyManager::new();
        let mut inertial = inertial();
        inertial.bind(&pm).unwrap();
        inertial.init_model().unwrap();
        assert_eq!(inertial.omega(), Vector3::new(0.0, 0.0, EARTH_ROTATION_RAD_S));

        inertial.inputs.location = Location::from_spherical(0.0, 0.5, 21e6);
        pm.set("simulation/gravity-model", 0_i32).unwrap();
        assert_eq!(inertial.gravity_model(), GravityModel::Standard);
        inertial.run(false).unwrap();
        assert_relative_eq!(
            pm.get_f64("accelerations/gravity-ft_sec2").unwrap(),
            EARTH_GM_FT3_S2 / 21e6_f64.powi(2),
            max_relative = 1e-12
        );

        pm.set_f64("position/terrain-elevation-asl-ft", 250.0).unwrap();
        assert_eq!(inertial.ground().read().terrain_elevation(), 250.0);
    }
}
