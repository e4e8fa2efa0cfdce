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
use crate::earth::{GroundCallback, Location};
use crate::linalg::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use crate::props::{PropertyError, PropertyManager, Shared};
use crate::utils::{dcm_321, euler_321};
use snafu::ResultExt;

/// Integration schemes. The discriminants are the values exposed in the property tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Integrator {
    None = 0,
    #[default]
    RectEuler = 1,
    Trapezoidal = 2,
    AdamsBashforth2 = 3,
    AdamsBashforth3 = 4,
}

impl Integrator {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::RectEuler),
            2 => Some(Self::Trapezoidal),
            3 => Some(Self::AdamsBashforth2),
            4 => Some(Self::AdamsBashforth3),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

/// The integrators used for each part of the state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Integrators {
    pub rotational_rate: Integrator,
    pub translational_rate: Integrator,
    pub rotational_position: Integrator,
    pub translational_position: Integrator,
}

impl Default for Integrators {
    fn default() -> Self {
        Self {
            rotational_rate: Integrator::RectEuler,
            translational_rate: Integrator::AdamsBashforth2,
            rotational_position: Integrator::RectEuler,
            translational_position: Integrator::AdamsBashforth3,
        }
    }
}

/// Past derivatives of one part of the state, newest first.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct History([Vector3<f64>; 3]);

impl History {
    fn push(&mut self, derivative: Vector3<f64>) {
        self.0[2] = self.0[1];
        self.0[1] = self.0[0];
        self.0[0] = derivative;
    }

    fn fill(&mut self, derivative: Vector3<f64>) {
        self.0 = [derivative; 3];
    }

    fn increment(&self, method: Integrator, dt: f64) -> Vector3<f64> {
        let [d0, d1, d2] = self.0;
        match method {
            Integrator::None => Vector3::zeros(),
            Integrator::RectEuler => d0 * dt,
            Integrator::Trapezoidal => (d0 + d1) * (0.5 * dt),
            Integrator::AdamsBashforth2 => (d0 * 1.5 - d1 * 0.5) * dt,
            Integrator::AdamsBashforth3 => (d0 * 23.0 - d1 * 16.0 + d2 * 5.0) * (dt / 12.0),
        }
    }
}

/// The state an initial condition sets.
#[derive(Clone, Debug)]
pub struct InitialState {
    /// With its reference ellipsoid set
    pub location: Location,
    /// Roll, pitch and heading from the local frame, radians
    pub euler: Vector3<f64>,
    /// Body velocity relative to the Earth, ft/s
    pub uvw: Vector3<f64>,
    /// Body rates relative to the Earth, rad/s
    pub pqr: Vector3<f64>,
}

/// The state of the vehicle and the quantities derived from it.
#[derive(Clone, Debug)]
pub struct VehicleState {
    pub location: Location,
    /// Velocity relative to the Earth in ECEF coordinates, ft/s
    pub v_ecef: Vector3<f64>,
    /// Rotation from the body frame to ECEF
    pub q_b2ec: UnitQuaternion<f64>,
    /// Body rates relative to an inertial frame, in body coordinates, rad/s
    pub pqr_i: Vector3<f64>,
    /// Earth position angle, rad
    pub epa: f64,
    pub integrators: Integrators,
    /// Body rates relative to the Earth, rad/s
    pub pqr: Vector3<f64>,
    /// Body velocity relative to the Earth, ft/s
    pub uvw: Vector3<f64>,
    pub v_ned: Vector3<f64>,
    pub tec2b: Matrix3<f64>,
    pub tb2ec: Matrix3<f64>,
    pub tl2b: Matrix3<f64>,
    pub tb2l: Matrix3<f64>,
    /// phi, theta, psi
    pub euler: Vector3<f64>,
    pub geod_latitude: f64,
    /// Height above the reference ellipsoid, ft
    pub altitude_asl: f64,
    pub altitude_agl: f64,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            location: Location::new(),
            v_ecef: Vector3::zeros(),
            q_b2ec: UnitQuaternion::identity(),
            pqr_i: Vector3::zeros(),
            epa: 0.0,
            integrators: Integrators::default(),
            pqr: Vector3::zeros(),
            uvw: Vector3::zeros(),
            v_ned: Vector3::zeros(),
            tec2b: Matrix3::identity(),
            tb2ec: Matrix3::identity(),
            tl2b: Matrix3::identity(),
            tb2l: Matrix3::identity(),
            euler: Vector3::zeros(),
            geod_latitude: 0.0,
            altitude_asl: 0.0,
            altitude_agl: 0.0,
        }
    }
}

impl VehicleState {
    fn update_derived(
        &mut self,
        omega_earth: &Vector3<f64>,
        ground: &dyn GroundCallback,
        time: f64,
    ) -> Result<(), ModelError> {
        self.tb2ec = self.q_b2ec.to_rotation_matrix().into_inner();
        self.tec2b = self.tb2ec.transpose();
        self.tl2b = self.tec2b * self.location.tl2ec();
        self.tb2l = self.tl2b.transpose();
        self.euler = euler_321(&self.tl2b);
        self.uvw = self.tec2b * self.v_ecef;
        self.v_ned = self.location.tec2l() * self.v_ecef;
        self.pqr = self.pqr_i - self.tec2b * omega_earth;
        self.geod_latitude = self
            .location
            .geod_latitude_rad()
            .context(ModelLocationSnafu)?;
        self.altitude_asl = self.location.geod_altitude().context(ModelLocationSnafu)?;
        self.altitude_agl = ground
            .agl_level(time, &self.location)
            .context(ModelLocationSnafu)?
            .agl;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropagateInputs {
    pub dt: f64,
    pub sim_time: f64,
    /// Earth rotation vector in ECEF, rad/s
    pub omega_earth: Vector3<f64>,
    /// Acceleration relative to the Earth, in ECEF coordinates, ft/s^2
    pub accel_ecef: Vector3<f64>,
    /// Inertial angular acceleration in body coordinates, rad/s^2
    pub pqr_i_dot: Vector3<f64>,
}

/// Integrates the equations of motion. Runs first in the frame, with the derivatives computed by
/// Accelerations in the previous frame.
#[derive(Debug)]
pub struct Propagate {
    base: ModelBase,
    pub inputs: PropagateInputs,
    state: Shared<VehicleState>,
    ground: Shared<Box<dyn GroundCallback>>,
    position_history: History,
    velocity_history: History,
    attitude_history: History,
    rate_history: History,
}

impl Propagate {
    pub fn new(ground: Shared<Box<dyn GroundCallback>>) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: PropagateInputs::default(),
            state: Shared::new(VehicleState::default()),
            ground,
            position_history: History::default(),
            velocity_history: History::default(),
            attitude_history: History::default(),
            rate_history: History::default(),
        }
    }

    pub fn state(&self) -> &Shared<VehicleState> {
        &self.state
    }

    pub fn vehicle(&self) -> VehicleState {
        self.state.snapshot()
    }

    pub fn location(&self) -> Location {
        self.state.read().location.clone()
    }

    pub fn tl2b(&self) -> Matrix3<f64> {
        self.state.read().tl2b
    }

    pub fn tb2l(&self) -> Matrix3<f64> {
        self.state.read().tb2l
    }

    pub fn tec2b(&self) -> Matrix3<f64> {
        self.state.read().tec2b
    }

    pub fn tb2ec(&self) -> Matrix3<f64> {
        self.state.read().tb2ec
    }

    pub fn integrators(&self) -> Integrators {
        self.state.read().integrators
    }

    pub fn set_integrators(&mut self, integrators: Integrators) {
        self.state.write().integrators = integrators;
    }

    fn refresh(&self, state: &mut VehicleState) -> Result<(), ModelError> {
        let ground = self.ground.read();
        state.update_derived(&self.inputs.omega_earth, ground.as_ref(), self.inputs.sim_time)
    }

    /// Sets the state from an initial condition. The Earth position angle is kept.
    pub fn set_initial_state(&mut self, initial: &InitialState) -> Result<(), ModelError> {
        let mut state = self.state.write();
        state.location = initial.location.clone();
        let tl2b = dcm_321(initial.euler.x, initial.euler.y, initial.euler.z);
        let tec2b = tl2b * initial.location.tec2l();
        let tb2ec = tec2b.transpose();
        state.q_b2ec =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(tb2ec));
        state.v_ecef = tb2ec * initial.uvw;
        state.pqr_i = initial.pqr + tec2b * self.inputs.omega_earth;
        self.refresh(&mut state)?;

        self.position_history.fill(state.v_ecef);
        self.attitude_history.fill(state.pqr);
        Ok(())
    }

    /// Takes the reference ellipsoid of the ground callback for the vehicle location, and
    /// recomputes the geodetic outputs with it.
    pub fn refresh_ellipsoid(&mut self) -> Result<(), ModelError> {
        let ellipse = self.ground.read().ellipsoid();
        let mut state = self.state.write();
        state.location.set_ellipsoid(ellipse);
        self.refresh(&mut state)
    }

    /// Seeds the histories of the accelerations, so that multi-step integrators start from a
    /// consistent state. Called once the accelerations of the initial state are known.
    pub fn initialize_derivatives(&mut self, accel_ecef: Vector3<f64>, pqr_i_dot: Vector3<f64>) {
        let state = self.state.read();
        self.position_history.fill(state.v_ecef);
        self.attitude_history.fill(state.pqr);
        self.velocity_history.fill(accel_ecef);
        self.rate_history.fill(pqr_i_dot);
    }
}

impl Model for Propagate {
    fn kind(&self) -> ModelKind {
        ModelKind::Propagate
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let ellipse = self.ground.read().ellipsoid();
        let mut state = VehicleState::default();
        state.location.set_ellipsoid(ellipse);
        // On the ellipsoid, at the intersection of the equator and the prime meridian
        state.location.set_x(ellipse.semi_major_ft);
        self.refresh(&mut state)?;
        *self.state.write() = state;
        self.position_history = History::default();
        self.velocity_history = History::default();
        self.attitude_history = History::default();
        self.rate_history = History::default();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let dt = self.inputs.dt;
        if dt == 0.0 {
            return Ok(());
        }

        let mut state = self.state.write();
        self.position_history.push(state.v_ecef);
        self.velocity_history.push(self.inputs.accel_ecef);
        self.attitude_history.push(state.pqr);
        self.rate_history.push(self.inputs.pqr_i_dot);

        let integrators = state.integrators;
        let dr = self
            .position_history
            .increment(integrators.translational_position, dt);
        let position = state.location.ecef() + dr;
        state.location.set_ecef(position);
        state.v_ecef += self
            .velocity_history
            .increment(integrators.translational_rate, dt);
        let dtheta = self
            .attitude_history
            .increment(integrators.rotational_position, dt);
        let q = state.q_b2ec * UnitQuaternion::from_scaled_axis(dtheta);
        state.q_b2ec = UnitQuaternion::new_normalize(q.into_inner());
        state.pqr_i += self.rate_history.increment(integrators.rotational_rate, dt);
        state.epa += self.inputs.omega_earth.norm() * dt;

        if !state.v_ecef.iter().all(|v| v.is_finite()) {
            return Err(ModelError::Diverged {
                model: ModelKind::Propagate,
                what: format!("velocity {:?}", state.v_ecef),
            });
        }

        self.refresh(&mut state)
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("position/h-sl-ft", s, |s| s.altitude_asl, None)?;
        pm.tie_shared("position/h-agl-ft", s, |s| s.altitude_agl, None)?;
        pm.tie_shared("position/lat-gc-rad", s, |s| s.location.latitude(), None)?;
        pm.tie_shared("position/lat-gc-deg", s, |s| s.location.latitude_deg(), None)?;
        pm.tie_shared("position/lat-geod-rad", s, |s| s.geod_latitude, None)?;
        pm.tie_shared(
            "position/lat-geod-deg",
            s,
            |s| s.geod_latitude.to_degrees(),
            None,
        )?;
        pm.tie_shared("position/long-gc-rad", s, |s| s.location.longitude(), None)?;
        pm.tie_shared("position/long-gc-deg", s, |s| s.location.longitude_deg(), None)?;
        pm.tie_shared("position/radius-to-vehicle-ft", s, |s| s.location.radius(), None)?;
        pm.tie_shared("position/ecef-x-ft", s, |s| s.location.x(), None)?;
        pm.tie_shared("position/ecef-y-ft", s, |s| s.location.y(), None)?;
        pm.tie_shared("position/ecef-z-ft", s, |s| s.location.z(), None)?;
        pm.tie_shared("position/epa-rad", s, |s| s.epa, None)?;

        pm.tie_shared("velocities/u-fps", s, |s| s.uvw.x, None)?;
        pm.tie_shared("velocities/v-fps", s, |s| s.uvw.y, None)?;
        pm.tie_shared("velocities/w-fps", s, |s| s.uvw.z, None)?;
        pm.tie_shared("velocities/v-north-fps", s, |s| s.v_ned.x, None)?;
        pm.tie_shared("velocities/v-east-fps", s, |s| s.v_ned.y, None)?;
        pm.tie_shared("velocities/v-down-fps", s, |s| s.v_ned.z, None)?;
        pm.tie_shared("velocities/h-dot-fps", s, |s| -s.v_ned.z, None)?;
        pm.tie_shared("velocities/p-rad_sec", s, |s| s.pqr.x, None)?;
        pm.tie_shared("velocities/q-rad_sec", s, |s| s.pqr.y, None)?;
        pm.tie_shared("velocities/r-rad_sec", s, |s| s.pqr.z, None)?;
        pm.tie_shared("velocities/pi-rad_sec", s, |s| s.pqr_i.x, None)?;
        pm.tie_shared("velocities/qi-rad_sec", s, |s| s.pqr_i.y, None)?;
        pm.tie_shared("velocities/ri-rad_sec", s, |s| s.pqr_i.z, None)?;

        pm.tie_shared("attitude/phi-rad", s, |s| s.euler.x, None)?;
        pm.tie_shared("attitude/theta-rad", s, |s| s.euler.y, None)?;
        pm.tie_shared("attitude/psi-rad", s, |s| s.euler.z, None)?;
        pm.tie_shared("attitude/phi-deg", s, |s| s.euler.x.to_degrees(), None)?;
        pm.tie_shared("attitude/theta-deg", s, |s| s.euler.y.to_degrees(), None)?;
        pm.tie_shared("attitude/psi-deg", s, |s| s.euler.z.to_degrees(), None)?;

        pm.tie_shared(
            "simulation/integrator/rate/rotational",
            s,
            |s| s.integrators.rotational_rate.as_i32(),
            Some(|s: &mut VehicleState, v: i32| set_integrator(&mut s.integrators.rotational_rate, v)),
        )?;
        pm.tie_shared(
            "simulation/integrator/rate/translational",
            s,
            |s| s.integrators.translational_rate.as_i32(),
            Some(|s: &mut VehicleState, v: i32| set_integrator(&mut s.integrators.translational_rate, v)),
        )?;
        pm.tie_shared(
            "simulation/integrator/position/rotational",
            s,
            |s| s.integrators.rotational_position.as_i32(),
            Some(|s: &mut VehicleState, v: i32| {
                set_integrator(&mut s.integrators.rotational_position, v)
            }),
        )?;
        pm.tie_shared(
            "simulation/integrator/position/translational",
            s,
            |s| s.integrators.translational_position.as_i32(),
            Some(|s: &mut VehicleState, v: i32| {
                set_integrator(&mut s.integrators.translational_position, v)
            }),
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

fn set_integrator(current: &mut Integrator, value: i32) {
    match Integrator::from_i32(value) {
        Some(method) => *current = method,
        None => warn!("unknown integrator {value}, keeping {current:?}"),
    }
}
