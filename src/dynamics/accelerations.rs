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

use super::{Model, ModelBase, ModelError, ModelKind, STANDARD_GRAVITY};
use crate::linalg::{Matrix3, Vector3};
use crate::props::{PropertyError, PropertyManager, Shared};

#[derive(Clone, Debug, PartialEq)]
pub struct AccelerationsState {
    /// Acceleration relative to the Earth, in ECEF coordinates, ft/s^2
    pub accel_ecef: Vector3<f64>,
    /// Inertial angular acceleration in body coordinates, rad/s^2
    pub pqr_i_dot: Vector3<f64>,
    /// Angular acceleration relative to the Earth, rad/s^2
    pub pqr_dot: Vector3<f64>,
    /// Derivative of the body velocity relative to the Earth, ft/s^2
    pub uvw_dot: Vector3<f64>,
    /// Acceleration from the applied forces only, body frame, ft/s^2
    pub body_accel: Vector3<f64>,
    /// Vehicle is held in place, all accelerations are zero
    pub hold_down: bool,
}

impl Default for AccelerationsState {
    fn default() -> Self {
        Self {
            accel_ecef: Vector3::zeros(),
            pqr_i_dot: Vector3::zeros(),
            pqr_dot: Vector3::zeros(),
            uvw_dot: Vector3::zeros(),
            body_accel: Vector3::zeros(),
            hold_down: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccelerationsInputs {
    /// Total body forces, lbs
    pub forces: Vector3<f64>,
    /// Total moments about the CG, body frame, lbs ft
    pub moments: Vector3<f64>,
    /// slugs
    pub mass: f64,
    pub j: Matrix3<f64>,
    pub jinv: Matrix3<f64>,
    pub tb2ec: Matrix3<f64>,
    pub tec2b: Matrix3<f64>,
    pub gravity_ecef: Vector3<f64>,
    /// Earth rotation vector, ECEF
    pub omega: Vector3<f64>,
    pub position_ecef: Vector3<f64>,
    /// Velocity relative to the Earth, ECEF coordinates
    pub v_ecef: Vector3<f64>,
    pub uvw: Vector3<f64>,
    /// Body rates relative to the Earth
    pub pqr: Vector3<f64>,
    /// Inertial body rates
    pub pqr_i: Vector3<f64>,
}

impl Default for AccelerationsInputs {
    fn default() -> Self {
        Self {
            forces: Vector3::zeros(),
            moments: Vector3::zeros(),
            mass: 0.0,
            j: Matrix3::zeros(),
            jinv: Matrix3::zeros(),
            tb2ec: Matrix3::identity(),
            tec2b: Matrix3::identity(),
            gravity_ecef: Vector3::zeros(),
            omega: Vector3::zeros(),
            position_ecef: Vector3::zeros(),
            v_ecef: Vector3::zeros(),
            uvw: Vector3::zeros(),
            pqr: Vector3::zeros(),
            pqr_i: Vector3::zeros(),
        }
    }
}

/// Solves the equations of motion for the derivatives integrated by Propagate in the next frame.
#[derive(Debug)]
pub struct Accelerations {
    base: ModelBase,
    pub inputs: AccelerationsInputs,
    state: Shared<AccelerationsState>,
}

impl Accelerations {
    pub fn new() -> Self {
        Self {
            base: ModelBase::new(),
            inputs: AccelerationsInputs::default(),
            state: Shared::new(AccelerationsState::default()),
        }
    }

    pub fn state(&self) -> &Shared<AccelerationsState> {
        &self.state
    }

    pub fn accel_ecef(&self) -> Vector3<f64> {
        self.state.read().accel_ecef
    }

    pub fn pqr_i_dot(&self) -> Vector3<f64> {
        self.state.read().pqr_i_dot
    }

    pub fn uvw_dot(&self) -> Vector3<f64> {
        self.state.read().uvw_dot
    }

    pub fn pqr_dot(&self) -> Vector3<f64> {
        self.state.read().pqr_dot
    }

    pub fn set_hold_down(&mut self, hold_down: bool) {
        self.state.write().hold_down = hold_down;
    }

    fn calculate(&self) {
        let i = &self.inputs;
        let mut state = self.state.write();
        if state.hold_down {
            let hold_down = state.hold_down;
            *state = AccelerationsState {
                hold_down,
                ..Default::default()
            };
            return;
        }

        // Euler's equations, in the inertial frame
        state.pqr_i_dot = i.jinv * (i.moments - i.pqr_i.cross(&(i.j * i.pqr_i)));
        let omega_body = i.tec2b * i.omega;
        state.pqr_dot = state.pqr_i_dot + i.pqr.cross(&omega_body);

        state.body_accel = if i.mass > 0.0 {
            i.forces / i.mass
        } else {
            Vector3::zeros()
        };
        // Relative to the rotating Earth: Coriolis and centrifugal terms
        state.accel_ecef = i.tb2ec * state.body_accel + i.gravity_ecef
            - 2.0 * i.omega.cross(&i.v_ecef)
            - i.omega.cross(&i.omega.cross(&i.position_ecef));
        state.uvw_dot = i.tec2b * state.accel_ecef - i.pqr.cross(&i.uvw);
    }
}

impl Default for Accelerations {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Accelerations {
    fn kind(&self) -> ModelKind {
        ModelKind::Accelerations
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let hold_down = self.state.read().hold_down;
        *self.state.write() = AccelerationsState {
            hold_down,
            ..Default::default()
        };
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        self.calculate();
        Ok(())
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("accelerations/udot-ft_sec2", s, |s| s.uvw_dot.x, None)?;
        pm.tie_shared("accelerations/vdot-ft_sec2", s, |s| s.uvw_dot.y, None)?;
        pm.tie_shared("accelerations/wdot-ft_sec2", s, |s| s.uvw_dot.z, None)?;
        pm.tie_shared("accelerations/pdot-rad_sec2", s, |s| s.pqr_dot.x, None)?;
        pm.tie_shared("accelerations/qdot-rad_sec2", s, |s| s.pqr_dot.y, None)?;
        pm.tie_shared("accelerations/rdot-rad_sec2", s, |s| s.pqr_dot.z, None)?;
        pm.tie_shared("accelerations/Nx", s, |s| s.body_accel.x / STANDARD_GRAVITY, None)?;
        pm.tie_shared("accelerations/Ny", s, |s| s.body_accel.y / STANDARD_GRAVITY, None)?;
        pm.tie_shared("accelerations/Nz", s, |s| -s.body_accel.z / STANDARD_GRAVITY, None)?;
        pm.tie_shared(
            "forces/hold-down",
            s,
            |s| s.hold_down,
            Some(|s: &mut AccelerationsState, v: bool| s.hold_down = v),
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
mod ut_accelerations {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn free_fall_without_rotation() {
        let mut acc = Accelerations::new();
        acc.inputs.mass = 10.0;
        acc.inputs.j = Matrix3::identity();
        acc.inputs.jinv = Matrix3::identity();
        acc.inputs.gravity_ecef = Vector3::new(0.0, 0.0, -32.0);
        acc.run(false).unwrap();
        assert_abs_diff_eq!(acc.accel_ecef(), Vector3::new(0.0, 0.0, -32.0));
        assert_eq!(acc.pqr_i_dot(), Vector3::zeros());
    }

    #[test]
    fn forces_and_moments() {
        let pm = PropertyManager::new();
        let mut acc = Accelerations::new();
        acc.bind(&pm).unwrap();
        acc.inputs.mass = 2.0;
        acc.inputs.forces = Vector3::new(0.0, 0.0, -4.0 * STANDARD_GRAVITY);
        acc.inputs.j = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 4.0));
        acc.inputs.jinv = Matrix3::from_diagonal(&Vector3::new(1.0, 0.5, 0.25));
        acc.inputs.moments = Vector3::new(0.0, 1.0, 0.0);
        acc.run(false).unwrap();
        assert_abs_diff_eq!(pm.get_f64("accelerations/Nz").unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pm.get_f64("accelerations/qdot-rad_sec2").unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            pm.get_f64("accelerations/wdot-ft_sec2").unwrap(),
            -2.0 * STANDARD_GRAVITY,
            epsilon = 1e-12
        );
    }

    #[test]
    fn gyroscopic_coupling() {
        let mut acc = Accelerations::new();
        acc.inputs.mass = 1.0;
        acc.inputs.j = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0));
        acc.inputs.jinv = Matrix3::from_diagonal(&Vector3::new(1.0, 0.5, 1.0 / 3.0));
        acc.inputs.pqr_i = Vector3::new(1.0, 1.0, 0.0);
        acc.run(false).unwrap();
        // -w x Jw = -(1, 1, 0) x (1, 2, 0) = (0, 0, -1)
        assert_abs_diff_eq!(acc.pqr_i_dot(), Vector3::new(0.0, 0.0, -1.0 / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn earth_rotation_terms() {
        let mut acc = Accelerations::new();
        acc.inputs.mass = 1.0;
        acc.inputs.omega = Vector3::new(0.0, 0.0, 1e-4);
        acc.inputs.position_ecef = Vector3::new(2e7, 0.0, 0.0);
        acc.inputs.v_ecef = Vector3::new(0.0, 100.0, 0.0);
        acc.run(false).unwrap();
        // Centrifugal outwards and Coriolis from eastward motion, both along +X
        let expected = 1e-8 * 2e7 + 2.0 * 1e-4 * 100.0;
        assert_abs_diff_eq!(acc.accel_ecef().x, expected, epsilon = 1e-9);

        acc.set_hold_down(true);
        acc.run(false).unwrap();
        assert_eq!(acc.accel_ecef(), Vector3::zeros());
    }
}
