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

use super::INCH_TO_FT;
use crate::linalg::{Matrix3, Vector3};
use crate::utils::dcm_321;
use serde_derive::{Deserialize, Serialize};

/// How the native force and moment of a [`Force`] are rotated into the body frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformType {
    /// Native vectors are already in the body frame
    #[default]
    None,
    /// Native vectors are in the wind frame
    WindBody,
    /// Native vectors are in the local NED frame
    LocalBody,
    /// Native vectors are in a frame rotated by the roll, pitch and yaw set on the force
    Custom,
}

/// The vehicle state a [`Force`] needs to be resolved.
///
/// These are looked up on every evaluation so that they always match the current attitude.
pub trait FrameProvider {
    /// Wind to body rotation
    fn tw2b(&self) -> Matrix3<f64>;
    /// Local NED to body rotation
    fn tl2b(&self) -> Matrix3<f64>;
    /// Converts a location in structural coordinates (inches) into a body frame lever arm (feet) from the CG.
    fn structural_to_body(&self, r: &Vector3<f64>) -> Vector3<f64>;
}

/// A snapshot of the frames of the vehicle, built by the executive from the Propagate, Auxiliary
/// and MassBalance outputs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ForceFrames {
    pub tw2b: Matrix3<f64>,
    pub tl2b: Matrix3<f64>,
    /// Center of gravity in structural coordinates, inches
    pub cg: Vector3<f64>,
}

impl Default for ForceFrames {
    fn default() -> Self {
        Self {
            tw2b: Matrix3::identity(),
            tl2b: Matrix3::identity(),
            cg: Vector3::zeros(),
        }
    }
}

impl FrameProvider for ForceFrames {
    fn tw2b(&self) -> Matrix3<f64> {
        self.tw2b
    }

    fn tl2b(&self) -> Matrix3<f64> {
        self.tl2b
    }

    fn structural_to_body(&self, r: &Vector3<f64>) -> Vector3<f64> {
        structural_to_body(&self.cg, r)
    }
}

/// Structural frame (X aft, Y right, Z up, inches) to body frame (X forward, Y right, Z down, feet)
/// relative to the center of gravity `cg`.
pub fn structural_to_body(cg: &Vector3<f64>, r: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        INCH_TO_FT * (cg.x - r.x),
        INCH_TO_FT * (r.y - cg.y),
        INCH_TO_FT * (cg.z - r.z),
    )
}

/// A force and moment pair expressed in some native frame and applied at some structural location.
///
/// [`Force::get_body_forces`] computes the total moment as a side effect: [`Force::moments`] returns
/// the moment of the last evaluation, or zero before the first one. Use
/// [`Force::body_forces_and_moments`] to get both at once.
#[derive(Clone, Debug, PartialEq)]
pub struct Force {
    native_forces: Vector3<f64>,
    native_moments: Vector3<f64>,
    sense: Vector3<f64>,
    /// Acting location in structural coordinates, inches
    location: Vector3<f64>,
    transform_type: TransformType,
    roll: f64,
    pitch: f64,
    yaw: f64,
    mt: Matrix3<f64>,
    body_forces: Vector3<f64>,
    body_moments: Vector3<f64>,
}

impl Default for Force {
    fn default() -> Self {
        Self::new()
    }
}

impl Force {
    pub fn new() -> Self {
        Self {
            native_forces: Vector3::zeros(),
            native_moments: Vector3::zeros(),
            sense: Vector3::new(1.0, 1.0, 1.0),
            location: Vector3::zeros(),
            transform_type: TransformType::None,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            mt: Matrix3::identity(),
            body_forces: Vector3::zeros(),
            body_moments: Vector3::zeros(),
        }
    }

    pub fn set_native_forces(&mut self, forces: Vector3<f64>) {
        self.native_forces = forces;
    }

    pub fn set_native_moments(&mut self, moments: Vector3<f64>) {
        self.native_moments = moments;
    }

    pub fn native_forces(&self) -> Vector3<f64> {
        self.native_forces
    }

    pub fn native_moments(&self) -> Vector3<f64> {
        self.native_moments
    }

    /// Sign applied to each native force component before the rotation.
    pub fn set_sense(&mut self, sense: Vector3<f64>) {
        self.sense = sense;
    }

    pub fn sense(&self) -> Vector3<f64> {
        self.sense
    }

    /// Sets the point of application in structural coordinates (inches).
    pub fn set_location(&mut self, location: Vector3<f64>) {
        self.location = location;
    }

    pub fn location(&self) -> Vector3<f64> {
        self.location
    }

    /// Same as [`Force::set_location`], for forces whose acting point differs from their nominal location.
    pub fn set_acting_location(&mut self, location: Vector3<f64>) {
        self.location = location;
    }

    pub fn set_transform_type(&mut self, transform_type: TransformType) {
        self.transform_type = transform_type;
    }

    pub fn transform_type(&self) -> TransformType {
        self.transform_type
    }

    /// Orients the native frame with the 3-2-1 Euler angles (radians) from the body frame.
    pub fn set_angles_to_body(&mut self, roll: f64, pitch: f64, yaw: f64) {
        if self.transform_type != TransformType::Custom {
            return;
        }
        self.roll = roll;
        self.pitch = pitch;
        self.yaw = yaw;
        self.update_custom_transform();
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.set_angles_to_body(self.roll, pitch, self.yaw);
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.set_angles_to_body(self.roll, self.pitch, yaw);
    }

    /// Roll, pitch and yaw of the custom orientation, in radians.
    pub fn angles_to_body(&self) -> Vector3<f64> {
        Vector3::new(self.roll, self.pitch, self.yaw)
    }

    fn update_custom_transform(&mut self) {
        // Native to body is the transpose of the body to native rotation
        self.mt = dcm_321(self.roll, self.pitch, self.yaw).transpose();
    }

    /// The rotation from the native frame to the body frame.
    pub fn transform(&self, frames: &dyn FrameProvider) -> Matrix3<f64> {
        match self.transform_type {
            TransformType::WindBody => frames.tw2b(),
            TransformType::LocalBody => frames.tl2b(),
            TransformType::Custom | TransformType::None => self.mt,
        }
    }

    /// Resolves the native force into the body frame and stores the total moment about the CG.
    pub fn get_body_forces(&mut self, frames: &dyn FrameProvider) -> Vector3<f64> {
        let (forces, moments) = self.body_forces_and_moments(frames);
        self.body_forces = forces;
        self.body_moments = moments;
        forces
    }

    /// The total moment computed by the last call to [`Force::get_body_forces`].
    pub fn moments(&self) -> Vector3<f64> {
        self.body_moments
    }

    /// The body force computed by the last call to [`Force::get_body_forces`].
    pub fn body_forces(&self) -> Vector3<f64> {
        self.body_forces
    }

    /// Body force and total moment about the CG, without changing the stored values.
    pub fn body_forces_and_moments(&self, frames: &dyn FrameProvider) -> (Vector3<f64>, Vector3<f64>) {
        let forces = self.transform(frames) * self.native_forces.component_mul(&self.sense);
        let lever = frames.structural_to_body(&self.location);
        let moments = self.native_moments + lever.cross(&forces);
        (forces, moments)
    }
}

#[cfg(test)]
mod ut_force {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wind_axes_with_sense() {
        let mut f = Force::new();
        f.set_transform_type(TransformType::WindBody);
        f.set_sense(Vector3::new(-1.0, 1.0, -1.0));
        // Drag and lift, positive by convention
        f.set_native_forces(Vector3::new(10.0, 0.0, 100.0));
        let frames = ForceFrames::default();
        let fb = f.get_body_forces(&frames);
        assert_abs_diff_eq!(fb, Vector3::new(-10.0, 0.0, -100.0), epsilon = 1e-12);
        assert_eq!(f.moments(), Vector3::zeros());
    }

    #[test]
    fn lever_arm_moment() {
        let mut f = Force::new();
        // One foot ahead of the CG, structural X points aft
        f.set_location(Vector3::new(-12.0, 0.0, 0.0));
        f.set_native_forces(Vector3::new(0.0, 0.0, -10.0));
        f.set_native_moments(Vector3::new(1.0, 0.0, 0.0));
        let frames = ForceFrames::default();
        let (fb, mb) = f.body_forces_and_moments(&frames);
        assert_abs_diff_eq!(fb, Vector3::new(0.0, 0.0, -10.0), epsilon = 1e-12);
        // r = (1, 0, 0), r x F = (0, 10, 0)
        assert_abs_diff_eq!(mb, Vector3::new(1.0, 10.0, 0.0), epsilon = 1e-12);
        // Side-effect free
        assert_eq!(f.moments(), Vector3::zeros());
    }

    #[test]
    fn custom_orientation() {
        let mut f = Force::new();
        f.set_angles_to_body(0.0, 0.5, 0.0);
        assert_eq!(f.angles_to_body(), Vector3::zeros());
        f.set_transform_type(TransformType::Custom);
        // Thrust line pitched up by 90 degrees points up the body, towards -Z
        f.set_pitch(std::f64::consts::FRAC_PI_2);
        f.set_native_forces(Vector3::new(100.0, 0.0, 0.0));
        let fb = f.get_body_forces(&ForceFrames::default());
        assert_abs_diff_eq!(fb, Vector3::new(0.0, 0.0, -100.0), epsilon = 1e-12);

        f.set_angles_to_body(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let fb = f.get_body_forces(&ForceFrames::default());
        assert_abs_diff_eq!(fb, Vector3::new(0.0, 100.0, 0.0), epsilon = 1e-12);
    }
}
