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

use crate::linalg::{Matrix3, Vector3};
use std::f64::consts::TAU;

/// Returns the tilde matrix from the provided Vector3, such that `tilde_matrix(a) * b = a x b`.
pub fn tilde_matrix(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0,
        -v[(2, 0)],
        v[(1, 0)],
        v[(2, 0)],
        0.0,
        -v[(0, 0)],
        -v[(1, 0)],
        v[(0, 0)],
        0.0,
    )
}

/// Rotation from a reference frame to a frame rotated by the 3-2-1 Euler sequence (yaw, then pitch, then roll).
///
/// With the local NED frame as reference, this is the local to body matrix.
pub fn dcm_321(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();
    Matrix3::new(
        cp * cy,
        cp * sy,
        -sp,
        sr * sp * cy - cr * sy,
        sr * sp * sy + cr * cy,
        sr * cp,
        cr * sp * cy + sr * sy,
        cr * sp * sy - sr * cy,
        cr * cp,
    )
}

/// Extracts the 3-2-1 Euler angles (roll, pitch, yaw) of a rotation built by [`dcm_321`].
/// Yaw is returned between 0 and 2 pi.
pub fn euler_321(dcm: &Matrix3<f64>) -> Vector3<f64> {
    let pitch = (-dcm[(0, 2)]).clamp(-1.0, 1.0).asin();
    let roll = dcm[(1, 2)].atan2(dcm[(2, 2)]);
    let yaw = between_0_2pi(dcm[(0, 1)].atan2(dcm[(0, 0)]));
    Vector3::new(roll, pitch, yaw)
}

/// Wraps an angle in radians between 0 and 2 pi.
pub fn between_0_2pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid may return TAU itself for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle in radians between -pi and pi.
pub fn between_pm_pi(angle: f64) -> f64 {
    let wrapped = between_0_2pi(angle);
    if wrapped > std::f64::consts::PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Returns -1 for strictly negative values and 1 otherwise, zero included.
pub fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Clamps `value` between `min` and `max`, accepting bounds provided in either order.
pub fn constrain(min: f64, value: f64, max: f64) -> f64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    value.clamp(lo, hi)
}
