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

use super::ConfigRepr;
use serde_derive::{Deserialize, Serialize};

/// An initial condition document, for example `reset00.yaml` in the aircraft directory.
///
/// Angles are in degrees and rates in radians per second. Every field is optional: unset fields keep
/// the value of the current initial condition. Position is applied first, then speed, then angles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditionConfig {
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    /// Terrain elevation above sea level, ft
    pub elevation_ft: Option<f64>,
    /// Altitude above sea level, ft
    pub altitude_ft: Option<f64>,
    /// Altitude above the terrain, ft
    pub altitude_agl_ft: Option<f64>,
    pub vt_fps: Option<f64>,
    pub vc_kts: Option<f64>,
    pub ve_kts: Option<f64>,
    pub mach: Option<f64>,
    pub ubody_fps: Option<f64>,
    pub vbody_fps: Option<f64>,
    pub wbody_fps: Option<f64>,
    pub vnorth_fps: Option<f64>,
    pub veast_fps: Option<f64>,
    pub vdown_fps: Option<f64>,
    pub phi_deg: Option<f64>,
    pub theta_deg: Option<f64>,
    pub psi_deg: Option<f64>,
    pub alpha_deg: Option<f64>,
    pub beta_deg: Option<f64>,
    pub gamma_deg: Option<f64>,
    pub p_rad_sec: Option<f64>,
    pub q_rad_sec: Option<f64>,
    pub r_rad_sec: Option<f64>,
}

impl ConfigRepr for InitialConditionConfig {}
