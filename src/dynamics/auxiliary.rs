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

use super::atmosphere::{AtmosphereConditions, GAMMA, GAS_CONSTANT, SL_PRESSURE, SL_TEMPERATURE};
use super::{Model, ModelBase, ModelError, ModelKind, FPS_TO_KTS};
use crate::linalg::{Matrix3, Vector3};
use crate::props::{PropertyError, PropertyManager, Shared};

/// Total pressure (psf) sensed by a Pitot tube at the provided Mach number and static pressure.
///
/// Subsonic flow is isentropic. Above Mach 1 a normal shock stands in front of the tube and the
/// Rayleigh Pitot tube formula applies.
pub fn pitot_total_pressure(mach: f64, pressure: f64) -> f64 {
    if mach < 0.0 {
        pressure
    } else if mach < 1.0 {
        pressure * (1.0 + 0.2 * mach * mach).powf(3.5)
    } else {
        pressure * 166.921_580_093_168_27 * mach.powi(7) / (7.0 * mach * mach - 1.0).powf(2.5)
    }
}

/// Mach number from the impact pressure `qc` (total minus static) and the static pressure, psf.
pub fn mach_from_impact_pressure(qc: f64, pressure: f64) -> f64 {
    let a = qc / pressure + 1.0;
    let mut mach = (5.0 * (a.powf(1.0 / 3.5) - 1.0)).sqrt();

    if mach > 1.0 {
        // Fixed point of the Rayleigh formula
        for _ in 0..20 {
            let next = 0.881_284_854_347_331_1 * (a * (1.0 - 1.0 / (7.0 * mach * mach)).powf(2.5)).sqrt();
            let converged = (next - mach).abs() < 1e-12;
            mach = next;
            if converged {
                break;
            }
        }
    }

    mach
}

/// Calibrated airspeed (ft/s) for a Mach number at the provided static pressure (psf).
pub fn vcalibrated_from_mach(mach: f64, pressure: f64) -> f64 {
    let asl = standard_sl_sound_speed();
    let qc = pitot_total_pressure(mach, pressure) - pressure;
    asl * mach_from_impact_pressure(qc, SL_PRESSURE)
}

/// Mach number for a calibrated airspeed (ft/s) at the provided static pressure (psf).
pub fn mach_from_vcalibrated(vcas: f64, pressure: f64) -> f64 {
    let asl = standard_sl_sound_speed();
    let qc = pitot_total_pressure(vcas / asl, SL_PRESSURE) - SL_PRESSURE;
    mach_from_impact_pressure(qc, pressure)
}

fn standard_sl_sound_speed() -> f64 {
    (GAMMA * GAS_CONSTANT * SL_TEMPERATURE).sqrt()
}

/// Wind to body rotation for the provided angles of attack and sideslip.
pub fn wind_to_body(alpha: f64, beta: f64) -> Matrix3<f64> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Matrix3::new(
        ca * cb,
        -ca * sb,
        -sa,
        sb,
        cb,
        0.0,
        sa * cb,
        -sa * sb,
        ca,
    )
}

/// Air data derived from the vehicle state.
#[derive(Clone, Debug, PartialEq)]
pub struct AirData {
    pub vt: f64,
    pub mach: f64,
    pub vcas: f64,
    pub veas: f64,
    pub alpha: f64,
    pub beta: f64,
    pub qbar: f64,
    pub qbar_uw: f64,
    pub gamma: f64,
    pub vground: f64,
    pub bi2vel: f64,
    pub ci2vel: f64,
    pub total_pressure: f64,
    pub uvw_aero: Vector3<f64>,
    pub pqr_aero: Vector3<f64>,
    pub tw2b: Matrix3<f64>,
    pub tb2w: Matrix3<f64>,
}

impl Default for AirData {
    fn default() -> Self {
        Self {
            vt: 0.0,
            mach: 0.0,
            vcas: 0.0,
            veas: 0.0,
            alpha: 0.0,
            beta: 0.0,
            qbar: 0.0,
            qbar_uw: 0.0,
            gamma: 0.0,
            vground: 0.0,
            bi2vel: 0.0,
            ci2vel: 0.0,
            total_pressure: SL_PRESSURE,
            uvw_aero: Vector3::zeros(),
            pqr_aero: Vector3::zeros(),
            tw2b: Matrix3::identity(),
            tb2w: Matrix3::identity(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuxiliaryInputs {
    /// Body velocity relative to the Earth, ft/s
    pub uvw: Vector3<f64>,
    /// Body rates relative to the Earth, rad/s
    pub pqr: Vector3<f64>,
    pub v_ned: Vector3<f64>,
    pub tl2b: Matrix3<f64>,
    pub wind_ned: Vector3<f64>,
    pub atmosphere: AtmosphereConditions,
    pub sea_level: AtmosphereConditions,
    pub wingspan: f64,
    pub chord: f64,
}

impl Default for AuxiliaryInputs {
    fn default() -> Self {
        let sl = AtmosphereConditions::sea_level();
        Self {
            uvw: Vector3::zeros(),
            pqr: Vector3::zeros(),
            v_ned: Vector3::zeros(),
            tl2b: Matrix3::identity(),
            wind_ned: Vector3::zeros(),
            atmosphere: sl,
            sea_level: sl,
            wingspan: 0.0,
            chord: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct Auxiliary {
    base: ModelBase,
    pub inputs: AuxiliaryInputs,
    state: Shared<AirData>,
}

impl Auxiliary {
    pub fn new() -> Self {
        Self {
            base: ModelBase::new(),
            inputs: AuxiliaryInputs::default(),
            state: Shared::new(AirData::default()),
        }
    }

    pub fn air_data(&self) -> AirData {
        self.state.snapshot()
    }

    pub fn tw2b(&self) -> Matrix3<f64> {
        self.state.read().tw2b
    }

    pub fn vcalibrated_fps(&self) -> f64 {
        self.state.read().vcas
    }

    pub fn vcalibrated_kts(&self) -> f64 {
        self.vcalibrated_fps() * FPS_TO_KTS
    }

    pub fn mach(&self) -> f64 {
        self.state.read().mach
    }

    pub fn qbar(&self) -> f64 {
        self.state.read().qbar
    }

    fn calculate(&self) -> AirData {
        let inp = &self.inputs;
        let uvw_aero = inp.uvw - inp.tl2b * inp.wind_ned;
        let vt = uvw_aero.norm();
        let (u, v, w) = (uvw_aero.x, uvw_aero.y, uvw_aero.z);

        let (alpha, beta) = if vt > 1e-3 {
            let alpha = if u == 0.0 && w == 0.0 { 0.0 } else { w.atan2(u) };
            (alpha, v.atan2(u.hypot(w)))
        } else {
            (0.0, 0.0)
        };

        let rho = inp.atmosphere.density;
        let p = inp.atmosphere.pressure;
        let qbar = 0.5 * rho * vt * vt;
        let mach = vt / inp.atmosphere.sound_speed;
        let vground = inp.v_ned.x.hypot(inp.v_ned.y);
        let (bi2vel, ci2vel) = if vt > 0.0 {
            (0.5 * inp.wingspan / vt, 0.5 * inp.chord / vt)
        } else {
            (0.0, 0.0)
        };
        let tw2b = wind_to_body(alpha, beta);

        AirData {
            vt,
            mach,
            vcas: vcalibrated_from_mach(mach, p),
            veas: (2.0 * qbar / AtmosphereConditions::sea_level().density).sqrt(),
            alpha,
            beta,
            qbar,
            qbar_uw: 0.5 * rho * (u * u + w * w),
            gamma: (-inp.v_ned.z).atan2(vground),
            vground,
            bi2vel,
            ci2vel,
            total_pressure: pitot_total_pressure(mach, p),
            uvw_aero,
            pqr_aero: inp.pqr,
            tb2w: tw2b.transpose(),
            tw2b,
        }
    }
}

impl Default for Auxiliary {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Auxiliary {
    fn kind(&self) -> ModelKind {
        ModelKind::Auxiliary
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        *self.state.write() = AirData::default();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let data = self.calculate();
        *self.state.write() = data;
        Ok(())
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("velocities/vt-fps", s, |s| s.vt, None)?;
        pm.tie_shared("velocities/vtrue-kts", s, |s| s.vt * FPS_TO_KTS, None)?;
        pm.tie_shared("velocities/mach", s, |s| s.mach, None)?;
        pm.tie_shared("velocities/vc-fps", s, |s| s.vcas, None)?;
        pm.tie_shared("velocities/vc-kts", s, |s| s.vcas * FPS_TO_KTS, None)?;
        pm.tie_shared("velocities/ve-fps", s, |s| s.veas, None)?;
        pm.tie_shared("velocities/ve-kts", s, |s| s.veas * FPS_TO_KTS, None)?;
        pm.tie_shared("velocities/vg-fps", s, |s| s.vground, None)?;
        pm.tie_shared("velocities/u-aero-fps", s, |s| s.uvw_aero.x, None)?;
        pm.tie_shared("velocities/v-aero-fps", s, |s| s.uvw_aero.y, None)?;
        pm.tie_shared("velocities/w-aero-fps", s, |s| s.uvw_aero.z, None)?;
        pm.tie_shared("velocities/p-aero-rad_sec", s, |s| s.pqr_aero.x, None)?;
        pm.tie_shared("velocities/q-aero-rad_sec", s, |s| s.pqr_aero.y, None)?;
        pm.tie_shared("velocities/r-aero-rad_sec", s, |s| s.pqr_aero.z, None)?;
        pm.tie_shared("aero/alpha-rad", s, |s| s.alpha, None)?;
        pm.tie_shared("aero/alpha-deg", s, |s| s.alpha.to_degrees(), None)?;
        pm.tie_shared("aero/beta-rad", s, |s| s.beta, None)?;
        pm.tie_shared("aero/beta-deg", s, |s| s.beta.to_degrees(), None)?;
        pm.tie_shared("aero/qbar-psf", s, |s| s.qbar, None)?;
        pm.tie_shared("aero/qbarUW-psf", s, |s| s.qbar_uw, None)?;
        pm.tie_shared("aero/bi2vel", s, |s| s.bi2vel, None)?;
        pm.tie_shared("aero/ci2vel", s, |s| s.ci2vel, None)?;
        pm.tie_shared("aero/pt-psf", s, |s| s.total_pressure, None)?;
        pm.tie_shared("flight-path/gamma-rad", s, |s| s.gamma, None)?;
        pm.tie_shared("flight-path/gamma-deg", s, |s| s.gamma.to_degrees(), None)?;
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.base.rate()
    }

    fn set_rate(&mut self, rate: u32) {
        self.base.set_rate(rate);
    }
}
