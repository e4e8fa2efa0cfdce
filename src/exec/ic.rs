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

use crate::dynamics::atmosphere::{AtmosphereConditions, AtmosphereState};
use crate::dynamics::auxiliary::mach_from_vcalibrated;
use crate::dynamics::propagate::InitialState;
use crate::dynamics::FPS_TO_KTS;
use crate::earth::{GroundCallback, Location, LocationError};
use crate::io::InitialConditionConfig;
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, Shared};
use crate::utils::{dcm_321, between_0_2pi};
use std::f64::consts::PI;

/// How the altitude of the initial condition was specified.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AltitudeSpec {
    /// Above the reference ellipsoid, ft
    Asl(f64),
    /// Above the terrain, ft
    Agl(f64),
}

/// How the airspeed of the initial condition was specified.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpeedSpec {
    /// True airspeed, ft/s
    Vt(f64),
    /// Calibrated airspeed, ft/s
    Vc(f64),
    /// Equivalent airspeed, ft/s
    Ve(f64),
    Mach(f64),
}

/// The canonical initial state. Every other quantity exposed by [`InitialCondition`] derives from it.
#[derive(Clone, Debug, PartialEq)]
pub struct IcState {
    pub longitude: f64,
    pub geod_latitude: f64,
    pub altitude: AltitudeSpec,
    pub speed: SpeedSpec,
    pub alpha: f64,
    pub beta: f64,
    /// Flight path angle relative to the air mass
    pub gamma: f64,
    /// phi, theta, psi
    pub euler: Vector3<f64>,
    pub pqr: Vector3<f64>,
}

impl Default for IcState {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            geod_latitude: 0.0,
            altitude: AltitudeSpec::Asl(0.0),
            speed: SpeedSpec::Vt(0.0),
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            euler: Vector3::zeros(),
            pqr: Vector3::zeros(),
        }
    }
}

/// Solves `a cos(x) - b sin(x) = rhs` for the solution closest to `near`.
fn solve_angle(a: f64, b: f64, rhs: f64, near: f64) -> f64 {
    let r = a.hypot(b);
    if r < 1e-12 {
        return near;
    }
    // a cos(x) - b sin(x) = r cos(x + delta)
    let delta = b.atan2(a);
    let spread = (rhs / r).clamp(-1.0, 1.0).acos();
    let wrap = |x: f64| x - 2.0 * PI * ((x - near + PI) / (2.0 * PI)).floor();
    let first = wrap(spread - delta);
    let second = wrap(-spread - delta);
    if (first - near).abs() <= (second - near).abs() {
        first
    } else {
        second
    }
}

/// The initial condition of the vehicle, shared with the property tree under `ic/`.
///
/// Clones are handles on the same state.
#[derive(Clone, Debug)]
pub struct InitialCondition {
    state: Shared<IcState>,
    atmosphere: Shared<AtmosphereState>,
    ground: Shared<Box<dyn GroundCallback>>,
}

impl InitialCondition {
    pub fn new(atmosphere: Shared<AtmosphereState>, ground: Shared<Box<dyn GroundCallback>>) -> Self {
        Self {
            state: Shared::new(IcState::default()),
            atmosphere,
            ground,
        }
    }

    pub fn state(&self) -> IcState {
        self.state.snapshot()
    }

    /// Replaces the whole initial condition, for example with a previous [`InitialCondition::state`].
    pub fn set_state(&self, state: IcState) {
        *self.state.write() = state;
    }

    pub fn reset(&self) {
        *self.state.write() = IcState::default();
    }

    pub fn terrain_elevation(&self) -> f64 {
        self.ground.read().terrain_elevation()
    }

    pub fn set_terrain_elevation(&self, elevation: f64) {
        self.ground.write().set_terrain_elevation(elevation);
    }

    pub fn altitude_asl(&self) -> f64 {
        match self.state.read().altitude {
            AltitudeSpec::Asl(h) => h,
            AltitudeSpec::Agl(h) => h + self.terrain_elevation(),
        }
    }

    pub fn altitude_agl(&self) -> f64 {
        match self.state.read().altitude {
            AltitudeSpec::Asl(h) => h - self.terrain_elevation(),
            AltitudeSpec::Agl(h) => h,
        }
    }

    pub fn set_altitude_asl(&self, altitude: f64) {
        self.state.write().altitude = AltitudeSpec::Asl(altitude);
    }

    pub fn set_altitude_agl(&self, altitude: f64) {
        self.state.write().altitude = AltitudeSpec::Agl(altitude);
    }

    pub fn longitude(&self) -> f64 {
        self.state.read().longitude
    }

    pub fn set_longitude(&self, longitude: f64) {
        self.state.write().longitude = longitude;
    }

    pub fn geod_latitude(&self) -> f64 {
        self.state.read().geod_latitude
    }

    pub fn set_geod_latitude(&self, latitude: f64) {
        self.state.write().geod_latitude = latitude;
    }

    fn conditions(&self) -> AtmosphereConditions {
        let delta_t = self.atmosphere.read().delta_t;
        AtmosphereConditions::standard(self.altitude_asl(), delta_t)
    }

    fn wind_ned(&self) -> Vector3<f64> {
        self.atmosphere.read().wind_ned
    }

    /// True airspeed, ft/s
    pub fn vt_fps(&self) -> f64 {
        let speed = self.state.read().speed;
        let air = self.conditions();
        match speed {
            SpeedSpec::Vt(vt) => vt,
            SpeedSpec::Mach(mach) => mach * air.sound_speed,
            SpeedSpec::Vc(vc) => mach_from_vcalibrated(vc, air.pressure) * air.sound_speed,
            SpeedSpec::Ve(ve) => ve * (AtmosphereConditions::sea_level().density / air.density).sqrt(),
        }
    }

    pub fn set_vt_fps(&self, vt: f64) {
        self.state.write().speed = SpeedSpec::Vt(vt);
    }

    pub fn mach(&self) -> f64 {
        match self.state.read().speed {
            SpeedSpec::Mach(mach) => mach,
            _ => self.vt_fps() / self.conditions().sound_speed,
        }
    }

    pub fn set_mach(&self, mach: f64) {
        self.state.write().speed = SpeedSpec::Mach(mach);
    }

    pub fn vc_fps(&self) -> f64 {
        match self.state.read().speed {
            SpeedSpec::Vc(vc) => vc,
            _ => {
                let air = self.conditions();
                crate::dynamics::auxiliary::vcalibrated_from_mach(
                    self.vt_fps() / air.sound_speed,
                    air.pressure,
                )
            }
        }
    }

    pub fn set_vc_fps(&self, vc: f64) {
        self.state.write().speed = SpeedSpec::Vc(vc);
    }

    pub fn ve_fps(&self) -> f64 {
        match self.state.read().speed {
            SpeedSpec::Ve(ve) => ve,
            _ => {
                self.vt_fps()
                    * (self.conditions().density / AtmosphereConditions::sea_level().density).sqrt()
            }
        }
    }

    pub fn set_ve_fps(&self, ve: f64) {
        self.state.write().speed = SpeedSpec::Ve(ve);
    }

    pub fn euler(&self) -> Vector3<f64> {
        self.state.read().euler
    }

    pub fn alpha(&self) -> f64 {
        self.state.read().alpha
    }

    pub fn beta(&self) -> f64 {
        self.state.read().beta
    }

    pub fn gamma(&self) -> f64 {
        self.state.read().gamma
    }

    pub fn pqr(&self) -> Vector3<f64> {
        self.state.read().pqr
    }

    pub fn set_pqr(&self, pqr: Vector3<f64>) {
        self.state.write().pqr = pqr;
    }

    /// Pitch attitude flying the flight path angle at the current angle of attack and sideslip.
    fn theta_from(s: &IcState) -> f64 {
        let (sp, cp) = s.euler.x.sin_cos();
        let (sa, ca) = s.alpha.sin_cos();
        let (sb, cb) = s.beta.sin_cos();
        let a = sp * sb + cp * sa * cb;
        let b = ca * cb;
        solve_angle(a, b, -s.gamma.sin(), s.alpha + s.gamma)
    }

    /// Angle of attack flying the flight path angle at the current attitude and sideslip.
    fn alpha_from(s: &IcState) -> f64 {
        let (sp, cp) = s.euler.x.sin_cos();
        let (st, ct) = s.euler.y.sin_cos();
        let (sb, cb) = s.beta.sin_cos();
        // ct cp cb sin(alpha) - st cb cos(alpha) = -sin(gamma) - ct sp sb
        let rhs = -s.gamma.sin() - ct * sp * sb;
        solve_angle(-st * cb, -ct * cp * cb, rhs, s.euler.y - s.gamma)
    }

    /// Sets the angle of attack, keeping the flight path angle.
    pub fn set_alpha(&self, alpha: f64) {
        let mut s = self.state.write();
        s.alpha = alpha;
        s.euler.y = Self::theta_from(&s);
    }

    /// Sets the sideslip, keeping the flight path angle.
    pub fn set_beta(&self, beta: f64) {
        let mut s = self.state.write();
        s.beta = beta;
        s.euler.y = Self::theta_from(&s);
    }

    /// Sets the flight path angle, keeping the angle of attack.
    pub fn set_gamma(&self, gamma: f64) {
        let mut s = self.state.write();
        s.gamma = gamma;
        s.euler.y = Self::theta_from(&s);
    }

    /// Sets the bank angle, keeping the angle of attack and the flight path angle.
    pub fn set_phi(&self, phi: f64) {
        let mut s = self.state.write();
        s.euler.x = phi;
        s.euler.y = Self::theta_from(&s);
    }

    /// Sets the pitch attitude, keeping the flight path angle.
    pub fn set_theta(&self, theta: f64) {
        let mut s = self.state.write();
        s.euler.y = theta;
        s.alpha = Self::alpha_from(&s);
    }

    pub fn set_psi(&self, psi: f64) {
        self.state.write().euler.z = between_0_2pi(psi);
    }

    /// Velocity relative to the air mass in the body frame.
    fn uvw_air(&self) -> Vector3<f64> {
        let vt = self.vt_fps();
        let s = self.state.read();
        let (sa, ca) = s.alpha.sin_cos();
        let (sb, cb) = s.beta.sin_cos();
        Vector3::new(ca * cb, sb, sa * cb) * vt
    }

    /// Body velocity relative to the Earth, ft/s
    pub fn uvw(&self) -> Vector3<f64> {
        let euler = self.euler();
        let tl2b = dcm_321(euler.x, euler.y, euler.z);
        self.uvw_air() + tl2b * self.wind_ned()
    }

    /// Local velocity relative to the Earth, ft/s
    pub fn v_ned(&self) -> Vector3<f64> {
        let euler = self.euler();
        dcm_321(euler.x, euler.y, euler.z).transpose() * self.uvw()
    }

    /// Sets the body velocity relative to the Earth. Airspeed, angle of attack, sideslip and flight
    /// path angle follow.
    pub fn set_uvw(&self, uvw: Vector3<f64>) {
        let euler = self.euler();
        let tl2b = dcm_321(euler.x, euler.y, euler.z);
        let air = uvw - tl2b * self.wind_ned();
        let vt = air.norm();
        let mut s = self.state.write();
        s.speed = SpeedSpec::Vt(vt);
        if vt > 0.0 {
            s.alpha = if air.x == 0.0 && air.z == 0.0 { 0.0 } else { air.z.atan2(air.x) };
            s.beta = air.y.atan2(air.x.hypot(air.z));
            let v_air_ned = tl2b.transpose() * air;
            s.gamma = (-v_air_ned.z).atan2(v_air_ned.x.hypot(v_air_ned.y));
        }
    }

    /// Sets the local velocity relative to the Earth, see [`InitialCondition::set_uvw`].
    pub fn set_v_ned(&self, v_ned: Vector3<f64>) {
        let euler = self.euler();
        self.set_uvw(dcm_321(euler.x, euler.y, euler.z) * v_ned);
    }

    /// Applies an initial condition document. Position first, then attitude, then velocities.
    pub fn apply(&self, cfg: &InitialConditionConfig) {
        if let Some(lat) = cfg.latitude_deg {
            self.set_geod_latitude(lat.to_radians());
        }
        if let Some(lon) = cfg.longitude_deg {
            self.set_longitude(lon.to_radians());
        }
        if let Some(elevation) = cfg.elevation_ft {
            self.set_terrain_elevation(elevation);
        }
        if let Some(h) = cfg.altitude_ft {
            self.set_altitude_asl(h);
        }
        if let Some(h) = cfg.altitude_agl_ft {
            self.set_altitude_agl(h);
        }
        if let Some(psi) = cfg.psi_deg {
            self.set_psi(psi.to_radians());
        }
        if let Some(phi) = cfg.phi_deg {
            self.set_phi(phi.to_radians());
        }
        if let Some(theta) = cfg.theta_deg {
            self.set_theta(theta.to_radians());
        }
        if let Some(alpha) = cfg.alpha_deg {
            self.set_alpha(alpha.to_radians());
        }
        if let Some(beta) = cfg.beta_deg {
            self.set_beta(beta.to_radians());
        }
        if let Some(gamma) = cfg.gamma_deg {
            self.set_gamma(gamma.to_radians());
        }

        if cfg.ubody_fps.is_some() || cfg.vbody_fps.is_some() || cfg.wbody_fps.is_some() {
            let current = self.uvw();
            self.set_uvw(Vector3::new(
                cfg.ubody_fps.unwrap_or(current.x),
                cfg.vbody_fps.unwrap_or(current.y),
                cfg.wbody_fps.unwrap_or(current.z),
            ));
        }
        if cfg.vnorth_fps.is_some() || cfg.veast_fps.is_some() || cfg.vdown_fps.is_some() {
            let current = self.v_ned();
            self.set_v_ned(Vector3::new(
                cfg.vnorth_fps.unwrap_or(current.x),
                cfg.veast_fps.unwrap_or(current.y),
                cfg.vdown_fps.unwrap_or(current.z),
            ));
        }
        if let Some(vt) = cfg.vt_fps {
            self.set_vt_fps(vt);
        }
        if let Some(vc) = cfg.vc_kts {
            self.set_vc_fps(vc / FPS_TO_KTS);
        }
        if let Some(ve) = cfg.ve_kts {
            self.set_ve_fps(ve / FPS_TO_KTS);
        }
        if let Some(mach) = cfg.mach {
            self.set_mach(mach);
        }

        let mut pqr = self.pqr();
        pqr.x = cfg.p_rad_sec.unwrap_or(pqr.x);
        pqr.y = cfg.q_rad_sec.unwrap_or(pqr.y);
        pqr.z = cfg.r_rad_sec.unwrap_or(pqr.z);
        self.set_pqr(pqr);
    }

    /// The state Propagate starts from.
    pub fn initial_state(&self) -> Result<InitialState, LocationError> {
        let ellipse = self.ground.read().ellipsoid();
        let mut location = Location::new();
        location.set_ellipsoid(ellipse);
        location.set_position_geodetic(
            self.longitude(),
            self.geod_latitude(),
            self.altitude_asl(),
        )?;
        Ok(InitialState {
            location,
            euler: self.euler(),
            uvw: self.uvw(),
            pqr: self.pqr(),
        })
    }

    /// Ties the `ic/` properties.
    pub fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        macro_rules! tie_ic {
            ($path:expr, $get:expr, $set:expr) => {{
                let getter = self.clone();
                let setter = self.clone();
                pm.tie(
                    $path,
                    move || ($get)(&getter),
                    move |v: f64| ($set)(&setter, v),
                )?;
            }};
        }

        tie_ic!("ic/lat-geod-rad", |ic: &Self| ic.geod_latitude(), |ic: &Self, v| ic
            .set_geod_latitude(v));
        tie_ic!(
            "ic/lat-geod-deg",
            |ic: &Self| ic.geod_latitude().to_degrees(),
            |ic: &Self, v: f64| ic.set_geod_latitude(v.to_radians())
        );
        tie_ic!("ic/long-gc-rad", |ic: &Self| ic.longitude(), |ic: &Self, v| ic
            .set_longitude(v));
        tie_ic!(
            "ic/long-gc-deg",
            |ic: &Self| ic.longitude().to_degrees(),
            |ic: &Self, v: f64| ic.set_longitude(v.to_radians())
        );
        tie_ic!("ic/h-sl-ft", |ic: &Self| ic.altitude_asl(), |ic: &Self, v| ic
            .set_altitude_asl(v));
        tie_ic!("ic/h-agl-ft", |ic: &Self| ic.altitude_agl(), |ic: &Self, v| ic
            .set_altitude_agl(v));
        tie_ic!(
            "ic/terrain-elevation-ft",
            |ic: &Self| ic.terrain_elevation(),
            |ic: &Self, v| ic.set_terrain_elevation(v)
        );

        tie_ic!("ic/vt-fps", |ic: &Self| ic.vt_fps(), |ic: &Self, v| ic.set_vt_fps(v));
        tie_ic!(
            "ic/vt-kts",
            |ic: &Self| ic.vt_fps() * FPS_TO_KTS,
            |ic: &Self, v: f64| ic.set_vt_fps(v / FPS_TO_KTS)
        );
        tie_ic!(
            "ic/vc-kts",
            |ic: &Self| ic.vc_fps() * FPS_TO_KTS,
            |ic: &Self, v: f64| ic.set_vc_fps(v / FPS_TO_KTS)
        );
        tie_ic!(
            "ic/ve-kts",
            |ic: &Self| ic.ve_fps() * FPS_TO_KTS,
            |ic: &Self, v: f64| ic.set_ve_fps(v / FPS_TO_KTS)
        );
        tie_ic!("ic/mach", |ic: &Self| ic.mach(), |ic: &Self, v| ic.set_mach(v));

        tie_ic!("ic/alpha-rad", |ic: &Self| ic.alpha(), |ic: &Self, v| ic.set_alpha(v));
        tie_ic!(
            "ic/alpha-deg",
            |ic: &Self| ic.alpha().to_degrees(),
            |ic: &Self, v: f64| ic.set_alpha(v.to_radians())
        );
        tie_ic!("ic/beta-rad", |ic: &Self| ic.beta(), |ic: &Self, v| ic.set_beta(v));
        tie_ic!(
            "ic/beta-deg",
            |ic: &Self| ic.beta().to_degrees(),
            |ic: &Self, v: f64| ic.set_beta(v.to_radians())
        );
        tie_ic!("ic/gamma-rad", |ic: &Self| ic.gamma(), |ic: &Self, v| ic.set_gamma(v));
        tie_ic!(
            "ic/gamma-deg",
            |ic: &Self| ic.gamma().to_degrees(),
            |ic: &Self, v: f64| ic.set_gamma(v.to_radians())
        );
        tie_ic!("ic/phi-rad", |ic: &Self| ic.euler().x, |ic: &Self, v| ic.set_phi(v));
        tie_ic!(
            "ic/phi-deg",
            |ic: &Self| ic.euler().x.to_degrees(),
            |ic: &Self, v: f64| ic.set_phi(v.to_radians())
        );
        tie_ic!("ic/theta-rad", |ic: &Self| ic.euler().y, |ic: &Self, v| ic.set_theta(v));
        tie_ic!(
            "ic/theta-deg",
            |ic: &Self| ic.euler().y.to_degrees(),
            |ic: &Self, v: f64| ic.set_theta(v.to_radians())
        );
        tie_ic!("ic/psi-true-rad", |ic: &Self| ic.euler().z, |ic: &Self, v| ic.set_psi(v));
        tie_ic!(
            "ic/psi-true-deg",
            |ic: &Self| ic.euler().z.to_degrees(),
            |ic: &Self, v: f64| ic.set_psi(v.to_radians())
        );

        tie_ic!("ic/u-fps", |ic: &Self| ic.uvw().x, |ic: &Self, v: f64| {
            let mut uvw = ic.uvw();
            uvw.x = v;
            ic.set_uvw(uvw)
        });
        tie_ic!("ic/v-fps", |ic: &Self| ic.uvw().y, |ic: &Self, v: f64| {
            let mut uvw = ic.uvw();
            uvw.y = v;
            ic.set_uvw(uvw)
        });
        tie_ic!("ic/w-fps", |ic: &Self| ic.uvw().z, |ic: &Self, v: f64| {
            let mut uvw = ic.uvw();
            uvw.z = v;
            ic.set_uvw(uvw)
        });
        tie_ic!("ic/vn-fps", |ic: &Self| ic.v_ned().x, |ic: &Self, v: f64| {
            let mut v_ned = ic.v_ned();
            v_ned.x = v;
            ic.set_v_ned(v_ned)
        });
        tie_ic!("ic/ve-fps", |ic: &Self| ic.v_ned().y, |ic: &Self, v: f64| {
            let mut v_ned = ic.v_ned();
            v_ned.y = v;
            ic.set_v_ned(v_ned)
        });
        tie_ic!("ic/vd-fps", |ic: &Self| ic.v_ned().z, |ic: &Self, v: f64| {
            let mut v_ned = ic.v_ned();
            v_ned.z = v;
            ic.set_v_ned(v_ned)
        });

        tie_ic!("ic/p-rad_sec", |ic: &Self| ic.pqr().x, |ic: &Self, v: f64| {
            let mut pqr = ic.pqr();
            pqr.x = v;
            ic.set_pqr(pqr)
        });
        tie_ic!("ic/q-rad_sec", |ic: &Self| ic.pqr().y, |ic: &Self, v: f64| {
            let mut pqr = ic.pqr();
            pqr.y = v;
            ic.set_pqr(pqr)
        });
        tie_ic!("ic/r-rad_sec", |ic: &Self| ic.pqr().z, |ic: &Self, v: f64| {
            let mut pqr = ic.pqr();
            pqr.z = v;
            ic.set_pqr(pqr)
        });
        Ok(())
    }
}

#[cfg(test)]
mod ut_ic {
    use super::*;
    use crate::earth::DefaultGroundCallback;
    use approx::assert_abs_diff_eq;
    use rstest::*;

    #[fixture]
    fn ic() -> InitialCondition {
        InitialCondition::new(
            Shared::new(AtmosphereState::default()),
            Shared::new(Box::new(DefaultGroundCallback::wgs84()) as Box<dyn GroundCallback>),
        )
    }

    #[rstest]
    fn wings_level_theta(ic: InitialCondition) {
        ic.set_alpha(0.05);
        ic.set_gamma(0.1);
        assert_abs_diff_eq!(ic.euler().y, 0.15, epsilon = 1e-12);
        ic.set_theta(0.2);
        assert_abs_diff_eq!(ic.alpha(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(ic.gamma(), 0.1, epsilon = 1e-12);
    }

    #[rstest]
    fn banked_flight_path_is_kept(ic: InitialCondition) {
        ic.set_vt_fps(200.0);
        ic.set_alpha(0.08);
        ic.set_beta(0.02);
        ic.set_phi(0.6);
        ic.set_gamma(-0.05);
        let v_ned = ic.v_ned();
        let gamma = (-v_ned.z).atan2(v_ned.x.hypot(v_ned.y));
        assert_abs_diff_eq!(gamma, -0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(ic.uvw().norm(), 200.0, epsilon = 1e-9);
    }

    #[rstest]
    fn speeds_and_altitudes(ic: InitialCondition) {
        ic.set_altitude_agl(1000.0);
        ic.set_terrain_elevation(500.0);
        assert_eq!(ic.altitude_asl(), 1500.0);
        ic.set_mach(0.5);
        let vt = ic.vt_fps();
        let air = AtmosphereConditions::standard(1500.0, 0.0);
        assert_abs_diff_eq!(vt, 0.5 * air.sound_speed, epsilon = 1e-9);
        let vc = ic.vc_fps();
        ic.set_vc_fps(vc);
        assert_abs_diff_eq!(ic.vt_fps(), vt, epsilon = 1e-6);
        let ve = ic.ve_fps();
        ic.set_ve_fps(ve);
        assert_abs_diff_eq!(ic.vt_fps(), vt, epsilon = 1e-9);
    }

    #[rstest]
    fn body_velocity_round_trip(ic: InitialCondition) {
        ic.set_psi(1.0);
        ic.set_uvw(Vector3::new(100.0, 5.0, 10.0));
        assert_abs_diff_eq!(ic.uvw(), Vector3::new(100.0, 5.0, 10.0), epsilon = 1e-9);
        assert_abs_diff_eq!(ic.alpha(), 0.1_f64.atan(), epsilon = 1e-12);
    }

    #[rstest]
    fn document_and_properties(ic: InitialCondition) {
        let pm = PropertyManager::new();
        ic.bind(&pm).unwrap();
        ic.apply(&InitialConditionConfig {
            latitude_deg: Some(47.0),
            longitude_deg: Some(-122.0),
            altitude_ft: Some(5000.0),
            vt_fps: Some(300.0),
            psi_deg: Some(90.0),
            ..Default::default()
        });
        assert_abs_diff_eq!(pm.get_f64("ic/lat-geod-deg").unwrap(), 47.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pm.get_f64("ic/psi-true-deg").unwrap(), 90.0, epsilon = 1e-12);
        pm.set_f64("ic/alpha-deg", 4.0).unwrap();
        assert_abs_diff_eq!(pm.get_f64("ic/theta-deg").unwrap(), 4.0, epsilon = 1e-9);

        let state = ic.initial_state().unwrap();
        assert_abs_diff_eq!(state.location.geod_altitude().unwrap(), 5000.0, epsilon = 1e-4);
        assert_abs_diff_eq!(state.location.geod_latitude_deg().unwrap(), 47.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.uvw.norm(), 300.0, epsilon = 1e-9);
    }
}
