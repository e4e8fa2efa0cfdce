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
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, Shared};
use lazy_static::lazy_static;

/// Sea level standard temperature, Rankine
pub const SL_TEMPERATURE: f64 = 518.67;
/// Sea level standard pressure, psf
pub const SL_PRESSURE: f64 = 2116.22;
/// Specific gas constant of air, ft lbf / (slug R)
pub const GAS_CONSTANT: f64 = 1716.49;
/// Ratio of specific heats of air
pub const GAMMA: f64 = 1.4;
/// Earth radius used for the geopotential altitude, ft
const GEOPOTENTIAL_RADIUS: f64 = 20_855_531.5;

/// Base geopotential altitude (ft) and temperature (R) of each layer of the 1976 standard atmosphere.
const TEMPERATURE_TABLE: [(f64, f64); 8] = [
    (0.0, 518.67),
    (36_089.2388, 389.97),
    (65_616.7979, 389.97),
    (104_986.8766, 411.57),
    (154_199.4751, 487.17),
    (167_322.8346, 487.17),
    (232_939.6325, 386.37),
    (278_385.8268, 336.5028),
];

#[derive(Copy, Clone, Debug)]
struct Layer {
    altitude: f64,
    temperature: f64,
    lapse: f64,
    pressure: f64,
}

impl Layer {
    fn temperature_at(&self, altitude: f64) -> f64 {
        self.temperature + self.lapse * (altitude - self.altitude)
    }

    fn pressure_at(&self, altitude: f64) -> f64 {
        let dh = altitude - self.altitude;
        if self.lapse == 0.0 {
            self.pressure * (-STANDARD_GRAVITY * dh / (GAS_CONSTANT * self.temperature)).exp()
        } else {
            self.pressure
                * (self.temperature_at(altitude) / self.temperature)
                    .powf(-STANDARD_GRAVITY / (GAS_CONSTANT * self.lapse))
        }
    }

    /// Inverse of `pressure_at`
    fn altitude_at(&self, pressure: f64) -> f64 {
        if self.lapse == 0.0 {
            self.altitude
                - (pressure / self.pressure).ln() * GAS_CONSTANT * self.temperature / STANDARD_GRAVITY
        } else {
            let ratio = (pressure / self.pressure).powf(-GAS_CONSTANT * self.lapse / STANDARD_GRAVITY);
            self.altitude + self.temperature * (ratio - 1.0) / self.lapse
        }
    }
}

lazy_static! {
    static ref LAYERS: Vec<Layer> = {
        let mut layers: Vec<Layer> = Vec::with_capacity(TEMPERATURE_TABLE.len());
        for (i, (altitude, temperature)) in TEMPERATURE_TABLE.iter().enumerate() {
            // The last layer keeps the lapse rate of the one below it
            let lapse = match TEMPERATURE_TABLE.get(i + 1) {
                Some((next_alt, next_temp)) => (next_temp - temperature) / (next_alt - altitude),
                None => layers.last().map(|l| l.lapse).unwrap_or(0.0),
            };
            let pressure = match layers.last() {
                Some(below) => below.pressure_at(*altitude),
                None => SL_PRESSURE,
            };
            layers.push(Layer {
                altitude: *altitude,
                temperature: *temperature,
                lapse,
                pressure,
            });
        }
        layers
    };
}

fn layer_at(geopotential_alt: f64) -> &'static Layer {
    LAYERS
        .iter()
        .rev()
        .find(|l| l.altitude <= geopotential_alt)
        .unwrap_or(&LAYERS[0])
}

pub fn geopotential_altitude(geometric_alt: f64) -> f64 {
    geometric_alt * GEOPOTENTIAL_RADIUS / (GEOPOTENTIAL_RADIUS + geometric_alt)
}

pub fn geometric_altitude(geopotential_alt: f64) -> f64 {
    geopotential_alt * GEOPOTENTIAL_RADIUS / (GEOPOTENTIAL_RADIUS - geopotential_alt)
}

/// Thermodynamic state of the air at some altitude.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AtmosphereConditions {
    /// Rankine
    pub temperature: f64,
    /// psf
    pub pressure: f64,
    /// slug/ft^3
    pub density: f64,
    /// ft/s
    pub sound_speed: f64,
}

impl AtmosphereConditions {
    /// Standard conditions at the geometric altitude (ft), with a temperature offset (R) from the standard day.
    pub fn standard(altitude: f64, delta_t: f64) -> Self {
        let h = geopotential_altitude(altitude);
        let layer = layer_at(h);
        let temperature = layer.temperature_at(h) + delta_t;
        let pressure = layer.pressure_at(h);
        Self::from_pressure_temperature(pressure, temperature)
    }

    pub fn sea_level() -> Self {
        Self::standard(0.0, 0.0)
    }

    pub fn from_pressure_temperature(pressure: f64, temperature: f64) -> Self {
        Self {
            temperature,
            pressure,
            density: pressure / (GAS_CONSTANT * temperature),
            sound_speed: (GAMMA * GAS_CONSTANT * temperature).sqrt(),
        }
    }
}

/// Geometric altitude (ft) at which the standard pressure equals `pressure`.
pub fn pressure_altitude(pressure: f64) -> f64 {
    let layer = LAYERS
        .iter()
        .rev()
        .find(|l| l.pressure >= pressure)
        .unwrap_or(&LAYERS[0]);
    geometric_altitude(layer.altitude_at(pressure))
}

/// Geometric altitude (ft) at which the standard density equals `density`.
pub fn density_altitude(density: f64) -> f64 {
    let (mut lo, mut hi) = (-20_000.0_f64, 280_000.0_f64);
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if AtmosphereConditions::standard(mid, 0.0).density > density {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// The exposed state of the atmosphere.
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereState {
    pub current: AtmosphereConditions,
    pub sea_level: AtmosphereConditions,
    /// Temperature offset from the standard day, Rankine
    pub delta_t: f64,
    /// Wind in the local NED frame, ft/s
    pub wind_ned: Vector3<f64>,
    pub pressure_altitude: f64,
    pub density_altitude: f64,
}

impl Default for AtmosphereState {
    fn default() -> Self {
        let sl = AtmosphereConditions::sea_level();
        Self {
            current: sl,
            sea_level: sl,
            delta_t: 0.0,
            wind_ned: Vector3::zeros(),
            pressure_altitude: 0.0,
            density_altitude: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AtmosphereInputs {
    /// Geometric altitude above sea level, ft
    pub altitude_asl: f64,
}

#[derive(Debug)]
pub struct Atmosphere {
    base: ModelBase,
    pub inputs: AtmosphereInputs,
    state: Shared<AtmosphereState>,
}

impl Atmosphere {
    pub fn new() -> Self {
        Self {
            base: ModelBase::new(),
            inputs: AtmosphereInputs::default(),
            state: Shared::new(AtmosphereState::default()),
        }
    }

    pub fn state(&self) -> &Shared<AtmosphereState> {
        &self.state
    }

    pub fn conditions(&self) -> AtmosphereConditions {
        self.state.read().current
    }

    pub fn sea_level(&self) -> AtmosphereConditions {
        self.state.read().sea_level
    }

    pub fn wind_ned(&self) -> Vector3<f64> {
        self.state.read().wind_ned
    }

    pub fn set_wind_ned(&mut self, wind: Vector3<f64>) {
        self.state.write().wind_ned = wind;
    }

    fn calculate(&self, altitude: f64) {
        let mut state = self.state.write();
        state.current = AtmosphereConditions::standard(altitude, state.delta_t);
        state.sea_level = AtmosphereConditions::standard(0.0, state.delta_t);
        state.pressure_altitude = pressure_altitude(state.current.pressure);
        state.density_altitude = density_altitude(state.current.density);
    }
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Atmosphere {
    fn kind(&self) -> ModelKind {
        ModelKind::Atmosphere
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        {
            let mut state = self.state.write();
            state.delta_t = 0.0;
            state.wind_ned = Vector3::zeros();
        }
        self.calculate(0.0);
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        self.calculate(self.inputs.altitude_asl);
        Ok(())
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("atmosphere/T-R", s, |s| s.current.temperature, None)?;
        pm.tie_shared("atmosphere/P-psf", s, |s| s.current.pressure, None)?;
        pm.tie_shared("atmosphere/rho-slugs_ft3", s, |s| s.current.density, None)?;
        pm.tie_shared("atmosphere/a-fps", s, |s| s.current.sound_speed, None)?;
        pm.tie_shared("atmosphere/T-sl-R", s, |s| s.sea_level.temperature, None)?;
        pm.tie_shared("atmosphere/P-sl-psf", s, |s| s.sea_level.pressure, None)?;
        pm.tie_shared("atmosphere/rho-sl-slugs_ft3", s, |s| s.sea_level.density, None)?;
        pm.tie_shared("atmosphere/a-sl-fps", s, |s| s.sea_level.sound_speed, None)?;
        pm.tie_shared(
            "atmosphere/theta",
            s,
            |s| s.current.temperature / s.sea_level.temperature,
            None,
        )?;
        pm.tie_shared(
            "atmosphere/sigma",
            s,
            |s| s.current.density / s.sea_level.density,
            None,
        )?;
        pm.tie_shared(
            "atmosphere/delta",
            s,
            |s| s.current.pressure / s.sea_level.pressure,
            None,
        )?;
        pm.tie_shared(
            "atmosphere/a-ratio",
            s,
            |s| s.current.sound_speed / s.sea_level.sound_speed,
            None,
        )?;
        pm.tie_shared("atmosphere/pressure-altitude", s, |s| s.pressure_altitude, None)?;
        pm.tie_shared("atmosphere/density-altitude", s, |s| s.density_altitude, None)?;
        pm.tie_shared(
            "atmosphere/delta-T",
            s,
            |s| s.delta_t,
            Some(|s: &mut AtmosphereState, v: f64| s.delta_t = v),
        )?;
        pm.tie_shared(
            "atmosphere/wind-north-fps",
            s,
            |s| s.wind_ned.x,
            Some(|s: &mut AtmosphereState, v: f64| s.wind_ned.x = v),
        )?;
        pm.tie_shared(
            "atmosphere/wind-east-fps",
            s,
            |s| s.wind_ned.y,
            Some(|s: &mut AtmosphereState, v: f64| s.wind_ned.y = v),
        )?;
        pm.tie_shared(
            "atmosphere/wind-down-fps",
            s,
            |s| s.wind_ned.z,
            Some(|s: &mut AtmosphereState, v: f64| s.wind_ned.z = v),
        )?;
        pm.tie_shared("atmosphere/wind-mag-fps", s, |s| s.wind_ned.norm(), None)?;
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
mod ut_atmosphere {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level() {
        let sl = AtmosphereConditions::sea_level();
        assert_eq!(sl.temperature, SL_TEMPERATURE);
        assert_eq!(sl.pressure, SL_PRESSURE);
        assert_relative_eq!(sl.density, 0.002_376_9, max_relative = 1e-4);
        assert_relative_eq!(sl.sound_speed, 1116.4, max_relative = 1e-3);
    }

    #[test]
    fn tropopause_and_stratosphere() {
        // 11 km geopotential is the tropopause, 22632 Pa there
        let tropo = AtmosphereConditions::standard(geometric_altitude(36_089.2388), 0.0);
        assert_relative_eq!(tropo.temperature, 389.97, max_relative = 1e-9);
        assert_relative_eq!(tropo.pressure, 472.68, max_relative = 1e-3);
        // Isothermal above
        let strato = AtmosphereConditions::standard(geometric_altitude(50_000.0), 0.0);
        assert_relative_eq!(strato.temperature, 389.97, max_relative = 1e-9);
        assert!(strato.pressure < tropo.pressure);
    }

    #[test]
    fn altitude_inversions() {
        for alt in [-1000.0, 0.0, 5_000.0, 40_000.0, 120_000.0] {
            let cond = AtmosphereConditions::standard(alt, 0.0);
            assert_relative_eq!(pressure_altitude(cond.pressure), alt, epsilon = 1e-4);
            assert_relative_eq!(density_altitude(cond.density), alt, epsilon = 1e-3);
        }
    }

    #[test]
    fn properties() {
        let pm = PropertyManager::new();
        let mut atm = Atmosphere::new();
        atm.bind(&pm).unwrap();
        atm.init_model().unwrap();
        pm.set_f64("atmosphere/delta-T", 10.0).unwrap();
        pm.set_f64("atmosphere/wind-east-fps", 20.0).unwrap();
        atm.inputs.altitude_asl = 10_000.0;
        atm.run(false).unwrap();
        assert_eq!(atm.wind_ned(), Vector3::new(0.0, 20.0, 0.0));
        let std = AtmosphereConditions::standard(10_000.0, 0.0);
        assert_relative_eq!(
            pm.get_f64("atmosphere/T-R").unwrap(),
            std.temperature + 10.0,
            epsilon = 1e-9
        );
        assert!(pm.get_f64("atmosphere/rho-slugs_ft3").unwrap() < std.density);
        assert!(pm.get_f64("atmosphere/sigma").unwrap() < 1.0);
    }
}
