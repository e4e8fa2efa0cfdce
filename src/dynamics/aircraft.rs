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

use super::{Model, ModelBase, ModelError, ModelKind};
use crate::io::aircraft::MetricsConfig;
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, Shared};

/// Reference geometry of the vehicle. Lengths in feet, areas in square feet, locations in
/// structural inches.
#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    pub wing_area: f64,
    pub wing_span: f64,
    pub chord: f64,
    pub htail_area: f64,
    pub htail_arm: f64,
    pub vtail_area: f64,
    pub vtail_arm: f64,
    /// rad
    pub wing_incidence: f64,
    pub aero_rp: Vector3<f64>,
    pub eyepoint: Vector3<f64>,
    pub vrp: Vector3<f64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            wing_area: 0.0,
            wing_span: 0.0,
            chord: 0.0,
            htail_area: 0.0,
            htail_arm: 0.0,
            vtail_area: 0.0,
            vtail_arm: 0.0,
            wing_incidence: 0.0,
            aero_rp: Vector3::zeros(),
            eyepoint: Vector3::zeros(),
            vrp: Vector3::zeros(),
        }
    }
}

impl From<&MetricsConfig> for Metrics {
    fn from(cfg: &MetricsConfig) -> Self {
        Self {
            wing_area: cfg.wingarea,
            wing_span: cfg.wingspan,
            chord: cfg.chord,
            htail_area: cfg.htailarea,
            htail_arm: cfg.htailarm,
            vtail_area: cfg.vtailarea,
            vtail_arm: cfg.vtailarm,
            wing_incidence: cfg.wing_incidence.to_radians(),
            aero_rp: Vector3::from(cfg.aero_rp),
            eyepoint: Vector3::from(cfg.eyepoint),
            vrp: Vector3::from(cfg.vrp),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AircraftState {
    pub metrics: Metrics,
    /// Total body forces, lbs
    pub forces: Vector3<f64>,
    /// Total body moments about the CG, lbs ft
    pub moments: Vector3<f64>,
}

impl Default for AircraftState {
    fn default() -> Self {
        Self {
            metrics: Metrics::default(),
            forces: Vector3::zeros(),
            moments: Vector3::zeros(),
        }
    }
}

/// The contributions summed into the total force and moment.
#[derive(Clone, Debug, PartialEq)]
pub struct AircraftInputs {
    pub aero_forces: Vector3<f64>,
    pub aero_moments: Vector3<f64>,
    pub propulsion_forces: Vector3<f64>,
    pub propulsion_moments: Vector3<f64>,
    pub gear_forces: Vector3<f64>,
    pub gear_moments: Vector3<f64>,
}

impl Default for AircraftInputs {
    fn default() -> Self {
        Self {
            aero_forces: Vector3::zeros(),
            aero_moments: Vector3::zeros(),
            propulsion_forces: Vector3::zeros(),
            propulsion_moments: Vector3::zeros(),
            gear_forces: Vector3::zeros(),
            gear_moments: Vector3::zeros(),
        }
    }
}

#[derive(Debug)]
pub struct Aircraft {
    base: ModelBase,
    pub inputs: AircraftInputs,
    name: String,
    state: Shared<AircraftState>,
}

impl Aircraft {
    pub fn new() -> Self {
        Self {
            base: ModelBase::new(),
            inputs: AircraftInputs::default(),
            name: String::new(),
            state: Shared::new(AircraftState::default()),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load(&mut self, cfg: &MetricsConfig) {
        self.state.write().metrics = Metrics::from(cfg);
    }

    pub fn metrics(&self) -> Metrics {
        self.state.read().metrics.clone()
    }

    pub fn forces(&self) -> Vector3<f64> {
        self.state.read().forces
    }

    pub fn moments(&self) -> Vector3<f64> {
        self.state.read().moments
    }
}

impl Default for Aircraft {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for Aircraft {
    fn kind(&self) -> ModelKind {
        ModelKind::Aircraft
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut state = self.state.write();
        state.forces = Vector3::zeros();
        state.moments = Vector3::zeros();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let i = &self.inputs;
        let mut state = self.state.write();
        state.forces = i.aero_forces + i.propulsion_forces + i.gear_forces;
        state.moments = i.aero_moments + i.propulsion_moments + i.gear_moments;
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.name.clear();
        *self.state.write() = AircraftState::default();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("metrics/Sw-sqft", s, |s| s.metrics.wing_area, None)?;
        pm.tie_shared("metrics/bw-ft", s, |s| s.metrics.wing_span, None)?;
        pm.tie_shared("metrics/cbarw-ft", s, |s| s.metrics.chord, None)?;
        pm.tie_shared("metrics/iw-rad", s, |s| s.metrics.wing_incidence, None)?;
        pm.tie_shared(
            "metrics/iw-deg",
            s,
            |s| s.metrics.wing_incidence.to_degrees(),
            None,
        )?;
        pm.tie_shared("metrics/Sh-sqft", s, |s| s.metrics.htail_area, None)?;
        pm.tie_shared("metrics/lh-ft", s, |s| s.metrics.htail_arm, None)?;
        pm.tie_shared("metrics/Sv-sqft", s, |s| s.metrics.vtail_area, None)?;
        pm.tie_shared("metrics/lv-ft", s, |s| s.metrics.vtail_arm, None)?;
        pm.tie_shared("metrics/aero-rp-x-in", s, |s| s.metrics.aero_rp.x, None)?;
        pm.tie_shared("metrics/aero-rp-y-in", s, |s| s.metrics.aero_rp.y, None)?;
        pm.tie_shared("metrics/aero-rp-z-in", s, |s| s.metrics.aero_rp.z, None)?;
        pm.tie_shared("metrics/eyepoint-x-in", s, |s| s.metrics.eyepoint.x, None)?;
        pm.tie_shared("metrics/eyepoint-y-in", s, |s| s.metrics.eyepoint.y, None)?;
        pm.tie_shared("metrics/eyepoint-z-in", s, |s| s.metrics.eyepoint.z, None)?;
        pm.tie_shared("metrics/visualrefpoint-x-in", s, |s| s.metrics.vrp.x, None)?;
        pm.tie_shared("metrics/visualrefpoint-y-in", s, |s| s.metrics.vrp.y, None)?;
        pm.tie_shared("metrics/visualrefpoint-z-in", s, |s| s.metrics.vrp.z, None)?;
        pm.tie_shared("forces/fbx-total-lbs", s, |s| s.forces.x, None)?;
        pm.tie_shared("forces/fby-total-lbs", s, |s| s.forces.y, None)?;
        pm.tie_shared("forces/fbz-total-lbs", s, |s| s.forces.z, None)?;
        pm.tie_shared("moments/l-total-lbsft", s, |s| s.moments.x, None)?;
        pm.tie_shared("moments/m-total-lbsft", s, |s| s.moments.y, None)?;
        pm.tie_shared("moments/n-total-lbsft", s, |s| s.moments.z, None)?;
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.base.rate()
    }

    fn set_rate(&mut self, rate: u32) {
        self.base.set_rate(rate);
    }
}
