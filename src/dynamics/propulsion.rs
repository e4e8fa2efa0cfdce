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

use super::force::{Force, ForceFrames, TransformType};
use super::{Model, ModelBase, ModelError, ModelKind, ModelPropertySnafu};
use crate::io::aircraft::EngineConfig;
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, Shared};
use crate::utils::constrain;
use rand_pcg::Pcg64Mcg;
use snafu::ResultExt;

/// A thruster delivering a thrust proportional to its throttle position along its own X axis.
#[derive(Clone, Debug)]
pub struct Thruster {
    pub name: String,
    /// lbs
    pub max_thrust: f64,
    force: Force,
}

impl Thruster {
    pub fn new(cfg: &EngineConfig, rng: Option<&mut Pcg64Mcg>) -> Self {
        let mut force = Force::new();
        force.set_transform_type(TransformType::Custom);
        force.set_location(Vector3::from(cfg.location));
        let [roll, pitch, yaw] = cfg.orientation;
        force.set_angles_to_body(roll.to_radians(), pitch.to_radians(), yaw.to_radians());
        Self {
            name: cfg.name.clone(),
            max_thrust: cfg.max_thrust.resolve(rng),
            force,
        }
    }

    pub fn force(&self) -> &Force {
        &self.force
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ThrusterState {
    pub throttle_cmd: f64,
    pub throttle_pos: f64,
    /// lbs
    pub thrust: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropulsionState {
    pub thrusters: Vec<ThrusterState>,
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
}

impl Default for PropulsionState {
    fn default() -> Self {
        Self {
            thrusters: Vec::new(),
            forces: Vector3::zeros(),
            moments: Vector3::zeros(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PropulsionInputs {
    pub frames: ForceFrames,
}

#[derive(Debug)]
pub struct Propulsion {
    base: ModelBase,
    pub inputs: PropulsionInputs,
    pm: PropertyManager,
    thrusters: Vec<Thruster>,
    state: Shared<PropulsionState>,
}

impl Propulsion {
    pub fn new(pm: PropertyManager) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: PropulsionInputs::default(),
            pm,
            thrusters: Vec::new(),
            state: Shared::new(PropulsionState::default()),
        }
    }

    /// Adds a thruster and exposes its throttle and thrust.
    pub fn add_thruster(
        &mut self,
        cfg: &EngineConfig,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), ModelError> {
        let idx = self.thrusters.len();
        let thruster = Thruster::new(cfg, rng);
        debug!(
            "engine[{idx}] {}: {:.1} lbs max thrust",
            thruster.name, thruster.max_thrust
        );
        self.thrusters.push(thruster);
        self.state.write().thrusters.push(ThrusterState::default());
        self.bind_thruster(idx).context(ModelPropertySnafu)
    }

    fn bind_thruster(&self, idx: usize) -> Result<(), PropertyError> {
        let reader = self.state.clone();
        let writer = self.state.clone();
        self.pm.tie(
            &format!("fcs/throttle-cmd-norm[{idx}]"),
            move || reader.read().thrusters[idx].throttle_cmd,
            move |v: f64| writer.write().thrusters[idx].throttle_cmd = v,
        )?;
        let reader = self.state.clone();
        self.pm.tie_ro(&format!("fcs/throttle-pos-norm[{idx}]"), move || {
            reader.read().thrusters[idx].throttle_pos
        })?;
        let reader = self.state.clone();
        self.pm
            .tie_ro(&format!("propulsion/engine[{idx}]/thrust-lbs"), move || {
                reader.read().thrusters[idx].thrust
            })?;
        Ok(())
    }

    pub fn thrusters(&self) -> &[Thruster] {
        &self.thrusters
    }

    pub fn state(&self) -> &Shared<PropulsionState> {
        &self.state
    }

    pub fn forces(&self) -> Vector3<f64> {
        self.state.read().forces
    }

    pub fn moments(&self) -> Vector3<f64> {
        self.state.read().moments
    }

    /// Sets the throttle command of every thruster.
    pub fn set_throttle_cmd(&mut self, throttle: f64) {
        for thruster in &mut self.state.write().thrusters {
            thruster.throttle_cmd = throttle;
        }
    }
}

impl Model for Propulsion {
    fn kind(&self) -> ModelKind {
        ModelKind::Propulsion
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut state = self.state.write();
        for thruster in &mut state.thrusters {
            *thruster = ThrusterState::default();
        }
        state.forces = Vector3::zeros();
        state.moments = Vector3::zeros();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let frames = self.inputs.frames;
        let mut state = self.state.write();
        let mut forces = Vector3::zeros();
        let mut moments = Vector3::zeros();
        for (thruster, ts) in self.thrusters.iter_mut().zip(state.thrusters.iter_mut()) {
            ts.throttle_pos = constrain(0.0, ts.throttle_cmd, 1.0);
            ts.thrust = ts.throttle_pos * thruster.max_thrust;
            thruster
                .force
                .set_native_forces(Vector3::new(ts.thrust, 0.0, 0.0));
            forces += thruster.force.get_body_forces(&frames);
            moments += thruster.force.moments();
        }
        state.forces = forces;
        state.moments = moments;
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.thrusters.clear();
        *self.state.write() = PropulsionState::default();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("forces/fbx-prop-lbs", s, |s| s.forces.x, None)?;
        pm.tie_shared("forces/fby-prop-lbs", s, |s| s.forces.y, None)?;
        pm.tie_shared("forces/fbz-prop-lbs", s, |s| s.forces.z, None)?;
        pm.tie_shared("moments/l-prop-lbsft", s, |s| s.moments.x, None)?;
        pm.tie_shared("moments/m-prop-lbsft", s, |s| s.moments.y, None)?;
        pm.tie_shared("moments/n-prop-lbsft", s, |s| s.moments.z, None)?;
        pm.tie_shared(
            "propulsion/num-engines",
            s,
            |s| s.thrusters.len() as i32,
            None,
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
