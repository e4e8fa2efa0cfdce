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

use super::force::{Force, ForceFrames, FrameProvider, TransformType};
use super::{Model, ModelBase, ModelError, ModelKind, ModelLocationSnafu, ModelPropertySnafu};
use crate::earth::{GroundCallback, Location};
use crate::io::aircraft::{ContactConfig, ContactKind, GroundReactionsConfig};
use crate::linalg::{Matrix3, Vector3};
use crate::props::{PropertyError, PropertyManager, Shared};
use snafu::ResultExt;

/// Below this tangential speed (ft/s) friction is proportional to the speed.
const FRICTION_SPEED_THRESHOLD: f64 = 0.1;

/// A spring and damper contact point.
#[derive(Clone, Debug)]
pub struct Contact {
    pub name: String,
    pub kind: ContactKind,
    /// Structural location, inches
    pub location: Vector3<f64>,
    /// lbs/ft
    pub spring_coeff: f64,
    /// lbs/ft/s
    pub damping_coeff: f64,
    pub static_friction: f64,
    pub dynamic_friction: f64,
    pub rolling_friction: f64,
    force: Force,
}

impl Contact {
    pub fn new(cfg: &ContactConfig) -> Self {
        let mut force = Force::new();
        force.set_transform_type(TransformType::LocalBody);
        force.set_location(Vector3::from(cfg.location));
        Self {
            name: cfg.name.clone(),
            kind: cfg.kind,
            location: Vector3::from(cfg.location),
            spring_coeff: cfg.spring_coeff,
            damping_coeff: cfg.damping_coeff,
            static_friction: cfg.static_friction,
            dynamic_friction: cfg.dynamic_friction,
            rolling_friction: cfg.rolling_friction,
            force,
        }
    }

    fn friction_coeff(&self) -> f64 {
        match self.kind {
            ContactKind::Bogey => self.rolling_friction,
            ContactKind::Structure => self.dynamic_friction,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactState {
    pub wow: bool,
    /// ft
    pub compression: f64,
    /// Force on the vehicle in the local frame, lbs
    pub force_local: Vector3<f64>,
}

impl Default for ContactState {
    fn default() -> Self {
        Self {
            wow: false,
            compression: 0.0,
            force_local: Vector3::zeros(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundReactionsState {
    pub contacts: Vec<ContactState>,
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
}

impl Default for GroundReactionsState {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            forces: Vector3::zeros(),
            moments: Vector3::zeros(),
        }
    }
}

impl GroundReactionsState {
    pub fn wow(&self) -> bool {
        self.contacts.iter().any(|c| c.wow)
    }
}

#[derive(Clone, Debug)]
pub struct GroundReactionsInputs {
    pub frames: ForceFrames,
    pub location: Location,
    pub tb2l: Matrix3<f64>,
    pub v_ned: Vector3<f64>,
    /// Body rates relative to the Earth
    pub pqr: Vector3<f64>,
    pub sim_time: f64,
}

impl Default for GroundReactionsInputs {
    fn default() -> Self {
        Self {
            frames: ForceFrames::default(),
            location: Location::new(),
            tb2l: Matrix3::identity(),
            v_ned: Vector3::zeros(),
            pqr: Vector3::zeros(),
            sim_time: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct GroundReactions {
    base: ModelBase,
    pub inputs: GroundReactionsInputs,
    pm: PropertyManager,
    ground: Shared<Box<dyn GroundCallback>>,
    contacts: Vec<Contact>,
    state: Shared<GroundReactionsState>,
}

impl GroundReactions {
    pub fn new(pm: PropertyManager, ground: Shared<Box<dyn GroundCallback>>) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: GroundReactionsInputs::default(),
            pm,
            ground,
            contacts: Vec::new(),
            state: Shared::new(GroundReactionsState::default()),
        }
    }

    pub fn load(&mut self, cfg: &GroundReactionsConfig) -> Result<(), ModelError> {
        for contact in &cfg.contacts {
            let idx = self.contacts.len();
            self.contacts.push(Contact::new(contact));
            self.state.write().contacts.push(ContactState::default());
            self.bind_contact(idx).context(ModelPropertySnafu)?;
        }
        debug!("ground reactions: {} contacts", self.contacts.len());
        Ok(())
    }

    fn bind_contact(&self, idx: usize) -> Result<(), PropertyError> {
        let reader = self.state.clone();
        self.pm.tie_ro(&format!("gear/unit[{idx}]/WOW"), move || {
            reader.read().contacts.get(idx).map_or(false, |c| c.wow)
        })?;
        let reader = self.state.clone();
        self.pm
            .tie_ro(&format!("gear/unit[{idx}]/compression-ft"), move || {
                reader.read().contacts.get(idx).map_or(0.0, |c| c.compression)
            })?;
        Ok(())
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn state(&self) -> &Shared<GroundReactionsState> {
        &self.state
    }

    pub fn forces(&self) -> Vector3<f64> {
        self.state.read().forces
    }

    pub fn moments(&self) -> Vector3<f64> {
        self.state.read().moments
    }

    pub fn wow(&self) -> bool {
        self.state.read().wow()
    }

    fn contact_force(&self, contact: &Contact) -> Result<ContactState, ModelError> {
        let inputs = &self.inputs;
        let r_body = inputs.frames.structural_to_body(&contact.location);
        let r_local = inputs.tb2l * r_body;
        let point = inputs.location.local_to_location(&r_local);
        let gc = self
            .ground
            .read()
            .agl_level(inputs.sim_time, &point)
            .context(ModelLocationSnafu)?;
        if gc.agl >= 0.0 {
            return Ok(ContactState::default());
        }

        let compression = -gc.agl;
        // Unit normal out of the terrain, in the local frame
        let normal = inputs.location.tec2l() * gc.normal;
        let velocity = inputs.v_ned + inputs.tb2l * inputs.pqr.cross(&r_body);
        let normal_speed = velocity.dot(&normal);
        let normal_force =
            (contact.spring_coeff * compression - contact.damping_coeff * normal_speed).max(0.0);
        let tangential = velocity - normal * normal_speed;
        let speed = tangential.norm();
        let friction = if speed > 0.0 {
            -tangential / speed.max(FRICTION_SPEED_THRESHOLD)
                * (contact.friction_coeff() * normal_force)
        } else {
            Vector3::zeros()
        };
        Ok(ContactState {
            wow: true,
            compression,
            force_local: normal * normal_force + friction,
        })
    }
}

impl Model for GroundReactions {
    fn kind(&self) -> ModelKind {
        ModelKind::GroundReactions
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut state = self.state.write();
        for contact in &mut state.contacts {
            *contact = ContactState::default();
        }
        state.forces = Vector3::zeros();
        state.moments = Vector3::zeros();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let states = self
            .contacts
            .iter()
            .map(|c| self.contact_force(c))
            .collect::<Result<Vec<_>, _>>()?;

        let frames = self.inputs.frames;
        let mut forces = Vector3::zeros();
        let mut moments = Vector3::zeros();
        for (contact, cs) in self.contacts.iter_mut().zip(&states) {
            contact.force.set_native_forces(cs.force_local);
            forces += contact.force.get_body_forces(&frames);
            moments += contact.force.moments();
        }
        let mut state = self.state.write();
        state.contacts = states;
        state.forces = forces;
        state.moments = moments;
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.contacts.clear();
        *self.state.write() = GroundReactionsState::default();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("gear/wow", s, |s| s.wow(), None)?;
        pm.tie_shared("gear/num-units", s, |s| s.contacts.len() as i32, None)?;
        pm.tie_shared("forces/fbx-gear-lbs", s, |s| s.forces.x, None)?;
        pm.tie_shared("forces/fby-gear-lbs", s, |s| s.forces.y, None)?;
        pm.tie_shared("forces/fbz-gear-lbs", s, |s| s.forces.z, None)?;
        pm.tie_shared("moments/l-gear-lbsft", s, |s| s.moments.x, None)?;
        pm.tie_shared("moments/m-gear-lbsft", s, |s| s.moments.y, None)?;
        pm.tie_shared("moments/n-gear-lbsft", s, |s| s.moments.z, None)?;
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
mod ut_ground_reactions {
    use super::*;
    use crate::earth::{DefaultGroundCallback, Ellipsoid};
    use approx::assert_abs_diff_eq;

    const RADIUS: f64 = 20_000_000.0;

    fn gear() -> (PropertyManager, GroundReactions) {
        let pm = PropertyManager::new();
        let ground = Shared::new(
            Box::new(DefaultGroundCallback::new(RADIUS, RADIUS)) as Box<dyn GroundCallback>
        );
        let mut gr = GroundReactions::new(pm.clone(), ground);
        gr.bind(&pm).unwrap();
        let cfg: GroundReactionsConfig = serde_yaml::from_str(
            r#"
contacts:
  - name: nose
    type: BOGEY
    location: [-24.0, 0.0, -12.0]
    spring_coeff: 1000.0
    damping_coeff: 100.0
  - name: tail
    type: STRUCTURE
    location: [24.0, 0.0, -12.0]
    spring_coeff: 1000.0
    damping_coeff: 100.0
"#,
        )
        .unwrap();
        gr.load(&cfg).unwrap();
        gr.init_model().unwrap();
        (pm, gr)
    }

    /// Level attitude over the north pole of a sphere: local and body axes are aligned.
    fn place(gr: &mut GroundReactions, altitude: f64) {
        let mut location = Location::from_spherical(0.0, std::f64::consts::FRAC_PI_2 - 1e-9, RADIUS + altitude);
        location.set_ellipsoid(Ellipsoid::sphere(RADIUS));
        gr.inputs.tb2l = Matrix3::identity();
        gr.inputs.location = location;
    }

    #[test]
    fn airborne_contacts_are_inactive() {
        let (pm, mut gr) = gear();
        place(&mut gr, 10.0);
        gr.run(false).unwrap();
        assert!(!pm.get_bool("gear/wow").unwrap());
        assert_eq!(gr.forces(), Vector3::zeros());
        assert_eq!(pm.get::<i32>("gear/num-units").unwrap(), 2);
    }

    #[test]
    fn compressed_contacts_push_up() {
        let (pm, mut gr) = gear();
        // Contacts are 1 ft below the CG, so this compresses both by half a foot
        place(&mut gr, 0.5);
        gr.run(false).unwrap();
        assert!(pm.get_bool("gear/unit[0]/WOW").unwrap());
        assert!(pm.get_bool("gear/unit[1]/WOW").unwrap());
        assert_abs_diff_eq!(
            pm.get_f64("gear/unit[1]/compression-ft").unwrap(),
            0.5,
            epsilon = 1e-6
        );
        // Two springs of 1000 lbs/ft compressed by 0.5 ft, pushing up the body
        assert_abs_diff_eq!(gr.forces().z, -1000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(gr.forces().x, 0.0, epsilon = 1e-6);
        // Symmetric about the CG
        assert_abs_diff_eq!(gr.moments().y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn friction_opposes_motion() {
        let (_pm, mut gr) = gear();
        place(&mut gr, 0.5);
        gr.inputs.v_ned = Vector3::new(10.0, 0.0, 0.0);
        gr.run(false).unwrap();
        let state = gr.state().snapshot();
        // Bogey rolls, structure slides
        assert_abs_diff_eq!(state.contacts[0].force_local.x, -0.02 * 500.0, epsilon = 1e-3);
        assert_abs_diff_eq!(state.contacts[1].force_local.x, -0.5 * 500.0, epsilon = 1e-3);
    }
}
