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

use crate::earth::LocationError;
use crate::errors::{FdmError, InvalidScheduleSnafu};
use crate::props::{PropertyError, PropertyManager};
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;

/// Force resolution from native frames to the body frame.
pub mod force;
pub use self::force::{Force, ForceFrames, FrameProvider, TransformType};

/// Integration of the equations of motion, holds the vehicle state.
pub mod propagate;
pub use self::propagate::{Integrator, Propagate, VehicleState};

/// External commands written into the property tree.
pub mod input;
pub use self::input::{Input, InputCommand};

/// Gravity, Earth rotation and ground callback.
pub mod inertial;
pub use self::inertial::{GravityModel, Inertial};

/// 1976 standard atmosphere and winds.
pub mod atmosphere;
pub use self::atmosphere::{Atmosphere, AtmosphereConditions};

/// Flight control, autopilot and system channels.
pub mod systems;
pub use self::systems::Systems;

/// Weight, center of gravity and inertia.
pub mod mass_balance;
pub use self::mass_balance::MassBalance;

/// Air data and the Pitot utilities.
pub mod auxiliary;
pub use self::auxiliary::{
    mach_from_impact_pressure, mach_from_vcalibrated, pitot_total_pressure,
    vcalibrated_from_mach, Auxiliary,
};

/// Thrusters.
pub mod propulsion;
pub use self::propulsion::Propulsion;

/// Coefficient build up of the aerodynamic forces and moments.
pub mod aerodynamics;
pub use self::aerodynamics::Aerodynamics;

/// Landing gear and structural contacts.
pub mod ground_reactions;
pub use self::ground_reactions::GroundReactions;

/// Metrics and force summation.
pub mod aircraft;
pub use self::aircraft::Aircraft;

/// Translational and rotational accelerations.
pub mod accelerations;
pub use self::accelerations::Accelerations;

/// Tabular output of properties.
pub mod output;
pub use self::output::Output;

/// Sea level standard gravity, ft/s^2
pub const STANDARD_GRAVITY: f64 = 32.174_049;
/// Feet per inch
pub const INCH_TO_FT: f64 = 1.0 / 12.0;
/// Knots per foot per second
pub const FPS_TO_KTS: f64 = 0.592_483_801_295_896_4;

/// The contract every model scheduled by the executive implements.
///
/// The executive provides the inputs of a model right before calling [`Model::run`]. The outputs of
/// a model are read by the executive after it ran, and by anyone else through the property tree.
pub trait Model: Send + fmt::Debug {
    fn kind(&self) -> ModelKind;

    /// One-time setup, resets the state of the model. Called at construction for every model
    /// except Input and Output, which are initialised once the aircraft is loaded.
    fn init_model(&mut self) -> Result<(), ModelError>;

    /// Advances this model by one frame. A model which is holding must not change its state.
    fn run(&mut self, holding: bool) -> Result<(), ModelError>;

    /// Ties the properties this model exposes at construction.
    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError>;

    /// Forgets what an aircraft document configured, returning to the state after construction.
    /// The properties tied by the load must already have been released from the tree.
    fn unload(&mut self) {}

    /// Number of frames between two executions of this model.
    fn rate(&self) -> u32;

    fn set_rate(&mut self, rate: u32);
}

/// The frame counter shared by all models.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModelBase {
    rate: u32,
    exe_ctr: u32,
}

impl ModelBase {
    pub fn new() -> Self {
        Self {
            rate: 1,
            exe_ctr: 0,
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Sets the execution rate, a rate of zero is treated as one.
    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate.max(1);
    }

    pub fn reset(&mut self) {
        self.exe_ctr = 0;
    }

    /// Returns true if the model should not execute in this frame.
    /// The first frame after a reset always executes.
    pub fn skip_frame(&mut self) -> bool {
        if self.rate <= 1 {
            return false;
        }
        let skip = self.exe_ctr % self.rate != 0;
        self.exe_ctr = self.exe_ctr.wrapping_add(1);
        skip
    }
}

impl Default for ModelBase {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard models, declared in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize)]
pub enum ModelKind {
    Propagate,
    Input,
    Inertial,
    Atmosphere,
    Systems,
    MassBalance,
    Auxiliary,
    Propulsion,
    Aerodynamics,
    GroundReactions,
    Aircraft,
    Accelerations,
    Output,
}

impl ModelKind {
    /// The models which must run before this one within a frame.
    pub const fn depends_on(&self) -> &'static [ModelKind] {
        use ModelKind::*;
        match self {
            Propagate | Input | Inertial | Atmosphere => &[],
            Systems => &[Atmosphere],
            MassBalance => &[Systems],
            Auxiliary => &[Atmosphere, Propagate],
            Propulsion | Aerodynamics | GroundReactions => &[MassBalance, Auxiliary],
            Aircraft => &[Propulsion, Aerodynamics, GroundReactions],
            Accelerations => &[Aircraft, Inertial, MassBalance],
            Output => &[
                Propagate,
                Input,
                Inertial,
                Atmosphere,
                Systems,
                MassBalance,
                Auxiliary,
                Propulsion,
                Aerodynamics,
                GroundReactions,
                Aircraft,
                Accelerations,
            ],
        }
    }

    /// Input and Output are only initialised once an aircraft is loaded.
    pub const fn initialised_at_construction(&self) -> bool {
        !matches!(self, Self::Input | Self::Output)
    }

    /// Bit of this model in the initialisation error mask.
    pub const fn mask(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Checks that every model of the schedule runs after the models it depends on.
/// Dependencies which are not scheduled are ignored.
pub fn validate_schedule(schedule: &[ModelKind]) -> Result<(), FdmError> {
    for (pos, kind) in schedule.iter().enumerate() {
        for dependency in kind.depends_on() {
            if let Some(dep_pos) = schedule.iter().position(|k| k == dependency) {
                ensure!(
                    dep_pos < pos,
                    InvalidScheduleSnafu {
                        kind: *kind,
                        dependency: *dependency
                    }
                );
            }
        }
    }
    Ok(())
}

/// Errors raised by the models.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ModelError {
    #[snafu(display("model property error: {source}"))]
    ModelProperty { source: PropertyError },
    #[snafu(display("model location error: {source}"))]
    ModelLocation { source: LocationError },
    #[snafu(display("invalid {model} configuration: {reason}"))]
    InvalidModelConfig { model: ModelKind, reason: String },
    #[snafu(display("{model} diverged: {what}"))]
    Diverged { model: ModelKind, what: String },
    #[snafu(display("could not write output to {name}: {source}"))]
    OutputWrite { name: String, source: csv::Error },
    #[snafu(display("could not create output file {name}: {source}"))]
    OutputCreate {
        name: String,
        source: std::io::Error,
    },
}
