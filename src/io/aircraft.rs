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

use super::{ConfigRepr, Dispersible};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The configuration format version this crate reads.
pub const REQUIRED_VERSION: &str = "2.0";
/// The release tag of a mature aircraft model.
pub const PRODUCTION_RELEASE: &str = "PRODUCTION";

/// An aircraft document.
///
/// Sections are loaded in this order: metrics, mass balance, ground reactions, propulsion, system
/// files, autopilot, flight control, aerodynamics, input and outputs. Top level keys which are not
/// recognized are kept in `unknown` and reported as warnings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileheader: Option<FileHeader>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slave: Vec<SlaveConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_balance: Option<MassBalanceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_reactions: Option<GroundReactionsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propulsion: Option<PropulsionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autopilot: Option<SystemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_control: Option<SystemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aerodynamics: Option<AerodynamicsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<OutputConfig>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

impl ConfigRepr for AircraftConfig {}

/// Informational only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

/// A secondary vehicle simulated alongside this one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlaveConfig {
    /// Name of the slave aircraft, resolved like any other aircraft
    pub file: String,
    /// Attachment point in the structural frame of the master, inches
    #[serde(default)]
    pub location: Option<[f64; 3]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Wing area, sqft
    pub wingarea: f64,
    /// Wing span, ft
    pub wingspan: f64,
    /// Mean aerodynamic chord, ft
    pub chord: f64,
    #[serde(default)]
    pub htailarea: f64,
    #[serde(default)]
    pub htailarm: f64,
    #[serde(default)]
    pub vtailarea: f64,
    #[serde(default)]
    pub vtailarm: f64,
    /// Wing incidence, degrees
    #[serde(default)]
    pub wing_incidence: f64,
    /// Aerodynamic reference point, structural inches
    #[serde(default)]
    pub aero_rp: [f64; 3],
    #[serde(default)]
    pub eyepoint: [f64; 3],
    /// Visual reference point
    #[serde(default)]
    pub vrp: [f64; 3],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceConfig {
    /// Moments of inertia about the empty CG, slug ft^2
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    #[serde(default)]
    pub ixy: f64,
    #[serde(default)]
    pub ixz: f64,
    #[serde(default)]
    pub iyz: f64,
    /// Empty weight, lbs
    pub emptywt: Dispersible,
    /// Empty CG, structural inches
    pub cg: [f64; 3],
    #[serde(default)]
    pub pointmasses: Vec<PointMassConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointMassConfig {
    pub name: String,
    /// lbs
    pub weight: Dispersible,
    /// Structural inches
    pub location: [f64; 3],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundReactionsConfig {
    pub contacts: Vec<ContactConfig>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactKind {
    /// Landing gear, rolls on the ground
    #[default]
    Bogey,
    /// Any other structural point, slides on the ground
    Structure,
}

fn default_static_friction() -> f64 {
    0.8
}

fn default_dynamic_friction() -> f64 {
    0.5
}

fn default_rolling_friction() -> f64 {
    0.02
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ContactKind,
    /// Structural inches
    pub location: [f64; 3],
    /// lbs/ft
    pub spring_coeff: f64,
    /// lbs/ft/sec
    pub damping_coeff: f64,
    #[serde(default = "default_static_friction")]
    pub static_friction: f64,
    #[serde(default = "default_dynamic_friction")]
    pub dynamic_friction: f64,
    #[serde(default = "default_rolling_friction")]
    pub rolling_friction: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropulsionConfig {
    pub engines: Vec<EngineRef>,
}

/// An engine, either inline or loaded from the engine directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineRef {
    File {
        /// Name of the engine file, without extension
        file: String,
        /// Overrides the location of the engine file
        #[serde(default)]
        location: Option<[f64; 3]>,
        /// Overrides the orientation of the engine file
        #[serde(default)]
        orientation: Option<[f64; 3]>,
    },
    Inline(EngineConfig),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    /// Thrust at full throttle, lbs
    pub max_thrust: Dispersible,
    /// Structural inches
    #[serde(default)]
    pub location: [f64; 3],
    /// Roll, pitch and yaw of the thrust line from the body axes, degrees
    #[serde(default)]
    pub orientation: [f64; 3],
}

impl ConfigRepr for EngineConfig {}

/// A system, either inline or loaded from the systems directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemRef {
    File { file: String },
    Inline(SystemConfig),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl ConfigRepr for SystemConfig {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub components: Vec<ComponentConfig>,
}

/// A constant or the value of a property. A property name may be prefixed with `-` to negate it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Property(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Also names the property holding the output of the component, under `fcs/` unless it contains a `/`
    pub name: String,
    #[serde(flatten)]
    pub kind: ComponentKind,
    #[serde(default)]
    pub clip: Option<ClipConfig>,
    /// Additional property the output is written to
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    Gain {
        input: String,
        gain: Operand,
    },
    Summer {
        inputs: Vec<String>,
        #[serde(default)]
        bias: f64,
    },
    /// First order lag `c1 / (s + c1)`
    Lag {
        input: String,
        c1: f64,
    },
    /// Outputs the value of the first passing test, or the default
    Switch {
        #[serde(default)]
        tests: Vec<SwitchTestConfig>,
        default: Operand,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    pub min: Operand,
    pub max: Operand,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn test(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchTestConfig {
    pub property: String,
    pub op: Comparison,
    pub value: f64,
    pub output: Operand,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AerodynamicsConfig {
    pub axes: Vec<AxisConfig>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AeroAxis {
    Drag,
    Side,
    Lift,
    X,
    Y,
    Z,
    Roll,
    Pitch,
    Yaw,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub name: AeroAxis,
    #[serde(default)]
    pub functions: Vec<FunctionConfig>,
}

/// `value * factor_1 * ... * factor_n * table(independent)`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Property holding the result of this function
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: Dispersible,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub table: Option<TableConfig>,
}

/// A one dimensional table, linearly interpolated and clamped at its ends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub independent: String,
    /// Pairs of (independent, dependent) values sorted by increasing independent value
    pub breakpoints: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Maximum number of commands applied per frame, all pending commands if unset
    #[serde(default)]
    pub max_commands_per_frame: Option<usize>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputKind {
    #[default]
    Csv,
}

fn default_output_rate() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name, relative to the root directory. The output is kept in memory if unset.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: OutputKind,
    /// Hz
    #[serde(default = "default_output_rate")]
    pub rate: f64,
    pub properties: Vec<String>,
}
