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

/*! # gyre

A six degree of freedom flight dynamics model. The executive sequences a fixed
set of models (propagation, atmosphere, mass balance, aerodynamics, propulsion,
ground reactions, ...) over simulated time. Models talk to each other and to
external drivers through a hierarchical property tree.

Units are feet, slugs, pounds-force and seconds unless a property name says otherwise.
*/

/// The hierarchical property tree used as the communication bus between the executive, the models and external drivers.
pub mod props;

/// Earth fixed locations, reference ellipsoids and ground contact queries.
pub mod earth;

/// The model contract, the force resolution utility and the standard models.
pub mod dynamics;

/// Configuration documents (aircraft, initial conditions) and dispersions.
pub mod io;

/// The simulation executive, initial conditions and trimming.
pub mod exec;

/// Utility functions shared by different modules.
pub mod utils;

mod errors;
/// Top level error of the executive, functions which may fail will return this error.
pub use self::errors::FdmError;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
    pub use na::{Quaternion, Rotation3, UnitQuaternion};
}

/// Re-export some useful things
pub use self::dynamics::{Force, Model, ModelKind, TransformType};
pub use self::earth::{DefaultGroundCallback, Ellipsoid, GroundCallback, Location};
pub use self::exec::{FdmExec, TrimMode};
pub use self::props::{PropertyManager, PropertyNode, Shared};
