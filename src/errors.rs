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

use crate::dynamics::{ModelError, ModelKind};
use crate::earth::LocationError;
use crate::io::ConfigError;
use crate::props::PropertyError;
use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FdmError {
    #[snafu(display("no models are configured, load an aircraft first"))]
    NoModels,
    #[snafu(display("{kind} depends on {dependency} but is scheduled before it"))]
    InvalidSchedule {
        kind: ModelKind,
        dependency: ModelKind,
    },
    #[snafu(display("aircraft configuration not found at {}", path.display()))]
    AircraftNotFound { path: PathBuf },
    #[snafu(display("{mode} trim failed: {reason}"))]
    TrimFailed { mode: String, reason: String },
    #[snafu(display("executive property error: {source}"))]
    FdmProperty { source: PropertyError },
    #[snafu(display("executive location error: {source}"))]
    FdmLocation { source: LocationError },
    #[snafu(display("{kind} model failed: {source}"))]
    FdmModel { kind: ModelKind, source: ModelError },
    #[snafu(display("loading {what} failed: {source}"))]
    FdmConfig { what: String, source: ConfigError },
    #[snafu(display("slave `{name}` failed: {source}"))]
    Slave {
        name: String,
        #[snafu(source(from(FdmError, Box::new)))]
        source: Box<FdmError>,
    },
}

impl PartialEq for FdmError {
    /// Compares the variants only, the sources of wrapped errors are not compared.
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
