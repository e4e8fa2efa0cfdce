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

use rand_pcg::Pcg64Mcg;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use typed_builder::TypedBuilder;

/// The aircraft document and its sections.
pub mod aircraft;
pub use self::aircraft::AircraftConfig;

/// Numeric values which may be randomly dispersed when loaded.
pub mod dispersion;
pub use self::dispersion::{Dispersible, Dispersion, DispersionKind};

/// Initial condition documents.
pub mod initial;
pub use self::initial::InitialConditionConfig;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file {}: {source}", path.display()))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseConfig { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).context(ReadConfigSnafu {
            path: path.to_path_buf(),
        })?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseConfigSnafu)
    }

    /// Builds the configuration representation from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseConfigSnafu)
    }
}

/// Seeds the random dispersion of the loaded values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct DispersionOptions {
    pub seed: u64,
}

/// Options threaded through the loading of an aircraft.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct LoaderOptions {
    /// When set, dispersible values are sampled from their distribution instead of using their nominal value.
    #[builder(default, setter(strip_option))]
    pub dispersion: Option<DispersionOptions>,
}

impl LoaderOptions {
    /// A new generator for this load, if dispersions are enabled.
    pub fn rng(&self) -> Option<Pcg64Mcg> {
        self.dispersion
            .map(|opts| Pcg64Mcg::new(u128::from(opts.seed)))
    }
}

#[cfg(test)]
mod ut_io {
    use super::*;

    #[test]
    fn loader_options() {
        let nominal = LoaderOptions::builder().build();
        assert!(nominal.rng().is_none());
        let dispersed = LoaderOptions::builder()
            .dispersion(DispersionOptions::builder().seed(42).build())
            .build();
        assert!(dispersed.rng().is_some());
    }
}
