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

use rand_distr::{Distribution, Normal, Uniform};
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispersionKind {
    /// Uniformly distributed within plus or minus the spread
    Uniform,
    /// Normally distributed, the spread is the standard deviation
    Gaussian,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub kind: DispersionKind,
    pub spread: f64,
}

/// A numeric configuration value, either a plain number or a nominal value with a dispersion.
///
/// ```yaml
/// emptywt: 500.0
/// # or
/// emptywt:
///   value: 500.0
///   dispersion: { kind: gaussian, spread: 5.0 }
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dispersible {
    Nominal(f64),
    Dispersed { value: f64, dispersion: Dispersion },
}

impl Dispersible {
    pub fn nominal(&self) -> f64 {
        match self {
            Self::Nominal(value) | Self::Dispersed { value, .. } => *value,
        }
    }

    /// Samples this value if a generator is provided, else returns the nominal value.
    pub fn resolve(&self, rng: Option<&mut Pcg64Mcg>) -> f64 {
        let (value, dispersion, rng) = match (self, rng) {
            (Self::Dispersed { value, dispersion }, Some(rng)) => (*value, dispersion, rng),
            _ => return self.nominal(),
        };

        let spread = dispersion.spread.abs();
        if spread == 0.0 {
            return value;
        }

        match dispersion.kind {
            DispersionKind::Uniform => {
                Uniform::new_inclusive(value - spread, value + spread).sample(rng)
            }
            DispersionKind::Gaussian => match Normal::new(value, spread) {
                Ok(distr) => distr.sample(rng),
                Err(e) => {
                    warn!("cannot disperse {value} with a standard deviation of {spread}: {e}, using the nominal value");
                    value
                }
            },
        }
    }
}

impl Default for Dispersible {
    fn default() -> Self {
        Self::Nominal(0.0)
    }
}

impl From<f64> for Dispersible {
    fn from(value: f64) -> Self {
        Self::Nominal(value)
    }
}

#[cfg(test)]
mod ut_dispersion {
    use super::*;

    #[test]
    fn yaml_forms() {
        let plain: Dispersible = serde_yaml::from_str("12.5").unwrap();
        assert_eq!(plain, Dispersible::Nominal(12.5));
        let dispersed: Dispersible =
            serde_yaml::from_str("{value: 10.0, dispersion: {kind: uniform, spread: 1.0}}").unwrap();
        assert_eq!(dispersed.nominal(), 10.0);
    }

    #[test]
    fn sampling_is_seeded() {
        let value = Dispersible::Dispersed {
            value: 10.0,
            dispersion: Dispersion {
                kind: DispersionKind::Uniform,
                spread: 1.0,
            },
        };
        assert_eq!(value.resolve(None), 10.0);

        let mut rng_a = Pcg64Mcg::new(7);
        let mut rng_b = Pcg64Mcg::new(7);
        let a = (0..50).map(|_| value.resolve(Some(&mut rng_a))).collect::<Vec<_>>();
        let b = (0..50).map(|_| value.resolve(Some(&mut rng_b))).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (9.0..=11.0).contains(v)));
        assert!(a.iter().any(|v| *v != 10.0));

        let gaussian = Dispersible::Dispersed {
            value: 0.0,
            dispersion: Dispersion {
                kind: DispersionKind::Gaussian,
                spread: 2.0,
            },
        };
        let mean = (0..2000)
            .map(|_| gaussian.resolve(Some(&mut rng_a)))
            .sum::<f64>()
            / 2000.0;
        assert!(mean.abs() < 0.3, "sample mean {mean} too far from zero");
    }
}
