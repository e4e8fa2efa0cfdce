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

use super::force::structural_to_body;
use super::{Model, ModelBase, ModelError, ModelKind, ModelPropertySnafu, STANDARD_GRAVITY};
use crate::io::aircraft::MassBalanceConfig;
use crate::linalg::{Matrix3, Vector3};
use crate::props::{PropertyError, PropertyManager, Shared};
use rand_pcg::Pcg64Mcg;
use snafu::{ensure, ResultExt};

#[derive(Clone, Debug, PartialEq)]
pub struct PointMass {
    pub name: String,
    /// lbs
    pub weight: f64,
    /// Structural location, inches
    pub location: Vector3<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MassBalanceState {
    pub empty_weight: f64,
    /// Empty weight CG, structural inches
    pub empty_cg: Vector3<f64>,
    /// Inertia tensor of the empty vehicle, slug ft^2
    pub base_j: Matrix3<f64>,
    pub point_masses: Vec<PointMass>,
    pub weight: f64,
    pub mass: f64,
    pub cg: Vector3<f64>,
    pub j: Matrix3<f64>,
    pub jinv: Matrix3<f64>,
}

impl Default for MassBalanceState {
    fn default() -> Self {
        Self {
            empty_weight: 0.0,
            empty_cg: Vector3::zeros(),
            base_j: Matrix3::zeros(),
            point_masses: Vec::new(),
            weight: 0.0,
            mass: 0.0,
            cg: Vector3::zeros(),
            j: Matrix3::zeros(),
            jinv: Matrix3::zeros(),
        }
    }
}

impl MassBalanceState {
    fn update(&mut self) {
        let mut weight = self.empty_weight;
        let mut moment = self.empty_cg * self.empty_weight;
        for pm in &self.point_masses {
            weight += pm.weight;
            moment += pm.location * pm.weight;
        }
        self.weight = weight;
        self.mass = weight / STANDARD_GRAVITY;
        if weight > 0.0 {
            self.cg = moment / weight;
        }

        let mut j = self.base_j;
        for pm in &self.point_masses {
            let r = structural_to_body(&self.cg, &pm.location);
            let m = pm.weight / STANDARD_GRAVITY;
            j += (Matrix3::identity() * r.dot(&r) - r * r.transpose()) * m;
        }
        self.j = j;
        self.jinv = j.try_inverse().unwrap_or_else(Matrix3::zeros);
    }
}

/// Weight, center of gravity and inertia of the vehicle.
#[derive(Debug)]
pub struct MassBalance {
    base: ModelBase,
    pm: PropertyManager,
    state: Shared<MassBalanceState>,
}

impl MassBalance {
    pub fn new(pm: PropertyManager) -> Self {
        Self {
            base: ModelBase::new(),
            pm,
            state: Shared::new(MassBalanceState::default()),
        }
    }

    /// Loads the mass properties, sampling the dispersed weights if `rng` is provided.
    pub fn load(
        &mut self,
        cfg: &MassBalanceConfig,
        mut rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), ModelError> {
        let empty_weight = cfg.emptywt.resolve(rng.as_deref_mut());
        ensure!(
            empty_weight > 0.0,
            super::InvalidModelConfigSnafu {
                model: ModelKind::MassBalance,
                reason: format!("empty weight must be positive, got {empty_weight}"),
            }
        );
        let point_masses = cfg
            .pointmasses
            .iter()
            .map(|pm| PointMass {
                name: pm.name.clone(),
                weight: pm.weight.resolve(rng.as_deref_mut()),
                location: Vector3::from(pm.location),
            })
            .collect::<Vec<_>>();
        let count = point_masses.len();
        {
            let mut state = self.state.write();
            state.empty_weight = empty_weight;
            state.empty_cg = Vector3::from(cfg.cg);
            state.base_j = Matrix3::new(
                cfg.ixx, -cfg.ixy, -cfg.ixz, //
                -cfg.ixy, cfg.iyy, -cfg.iyz, //
                -cfg.ixz, -cfg.iyz, cfg.izz,
            );
            state.point_masses = point_masses;
            state.update();
            debug!(
                "mass balance: {:.1} lbs, CG at {:?} in, {count} point masses",
                state.weight, state.cg
            );
        }
        self.pm
            .tie_indexed_shared(
                "inertia/pointmass-weight-lbs",
                count,
                &self.state,
                |s, i| s.point_masses.get(i).map(|pm| pm.weight).unwrap_or(0.0),
                Some(|s: &mut MassBalanceState, i: usize, v: f64| {
                    if let Some(pm) = s.point_masses.get_mut(i) {
                        pm.weight = v;
                    }
                }),
            )
            .context(ModelPropertySnafu)?;
        Ok(())
    }

    pub fn state(&self) -> &Shared<MassBalanceState> {
        &self.state
    }

    pub fn mass(&self) -> f64 {
        self.state.read().mass
    }

    pub fn weight(&self) -> f64 {
        self.state.read().weight
    }

    pub fn cg(&self) -> Vector3<f64> {
        self.state.read().cg
    }

    pub fn j(&self) -> Matrix3<f64> {
        self.state.read().j
    }

    pub fn jinv(&self) -> Matrix3<f64> {
        self.state.read().jinv
    }

    /// Lever arm in the body frame (ft) from the CG to the structural location `r` (inches).
    pub fn structural_to_body(&self, r: &Vector3<f64>) -> Vector3<f64> {
        structural_to_body(&self.state.read().cg, r)
    }
}

impl Model for MassBalance {
    fn kind(&self) -> ModelKind {
        ModelKind::MassBalance
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        self.state.write().update();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        self.state.write().update();
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        *self.state.write() = MassBalanceState::default();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("inertia/mass-slugs", s, |s| s.mass, None)?;
        pm.tie_shared("inertia/weight-lbs", s, |s| s.weight, None)?;
        pm.tie_shared(
            "inertia/empty-weight-lbs",
            s,
            |s| s.empty_weight,
            Some(|s: &mut MassBalanceState, v: f64| s.empty_weight = v),
        )?;
        pm.tie_shared("inertia/cg-x-in", s, |s| s.cg.x, None)?;
        pm.tie_shared("inertia/cg-y-in", s, |s| s.cg.y, None)?;
        pm.tie_shared("inertia/cg-z-in", s, |s| s.cg.z, None)?;
        pm.tie_shared("inertia/ixx-slugs_ft2", s, |s| s.j[(0, 0)], None)?;
        pm.tie_shared("inertia/iyy-slugs_ft2", s, |s| s.j[(1, 1)], None)?;
        pm.tie_shared("inertia/izz-slugs_ft2", s, |s| s.j[(2, 2)], None)?;
        pm.tie_shared("inertia/ixy-slugs_ft2", s, |s| -s.j[(0, 1)], None)?;
        pm.tie_shared("inertia/ixz-slugs_ft2", s, |s| -s.j[(0, 2)], None)?;
        pm.tie_shared("inertia/iyz-slugs_ft2", s, |s| -s.j[(1, 2)], None)?;
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
mod ut_mass_balance {
    use super::*;
    use crate::io::aircraft::PointMassConfig;
    use approx::assert_abs_diff_eq;

    fn config() -> MassBalanceConfig {
        MassBalanceConfig {
            ixx: 10.0,
            iyy: 20.0,
            izz: 30.0,
            ixz: 1.0,
            emptywt: 1000.0.into(),
            cg: [100.0, 0.0, 0.0],
            pointmasses: vec![PointMassConfig {
                name: "pilot".to_string(),
                weight: 200.0.into(),
                location: [40.0, 0.0, 0.0],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn weight_cg_and_inertia() {
        let pm = PropertyManager::new();
        let mut mb = MassBalance::new(pm.clone());
        mb.bind(&pm).unwrap();
        mb.load(&config(), None).unwrap();
        assert_eq!(mb.weight(), 1200.0);
        assert_abs_diff_eq!(mb.mass(), 1200.0 / STANDARD_GRAVITY);
        // (1000 * 100 + 200 * 40) / 1200
        assert_abs_diff_eq!(mb.cg().x, 90.0, epsilon = 1e-12);
        // Pilot is 50 inches ahead of the CG
        let arm = 50.0 / 12.0;
        let m = 200.0 / STANDARD_GRAVITY;
        let j = mb.j();
        assert_abs_diff_eq!(j[(0, 0)], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(j[(1, 1)], 20.0 + m * arm * arm, epsilon = 1e-9);
        assert_abs_diff_eq!(j[(2, 2)], 30.0 + m * arm * arm, epsilon = 1e-9);
        assert_abs_diff_eq!(j[(0, 2)], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mb.jinv() * j, Matrix3::identity(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            mb.structural_to_body(&Vector3::new(40.0, 0.0, 0.0)),
            Vector3::new(arm, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_eq!(pm.get_f64("inertia/ixz-slugs_ft2").unwrap(), 1.0);
    }

    #[test]
    fn point_mass_property_moves_cg() {
        let pm = PropertyManager::new();
        let mut mb = MassBalance::new(pm.clone());
        mb.bind(&pm).unwrap();
        mb.load(&config(), None).unwrap();
        pm.set_f64("inertia/pointmass-weight-lbs[0]", 0.0).unwrap();
        mb.run(false).unwrap();
        assert_eq!(pm.get_f64("inertia/weight-lbs").unwrap(), 1000.0);
        assert_abs_diff_eq!(pm.get_f64("inertia/cg-x-in").unwrap(), 100.0, epsilon = 1e-12);
    }

    #[test]
    fn non_positive_weight_is_rejected() {
        let mut mb = MassBalance::new(PropertyManager::new());
        let cfg = MassBalanceConfig {
            emptywt: 0.0.into(),
            ..config()
        };
        assert!(matches!(
            mb.load(&cfg, None),
            Err(ModelError::InvalidModelConfig { .. })
        ));
    }
}
