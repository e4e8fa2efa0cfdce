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
use super::{InvalidModelConfigSnafu, Model, ModelBase, ModelError, ModelKind, ModelPropertySnafu};
use crate::io::aircraft::{AeroAxis, AerodynamicsConfig, FunctionConfig};
use crate::linalg::Vector3;
use crate::props::{PropertyError, PropertyManager, PropertyNode, Shared};
use rand_pcg::Pcg64Mcg;
use snafu::{ensure, ResultExt};

/// Linear interpolation in `breakpoints`, sorted by increasing first element. Clamped at both ends.
pub fn interpolate(breakpoints: &[[f64; 2]], x: f64) -> f64 {
    match breakpoints {
        [] => 0.0,
        [only] => only[1],
        [first, ..] if x <= first[0] => first[1],
        [.., last] if x >= last[0] => last[1],
        _ => {
            let upper = breakpoints
                .iter()
                .position(|bp| bp[0] > x)
                .unwrap_or(breakpoints.len() - 1);
            let [x0, y0] = breakpoints[upper - 1];
            let [x1, y1] = breakpoints[upper];
            if x1 == x0 {
                y0
            } else {
                y0 + (x - x0) * (y1 - y0) / (x1 - x0)
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Table {
    independent: PropertyNode,
    breakpoints: Vec<[f64; 2]>,
}

/// A coefficient build up term: a constant times a product of properties, times an optional table.
#[derive(Clone, Debug)]
struct AeroFunction {
    name: String,
    value: f64,
    factors: Vec<PropertyNode>,
    table: Option<Table>,
}

fn input_node(pm: &PropertyManager, path: &str) -> Result<PropertyNode, PropertyError> {
    let node = pm.get_node(path, true)?;
    if !node.has_value() {
        warn!("aerodynamics reads {path} which nothing provides, using 0");
        node.set_f64(0.0)?;
    }
    Ok(node)
}

impl AeroFunction {
    fn new(
        pm: &PropertyManager,
        cfg: &FunctionConfig,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<Self, PropertyError> {
        let factors = cfg
            .factors
            .iter()
            .map(|path| input_node(pm, path))
            .collect::<Result<Vec<_>, _>>()?;
        let table = match &cfg.table {
            Some(table) => {
                let mut breakpoints = table.breakpoints.clone();
                breakpoints.sort_by(|a, b| a[0].total_cmp(&b[0]));
                Some(Table {
                    independent: input_node(pm, &table.independent)?,
                    breakpoints,
                })
            }
            None => None,
        };
        Ok(Self {
            name: cfg.name.clone(),
            value: cfg.value.resolve(rng),
            factors,
            table,
        })
    }

    fn evaluate(&self) -> Result<f64, PropertyError> {
        let mut result = self.value;
        for factor in &self.factors {
            result *= factor.get_f64()?;
        }
        if let Some(table) = &self.table {
            result *= interpolate(&table.breakpoints, table.independent.get_f64()?);
        }
        Ok(result)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ForceAxes {
    Wind,
    Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AerodynamicsState {
    /// The last value of every function, in load order
    pub functions: Vec<f64>,
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    pub wind_forces: Vector3<f64>,
}

impl Default for AerodynamicsState {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
            forces: Vector3::zeros(),
            moments: Vector3::zeros(),
            wind_forces: Vector3::zeros(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AerodynamicsInputs {
    pub frames: ForceFrames,
    /// Aerodynamic reference point, structural inches
    pub aero_rp: Vector3<f64>,
}

impl Default for AerodynamicsInputs {
    fn default() -> Self {
        Self {
            frames: ForceFrames::default(),
            aero_rp: Vector3::zeros(),
        }
    }
}

/// Forces and moments summed per axis from coefficient functions.
///
/// Forces are either all in wind axes (DRAG, SIDE, LIFT) or all in body axes (X, Y, Z). Moments
/// (ROLL, PITCH, YAW) are in body axes about the aerodynamic reference point.
#[derive(Debug)]
pub struct Aerodynamics {
    base: ModelBase,
    pub inputs: AerodynamicsInputs,
    pm: PropertyManager,
    axes: Option<ForceAxes>,
    /// Function indices per axis: three force axes then roll, pitch and yaw
    axis_functions: [Vec<usize>; 6],
    functions: Vec<AeroFunction>,
    force: Force,
    state: Shared<AerodynamicsState>,
}

impl Aerodynamics {
    pub fn new(pm: PropertyManager) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: AerodynamicsInputs::default(),
            pm,
            axes: None,
            axis_functions: Default::default(),
            functions: Vec::new(),
            force: Force::new(),
            state: Shared::new(AerodynamicsState::default()),
        }
    }

    pub fn load(
        &mut self,
        cfg: &AerodynamicsConfig,
        mut rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), ModelError> {
        for axis in &cfg.axes {
            let (slot, kind) = match axis.name {
                AeroAxis::Drag => (0, Some(ForceAxes::Wind)),
                AeroAxis::Side => (1, Some(ForceAxes::Wind)),
                AeroAxis::Lift => (2, Some(ForceAxes::Wind)),
                AeroAxis::X => (0, Some(ForceAxes::Body)),
                AeroAxis::Y => (1, Some(ForceAxes::Body)),
                AeroAxis::Z => (2, Some(ForceAxes::Body)),
                AeroAxis::Roll => (3, None),
                AeroAxis::Pitch => (4, None),
                AeroAxis::Yaw => (5, None),
            };
            if let Some(kind) = kind {
                ensure!(
                    self.axes.map_or(true, |axes| axes == kind),
                    InvalidModelConfigSnafu {
                        model: ModelKind::Aerodynamics,
                        reason: format!("{:?} axis mixes wind and body force axes", axis.name),
                    }
                );
                self.axes = Some(kind);
            }
            for function in &axis.functions {
                let idx = self.functions.len();
                let f = AeroFunction::new(&self.pm, function, rng.as_deref_mut())
                    .context(ModelPropertySnafu)?;
                self.bind_function(idx, &f.name).context(ModelPropertySnafu)?;
                self.functions.push(f);
                self.axis_functions[slot].push(idx);
            }
        }

        match self.axes {
            Some(ForceAxes::Wind) => {
                self.force.set_transform_type(TransformType::WindBody);
                self.force.set_sense(Vector3::new(-1.0, 1.0, -1.0));
            }
            _ => {
                self.force.set_transform_type(TransformType::None);
                self.force.set_sense(Vector3::new(1.0, 1.0, 1.0));
            }
        }
        debug!("aerodynamics: {} functions", self.functions.len());
        Ok(())
    }

    fn bind_function(&self, idx: usize, name: &str) -> Result<(), PropertyError> {
        self.state.write().functions.push(0.0);
        let path = if name.contains('/') {
            name.to_string()
        } else {
            format!("aero/coefficient/{name}")
        };
        let reader = self.state.clone();
        self.pm.tie_ro(&path, move || {
            reader.read().functions.get(idx).copied().unwrap_or(0.0)
        })?;
        Ok(())
    }

    pub fn state(&self) -> &Shared<AerodynamicsState> {
        &self.state
    }

    pub fn forces(&self) -> Vector3<f64> {
        self.state.read().forces
    }

    pub fn moments(&self) -> Vector3<f64> {
        self.state.read().moments
    }
}

impl Model for Aerodynamics {
    fn kind(&self) -> ModelKind {
        ModelKind::Aerodynamics
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut state = self.state.write();
        state.functions.iter_mut().for_each(|v| *v = 0.0);
        state.forces = Vector3::zeros();
        state.moments = Vector3::zeros();
        state.wind_forces = Vector3::zeros();
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        // Functions may read earlier functions through the tree, so each value is stored as soon
        // as it is known and the state is never locked while evaluating.
        for (idx, function) in self.functions.iter().enumerate() {
            let value = function.evaluate().context(ModelPropertySnafu)?;
            self.state.write().functions[idx] = value;
        }
        let sums = {
            let state = self.state.read();
            self.axis_functions
                .iter()
                .map(|indices| indices.iter().map(|&i| state.functions[i]).sum::<f64>())
                .collect::<Vec<f64>>()
        };

        let frames = self.inputs.frames;
        self.force.set_location(self.inputs.aero_rp);
        self.force
            .set_native_forces(Vector3::new(sums[0], sums[1], sums[2]));
        self.force
            .set_native_moments(Vector3::new(sums[3], sums[4], sums[5]));
        let forces = self.force.get_body_forces(&frames);
        let mut state = self.state.write();
        state.forces = forces;
        state.moments = self.force.moments();
        state.wind_forces = frames.tw2b.transpose() * forces;
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.axes = None;
        self.axis_functions = Default::default();
        self.functions.clear();
        self.force = Force::new();
        *self.state.write() = AerodynamicsState::default();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared("forces/fbx-aero-lbs", s, |s| s.forces.x, None)?;
        pm.tie_shared("forces/fby-aero-lbs", s, |s| s.forces.y, None)?;
        pm.tie_shared("forces/fbz-aero-lbs", s, |s| s.forces.z, None)?;
        pm.tie_shared("moments/l-aero-lbsft", s, |s| s.moments.x, None)?;
        pm.tie_shared("moments/m-aero-lbsft", s, |s| s.moments.y, None)?;
        pm.tie_shared("moments/n-aero-lbsft", s, |s| s.moments.z, None)?;
        pm.tie_shared("forces/fwx-aero-lbs", s, |s| s.wind_forces.x, None)?;
        pm.tie_shared("forces/fwy-aero-lbs", s, |s| s.wind_forces.y, None)?;
        pm.tie_shared("forces/fwz-aero-lbs", s, |s| s.wind_forces.z, None)?;
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
mod ut_aerodynamics {
    use super::*;
    use crate::dynamics::auxiliary::wind_to_body;
    use approx::assert_abs_diff_eq;
    use rstest::*;

    #[rstest]
    #[case(-1.0, 0.0)]
    #[case(0.0, 0.0)]
    #[case(0.5, 5.0)]
    #[case(1.0, 10.0)]
    #[case(1.5, 5.0)]
    #[case(3.0, 0.0)]
    fn table_lookup(#[case] x: f64, #[case] expected: f64) {
        let table = [[0.0, 0.0], [1.0, 10.0], [2.0, 0.0]];
        assert_abs_diff_eq!(interpolate(&table, x), expected, epsilon = 1e-12);
    }

    const DOC: &str = r#"
axes:
  - name: DRAG
    functions:
      - name: aero/coefficient/CD0
        value: 0.5
        factors: [aero/qbar-psf, metrics/Sw-sqft]
  - name: LIFT
    functions:
      - name: CLalpha
        value: 1.0
        factors: [aero/qbar-psf, metrics/Sw-sqft]
        table:
          independent: aero/alpha-rad
          breakpoints: [[-0.2, -1.0], [0.0, 0.0], [0.2, 1.0]]
  - name: PITCH
    functions:
      - name: Cm0
        value: -10.0
"#;

    #[test]
    fn wind_axes_build_up() {
        let pm = PropertyManager::new();
        pm.set_f64("aero/qbar-psf", 100.0).unwrap();
        pm.set_f64("metrics/Sw-sqft", 2.0).unwrap();
        pm.set_f64("aero/alpha-rad", 0.1).unwrap();
        let mut aero = Aerodynamics::new(pm.clone());
        aero.bind(&pm).unwrap();
        let cfg: AerodynamicsConfig = serde_yaml::from_str(DOC).unwrap();
        aero.load(&cfg, None).unwrap();
        let alpha: f64 = 0.1;
        aero.inputs.frames.tw2b = wind_to_body(alpha, 0.0);
        aero.run(false).unwrap();

        assert_eq!(pm.get_f64("aero/coefficient/CD0").unwrap(), 100.0);
        assert_abs_diff_eq!(
            pm.get_f64("aero/coefficient/CLalpha").unwrap(),
            100.0,
            epsilon = 1e-9
        );
        // Drag and lift point aft and up in the wind frame
        assert_abs_diff_eq!(pm.get_f64("forces/fwx-aero-lbs").unwrap(), -100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pm.get_f64("forces/fwz-aero-lbs").unwrap(), -100.0, epsilon = 1e-9);
        let fb = aero.forces();
        assert_abs_diff_eq!(
            fb,
            wind_to_body(alpha, 0.0) * Vector3::new(-100.0, 0.0, -100.0),
            epsilon = 1e-9
        );
        assert_eq!(aero.moments(), Vector3::new(0.0, -10.0, 0.0));
    }

    #[test]
    fn mixed_axes_are_rejected() {
        let pm = PropertyManager::new();
        let mut aero = Aerodynamics::new(pm);
        let cfg: AerodynamicsConfig = serde_yaml::from_str(
            r#"
axes:
  - name: DRAG
  - name: X
"#,
        )
        .unwrap();
        assert!(matches!(
            aero.load(&cfg, None),
            Err(ModelError::InvalidModelConfig { .. })
        ));
    }
}
