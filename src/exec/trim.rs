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

use super::FdmExec;
use crate::errors::{FdmError, TrimFailedSnafu};
use enum_iterator::{all, Sequence};
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The state derivatives a trim drives to zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum TrimState {
    Udot,
    Vdot,
    Wdot,
    Pdot,
    Qdot,
    Rdot,
}

impl TrimState {
    pub const fn property(&self) -> &'static str {
        match self {
            Self::Udot => "accelerations/udot-ft_sec2",
            Self::Vdot => "accelerations/vdot-ft_sec2",
            Self::Wdot => "accelerations/wdot-ft_sec2",
            Self::Pdot => "accelerations/pdot-rad_sec2",
            Self::Qdot => "accelerations/qdot-rad_sec2",
            Self::Rdot => "accelerations/rdot-rad_sec2",
        }
    }

    /// Translational accelerations in ft/s^2, angular ones in rad/s^2.
    pub const fn default_tolerance(&self) -> f64 {
        match self {
            Self::Udot | Self::Vdot | Self::Wdot => 1e-3,
            Self::Pdot | Self::Qdot | Self::Rdot => 1e-4,
        }
    }
}

impl fmt::Display for TrimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The value a trim axis adjusts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrimControl {
    /// Angle of attack of the initial condition, rad
    Alpha,
    /// Sideslip of the initial condition, rad
    Beta,
    /// Pitch attitude of the initial condition, rad
    Theta,
    /// Bank angle of the initial condition, rad
    Phi,
    /// Height above the terrain of the initial condition, ft
    AltitudeAgl,
    /// Throttle command of every engine
    Throttle,
    PitchTrim,
    RollTrim,
    YawTrim,
    /// Any writable property
    Property(String),
}

impl TrimControl {
    pub(crate) fn path(&self) -> &str {
        match self {
            Self::Alpha => "ic/alpha-rad",
            Self::Beta => "ic/beta-rad",
            Self::Theta => "ic/theta-rad",
            Self::Phi => "ic/phi-rad",
            Self::AltitudeAgl => "ic/h-agl-ft",
            Self::Throttle => "fcs/throttle-cmd-norm[0]",
            Self::PitchTrim => "fcs/pitch-trim-cmd-norm",
            Self::RollTrim => "fcs/roll-trim-cmd-norm",
            Self::YawTrim => "fcs/yaw-trim-cmd-norm",
            Self::Property(path) => path,
        }
    }

    pub(crate) fn get(&self, exec: &FdmExec) -> Result<f64, FdmError> {
        exec.get_property_value(self.path())
    }

    pub(crate) fn set(&self, exec: &mut FdmExec, value: f64) -> Result<(), FdmError> {
        match self {
            Self::Throttle => {
                exec.propulsion_mut().set_throttle_cmd(value);
                Ok(())
            }
            _ => exec.set_property_value(self.path(), value),
        }
    }

    /// Throttle and the pilot trims are meaningless on a vehicle without engines or controls.
    fn available(&self, exec: &FdmExec) -> bool {
        match self {
            Self::Throttle => !exec.propulsion().thrusters().is_empty(),
            _ => exec.properties().has_node(self.path()),
        }
    }
}

impl fmt::Display for TrimControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(path) => write!(f, "{path}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// Pairs a state derivative with the control which zeroes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimAxis {
    pub state: TrimState,
    pub control: TrimControl,
    pub min: f64,
    pub max: f64,
    pub tolerance: f64,
}

impl TrimAxis {
    pub fn new(state: TrimState, control: TrimControl, min: f64, max: f64) -> Self {
        Self {
            state,
            control,
            min,
            max,
            tolerance: state.default_tolerance(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrimMode {
    /// Axial, normal and pitch accelerations with alpha, throttle and pitch trim
    Longitudinal,
    /// Longitudinal plus side, roll and yaw accelerations with beta, roll trim and yaw trim
    Full,
    /// On the ground: normal, pitch and roll accelerations with height, pitch and bank
    Ground,
    Custom(Vec<TrimAxis>),
}

impl TrimMode {
    pub fn axes(&self) -> Vec<TrimAxis> {
        use TrimControl::*;
        use TrimState::*;
        let longitudinal = vec![
            TrimAxis::new(Wdot, Alpha, (-10.0_f64).to_radians(), 30.0_f64.to_radians()),
            TrimAxis::new(Udot, Throttle, 0.0, 1.0),
            TrimAxis::new(Qdot, PitchTrim, -1.0, 1.0),
        ];
        match self {
            Self::Longitudinal => longitudinal,
            Self::Full => {
                let mut axes = longitudinal;
                axes.extend([
                    TrimAxis::new(Vdot, Beta, (-30.0_f64).to_radians(), 30.0_f64.to_radians()),
                    TrimAxis::new(Pdot, RollTrim, -1.0, 1.0),
                    TrimAxis::new(Rdot, YawTrim, -1.0, 1.0),
                ]);
                axes
            }
            Self::Ground => vec![
                TrimAxis::new(Wdot, AltitudeAgl, -10.0, 50.0),
                TrimAxis::new(Qdot, Theta, (-30.0_f64).to_radians(), 30.0_f64.to_radians()),
                TrimAxis::new(Pdot, Phi, (-30.0_f64).to_radians(), 30.0_f64.to_radians()),
            ],
            Self::Custom(axes) => axes.clone(),
        }
    }
}

impl fmt::Display for TrimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(axes) => write!(f, "Custom ({} axes)", axes.len()),
            _ => write!(f, "{self:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisReport {
    pub state: TrimState,
    pub control: TrimControl,
    pub control_value: f64,
    pub residual: f64,
    pub tolerance: f64,
}

impl AxisReport {
    pub fn converged(&self) -> bool {
        self.residual.abs() <= self.tolerance
    }
}

/// Outcome of a trim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimReport {
    pub mode: String,
    pub converged: bool,
    /// Number of passes over all the axes
    pub cycles: usize,
    pub axes: Vec<AxisReport>,
    /// Why the trim failed, if it did
    pub failure: Option<String>,
}

impl TrimReport {
    pub fn failed(mode: &TrimMode, reason: String) -> Self {
        Self {
            mode: mode.to_string(),
            converged: false,
            cycles: 0,
            axes: Vec::new(),
            failure: Some(reason),
        }
    }
}

impl fmt::Display for TrimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.converged { "converged" } else { "failed" };
        write!(f, "{} trim {status} after {} cycles", self.mode, self.cycles)?;
        if let Some(reason) = &self.failure {
            write!(f, ": {reason}")?;
        }
        for axis in &self.axes {
            write!(
                f,
                "\n  {:>5} = {:+.6e} (tol {:.0e}) with {} = {:.6}",
                axis.state, axis.residual, axis.tolerance, axis.control, axis.control_value
            )?;
        }
        Ok(())
    }
}

/// Solves for the controls of a steady condition. Each axis is solved in turn by a bracketed
/// Illinois iteration while the others are held, and the axes are cycled until all of them are
/// within tolerance. Every evaluation reinitializes the executive from the initial condition.
#[derive(Clone, Debug)]
pub struct Trim {
    mode: TrimMode,
    axes: Vec<TrimAxis>,
    pub max_cycles: usize,
    pub max_iterations: usize,
}

impl Trim {
    pub fn new(mode: TrimMode) -> Self {
        let axes = mode.axes();
        Self {
            mode,
            axes,
            max_cycles: 60,
            max_iterations: 100,
        }
    }

    pub fn mode(&self) -> &TrimMode {
        &self.mode
    }

    pub fn axes(&self) -> &[TrimAxis] {
        &self.axes
    }

    fn evaluate(&self, exec: &mut FdmExec, axis: &TrimAxis, x: f64) -> Result<f64, FdmError> {
        axis.control.set(exec, x)?;
        exec.run_ic()?;
        exec.get_property_value(axis.state.property())
    }

    /// Bracketed Illinois iteration, returns the residual at the retained control value.
    fn solve_axis(&self, exec: &mut FdmExec, axis: &TrimAxis) -> Result<f64, FdmError> {
        let current = axis.control.get(exec)?.clamp(axis.min, axis.max);
        let f_current = self.evaluate(exec, axis, current)?;
        if f_current.abs() <= axis.tolerance {
            return Ok(f_current);
        }

        let (mut a, mut b) = (axis.min, axis.max);
        let mut fa = self.evaluate(exec, axis, a)?;
        let mut fb = self.evaluate(exec, axis, b)?;
        if fa * fb > 0.0 {
            // No sign change within the bounds, keep the best value found
            let (x, fx) = [(current, f_current), (a, fa), (b, fb)]
                .into_iter()
                .fold((current, f_current), |best, cand| {
                    if cand.1.abs() < best.1.abs() {
                        cand
                    } else {
                        best
                    }
                });
            debug!(
                "{} has no root for {} in [{}, {}]",
                axis.state, axis.control, axis.min, axis.max
            );
            return self.evaluate(exec, axis, x).map(|_| fx);
        }

        let mut side = 0;
        let mut fx = f_current;
        for _ in 0..self.max_iterations {
            let x = if (fb - fa).abs() > f64::EPSILON {
                (a * fb - b * fa) / (fb - fa)
            } else {
                0.5 * (a + b)
            };
            fx = self.evaluate(exec, axis, x)?;
            if fx.abs() <= axis.tolerance || (b - a).abs() < 1e-12 {
                return Ok(fx);
            }
            if fx * fb > 0.0 {
                b = x;
                fb = fx;
                if side == -1 {
                    fa *= 0.5;
                }
                side = -1;
            } else {
                a = x;
                fa = fx;
                if side == 1 {
                    fb *= 0.5;
                }
                side = 1;
            }
        }
        Ok(fx)
    }

    fn report(&self, exec: &FdmExec, cycles: usize) -> Result<TrimReport, FdmError> {
        let axes = self
            .axes
            .iter()
            .map(|axis| {
                Ok(AxisReport {
                    state: axis.state,
                    control: axis.control.clone(),
                    control_value: axis.control.get(exec)?,
                    residual: exec.get_property_value(axis.state.property())?,
                    tolerance: axis.tolerance,
                })
            })
            .collect::<Result<Vec<_>, FdmError>>()?;
        let converged = axes.iter().all(AxisReport::converged);
        Ok(TrimReport {
            mode: self.mode.to_string(),
            converged,
            cycles,
            axes,
            failure: None,
        })
    }

    /// Runs the trim. The caller is responsible for restoring the simulation time.
    pub fn run(&mut self, exec: &mut FdmExec) -> Result<TrimReport, FdmError> {
        let unavailable = self
            .axes
            .iter()
            .filter(|axis| !axis.control.available(exec))
            .map(|axis| axis.control.to_string())
            .collect::<Vec<_>>();
        if !unavailable.is_empty() {
            debug!("dropping unavailable trim controls {unavailable:?}");
        }
        self.axes.retain(|axis| axis.control.available(exec));
        if self.axes.is_empty() {
            return TrimFailedSnafu {
                mode: self.mode.to_string(),
                reason: "no trim control is available on this vehicle".to_string(),
            }
            .fail();
        }
        if let Some(axis) = self
            .axes
            .iter()
            .find(|a| a.min.partial_cmp(&a.max) != Some(Ordering::Less))
        {
            return TrimFailedSnafu {
                mode: self.mode.to_string(),
                reason: format!("empty bounds for {}", axis.control),
            }
            .fail();
        }

        let axes = self.axes.clone();
        let mut previous: Option<Vec<f64>> = None;
        for cycle in 1..=self.max_cycles {
            for axis in &axes {
                self.solve_axis(exec, axis)?;
            }
            exec.run_ic()?;
            let mut report = self.report(exec, cycle)?;
            let residuals = report.axes.iter().map(|a| a.residual).collect::<Vec<_>>();
            trace!("trim cycle {cycle}: {residuals:?}");
            if report.converged {
                return Ok(report);
            }
            let stalled = previous.as_ref().is_some_and(|prev| {
                prev.iter()
                    .zip(&residuals)
                    .all(|(a, b)| (a - b).abs() <= 1e-12 * a.abs().max(1.0))
            });
            if stalled {
                report.failure = Some(format!("no progress after {cycle} cycles"));
                return Ok(report);
            }
            previous = Some(residuals);
        }
        let mut report = self.report(exec, self.max_cycles)?;
        report.failure = Some(format!("not converged after {} cycles", self.max_cycles));
        Ok(report)
    }

    /// Reports the residual of every state derivative, trimmed or not.
    pub fn residuals(exec: &FdmExec) -> Vec<(TrimState, f64)> {
        all::<TrimState>()
            .map(|state| {
                (
                    state,
                    exec.get_property_value(state.property()).unwrap_or(f64::NAN),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod ut_trim {
    use super::*;
    use enum_iterator::cardinality;

    #[test]
    fn standard_axes() {
        assert_eq!(TrimMode::Longitudinal.axes().len(), 3);
        assert_eq!(TrimMode::Full.axes().len(), 6);
        let ground = TrimMode::Ground.axes();
        assert_eq!(ground[0].control, TrimControl::AltitudeAgl);
        assert_eq!(cardinality::<TrimState>(), 6);
        assert!(TrimMode::Full
            .axes()
            .iter()
            .all(|axis| axis.min < axis.max && axis.tolerance > 0.0));
    }

    #[test]
    fn report_display() {
        let report = TrimReport {
            mode: TrimMode::Longitudinal.to_string(),
            converged: true,
            cycles: 2,
            axes: vec![AxisReport {
                state: TrimState::Wdot,
                control: TrimControl::Alpha,
                control_value: 0.05,
                residual: 1e-5,
                tolerance: 1e-3,
            }],
            failure: None,
        };
        let text = report.to_string();
        assert!(text.starts_with("Longitudinal trim converged after 2 cycles"));
        assert!(text.contains("Wdot"));
        let failed = TrimReport::failed(&TrimMode::Custom(vec![]), "boom".to_string());
        assert_eq!(failed.to_string(), "Custom (0 axes) trim failed after 0 cycles: boom");
    }
}
