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

use crate::dynamics::force::ForceFrames;
use crate::dynamics::input::InputCommand;
use crate::dynamics::{
    validate_schedule, Accelerations, Aerodynamics, Aircraft, Atmosphere, Auxiliary,
    GroundReactions, Inertial, Input, MassBalance, Model, ModelKind, Output, Propagate,
    Propulsion, Systems,
};
use crate::earth::{DefaultGroundCallback, GroundCallback};
use crate::errors::{
    AircraftNotFoundSnafu, FdmConfigSnafu, FdmError, FdmLocationSnafu, FdmModelSnafu,
    FdmPropertySnafu, NoModelsSnafu, SlaveSnafu,
};
use crate::io::aircraft::{
    EngineConfig, EngineRef, SlaveConfig, SystemConfig, SystemRef, PRODUCTION_RELEASE,
    REQUIRED_VERSION,
};
use crate::io::{AircraftConfig, ConfigError, ConfigRepr, InitialConditionConfig, LoaderOptions};
use crate::linalg::Vector3;
use crate::props::{PropertyManager, PropertyValue, Shared, TreeSnapshot};
use crate::utils::dcm_321;
use enum_iterator::all;
use rand_pcg::Pcg64Mcg;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// The initial condition of the vehicle.
pub mod ic;
pub use self::ic::InitialCondition;

/// Trimming of the vehicle into a steady condition.
pub mod trim;
pub use self::trim::{Trim, TrimAxis, TrimControl, TrimMode, TrimReport, TrimState};

/// Default integration step, s
pub const DEFAULT_DT: f64 = 1.0 / 120.0;

/// Slaves log their lifecycle at debug level, the master at info level.
macro_rules! lifecycle {
    ($exec:expr, $($arg:tt)+) => {
        if $exec.is_slave {
            debug!($($arg)+)
        } else {
            info!($($arg)+)
        }
    };
}

/// Simulation clock and run state, exposed under `simulation/`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExecState {
    pub sim_time: f64,
    pub dt: f64,
    /// Step restored when integration resumes
    pub saved_dt: f64,
    pub holding: bool,
    pub frame: i64,
    pub terminate: bool,
}

impl Default for ExecState {
    fn default() -> Self {
        Self {
            sim_time: 0.0,
            dt: DEFAULT_DT,
            saved_dt: DEFAULT_DT,
            holding: false,
            frame: 0,
            terminate: false,
        }
    }
}

/// A secondary executive stepped by its master.
#[derive(Debug)]
pub struct SlaveFdm {
    pub name: String,
    /// Attachment point in the structural frame of the master, inches
    pub location: Vector3<f64>,
    pub exec: FdmExec,
}

/// The simulation executive.
///
/// Owns the standard models and runs them in their declared order, the property tree through
/// which they communicate, the initial condition, and any slave executives.
///
/// ```no_run
/// use gyre::FdmExec;
///
/// let mut fdm = FdmExec::new().unwrap();
/// fdm.set_root_dir("data");
/// fdm.load_model("ball").unwrap();
/// fdm.load_ic("reset00").unwrap();
/// fdm.run_ic().unwrap();
/// while fdm.sim_time() < 10.0 && fdm.run().unwrap() {}
/// ```
#[derive(Debug)]
pub struct FdmExec {
    pm: PropertyManager,
    options: LoaderOptions,
    state: Shared<ExecState>,
    ground: Shared<Box<dyn GroundCallback>>,
    schedule: Vec<ModelKind>,

    propagate: Propagate,
    input: Input,
    inertial: Inertial,
    atmosphere: Atmosphere,
    systems: Systems,
    mass_balance: MassBalance,
    auxiliary: Auxiliary,
    propulsion: Propulsion,
    aerodynamics: Aerodynamics,
    ground_reactions: GroundReactions,
    aircraft: Aircraft,
    accelerations: Accelerations,
    output: Output,

    ic: InitialCondition,
    slaves: Vec<SlaveFdm>,
    is_slave: bool,
    trimming: bool,
    model_loaded: bool,
    init_errors: u32,
    init_error_mask: u32,

    root_dir: PathBuf,
    aircraft_path: PathBuf,
    engine_path: PathBuf,
    systems_path: PathBuf,
    /// Directory of the loaded aircraft document
    model_dir: Option<PathBuf>,
}

impl FdmExec {
    pub fn new() -> Result<Self, FdmError> {
        Self::with_options(LoaderOptions::default())
    }

    pub fn with_options(options: LoaderOptions) -> Result<Self, FdmError> {
        Self::build(options, false)
    }

    fn build(options: LoaderOptions, is_slave: bool) -> Result<Self, FdmError> {
        let pm = PropertyManager::new();
        let ground: Shared<Box<dyn GroundCallback>> =
            Shared::new(Box::new(DefaultGroundCallback::wgs84()));
        // Gravity and the ground callback are needed by the other models
        let inertial = Inertial::new(ground.clone());
        let atmosphere = Atmosphere::new();
        let ic = InitialCondition::new(atmosphere.state().clone(), ground.clone());

        let mut exec = Self {
            propagate: Propagate::new(ground.clone()),
            input: Input::new(pm.clone()),
            inertial,
            atmosphere,
            systems: Systems::new(pm.clone()),
            mass_balance: MassBalance::new(pm.clone()),
            auxiliary: Auxiliary::new(),
            propulsion: Propulsion::new(pm.clone()),
            aerodynamics: Aerodynamics::new(pm.clone()),
            ground_reactions: GroundReactions::new(pm.clone(), ground.clone()),
            aircraft: Aircraft::new(),
            accelerations: Accelerations::new(),
            output: Output::new(pm.clone()),
            pm,
            options,
            state: Shared::new(ExecState::default()),
            ground,
            schedule: all::<ModelKind>().collect(),
            ic,
            slaves: Vec::new(),
            is_slave,
            trimming: false,
            model_loaded: false,
            init_errors: 0,
            init_error_mask: 0,
            root_dir: PathBuf::from("."),
            aircraft_path: PathBuf::from("aircraft"),
            engine_path: PathBuf::from("engine"),
            systems_path: PathBuf::from("systems"),
            model_dir: None,
        };
        validate_schedule(&exec.schedule)?;

        for kind in exec.schedule.clone() {
            exec.model(kind).bind(&exec.pm).context(FdmPropertySnafu)?;
        }
        exec.bind().context(FdmPropertySnafu)?;

        for kind in exec.schedule.clone() {
            if !kind.initialised_at_construction() {
                continue;
            }
            if let Err(e) = exec.model_mut(kind).init_model() {
                error!("{kind} failed to initialize: {e}");
                exec.init_errors += 1;
                exec.init_error_mask |= kind.mask();
            }
        }

        exec.ic.bind(&exec.pm).context(FdmPropertySnafu)?;
        lifecycle!(exec, "executive ready with {} models", exec.schedule.len());
        Ok(exec)
    }

    fn bind(&self) -> Result<(), crate::props::PropertyError> {
        let s = &self.state;
        self.pm
            .tie_shared("simulation/sim-time-sec", s, |s| s.sim_time, None)?;
        self.pm.tie_shared(
            "simulation/dt",
            s,
            |s| s.dt,
            Some(|s: &mut ExecState, v: f64| s.dt = v.max(0.0)),
        )?;
        self.pm.tie_shared("simulation/frame", s, |s| s.frame, None)?;
        self.pm.tie_shared(
            "simulation/holding",
            s,
            |s| s.holding,
            Some(|s: &mut ExecState, v: bool| s.holding = v),
        )?;
        self.pm.tie_shared(
            "simulation/terminate",
            s,
            |s| s.terminate,
            Some(|s: &mut ExecState, v: bool| s.terminate = v),
        )?;
        Ok(())
    }

    fn model(&self, kind: ModelKind) -> &dyn Model {
        match kind {
            ModelKind::Propagate => &self.propagate,
            ModelKind::Input => &self.input,
            ModelKind::Inertial => &self.inertial,
            ModelKind::Atmosphere => &self.atmosphere,
            ModelKind::Systems => &self.systems,
            ModelKind::MassBalance => &self.mass_balance,
            ModelKind::Auxiliary => &self.auxiliary,
            ModelKind::Propulsion => &self.propulsion,
            ModelKind::Aerodynamics => &self.aerodynamics,
            ModelKind::GroundReactions => &self.ground_reactions,
            ModelKind::Aircraft => &self.aircraft,
            ModelKind::Accelerations => &self.accelerations,
            ModelKind::Output => &self.output,
        }
    }

    fn model_mut(&mut self, kind: ModelKind) -> &mut dyn Model {
        match kind {
            ModelKind::Propagate => &mut self.propagate,
            ModelKind::Input => &mut self.input,
            ModelKind::Inertial => &mut self.inertial,
            ModelKind::Atmosphere => &mut self.atmosphere,
            ModelKind::Systems => &mut self.systems,
            ModelKind::MassBalance => &mut self.mass_balance,
            ModelKind::Auxiliary => &mut self.auxiliary,
            ModelKind::Propulsion => &mut self.propulsion,
            ModelKind::Aerodynamics => &mut self.aerodynamics,
            ModelKind::GroundReactions => &mut self.ground_reactions,
            ModelKind::Aircraft => &mut self.aircraft,
            ModelKind::Accelerations => &mut self.accelerations,
            ModelKind::Output => &mut self.output,
        }
    }

    fn frames(&self) -> ForceFrames {
        ForceFrames {
            tw2b: self.auxiliary.tw2b(),
            tl2b: self.propagate.tl2b(),
            cg: self.mass_balance.cg(),
        }
    }

    /// Copies the outputs of the models which already ran into the inputs of `kind`.
    fn load_inputs(&mut self, kind: ModelKind) {
        let clock = *self.state.read();
        match kind {
            ModelKind::Propagate => {
                let inputs = &mut self.propagate.inputs;
                inputs.dt = clock.dt;
                inputs.sim_time = clock.sim_time;
                inputs.omega_earth = self.inertial.omega();
                inputs.accel_ecef = self.accelerations.accel_ecef();
                inputs.pqr_i_dot = self.accelerations.pqr_i_dot();
            }
            ModelKind::Input => {}
            ModelKind::Inertial => {
                self.inertial.inputs.location = self.propagate.location();
                self.inertial.inputs.sim_time = clock.sim_time;
            }
            ModelKind::Atmosphere => {
                self.atmosphere.inputs.altitude_asl = self.propagate.state().read().altitude_asl;
            }
            ModelKind::Systems => {
                self.systems.inputs.dt = clock.dt;
            }
            ModelKind::MassBalance => {}
            ModelKind::Auxiliary => {
                let vehicle = self.propagate.state().read();
                let atmosphere = self.atmosphere.state().read();
                let metrics = self.aircraft.metrics();
                let inputs = &mut self.auxiliary.inputs;
                inputs.uvw = vehicle.uvw;
                inputs.pqr = vehicle.pqr;
                inputs.v_ned = vehicle.v_ned;
                inputs.tl2b = vehicle.tl2b;
                inputs.wind_ned = atmosphere.wind_ned;
                inputs.atmosphere = atmosphere.current;
                inputs.sea_level = atmosphere.sea_level;
                inputs.wingspan = metrics.wing_span;
                inputs.chord = metrics.chord;
            }
            ModelKind::Propulsion => {
                self.propulsion.inputs.frames = self.frames();
            }
            ModelKind::Aerodynamics => {
                self.aerodynamics.inputs.frames = self.frames();
                self.aerodynamics.inputs.aero_rp = self.aircraft.metrics().aero_rp;
            }
            ModelKind::GroundReactions => {
                let frames = self.frames();
                let vehicle = self.propagate.state().read();
                let inputs = &mut self.ground_reactions.inputs;
                inputs.frames = frames;
                inputs.location = vehicle.location.clone();
                inputs.tb2l = vehicle.tb2l;
                inputs.v_ned = vehicle.v_ned;
                inputs.pqr = vehicle.pqr;
                inputs.sim_time = clock.sim_time;
            }
            ModelKind::Aircraft => {
                let inputs = &mut self.aircraft.inputs;
                inputs.aero_forces = self.aerodynamics.forces();
                inputs.aero_moments = self.aerodynamics.moments();
                inputs.propulsion_forces = self.propulsion.forces();
                inputs.propulsion_moments = self.propulsion.moments();
                inputs.gear_forces = self.ground_reactions.forces();
                inputs.gear_moments = self.ground_reactions.moments();
            }
            ModelKind::Accelerations => {
                let vehicle = self.propagate.state().read();
                let inputs = &mut self.accelerations.inputs;
                inputs.forces = self.aircraft.forces();
                inputs.moments = self.aircraft.moments();
                inputs.mass = self.mass_balance.mass();
                inputs.j = self.mass_balance.j();
                inputs.jinv = self.mass_balance.jinv();
                inputs.tb2ec = vehicle.tb2ec;
                inputs.tec2b = vehicle.tec2b;
                inputs.gravity_ecef = self.inertial.gravity_ecef();
                inputs.omega = self.inertial.omega();
                inputs.position_ecef = vehicle.location.ecef();
                inputs.v_ecef = vehicle.v_ecef;
                inputs.uvw = vehicle.uvw;
                inputs.pqr = vehicle.pqr;
                inputs.pqr_i = vehicle.pqr_i;
            }
            ModelKind::Output => {
                self.output.inputs.dt = clock.dt;
                self.output.inputs.sim_time = clock.sim_time;
            }
        }
    }

    /// Runs every scheduled model once, steps the slaves and advances the clock.
    fn step(&mut self, holding: bool) -> Result<(), FdmError> {
        for kind in self.schedule.clone() {
            self.load_inputs(kind);
            let hold = holding || (kind == ModelKind::Output && self.trimming);
            self.model_mut(kind)
                .run(hold)
                .context(FdmModelSnafu { kind })?;
        }

        let clock = *self.state.read();
        for slave in &mut self.slaves {
            {
                let mut state = slave.exec.state.write();
                state.dt = clock.dt;
                state.sim_time = clock.sim_time;
            }
            slave
                .exec
                .step(holding)
                .context(SlaveSnafu { name: &slave.name })?;
        }

        self.state.write().frame += 1;
        if !holding {
            self.increment_time();
        }
        Ok(())
    }

    /// Runs one frame. Returns `Ok(false)` once `simulation/terminate` is set.
    pub fn run(&mut self) -> Result<bool, FdmError> {
        ensure!(self.model_loaded, NoModelsSnafu);
        if self.state.read().terminate {
            return Ok(false);
        }
        let holding = self.holding();
        self.step(holding)?;
        Ok(!self.state.read().terminate)
    }

    /// Copies the initial condition into Propagate.
    pub fn initialize(&mut self) -> Result<(), FdmError> {
        self.propagate.inputs.omega_earth = self.inertial.omega();
        let initial = self.ic.initial_state().context(FdmLocationSnafu)?;
        self.propagate
            .set_initial_state(&initial)
            .context(FdmModelSnafu {
                kind: ModelKind::Propagate,
            })
    }

    /// Runs one frame from the initial condition without advancing time, so that every model
    /// output is consistent with it.
    pub fn run_ic(&mut self) -> Result<(), FdmError> {
        ensure!(self.model_loaded, NoModelsSnafu);
        self.suspend_integration();
        let result = self.initialize().and_then(|_| self.step(false));
        self.resume_integration();
        result?;
        self.propagate.initialize_derivatives(
            self.accelerations.accel_ecef(),
            self.accelerations.pqr_i_dot(),
        );
        self.run_slaves_ic()
    }

    /// Places each slave at its attachment point with the attitude and velocity of the master.
    fn run_slaves_ic(&mut self) -> Result<(), FdmError> {
        if self.slaves.is_empty() {
            return Ok(());
        }
        let master = self.ic.initial_state().context(FdmLocationSnafu)?;
        let tb2l = dcm_321(master.euler.x, master.euler.y, master.euler.z).transpose();
        let master_ic = self.ic.state();
        for slave in &mut self.slaves {
            let offset = tb2l * self.mass_balance.structural_to_body(&slave.location);
            let here = master.location.local_to_location(&offset);
            let slave_ic = slave.exec.ic();
            slave_ic.set_state(master_ic.clone());
            slave_ic.set_longitude(here.longitude());
            slave_ic.set_geod_latitude(here.geod_latitude_rad().context(FdmLocationSnafu)?);
            slave_ic.set_altitude_asl(here.geod_altitude().context(FdmLocationSnafu)?);
            slave
                .exec
                .run_ic()
                .context(SlaveSnafu { name: &slave.name })?;
        }
        Ok(())
    }

    /// Trims the vehicle, see [`Trim`]. The simulation time and frame are left unchanged. A
    /// failure is logged and reported, and the initial condition and controls are restored.
    pub fn do_trim(&mut self, mode: TrimMode) -> Result<TrimReport, FdmError> {
        ensure!(self.model_loaded, NoModelsSnafu);
        let clock = *self.state.read();
        let saved_ic = self.ic.state();
        let mut trim = Trim::new(mode.clone());
        let saved_controls = trim
            .axes()
            .iter()
            .map(|axis| (axis.control.clone(), axis.control.get(self)))
            .collect::<Vec<_>>();

        self.trimming = true;
        let outcome = trim.run(self);
        self.trimming = false;

        let report = match outcome {
            Ok(report) => report,
            Err(e) => TrimReport::failed(&mode, e.to_string()),
        };
        if report.converged {
            lifecycle!(self, "{report}");
        } else {
            error!("{report}");
            self.ic.set_state(saved_ic);
            for (control, value) in saved_controls {
                if let Ok(value) = value {
                    if let Err(e) = control.set(self, value) {
                        warn!("could not restore {control}: {e}");
                    }
                }
            }
            if let Err(e) = self.run_ic() {
                error!("could not reinitialize after the failed trim: {e}");
            }
        }

        let mut state = self.state.write();
        state.sim_time = clock.sim_time;
        state.frame = clock.frame;
        Ok(report)
    }

    pub fn hold(&self) {
        self.state.write().holding = true;
    }

    pub fn resume(&self) {
        self.state.write().holding = false;
    }

    pub fn holding(&self) -> bool {
        self.state.read().holding
    }

    /// Sets the step to zero, the previous step is restored by [`FdmExec::resume_integration`].
    pub fn suspend_integration(&self) {
        let mut state = self.state.write();
        if state.dt != 0.0 {
            state.saved_dt = state.dt;
        }
        state.dt = 0.0;
    }

    pub fn resume_integration(&self) {
        let mut state = self.state.write();
        state.dt = state.saved_dt;
    }

    pub fn integration_suspended(&self) -> bool {
        self.state.read().dt == 0.0
    }

    pub fn dt(&self) -> f64 {
        self.state.read().dt
    }

    pub fn set_dt(&self, dt: f64) {
        let mut state = self.state.write();
        state.dt = dt.max(0.0);
        state.saved_dt = state.dt;
    }

    pub fn sim_time(&self) -> f64 {
        self.state.read().sim_time
    }

    pub fn set_sim_time(&self, sim_time: f64) {
        self.state.write().sim_time = sim_time;
    }

    pub fn frame(&self) -> i64 {
        self.state.read().frame
    }

    /// Advances the clock by one step unless holding, returns the new time.
    pub fn increment_time(&self) -> f64 {
        let mut state = self.state.write();
        if !state.holding {
            state.sim_time += state.dt;
        }
        state.sim_time
    }

    pub fn terminate(&self) {
        self.state.write().terminate = true;
    }

    pub fn set_root_dir<P: AsRef<Path>>(&mut self, root_dir: P) {
        self.root_dir = root_dir.as_ref().to_path_buf();
        self.output.set_root_dir(self.root_dir.clone());
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory of the aircraft, relative to the root directory unless absolute.
    pub fn set_aircraft_path<P: AsRef<Path>>(&mut self, path: P) {
        self.aircraft_path = path.as_ref().to_path_buf();
    }

    pub fn set_engine_path<P: AsRef<Path>>(&mut self, path: P) {
        self.engine_path = path.as_ref().to_path_buf();
    }

    pub fn set_systems_path<P: AsRef<Path>>(&mut self, path: P) {
        self.systems_path = path.as_ref().to_path_buf();
    }

    pub fn aircraft_path(&self) -> PathBuf {
        self.root_dir.join(&self.aircraft_path)
    }

    pub fn engine_path(&self) -> PathBuf {
        self.root_dir.join(&self.engine_path)
    }

    pub fn systems_path(&self) -> PathBuf {
        self.root_dir.join(&self.systems_path)
    }

    /// Loads `<aircraft path>/<name>/<name>.yaml`.
    pub fn load_model(&mut self, name: &str) -> Result<(), FdmError> {
        let path = self.aircraft_path().join(name).join(format!("{name}.yaml"));
        self.load_model_from_path(path)
    }

    pub fn load_model_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FdmError> {
        let path = path.as_ref();
        if !path.exists() {
            error!("no aircraft document at {}", path.display());
            return AircraftNotFoundSnafu {
                path: path.to_path_buf(),
            }
            .fail();
        }
        let cfg = AircraftConfig::load(path).context(FdmConfigSnafu {
            what: path.display().to_string(),
        });
        let cfg = match cfg {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("{e}");
                return Err(e);
            }
        };
        self.model_dir = path.parent().map(Path::to_path_buf);
        self.load_model_config(cfg)
    }

    /// Loads an aircraft document. Unknown sections, a version mismatch and a release other than
    /// PRODUCTION are warnings. Any other problem aborts the load.
    ///
    /// An aborted load leaves the executive as it was before the call, so that a corrected
    /// document can be loaded next.
    pub fn load_model_config(&mut self, cfg: AircraftConfig) -> Result<(), FdmError> {
        if self.model_loaded {
            let e = ConfigError::InvalidConfig {
                reason: format!(
                    "{} is already loaded in this executive",
                    self.aircraft.name()
                ),
            };
            error!("loading aircraft {} refused: {e}", cfg.name);
            return Err(e).context(FdmConfigSnafu { what: &cfg.name });
        }

        let snapshot = self.pm.snapshot();
        match self.read_aircraft(&cfg) {
            Ok(()) => {
                self.model_loaded = true;
                lifecycle!(self, "loaded aircraft {}", cfg.name);
                Ok(())
            }
            Err(e) => {
                error!("loading aircraft {} aborted: {e}", cfg.name);
                self.unload(&snapshot);
                Err(e)
            }
        }
    }

    /// Releases everything an aborted load configured: the properties it created or tied, the
    /// configuration of every model, and the slaves.
    fn unload(&mut self, snapshot: &TreeSnapshot) {
        let removed = self.pm.restore(snapshot);
        for kind in self.schedule.clone() {
            self.model_mut(kind).unload();
        }
        self.slaves.clear();
        self.model_dir = None;
        debug!("released {removed} properties of the aborted load");
    }

    fn read_aircraft(&mut self, cfg: &AircraftConfig) -> Result<(), FdmError> {
        if let Some(header) = &cfg.fileheader {
            debug!("file header: {header:?}");
        }
        self.aircraft.set_name(&cfg.name);
        if cfg.version != REQUIRED_VERSION {
            warn!(
                "{} uses configuration version `{}`, this executive reads version {REQUIRED_VERSION}",
                cfg.name, cfg.version
            );
        }
        if cfg.release != PRODUCTION_RELEASE {
            warn!(
                "{} is released as `{}`, it may not be a mature model",
                cfg.name, cfg.release
            );
        }
        for key in cfg.unknown.keys() {
            warn!("ignoring unknown section `{key}` of {}", cfg.name);
        }

        let mut rng = self.options.rng();

        for slave in &cfg.slave {
            self.add_slave(slave)?;
        }
        if let Some(metrics) = &cfg.metrics {
            self.aircraft.load(metrics);
        }
        if let Some(mass_balance) = &cfg.mass_balance {
            self.mass_balance
                .load(mass_balance, rng.as_mut())
                .context(FdmModelSnafu {
                    kind: ModelKind::MassBalance,
                })?;
        }
        if let Some(ground_reactions) = &cfg.ground_reactions {
            self.ground_reactions
                .load(ground_reactions)
                .context(FdmModelSnafu {
                    kind: ModelKind::GroundReactions,
                })?;
        }
        if let Some(propulsion) = &cfg.propulsion {
            for engine in &propulsion.engines {
                self.add_engine(engine, rng.as_mut())?;
            }
        }
        let systems = cfg
            .system
            .iter()
            .chain(cfg.autopilot.iter())
            .chain(cfg.flight_control.iter());
        for system in systems {
            let system = self.resolve_system(system)?;
            self.systems.load(&system).context(FdmModelSnafu {
                kind: ModelKind::Systems,
            })?;
        }
        if let Some(aerodynamics) = &cfg.aerodynamics {
            self.aerodynamics
                .load(aerodynamics, rng.as_mut())
                .context(FdmModelSnafu {
                    kind: ModelKind::Aerodynamics,
                })?;
        }
        if let Some(input) = &cfg.input {
            self.input.configure(input);
        }
        for output in &cfg.output {
            self.output.add_channel(output);
        }

        for kind in [ModelKind::Input, ModelKind::Output] {
            self.model_mut(kind)
                .init_model()
                .context(FdmModelSnafu { kind })?;
        }
        Ok(())
    }

    /// Looks a document up in the directory of the aircraft first, then in the shared directory.
    fn find_document(&self, subdir: &str, shared: PathBuf, file: &str) -> PathBuf {
        let file = format!("{file}.yaml");
        self.model_dir
            .as_ref()
            .map(|dir| dir.join(subdir).join(&file))
            .filter(|path| path.exists())
            .unwrap_or_else(|| shared.join(&file))
    }

    fn add_engine(
        &mut self,
        engine: &EngineRef,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), FdmError> {
        let cfg = match engine {
            EngineRef::Inline(cfg) => cfg.clone(),
            EngineRef::File {
                file,
                location,
                orientation,
            } => {
                let path = self.find_document("engine", self.engine_path(), file);
                let mut cfg = EngineConfig::load(&path).context(FdmConfigSnafu {
                    what: path.display().to_string(),
                })?;
                if let Some(location) = location {
                    cfg.location = *location;
                }
                if let Some(orientation) = orientation {
                    cfg.orientation = *orientation;
                }
                cfg
            }
        };
        self.propulsion
            .add_thruster(&cfg, rng)
            .context(FdmModelSnafu {
                kind: ModelKind::Propulsion,
            })
    }

    fn resolve_system(&self, system: &SystemRef) -> Result<SystemConfig, FdmError> {
        match system {
            SystemRef::Inline(cfg) => Ok(cfg.clone()),
            SystemRef::File { file } => {
                let path = self.find_document("systems", self.systems_path(), file);
                SystemConfig::load(&path).context(FdmConfigSnafu {
                    what: path.display().to_string(),
                })
            }
        }
    }

    fn add_slave(&mut self, cfg: &SlaveConfig) -> Result<(), FdmError> {
        let mut exec = Self::build(self.options, true)?;
        exec.root_dir = self.root_dir.clone();
        exec.aircraft_path = self.aircraft_path.clone();
        exec.engine_path = self.engine_path.clone();
        exec.systems_path = self.systems_path.clone();
        exec.output.set_root_dir(self.root_dir.clone());
        exec.set_dt(self.dt());
        exec.load_model(&cfg.file)
            .context(SlaveSnafu { name: &cfg.file })?;
        debug!("attached slave {}", cfg.file);
        self.slaves.push(SlaveFdm {
            name: cfg.file.clone(),
            location: cfg.location.map(Vector3::from).unwrap_or_else(Vector3::zeros),
            exec,
        });
        Ok(())
    }

    /// Loads `<name>.yaml` from the directory of the loaded aircraft.
    pub fn load_ic(&mut self, name: &str) -> Result<(), FdmError> {
        let dir = self
            .model_dir
            .clone()
            .unwrap_or_else(|| self.aircraft_path().join(self.aircraft.name()));
        let path = dir.join(format!("{name}.yaml"));
        let cfg = InitialConditionConfig::load(&path).context(FdmConfigSnafu {
            what: path.display().to_string(),
        })?;
        self.set_ic(&cfg);
        Ok(())
    }

    pub fn set_ic(&mut self, cfg: &InitialConditionConfig) {
        self.ic.apply(cfg);
    }

    pub fn ic(&self) -> &InitialCondition {
        &self.ic
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn is_slave(&self) -> bool {
        self.is_slave
    }

    pub fn slaves(&self) -> &[SlaveFdm] {
        &self.slaves
    }

    /// Number of models which failed to initialize at construction.
    pub fn init_errors(&self) -> u32 {
        self.init_errors
    }

    /// The [`ModelKind::mask`] of every model which failed to initialize.
    pub fn init_error_mask(&self) -> u32 {
        self.init_error_mask
    }

    pub fn schedule(&self) -> &[ModelKind] {
        &self.schedule
    }

    pub fn set_model_rate(&mut self, kind: ModelKind, rate: u32) {
        self.model_mut(kind).set_rate(rate);
    }

    pub fn properties(&self) -> &PropertyManager {
        &self.pm
    }

    pub fn property_catalog(&self) -> Vec<String> {
        self.pm.catalog()
    }

    pub fn query_property_catalog(&self, pattern: &str) -> Vec<String> {
        self.pm.query(pattern)
    }

    pub fn get_property_value(&self, path: &str) -> Result<f64, FdmError> {
        self.pm.get_f64(path).context(FdmPropertySnafu)
    }

    /// Sets a numeric property. The value is converted to the type the property is tied as.
    pub fn set_property_value(&self, path: &str, value: f64) -> Result<(), FdmError> {
        let node = self.pm.get_node(path, true).context(FdmPropertySnafu)?;
        let value = match node.kind() {
            Some(crate::props::PropertyKind::Bool) => PropertyValue::Bool(value != 0.0),
            Some(crate::props::PropertyKind::Int16) => PropertyValue::Int16(value.round() as i16),
            Some(crate::props::PropertyKind::Int32) => PropertyValue::Int32(value.round() as i32),
            Some(crate::props::PropertyKind::Int64) => PropertyValue::Int64(value.round() as i64),
            _ => PropertyValue::Double(value),
        };
        node.set_value(value).context(FdmPropertySnafu)
    }

    /// A handle to send property commands to the Input model.
    pub fn input_sender(&self) -> Sender<InputCommand> {
        self.input.sender()
    }

    pub fn ground_callback(&self) -> &Shared<Box<dyn GroundCallback>> {
        &self.ground
    }

    /// Replaces the terrain model. The vehicle location switches to the ellipsoid of the new
    /// callback immediately.
    pub fn set_ground_callback(
        &mut self,
        callback: Box<dyn GroundCallback>,
    ) -> Result<(), FdmError> {
        self.inertial.set_ground_callback(callback);
        self.propagate
            .refresh_ellipsoid()
            .context(FdmModelSnafu {
                kind: ModelKind::Propagate,
            })
    }

    pub fn propagate(&self) -> &Propagate {
        &self.propagate
    }

    pub fn propagate_mut(&mut self) -> &mut Propagate {
        &mut self.propagate
    }

    pub fn inertial(&self) -> &Inertial {
        &self.inertial
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    pub fn atmosphere_mut(&mut self) -> &mut Atmosphere {
        &mut self.atmosphere
    }

    pub fn systems(&self) -> &Systems {
        &self.systems
    }

    pub fn mass_balance(&self) -> &MassBalance {
        &self.mass_balance
    }

    pub fn auxiliary(&self) -> &Auxiliary {
        &self.auxiliary
    }

    pub fn propulsion(&self) -> &Propulsion {
        &self.propulsion
    }

    pub fn propulsion_mut(&mut self) -> &mut Propulsion {
        &mut self.propulsion
    }

    pub fn aerodynamics(&self) -> &Aerodynamics {
        &self.aerodynamics
    }

    pub fn ground_reactions(&self) -> &GroundReactions {
        &self.ground_reactions
    }

    pub fn aircraft(&self) -> &Aircraft {
        &self.aircraft
    }

    pub fn accelerations(&self) -> &Accelerations {
        &self.accelerations
    }

    pub fn output(&self) -> &Output {
        &self.output
    }
}
