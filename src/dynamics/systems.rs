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

use super::{Model, ModelBase, ModelError, ModelKind, ModelPropertySnafu};
use crate::io::aircraft::{ComponentConfig, ComponentKind, Comparison, Operand, SystemConfig};
use crate::props::{PropertyError, PropertyManager, PropertyNode, Shared};
use crate::utils::constrain;
use snafu::ResultExt;

/// The pilot commands every aircraft exposes, whether or not a system reads them.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PilotCommands {
    pub aileron: f64,
    pub elevator: f64,
    pub rudder: f64,
    pub pitch_trim: f64,
    pub roll_trim: f64,
    pub yaw_trim: f64,
}

/// Either a constant or a property, optionally negated.
#[derive(Clone, Debug)]
enum Source {
    Constant(f64),
    Node { node: PropertyNode, sign: f64 },
}

impl Source {
    fn property(pm: &PropertyManager, path: &str) -> Result<Self, PropertyError> {
        let (sign, path) = match path.strip_prefix('-') {
            Some(stripped) => (-1.0, stripped),
            None => (1.0, path),
        };
        let node = pm.get_node(path, true)?;
        if !node.has_value() {
            node.set_f64(0.0)?;
        }
        Ok(Self::Node { node, sign })
    }

    fn operand(pm: &PropertyManager, operand: &Operand) -> Result<Self, PropertyError> {
        match operand {
            Operand::Value(v) => Ok(Self::Constant(*v)),
            Operand::Property(path) => Self::property(pm, path),
        }
    }

    fn value(&self) -> Result<f64, PropertyError> {
        match self {
            Self::Constant(v) => Ok(*v),
            Self::Node { node, sign } => Ok(sign * node.get_f64()?),
        }
    }
}

#[derive(Clone, Debug)]
struct SwitchTest {
    input: Source,
    op: Comparison,
    value: f64,
    output: Source,
}

#[derive(Clone, Debug)]
enum Element {
    Gain {
        input: Source,
        gain: Source,
    },
    Summer {
        inputs: Vec<Source>,
        bias: f64,
    },
    /// First order lag `c1 / (s + c1)`, discretised with the Tustin transform
    Lag {
        input: Source,
        c1: f64,
        last_input: f64,
        last_output: f64,
    },
    Switch {
        tests: Vec<SwitchTest>,
        default: Source,
    },
}

#[derive(Clone, Debug)]
struct Component {
    name: String,
    element: Element,
    clip: Option<(Source, Source)>,
    outputs: Vec<PropertyNode>,
}

impl Component {
    fn new(pm: &PropertyManager, cfg: &ComponentConfig) -> Result<Self, PropertyError> {
        let element = match &cfg.kind {
            ComponentKind::Gain { input, gain } => Element::Gain {
                input: Source::property(pm, input)?,
                gain: Source::operand(pm, gain)?,
            },
            ComponentKind::Summer { inputs, bias } => Element::Summer {
                inputs: inputs
                    .iter()
                    .map(|path| Source::property(pm, path))
                    .collect::<Result<Vec<_>, _>>()?,
                bias: *bias,
            },
            ComponentKind::Lag { input, c1 } => Element::Lag {
                input: Source::property(pm, input)?,
                c1: *c1,
                last_input: 0.0,
                last_output: 0.0,
            },
            ComponentKind::Switch { tests, default } => Element::Switch {
                tests: tests
                    .iter()
                    .map(|t| {
                        Ok(SwitchTest {
                            input: Source::property(pm, &t.property)?,
                            op: t.op,
                            value: t.value,
                            output: Source::operand(pm, &t.output)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PropertyError>>()?,
                default: Source::operand(pm, default)?,
            },
        };
        let clip = match &cfg.clip {
            Some(clip) => Some((
                Source::operand(pm, &clip.min)?,
                Source::operand(pm, &clip.max)?,
            )),
            None => None,
        };

        let path = if cfg.name.contains('/') {
            cfg.name.clone()
        } else {
            format!("fcs/{}", cfg.name)
        };
        let mut outputs = vec![pm.get_node(&path, true)?];
        if let Some(extra) = &cfg.output {
            outputs.push(pm.get_node(extra, true)?);
        }
        for node in &outputs {
            if !node.has_value() {
                node.set_f64(0.0)?;
            }
        }

        Ok(Self {
            name: cfg.name.clone(),
            element,
            clip,
            outputs,
        })
    }

    fn run(&mut self, dt: f64) -> Result<f64, PropertyError> {
        let mut output = match &mut self.element {
            Element::Gain { input, gain } => input.value()? * gain.value()?,
            Element::Summer { inputs, bias } => {
                let mut sum = *bias;
                for input in inputs.iter() {
                    sum += input.value()?;
                }
                sum
            }
            Element::Lag {
                input,
                c1,
                last_input,
                last_output,
            } => {
                let u = input.value()?;
                let denom = 2.0 + dt * *c1;
                let ca = dt * *c1 / denom;
                let cb = (2.0 - dt * *c1) / denom;
                let y = ca * (u + *last_input) + cb * *last_output;
                *last_input = u;
                *last_output = y;
                y
            }
            Element::Switch { tests, default } => {
                let mut selected = None;
                for test in tests.iter() {
                    if test.op.test(test.input.value()?, test.value) {
                        selected = Some(test.output.value()?);
                        break;
                    }
                }
                match selected {
                    Some(v) => v,
                    None => default.value()?,
                }
            }
        };
        if let Some((min, max)) = &self.clip {
            output = constrain(min.value()?, output, max.value()?);
        }
        for node in &self.outputs {
            node.set_f64(output)?;
        }
        Ok(output)
    }

    fn reset(&mut self) {
        if let Element::Lag {
            last_input,
            last_output,
            ..
        } = &mut self.element
        {
            *last_input = 0.0;
            *last_output = 0.0;
        }
    }
}

#[derive(Clone, Debug)]
struct Channel {
    name: String,
    components: Vec<Component>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SystemsInputs {
    pub dt: f64,
}

/// Flight control and autopilot channels. Components run in the order they are declared.
#[derive(Debug)]
pub struct Systems {
    base: ModelBase,
    pub inputs: SystemsInputs,
    pm: PropertyManager,
    systems: Vec<String>,
    channels: Vec<Channel>,
    commands: Shared<PilotCommands>,
}

impl Systems {
    pub fn new(pm: PropertyManager) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: SystemsInputs::default(),
            pm,
            systems: Vec::new(),
            channels: Vec::new(),
            commands: Shared::new(PilotCommands::default()),
        }
    }

    /// Builds the channels of a system, resolving every property it reads or writes.
    pub fn load(&mut self, cfg: &SystemConfig) -> Result<(), ModelError> {
        for channel in &cfg.channels {
            let components = channel
                .components
                .iter()
                .map(|c| Component::new(&self.pm, c))
                .collect::<Result<Vec<_>, _>>()
                .context(ModelPropertySnafu)?;
            debug!(
                "system {}: channel {} with {} components",
                cfg.name,
                channel.name,
                components.len()
            );
            self.channels.push(Channel {
                name: channel.name.clone(),
                components,
            });
        }
        self.systems.push(cfg.name.clone());
        Ok(())
    }

    pub fn system_names(&self) -> &[String] {
        &self.systems
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn commands(&self) -> PilotCommands {
        *self.commands.read()
    }
}

impl Model for Systems {
    fn kind(&self) -> ModelKind {
        ModelKind::Systems
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        for channel in &mut self.channels {
            for component in &mut channel.components {
                component.reset();
            }
        }
        Ok(())
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding {
            return Ok(());
        }
        let dt = self.inputs.dt;
        for channel in &mut self.channels {
            for component in &mut channel.components {
                let output = component.run(dt).context(ModelPropertySnafu)?;
                trace!("{}/{} = {output}", channel.name, component.name);
            }
        }
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.systems.clear();
        self.channels.clear();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.commands;
        pm.tie_shared(
            "fcs/aileron-cmd-norm",
            s,
            |s| s.aileron,
            Some(|s: &mut PilotCommands, v: f64| s.aileron = v),
        )?;
        pm.tie_shared(
            "fcs/elevator-cmd-norm",
            s,
            |s| s.elevator,
            Some(|s: &mut PilotCommands, v: f64| s.elevator = v),
        )?;
        pm.tie_shared(
            "fcs/rudder-cmd-norm",
            s,
            |s| s.rudder,
            Some(|s: &mut PilotCommands, v: f64| s.rudder = v),
        )?;
        pm.tie_shared(
            "fcs/pitch-trim-cmd-norm",
            s,
            |s| s.pitch_trim,
            Some(|s: &mut PilotCommands, v: f64| s.pitch_trim = v),
        )?;
        pm.tie_shared(
            "fcs/roll-trim-cmd-norm",
            s,
            |s| s.roll_trim,
            Some(|s: &mut PilotCommands, v: f64| s.roll_trim = v),
        )?;
        pm.tie_shared(
            "fcs/yaw-trim-cmd-norm",
            s,
            |s| s.yaw_trim,
            Some(|s: &mut PilotCommands, v: f64| s.yaw_trim = v),
        )?;
        Ok(())
    }

    fn rate(&self) -> u32 {
        self.base.rate()
    }

    fn set_rate(&mut self, rate: u32) {
        self.base.set_rate(rate);
    }
}
