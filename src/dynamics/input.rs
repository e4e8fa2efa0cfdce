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

use super::{Model, ModelBase, ModelError, ModelKind};
use crate::io::aircraft::InputConfig;
use crate::props::{PropertyError, PropertyManager, PropertyValue, Shared};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

/// A write of `value` to the property at `path`, applied at the start of the next frame.
#[derive(Clone, Debug, PartialEq)]
pub struct InputCommand {
    pub path: String,
    pub value: PropertyValue,
}

impl InputCommand {
    pub fn new<V: Into<PropertyValue>>(path: &str, value: V) -> Self {
        Self {
            path: path.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub enabled: bool,
    /// Commands applied since the model was initialised
    pub applied: i64,
    /// Commands which could not be applied since the model was initialised
    pub rejected: i64,
}

/// Applies the commands sent by the user to the property tree.
#[derive(Debug)]
pub struct Input {
    base: ModelBase,
    pm: PropertyManager,
    sender: Sender<InputCommand>,
    receiver: Receiver<InputCommand>,
    max_commands_per_frame: Option<usize>,
    state: Shared<InputState>,
}

impl Input {
    pub fn new(pm: PropertyManager) -> Self {
        let (sender, receiver) = channel();
        Self {
            base: ModelBase::new(),
            pm,
            sender,
            receiver,
            max_commands_per_frame: None,
            state: Shared::new(InputState {
                enabled: true,
                ..Default::default()
            }),
        }
    }

    /// A new handle to send commands to this model, which may be moved to another thread.
    pub fn sender(&self) -> Sender<InputCommand> {
        self.sender.clone()
    }

    pub fn configure(&mut self, cfg: &InputConfig) {
        self.max_commands_per_frame = cfg.max_commands_per_frame;
    }

    pub fn state(&self) -> InputState {
        *self.state.read()
    }

    fn apply(&self, cmd: InputCommand) {
        let result = self
            .pm
            .get_node(&cmd.path, true)
            .and_then(|node| node.set_value(cmd.value.clone()));
        let mut state = self.state.write();
        match result {
            Ok(()) => {
                trace!("input {} = {}", cmd.path, cmd.value);
                state.applied += 1;
            }
            Err(e) => {
                warn!("input command on {} rejected: {e}", cmd.path);
                state.rejected += 1;
            }
        }
    }
}

impl Model for Input {
    fn kind(&self) -> ModelKind {
        ModelKind::Input
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut state = self.state.write();
        state.applied = 0;
        state.rejected = 0;
        Ok(())
    }

    /// Commands are applied while holding, so that a held simulation can be reconfigured.
    fn run(&mut self, _holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || !self.state.read().enabled {
            return Ok(());
        }
        let budget = self.max_commands_per_frame.unwrap_or(usize::MAX);
        for _ in 0..budget {
            match self.receiver.try_recv() {
                Ok(cmd) => self.apply(cmd),
                // The model holds a sender, the channel cannot disconnect
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn unload(&mut self) {
        self.base.reset();
        self.max_commands_per_frame = None;
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        let s = &self.state;
        pm.tie_shared(
            "simulation/input/enabled",
            s,
            |s| s.enabled,
            Some(|s: &mut InputState, v: bool| s.enabled = v),
        )?;
        pm.tie_shared("simulation/input/applied", s, |s| s.applied, None)?;
        pm.tie_shared("simulation/input/rejected", s, |s| s.rejected, None)?;
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
mod ut_input {
    use super::*;

    #[test]
    fn commands_are_applied_in_order() {
        let pm = PropertyManager::new();
        let mut input = Input::new(pm.clone());
        input.bind(&pm).unwrap();
        input.init_model().unwrap();
        let tx = input.sender();
        tx.send(InputCommand::new("fcs/elevator-cmd-norm", 0.1)).unwrap();
        tx.send(InputCommand::new("fcs/elevator-cmd-norm", -0.2)).unwrap();
        tx.send(InputCommand::new("fcs/elevator-cmd-norm", true)).unwrap();
        input.run(false).unwrap();
        assert_eq!(pm.get_f64("fcs/elevator-cmd-norm").unwrap(), -0.2);
        assert_eq!(input.state().applied, 2);
        assert_eq!(input.state().rejected, 1);
    }

    #[test]
    fn commands_per_frame_budget() {
        let pm = PropertyManager::new();
        let mut input = Input::new(pm.clone());
        input.bind(&pm).unwrap();
        input.configure(&InputConfig {
            max_commands_per_frame: Some(1),
        });
        let tx = input.sender();
        tx.send(InputCommand::new("a/b", 1.0)).unwrap();
        tx.send(InputCommand::new("a/b", 2.0)).unwrap();
        input.run(false).unwrap();
        assert_eq!(pm.get_f64("a/b").unwrap(), 1.0);
        // Disabled input leaves the commands queued
        pm.set_bool("simulation/input/enabled", false).unwrap();
        input.run(false).unwrap();
        assert_eq!(pm.get_f64("a/b").unwrap(), 1.0);
        pm.set_bool("simulation/input/enabled", true).unwrap();
        input.run(true).unwrap();
        assert_eq!(pm.get_f64("a/b").unwrap(), 2.0);
    }
}
