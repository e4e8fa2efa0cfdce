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

use super::{Model, ModelBase, ModelError, ModelKind, OutputCreateSnafu, OutputWriteSnafu};
use crate::io::aircraft::OutputConfig;
use crate::props::{PropertyError, PropertyManager, PropertyNode, Shared};
use snafu::ResultExt;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// An in-memory destination for an output channel.
#[derive(Clone, Debug, Default)]
struct MemorySink(Shared<Vec<u8>>);

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Rows a file channel buffers between two flushes. The csv writer also flushes when dropped.
const FLUSH_ROWS: u64 = 100;

struct Channel {
    name: String,
    cfg: OutputConfig,
    columns: Vec<(String, Option<PropertyNode>)>,
    writer: Option<csv::Writer<Box<dyn Write + Send>>>,
    memory: Option<Shared<Vec<u8>>>,
    counter: u64,
    rows: u64,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("rate", &self.cfg.rate)
            .field("columns", &self.columns.len())
            .field("rows", &self.rows)
            .finish()
    }
}

impl Channel {
    fn write_row(&mut self, time: f64) -> Result<(), ModelError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let mut record = Vec::with_capacity(self.columns.len() + 1);
        record.push(time.to_string());
        for (_, node) in &self.columns {
            record.push(
                node.as_ref()
                    .and_then(|n| n.value().ok())
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        writer
            .write_record(&record)
            .context(OutputWriteSnafu { name: &self.name })?;
        self.rows += 1;
        // An in-memory channel is read back through its sink, a file only needs the odd flush
        if self.memory.is_some() || self.rows % FLUSH_ROWS == 0 {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ModelError> {
        match self.writer.as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(csv::Error::from)
                .context(OutputWriteSnafu { name: &self.name }),
            None => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputState {
    pub enabled: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OutputInputs {
    pub dt: f64,
    pub sim_time: f64,
}

/// Writes the configured properties as CSV rows, each channel at its own rate.
#[derive(Debug)]
pub struct Output {
    base: ModelBase,
    pub inputs: OutputInputs,
    pm: PropertyManager,
    root_dir: PathBuf,
    channels: Vec<Channel>,
    state: Shared<OutputState>,
}

impl Output {
    pub fn new(pm: PropertyManager) -> Self {
        Self {
            base: ModelBase::new(),
            inputs: OutputInputs::default(),
            pm,
            root_dir: PathBuf::from("."),
            channels: Vec::new(),
            state: Shared::new(OutputState { enabled: true }),
        }
    }

    /// Directory the output file names are relative to.
    pub fn set_root_dir(&mut self, root_dir: PathBuf) {
        self.root_dir = root_dir;
    }

    /// Adds a channel, opened by the next call to [`Model::init_model`].
    pub fn add_channel(&mut self, cfg: &OutputConfig) {
        let name = cfg
            .name
            .clone()
            .unwrap_or_else(|| format!("memory[{}]", self.channels.len()));
        self.channels.push(Channel {
            name,
            cfg: cfg.clone(),
            columns: Vec::new(),
            writer: None,
            memory: None,
            counter: 0,
            rows: 0,
        });
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// The CSV text written so far by an in-memory channel.
    pub fn contents(&self, channel: usize) -> Option<String> {
        let memory = self.channels.get(channel)?.memory.as_ref()?;
        let bytes = memory.read();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Number of rows, excluding the header, written by a channel.
    pub fn rows(&self, channel: usize) -> Option<u64> {
        self.channels.get(channel).map(|c| c.rows)
    }

    /// Writes out the rows buffered by every channel.
    pub fn flush(&mut self) -> Result<(), ModelError> {
        self.channels.iter_mut().try_for_each(Channel::flush)
    }

    pub fn enabled(&self) -> bool {
        self.state.read().enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.state.write().enabled = enabled;
    }

    fn open(&self, channel: &mut Channel) -> Result<(), ModelError> {
        let sink: Box<dyn Write + Send> = match &channel.cfg.name {
            Some(name) => {
                let path = self.root_dir.join(name);
                let file = File::create(&path).context(OutputCreateSnafu {
                    name: path.display().to_string(),
                })?;
                channel.memory = None;
                Box::new(BufWriter::new(file))
            }
            None => {
                let sink = MemorySink::default();
                channel.memory = Some(sink.0.clone());
                Box::new(sink)
            }
        };
        channel.columns = channel
            .cfg
            .properties
            .iter()
            .map(|path| {
                let node = self.pm.get_node(path, false).ok();
                if node.is_none() {
                    warn!("output {}: no property {path}, the column will be empty", channel.name);
                }
                (path.clone(), node)
            })
            .collect();
        let mut writer = csv::Writer::from_writer(sink);
        let mut header = vec!["Time".to_string()];
        header.extend(channel.columns.iter().map(|(path, _)| path.clone()));
        writer
            .write_record(&header)
            .context(OutputWriteSnafu { name: &channel.name })?;
        writer
            .flush()
            .map_err(csv::Error::from)
            .context(OutputWriteSnafu { name: &channel.name })?;
        channel.writer = Some(writer);
        channel.counter = 0;
        channel.rows = 0;
        info!("output {} opened with {} columns", channel.name, channel.columns.len());
        Ok(())
    }
}

impl Model for Output {
    fn kind(&self) -> ModelKind {
        ModelKind::Output
    }

    fn init_model(&mut self) -> Result<(), ModelError> {
        self.base.reset();
        let mut channels = std::mem::take(&mut self.channels);
        let result = channels.iter_mut().try_for_each(|c| self.open(c));
        self.channels = channels;
        result
    }

    fn run(&mut self, holding: bool) -> Result<(), ModelError> {
        if self.base.skip_frame() || holding || !self.enabled() {
            return Ok(());
        }
        let dt = self.inputs.dt;
        let time = self.inputs.sim_time;
        for channel in &mut self.channels {
            let frames = if dt > 0.0 && channel.cfg.rate > 0.0 {
                ((1.0 / (channel.cfg.rate * dt)).round() as u64).max(1)
            } else {
                1
            };
            if channel.counter % frames == 0 {
                channel.write_row(time)?;
            }
            channel.counter += 1;
        }
        Ok(())
    }

    /// Files already created by the channels are left on disk.
    fn unload(&mut self) {
        self.base.reset();
        self.channels.clear();
    }

    fn bind(&self, pm: &PropertyManager) -> Result<(), PropertyError> {
        pm.tie_shared(
            "simulation/output/enabled",
            &self.state,
            |s| s.enabled,
            Some(|s: &mut OutputState, v: bool| s.enabled = v),
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

#[cfg(test)]
mod ut_output {
    use super::*;
    use crate::io::aircraft::OutputKind;

    fn memory_channel(rate: f64, properties: &[&str]) -> OutputConfig {
        OutputConfig {
            name: None,
            kind: OutputKind::Csv,
            rate,
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn rows_at_rate() {
        let pm = PropertyManager::new();
        pm.set_f64("position/h-sl-ft", 1000.0).unwrap();
        let mut out = Output::new(pm.clone());
        out.bind(&pm).unwrap();
        out.add_channel(&memory_channel(10.0, &["position/h-sl-ft", "missing/prop"]));
        out.init_model().unwrap();
        out.inputs.dt = 0.01;
        for frame in 0..25 {
            out.inputs.sim_time = frame as f64 * 0.01;
            out.run(false).unwrap();
        }
        // Every 10th frame: 0, 10 and 20
        assert_eq!(out.rows(0), Some(3));
        let text = out.contents(0).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Time,position/h-sl-ft,missing/prop"));
        assert_eq!(lines.next(), Some("0,1000,"));
    }

    #[test]
    fn file_rows_are_buffered() {
        let dir = std::env::temp_dir().join(format!("gyre-output-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let pm = PropertyManager::new();
        pm.set_f64("position/h-sl-ft", 1000.0).unwrap();
        let mut out = Output::new(pm.clone());
        out.set_root_dir(dir.clone());
        out.add_channel(&OutputConfig {
            name: Some("buffered.csv".to_string()),
            ..memory_channel(0.0, &["position/h-sl-ft"])
        });
        out.init_model().unwrap();
        let path = dir.join("buffered.csv");
        let lines = || std::fs::read_to_string(&path).unwrap().lines().count();

        for frame in 0..3 {
            out.inputs.sim_time = f64::from(frame);
            out.run(false).unwrap();
        }
        assert_eq!(out.rows(0), Some(3));
        // Only the header reached the file
        assert_eq!(lines(), 1);
        out.flush().unwrap();
        assert_eq!(lines(), 4);

        for frame in 3..(FLUSH_ROWS + 2) {
            out.inputs.sim_time = frame as f64;
            out.run(false).unwrap();
        }
        assert_eq!(lines(), FLUSH_ROWS as usize + 1);
        drop(out);
        assert_eq!(lines(), FLUSH_ROWS as usize + 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn disabled_output_writes_nothing() {
        let pm = PropertyManager::new();
        let mut out = Output::new(pm.clone());
        out.bind(&pm).unwrap();
        out.add_channel(&memory_channel(1.0, &[]));
        out.init_model().unwrap();
        pm.set_bool("simulation/output/enabled", false).unwrap();
        out.run(false).unwrap();
        assert_eq!(out.rows(0), Some(0));
        assert!(!out.enabled());
        assert_eq!(out.contents(0).unwrap(), "Time\n");
    }
}
