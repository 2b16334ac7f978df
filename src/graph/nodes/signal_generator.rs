use crate::dsp::{Channel, ChannelId, ClockGenerator};
use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

const PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", "Signal")];

/// Periodic shape, evaluated on a phase in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Constant,
}

impl Waveform {
    pub const NAMES: &'static [&'static str] = &["sine", "square", "sawtooth", "triangle", "constant"];

    /// Value in `[-1, 1]` at `phase`.
    pub fn value(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Constant => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
            Waveform::Constant => "constant",
        }
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            "constant" => Ok(Waveform::Constant),
            other => Err(format!("unknown waveform '{}'", other)),
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Synthetic source, sample-accurate through its own clock.
pub struct SignalGeneratorNode {
    waveform: Waveform,
    frequency: f64,
    amplitude: f64,
    offset: f64,
    sample_rate: f64,
    num_channels: usize,
    clock: ClockGenerator,
    outputs: Vec<ChannelId>,
}

impl SignalGeneratorNode {
    pub fn new() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 10.0,
            amplitude: 1.0,
            offset: 0.0,
            sample_rate: 250.0,
            num_channels: 1,
            clock: ClockGenerator::new(250.0),
            outputs: Vec::new(),
        }
    }

    pub fn with_waveform(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            frequency,
            sample_rate,
            ..Self::new()
        }
    }

    fn sample_at(&self, tick: u64) -> f64 {
        let phase = (tick as f64 * self.frequency / self.sample_rate).fract();
        self.offset + self.amplitude * self.waveform.value(phase)
    }
}

impl Default for SignalGeneratorNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for SignalGeneratorNode {
    fn node_type(&self) -> NodeType {
        NodeType::SignalGenerator
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "waveform",
                "Waveform",
                WidgetKind::ComboBox(Waveform::NAMES),
                "sine",
            ),
            AttributeSchema::new("frequency", "Frequency (Hz)", WidgetKind::FloatSpinner, 10.0)
                .bounds(0.0, 10_000.0),
            AttributeSchema::new("amplitude", "Amplitude", WidgetKind::FloatSpinner, 1.0),
            AttributeSchema::new("offset", "Offset", WidgetKind::FloatSpinner, 0.0),
            AttributeSchema::new("sample_rate", "Sample Rate (Hz)", WidgetKind::FloatSpinner, 250.0)
                .describe("Samples generated per second")
                .bounds(0.001, 100_000.0),
            AttributeSchema::new("channels", "Channels", WidgetKind::IntSpinner, 1i64)
                .bounds(1.0, 64.0),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match key {
            "waveform" => {
                self.waveform = value
                    .as_str()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|message| GraphError::InvalidAttribute {
                        key: key.to_string(),
                        message,
                    })?;
            }
            "frequency" => self.frequency = value.as_float().unwrap_or(self.frequency),
            "amplitude" => self.amplitude = value.as_float().unwrap_or(self.amplitude),
            "offset" => self.offset = value.as_float().unwrap_or(self.offset),
            "sample_rate" => self.sample_rate = value.as_float().unwrap_or(self.sample_rate),
            "channels" => {
                self.num_channels = value.as_int().map_or(self.num_channels, |n| n.max(1) as usize)
            }
            _ => {
                return Err(GraphError::UnknownAttribute {
                    node_type: self.node_type().to_string(),
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "waveform" => Some(AttributeValue::from(self.waveform.name())),
            "frequency" => Some(AttributeValue::Float(self.frequency)),
            "amplitude" => Some(AttributeValue::Float(self.amplitude)),
            "offset" => Some(AttributeValue::Float(self.offset)),
            "sample_rate" => Some(AttributeValue::Float(self.sample_rate)),
            "channels" => Some(AttributeValue::Int(self.num_channels as i64)),
            _ => None,
        }
    }

    fn on_attributes_changed(&mut self) -> bool {
        true
    }

    fn reset(&mut self, _ctx: &mut NodeContext) {
        self.outputs.clear();
        self.clock.reset();
    }

    fn start(&mut self, ctx: &mut NodeContext) {
        self.outputs.clear();
        for index in 0..self.num_channels {
            let mut channel = Channel::new(format!("{}_{}", self.waveform, index + 1), self.sample_rate);
            channel.set_start_time(ctx.elapsed);
            channel.set_display_range(self.offset - self.amplitude, self.offset + self.amplitude);
            if let Some(id) = ctx.create_output_channel(0, channel) {
                self.outputs.push(id);
            }
        }
        self.clock = ClockGenerator::new(self.sample_rate);
        self.clock.restart(ctx.elapsed);
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        self.clock.update(ctx.elapsed, ctx.delta);
        for id in &self.outputs {
            if let Some(channel) = ctx.channels.get_mut(*id) {
                channel.begin_add_samples();
            }
        }
        while let Some(tick) = self.clock.pop_oldest_tick() {
            let value = self.sample_at(tick);
            for id in &self.outputs {
                if let Some(channel) = ctx.channels.get_mut(*id) {
                    channel.add_sample(value);
                }
            }
        }
    }
}
