pub mod feedback;
pub mod file_playback;
pub mod sensor_input;
pub mod signal_generator;
pub mod smooth;
pub mod threshold;

pub use feedback::FeedbackNode;
pub use file_playback::FilePlaybackNode;
pub use sensor_input::SensorInputNode;
pub use signal_generator::{SignalGeneratorNode, Waveform};
pub use smooth::SmoothNode;
pub use threshold::ThresholdNode;

use crate::dsp::{Channel, ChannelId, MultiChannel, MultiChannelReader};
use crate::graph::node::NodeContext;
use crate::graph::status::WarningCode;

/// Input handling shared by transforms that map each input channel onto one
/// output channel of the same rate.
#[derive(Debug, Default)]
pub(crate) struct ChannelMirror {
    source: MultiChannel,
    readers: MultiChannelReader,
    outputs: Vec<ChannelId>,
    started: bool,
}

impl ChannelMirror {
    /// Ready check: input 0 carries channels and, once started, still the same ones.
    pub fn check_input(&self, ctx: &mut NodeContext) -> bool {
        let (empty, uniform, same) = match ctx.input(0) {
            Some(input) => (
                input.is_empty(),
                input.has_uniform_sample_rate(ctx.channels),
                *input == self.source,
            ),
            None => (true, true, false),
        };
        ctx.toggle_warning(WarningCode::INPUT_NOT_CONNECTED, empty, "input has no channels");
        ctx.toggle_warning(
            WarningCode::SAMPLE_RATE_MISMATCH,
            !uniform,
            "input channels have different sample rates",
        );
        // A changed channel set makes the graph restart this node
        !empty && (!self.started || same)
    }

    /// Create one output channel per input channel on output port 0.
    pub fn start(&mut self, ctx: &mut NodeContext) {
        let input = ctx.input(0).cloned().unwrap_or_default();
        self.readers.clear();
        self.readers.sync(&input);
        self.outputs.clear();

        for id in input.iter() {
            let Some(source) = ctx.channels.get(id) else {
                continue;
            };
            let mut channel = Channel::new(source.name().to_string(), source.sample_rate());
            channel.set_unit(source.unit().to_string());
            channel.set_start_time(source.start_time());
            if let Some(out) = ctx.create_output_channel(0, channel) {
                self.outputs.push(out);
            }
        }

        self.source = input;
        self.started = true;
    }

    /// Feed every new input sample through `f` into the matching output.
    pub fn process(&mut self, ctx: &mut NodeContext, mut f: impl FnMut(usize, f64) -> f64) {
        let mut pending = Vec::new();
        for (index, reader) in self.readers.iter_mut().enumerate() {
            pending.clear();
            reader.drain(ctx.channels, |value| pending.push(value));

            let Some(output) = self
                .outputs
                .get(index)
                .and_then(|id| ctx.channels.get_mut(*id))
            else {
                continue;
            };
            output.begin_add_samples();
            for &value in &pending {
                output.add_sample(f(index, value));
            }
        }
    }

    pub fn num_channels(&self) -> usize {
        self.outputs.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
