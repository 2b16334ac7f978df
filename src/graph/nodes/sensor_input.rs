use crate::dsp::{sample_queue, Channel, ChannelId, SampleFeed, SampleQueue};
use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;
use crate::graph::status::WarningCode;

const PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", "Samples")];

/// Live source fed by an external producer thread.
///
/// The producer pushes one frame per sampling instant through a
/// [`SampleFeed`]. Frames are drained during `update`, so a stalled or
/// dropped producer only means no new samples.
pub struct SensorInputNode {
    queue: SampleQueue,
    feed: Option<SampleFeed>,
    sample_rate: f64,
    num_channels: usize,
    outputs: Vec<ChannelId>,
}

impl SensorInputNode {
    pub fn new() -> Self {
        let (feed, queue) = sample_queue();
        Self {
            feed: Some(feed),
            ..Self::with_queue(queue)
        }
    }

    /// Consume an externally created queue. `sample_feed` then returns `None`.
    pub fn with_queue(queue: SampleQueue) -> Self {
        Self {
            queue,
            feed: None,
            sample_rate: 250.0,
            num_channels: 1,
            outputs: Vec::new(),
        }
    }
}

impl Default for SensorInputNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for SensorInputNode {
    fn node_type(&self) -> NodeType {
        NodeType::SensorInput
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("sample_rate", "Sample Rate (Hz)", WidgetKind::FloatSpinner, 250.0)
                .describe("Nominal device sampling rate")
                .bounds(0.001, 100_000.0),
            AttributeSchema::new("channels", "Channels", WidgetKind::IntSpinner, 1i64)
                .describe("Values per frame")
                .bounds(1.0, 256.0),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match key {
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
        // Frames from before the reset belong to the previous session
        self.queue.drain(|_| {});
    }

    fn start(&mut self, ctx: &mut NodeContext) {
        self.outputs.clear();
        for index in 0..self.num_channels {
            let mut channel = Channel::new(format!("ch{}", index + 1), self.sample_rate);
            channel.set_start_time(ctx.elapsed);
            if let Some(id) = ctx.create_output_channel(0, channel) {
                self.outputs.push(id);
            }
        }
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        for id in &self.outputs {
            if let Some(channel) = ctx.channels.get_mut(*id) {
                channel.begin_add_samples();
            }
        }

        let outputs = &self.outputs;
        let channels = &mut *ctx.channels;
        let mut malformed = 0usize;
        let drained = self.queue.drain(|frame| {
            if frame.len() != outputs.len() {
                malformed += 1;
                return;
            }
            for (id, value) in outputs.iter().zip(frame) {
                if let Some(channel) = channels.get_mut(*id) {
                    channel.add_sample(value);
                }
            }
        });
        tracing::trace!("Sensor '{}' drained {} frame(s)", ctx.name, drained);

        if malformed > 0 {
            ctx.set_warning(
                WarningCode::FRAME_SIZE_MISMATCH,
                format!("dropped {} frame(s) not matching {} channel(s)", malformed, self.num_channels),
            );
        } else if drained > 0 {
            ctx.clear_warning(WarningCode::FRAME_SIZE_MISMATCH);
        }
        ctx.toggle_warning(
            WarningCode::PRODUCER_DISCONNECTED,
            self.queue.is_disconnected(),
            "sample producer disconnected",
        );
    }

    fn sample_feed(&self) -> Option<SampleFeed> {
        self.feed.clone()
    }
}
