use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;
use crate::graph::status::{ErrorCode, WarningCode};

const PORTS: &[PortDescriptor] = &[PortDescriptor::input("in", "Input")];

/// Sink that remembers the latest sample of one input channel.
///
/// State machine feedback conditions read the value by node name.
pub struct FeedbackNode {
    channel: usize,
    value: Option<f64>,
}

impl FeedbackNode {
    pub fn new() -> Self {
        Self {
            channel: 0,
            value: None,
        }
    }
}

impl Default for FeedbackNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for FeedbackNode {
    fn node_type(&self) -> NodeType {
        NodeType::Feedback
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("channel", "Channel", WidgetKind::IntSpinner, 0i64)
                .describe("Index of the input channel to follow")
                .bounds(0.0, 4095.0),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match (key, value.as_int()) {
            ("channel", Some(channel)) => {
                self.channel = channel.max(0) as usize;
                Ok(())
            }
            _ => Err(GraphError::UnknownAttribute {
                node_type: self.node_type().to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn attribute(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "channel" => Some(AttributeValue::Int(self.channel as i64)),
            _ => None,
        }
    }

    fn reset(&mut self, _ctx: &mut NodeContext) {
        self.value = None;
    }

    fn reinit(&mut self, ctx: &mut NodeContext) -> bool {
        let available = ctx.input(0).map(|input| input.len()).unwrap_or(0);
        ctx.toggle_warning(
            WarningCode::INPUT_NOT_CONNECTED,
            available == 0,
            "input has no channels",
        );
        if available == 0 {
            return false;
        }
        if self.channel >= available {
            ctx.set_error(
                ErrorCode::INVALID_CONFIGURATION,
                format!("channel {} out of range ({} available)", self.channel, available),
            );
            return false;
        }
        ctx.clear_error(ErrorCode::INVALID_CONFIGURATION);
        true
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        let latest = ctx
            .input(0)
            .and_then(|input| input.get(self.channel))
            .and_then(|id| ctx.channels.get(id))
            .and_then(|channel| channel.last_sample());
        if latest.is_some() {
            self.value = latest;
        }
    }

    fn feedback_value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Channel;
    use crate::graph::test_support::NodeHarness;

    #[test]
    fn test_tracks_latest_value() {
        let mut harness = NodeHarness::new(Box::new(FeedbackNode::new()));
        let input = harness.add_input_channel(0, Channel::new("x", 10.0));
        harness.tick();
        assert_eq!(harness.node().feedback_value(), None);

        harness.push(input, &[1.0, 7.5]);
        harness.tick();
        assert_eq!(harness.node().feedback_value(), Some(7.5));

        // No new samples keeps the last value
        harness.tick();
        assert_eq!(harness.node().feedback_value(), Some(7.5));
    }

    #[test]
    fn test_channel_out_of_range_is_error() {
        let mut node = FeedbackNode::new();
        node.apply_attribute("channel", &AttributeValue::Int(3)).unwrap();
        let mut harness = NodeHarness::new(Box::new(node));
        harness.add_input_channel(0, Channel::new("x", 10.0));
        harness.tick();
        assert!(!harness.initialized());
        assert!(harness.status().has_error(ErrorCode::INVALID_CONFIGURATION));
    }
}
