use super::ChannelMirror;
use crate::dsp::Comparison;
use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;

const PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", "Input"),
    PortDescriptor::output("out", "Triggered"),
];

/// Emits 1.0 for samples that pass `sample <op> threshold`, 0.0 otherwise.
pub struct ThresholdNode {
    threshold: f64,
    comparison: Comparison,
    mirror: ChannelMirror,
}

impl ThresholdNode {
    pub fn new() -> Self {
        Self {
            threshold: 0.0,
            comparison: Comparison::Greater,
            mirror: ChannelMirror::default(),
        }
    }

    pub fn with_threshold(comparison: Comparison, threshold: f64) -> Self {
        Self {
            threshold,
            comparison,
            ..Self::new()
        }
    }
}

impl Default for ThresholdNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for ThresholdNode {
    fn node_type(&self) -> NodeType {
        NodeType::Threshold
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("threshold", "Threshold", WidgetKind::FloatSpinner, 0.0),
            AttributeSchema::new(
                "comparison",
                "Comparison",
                WidgetKind::ComboBox(Comparison::SYMBOLS),
                ">",
            )
            .describe("Operator applied as `sample <op> threshold`"),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match key {
            "threshold" => {
                self.threshold = value.as_float().unwrap_or(self.threshold);
                Ok(())
            }
            "comparison" => {
                let symbol = value.as_str().unwrap_or_default();
                self.comparison = symbol.parse().map_err(|message| GraphError::InvalidAttribute {
                    key: key.to_string(),
                    message,
                })?;
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
            "threshold" => Some(AttributeValue::Float(self.threshold)),
            "comparison" => Some(AttributeValue::from(self.comparison.symbol())),
            _ => None,
        }
    }

    fn reset(&mut self, _ctx: &mut NodeContext) {
        self.mirror.reset();
    }

    fn reinit(&mut self, ctx: &mut NodeContext) -> bool {
        self.mirror.check_input(ctx)
    }

    fn start(&mut self, ctx: &mut NodeContext) {
        self.mirror.start(ctx);
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        let (comparison, threshold) = (self.comparison, self.threshold);
        self.mirror.process(ctx, |_, value| {
            if comparison.evaluate(value, threshold) {
                1.0
            } else {
                0.0
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Channel;
    use crate::graph::test_support::NodeHarness;

    #[test]
    fn test_threshold_output() {
        let mut harness =
            NodeHarness::new(Box::new(ThresholdNode::with_threshold(Comparison::GreaterOrEqual, 1.0)));
        let input = harness.add_input_channel(0, Channel::new("x", 10.0));
        harness.tick();
        harness.push(input, &[0.5, 1.0, 2.0]);
        harness.tick();
        assert_eq!(harness.output_samples(0, 0), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_attribute_changes_apply_without_reset() {
        let mut harness = NodeHarness::new(Box::new(ThresholdNode::new()));
        let input = harness.add_input_channel(0, Channel::new("x", 10.0));
        harness.tick();

        harness
            .node_mut()
            .apply_attribute("comparison", &AttributeValue::from("<"))
            .unwrap();
        assert!(!harness.node_mut().on_attributes_changed());

        harness.push(input, &[-1.0, 1.0]);
        harness.tick();
        assert_eq!(harness.output_samples(0, 0), vec![1.0, 0.0]);
        assert_eq!(
            harness.node().attribute("comparison"),
            Some(AttributeValue::from("<"))
        );
    }
}
