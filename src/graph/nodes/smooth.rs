use super::ChannelMirror;
use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::GraphResult;
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;
use std::collections::VecDeque;

const PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", "Input"),
    PortDescriptor::output("out", "Smoothed"),
];

const DEFAULT_WINDOW: usize = 8;

#[derive(Debug, Default)]
struct Window {
    values: VecDeque<f64>,
    sum: f64,
}

/// Moving average over the last `window` samples of every input channel.
pub struct SmoothNode {
    window: usize,
    mirror: ChannelMirror,
    windows: Vec<Window>,
}

impl SmoothNode {
    pub fn new() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            mirror: ChannelMirror::default(),
            windows: Vec::new(),
        }
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            ..Self::new()
        }
    }
}

impl Default for SmoothNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for SmoothNode {
    fn node_type(&self) -> NodeType {
        NodeType::Smooth
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("window", "Window", WidgetKind::IntSpinner, DEFAULT_WINDOW as i64)
                .describe("Number of samples averaged")
                .bounds(1.0, 100_000.0),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match (key, value.as_int()) {
            ("window", Some(window)) => {
                self.window = window.max(1) as usize;
                Ok(())
            }
            _ => Err(crate::graph::GraphError::UnknownAttribute {
                node_type: self.node_type().to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn attribute(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "window" => Some(AttributeValue::Int(self.window as i64)),
            _ => None,
        }
    }

    fn on_attributes_changed(&mut self) -> bool {
        true
    }

    fn reset(&mut self, _ctx: &mut NodeContext) {
        self.mirror.reset();
        self.windows.clear();
    }

    fn reinit(&mut self, ctx: &mut NodeContext) -> bool {
        self.mirror.check_input(ctx)
    }

    fn start(&mut self, ctx: &mut NodeContext) {
        self.mirror.start(ctx);
        self.windows = (0..self.mirror.num_channels())
            .map(|_| Window::default())
            .collect();
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        let limit = self.window;
        let windows = &mut self.windows;
        self.mirror.process(ctx, |channel, value| {
            let Some(window) = windows.get_mut(channel) else {
                return value;
            };
            window.values.push_back(value);
            window.sum += value;
            if window.values.len() > limit {
                if let Some(oldest) = window.values.pop_front() {
                    window.sum -= oldest;
                }
            }
            window.sum / window.values.len() as f64
        });
    }
}
