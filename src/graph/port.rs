//! Port descriptors and the runtime port state.
//!
//! Each node declares its ports via a static `PortDescriptor` array.
//! The graph uses these to validate connections and keeps one `Port` per
//! descriptor holding the signal set currently flowing through it.

use crate::dsp::MultiChannel;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for a node's port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub direction: PortDirection,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, display_name: &'static str) -> Self {
        Self {
            name,
            display_name,
            direction: PortDirection::Input,
        }
    }

    pub const fn output(name: &'static str, display_name: &'static str) -> Self {
        Self {
            name,
            display_name,
            direction: PortDirection::Output,
        }
    }
}

/// A port on a live node.
#[derive(Debug, Clone)]
pub struct Port {
    descriptor: PortDescriptor,
    channels: MultiChannel,
}

impl Port {
    pub fn new(descriptor: PortDescriptor) -> Self {
        Self {
            descriptor,
            channels: MultiChannel::new(),
        }
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn channels(&self) -> &MultiChannel {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut MultiChannel {
        &mut self.channels
    }
}

/// Split a node's descriptor list into fresh input and output ports.
pub(crate) fn build_ports(descriptors: &[PortDescriptor]) -> (Vec<Port>, Vec<Port>) {
    let inputs = descriptors
        .iter()
        .filter(|d| d.direction == PortDirection::Input)
        .map(|d| Port::new(*d))
        .collect();
    let outputs = descriptors
        .iter()
        .filter(|d| d.direction == PortDirection::Output)
        .map(|d| Port::new(*d))
        .collect();
    (inputs, outputs)
}

/// Map a descriptor index to its direction and its position among ports of
/// that direction.
pub(crate) fn resolve_port(
    descriptors: &[PortDescriptor],
    port_index: usize,
) -> Option<(PortDirection, usize)> {
    let descriptor = descriptors.get(port_index)?;
    let position = descriptors[..port_index]
        .iter()
        .filter(|d| d.direction == descriptor.direction)
        .count();
    Some((descriptor.direction, position))
}
