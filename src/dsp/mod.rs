//! Signal buffers and timing primitives shared by the graph nodes.

pub mod channel;
pub mod clock;
pub mod comparison;
pub mod multi_channel;
pub mod sample_queue;

pub use channel::{Channel, ChannelId, ChannelStore};
pub use clock::ClockGenerator;
pub use comparison::Comparison;
pub use multi_channel::{ChannelReader, MultiChannel, MultiChannelReader};
pub use sample_queue::{sample_queue, Frame, SampleFeed, SampleQueue};
