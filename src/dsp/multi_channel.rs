//! Non-owning channel sets and per-consumer read cursors.

use super::channel::{ChannelId, ChannelStore};

/// Ordered set of channel handles carried by a port.
///
/// Clearing a `MultiChannel` never touches the channels themselves; they stay
/// in the `ChannelStore` owned by their producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiChannel {
    channels: Vec<ChannelId>,
}

impl MultiChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&mut self, id: ChannelId) {
        self.channels.push(id);
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ChannelId> {
        self.channels.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.iter().copied()
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains(&id)
    }

    /// Replace the contents with the channels of `other`.
    pub fn assign(&mut self, other: &MultiChannel) {
        self.channels.clear();
        self.channels.extend_from_slice(&other.channels);
    }

    pub fn extend(&mut self, other: &MultiChannel) {
        self.channels.extend_from_slice(&other.channels);
    }

    /// Sample rate shared by all live members, `None` when empty or mixed.
    pub fn common_sample_rate(&self, store: &ChannelStore) -> Option<f64> {
        let mut rates = self.live_rates(store);
        let first = rates.next()?;
        rates.all(|rate| rate == first).then_some(first)
    }

    /// True when every live member shares one sample rate (vacuously true when empty).
    pub fn has_uniform_sample_rate(&self, store: &ChannelStore) -> bool {
        let mut rates = self.live_rates(store);
        match rates.next() {
            Some(first) => rates.all(|rate| rate == first),
            None => true,
        }
    }

    fn live_rates<'a>(&'a self, store: &'a ChannelStore) -> impl Iterator<Item = f64> + 'a {
        self.channels
            .iter()
            .filter_map(|id| store.get(*id))
            .map(|c| c.sample_rate())
    }

    /// Fewest samples appended to any member during the current producer update.
    pub fn min_num_new_samples(&self, store: &ChannelStore) -> u32 {
        self.channels
            .iter()
            .filter_map(|id| store.get(*id))
            .map(|c| c.num_new_samples())
            .min()
            .unwrap_or(0)
    }
}

/// Read cursor over one append-only channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelReader {
    channel: ChannelId,
    position: u64,
}

impl ChannelReader {
    /// Start reading at `position` (usually the channel's current length).
    pub fn new(channel: ChannelId, position: u64) -> Self {
        Self { channel, position }
    }

    /// Start reading at the current end of the channel, skipping history.
    pub fn at_end(channel: ChannelId, store: &ChannelStore) -> Self {
        let position = store.get(channel).map(|c| c.num_samples()).unwrap_or(0);
        Self { channel, position }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Samples appended since the cursor last advanced.
    pub fn num_new_samples(&self, store: &ChannelStore) -> u64 {
        store
            .get(self.channel)
            .map(|c| c.num_samples().saturating_sub(self.position))
            .unwrap_or(0)
    }

    pub fn pop(&mut self, store: &ChannelStore) -> Option<f64> {
        let value = store.get(self.channel)?.sample(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Consume every pending sample, in order.
    pub fn drain(&mut self, store: &ChannelStore, mut f: impl FnMut(f64)) -> u64 {
        let Some(channel) = store.get(self.channel) else {
            return 0;
        };
        let end = channel.num_samples();
        let start = self.position.min(end);
        for index in start..end {
            if let Some(value) = channel.sample(index) {
                f(value);
            }
        }
        self.position = end;
        end - start
    }

    pub fn skip_to_end(&mut self, store: &ChannelStore) {
        if let Some(channel) = store.get(self.channel) {
            self.position = channel.num_samples();
        }
    }
}

/// One cursor per member of a `MultiChannel`, kept in the same order.
#[derive(Debug, Clone, Default)]
pub struct MultiChannelReader {
    readers: Vec<ChannelReader>,
}

impl MultiChannelReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align the cursors with `input`.
    ///
    /// Cursors for channels that remain keep their position; new channels are
    /// read from their first sample. Returns true when the channel set changed.
    pub fn sync(&mut self, input: &MultiChannel) -> bool {
        let unchanged = self.readers.len() == input.len()
            && self
                .readers
                .iter()
                .zip(input.iter())
                .all(|(reader, id)| reader.channel() == id);
        if unchanged {
            return false;
        }

        let previous = std::mem::take(&mut self.readers);
        self.readers = input
            .iter()
            .map(|id| {
                previous
                    .iter()
                    .find(|r| r.channel() == id)
                    .copied()
                    .unwrap_or(ChannelReader::new(id, 0))
            })
            .collect();
        true
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn reader_mut(&mut self, index: usize) -> Option<&mut ChannelReader> {
        self.readers.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelReader> {
        self.readers.iter_mut()
    }

    pub fn min_num_new_samples(&self, store: &ChannelStore) -> u64 {
        self.readers
            .iter()
            .map(|r| r.num_new_samples(store))
            .min()
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.readers.clear();
    }
}
