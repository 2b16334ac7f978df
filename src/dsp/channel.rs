//! Append-only sample channels and the arena that owns them.
//!
//! Channels are owned by the `ChannelStore` and addressed through
//! generation-checked `ChannelId` handles. A handle to a channel that was
//! released (for example when its owning node was reset) simply stops
//! resolving instead of dangling.

use std::fmt;
use std::time::Duration;

/// A single named time series with a sample rate.
///
/// Samples are only ever appended. The buffer shrinks only on `reset`, which
/// keeps the configuration (name, rate, metadata) intact.
#[derive(Debug, Clone)]
pub struct Channel<T> {
    name: String,
    /// Readable origin for display, usually `"<node>.<port>"`.
    source_name: String,
    unit: String,
    /// Samples per second, 0.0 while unset.
    sample_rate: f64,
    samples: Vec<T>,
    sample_counter: u64,
    /// Samples appended since the last `begin_add_samples`.
    num_new_samples: u32,
    start_time: Duration,
    min_value: f64,
    max_value: f64,
}

impl<T: Copy> Channel<T> {
    pub fn new(name: impl Into<String>, sample_rate: f64) -> Self {
        Self {
            name: name.into(),
            source_name: String::new(),
            unit: String::new(),
            sample_rate,
            samples: Vec::new(),
            sample_counter: 0,
            num_new_samples: 0,
            start_time: Duration::ZERO,
            min_value: -1.0,
            max_value: 1.0,
        }
    }

    /// Create a channel pre-filled with samples (used for stored recordings).
    pub fn from_samples(name: impl Into<String>, sample_rate: f64, samples: Vec<T>) -> Self {
        let mut channel = Self::new(name, sample_rate);
        channel.sample_counter = samples.len() as u64;
        channel.samples = samples;
        channel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn set_source_name(&mut self, source_name: impl Into<String>) {
        self.source_name = source_name.into();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Typical value range, used for display only.
    pub fn display_range(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }

    pub fn set_display_range(&mut self, min_value: f64, max_value: f64) {
        self.min_value = min_value;
        self.max_value = max_value;
    }

    /// Append a sample. Never blocks and never drops.
    #[inline]
    pub fn add_sample(&mut self, value: T) {
        self.samples.push(value);
        self.sample_counter += 1;
        self.num_new_samples = self.num_new_samples.saturating_add(1);
    }

    pub fn add_samples(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.add_sample(value);
        }
    }

    /// Random access, valid for `index < num_samples()`.
    #[inline]
    pub fn sample(&self, index: u64) -> Option<T> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.samples.get(i))
            .copied()
    }

    pub fn last_sample(&self) -> Option<T> {
        self.samples.last().copied()
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    #[inline]
    pub fn num_samples(&self) -> u64 {
        self.samples.len() as u64
    }

    /// Total samples added since the last reset.
    pub fn sample_counter(&self) -> u64 {
        self.sample_counter
    }

    pub fn num_new_samples(&self) -> u32 {
        self.num_new_samples
    }

    /// Mark the start of a producer update; `num_new_samples` counts from here.
    pub fn begin_add_samples(&mut self) {
        self.num_new_samples = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.sample_counter == 0
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: Duration) {
        self.start_time = start_time;
    }

    /// Timestamp of a sample relative to the channel start (sample 0 at start time).
    pub fn sample_time(&self, index: u64) -> Duration {
        if self.sample_rate <= 0.0 {
            return self.start_time;
        }
        self.start_time + Duration::from_secs_f64(index as f64 / self.sample_rate)
    }

    /// Length of the recorded signal.
    pub fn duration(&self) -> Duration {
        if self.sample_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.num_samples() as f64 / self.sample_rate)
    }

    /// Clear all samples and counters, keeping name, rate and metadata.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.sample_counter = 0;
        self.num_new_samples = 0;
        self.start_time = Duration::ZERO;
    }
}

/// Generation-checked handle into a `ChannelStore`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    index: u32,
    generation: u32,
}

impl ChannelId {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({}v{})", self.index, self.generation)
    }
}

struct ChannelSlot {
    generation: u32,
    /// Key of the owning node (the graph uses node indices).
    owner: u32,
    channel: Option<Channel<f64>>,
}

/// Arena owning every signal channel of a graph.
///
/// Exactly one owner writes a channel; everyone else reads through handles.
#[derive(Default)]
pub struct ChannelStore {
    slots: Vec<ChannelSlot>,
    free: Vec<u32>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a channel on behalf of `owner` and return its handle.
    pub fn insert(&mut self, owner: u32, channel: Channel<f64>) -> ChannelId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.owner = owner;
            slot.channel = Some(channel);
            return ChannelId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(ChannelSlot {
            generation: 0,
            owner,
            channel: Some(channel),
        });
        ChannelId {
            index,
            generation: 0,
        }
    }

    #[inline]
    pub fn get(&self, id: ChannelId) -> Option<&Channel<f64>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.channel.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut Channel<f64>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.channel.as_mut())
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.get(id).is_some()
    }

    pub fn owner(&self, id: ChannelId) -> Option<u32> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation && slot.channel.is_some())
            .map(|slot| slot.owner)
    }

    /// Destroy a channel. Outstanding handles stop resolving.
    pub fn remove(&mut self, id: ChannelId) -> Option<Channel<f64>> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let channel = slot.channel.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(channel)
    }

    /// Destroy every channel owned by `owner`. Returns how many were released.
    pub fn release_owner(&mut self, owner: u32) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.owner == owner && slot.channel.is_some() {
                slot.channel = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                released += 1;
            }
        }
        released
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.channel.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
