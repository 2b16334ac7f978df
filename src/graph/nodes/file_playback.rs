use crate::dsp::{Channel, ChannelId, ClockGenerator};
use crate::graph::attribute::{AttributeSchema, AttributeValue, WidgetKind};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeContext};
use crate::graph::node_type::NodeType;
use crate::graph::port::PortDescriptor;
use crate::graph::provider::{ChannelDataProvider, JsonRecordingProvider, ProviderError, RecordedChannel};
use crate::graph::status::{ErrorCode, WarningCode};

const PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", "Recording")];

/// Loops over stored channels at their recorded rate.
///
/// Tick `t` of the playback clock emits `samples[t % len]` on every channel,
/// so output stays sample-accurate however often the host ticks. `len` is the
/// shortest channel's length, which keeps frames aligned across channels. A failed
/// load is latched until the node is reset; the provider is not polled again
/// before that.
pub struct FilePlaybackNode {
    provider: Option<Box<dyn ChannelDataProvider>>,
    file: String,
    sample_rate_override: f64,
    recording: Option<Vec<RecordedChannel>>,
    load_failed: bool,
    clock: ClockGenerator,
    num_samples: usize,
    outputs: Vec<ChannelId>,
}

impl FilePlaybackNode {
    pub fn new() -> Self {
        Self {
            provider: None,
            file: String::new(),
            sample_rate_override: 0.0,
            recording: None,
            load_failed: false,
            clock: ClockGenerator::new(0.0),
            num_samples: 0,
            outputs: Vec::new(),
        }
    }

    pub fn with_provider(provider: Box<dyn ChannelDataProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::new()
        }
    }

    fn load(&mut self, ctx: &mut NodeContext) -> bool {
        let Some(provider) = self.provider.as_mut() else {
            ctx.set_error(ErrorCode::INVALID_CONFIGURATION, "no recording configured");
            return false;
        };
        ctx.clear_error(ErrorCode::INVALID_CONFIGURATION);

        match provider.load() {
            Ok(channels) => {
                tracing::info!(
                    "Node '{}' loaded {} channel(s) from {}",
                    ctx.name,
                    channels.len(),
                    provider.describe()
                );
                let empty = channels.iter().all(|c| c.samples.is_empty());
                ctx.toggle_warning(WarningCode::SOURCE_EMPTY, empty, "recording contains no samples");
                self.recording = Some(channels);
                true
            }
            Err(err) => {
                let code = match err {
                    ProviderError::NotReadable(_) => ErrorCode::SOURCE_NOT_READABLE,
                    ProviderError::Format(_) => ErrorCode::FORMAT_NOT_READABLE,
                };
                ctx.set_error(code, err.to_string());
                self.load_failed = true;
                false
            }
        }
    }

    /// Rate used for playback, or `None` when the recording does not settle on one.
    fn playback_rate(&self) -> Option<f64> {
        if self.sample_rate_override > 0.0 {
            return Some(self.sample_rate_override);
        }
        let channels = self.recording.as_deref()?;
        let first = channels.first().map_or(0.0, |c| c.sample_rate);
        let uniform = channels.iter().all(|c| c.sample_rate == first);
        (uniform && first > 0.0).then_some(first)
    }
}

impl Default for FilePlaybackNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for FilePlaybackNode {
    fn node_type(&self) -> NodeType {
        NodeType::FilePlayback
    }

    fn ports(&self) -> &'static [PortDescriptor] {
        PORTS
    }

    fn schema(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("file", "File", WidgetKind::String, "")
                .describe("JSON recording to play back"),
            AttributeSchema::new("sample_rate", "Sample Rate (Hz)", WidgetKind::FloatSpinner, 0.0)
                .describe("Playback rate, 0 uses the recorded rate")
                .bounds(0.0, 1_000_000.0),
        ]
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) -> GraphResult<()> {
        match key {
            "file" => {
                let file = value.as_str().unwrap_or_default().to_string();
                if !file.is_empty() {
                    self.provider = Some(Box::new(JsonRecordingProvider::new(&file)));
                } else if !self.file.is_empty() {
                    // Provider came from the previous file; an injected one is kept.
                    self.provider = None;
                }
                self.file = file;
            }
            "sample_rate" => {
                self.sample_rate_override = value.as_float().unwrap_or(self.sample_rate_override)
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
            "file" => Some(AttributeValue::from(self.file.as_str())),
            "sample_rate" => Some(AttributeValue::Float(self.sample_rate_override)),
            _ => None,
        }
    }

    fn on_attributes_changed(&mut self) -> bool {
        true
    }

    fn reset(&mut self, ctx: &mut NodeContext) {
        self.recording = None;
        self.load_failed = false;
        self.outputs.clear();
        self.num_samples = 0;
        self.clock.reset();
        ctx.clear_error(ErrorCode::SOURCE_NOT_READABLE);
        ctx.clear_error(ErrorCode::FORMAT_NOT_READABLE);
        ctx.clear_error(ErrorCode::SAMPLE_RATE_INVALID);
        ctx.clear_warning(WarningCode::SOURCE_EMPTY);
    }

    fn reinit(&mut self, ctx: &mut NodeContext) -> bool {
        if self.load_failed {
            return false;
        }
        if self.recording.is_none() && !self.load(ctx) {
            return false;
        }

        let has_channels = self.recording.as_ref().is_some_and(|c| !c.is_empty());
        if has_channels && self.playback_rate().is_none() {
            ctx.set_error(
                ErrorCode::SAMPLE_RATE_INVALID,
                "recording has no usable sample rate, set one explicitly",
            );
            return false;
        }
        ctx.clear_error(ErrorCode::SAMPLE_RATE_INVALID);
        true
    }

    fn start(&mut self, ctx: &mut NodeContext) {
        let rate = self.playback_rate().unwrap_or(0.0);
        self.outputs.clear();
        for recorded in self.recording.iter().flatten() {
            let mut channel = Channel::new(recorded.name.clone(), rate);
            channel.set_unit(recorded.unit.clone());
            channel.set_start_time(ctx.elapsed);
            if let Some(id) = ctx.create_output_channel(0, channel) {
                self.outputs.push(id);
            }
        }
        self.num_samples = self
            .recording
            .iter()
            .flatten()
            .map(|c| c.samples.len())
            .min()
            .unwrap_or(0);
        self.clock = ClockGenerator::new(rate);
        self.clock.restart(ctx.elapsed);
    }

    fn update(&mut self, ctx: &mut NodeContext) {
        self.clock.update(ctx.elapsed, ctx.delta);
        let Some(recording) = self.recording.as_ref() else {
            self.clock.clear_new_ticks();
            return;
        };

        if self.num_samples == 0 {
            self.clock.clear_new_ticks();
            return;
        }

        for id in &self.outputs {
            if let Some(channel) = ctx.channels.get_mut(*id) {
                channel.begin_add_samples();
            }
        }

        while let Some(tick) = self.clock.pop_oldest_tick() {
            let index = (tick % self.num_samples as u64) as usize;
            for (id, recorded) in self.outputs.iter().zip(recording) {
                if let Some(channel) = ctx.channels.get_mut(*id) {
                    channel.add_sample(recorded.samples[index]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::provider::{InMemoryProvider, MockChannelDataProvider};
    use crate::graph::test_support::NodeHarness;
    use std::time::Duration;

    fn playback(channels: Vec<RecordedChannel>) -> NodeHarness {
        NodeHarness::new(Box::new(FilePlaybackNode::with_provider(Box::new(
            InMemoryProvider::new(channels),
        ))))
    }

    #[test]
    fn test_loops_over_recording() {
        let mut harness = playback(vec![RecordedChannel::new("eeg", 2.0, vec![1.0, 2.0, 3.0, 4.0])]);
        harness.tick();
        assert!(harness.initialized());

        harness.tick_at(Duration::from_millis(1_300));
        harness.tick_at(Duration::from_secs(3));
        assert_eq!(harness.output_samples(0, 0), vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_channels_share_shortest_loop() {
        let mut harness = playback(vec![
            RecordedChannel::new("a", 1.0, vec![1.0, 2.0, 3.0]),
            RecordedChannel::new("b", 1.0, vec![10.0, 20.0]),
        ]);
        harness.tick();
        harness.tick_at(Duration::from_secs(4));
        assert_eq!(harness.output_samples(0, 0), vec![1.0, 2.0, 1.0, 2.0]);
        assert_eq!(harness.output_samples(0, 1), vec![10.0, 20.0, 10.0, 20.0]);
    }

    #[test]
    fn test_one_empty_channel_silences_all() {
        let mut harness = playback(vec![
            RecordedChannel::new("a", 1.0, vec![1.0, 2.0]),
            RecordedChannel::new("b", 1.0, vec![]),
        ]);
        harness.tick();
        harness.tick_at(Duration::from_secs(3));
        assert!(harness.initialized());
        assert!(harness.output_samples(0, 0).is_empty());
        assert!(harness.output_samples(0, 1).is_empty());
    }

    #[test]
    fn test_load_error_is_latched_until_reset() {
        let mut provider = MockChannelDataProvider::new();
        provider.expect_describe().returning(|| "mock".to_string());
        provider
            .expect_load()
            .times(2)
            .returning(|| Err(ProviderError::NotReadable("gone".to_string())));

        let mut harness = NodeHarness::new(Box::new(FilePlaybackNode::with_provider(Box::new(provider))));
        for _ in 0..5 {
            harness.tick();
        }
        assert!(!harness.initialized());
        assert!(harness.status().has_error(ErrorCode::SOURCE_NOT_READABLE));

        harness.reset();
        assert!(!harness.status().has_errors());
        harness.tick();
        assert!(harness.status().has_error(ErrorCode::SOURCE_NOT_READABLE));
    }

    #[test]
    fn test_format_error_code() {
        let mut provider = MockChannelDataProvider::new();
        provider.expect_describe().returning(|| "mock".to_string());
        provider
            .expect_load()
            .returning(|| Err(ProviderError::Format("not json".to_string())));

        let mut harness = NodeHarness::new(Box::new(FilePlaybackNode::with_provider(Box::new(provider))));
        harness.tick();
        assert!(harness.status().has_error(ErrorCode::FORMAT_NOT_READABLE));
    }

    #[test]
    fn test_empty_recording_warns_but_starts() {
        let mut harness = playback(vec![RecordedChannel::new("eeg", 10.0, vec![])]);
        harness.tick();
        harness.tick_at(Duration::from_secs(1));
        assert!(harness.initialized());
        assert!(harness.status().has_warning(WarningCode::SOURCE_EMPTY));
        assert!(harness.output_samples(0, 0).is_empty());
    }

    #[test]
    fn test_sample_rate_required() {
        let mut harness = playback(vec![
            RecordedChannel::new("a", 0.0, vec![1.0]),
        ]);
        harness.tick();
        assert!(!harness.initialized());
        assert!(harness.status().has_error(ErrorCode::SAMPLE_RATE_INVALID));

        let mut node = FilePlaybackNode::with_provider(Box::new(InMemoryProvider::new(vec![
            RecordedChannel::new("a", 0.0, vec![1.0]),
        ])));
        node.apply_attribute("sample_rate", &AttributeValue::Float(5.0)).unwrap();
        let mut harness = NodeHarness::new(Box::new(node));
        harness.tick();
        harness.tick_at(Duration::from_secs(1));
        assert_eq!(harness.output_samples(0, 0), vec![1.0; 5]);
        assert_eq!(harness.output_channel(0, 0).unwrap().sample_rate(), 5.0);
    }

    #[test]
    fn test_mismatched_rates_are_rejected() {
        let mut harness = playback(vec![
            RecordedChannel::new("a", 100.0, vec![1.0]),
            RecordedChannel::new("b", 200.0, vec![1.0]),
        ]);
        harness.tick();
        assert!(harness.status().has_error(ErrorCode::SAMPLE_RATE_INVALID));
    }

    #[test]
    fn test_missing_source_is_configuration_error() {
        let mut harness = NodeHarness::new(Box::new(FilePlaybackNode::new()));
        harness.tick();
        assert!(harness.status().has_error(ErrorCode::INVALID_CONFIGURATION));
    }

    #[test]
    fn test_clearing_file_drops_its_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.json");
        std::fs::write(
            &path,
            r#"{"channels":[{"name":"Cz","sample_rate":1.0,"samples":[4.0,5.0]}]}"#,
        )
        .unwrap();

        let mut harness = NodeHarness::new(Box::new(FilePlaybackNode::new()));
        harness
            .node_mut()
            .apply_attribute("file", &AttributeValue::from(path.to_string_lossy().as_ref()))
            .unwrap();
        harness.tick();
        assert!(harness.initialized());

        harness
            .node_mut()
            .apply_attribute("file", &AttributeValue::from(""))
            .unwrap();
        harness.reset();
        harness.tick();
        assert!(!harness.initialized());
        assert!(harness.status().has_error(ErrorCode::INVALID_CONFIGURATION));
    }

    #[test]
    fn test_empty_file_keeps_injected_provider() {
        let mut node = FilePlaybackNode::with_provider(Box::new(InMemoryProvider::new(vec![
            RecordedChannel::new("a", 1.0, vec![3.0]),
        ])));
        node.apply_attribute("file", &AttributeValue::from("")).unwrap();
        let mut harness = NodeHarness::new(Box::new(node));
        harness.tick();
        harness.tick_at(Duration::from_secs(2));
        assert_eq!(harness.output_samples(0, 0), vec![3.0, 3.0]);
    }
}
