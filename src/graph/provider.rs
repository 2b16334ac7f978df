//! Shape every external sample source has to provide.
//!
//! File readers and other stored sources only need to hand over named,
//! rated sample arrays. The graph never looks at formats or transports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// One stored channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedChannel {
    pub name: String,
    /// Samples per second, 0.0 when unknown and expected to be overridden.
    #[serde(default)]
    pub sample_rate: f64,
    #[serde(default)]
    pub unit: String,
    pub samples: Vec<f64>,
}

impl RecordedChannel {
    pub fn new(name: impl Into<String>, sample_rate: f64, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            unit: String::new(),
            samples,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Source not readable: {0}")]
    NotReadable(String),

    #[error("Unrecognized data format: {0}")]
    Format(String),
}

/// Supplies stored channels to a playback node.
#[cfg_attr(test, mockall::automock)]
pub trait ChannelDataProvider: Send {
    /// Human-readable origin, used in status messages.
    fn describe(&self) -> String;

    /// Load every channel. Called again only after the owning node is reset.
    fn load(&mut self) -> Result<Vec<RecordedChannel>, ProviderError>;
}

/// Channels held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    channels: Vec<RecordedChannel>,
}

impl InMemoryProvider {
    pub fn new(channels: Vec<RecordedChannel>) -> Self {
        Self { channels }
    }
}

impl ChannelDataProvider for InMemoryProvider {
    fn describe(&self) -> String {
        format!("{} in-memory channel(s)", self.channels.len())
    }

    fn load(&mut self) -> Result<Vec<RecordedChannel>, ProviderError> {
        Ok(self.channels.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RecordingFile {
    channels: Vec<RecordedChannel>,
}

/// Recording stored as JSON: `{ "channels": [ { "name", "sample_rate", "samples" } ] }`.
#[derive(Debug, Clone)]
pub struct JsonRecordingProvider {
    path: PathBuf,
}

impl JsonRecordingProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChannelDataProvider for JsonRecordingProvider {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&mut self) -> Result<Vec<RecordedChannel>, ProviderError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::NotReadable(format!("{}: {}", self.path.display(), e)))?;
        let recording: RecordingFile = serde_json::from_str(&content)
            .map_err(|e| ProviderError::Format(format!("{}: {}", self.path.display(), e)))?;
        Ok(recording.channels)
    }
}
