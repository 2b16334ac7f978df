//! Session files.
//!
//! A session describes one complete run: engine settings, the dataflow
//! graph and the state machine that sequences it. Files are TOML or JSON,
//! chosen by extension.
//!
//! ```toml
//! name = "relaxation"
//!
//! [engine]
//! tick_rate_hz = 60
//!
//! [[graph.nodes]]
//! name = "gen"
//! node_type = "signal_generator"
//! attributes = { waveform = "sine", frequency = 0.2 }
//!
//! [[graph.nodes]]
//! name = "alpha"
//! node_type = "feedback"
//!
//! [[graph.connections]]
//! from = "gen.out"
//! to = "alpha.in"
//!
//! [[state_machine.states]]
//! name = "baseline"
//! kind = "entry"
//!
//! [[state_machine.states]]
//! name = "done"
//! kind = "exit"
//!
//! [[state_machine.transitions]]
//! from = "baseline"
//! to = "done"
//! conditions = [{ kind = "feedback", feedback = "alpha", comparison = ">", value = 0.7 }]
//! ```

use crate::config::settings::EngineConfig;
use crate::dsp::Comparison;
use crate::error::{EngineError, Result};
use crate::graph::{AttributeValue, NodeType};
use crate::state_machine::{ActivationMode, DeadEndMode, SyncMode, TransitionCondition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current session file version
pub const SESSION_VERSION: u32 = 1;

/// On-disk encoding of a session file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFormat {
    Toml,
    Json,
}

impl SessionFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(SessionFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(SessionFormat::Json),
            _ => Err(EngineError::Config(format!(
                "Unsupported session file extension: {:?} (expected .toml or .json)",
                path
            ))),
        }
    }
}

// ==================== Graph Definition ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique node name, also the feedback name for feedback nodes
    pub name: String,

    pub node_type: NodeType,

    /// Attribute overrides, validated against the node's schema on build
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Connection between two ports, each written as `"node.port"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    pub from: String,
    pub to: String,
}

impl ConnectionDefinition {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Split `"node.port"` at the last dot.
pub fn parse_endpoint(endpoint: &str) -> Result<(&str, &str)> {
    match endpoint.rsplit_once('.') {
        Some((node, port)) if !node.is_empty() && !port.is_empty() => Ok((node, port)),
        _ => Err(EngineError::Config(format!(
            "Invalid endpoint '{}': expected \"node.port\"",
            endpoint
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,

    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

// ==================== State Machine Definition ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKindName {
    #[default]
    Plain,
    Entry,
    Exit,
    Timer,
    Sync,
}

/// One state. Kind-specific fields are ignored for other kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub name: String,

    #[serde(default)]
    pub kind: StateKindName,

    #[serde(default)]
    pub activation_mode: ActivationMode,

    /// Defaults to `stay_active` for exit states, `deactivate` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_end_mode: Option<DeadEndMode>,

    /// Exit status reported by exit states
    #[serde(default)]
    pub status: u32,

    /// Timer interval in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<f64>,

    /// Timer ticks once immediately on entry
    #[serde(default)]
    pub first_tick_on_entry: bool,

    /// Timer clock restarts whenever the state is entered
    #[serde(default = "default_true")]
    pub restart_on_entry: bool,

    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Required number of synchronized transitions for `wait_count`
    #[serde(default)]
    pub sync_count: usize,
}

fn default_true() -> bool {
    true
}

impl StateDefinition {
    pub fn new(name: impl Into<String>, kind: StateKindName) -> Self {
        Self {
            name: name.into(),
            kind,
            activation_mode: ActivationMode::default(),
            dead_end_mode: None,
            status: 0,
            interval_secs: None,
            first_tick_on_entry: false,
            restart_on_entry: true,
            sync_mode: SyncMode::default(),
            sync_count: 0,
        }
    }

    pub fn exit(name: impl Into<String>, status: u32) -> Self {
        Self {
            status,
            ..Self::new(name, StateKindName::Exit)
        }
    }

    pub fn timer(name: impl Into<String>, interval_secs: f64) -> Self {
        Self {
            interval_secs: Some(interval_secs),
            ..Self::new(name, StateKindName::Timer)
        }
    }

    pub fn sync(name: impl Into<String>, mode: SyncMode, count: usize) -> Self {
        Self {
            sync_mode: mode,
            sync_count: count,
            ..Self::new(name, StateKindName::Sync)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub from: String,
    pub to: String,

    #[serde(default)]
    pub priority: u32,

    /// Blend time in seconds
    #[serde(default)]
    pub duration_secs: f64,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub conditions: Vec<TransitionCondition>,
}

impl TransitionDefinition {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            priority: 0,
            duration_secs: 0.0,
            disabled: false,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: TransitionCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMachineDefinition {
    #[serde(default)]
    pub states: Vec<StateDefinition>,

    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

// ==================== Session File ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    /// Version for future migration support
    #[serde(default = "default_session_version")]
    pub version: u32,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub graph: GraphDefinition,

    #[serde(default)]
    pub state_machine: StateMachineDefinition,
}

fn default_session_version() -> u32 {
    SESSION_VERSION
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            name: String::new(),
            engine: EngineConfig::default(),
            graph: GraphDefinition::default(),
            state_machine: StateMachineDefinition::default(),
        }
    }
}

impl SessionFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a session file, format chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = SessionFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read session file {:?}: {}", path, e))
        })?;

        let session = Self::parse(&content, format)
            .map_err(|e| e.with_context(format!("Failed to parse session file {:?}", path)))?;
        tracing::info!(
            "Loaded session '{}' from {:?} ({} nodes, {} states)",
            session.name,
            path,
            session.graph.nodes.len(),
            session.state_machine.states.len()
        );
        Ok(session)
    }

    /// Save the session, format chosen by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = SessionFormat::from_path(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Config(format!("Failed to create session directory: {}", e))
                })?;
            }
        }

        let content = self.to_string(format)?;
        std::fs::write(path, content).map_err(|e| {
            EngineError::Config(format!("Failed to write session file {:?}: {}", path, e))
        })
    }

    pub fn parse(content: &str, format: SessionFormat) -> Result<Self> {
        match format {
            SessionFormat::Toml => {
                toml::from_str(content).map_err(|e| EngineError::Serialization(e.to_string()))
            }
            SessionFormat::Json => {
                serde_json::from_str(content).map_err(|e| EngineError::Serialization(e.to_string()))
            }
        }
    }

    pub fn to_string(&self, format: SessionFormat) -> Result<String> {
        match format {
            SessionFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
            }
            SessionFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| EngineError::Serialization(e.to_string())),
        }
    }

    /// Built-in session used when no file is given.
    ///
    /// A slow sine stands in for an alpha-band power estimate. After a short
    /// baseline the session waits in `relax` until the smoothed level stays
    /// high or a `button` event arrives.
    pub fn demo() -> Self {
        let graph = GraphDefinition {
            nodes: vec![
                NodeDefinition::new("eeg", NodeType::SignalGenerator)
                    .with_attribute("waveform", "sine")
                    .with_attribute("frequency", 0.1)
                    .with_attribute("amplitude", 0.5)
                    .with_attribute("offset", 0.5)
                    .with_attribute("sample_rate", 250.0),
                NodeDefinition::new("smooth", NodeType::Smooth).with_attribute("window", 50i64),
                NodeDefinition::new("alpha", NodeType::Feedback),
            ],
            connections: vec![
                ConnectionDefinition::new("eeg.out", "smooth.in"),
                ConnectionDefinition::new("smooth.out", "alpha.in"),
            ],
        };

        let mut to_done = TransitionDefinition::new("relax", "done")
            .with_condition(TransitionCondition::feedback("alpha", Comparison::Greater, 0.9));
        to_done.duration_secs = 0.5;
        let mut on_button = TransitionDefinition::new("relax", "done")
            .with_condition(TransitionCondition::event("button"));
        on_button.priority = 1;

        let state_machine = StateMachineDefinition {
            states: vec![
                StateDefinition::new("baseline", StateKindName::Entry),
                StateDefinition::new("relax", StateKindName::Plain),
                StateDefinition::exit("done", 0),
            ],
            transitions: vec![
                TransitionDefinition::new("baseline", "relax")
                    .with_condition(TransitionCondition::time(2.0)),
                to_done,
                on_button,
            ],
        };

        Self {
            name: "demo".to_string(),
            engine: EngineConfig {
                run_duration_secs: Some(30.0),
                ..EngineConfig::default()
            },
            graph,
            state_machine,
            ..Default::default()
        }
    }
}
