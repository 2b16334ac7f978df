//! # neurograph: real-time biosignal dataflow and session control
//!
//! A tick-scheduled dataflow graph of signal-processing nodes, layered under
//! a state machine that sequences session behavior ("record a baseline, wait
//! for the button, move on once alpha power is high").
//!
//! ## Architecture
//!
//! - **dsp**: Channels, the channel arena, read cursors and the sample-accurate clock
//! - **graph**: Nodes, ports, attributes and the topological scheduler
//! - **state_machine**: States, transitions, conditions and synchronization barriers
//! - **engine**: One explicit context object plus a real-time host loop
//! - **config**: Engine settings and TOML/JSON session files
//!
//! Sample producers (device drivers, network listeners) live on their own
//! threads and hand frames over through `dsp::SampleFeed`. Everything else
//! runs on the engine thread.
//!
//! ## Example
//!
//! ```
//! use neurograph::config::{SessionBuilder, SessionFile};
//! use std::time::Duration;
//!
//! let mut engine = SessionBuilder::build(&SessionFile::demo())?;
//! engine.start(Duration::ZERO)?;
//!
//! let step = Duration::from_millis(16);
//! for tick in 1..=60u32 {
//!     engine.update(step * tick, step);
//! }
//! assert!(engine.feedback_value("alpha").is_some());
//! # Ok::<(), neurograph::EngineError>(())
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph;
pub mod state_machine;

// Re-export commonly used types
pub use config::{EngineConfig, SessionBuilder, SessionFile};
pub use engine::{Engine, EngineCommand, EngineHandle, EngineMessage};
pub use error::{EngineError, Result, ResultExt};
pub use graph::{Graph, Node, NodeContext, NodeId, NodeType};
pub use state_machine::{StateEvent, StateKind, StateMachine, TransitionCondition};
