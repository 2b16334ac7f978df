//! Engine context and real-time host loop.
//!
//! `Engine` bundles the dataflow graph and the state machine and advances
//! both once per `update`. It never reads a clock itself.
//!
//! `EngineRunner` is the host side: it owns an `Engine` on a dedicated
//! thread, receives `EngineCommand`s and reports `EngineMessage`s over
//! bounded crossbeam channels.
//!
//! ```text
//! host ──EngineCommand──► EngineRunner ──update()──► Engine { Graph, StateMachine }
//!      ◄─EngineMessage───
//! ```

pub mod bridge;
pub mod runner;
pub mod runtime;

pub use bridge::{EngineCommand, EngineHandle, EngineMessage, EngineStats};
pub use runner::{spawn, EngineRunner};
pub use runtime::Engine;
